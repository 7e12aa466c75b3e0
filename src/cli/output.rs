use crate::{Comparison, Correction, CorrectionKind, PerformanceScore};
use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    results: &'a BTreeMap<String, Vec<Correction>>,
    suggestions: &'a BTreeMap<String, BTreeMap<String, String>>,
    scores: Vec<PerformanceScore>,
}

pub fn print_comparison(comparison: &Comparison, format: OutputFormat, colored_output: bool) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", render_text(comparison, colored_output));
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", render_json(comparison)?);
            Ok(())
        }
    }
}

pub fn render_json(comparison: &Comparison) -> Result<String> {
    let output = JsonOutput {
        results: &comparison.results,
        suggestions: &comparison.suggestions,
        scores: comparison.scores(),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

pub fn render_text(comparison: &Comparison, colored_output: bool) -> String {
    let mut out = String::new();

    for (checker, corrections) in &comparison.results {
        let accuracy = crate::score(corrections);
        if colored_output {
            out.push_str(&format!("\n{} {}\n", checker.bold().underline(), format_score(accuracy, true)));
        } else {
            out.push_str(&format!("\n{} {}\n", checker, format_score(accuracy, false)));
        }

        if corrections.is_empty() {
            let clean = "✓ No issues found";
            if colored_output {
                out.push_str(&format!("  {}\n", clean.green()));
            } else {
                out.push_str(&format!("  {}\n", clean));
            }
        }

        for correction in corrections {
            out.push_str(&format_correction(correction, colored_output));
        }

        let suggestions = comparison.suggestions.get(checker).filter(|s| !s.is_empty());
        if let Some(suggestions) = suggestions {
            if colored_output {
                out.push_str(&format!("  {}\n", "Suggestions:".cyan().bold()));
            } else {
                out.push_str("  Suggestions:\n");
            }
            for (key, suggestion) in suggestions {
                if colored_output {
                    out.push_str(&format!("    {} {} {}\n", key.yellow(), "→".dimmed(), suggestion));
                } else {
                    out.push_str(&format!("    {} → {}\n", key, suggestion));
                }
            }
        }
    }

    out.push_str(&format_summary(comparison, colored_output));
    out
}

fn format_correction(correction: &Correction, colored_output: bool) -> String {
    let kind = format!("[{}]", correction.kind);
    let mut line = if colored_output {
        let kind = match correction.kind {
            CorrectionKind::Spelling => kind.red().bold(),
            CorrectionKind::Grammar => kind.magenta().bold(),
            CorrectionKind::Error => kind.yellow().bold(),
        };
        format!("  {} {}: {}", kind, correction.message, correction.context.dimmed())
    } else {
        format!("  {} {}: {}", kind, correction.message, correction.context)
    };

    if let Some(replacement) = &correction.replacement {
        if colored_output {
            line.push_str(&format!(" {} {}", "→".dimmed(), replacement.green()));
        } else {
            line.push_str(&format!(" → {}", replacement));
        }
    }

    line.push('\n');
    line
}

fn format_score(accuracy: u32, colored_output: bool) -> String {
    let text = format!("(score {})", accuracy);
    if !colored_output {
        return text;
    }
    match accuracy {
        100 => text.green().to_string(),
        50..=99 => text.yellow().to_string(),
        _ => text.red().to_string(),
    }
}

fn format_summary(comparison: &Comparison, colored_output: bool) -> String {
    let total = comparison.total_corrections();
    let correction_word = if total == 1 { "correction" } else { "corrections" };
    let checkers = comparison.results.len();
    let checker_word = if checkers == 1 { "checker" } else { "checkers" };

    let mut out = String::from("\n");
    if colored_output {
        if total == 0 {
            out.push_str(&format!("{}\n", "✓ No issues found!".green().bold()));
        } else {
            out.push_str(&format!(
                "{} {} {} from {} {}\n",
                "✗".red().bold(),
                total.to_string().red().bold(),
                correction_word,
                checkers,
                checker_word
            ));
        }
    } else if total == 0 {
        out.push_str("✓ No issues found!\n");
    } else {
        out.push_str(&format!(
            "✗ {} {} from {} {}\n",
            total, correction_word, checkers, checker_word
        ));
    }

    if let Some(best) = comparison.best() {
        if colored_output {
            out.push_str(&format!("Best: {} ({})\n", best.checker.bold(), best.accuracy));
        } else {
            out.push_str(&format!("Best: {} ({})\n", best.checker, best.accuracy));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison() -> Comparison {
        let mut comparison = Comparison::default();
        comparison.results.insert(
            "Rule-based".to_string(),
            vec![Correction::grammar("Plural subject needs a plural verb", "அவர்கள் வருகிறான்")
                .with_replacement("அவர்கள் வருகிறார்கள்")],
        );
        comparison.results.insert("Statistical".to_string(), Vec::new());
        comparison.suggestions.insert(
            "Rule-based".to_string(),
            BTreeMap::from([(
                "அவர்கள் வருகிறான்".to_string(),
                "replace with அவர்கள் வருகிறார்கள்".to_string(),
            )]),
        );
        comparison.suggestions.insert("Statistical".to_string(), BTreeMap::new());
        comparison
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_plain_text_report() {
        let text = render_text(&comparison(), false);
        assert!(text.contains("Rule-based (score 90)"));
        assert!(text.contains("[grammar] Plural subject needs a plural verb: அவர்கள் வருகிறான் → அவர்கள் வருகிறார்கள்"));
        assert!(text.contains("Statistical (score 100)"));
        assert!(text.contains("✗ 1 correction from 2 checkers"));
        assert!(text.contains("Best: Statistical (100)"));
    }

    #[test]
    fn test_json_report_shape() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&comparison()).unwrap()).unwrap();
        assert_eq!(json["results"]["Rule-based"][0]["kind"], "grammar");
        assert_eq!(json["results"]["Rule-based"][0]["replacement"], "அவர்கள் வருகிறார்கள்");
        assert_eq!(json["scores"][0]["checker"], "Rule-based");
        assert_eq!(json["scores"][0]["accuracy"], 90);
        assert!(json["suggestions"]["Statistical"].as_object().unwrap().is_empty());
    }
}

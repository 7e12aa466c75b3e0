use crate::error::CheckError;
use regex::{Match, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    Spelling,
    WordSpacing,
    #[serde(rename = "subject-verb-agreement")]
    Agreement,
    WordOrder,
}

impl RuleCategory {
    /// Sentence-level rules run over whole sentences, the rest over single words.
    pub fn is_sentence_level(self) -> bool {
        matches!(self, RuleCategory::Agreement | RuleCategory::WordOrder)
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleCategory::Spelling => "spelling",
            RuleCategory::WordSpacing => "word-spacing",
            RuleCategory::Agreement => "subject-verb-agreement",
            RuleCategory::WordOrder => "word-order",
        };
        f.write_str(name)
    }
}

/// Uncompiled rule as written in a rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub category: RuleCategory,
    pub pattern: String,
    pub message: String,
    #[serde(default)]
    pub replacement: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default, rename = "rule")]
    rules: Vec<RuleSpec>,
}

/// A compiled rule: a search pattern, what to say when it matches, and
/// optionally how to rewrite the matched text.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    category: RuleCategory,
    pattern: Regex,
    message: String,
    replacement: Option<String>,
}

impl Rule {
    pub fn new(
        id: &str,
        category: RuleCategory,
        pattern: &str,
        message: &str,
        replacement: Option<&str>,
    ) -> Result<Self, CheckError> {
        let pattern = Regex::new(pattern).map_err(|source| CheckError::Rule {
            id: id.to_string(),
            source,
        })?;

        Ok(Self {
            id: id.to_string(),
            category,
            pattern,
            message: message.to_string(),
            replacement: replacement.map(str::to_string),
        })
    }

    pub fn compile(spec: &RuleSpec) -> Result<Self, CheckError> {
        Self::new(
            &spec.id,
            spec.category,
            &spec.pattern,
            &spec.message,
            spec.replacement.as_deref(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> RuleCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    /// Search anywhere in `text`, not just at the start.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.pattern.find(text)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Substitute every match in `text` with the replacement template.
    ///
    /// Returns `None` for advisory rules.
    pub fn rewrite(&self, text: &str) -> Option<String> {
        let template = self.replacement.as_deref()?;
        Some(self.pattern.replace_all(text, template).into_owned())
    }
}

type BuiltinRule = (
    &'static str,
    RuleCategory,
    &'static str,
    &'static str,
    Option<&'static str>,
);

// Declaration order is behaviour: within a category the first match wins.
const BUILTIN_RULES: &[BuiltinRule] = &[
    (
        "spell-sel",
        RuleCategory::Spelling,
        r"^சல்",
        "Possible misspelling of செல்",
        Some("செல்"),
    ),
    (
        "spell-basai",
        RuleCategory::Spelling,
        r"பாஷை",
        "Possible misspelling of மொழி",
        Some("மொழி"),
    ),
    (
        "spell-enge",
        RuleCategory::Spelling,
        r"எங்கே",
        "Possible misspelling of எங்கு",
        Some("எங்கு"),
    ),
    (
        "spell-grantha-ha",
        RuleCategory::Spelling,
        r"ஹ",
        "Grantha letter ஹ; consider a native Tamil spelling",
        None,
    ),
    (
        "space-kku",
        RuleCategory::WordSpacing,
        r"^(\w+க்கு)(\w+)$",
        "Missing space after க்கு",
        Some("$1 $2"),
    ),
    (
        "space-mudan",
        RuleCategory::WordSpacing,
        r"^(\w+முடன்)(\w+)$",
        "Missing space after முடன்",
        Some("$1 $2"),
    ),
    (
        "agree-plural-avargal",
        RuleCategory::Agreement,
        r"(?P<subject>\bஅவர்கள்\b)(?P<gap>\s+(?:\S+\s+)*?)(?P<stem>\w+)கிறான்\b",
        "Plural subject அவர்கள் takes a plural verb",
        Some("${subject}${gap}${stem}கிறார்கள்"),
    ),
    (
        "agree-masculine-avan",
        RuleCategory::Agreement,
        r"(?P<subject>\bஅவன்\b)(?P<gap>\s+(?:\S+\s+)*?)(?P<stem>\w+)கிறாள்\b",
        "Masculine subject அவன் takes a masculine verb",
        Some("${subject}${gap}${stem}கிறான்"),
    ),
    (
        "agree-feminine-aval",
        RuleCategory::Agreement,
        r"(?P<subject>\bஅவள்\b)(?P<gap>\s+(?:\S+\s+)*?)(?P<stem>\w+)கிறான்\b",
        "Feminine subject அவள் takes a feminine verb",
        Some("${subject}${gap}${stem}கிறாள்"),
    ),
    (
        "agree-first-person-naan",
        RuleCategory::Agreement,
        r"(?P<subject>\bநான்\b)(?P<gap>\s+(?:\S+\s+)*?)(?P<stem>\w+)கிறா(?:ன்|ள்)\b",
        "First person subject நான் takes a first person verb",
        Some("${subject}${gap}${stem}கிறேன்"),
    ),
    (
        "agree-first-plural-naangal",
        RuleCategory::Agreement,
        r"(?P<subject>\bநாங்கள்\b)(?P<gap>\s+(?:\S+\s+)*?)(?P<stem>\w+)கிற(?:ான்|ாள்|ேன்)\b",
        "Plural subject நாங்கள் takes a first person plural verb",
        Some("${subject}${gap}${stem}கிறோம்"),
    ),
    (
        "agree-second-person-nee",
        RuleCategory::Agreement,
        r"(?P<subject>\bநீ\b)(?P<gap>\s+(?:\S+\s+)*?)(?P<stem>\w+)கிறா(?:ன்|ள்)\b",
        "Second person subject நீ takes a second person verb",
        Some("${subject}${gap}${stem}கிறாய்"),
    ),
    (
        "order-book-that",
        RuleCategory::WordOrder,
        r"\bபுத்தகம்\s+அந்த\b",
        "Demonstrative அந்த comes before the noun",
        Some("அந்த புத்தகம்"),
    ),
    (
        "order-noun-demonstrative",
        RuleCategory::WordOrder,
        r"^(?P<noun>\w+ம்)\s+(?P<det>அந்த|இந்த)$",
        "Demonstrative comes before the noun",
        Some("${det} ${noun}"),
    ),
];

/// Compile the built-in rule tables in declaration order.
pub fn builtin_rules() -> Result<Vec<Rule>, CheckError> {
    BUILTIN_RULES
        .iter()
        .map(|(id, category, pattern, message, replacement)| {
            Rule::new(id, *category, pattern, message, *replacement)
        })
        .collect()
}

/// Load extra rules from a TOML file of `[[rule]]` tables.
///
/// A missing or unparsable file yields no rules, and a rule whose pattern
/// does not compile is skipped; both are logged.
pub fn load_rules_file(path: &Path) -> Vec<Rule> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable rules file");
            return Vec::new();
        }
    };

    let file: RuleFile = match toml::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed rules file");
            return Vec::new();
        }
    };

    let rules: Vec<Rule> = file
        .rules
        .iter()
        .filter_map(|spec| match Rule::compile(spec) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping rule");
                None
            }
        })
        .collect();

    info!(path = %path.display(), count = rules.len(), "loaded custom rules");
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn builtin(id: &str) -> Rule {
        builtin_rules()
            .unwrap()
            .into_iter()
            .find(|r| r.id() == id)
            .unwrap()
    }

    #[test]
    fn test_builtin_rules_compile_in_order() {
        let rules = builtin_rules().unwrap();
        assert_eq!(rules.len(), BUILTIN_RULES.len());
        assert_eq!(rules[0].id(), "spell-sel");
        assert_eq!(rules.last().unwrap().id(), "order-noun-demonstrative");
    }

    #[test]
    fn test_spelling_rewrite_touches_only_the_match() {
        let rule = builtin("spell-sel");
        assert_eq!(rule.rewrite("சல்கிறேன்").as_deref(), Some("செல்கிறேன்"));
        assert!(rule.find("செல்கிறேன்").is_none());
    }

    #[test]
    fn test_agreement_rewrites_verb_ending() {
        let rule = builtin("agree-plural-avargal");
        assert_eq!(
            rule.rewrite("அவர்கள் வருகிறான்").as_deref(),
            Some("அவர்கள் வருகிறார்கள்")
        );
        assert_eq!(
            rule.rewrite("அவர்கள் பள்ளிக்கு வருகிறான்").as_deref(),
            Some("அவர்கள் பள்ளிக்கு வருகிறார்கள்")
        );
        assert!(!rule.is_match("அவர்கள் வருகிறார்கள்"));
    }

    #[test]
    fn test_subject_needs_word_boundary() {
        // அவர் is a prefix of அவர்கள்; நீ is a prefix of நீங்கள்
        let rule = builtin("agree-second-person-nee");
        assert!(!rule.is_match("நீங்கள் வருகிறான்"));
        assert!(rule.is_match("நீ வருகிறான்"));
    }

    #[test]
    fn test_advisory_rule_has_no_rewrite() {
        let rule = builtin("spell-grantha-ha");
        assert!(rule.is_match("ஹலோ"));
        assert_eq!(rule.rewrite("ஹலோ"), None);
    }

    #[test]
    fn test_category_serde_names() {
        let spec: RuleSpec = toml::from_str(
            r#"
            id = "x"
            category = "subject-verb-agreement"
            pattern = "a"
            message = "m"
            "#,
        )
        .unwrap();
        assert_eq!(spec.category, RuleCategory::Agreement);
        assert!(spec.category.is_sentence_level());
        assert!(!RuleCategory::WordSpacing.is_sentence_level());
    }

    #[test]
    fn test_rules_file_skips_invalid_patterns() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[rule]]
id = "custom-ok"
category = "spelling"
pattern = "கூட்டம்ம"
message = "Doubled ம"
replacement = "கூட்டம்"

[[rule]]
id = "custom-broken"
category = "word-order"
pattern = "(unclosed"
message = "never compiles"
"#
        )
        .unwrap();

        let rules = load_rules_file(file.path());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id(), "custom-ok");
        assert_eq!(rules[0].category(), RuleCategory::Spelling);
    }

    #[test]
    fn test_missing_rules_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_rules_file(&dir.path().join("rules.toml")).is_empty());
    }
}

//! Statistical checker: naive Bayes classifiers over character and word
//! n-grams, trained at construction on a small labelled corpus, plus a
//! handful of error patterns for mismatches the classifiers cannot name.

use super::rules::{Rule, RuleCategory};
use super::Checker;
use crate::error::CheckError;
use crate::{Correction, CorrectionKind};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Below this probability of being correct a text is flagged.
const CONFIDENCE_THRESHOLD: f64 = 0.8;

const CORRECT: usize = 1;
const INCORRECT: usize = 0;

// (sentence, spelling correct, grammar correct)
const TRAINING_CORPUS: &[(&str, bool, bool)] = &[
    ("நான் பள்ளிக்கு செல்கிறேன்", true, true),
    ("அவள் பள்ளிக்கு செல்கிறாள்", true, true),
    ("அவள் புத்தகம் படிக்கிறாள்", true, true),
    ("அவள் புதிய புத்தகம் படிக்கிறான்", false, false),
    ("நாங்கள் பள்ளிக்கு செல்கிறோம்", true, true),
    ("நாங்கள் பழைய பேனா மேசையில் வைக்கிறாள்", false, false),
    ("அவன் பள்ளிக்கு செல்கிறான்", true, true),
    ("அவன் பள்ளிக்கு போகிறேன் சல்கிறான்", false, false),
    ("நான் பெரிய கண்ணி பயன்படுத்துகிறேன்", true, true),
    ("நான் பெரிய கண்ணி பயன்படுத்திறான்", false, false),
];

type ErrorPattern = (&'static str, &'static str, &'static str, &'static str);

// (id, message, pattern, replacement)
const ERROR_PATTERNS: &[ErrorPattern] = &[
    (
        "gender-avan",
        "Gender mismatch",
        r"\b(?P<subject>அவன்)\s+(?P<stem>\w+)கிறாள்\b",
        "${subject} ${stem}கிறான்",
    ),
    (
        "gender-aval",
        "Gender mismatch",
        r"\b(?P<subject>அவள்)\s+(?P<stem>\w+)கிறான்\b",
        "${subject} ${stem}கிறாள்",
    ),
    (
        "person-naan",
        "Subject-verb mismatch",
        r"\b(?P<subject>நான்)\s+(?P<stem>\w+)கிறான்\b",
        "${subject} ${stem}கிறேன்",
    ),
    (
        "person-naangal",
        "Subject-verb mismatch",
        r"\b(?P<subject>நாங்கள்)\s+(?P<stem>\w+)கிறான்\b",
        "${subject} ${stem}கிறோம்",
    ),
    (
        "honorific-avan",
        "Honorific mismatch",
        r"\b(?P<subject>அவன்)\s+(?P<stem>\w+)கிறேன்\b",
        "${subject} ${stem}கிறான்",
    ),
    (
        "honorific-aval",
        "Honorific mismatch",
        r"\b(?P<subject>அவள்)\s+(?P<stem>\w+)கிறேன்\b",
        "${subject} ${stem}கிறாள்",
    ),
];

/// Multinomial naive Bayes with add-one smoothing over two classes.
struct NaiveBayes {
    log_priors: [f64; 2],
    log_likelihoods: [HashMap<String, f64>; 2],
    vocabulary: HashSet<String>,
}

impl NaiveBayes {
    fn train(samples: &[(Vec<String>, usize)]) -> Self {
        let mut documents = [0usize; 2];
        let mut counts: [HashMap<String, usize>; 2] = [HashMap::new(), HashMap::new()];
        let mut vocabulary = HashSet::new();

        for (features, class) in samples {
            documents[*class] += 1;
            for feature in features {
                *counts[*class].entry(feature.clone()).or_insert(0) += 1;
                vocabulary.insert(feature.clone());
            }
        }

        let total_documents = samples.len().max(1) as f64;
        let vocabulary_size = vocabulary.len() as f64;
        let mut log_priors = [0.0; 2];
        let mut log_likelihoods: [HashMap<String, f64>; 2] = [HashMap::new(), HashMap::new()];

        for class in [INCORRECT, CORRECT] {
            // add-one on the prior too, so an empty class is not -inf
            log_priors[class] = ((documents[class] as f64 + 1.0) / (total_documents + 2.0)).ln();
            let total: usize = counts[class].values().sum();
            let denominator = total as f64 + vocabulary_size;
            for feature in &vocabulary {
                let count = counts[class].get(feature).copied().unwrap_or(0) as f64;
                log_likelihoods[class].insert(feature.clone(), ((count + 1.0) / denominator).ln());
            }
        }

        Self {
            log_priors,
            log_likelihoods,
            vocabulary,
        }
    }

    /// Posterior probability of the "correct" class; features never seen
    /// in training are ignored.
    fn probability_correct(&self, features: &[String]) -> f64 {
        let mut scores = self.log_priors;
        for feature in features.iter().filter(|f| self.vocabulary.contains(*f)) {
            for (class, score) in scores.iter_mut().enumerate() {
                *score += self.log_likelihoods[class][feature];
            }
        }

        let max = scores[0].max(scores[1]);
        let correct = (scores[CORRECT] - max).exp();
        let incorrect = (scores[INCORRECT] - max).exp();
        correct / (correct + incorrect)
    }
}

fn char_ngrams(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut grams = Vec::new();
    for n in 2..=4 {
        for window in chars.windows(n) {
            grams.push(window.iter().collect());
        }
    }
    grams
}

fn word_ngrams(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut grams: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    for pair in words.windows(2) {
        grams.push(pair.join(" "));
    }
    grams
}

pub struct StatisticalChecker {
    spelling: NaiveBayes,
    grammar: NaiveBayes,
    patterns: Vec<Rule>,
}

impl StatisticalChecker {
    pub const NAME: &'static str = "Statistical";

    pub fn new() -> Result<Self, CheckError> {
        let spelling_samples: Vec<_> = TRAINING_CORPUS
            .iter()
            .map(|(text, ok, _)| (char_ngrams(text), if *ok { CORRECT } else { INCORRECT }))
            .collect();
        let grammar_samples: Vec<_> = TRAINING_CORPUS
            .iter()
            .map(|(text, _, ok)| (word_ngrams(text), if *ok { CORRECT } else { INCORRECT }))
            .collect();

        let patterns = ERROR_PATTERNS
            .iter()
            .map(|(id, message, pattern, replacement)| {
                Rule::new(id, RuleCategory::Agreement, pattern, message, Some(*replacement))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(samples = TRAINING_CORPUS.len(), "trained statistical checker");

        Ok(Self {
            spelling: NaiveBayes::train(&spelling_samples),
            grammar: NaiveBayes::train(&grammar_samples),
            patterns,
        })
    }

    pub fn spelling_confidence(&self, text: &str) -> f64 {
        self.spelling.probability_correct(&char_ngrams(text))
    }

    pub fn grammar_confidence(&self, text: &str) -> f64 {
        self.grammar.probability_correct(&word_ngrams(text))
    }

    fn pattern_corrections(&self, text: &str) -> Vec<Correction> {
        self.patterns
            .iter()
            .filter(|pattern| pattern.is_match(text))
            .map(|pattern| {
                let correction = Correction::new(CorrectionKind::Grammar, pattern.message(), text);
                match pattern.rewrite(text) {
                    Some(rewritten) => correction.with_replacement(rewritten),
                    None => correction,
                }
            })
            .collect()
    }
}

impl Checker for StatisticalChecker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, text: &str) -> Result<Vec<Correction>, CheckError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut corrections = Vec::new();
        if self.spelling_confidence(text) < CONFIDENCE_THRESHOLD {
            corrections.push(Correction::spelling("Low spelling confidence", text));
        }
        if self.grammar_confidence(text) < CONFIDENCE_THRESHOLD {
            corrections.push(Correction::grammar("Low grammar confidence", text));
        }
        corrections.extend(self.pattern_corrections(text));

        Ok(corrections)
    }

    fn suggest(&self, text: &str) -> Result<BTreeMap<String, String>, CheckError> {
        Ok(suggestions_for(&self.analyze(text)?))
    }

    fn analyze_with_suggestions(
        &self,
        text: &str,
    ) -> Result<(Vec<Correction>, BTreeMap<String, String>), CheckError> {
        let corrections = self.analyze(text)?;
        let suggestions = suggestions_for(&corrections);
        Ok((corrections, suggestions))
    }
}

/// One suggested fix per distinct message.
fn suggestions_for(corrections: &[Correction]) -> BTreeMap<String, String> {
    let mut suggestions = BTreeMap::new();

    for correction in corrections {
        let suggestion = match &correction.replacement {
            Some(replacement) => format!("rewrite as: {}", replacement),
            None => "no suggestion available".to_string(),
        };
        suggestions
            .entry(correction.message.clone())
            .or_insert(suggestion);
    }

    suggestions
}

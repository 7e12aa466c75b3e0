pub mod applier;
pub mod dictionary;
pub mod engine;
pub mod model;
pub mod rules;
pub mod statistical;
pub mod suggestions;
pub mod tokenizer;

pub use model::{HttpMaskedModel, MaskPrediction, MaskedLanguageModel, ModelChecker};
pub use statistical::StatisticalChecker;

use crate::error::CheckError;
use crate::{CheckReport, Config, Correction};
use anyhow::{Context, Result};
use dictionary::DictionaryStore;
use engine::PatternRuleEngine;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Anything that can check text and propose fixes.
///
/// Implementors provide `analyze` and `suggest`; callers use the provided
/// `check_text` and `suggestions`, which never fail: an error or a panic
/// inside the implementation comes back as a single `error`-kind
/// correction (or a single `"error"` suggestion entry).
pub trait Checker: Send + Sync {
    fn name(&self) -> &str;

    fn analyze(&self, text: &str) -> Result<Vec<Correction>, CheckError>;

    fn suggest(&self, text: &str) -> Result<BTreeMap<String, String>, CheckError>;

    fn check_text(&self, text: &str) -> Vec<Correction> {
        match contain(|| self.analyze(text)) {
            Ok(corrections) => corrections,
            Err(e) => {
                warn!(checker = self.name(), error = %e, "checker failed");
                vec![failure(self.name(), &e, text)]
            }
        }
    }

    fn suggestions(&self, text: &str) -> BTreeMap<String, String> {
        match contain(|| self.suggest(text)) {
            Ok(suggestions) => suggestions,
            Err(e) => BTreeMap::from([("error".to_string(), e.to_string())]),
        }
    }

    /// Corrections and suggestions from one pass over `text`.
    ///
    /// The default runs `analyze` and `suggest` separately; checkers whose
    /// suggestions fall out of the same work override it.
    fn analyze_with_suggestions(
        &self,
        text: &str,
    ) -> Result<(Vec<Correction>, BTreeMap<String, String>), CheckError> {
        Ok((self.analyze(text)?, self.suggest(text)?))
    }

    /// Contained form of `analyze_with_suggestions`: a failure anywhere is
    /// one `error` correction plus an `"error"` suggestion entry.
    fn check(&self, text: &str) -> (Vec<Correction>, BTreeMap<String, String>) {
        match contain(|| self.analyze_with_suggestions(text)) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(checker = self.name(), error = %e, "checker failed");
                (
                    vec![failure(self.name(), &e, text)],
                    BTreeMap::from([("error".to_string(), e.to_string())]),
                )
            }
        }
    }

    /// Check `text` and apply whatever corrections carry a replacement.
    fn report(&self, text: &str) -> CheckReport {
        let corrections = self.check_text(text);
        CheckReport {
            corrected_text: applier::apply(text, &corrections),
            corrections,
        }
    }
}

/// The correction reported in place of a failed checker run.
pub fn failure(checker: &str, error: &CheckError, text: &str) -> Correction {
    Correction::error(format!("{} failed: {}", checker, error), text)
}

fn contain<T>(run: impl FnOnce() -> Result<T, CheckError>) -> Result<T, CheckError> {
    panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|payload| Err(CheckError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Dictionary and pattern rules, applied word by word and then sentence by
/// sentence.
pub struct RuleBasedChecker {
    dictionary: DictionaryStore,
    engine: PatternRuleEngine,
    max_suggestions: usize,
}

impl RuleBasedChecker {
    pub const NAME: &'static str = "Rule-based";

    pub fn new(config: &Config) -> Result<Self> {
        let dictionary = DictionaryStore::load(config.dictionary.as_deref())?;

        let mut engine = PatternRuleEngine::builtin().context("Failed to compile built-in rules")?;
        if let Some(rules_path) = &config.rules {
            engine.extend(rules::load_rules_file(rules_path));
        }

        Ok(Self::from_parts(dictionary, engine).with_max_suggestions(config.max_suggestions))
    }

    pub fn from_parts(dictionary: DictionaryStore, engine: PatternRuleEngine) -> Self {
        Self {
            dictionary,
            engine,
            max_suggestions: 3,
        }
    }

    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    pub fn dictionary(&self) -> &DictionaryStore {
        &self.dictionary
    }

    /// Spelling corrections in token order, then grammar corrections in
    /// sentence order.
    pub fn detect(&self, text: &str) -> Vec<Correction> {
        let tokens = tokenizer::tokenize(text);
        let sentences = tokenizer::sentences(text);

        let mut corrections = self.engine.detect_spelling(&tokens, &self.dictionary);
        corrections.extend(self.engine.detect_grammar(&sentences));
        corrections
    }
}

impl Checker for RuleBasedChecker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, text: &str) -> Result<Vec<Correction>, CheckError> {
        Ok(self.detect(text))
    }

    fn suggest(&self, text: &str) -> Result<BTreeMap<String, String>, CheckError> {
        Ok(self.suggestions_for(text, &self.detect(text)))
    }

    fn analyze_with_suggestions(
        &self,
        text: &str,
    ) -> Result<(Vec<Correction>, BTreeMap<String, String>), CheckError> {
        let corrections = self.detect(text);
        let suggestions = self.suggestions_for(text, &corrections);
        Ok((corrections, suggestions))
    }
}

impl RuleBasedChecker {
    /// Replacement hints for `corrections`, then nearest dictionary words
    /// for every unknown word in `text`.
    fn suggestions_for(&self, text: &str, corrections: &[Correction]) -> BTreeMap<String, String> {
        let mut suggestions = BTreeMap::new();

        for correction in corrections {
            if let Some(replacement) = &correction.replacement {
                suggestions
                    .entry(correction.context.clone())
                    .or_insert_with(|| format!("replace with {}", replacement));
            }
        }

        for token in tokenizer::tokenize(text) {
            let word = token.text;
            if self.dictionary.contains(&word) || tokenizer::is_numeric(&word) {
                continue;
            }
            suggestions.entry(word.clone()).or_insert_with(|| {
                let nearest = suggestions::generate(&word, &self.dictionary, self.max_suggestions);
                if nearest.is_empty() {
                    "no suggestion available".to_string()
                } else {
                    format!("did you mean: {}", nearest.join(", "))
                }
            });
        }

        suggestions
    }
}

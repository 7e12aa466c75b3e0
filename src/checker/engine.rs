use super::dictionary::DictionaryStore;
use super::rules::{self, Rule, RuleCategory};
use super::tokenizer;
use crate::error::CheckError;
use crate::{Correction, CorrectionKind, Token};

/// Message prefix for the dictionary-miss advisory.
pub const UNKNOWN_WORD: &str = "Unknown word";

/// Ordered rule tables, split by the level they run at.
///
/// Order inside each table is the order the rules were given in, and the
/// first matching rule in a table is the only one reported for a span.
pub struct PatternRuleEngine {
    spelling: Vec<Rule>,
    spacing: Vec<Rule>,
    sentence: Vec<Rule>,
}

impl PatternRuleEngine {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut engine = Self {
            spelling: Vec::new(),
            spacing: Vec::new(),
            sentence: Vec::new(),
        };
        engine.extend(rules);
        engine
    }

    pub fn builtin() -> Result<Self, CheckError> {
        Ok(Self::new(rules::builtin_rules()?))
    }

    /// Append rules after the ones already present in their category.
    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule>) {
        for rule in rules {
            match rule.category() {
                RuleCategory::Spelling => self.spelling.push(rule),
                RuleCategory::WordSpacing => self.spacing.push(rule),
                RuleCategory::Agreement | RuleCategory::WordOrder => self.sentence.push(rule),
            }
        }
    }

    pub fn rule_count(&self) -> usize {
        self.spelling.len() + self.spacing.len() + self.sentence.len()
    }

    /// Word-level diagnostics.
    ///
    /// For each token, in order: the first matching spelling rule, the
    /// unknown-word advisory, then the first matching spacing rule. Spacing
    /// rules only look at words the dictionary does not know, so valid
    /// compounds are left alone.
    pub fn detect_spelling(&self, tokens: &[Token], dictionary: &DictionaryStore) -> Vec<Correction> {
        let mut corrections = Vec::new();

        for token in tokens {
            let word = token.text.as_str();

            if let Some(rule) = first_match(&self.spelling, word) {
                corrections.push(correction_for(rule, word, CorrectionKind::Spelling));
            }

            if dictionary.contains(word) {
                continue;
            }

            if !tokenizer::is_numeric(word) {
                corrections.push(Correction::spelling(
                    format!("{}: {}", UNKNOWN_WORD, word),
                    word,
                ));
            }

            if let Some(rule) = first_match(&self.spacing, word) {
                corrections.push(correction_for(rule, word, CorrectionKind::Spelling));
            }
        }

        corrections
    }

    /// Sentence-level diagnostics: at most one per sentence, from the first
    /// matching rule.
    pub fn detect_grammar(&self, sentences: &[Token]) -> Vec<Correction> {
        sentences
            .iter()
            .filter_map(|sentence| {
                first_match(&self.sentence, &sentence.text)
                    .map(|rule| correction_for(rule, &sentence.text, CorrectionKind::Grammar))
            })
            .collect()
    }
}

fn first_match<'r>(rules: &'r [Rule], text: &str) -> Option<&'r Rule> {
    rules.iter().find(|rule| rule.find(text).is_some())
}

fn correction_for(rule: &Rule, context: &str, kind: CorrectionKind) -> Correction {
    let correction = Correction::new(kind, rule.message(), context);
    match rule.rewrite(context) {
        Some(rewritten) => correction.with_replacement(rewritten),
        None => correction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PatternRuleEngine {
        PatternRuleEngine::builtin().unwrap()
    }

    fn dictionary() -> DictionaryStore {
        DictionaryStore::seed().unwrap()
    }

    #[test]
    fn test_spelling_rule_and_unknown_word_co_occur() {
        let tokens = tokenizer::tokenize("நான் பள்ளிக்கு சல்கிறேன்.");
        let corrections = engine().detect_spelling(&tokens, &dictionary());

        assert_eq!(corrections.len(), 2);
        assert_eq!(corrections[0].message, "Possible misspelling of செல்");
        assert_eq!(corrections[0].context, "சல்கிறேன்");
        assert_eq!(corrections[0].replacement.as_deref(), Some("செல்கிறேன்"));
        assert_eq!(corrections[1].message, "Unknown word: சல்கிறேன்");
        assert!(corrections[1].is_advisory());
    }

    #[test]
    fn test_numeric_tokens_are_not_unknown() {
        let tokens = tokenizer::tokenize("நான் 2024 ௨௦௨௪");
        assert!(engine().detect_spelling(&tokens, &dictionary()).is_empty());
    }

    #[test]
    fn test_spacing_rule_only_for_unknown_words() {
        let tokens = tokenizer::tokenize("பள்ளிக்குசென்றான் பள்ளிக்கு");
        let corrections = engine().detect_spelling(&tokens, &dictionary());

        let spacing: Vec<_> = corrections
            .iter()
            .filter(|c| c.message == "Missing space after க்கு")
            .collect();
        assert_eq!(spacing.len(), 1);
        assert_eq!(spacing[0].replacement.as_deref(), Some("பள்ளிக்கு சென்றான்"));
    }

    #[test]
    fn test_grammar_first_match_per_sentence() {
        let sentences = tokenizer::sentences("அவர்கள் வருகிறான். புத்தகம் அந்த. நான் வருகிறேன்");
        let corrections = engine().detect_grammar(&sentences);

        assert_eq!(corrections.len(), 2);
        assert!(corrections.iter().all(|c| c.kind == CorrectionKind::Grammar));
        assert_eq!(corrections[0].replacement.as_deref(), Some("அவர்கள் வருகிறார்கள்"));
        assert_eq!(corrections[1].replacement.as_deref(), Some("அந்த புத்தகம்"));
    }

    #[test]
    fn test_one_grammar_correction_even_when_two_rules_match() {
        // both word-order rules match this sentence
        let sentences = tokenizer::sentences("புத்தகம் அந்த");
        let corrections = engine().detect_grammar(&sentences);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].message, "Demonstrative அந்த comes before the noun");
    }

    #[test]
    fn test_first_spelling_rule_wins() {
        let rules = vec![
            Rule::new("a", RuleCategory::Spelling, "பாஷை", "first", Some("மொழி")).unwrap(),
            Rule::new("b", RuleCategory::Spelling, "ஷை", "second", Some("ழி")).unwrap(),
        ];
        let engine = PatternRuleEngine::new(rules);
        let tokens = tokenizer::tokenize("பாஷை");
        let corrections = engine.detect_spelling(&tokens, &dictionary());

        let from_rules: Vec<_> = corrections
            .iter()
            .filter(|c| !c.message.starts_with(UNKNOWN_WORD))
            .collect();
        assert_eq!(from_rules.len(), 1);
        assert_eq!(from_rules[0].message, "first");
    }

    #[test]
    fn test_extend_appends_within_category() {
        let mut engine = engine();
        let before = engine.rule_count();
        engine.extend(vec![Rule::new(
            "custom",
            RuleCategory::WordOrder,
            r"^(\w+)\s+இந்த$",
            "custom order",
            Some("இந்த $1"),
        )
        .unwrap()]);
        assert_eq!(engine.rule_count(), before + 1);

        // built-in order rule still wins for the sentence it matches
        let corrections = engine.detect_grammar(&tokenizer::sentences("புத்தகம் இந்த"));
        assert_eq!(corrections[0].message, "Demonstrative comes before the noun");
    }
}

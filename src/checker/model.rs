use super::tokenizer;
use super::Checker;
use crate::config::ModelConfig;
use crate::error::CheckError;
use crate::Correction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

pub const MASK: &str = "[MASK]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskPrediction {
    #[serde(rename = "token_str")]
    pub token: String,
    pub score: f32,
}

/// A pretrained model that fills a single `[MASK]` in a sentence.
pub trait MaskedLanguageModel: Send + Sync {
    fn fill_mask(&self, masked: &str) -> Result<Vec<MaskPrediction>, CheckError>;
}

/// Fill-mask backend served over HTTP, e.g. a hosted inference endpoint.
pub struct HttpMaskedModel {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct FillMaskRequest<'a> {
    inputs: &'a str,
}

impl HttpMaskedModel {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self, CheckError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }
}

impl MaskedLanguageModel for HttpMaskedModel {
    fn fill_mask(&self, masked: &str) -> Result<Vec<MaskPrediction>, CheckError> {
        let body = serde_json::to_string(&FillMaskRequest { inputs: masked })?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?.error_for_status()?;
        let predictions: Vec<MaskPrediction> = serde_json::from_str(&response.text()?)?;
        Ok(predictions)
    }
}

/// Flags words a masked language model would not have predicted in their
/// position, proposing the model's top prediction instead.
pub struct ModelChecker {
    model: Option<Box<dyn MaskedLanguageModel>>,
    threshold: f32,
    top_k: usize,
}

impl ModelChecker {
    pub const NAME: &'static str = "Model-based";

    pub fn new(model: Box<dyn MaskedLanguageModel>) -> Self {
        Self {
            model: Some(model),
            threshold: 0.5,
            top_k: 5,
        }
    }

    /// A checker with no model; every check reports the model as unavailable.
    pub fn unavailable() -> Self {
        Self {
            model: None,
            threshold: 0.5,
            top_k: 5,
        }
    }

    pub fn from_config(config: &ModelConfig, timeout: Duration) -> Self {
        let checker = match &config.endpoint {
            Some(endpoint) => {
                let token = env::var(&config.token_env).ok();
                match HttpMaskedModel::new(endpoint, token, timeout) {
                    Ok(model) => Self::new(Box::new(model)),
                    Err(e) => {
                        warn!(endpoint = %endpoint, error = %e, "language model client unavailable");
                        Self::unavailable()
                    }
                }
            }
            None => Self::unavailable(),
        };

        checker
            .with_threshold(config.threshold)
            .with_top_k(config.top_k)
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Top predictions for every word, with the word masked out of its
    /// sentence. Words are queried concurrently; results keep text order.
    fn predictions(&self, text: &str) -> Result<Vec<(String, Vec<MaskPrediction>)>, CheckError> {
        let model = self.model.as_deref().ok_or(CheckError::ModelUnavailable)?;

        let mut queries = Vec::new();
        for sentence in tokenizer::sentences(text) {
            for word in tokenizer::tokenize(&sentence.text) {
                if tokenizer::is_numeric(&word.text) {
                    continue;
                }
                let masked = format!(
                    "{}{}{}",
                    &sentence.text[..word.start],
                    MASK,
                    &sentence.text[word.end..]
                );
                queries.push((word.text, masked));
            }
        }

        queries
            .into_par_iter()
            .map(|(word, masked)| -> Result<(String, Vec<MaskPrediction>), CheckError> {
                let mut predictions = model.fill_mask(&masked)?;
                predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
                predictions.truncate(self.top_k);

                debug!(word = %word, count = predictions.len(), "model predictions");
                Ok((word, predictions))
            })
            .collect()
    }

    fn corrections_from(&self, predicted: &[(String, Vec<MaskPrediction>)]) -> Vec<Correction> {
        let mut corrections = Vec::new();

        for (word, predictions) in predicted {
            if predictions.iter().any(|p| p.token.trim() == word) {
                continue;
            }
            let Some(top) = predictions.first() else {
                continue;
            };
            if top.score < self.threshold {
                continue;
            }

            let replacement = top.token.trim();
            corrections.push(
                Correction::spelling(
                    format!("Language model suggests {} for {}", replacement, word),
                    word.as_str(),
                )
                .with_replacement(replacement),
            );
        }

        corrections
    }
}

fn suggestions_from(predicted: &[(String, Vec<MaskPrediction>)]) -> BTreeMap<String, String> {
    let mut suggestions = BTreeMap::new();

    for (word, predictions) in predicted {
        if predictions.is_empty() || predictions.iter().any(|p| p.token.trim() == word) {
            continue;
        }
        let candidates: Vec<&str> = predictions.iter().map(|p| p.token.trim()).collect();
        suggestions
            .entry(word.clone())
            .or_insert_with(|| format!("did you mean: {}", candidates.join(", ")));
    }

    suggestions
}

impl Checker for ModelChecker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, text: &str) -> Result<Vec<Correction>, CheckError> {
        Ok(self.corrections_from(&self.predictions(text)?))
    }

    fn suggest(&self, text: &str) -> Result<BTreeMap<String, String>, CheckError> {
        Ok(suggestions_from(&self.predictions(text)?))
    }

    /// One round of model queries feeds both corrections and suggestions.
    fn analyze_with_suggestions(
        &self,
        text: &str,
    ) -> Result<(Vec<Correction>, BTreeMap<String, String>), CheckError> {
        let predicted = self.predictions(text)?;
        Ok((self.corrections_from(&predicted), suggestions_from(&predicted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CorrectionKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers from a fixed table keyed by the masked sentence.
    struct FixedModel(HashMap<String, Vec<MaskPrediction>>);

    impl FixedModel {
        fn new(entries: Vec<(&str, Vec<(&str, f32)>)>) -> Self {
            let table = entries
                .into_iter()
                .map(|(masked, predictions)| {
                    let predictions = predictions
                        .into_iter()
                        .map(|(token, score)| MaskPrediction {
                            token: token.to_string(),
                            score,
                        })
                        .collect();
                    (masked.to_string(), predictions)
                })
                .collect();
            Self(table)
        }
    }

    impl MaskedLanguageModel for FixedModel {
        fn fill_mask(&self, masked: &str) -> Result<Vec<MaskPrediction>, CheckError> {
            Ok(self.0.get(masked).cloned().unwrap_or_default())
        }
    }

    /// Counts queries and never predicts anything.
    struct CountingModel(Arc<AtomicUsize>);

    impl MaskedLanguageModel for CountingModel {
        fn fill_mask(&self, _masked: &str) -> Result<Vec<MaskPrediction>, CheckError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct DownModel;

    impl MaskedLanguageModel for DownModel {
        fn fill_mask(&self, _masked: &str) -> Result<Vec<MaskPrediction>, CheckError> {
            Err(CheckError::model("connection refused"))
        }
    }

    #[test]
    fn test_confident_prediction_replaces_word() {
        let model = FixedModel::new(vec![
            ("[MASK] பள்ளிக்கு சல்கிறேன்", vec![("நான்", 0.9)]),
            ("நான் [MASK] சல்கிறேன்", vec![("பள்ளிக்கு", 0.8)]),
            ("நான் பள்ளிக்கு [MASK]", vec![("செல்கிறேன்", 0.7), ("போகிறேன்", 0.2)]),
        ]);
        let checker = ModelChecker::new(Box::new(model));

        let corrections = checker.check_text("நான் பள்ளிக்கு சல்கிறேன்.");
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].kind, CorrectionKind::Spelling);
        assert_eq!(corrections[0].context, "சல்கிறேன்");
        assert_eq!(corrections[0].replacement.as_deref(), Some("செல்கிறேன்"));

        let suggestions = checker.suggestions("நான் பள்ளிக்கு சல்கிறேன்.");
        assert_eq!(suggestions["சல்கிறேன்"], "did you mean: செல்கிறேன், போகிறேன்");
    }

    #[test]
    fn test_check_queries_each_word_once() {
        let queries = Arc::new(AtomicUsize::new(0));
        let checker = ModelChecker::new(Box::new(CountingModel(Arc::clone(&queries))));

        let (corrections, suggestions) = checker.check("நான் பள்ளிக்கு செல்கிறேன். அவன் 2024 வந்தான்");
        assert!(corrections.is_empty());
        assert!(suggestions.is_empty());
        assert_eq!(queries.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_low_scores_are_ignored() {
        let model = FixedModel::new(vec![("[MASK]", vec![("அவன்", 0.1)])]);
        let checker = ModelChecker::new(Box::new(model)).with_threshold(0.5);
        assert!(checker.check_text("அவள்").is_empty());
    }

    #[test]
    fn test_unavailable_model_is_one_error() {
        let corrections = ModelChecker::unavailable().check_text("அவன் வந்தான்");
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].kind, CorrectionKind::Error);
        assert!(corrections[0].message.contains("no language model"));
    }

    #[test]
    fn test_backend_failure_is_contained() {
        let checker = ModelChecker::new(Box::new(DownModel));
        let corrections = checker.check_text("அவன் வந்தான்");
        assert_eq!(corrections.len(), 1);
        assert!(corrections[0].message.contains("connection refused"));
    }

    #[test]
    fn test_no_endpoint_means_unavailable() {
        let checker = ModelChecker::from_config(&ModelConfig::default(), Duration::from_secs(1));
        assert_eq!(checker.check_text("அவன்")[0].kind, CorrectionKind::Error);
    }

    #[test]
    fn test_prediction_wire_format() {
        let body = r#"[{"score": 0.42, "token": 1234, "token_str": "செல்கிறேன்", "sequence": "நான் செல்கிறேன்"}]"#;
        let predictions: Vec<MaskPrediction> = serde_json::from_str(body).unwrap();
        assert_eq!(predictions[0].token, "செல்கிறேன்");
        assert!((predictions[0].score - 0.42).abs() < f32::EPSILON);
    }
}

//! Runs several checkers over the same text and lines up what they found.

use crate::checker::{failure, Checker, ModelChecker, RuleBasedChecker, StatisticalChecker};
use crate::config::Config;
use crate::error::CheckError;
use crate::Correction;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

type Outcome = (Vec<Correction>, BTreeMap<String, String>);

/// Accuracy of a checker on one input: 100 minus 10 per correction, never
/// below zero.
pub fn score(corrections: &[Correction]) -> u32 {
    let penalty = u32::try_from(corrections.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(10);
    100u32.saturating_sub(penalty)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceScore {
    pub checker: String,
    pub accuracy: u32,
}

/// Per-checker corrections and suggestions, keyed by checker name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub results: BTreeMap<String, Vec<Correction>>,
    pub suggestions: BTreeMap<String, BTreeMap<String, String>>,
}

impl Comparison {
    pub fn scores(&self) -> Vec<PerformanceScore> {
        self.results
            .iter()
            .map(|(checker, corrections)| PerformanceScore {
                checker: checker.clone(),
                accuracy: score(corrections),
            })
            .collect()
    }

    /// Highest-scoring checker; ties go to the first name in order.
    pub fn best(&self) -> Option<PerformanceScore> {
        self.scores().into_iter().fold(None, |best, candidate| match best {
            Some(best) if best.accuracy >= candidate.accuracy => Some(best),
            _ => Some(candidate),
        })
    }

    pub fn total_corrections(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }
}

pub struct Aggregator {
    checkers: BTreeMap<String, Arc<dyn Checker>>,
    timeout: Duration,
    parallel: bool,
}

impl Aggregator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            checkers: BTreeMap::new(),
            timeout,
            parallel: false,
        }
    }

    /// Rule-based, statistical and model-based checkers, set up from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let rule_based = RuleBasedChecker::new(config)?;
        let statistical =
            StatisticalChecker::new().context("Failed to build statistical checker")?;
        let model = ModelChecker::from_config(&config.model, config.timeout());

        Ok(Self::new(config.timeout())
            .with_parallel(config.parallel)
            .with_checker(rule_based)
            .with_checker(statistical)
            .with_checker(model))
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_checker(mut self, checker: impl Checker + 'static) -> Self {
        self.register(Arc::new(checker));
        self
    }

    /// Adds `checker` under its own name, replacing any checker of that name.
    pub fn register(&mut self, checker: Arc<dyn Checker>) {
        self.checkers.insert(checker.name().to_string(), checker);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checkers.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Checker>> {
        self.checkers.get(name)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run every named checker over `text`.
    ///
    /// Each checker runs in isolation with its own time limit: a failure,
    /// panic or timeout shows up as a single `error` correction for that
    /// checker and leaves the others untouched. Results are keyed by name,
    /// so parallel runs produce the same `Comparison` as sequential ones.
    pub fn compare<S: AsRef<str>>(&self, text: &str, names: &[S]) -> Comparison {
        let selected: BTreeSet<&str> = names.iter().map(|name| name.as_ref()).collect();
        let mut comparison = Comparison::default();

        let mut pending = Vec::new();
        for name in selected {
            let Some(checker) = self.checkers.get(name) else {
                warn!(checker = name, "checker is not registered");
                let correction =
                    Correction::error(format!("checker `{}` is not registered", name), text);
                comparison.results.insert(name.to_string(), vec![correction]);
                comparison.suggestions.insert(name.to_string(), BTreeMap::new());
                continue;
            };

            let receiver = dispatch(name, checker, text);
            if self.parallel {
                pending.push((name, receiver));
            } else {
                let outcome = self.collect(name, text, &receiver, Instant::now() + self.timeout);
                record(&mut comparison, name, outcome);
            }
        }

        // Parallel jobs share one deadline
        let deadline = Instant::now() + self.timeout;
        for (name, receiver) in pending {
            let outcome = self.collect(name, text, &receiver, deadline);
            record(&mut comparison, name, outcome);
        }

        comparison
    }

    fn collect(
        &self,
        name: &str,
        text: &str,
        receiver: &Receiver<Outcome>,
        deadline: Instant,
    ) -> Outcome {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(checker = name, timeout_ms, "checker timed out");
                (
                    vec![failure(name, &CheckError::Timeout(self.timeout), text)],
                    BTreeMap::new(),
                )
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(checker = name, "checker job ended without a result");
                let error = CheckError::Panicked("job ended without a result".to_string());
                (vec![failure(name, &error, text)], BTreeMap::new())
            }
        }
    }
}

/// Start one checker job on a thread of its own. A job that outlives its
/// deadline keeps that thread until it returns; its result is dropped with
/// the receiver, and no other job waits on it.
fn dispatch(name: &str, checker: &Arc<dyn Checker>, text: &str) -> Receiver<Outcome> {
    let (sender, receiver) = mpsc::channel();
    let checker = Arc::clone(checker);
    let text = text.to_string();

    let spawned = thread::Builder::new()
        .name(format!("tamilchk-{}", name))
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| checker.check(&text)));
            // A panic drops the sender, which the receiver sees as disconnected
            if let Ok(outcome) = outcome {
                let _ = sender.send(outcome);
            }
        });

    // The closure, and with it the sender, is dropped when the spawn fails
    if let Err(e) = spawned {
        warn!(checker = name, error = %e, "failed to start checker thread");
    }

    receiver
}

fn record(comparison: &mut Comparison, name: &str, (corrections, suggestions): Outcome) {
    debug!(checker = name, corrections = corrections.len(), "checker finished");
    comparison.results.insert(name.to_string(), corrections);
    comparison.suggestions.insert(name.to_string(), suggestions);
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LOCAL_CONFIG_FILE: &str = ".tamilchk.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Overlay of `word,wordClass` lines on top of the built-in dictionary
    #[serde(default)]
    pub dictionary: Option<PathBuf>,

    /// Extra `[[rule]]` tables appended after the built-in rules
    #[serde(default)]
    pub rules: Option<PathBuf>,

    #[serde(default = "default_checkers")]
    pub checkers: Vec<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub parallel: bool,

    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Fill-mask inference endpoint; the model checker is unavailable without one
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the bearer token for `endpoint`
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_checkers() -> Vec<String> {
    vec!["Rule-based".to_string(), "Statistical".to_string()]
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_suggestions() -> usize {
    3
}

fn default_token_env() -> String {
    "TAMILCHK_MODEL_TOKEN".to_string()
}

fn default_threshold() -> f32 {
    0.5
}

fn default_top_k() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dictionary: None,
            rules: None,
            checkers: default_checkers(),
            timeout_ms: default_timeout_ms(),
            parallel: false,
            max_suggestions: default_max_suggestions(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: default_token_env(),
            threshold: default_threshold(),
            top_k: default_top_k(),
        }
    }
}

/// Values given on the command line; `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dictionary: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub checkers: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub parallel: bool,
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration with priority: CLI args > local config > global config > defaults
    pub fn load(overrides: Overrides) -> Result<Self> {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global_config = Self::from_file(&global_path)?;
                config = config.merge(global_config);
            }
        }

        // Load local config (overrides global), or the one named explicitly
        let local_path = overrides
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
        if local_path.exists() {
            let local_config = Self::from_file(&local_path)?;
            config = config.merge(local_config);
        } else if overrides.config_file.is_some() {
            anyhow::bail!("Config file not found: {}", local_path.display());
        }

        // Apply CLI overrides
        if overrides.dictionary.is_some() {
            config.dictionary = overrides.dictionary;
        }
        if overrides.rules.is_some() {
            config.rules = overrides.rules;
        }
        if !overrides.checkers.is_empty() {
            config.checkers = overrides.checkers;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if overrides.parallel {
            config.parallel = true;
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn merge(mut self, other: Self) -> Self {
        // Merge logic: other's values override self's if they differ from defaults
        if other.dictionary.is_some() {
            self.dictionary = other.dictionary;
        }
        if other.rules.is_some() {
            self.rules = other.rules;
        }
        if other.checkers != default_checkers() {
            self.checkers = other.checkers;
        }
        if other.timeout_ms != default_timeout_ms() {
            self.timeout_ms = other.timeout_ms;
        }
        if other.max_suggestions != default_max_suggestions() {
            self.max_suggestions = other.max_suggestions;
        }
        if other.model != ModelConfig::default() {
            self.model = other.model;
        }
        self.parallel = self.parallel || other.parallel;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tamilchk").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.checkers, vec!["Rule-based", "Statistical"]);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_suggestions, 3);
        assert!(!config.parallel);
        assert_eq!(config.model.endpoint, None);
    }

    #[test]
    fn test_merge_configs() {
        let base = Config::default();
        let override_config = Config {
            checkers: vec!["Rule-based".to_string()],
            timeout_ms: 250,
            ..Default::default()
        };

        let merged = base.merge(override_config);
        assert_eq!(merged.checkers, vec!["Rule-based"]);
        assert_eq!(merged.timeout_ms, 250);
        assert_eq!(merged.max_suggestions, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
dictionary = "data/tamil_dictionary.txt"
parallel = true

[model]
endpoint = "http://localhost:8080/fill-mask"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.dictionary, Some(PathBuf::from("data/tamil_dictionary.txt")));
        assert!(config.parallel);
        assert_eq!(config.checkers, default_checkers());
        assert_eq!(config.model.top_k, 5);
        assert_eq!(config.model.token_env, "TAMILCHK_MODEL_TOKEN");
    }

    #[test]
    fn test_explicit_config_file_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timeout_ms = 500").unwrap();

        let config = Config::load(Overrides {
            config_file: Some(file.path().to_path_buf()),
            checkers: vec!["Statistical".to_string()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.checkers, vec!["Statistical"]);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "timeout_ms = \"soon\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}

use anyhow::{anyhow, Context, Result};
use phc_lessons::{DEFAULT_LEDGER_PATH, DEFAULT_MAX_ENTRIES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = ".claude/memory/phc-config.json";

/// Thresholds and side-effect switches for the halt checkpoint.
///
/// Layered as defaults → JSON file → `PHC_*` environment variables; the CLI
/// applies its own flags last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckpointConfig {
    pub error_match_threshold: f64,
    pub max_iterations: u32,
    pub iteration_hard_limit: u32,
    pub weak_iteration_floor: u32,
    pub warning_quorum: usize,
    pub strong_precedent_similarity: f64,
    pub precedent_min_similarity: f64,
    pub auto_lesson: bool,
    pub lessons_path: PathBuf,
    pub max_entries: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            error_match_threshold: 0.70,
            max_iterations: 2,
            iteration_hard_limit: 4,
            weak_iteration_floor: 1,
            warning_quorum: 2,
            strong_precedent_similarity: 0.8,
            precedent_min_similarity: 0.3,
            auto_lesson: true,
            lessons_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CheckpointConfig {
    /// Loads `explicit` (which must exist) or, failing that, the default
    /// config file when present, then applies environment overrides.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(path) => Self::from_file(path).await?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
                    Self::from_file(default_path).await?
                } else {
                    log::debug!("No checkpoint config at {DEFAULT_CONFIG_PATH}, using defaults");
                    Self::default()
                }
            }
        };
        cfg.apply_env_from(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read checkpoint config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid checkpoint config {}", path.display()))
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup("PHC_ERROR_MATCH_THRESHOLD") {
            self.error_match_threshold = parse_env("PHC_ERROR_MATCH_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("PHC_MAX_ITERATIONS") {
            self.max_iterations = parse_env("PHC_MAX_ITERATIONS", &raw)?;
        }
        if let Some(raw) = lookup("PHC_ITERATION_HARD_LIMIT") {
            self.iteration_hard_limit = parse_env("PHC_ITERATION_HARD_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("PHC_LESSONS_PATH") {
            if !raw.trim().is_empty() {
                self.lessons_path = PathBuf::from(raw.trim());
            }
        }
        if let Some(raw) = lookup("PHC_AUTO_LESSON") {
            self.auto_lesson = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("error_match_threshold", self.error_match_threshold),
            ("strong_precedent_similarity", self.strong_precedent_similarity),
            ("precedent_min_similarity", self.precedent_min_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{name} must be within [0, 1], got {value}"));
            }
        }
        if self.iteration_hard_limit <= self.max_iterations {
            return Err(anyhow!(
                "iteration_hard_limit ({}) must be greater than max_iterations ({})",
                self.iteration_hard_limit,
                self.max_iterations
            ));
        }
        if self.warning_quorum == 0 {
            return Err(anyhow!("warning_quorum must be at least 1"));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| anyhow!("{key}={raw:?} is not valid: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_thresholds() {
        let cfg = CheckpointConfig::default();
        assert_eq!(cfg.error_match_threshold, 0.70);
        assert_eq!(cfg.max_iterations, 2);
        assert_eq!(cfg.iteration_hard_limit, 4);
        assert_eq!(cfg.lessons_path, PathBuf::from(".claude/memory/.esmc-lessons.json"));
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PHC_MAX_ITERATIONS", "3"),
            ("PHC_ITERATION_HARD_LIMIT", "6"),
            ("PHC_AUTO_LESSON", "off"),
            ("PHC_LESSONS_PATH", " /tmp/lessons.json "),
        ]);
        let mut cfg = CheckpointConfig::default();
        cfg.apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .expect("env applies");
        assert_eq!(cfg.max_iterations, 3);
        assert_eq!(cfg.iteration_hard_limit, 6);
        assert!(!cfg.auto_lesson);
        assert_eq!(cfg.lessons_path, PathBuf::from("/tmp/lessons.json"));
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut cfg = CheckpointConfig::default();
        let err = cfg
            .apply_env_from(|key| (key == "PHC_MAX_ITERATIONS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PHC_MAX_ITERATIONS"));
    }

    #[test]
    fn validate_rejects_inverted_iteration_limits() {
        let cfg = CheckpointConfig {
            max_iterations: 4,
            iteration_hard_limit: 4,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = CheckpointConfig {
            error_match_threshold: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn partial_file_keeps_defaults() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let path = temp.path().join("phc.json");
        std::fs::write(&path, r#"{"error_match_threshold": 0.5}"#).unwrap();
        let cfg = CheckpointConfig::from_file(&path).await.expect("load");
        assert_eq!(cfg.error_match_threshold, 0.5);
        assert_eq!(cfg.warning_quorum, 2);
    }
}

//! Merges four independently produced intelligence fragments into one
//! technical summary.
//!
//! | fragment | field read |
//! |---|---|
//! | `piu` | `goals[0]` (or `primary_goal`), goal count |
//! | `dki` | `domains` |
//! | `uip` | `workflow.name` (or `workflow`) |
//! | `pca` | `patterns[0]` |

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SynthesisError>;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Invalid JSON in {fragment}: {source}")]
    InvalidJson {
        fragment: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub const FRAGMENT_NAMES: [&str; 4] = ["piu", "dki", "uip", "pca"];

/// A fragment as handed to [`synthesize`]: raw CLI text or an already parsed value.
#[derive(Debug, Clone)]
pub enum Fragment {
    Raw(String),
    Parsed(Value),
}

impl From<&str> for Fragment {
    fn from(raw: &str) -> Self {
        Fragment::Raw(raw.to_string())
    }
}

impl From<String> for Fragment {
    fn from(raw: String) -> Self {
        Fragment::Raw(raw)
    }
}

impl From<Value> for Fragment {
    fn from(value: Value) -> Self {
        Fragment::Parsed(value)
    }
}

impl Fragment {
    fn into_value(self, fragment: &'static str) -> Result<Value> {
        match self {
            Fragment::Parsed(value) => Ok(value),
            Fragment::Raw(raw) => serde_json::from_str(&raw)
                .map_err(|source| SynthesisError::InvalidJson { fragment, source }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn from_goal_count(goals: usize) -> Self {
        match goals {
            0..=2 => Complexity::Low,
            3..=5 => Complexity::Medium,
            _ => Complexity::High,
        }
    }

    pub const fn estimated_scope(self) -> &'static str {
        match self {
            Complexity::Low => "small (single module)",
            Complexity::Medium => "moderate (several modules)",
            Complexity::High => "large (cross-cutting)",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TechnicalSynthesis {
    pub technical_summary: String,
    pub implementation_approach: String,
    pub complexity: Complexity,
    pub estimated_scope: String,
    pub timestamp: String,
}

pub fn synthesize(
    piu: impl Into<Fragment>,
    dki: impl Into<Fragment>,
    uip: impl Into<Fragment>,
    pca: impl Into<Fragment>,
) -> Result<TechnicalSynthesis> {
    let piu = piu.into().into_value("piu")?;
    let dki = dki.into().into_value("dki")?;
    let uip = uip.into().into_value("uip")?;
    let pca = pca.into().into_value("pca")?;

    let goals = piu.get("goals").and_then(Value::as_array);
    let goal_count = goals.map_or(0, Vec::len);
    let first_goal = goals
        .and_then(|g| g.first())
        .and_then(label)
        .or_else(|| piu.get("primary_goal").and_then(label))
        .unwrap_or_else(|| "unspecified goal".to_string());

    let domains: Vec<String> = dki
        .get("domains")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(label).collect())
        .unwrap_or_default();
    let domains = if domains.is_empty() {
        "general".to_string()
    } else {
        domains.join(", ")
    };

    let workflow = uip
        .get("workflow")
        .and_then(label)
        .unwrap_or_else(|| "standard".to_string());

    let pattern = pca
        .get("patterns")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .and_then(label)
        .unwrap_or_else(|| "none identified".to_string());

    let complexity = Complexity::from_goal_count(goal_count);

    Ok(TechnicalSynthesis {
        technical_summary: format!("{first_goal} (domains: {domains})"),
        implementation_approach: format!("Follow the {workflow} workflow using pattern: {pattern}"),
        complexity,
        estimated_scope: complexity.estimated_scope().to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

// Strings are used as-is; objects contribute their `name` (or `description`).
fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("description"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

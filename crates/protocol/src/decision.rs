use crate::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The approach an agent is about to take, as seen by the checkpoint.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Proposal {
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub approach: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Proposal {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_approach(mut self, approach: impl Into<String>) -> Self {
        self.approach = approach.into();
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ErrorSignatureMatch {
    #[serde(default)]
    pub detected: bool,
    #[serde(default, alias = "similarity", alias = "score")]
    pub match_score: f64,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct IterationCount {
    #[serde(default, alias = "iteration_count")]
    pub count: u32,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// A prior session or result that a detector considers similar to the
/// current proposal. Fields beyond the four known ones are kept verbatim.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Precedent {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub rank: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub similarity: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PrecedentMatch {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub precedents: Vec<Precedent>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct UserIntervention {
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub frustration_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HaltReason {
    pub component: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Created,
    Duplicate,
    Failed,
    Disabled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LessonOutcome {
    pub status: LessonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Verdict of one checkpoint evaluation. Built fresh per call and never
/// persisted; only the lesson derived from it reaches disk.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HaltDecision {
    #[serde(rename = "shouldHalt")]
    pub should_halt: bool,
    pub severity: Severity,
    pub reasons: Vec<HaltReason>,
    pub precedents: Vec<Precedent>,
    pub recommendations: Vec<String>,
    pub component_results: BTreeMap<String, Value>,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<LessonOutcome>,
}

impl HaltDecision {
    pub fn empty(timestamp: u64) -> Self {
        Self {
            should_halt: false,
            severity: Severity::None,
            reasons: Vec::new(),
            precedents: Vec::new(),
            recommendations: Vec::new(),
            component_results: BTreeMap::new(),
            timestamp,
            lesson: None,
        }
    }

    pub fn reasons_with(&self, severity: Severity) -> impl Iterator<Item = &HaltReason> {
        self.reasons.iter().filter(move |r| r.severity == severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decision_uses_camel_case_halt_flag() {
        let decision = HaltDecision::empty(42);
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["shouldHalt"], json!(false));
        assert_eq!(value["severity"], json!("none"));
        assert!(value.get("lesson").is_none());
    }

    #[test]
    fn precedent_keeps_unknown_fields() {
        let raw = json!({
            "source": "sessions",
            "rank": "critical",
            "session_id": "s-1",
            "similarity": 0.91,
            "summary": "same migration failed twice"
        });
        let precedent: Precedent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(precedent.rank, Severity::Critical);
        assert_eq!(precedent.extra["summary"], json!("same migration failed twice"));
        assert_eq!(serde_json::to_value(&precedent).unwrap(), raw);
    }

    #[test]
    fn detector_results_accept_sparse_input() {
        let err: ErrorSignatureMatch =
            serde_json::from_value(json!({"detected": true, "similarity": 0.8})).unwrap();
        assert_eq!(err.match_score, 0.8);
        assert_eq!(err.severity, Severity::None);

        let iter: IterationCount = serde_json::from_value(json!({"count": 3})).unwrap();
        assert_eq!(iter.count, 3);
    }
}

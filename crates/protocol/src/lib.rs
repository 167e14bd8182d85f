use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod decision;

pub use decision::{
    ErrorSignatureMatch, HaltDecision, HaltReason, IterationCount, LessonOutcome, LessonStatus,
    Precedent, PrecedentMatch, Proposal, UserIntervention,
};

pub const LEDGER_SCHEMA_VERSION: &str = "1.0";
pub const LEDGER_SYSTEM_NAME: &str = "phc";

/// Severity shared by detector results, halt reasons and lessons.
///
/// Ordering follows escalation: `None < Warning < Critical`. Deserialization is
/// lenient so collaborators that report `"high"` or `"warn"` still map onto the
/// three levels; anything unrecognised is treated as `None`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Severity {
    #[default]
    None,
    Warning,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn is_critical(self) -> bool {
        self == Severity::Critical
    }
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        Severity::from(raw.as_str())
    }
}

impl From<&str> for Severity {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" | "high" | "error" | "fatal" => Severity::Critical,
            "warning" | "warn" | "medium" => Severity::Warning,
            _ => Severity::None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error payload printed by the CLI (`{"error": ..., "code": ...}`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

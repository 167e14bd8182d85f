use phc_protocol::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const LESSON_ID_PREFIX: &str = "lesson-";

/// A persisted lesson. Never mutated after it is written; it only leaves the
/// ledger through eviction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub lesson: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    #[serde(default)]
    pub components_affected: Vec<String>,
    #[serde(default)]
    pub frustration_score: f64,
    #[serde(default)]
    pub repetition_count: u32,
    #[serde(default)]
    pub auto_generated: bool,
    #[serde(default)]
    pub phc_halt: bool,
    #[serde(default)]
    pub precedent_count: usize,
    #[serde(default)]
    pub halt_reasons: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lesson {
    /// Numeric suffix of `lesson-NNN`; ids in any other shape count as 0.
    pub fn numeric_id(&self) -> u64 {
        let digits: String = self
            .id
            .chars()
            .rev()
            .take_while(char::is_ascii_digit)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        digits.parse().unwrap_or(0)
    }

    pub fn is_critical(&self) -> bool {
        self.severity.is_critical()
    }
}

/// Everything a caller decides about a new lesson. The ledger assigns `id`
/// and `date` when the draft is recorded.
#[derive(Debug, Clone, Default)]
pub struct LessonDraft {
    pub category: String,
    pub severity: Severity,
    pub lesson: String,
    pub context: String,
    pub trigger_keywords: Vec<String>,
    pub components_affected: Vec<String>,
    pub frustration_score: f64,
    pub repetition_count: u32,
    pub auto_generated: bool,
    pub phc_halt: bool,
    pub precedent_count: usize,
    pub halt_reasons: Vec<String>,
}

impl LessonDraft {
    pub(crate) fn into_lesson(self, id: String, date: String) -> Lesson {
        Lesson {
            id,
            date,
            category: self.category,
            severity: self.severity,
            lesson: self.lesson,
            context: self.context,
            trigger_keywords: self.trigger_keywords,
            components_affected: self.components_affected,
            frustration_score: self.frustration_score,
            repetition_count: self.repetition_count,
            auto_generated: self.auto_generated,
            phc_halt: self.phc_halt,
            precedent_count: self.precedent_count,
            halt_reasons: self.halt_reasons,
            extra: Map::new(),
        }
    }
}

pub fn format_lesson_id(n: u64) -> String {
    format!("{LESSON_ID_PREFIX}{n:03}")
}

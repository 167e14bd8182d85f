use crate::lesson::{format_lesson_id, Lesson, LessonDraft};
use chrono::{SecondsFormat, Utc};
use phc_protocol::{LEDGER_SCHEMA_VERSION, LEDGER_SYSTEM_NAME};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ENTRIES: usize = 100;

// Keywords shorter than this are substrings of too many stored keywords.
const MIN_KEYWORD_CHARS: usize = 3;

/// On-disk shape of the lessons ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonLedger {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_system")]
    pub system: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_version() -> String {
    LEDGER_SCHEMA_VERSION.to_string()
}

fn default_system() -> String {
    LEDGER_SYSTEM_NAME.to_string()
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Created { lesson: Lesson, evicted: Vec<Lesson> },
    Duplicate { existing_id: String },
}

impl LessonLedger {
    pub fn new(max_entries: usize) -> Self {
        let now = now_rfc3339();
        Self {
            version: default_version(),
            system: default_system(),
            created: now.clone(),
            last_updated: now,
            lessons: Vec::new(),
            max_entries,
        }
    }

    pub fn next_id(&self) -> String {
        let max = self.lessons.iter().map(Lesson::numeric_id).max().unwrap_or(0);
        format_lesson_id(max + 1)
    }

    /// First stored lesson that shares a trigger keyword with `keywords`.
    ///
    /// A keyword matches when it is a substring of a stored trigger keyword
    /// or a stored trigger keyword is a substring of it. Comparison is
    /// case-insensitive. The lesson text is not consulted: it carries
    /// generated wording that would match unrelated proposals.
    pub fn find_similar(&self, keywords: &[String]) -> Option<&Lesson> {
        let wanted: Vec<String> = normalize_keywords(keywords);
        if wanted.is_empty() {
            return None;
        }

        self.lessons.iter().find(|lesson| {
            let stored = normalize_keywords(&lesson.trigger_keywords);
            wanted.iter().any(|kw| {
                stored
                    .iter()
                    .any(|s| s.contains(kw.as_str()) || kw.contains(s.as_str()))
            })
        })
    }

    /// Records `draft` unless a similar lesson already exists, then applies
    /// the entry cap.
    pub fn record(&mut self, draft: LessonDraft) -> RecordOutcome {
        if let Some(existing) = self.find_similar(&draft.trigger_keywords) {
            return RecordOutcome::Duplicate {
                existing_id: existing.id.clone(),
            };
        }

        let lesson = draft.into_lesson(self.next_id(), now_rfc3339());
        self.lessons.push(lesson.clone());
        let evicted = self.enforce_cap(Some(lesson.id.as_str()));
        self.last_updated = now_rfc3339();
        RecordOutcome::Created { lesson, evicted }
    }

    /// Drops lessons oldest-first until the ledger fits `max_entries`.
    /// Non-critical lessons go first; critical ones are evicted only when
    /// nothing else is left. The lesson named by `keep` is never evicted.
    pub fn enforce_cap(&mut self, keep: Option<&str>) -> Vec<Lesson> {
        let cap = self.max_entries.max(1);
        let mut evicted = Vec::new();
        while self.lessons.len() > cap {
            let candidate = |lesson: &Lesson| keep != Some(lesson.id.as_str());
            let Some(pos) = self
                .lessons
                .iter()
                .position(|l| candidate(l) && !l.is_critical())
                .or_else(|| self.lessons.iter().position(candidate))
            else {
                break;
            };
            evicted.push(self.lessons.remove(pos));
        }
        evicted
    }
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| kw.chars().count() >= MIN_KEYWORD_CHARS)
        .collect()
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

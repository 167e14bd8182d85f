use crate::detector::Detector;
use crate::text::{trigger_keywords, truncate_one_line};
use anyhow::Result;
use async_trait::async_trait;
use phc_lessons::LessonStore;
use phc_protocol::{Precedent, PrecedentMatch, Proposal};
use serde_json::{json, Map};
use std::collections::HashSet;

pub const LESSONS_SOURCE: &str = "lessons";
const MAX_PRECEDENTS: usize = 5;

/// Cross-session precedent matcher backed by the lessons ledger.
///
/// Scores each stored lesson by the Jaccard overlap between its trigger
/// keywords and the proposal's.
#[derive(Debug, Clone)]
pub struct LedgerPrecedentDetector {
    store: LessonStore,
    min_similarity: f64,
}

impl LedgerPrecedentDetector {
    pub fn new(store: LessonStore, min_similarity: f64) -> Self {
        Self {
            store,
            min_similarity,
        }
    }
}

#[async_trait]
impl Detector for LedgerPrecedentDetector {
    type Output = PrecedentMatch;

    async fn detect(&self, proposal: &Proposal) -> Result<PrecedentMatch> {
        let wanted: HashSet<String> = trigger_keywords(proposal).into_iter().collect();
        if wanted.is_empty() {
            return Ok(PrecedentMatch::default());
        }

        let ledger = self.store.load().await?;
        let mut precedents: Vec<Precedent> = ledger
            .lessons
            .iter()
            .filter_map(|lesson| {
                let stored: HashSet<String> = lesson
                    .trigger_keywords
                    .iter()
                    .map(|kw| kw.trim().to_lowercase())
                    .filter(|kw| !kw.is_empty())
                    .collect();
                let similarity = jaccard(&wanted, &stored);
                if similarity < self.min_similarity || similarity == 0.0 {
                    return None;
                }
                let mut extra = Map::new();
                extra.insert("lesson_id".to_string(), json!(lesson.id));
                extra.insert(
                    "lesson".to_string(),
                    json!(truncate_one_line(&lesson.lesson, 160)),
                );
                Some(Precedent {
                    source: LESSONS_SOURCE.to_string(),
                    rank: lesson.severity,
                    session_id: None,
                    similarity,
                    extra,
                })
            })
            .collect();

        precedents.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        precedents.truncate(MAX_PRECEDENTS);
        log::debug!(
            "Ledger precedent search over {} lessons found {}",
            ledger.lessons.len(),
            precedents.len()
        );

        Ok(PrecedentMatch {
            found: !precedents.is_empty(),
            precedents,
        })
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use phc_lessons::LessonDraft;
    use phc_protocol::Severity;
    use tempfile::TempDir;

    async fn seeded_store(temp: &TempDir) -> LessonStore {
        let store = LessonStore::new(temp.path().join("lessons.json"), 50);
        for (keywords, severity) in [
            (vec!["migration", "schema", "postgres"], Severity::Critical),
            (vec!["frontend", "styling"], Severity::Warning),
        ] {
            store
                .record(LessonDraft {
                    severity,
                    lesson: format!("halted {}", keywords.join(" and ")),
                    trigger_keywords: keywords.into_iter().map(String::from).collect(),
                    ..Default::default()
                })
                .await
                .expect("seed lesson");
        }
        store
    }

    #[tokio::test]
    async fn overlapping_keywords_become_precedents() {
        let temp = TempDir::new().expect("tempdir");
        let detector = LedgerPrecedentDetector::new(seeded_store(&temp).await, 0.3);
        let proposal = Proposal::new("run the migration again").with_keywords(["migration", "schema"]);

        let out = detector.detect(&proposal).await.expect("detect");
        assert!(out.found);
        assert_eq!(out.precedents.len(), 1);
        let best = &out.precedents[0];
        assert_eq!(best.source, LESSONS_SOURCE);
        assert_eq!(best.rank, Severity::Critical);
        assert!((best.similarity - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(best.extra["lesson_id"], "lesson-001");
    }

    #[tokio::test]
    async fn empty_ledger_finds_nothing() {
        let temp = TempDir::new().expect("tempdir");
        let store = LessonStore::new(temp.path().join("none.json"), 50);
        let detector = LedgerPrecedentDetector::new(store, 0.3);
        let out = detector
            .detect(&Proposal::new("anything").with_keywords(["cache"]))
            .await
            .expect("detect");
        assert_eq!(out, PrecedentMatch::default());
    }
}

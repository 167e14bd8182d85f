use crate::config::CheckpointConfig;
use crate::detector::{
    run_detector, DetectorRun, Detectors, ERROR_SIGNATURE, ITERATION_COUNTER, PRECEDENT_MATCHER,
    USER_INTERVENTION,
};
use crate::recommendations::build_recommendations;
use crate::rules::{assess, Signals};
use crate::text::{proposal_subject, trigger_keywords, truncate_one_line};
use phc_lessons::{LessonDraft, LessonStore, RecordOutcome};
use phc_protocol::{HaltDecision, LessonOutcome, LessonStatus, Proposal};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const LESSON_CATEGORY: &str = "approach_halt";

/// The halt checkpoint: fans out to the configured detectors, applies the
/// thresholds and, on halt, files a lesson.
pub struct HaltCheckpoint {
    config: CheckpointConfig,
    detectors: Detectors,
    lessons: Option<LessonStore>,
}

impl HaltCheckpoint {
    pub fn new(config: CheckpointConfig) -> Self {
        let lessons = Some(LessonStore::new(
            config.lessons_path.clone(),
            config.max_entries,
        ));
        Self {
            config,
            detectors: Detectors::default(),
            lessons,
        }
    }

    #[must_use]
    pub fn with_detectors(mut self, detectors: Detectors) -> Self {
        self.detectors = detectors;
        self
    }

    /// Evaluates without ever touching the lessons ledger.
    #[must_use]
    pub fn without_lessons(mut self) -> Self {
        self.lessons = None;
        self
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    pub async fn evaluate(&self, proposal: &Proposal) -> HaltDecision {
        let (error_signature, iteration, precedent, user_intervention) = tokio::join!(
            run_detector(
                ERROR_SIGNATURE,
                self.detectors.error_signature.as_ref(),
                proposal
            ),
            run_detector(
                ITERATION_COUNTER,
                self.detectors.iteration.as_ref(),
                proposal
            ),
            run_detector(
                PRECEDENT_MATCHER,
                self.detectors.precedent.as_ref(),
                proposal
            ),
            run_detector(
                USER_INTERVENTION,
                self.detectors.user_intervention.as_ref(),
                proposal
            ),
        );

        let mut component_results = BTreeMap::new();
        let signals = Signals {
            error_signature: settle(ERROR_SIGNATURE, error_signature, &mut component_results),
            iteration: settle(ITERATION_COUNTER, iteration, &mut component_results),
            precedent: settle(PRECEDENT_MATCHER, precedent, &mut component_results),
            user_intervention: settle(
                USER_INTERVENTION,
                user_intervention,
                &mut component_results,
            ),
        };

        let assessment = assess(&self.config, &signals);
        let mut decision = HaltDecision::empty(unix_ms_now());
        decision.should_halt = assessment.should_halt;
        decision.severity = assessment.severity;
        decision.reasons = assessment.reasons;
        decision.precedents = assessment.precedents;
        decision.component_results = component_results;

        if decision.should_halt {
            decision.recommendations =
                build_recommendations(proposal, &decision.reasons, &decision.precedents);
            decision.lesson = Some(self.record_lesson(proposal, &decision, &signals).await);
            log::info!(
                "Checkpoint halted '{}' ({}, {} reason(s))",
                proposal_subject(proposal, 80),
                decision.severity,
                decision.reasons.len()
            );
        } else {
            log::debug!("Checkpoint passed '{}'", proposal_subject(proposal, 80));
        }

        decision
    }

    async fn record_lesson(
        &self,
        proposal: &Proposal,
        decision: &HaltDecision,
        signals: &Signals,
    ) -> LessonOutcome {
        let store = match (&self.lessons, self.config.auto_lesson) {
            (Some(store), true) => store,
            _ => {
                return LessonOutcome {
                    status: LessonStatus::Disabled,
                    id: None,
                    message: None,
                }
            }
        };

        match store.record(lesson_draft(proposal, decision, signals)).await {
            Ok(RecordOutcome::Created { lesson, .. }) => LessonOutcome {
                status: LessonStatus::Created,
                id: Some(lesson.id),
                message: None,
            },
            Ok(RecordOutcome::Duplicate { existing_id }) => LessonOutcome {
                status: LessonStatus::Duplicate,
                id: Some(existing_id),
                message: None,
            },
            Err(err) => {
                log::warn!(
                    "Failed to record lesson in {}: {err}",
                    store.path().display()
                );
                LessonOutcome {
                    status: LessonStatus::Failed,
                    id: None,
                    message: Some(err.to_string()),
                }
            }
        }
    }
}

fn settle<T: Serialize>(
    name: &str,
    run: Option<DetectorRun<T>>,
    results: &mut BTreeMap<String, Value>,
) -> Option<T> {
    match run? {
        Ok(value) => {
            let raw = serde_json::to_value(&value)
                .unwrap_or_else(|err| json!({ "error": format!("unserializable result: {err}") }));
            results.insert(name.to_string(), raw);
            Some(value)
        }
        Err(message) => {
            results.insert(name.to_string(), json!({ "error": message }));
            None
        }
    }
}

fn lesson_draft(proposal: &Proposal, decision: &HaltDecision, signals: &Signals) -> LessonDraft {
    let mut components: Vec<String> = Vec::new();
    for reason in &decision.reasons {
        if !components.contains(&reason.component) {
            components.push(reason.component.clone());
        }
    }
    let primary = decision
        .reasons
        .iter()
        .max_by_key(|r| r.severity)
        .map(|r| r.message.as_str())
        .unwrap_or("halted by checkpoint");

    LessonDraft {
        category: LESSON_CATEGORY.to_string(),
        severity: decision.severity,
        lesson: format!("Halted '{}': {primary}", proposal_subject(proposal, 80)),
        context: truncate_one_line(&proposal.description, 200),
        trigger_keywords: trigger_keywords(proposal),
        components_affected: components,
        frustration_score: signals
            .user_intervention
            .as_ref()
            .map_or(0.0, |u| u.frustration_score),
        repetition_count: signals.iteration.as_ref().map_or(0, |c| c.count),
        auto_generated: true,
        phc_halt: true,
        precedent_count: decision.precedents.len(),
        halt_reasons: decision.reasons.iter().map(|r| r.message.clone()).collect(),
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{Detector, DynDetector, StaticDetector};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use phc_protocol::{
        ErrorSignatureMatch, IterationCount, PrecedentMatch, Severity, UserIntervention,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Failing;

    #[async_trait]
    impl Detector for Failing {
        type Output = UserIntervention;

        async fn detect(&self, _proposal: &Proposal) -> Result<UserIntervention> {
            Err(anyhow!("intervention feed unavailable"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Detector for Panicking {
        type Output = PrecedentMatch;

        async fn detect(&self, _proposal: &Proposal) -> Result<PrecedentMatch> {
            panic!("precedent index corrupted");
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl Detector for Slow {
        type Output = IterationCount;

        async fn detect(&self, _proposal: &Proposal) -> Result<IterationCount> {
            tokio::time::sleep(self.0).await;
            Ok(IterationCount {
                count: 1,
                ..Default::default()
            })
        }
    }

    fn config_in(temp: &TempDir) -> CheckpointConfig {
        CheckpointConfig {
            lessons_path: temp.path().join(".claude/memory/.esmc-lessons.json"),
            ..Default::default()
        }
    }

    fn critical_error() -> DynDetector<ErrorSignatureMatch> {
        StaticDetector::shared(ErrorSignatureMatch {
            detected: true,
            match_score: 0.92,
            severity: Severity::Critical,
            signature: Some("ENOSPC".to_string()),
            message: None,
        })
    }

    fn proposal(keyword: &str) -> Proposal {
        Proposal::new(format!("Retry the {keyword} job"))
            .with_keywords([keyword])
            .with_approach(format!("rerun {keyword}"))
    }

    async fn lesson_count(cfg: &CheckpointConfig) -> usize {
        LessonStore::new(cfg.lessons_path.clone(), cfg.max_entries)
            .load()
            .await
            .expect("load ledger")
            .lessons
            .len()
    }

    #[tokio::test]
    async fn no_signal_no_halt_no_lesson() {
        let temp = TempDir::new().expect("tempdir");
        let cfg = config_in(&temp);
        let checkpoint = HaltCheckpoint::new(cfg.clone()).with_detectors(Detectors {
            error_signature: Some(StaticDetector::shared(ErrorSignatureMatch::default())),
            iteration: Some(StaticDetector::shared(IterationCount {
                count: 1,
                ..Default::default()
            })),
            precedent: Some(StaticDetector::shared(PrecedentMatch::default())),
            user_intervention: Some(StaticDetector::shared(UserIntervention::default())),
        });

        let decision = checkpoint.evaluate(&proposal("backup")).await;
        assert!(!decision.should_halt);
        assert_eq!(decision.severity, Severity::None);
        assert!(decision.recommendations.is_empty());
        assert!(decision.lesson.is_none());
        assert_eq!(decision.component_results.len(), 4);
        assert!(!cfg.lessons_path.exists());
    }

    #[tokio::test]
    async fn single_critical_detector_halts_and_files_lesson() {
        let temp = TempDir::new().expect("tempdir");
        let cfg = config_in(&temp);
        let checkpoint = HaltCheckpoint::new(cfg.clone()).with_detectors(Detectors {
            error_signature: Some(critical_error()),
            ..Default::default()
        });

        let decision = checkpoint.evaluate(&proposal("deploy")).await;
        assert!(decision.should_halt);
        assert_eq!(decision.severity, Severity::Critical);
        assert!(!decision.recommendations.is_empty());
        assert_eq!(
            decision.lesson.as_ref().map(|l| l.status),
            Some(LessonStatus::Created)
        );
        assert_eq!(lesson_count(&cfg).await, 1);

        let ledger = LessonStore::new(cfg.lessons_path.clone(), 100)
            .load()
            .await
            .unwrap();
        let lesson = &ledger.lessons[0];
        assert_eq!(lesson.category, LESSON_CATEGORY);
        assert_eq!(lesson.severity, Severity::Critical);
        assert_eq!(lesson.trigger_keywords, vec!["deploy"]);
        assert_eq!(lesson.components_affected, vec![ERROR_SIGNATURE]);
        assert!(lesson.auto_generated && lesson.phc_halt);
        assert!(lesson.lesson.starts_with("Halted 'rerun deploy'"));
    }

    #[tokio::test]
    async fn repeated_halt_on_same_topic_files_one_lesson() {
        let temp = TempDir::new().expect("tempdir");
        let cfg = config_in(&temp);
        let checkpoint = HaltCheckpoint::new(cfg.clone()).with_detectors(Detectors {
            error_signature: Some(critical_error()),
            ..Default::default()
        });

        checkpoint.evaluate(&proposal("deploy")).await;
        let second = checkpoint
            .evaluate(&Proposal::new("deploy to staging").with_keywords(["deploy", "staging"]))
            .await;
        assert_eq!(
            second.lesson.map(|l| (l.status, l.id)),
            Some((LessonStatus::Duplicate, Some("lesson-001".to_string())))
        );
        assert_eq!(lesson_count(&cfg).await, 1);
    }

    #[tokio::test]
    async fn failing_detector_is_isolated() {
        let temp = TempDir::new().expect("tempdir");
        let checkpoint = HaltCheckpoint::new(config_in(&temp))
            .without_lessons()
            .with_detectors(Detectors {
                error_signature: Some(critical_error()),
                user_intervention: Some(Arc::new(Failing)),
                ..Default::default()
            });

        let decision = checkpoint.evaluate(&proposal("deploy")).await;
        assert!(decision.should_halt);
        assert_eq!(
            decision.component_results[USER_INTERVENTION],
            json!({ "error": "intervention feed unavailable" })
        );
        assert_eq!(
            decision.component_results[ERROR_SIGNATURE]["match_score"],
            json!(0.92)
        );
        assert_eq!(
            decision.lesson.map(|l| l.status),
            Some(LessonStatus::Disabled)
        );
    }

    #[tokio::test]
    async fn lesson_write_failure_does_not_change_decision() {
        let temp = TempDir::new().expect("tempdir");
        let mut cfg = config_in(&temp);
        // A directory where the ledger file should be makes every read fail.
        std::fs::create_dir_all(&cfg.lessons_path).unwrap();
        cfg.max_entries = 10;
        let checkpoint = HaltCheckpoint::new(cfg).with_detectors(Detectors {
            error_signature: Some(critical_error()),
            ..Default::default()
        });

        let decision = checkpoint.evaluate(&proposal("deploy")).await;
        assert!(decision.should_halt);
        assert_eq!(decision.severity, Severity::Critical);
        let lesson = decision.lesson.expect("lesson outcome");
        assert_eq!(lesson.status, LessonStatus::Failed);
        assert!(lesson.message.is_some());
    }

    #[tokio::test]
    async fn auto_lesson_off_skips_ledger() {
        let temp = TempDir::new().expect("tempdir");
        let cfg = CheckpointConfig {
            auto_lesson: false,
            ..config_in(&temp)
        };
        let checkpoint = HaltCheckpoint::new(cfg.clone()).with_detectors(Detectors {
            error_signature: Some(critical_error()),
            ..Default::default()
        });
        let decision = checkpoint.evaluate(&proposal("deploy")).await;
        assert_eq!(
            decision.lesson.map(|l| l.status),
            Some(LessonStatus::Disabled)
        );
        assert!(!cfg.lessons_path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_detector_does_not_cancel_slow_sibling() {
        let temp = TempDir::new().expect("tempdir");
        let checkpoint = HaltCheckpoint::new(config_in(&temp))
            .without_lessons()
            .with_detectors(Detectors {
                iteration: Some(Arc::new(Slow(Duration::from_secs(5)))),
                user_intervention: Some(Arc::new(Failing)),
                ..Default::default()
            });

        let decision = checkpoint.evaluate(&proposal("index")).await;
        assert!(!decision.should_halt);
        assert_eq!(decision.component_results[ITERATION_COUNTER]["count"], json!(1));
        assert!(decision.component_results[USER_INTERVENTION]
            .get("error")
            .is_some());
    }

    #[tokio::test]
    async fn panicking_detector_is_recorded_as_error() {
        let temp = TempDir::new().expect("tempdir");
        let checkpoint = HaltCheckpoint::new(config_in(&temp))
            .without_lessons()
            .with_detectors(Detectors {
                error_signature: Some(critical_error()),
                precedent: Some(Arc::new(Panicking)),
                ..Default::default()
            });

        let decision = checkpoint.evaluate(&proposal("deploy")).await;
        assert!(decision.should_halt);
        assert_eq!(decision.severity, Severity::Critical);
        assert_eq!(
            decision.component_results[PRECEDENT_MATCHER],
            json!({ "error": "detector panicked: precedent index corrupted" })
        );
        assert!(decision.precedents.is_empty());
    }
}

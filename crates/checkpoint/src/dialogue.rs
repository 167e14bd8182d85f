use crate::text::{proposal_subject, truncate_one_line};
use phc_protocol::{HaltDecision, LessonStatus, Proposal};

/// Console rendering of a checkpoint decision.
pub fn render_dialogue(decision: &HaltDecision, proposal: &Proposal) -> String {
    let mut out = String::new();
    out.push_str("=== Halt checkpoint ===\n");
    out.push_str(&format!("Proposal: {}\n", proposal_subject(proposal, 120)));
    let verdict = if decision.should_halt { "HALT" } else { "PROCEED" };
    out.push_str(&format!("Decision: {verdict} (severity: {})\n", decision.severity));

    if !decision.reasons.is_empty() {
        out.push_str("\nReasons:\n");
        for reason in &decision.reasons {
            out.push_str(&format!(
                "  - [{}] {}: {}\n",
                reason.severity,
                reason.component,
                truncate_one_line(&reason.message, 160)
            ));
        }
    }

    if !decision.precedents.is_empty() {
        out.push_str("\nPrecedents:\n");
        for precedent in &decision.precedents {
            let label = precedent
                .session_id
                .clone()
                .or_else(|| {
                    precedent
                        .extra
                        .get("lesson_id")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "n/a".to_string());
            out.push_str(&format!(
                "  - {} {label} (similarity {:.2}, rank {})\n",
                if precedent.source.is_empty() {
                    "unknown"
                } else {
                    precedent.source.as_str()
                },
                precedent.similarity,
                precedent.rank
            ));
        }
    }

    let failed: Vec<(&String, &serde_json::Value)> = decision
        .component_results
        .iter()
        .filter(|(_, v)| v.get("error").is_some())
        .collect();
    if !failed.is_empty() {
        out.push_str("\nUnavailable detectors:\n");
        for (name, value) in failed {
            out.push_str(&format!(
                "  - {name}: {}\n",
                value["error"].as_str().unwrap_or("unknown error")
            ));
        }
    }

    if !decision.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for (idx, rec) in decision.recommendations.iter().enumerate() {
            out.push_str(&format!("  {}. {rec}\n", idx + 1));
        }
    }

    if let Some(lesson) = &decision.lesson {
        let line = match (lesson.status, lesson.id.as_deref()) {
            (LessonStatus::Created, Some(id)) => format!("Lesson recorded as {id}"),
            (LessonStatus::Duplicate, Some(id)) => format!("Similar lesson already on file: {id}"),
            (LessonStatus::Disabled, _) => "Lesson recording disabled".to_string(),
            (_, _) => format!(
                "Lesson not recorded: {}",
                lesson.message.as_deref().unwrap_or("unknown reason")
            ),
        };
        out.push_str(&format!("\n{line}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use phc_protocol::{HaltReason, LessonOutcome, Precedent, Severity};
    use serde_json::json;

    #[test]
    fn halt_dialogue_lists_everything() {
        let mut decision = HaltDecision::empty(0);
        decision.should_halt = true;
        decision.severity = Severity::Critical;
        decision.reasons.push(HaltReason {
            component: "iteration_counter".to_string(),
            severity: Severity::Critical,
            message: "Approach attempted 4 times (hard limit 4)".to_string(),
            details: json!({}),
        });
        decision.precedents.push(Precedent {
            source: "sessions".to_string(),
            session_id: Some("s-7".to_string()),
            similarity: 0.9,
            ..Default::default()
        });
        decision
            .component_results
            .insert("user_intervention".to_string(), json!({"error": "timeout"}));
        decision.recommendations.push("Stop.".to_string());
        decision.lesson = Some(LessonOutcome {
            status: LessonStatus::Created,
            id: Some("lesson-003".to_string()),
            message: None,
        });

        let text = render_dialogue(&decision, &Proposal::new("retry deploy"));
        assert!(text.contains("Decision: HALT (severity: critical)"));
        assert!(text.contains("[critical] iteration_counter: Approach attempted 4 times"));
        assert!(text.contains("sessions s-7 (similarity 0.90, rank none)"));
        assert!(text.contains("user_intervention: timeout"));
        assert!(text.contains("1. Stop."));
        assert!(text.contains("Lesson recorded as lesson-003"));
    }

    #[test]
    fn proceed_dialogue_is_short() {
        let text = render_dialogue(&HaltDecision::empty(0), &Proposal::new("read docs"));
        assert!(text.contains("Decision: PROCEED (severity: none)"));
        assert!(!text.contains("Reasons:"));
    }
}

use crate::config::CheckpointConfig;
use crate::detector::{
    COMBINED_SIGNAL, ERROR_SIGNATURE, ITERATION_COUNTER, PRECEDENT_MATCHER, USER_INTERVENTION,
};
use phc_protocol::{
    ErrorSignatureMatch, HaltReason, IterationCount, Precedent, PrecedentMatch, Severity,
    UserIntervention,
};
use serde_json::json;

/// Detector results that came back successfully.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub error_signature: Option<ErrorSignatureMatch>,
    pub iteration: Option<IterationCount>,
    pub precedent: Option<PrecedentMatch>,
    pub user_intervention: Option<UserIntervention>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub should_halt: bool,
    pub severity: Severity,
    pub reasons: Vec<HaltReason>,
    pub precedents: Vec<Precedent>,
}

/// Applies the static halt thresholds to the collected signals.
pub fn assess(cfg: &CheckpointConfig, signals: &Signals) -> Assessment {
    let mut reasons = Vec::new();

    if let Some(reason) = signals
        .error_signature
        .as_ref()
        .and_then(|m| error_signature_reason(cfg, m))
    {
        reasons.push(reason);
    }
    if let Some(reason) = signals
        .iteration
        .as_ref()
        .and_then(|c| iteration_reason(cfg, c))
    {
        reasons.push(reason);
    }

    let mut precedents = signals
        .precedent
        .as_ref()
        .filter(|m| m.found)
        .map(|m| m.precedents.clone())
        .unwrap_or_default();
    precedents.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    if let Some(reason) = precedent_reason(cfg, &precedents) {
        reasons.push(reason);
    }

    if let Some(reason) = signals
        .user_intervention
        .as_ref()
        .and_then(intervention_reason)
    {
        reasons.push(reason);
    }

    let critical = reasons.iter().any(|r| r.severity.is_critical());
    let warnings = reasons
        .iter()
        .filter(|r| r.severity == Severity::Warning)
        .count();

    let (should_halt, severity) = if critical {
        (true, Severity::Critical)
    } else if warnings >= cfg.warning_quorum {
        (true, Severity::Warning)
    } else if let Some(reason) = combined_weak_signal(cfg, signals) {
        reasons.push(reason);
        (true, Severity::Warning)
    } else if warnings > 0 {
        (false, Severity::Warning)
    } else {
        (false, Severity::None)
    };

    Assessment {
        should_halt,
        severity,
        reasons,
        precedents,
    }
}

fn error_signature_reason(cfg: &CheckpointConfig, m: &ErrorSignatureMatch) -> Option<HaltReason> {
    if !m.detected || m.match_score < cfg.error_match_threshold {
        return None;
    }
    let severity = if m.severity.is_critical() {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let signature = m.signature.as_deref().unwrap_or("unnamed signature");
    let message = m.message.clone().unwrap_or_else(|| {
        format!(
            "Proposal matches known error signature '{signature}' ({:.2})",
            m.match_score
        )
    });
    Some(HaltReason {
        component: ERROR_SIGNATURE.to_string(),
        severity,
        message,
        details: json!({
            "match_score": m.match_score,
            "signature": m.signature,
            "threshold": cfg.error_match_threshold,
        }),
    })
}

fn iteration_reason(cfg: &CheckpointConfig, c: &IterationCount) -> Option<HaltReason> {
    let (severity, message) = if c.count >= cfg.iteration_hard_limit {
        (
            Severity::Critical,
            format!(
                "Approach attempted {} times (hard limit {})",
                c.count, cfg.iteration_hard_limit
            ),
        )
    } else if c.count > cfg.max_iterations && c.severity.is_critical() {
        (
            Severity::Critical,
            format!(
                "Approach repeated {} times with critical failures (limit {})",
                c.count, cfg.max_iterations
            ),
        )
    } else if c.count > cfg.max_iterations {
        (
            Severity::Warning,
            format!(
                "Approach repeated {} times (limit {})",
                c.count, cfg.max_iterations
            ),
        )
    } else {
        return None;
    };
    Some(HaltReason {
        component: ITERATION_COUNTER.to_string(),
        severity,
        message,
        details: json!({
            "count": c.count,
            "topic": c.topic,
            "max_iterations": cfg.max_iterations,
            "hard_limit": cfg.iteration_hard_limit,
        }),
    })
}

// `precedents` is sorted by similarity, best first.
fn precedent_reason(cfg: &CheckpointConfig, precedents: &[Precedent]) -> Option<HaltReason> {
    let best = precedents.first()?;
    if !best.rank.is_critical() && best.similarity < cfg.strong_precedent_similarity {
        return None;
    }
    Some(HaltReason {
        component: PRECEDENT_MATCHER.to_string(),
        severity: Severity::Warning,
        message: format!(
            "Similar approach seen before in {} (similarity {:.2}, rank {})",
            if best.source.is_empty() {
                "an earlier session"
            } else {
                best.source.as_str()
            },
            best.similarity,
            best.rank
        ),
        details: json!({
            "precedent_count": precedents.len(),
            "best_session_id": best.session_id,
        }),
    })
}

fn intervention_reason(u: &UserIntervention) -> Option<HaltReason> {
    if !u.detected {
        return None;
    }
    let severity = u.severity.max(Severity::Warning);
    let message = u.message.clone().unwrap_or_else(|| {
        format!(
            "User intervention detected (frustration {:.2})",
            u.frustration_score
        )
    });
    Some(HaltReason {
        component: USER_INTERVENTION.to_string(),
        severity,
        message,
        details: json!({ "frustration_score": u.frustration_score }),
    })
}

// Error seen at any score, repeated work, and a precedent: each is weak on its
// own, together they halt.
fn combined_weak_signal(cfg: &CheckpointConfig, signals: &Signals) -> Option<HaltReason> {
    let error = signals.error_signature.as_ref().filter(|m| m.detected)?;
    let iteration = signals
        .iteration
        .as_ref()
        .filter(|c| c.count > cfg.weak_iteration_floor)?;
    let precedent = signals
        .precedent
        .as_ref()
        .filter(|p| p.found && !p.precedents.is_empty())?;
    Some(HaltReason {
        component: COMBINED_SIGNAL.to_string(),
        severity: Severity::Warning,
        message: format!(
            "Weak signals agree: error match {:.2}, {} attempts, {} precedent(s)",
            error.match_score,
            iteration.count,
            precedent.precedents.len()
        ),
        details: json!({
            "error_match_score": error.match_score,
            "iteration_count": iteration.count,
            "precedent_count": precedent.precedents.len(),
        }),
    })
}

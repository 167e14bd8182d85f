use crate::detector::{
    COMBINED_SIGNAL, ERROR_SIGNATURE, ITERATION_COUNTER, PRECEDENT_MATCHER, USER_INTERVENTION,
};
use crate::text::proposal_subject;
use phc_protocol::{HaltReason, Precedent, Proposal};

pub fn build_recommendations(
    proposal: &Proposal,
    reasons: &[HaltReason],
    precedents: &[Precedent],
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |text: String| {
        if !out.contains(&text) {
            out.push(text);
        }
    };

    for reason in reasons {
        let text = match reason.component.as_str() {
            ERROR_SIGNATURE => {
                "Review the matching error signature before retrying; the same failure is likely to recur."
            }
            ITERATION_COUNTER => {
                "Stop iterating on the current approach and re-plan with a different strategy."
            }
            PRECEDENT_MATCHER => "Read the similar precedents listed above before continuing.",
            USER_INTERVENTION => {
                "The user has intervened; confirm the direction with them before proceeding."
            }
            COMBINED_SIGNAL => {
                "Several weak signals agree; pause and verify your assumptions."
            }
            _ => continue,
        };
        push(text.to_string());
    }

    let has_precedent_reason = reasons.iter().any(|r| r.component == PRECEDENT_MATCHER);
    if !precedents.is_empty() && !has_precedent_reason {
        push(format!(
            "Review {} similar precedent(s) from earlier sessions.",
            precedents.len()
        ));
    }

    push(format!(
        "Pause and re-plan before executing '{}'.",
        proposal_subject(proposal, 80)
    ));
    out
}

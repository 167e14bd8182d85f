use anyhow::{Context, Result};
use clap::Args;
use phc_checkpoint::{
    render_dialogue, Detectors, DynDetector, HaltCheckpoint, LedgerPrecedentDetector, StaticDetector,
};
use phc_lessons::LessonStore;
use phc_protocol::{
    serialize_json_pretty, ErrorEnvelope, ErrorSignatureMatch, IterationCount, PrecedentMatch,
    Proposal, UserIntervention,
};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use super::GlobalOptions;
use crate::{exit_with_error, print_stdout};

pub const HALT_EXIT_CODE: i32 = 2;

#[derive(Args)]
pub struct CheckpointArgs {
    /// Inline JSON payload (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,

    /// Path to file containing JSON payload (stdin when neither is given)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Also write the human-readable checkpoint dialogue to stderr
    #[arg(long)]
    pub dialogue: bool,

    /// Never write a lesson, even when the proposal halts
    #[arg(long)]
    pub no_lesson: bool,

    /// Exit with status 2 when the checkpoint halts
    #[arg(long)]
    pub fail_on_halt: bool,
}

/// `{ proposal, signals?, use_ledger_precedents? }`
#[derive(Debug, Deserialize)]
struct CheckpointPayload {
    proposal: Proposal,
    #[serde(default)]
    signals: SignalsPayload,
    #[serde(default)]
    use_ledger_precedents: Option<bool>,
}

/// Detector results computed outside this process.
#[derive(Debug, Default, Deserialize)]
struct SignalsPayload {
    #[serde(default)]
    error_signature: Option<ErrorSignatureMatch>,
    #[serde(default, alias = "iteration_counter")]
    iteration: Option<IterationCount>,
    #[serde(default, alias = "precedent_matcher")]
    precedent: Option<PrecedentMatch>,
    #[serde(default)]
    user_intervention: Option<UserIntervention>,
}

pub async fn run(args: CheckpointArgs, globals: &GlobalOptions) -> Result<()> {
    let raw = read_payload(&args)?;
    let payload: CheckpointPayload = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(err) => exit_with_error(
            &ErrorEnvelope::new("invalid_json", format!("Invalid checkpoint payload: {err}"))
                .with_hint(r#"Expected {"proposal": {"description": "..."}, "signals": {...}}"#),
        ),
    };

    let mut cfg = globals.checkpoint_config().await;
    if args.no_lesson {
        cfg.auto_lesson = false;
    }

    let detectors = build_detectors(
        payload.signals,
        payload.use_ledger_precedents.unwrap_or(true),
        LessonStore::new(cfg.lessons_path.clone(), cfg.max_entries),
        cfg.precedent_min_similarity,
    );
    let checkpoint = HaltCheckpoint::new(cfg).with_detectors(detectors);
    let decision = checkpoint.evaluate(&payload.proposal).await;

    print_stdout(&serialize_json_pretty(&decision)?)?;
    if args.dialogue {
        eprintln!("{}", render_dialogue(&decision, &payload.proposal));
    }
    if args.fail_on_halt && decision.should_halt {
        std::process::exit(HALT_EXIT_CODE);
    }
    Ok(())
}

fn build_detectors(
    signals: SignalsPayload,
    use_ledger_precedents: bool,
    store: LessonStore,
    min_similarity: f64,
) -> Detectors {
    let precedent = match signals.precedent {
        Some(value) => Some(StaticDetector::shared(value)),
        None if use_ledger_precedents => {
            let detector: DynDetector<PrecedentMatch> =
                Arc::new(LedgerPrecedentDetector::new(store, min_similarity));
            Some(detector)
        }
        None => None,
    };

    Detectors {
        error_signature: signals.error_signature.map(StaticDetector::shared),
        iteration: signals.iteration.map(StaticDetector::shared),
        precedent,
        user_intervention: signals.user_intervention.map(StaticDetector::shared),
    }
}

fn read_payload(args: &CheckpointArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;
    Ok(buffer)
}

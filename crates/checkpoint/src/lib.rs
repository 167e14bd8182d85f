//! # PHC Checkpoint
//!
//! Proactive halt checkpoint for agent proposals.
//!
//! ## Flow
//!
//! ```text
//! Proposal
//!     │
//!     ├──> tokio::join! over the configured detectors
//!     │      error_signature · iteration_counter · precedent_matcher · user_intervention
//!     │      (a failing detector is recorded as {error} and skipped)
//!     │
//!     ├──> static thresholds (rules::assess)
//!     │      └─> shouldHalt + severity + reasons + precedents
//!     │
//!     └──> on halt: recommendations + lesson in the ledger
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use phc_checkpoint::{CheckpointConfig, Detectors, HaltCheckpoint, StaticDetector};
//! use phc_protocol::{IterationCount, Proposal};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CheckpointConfig::load(None).await?;
//!     let checkpoint = HaltCheckpoint::new(config).with_detectors(Detectors {
//!         iteration: Some(StaticDetector::shared(IterationCount {
//!             count: 4,
//!             ..Default::default()
//!         })),
//!         ..Default::default()
//!     });
//!     let decision = checkpoint
//!         .evaluate(&Proposal::new("retry the flaky migration"))
//!         .await;
//!     println!("halt: {}", decision.should_halt);
//!     Ok(())
//! }
//! ```

mod config;
mod detector;
mod dialogue;
mod evaluator;
mod precedent;
mod recommendations;
mod rules;
mod text;

pub use config::{CheckpointConfig, DEFAULT_CONFIG_PATH};
pub use detector::{
    Detector, Detectors, DynDetector, StaticDetector, COMBINED_SIGNAL, ERROR_SIGNATURE,
    ITERATION_COUNTER, PRECEDENT_MATCHER, USER_INTERVENTION,
};
pub use dialogue::render_dialogue;
pub use evaluator::{HaltCheckpoint, LESSON_CATEGORY};
pub use precedent::{LedgerPrecedentDetector, LESSONS_SOURCE};
pub use recommendations::build_recommendations;
pub use rules::{assess, Assessment, Signals};
pub use text::{trigger_keywords, truncate_one_line};

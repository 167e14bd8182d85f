//! # PHC Lessons
//!
//! Bounded, deduplicated ledger of lessons written when the halt checkpoint
//! stops a proposal.
//!
//! ```text
//! LessonDraft
//!     │
//!     ├──> similar lesson exists? (keyword substring match) ──> Duplicate
//!     │
//!     ├──> id = max(lesson-NNN) + 1, date = now
//!     │
//!     └──> cap at max_entries (oldest non-critical evicted first)
//!            └─> .claude/memory/.esmc-lessons.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use phc_lessons::{LessonDraft, LessonStore, DEFAULT_LEDGER_PATH};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = LessonStore::new(DEFAULT_LEDGER_PATH, 100);
//!     let draft = LessonDraft {
//!         lesson: "Re-plan before retrying the migration".to_string(),
//!         trigger_keywords: vec!["migration".to_string()],
//!         ..Default::default()
//!     };
//!     store.record(draft).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod ledger;
mod ledger_lock;
mod lesson;
mod store;

pub use error::{LessonsError, Result};
pub use ledger::{LessonLedger, RecordOutcome, DEFAULT_MAX_ENTRIES};
pub use lesson::{format_lesson_id, Lesson, LessonDraft, LESSON_ID_PREFIX};
pub use store::{LessonStore, DEFAULT_LEDGER_PATH};

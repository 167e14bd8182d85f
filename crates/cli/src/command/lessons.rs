use anyhow::{Context, Result};
use clap::Args;
use phc_checkpoint::truncate_one_line;
use phc_protocol::serialize_json_pretty;

use super::GlobalOptions;
use crate::print_stdout;

#[derive(Args)]
pub struct ListArgs {
    /// Print the whole ledger as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn list(args: ListArgs, globals: &GlobalOptions) -> Result<()> {
    let store = globals.lesson_store().await;
    let ledger = store
        .load()
        .await
        .with_context(|| format!("Failed to read lessons from {}", store.path().display()))?;

    if args.json {
        return print_stdout(&serialize_json_pretty(&ledger)?);
    }

    if ledger.lessons.is_empty() {
        return print_stdout(&format!("No lessons in {}", store.path().display()));
    }
    let mut out = format!(
        "{} lesson(s) in {} (max {})\n",
        ledger.lessons.len(),
        store.path().display(),
        ledger.max_entries
    );
    for lesson in &ledger.lessons {
        out.push_str(&format!(
            "{:<12} {:<9} {:<21} {}\n",
            lesson.id,
            lesson.severity,
            lesson.date,
            truncate_one_line(&lesson.lesson, 100)
        ));
    }
    print_stdout(out.trim_end())
}

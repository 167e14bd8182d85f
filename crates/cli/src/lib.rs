use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use phc_protocol::{serialize_json, ErrorEnvelope};
use std::io;
use std::path::PathBuf;

mod command;

use command::{checkpoint, lessons, synthesize};

#[derive(Parser)]
#[command(name = "phc")]
#[command(about = "Proactive halt checkpoint for AI agent proposals", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Checkpoint config file (default: .claude/memory/phc-config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lessons ledger path (overrides config and PHC_LESSONS_PATH)
    #[arg(long, global = true)]
    lessons_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge four intelligence fragments (JSON) into a technical summary
    Synthesize(synthesize::SynthesizeArgs),

    /// Evaluate a proposal against the halt thresholds
    Checkpoint(checkpoint::CheckpointArgs),

    /// Inspect the lessons ledger
    Lessons(LessonsArgs),
}

#[derive(Args)]
struct LessonsArgs {
    #[command(subcommand)]
    command: LessonsCommand,
}

#[derive(Subcommand)]
enum LessonsCommand {
    /// List recorded lessons, oldest first
    List(lessons::ListArgs),
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Every subcommand except a plain-text `lessons list` prints JSON on stdout.
    let json_output = match &cli.command {
        Commands::Synthesize(_) | Commands::Checkpoint(_) => true,
        Commands::Lessons(args) => match &args.command {
            LessonsCommand::List(list) => list.json,
        },
    };
    if json_output && !cli.verbose {
        cli.quiet = true;
    }
    init_logging(cli.quiet, cli.verbose);

    let globals = command::GlobalOptions {
        config: cli.config,
        lessons_path: cli.lessons_path,
    };

    let outcome = match cli.command {
        Commands::Synthesize(args) => synthesize::run(args),
        Commands::Checkpoint(args) => checkpoint::run(args, &globals).await,
        Commands::Lessons(args) => match args.command {
            LessonsCommand::List(list) => lessons::list(list, &globals).await,
        },
    };

    if let Err(err) = outcome {
        exit_with_error(&ErrorEnvelope::new("internal_error", format!("{err:#}")));
    }
    Ok(())
}

fn init_logging(quiet: bool, verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Prints `envelope` as JSON on stderr and exits with status 1.
pub(crate) fn exit_with_error(envelope: &ErrorEnvelope) -> ! {
    let raw = serialize_json(envelope).unwrap_or_else(|_| {
        format!(r#"{{"error":{:?},"code":{:?}}}"#, envelope.error, envelope.code)
    });
    eprintln!("{raw}");
    std::process::exit(1);
}

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

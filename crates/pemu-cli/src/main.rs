//! PEMU - drive the PEMU processor emulator from the command line
//!
//! ## Commands
//!
//! - `verify`: Verify a file and jump to the error the engine reports
//! - `obfuscate`: Obfuscate a file at the largest word size
//! - `open-file`: Open a file in the engine's own window
//! - `open`: Open the engine with no file
//! - `check-version`: Check the installed engine against the supported range
//! - `parse`: Extract the last diagnostic from saved engine output
//! - `buttons`: Show which status bar buttons are visible

mod host;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pemu_core::{
    default_buttons, visible_buttons, DiagnosticRecord, EditorSnapshot, OutputChannel, Settings,
    WriterSink,
};
use pemu_engine::{
    ActiveDocument, CommandOrchestrator, CommandOutcome, ProcessExecutor, TargetFile, WordSize,
    WordSizeChoice,
};
use tracing::{debug, Level};

use crate::host::TerminalHost;

#[derive(Parser)]
#[command(name = "pemu")]
#[command(author = "PEMU Tooling Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify, obfuscate and open PEMU programs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON results
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (default: .pemu/config.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Java interpreter to run the engine with
    #[arg(long, global = true, env = "PEMU_JAVA_PATH")]
    java_path: Option<String>,

    /// Path to the PEMU jar
    #[arg(long, global = true, env = "PEMU_JAR_PATH")]
    jar_path: Option<String>,

    /// Flags passed to the engine before any others
    #[arg(long, global = true, env = "PEMU_ARGUMENTS", allow_hyphen_values = true)]
    pemu_arguments: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a file and report the engine's error
    Verify {
        /// File to verify, as a path or URI
        file: Option<String>,

        /// Word size (8, 16 or 24); asked for when omitted
        #[arg(short = 'b', long)]
        word_size: Option<WordSize>,

        /// Do not print the error location
        #[arg(long)]
        no_goto: bool,
    },

    /// Obfuscate a file
    Obfuscate {
        /// File to obfuscate, as a path or URI
        file: Option<String>,
    },

    /// Open a file in the engine
    OpenFile {
        /// File to open, as a path or URI
        file: Option<String>,
    },

    /// Open the engine
    Open,

    /// Check the engine version
    CheckVersion,

    /// Extract the last diagnostic from engine output
    Parse {
        /// File with the output (default: stdin)
        file: Option<PathBuf>,
    },

    /// Show the visible status bar buttons
    Buttons {
        /// Language of the active document
        #[arg(short, long)]
        language: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pemu_core::init_tracing(cli.json, level);

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let mut settings =
        Settings::load(cli.config.as_deref(), &cwd).context("Failed to load PEMU settings")?;
    apply_overrides(&mut settings, &cli);
    debug!(?settings, "Loaded settings");

    let json = cli.json;
    match cli.command {
        Commands::Verify {
            file,
            word_size,
            no_goto,
        } => {
            if no_goto {
                settings.goto_error = false;
            }
            let orchestrator = build_orchestrator(settings, file, cwd, json);
            let choice = word_size.map_or(WordSizeChoice::Prompt, WordSizeChoice::Size);
            let outcome = orchestrator.verify(TargetFile::ActiveEditor, choice).await;
            finish(&orchestrator, outcome).await
        }
        Commands::Obfuscate { file } => {
            let orchestrator = build_orchestrator(settings, file, cwd, json);
            let outcome = orchestrator.obfuscate(TargetFile::ActiveEditor).await;
            finish(&orchestrator, outcome).await
        }
        Commands::OpenFile { file } => {
            let orchestrator = build_orchestrator(settings, file, cwd, json);
            let outcome = orchestrator.open_file(TargetFile::ActiveEditor).await;
            finish(&orchestrator, outcome).await
        }
        Commands::Open => {
            let orchestrator = build_orchestrator(settings, None, cwd, json);
            let outcome = orchestrator.open().await;
            finish(&orchestrator, outcome).await
        }
        Commands::CheckVersion => {
            let orchestrator = build_orchestrator(settings, None, cwd, json);
            let outcome = orchestrator.check_version().await;
            finish(&orchestrator, outcome).await
        }
        Commands::Parse { file } => cmd_parse(file.as_deref(), json),
        Commands::Buttons { language } => cmd_buttons(&settings, language, json),
    }
}

/// CLI flags and environment variables win over the settings file.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(java_path) = &cli.java_path {
        settings.java_path = java_path.clone();
    }
    if let Some(jar_path) = &cli.jar_path {
        settings.pemu_jar_path = jar_path.clone();
    }
    if let Some(arguments) = &cli.pemu_arguments {
        settings.pemu_arguments = arguments.clone();
    }
}

fn build_orchestrator(
    settings: Settings,
    file: Option<String>,
    cwd: PathBuf,
    json: bool,
) -> CommandOrchestrator {
    let document = file.as_deref().map(ActiveDocument::from_uri);
    let host = Arc::new(TerminalHost::new(document, cwd).json(json));
    let output = Arc::new(OutputChannel::new("PEMU", |_| {
        Box::new(WriterSink::new(io::stdout()))
    }));
    CommandOrchestrator::new(settings, Arc::new(ProcessExecutor), host, output)
}

/// Wait for detached engines to report, then map the outcome to an exit code.
async fn finish(orchestrator: &CommandOrchestrator, outcome: CommandOutcome) -> Result<ExitCode> {
    let code = match &outcome {
        CommandOutcome::Diagnostic { .. } => ExitCode::FAILURE,
        outcome if outcome.is_failure() => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    };

    if let CommandOutcome::Aborted(error) = &outcome {
        if error.is_configuration() {
            eprintln!(
                "hint: set java_path and pemu_jar_path in .pemu/config.toml, \
                 or pass --java-path/--jar-path (PEMU_JAVA_PATH/PEMU_JAR_PATH)"
            );
        }
    }

    if let CommandOutcome::Launched(reporter) = outcome {
        reporter.await.context("Engine reporter task failed")?;
    }
    orchestrator.dispose();
    Ok(code)
}

fn cmd_parse(file: Option<&Path>, json: bool) -> Result<ExitCode> {
    let output = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut output = String::new();
            io::stdin()
                .read_to_string(&mut output)
                .context("Failed to read engine output from stdin")?;
            output
        }
    };

    let Some(record) = DiagnosticRecord::last_in(&output) else {
        println!("No diagnostic found.");
        return Ok(ExitCode::FAILURE);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{record}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_buttons(settings: &Settings, language: Option<String>, json: bool) -> Result<ExitCode> {
    let editor = language
        .map(EditorSnapshot::with_language)
        .unwrap_or_default();
    let buttons = default_buttons();
    let visible = visible_buttons(&buttons, &editor, settings);

    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
    } else if visible.is_empty() {
        println!("No buttons visible.");
    } else {
        for button in visible {
            println!("{:<20} {}", button.command, button.label);
        }
    }
    Ok(ExitCode::SUCCESS)
}

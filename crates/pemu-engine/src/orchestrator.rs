//! Command orchestration.
//!
//! Each command walks the same states:
//!
//! ```text
//! Idle -> ResolvingInputs -> Checking -> {Compatible | Incompatible}
//!      -> Invoking -> {Succeeded | Failed} -> Presenting -> Idle
//! ```
//!
//! Incompatible and Failed end the command. Nothing is retried, and every
//! failure is written once to the output channel instead of being returned
//! as an error.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use pemu_core::{DiagnosticRecord, OutputChannel, PemuError, Settings, SupportedRange};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::gate::{CompatibilityGate, GateVerdict, RELEASES_PAGE};
use crate::host::{EditorHost, NavigationRequest};
use crate::invocation::{
    InvocationBuilder, TargetFile, WordSize, WordSizeChoice, OBFUSCATE_FLAGS, VERIFY_FLAGS,
};
use crate::resolve::{resolve_tools, ResolvedTools};
use crate::runner::{EngineExecutor, ExecutionResult};

/// Shown when a diagnostic command prints nothing at all.
pub fn unsupported_command_message() -> String {
    format!(
        "The specified command didn't give any output, maybe your PEMU version isn't up to date!\n\
         You can check for a new version at the following link:\n - {RELEASES_PAGE}\n\n\
         If there isn't any new version then the feature may not be in an official release yet,\n\
         in which case the only way to get it is building PEMU from source."
    )
}

/// Where a command currently is. Recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolvingInputs,
    Checking,
    Invoking,
    Presenting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolvingInputs => "resolving_inputs",
            Self::Checking => "checking",
            Self::Invoking => "invoking",
            Self::Presenting => "presenting",
        };
        f.write_str(name)
    }
}

/// How a command ended.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Version check passed; returned by [`CommandOrchestrator::check_version`].
    Compatible(GateVerdict),
    /// The engine version is outside the supported range or unknown.
    Incompatible(GateVerdict),
    /// Stopped before the engine was started.
    Aborted(PemuError),
    /// The engine ran and reported a failure.
    Failed(String),
    Diagnostic {
        record: DiagnosticRecord,
        navigation: Option<NavigationRequest>,
    },
    /// Plain engine output, no diagnostic.
    Text(String),
    /// A detached engine is running; the task reports its errors on exit.
    Launched(JoinHandle<()>),
}

impl CommandOutcome {
    /// Whether the command ended in a terminal failure state.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Incompatible(_) | Self::Aborted(_) | Self::Failed(_)
        )
    }
}

/// Composes the gate, builder, runner and parser for editor commands.
pub struct CommandOrchestrator {
    settings: Settings,
    executor: Arc<dyn EngineExecutor>,
    host: Arc<dyn EditorHost>,
    output: Arc<OutputChannel>,
    gate: CompatibilityGate,
    tools: OnceCell<ResolvedTools>,
}

impl CommandOrchestrator {
    pub fn new(
        settings: Settings,
        executor: Arc<dyn EngineExecutor>,
        host: Arc<dyn EditorHost>,
        output: Arc<OutputChannel>,
    ) -> Self {
        Self {
            settings,
            executor,
            host,
            output,
            gate: CompatibilityGate::default(),
            tools: OnceCell::new(),
        }
    }

    pub fn with_supported_range(mut self, range: SupportedRange) -> Self {
        self.gate = CompatibilityGate::new(range);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output(&self) -> &Arc<OutputChannel> {
        &self.output
    }

    /// Verify a file with diagnostics and jump to the reported error.
    pub async fn verify(&self, target: TargetFile, word_size: WordSizeChoice) -> CommandOutcome {
        let span = info_span!("pemu_command", command = "verify", invocation_id = %Uuid::new_v4());
        self.run_diagnostic_command(target, word_size, VERIFY_FLAGS)
            .instrument(span)
            .await
    }

    /// Obfuscate a file at the largest word size.
    pub async fn obfuscate(&self, target: TargetFile) -> CommandOutcome {
        let span = info_span!("pemu_command", command = "obfuscate", invocation_id = %Uuid::new_v4());
        self.run_diagnostic_command(target, WordSizeChoice::Size(WordSize::MAX), OBFUSCATE_FLAGS)
            .instrument(span)
            .await
    }

    /// Open a file in the engine's own interface without waiting for it.
    pub async fn open_file(&self, target: TargetFile) -> CommandOutcome {
        let span = info_span!("pemu_command", command = "open_file", invocation_id = %Uuid::new_v4());
        self.run_open_command(target).instrument(span).await
    }

    /// Open the engine with no file.
    pub async fn open(&self) -> CommandOutcome {
        self.open_file(TargetFile::NoFile).await
    }

    /// Run only the version gate.
    pub async fn check_version(&self) -> CommandOutcome {
        let span = info_span!("pemu_command", command = "check_version", invocation_id = %Uuid::new_v4());
        async {
            let tools = match self.tools().await {
                Ok(tools) => tools,
                Err(e) => return self.abort(e),
            };
            match self.check_gate(&tools).await {
                Ok(verdict) => CommandOutcome::Compatible(verdict),
                Err(outcome) => outcome,
            }
        }
        .instrument(span)
        .await
    }

    /// Release the output channel.
    pub fn dispose(&self) {
        self.output.dispose();
    }

    async fn run_diagnostic_command(
        &self,
        target: TargetFile,
        word_size: WordSizeChoice,
        flags: &[&str],
    ) -> CommandOutcome {
        debug!(phase = %Phase::ResolvingInputs);
        let tools = match self.tools().await {
            Ok(tools) => tools,
            Err(e) => return self.abort(e),
        };

        if let Err(outcome) = self.check_gate(&tools).await {
            return outcome;
        }

        let target = match self.resolve_target(&target) {
            Ok(target) => target,
            Err(e) => return self.abort(e),
        };
        let word_size = match self.resolve_word_size(word_size).await {
            Ok(word_size) => word_size,
            Err(e) => return self.abort(e),
        };

        let invocation = self
            .builder(&tools)
            .target(target.as_deref())
            .word_size(word_size)
            .extra_flags(flags.iter().copied())
            .build();

        debug!(phase = %Phase::Invoking, command_line = %invocation);
        self.output.clear_print(&invocation.command_line());
        let result = match self.executor.run_blocking(&invocation).await {
            Ok(result) => result,
            Err(e) => return self.abort(e),
        };

        debug!(phase = %Phase::Presenting, exit_code = ?result.exit_code);
        self.present(result).await
    }

    async fn run_open_command(&self, target: TargetFile) -> CommandOutcome {
        debug!(phase = %Phase::ResolvingInputs);
        let tools = match self.tools().await {
            Ok(tools) => tools,
            Err(e) => return self.abort(e),
        };

        if let Err(outcome) = self.check_gate(&tools).await {
            return outcome;
        }

        let target = match self.resolve_target(&target) {
            Ok(target) => target,
            Err(e) => return self.abort(e),
        };

        let invocation = self.builder(&tools).target(target.as_deref()).build();

        debug!(phase = %Phase::Invoking, command_line = %invocation);
        self.output.clear_print(&invocation.command_line());
        let run = match self.executor.run_detached(&invocation) {
            Ok(run) => run,
            Err(e) => return self.abort(e),
        };
        info!(pid = ?run.pid(), "Engine started");

        let output = self.output.clone();
        let reporter = tokio::spawn(
            async move {
                match run.wait().await {
                    Ok(result) => report_detached(&output, &result),
                    Err(e) => output.print(&e.to_string()),
                }
            }
            .in_current_span(),
        );
        CommandOutcome::Launched(reporter)
    }

    /// `Ok` with the passing verdict, or the terminal outcome to return.
    async fn check_gate(
        &self,
        tools: &ResolvedTools,
    ) -> std::result::Result<GateVerdict, CommandOutcome> {
        debug!(phase = %Phase::Checking);
        let checked = self
            .gate
            .check(
                self.executor.as_ref(),
                tools,
                &self.settings.pemu_arguments,
                |invocation| self.output.clear_print(&invocation.command_line()),
            )
            .await;
        let verdict = match checked {
            Ok(verdict) => verdict,
            Err(e) => return Err(self.abort(e)),
        };

        self.output.print(&verdict.message);
        if verdict.passed() {
            info!(version = ?verdict.detected, "Engine version compatible");
            Ok(verdict)
        } else {
            warn!(
                status = ?verdict.status,
                version = ?verdict.detected,
                "Engine version not supported"
            );
            Err(CommandOutcome::Incompatible(verdict))
        }
    }

    async fn present(&self, result: ExecutionResult) -> CommandOutcome {
        if !result.succeeded() {
            let text = if result.stderr.trim().is_empty() {
                result.exit_error.unwrap_or_default()
            } else {
                result.stderr
            };
            self.output.print(&text);
            warn!("Engine reported a failure");
            return CommandOutcome::Failed(text);
        }

        let stdout = result.stdout.trim();
        let Some(record) = DiagnosticRecord::last_in(stdout) else {
            let text = if stdout.is_empty() {
                unsupported_command_message()
            } else {
                stdout.to_string()
            };
            self.output.print(&text);
            return CommandOutcome::Text(text);
        };

        info!(
            file = %record.file_name,
            line = record.error_line,
            character = record.error_char,
            "Engine reported a diagnostic"
        );

        let navigation = if self.settings.goto_error {
            self.navigate_to(&record).await
        } else {
            None
        };

        self.output.print(&record.to_string());
        CommandOutcome::Diagnostic { record, navigation }
    }

    async fn navigate_to(&self, record: &DiagnosticRecord) -> Option<NavigationRequest> {
        let (Some(position), Some(file_name)) = (record.position(), record.file_name()) else {
            return None;
        };

        let Some(path) = self.host.find_workspace_file(file_name).await else {
            debug!(file = file_name, "Diagnostic file not found in workspace");
            return None;
        };

        let request = NavigationRequest {
            path,
            position,
            reveal: self.settings.goto_error_reveal_type,
        };
        match self.host.navigate(&request).await {
            Ok(()) => Some(request),
            Err(e) => {
                warn!(error = %e, "Navigation failed");
                None
            }
        }
    }

    fn resolve_target(&self, target: &TargetFile) -> pemu_core::Result<Option<PathBuf>> {
        match target {
            TargetFile::Path(path) => Ok(Some(path.clone())),
            TargetFile::NoFile => Ok(None),
            TargetFile::ActiveEditor => {
                let document = self
                    .host
                    .active_document()
                    .ok_or(PemuError::NoActiveFile)?;
                if !document.is_file() {
                    return Err(PemuError::UnsupportedScheme(document.scheme));
                }
                Ok(Some(document.path))
            }
        }
    }

    async fn resolve_word_size(
        &self,
        choice: WordSizeChoice,
    ) -> pemu_core::Result<Option<WordSize>> {
        match choice {
            WordSizeChoice::Size(word_size) => Ok(Some(word_size)),
            WordSizeChoice::NoSize => Ok(None),
            WordSizeChoice::Prompt => self
                .host
                .pick_word_size(&WordSize::ALL)
                .await
                .map(Some)
                .ok_or(PemuError::Cancelled),
        }
    }

    async fn tools(&self) -> pemu_core::Result<ResolvedTools> {
        self.tools
            .get_or_try_init(|| resolve_tools(&self.settings))
            .await
            .cloned()
    }

    fn builder(&self, tools: &ResolvedTools) -> InvocationBuilder {
        InvocationBuilder::new(&tools.interpreter, &tools.engine)
            .default_flags(self.settings.pemu_arguments.clone())
    }

    /// Report a pre-spawn failure. A dismissed prompt is silent.
    fn abort(&self, error: PemuError) -> CommandOutcome {
        if !matches!(error, PemuError::Cancelled) {
            self.output.clear_print(&error.to_string());
        }
        if error.is_input() {
            info!(error = %error, "Command aborted");
        } else {
            warn!(error = %error, "Command aborted");
        }
        CommandOutcome::Aborted(error)
    }
}

/// Print only what went wrong with a detached run.
fn report_detached(output: &OutputChannel, result: &ExecutionResult) {
    if let Some(error) = &result.exit_error {
        output.print(error);
    }
    if !result.stderr.trim().is_empty() {
        output.print(&result.stderr);
    }
}

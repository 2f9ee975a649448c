//! PEMU Engine - driving the PEMU engine from an editor
//!
//! Provides:
//! - Invocation building for the engine's command line
//! - Blocking and detached engine execution
//! - A version compatibility gate run before every command
//! - The command orchestrator behind verify, obfuscate and open

pub mod gate;
pub mod host;
pub mod invocation;
pub mod orchestrator;
pub mod resolve;
pub mod runner;

// Re-export key types
pub use gate::{parse_reported_version, CompatibilityGate, GateStatus, GateVerdict, RELEASES_PAGE};
pub use host::{find_file_by_name, ActiveDocument, EditorHost, NavigationRequest, FILE_SCHEME};
pub use invocation::{
    Invocation, InvocationBuilder, TargetFile, WordSize, WordSizeChoice, OBFUSCATE_FLAGS,
    VERIFY_FLAGS, VERSION_FLAGS,
};
pub use orchestrator::{unsupported_command_message, CommandOrchestrator, CommandOutcome, Phase};
pub use resolve::{resolve_tools, ResolvedTools, DEFAULT_INTERPRETER};
pub use runner::{DetachedRun, EngineExecutor, ExecutionResult, ProcessExecutor};

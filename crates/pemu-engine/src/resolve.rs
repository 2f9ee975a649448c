//! Resolution of the interpreter and engine paths from settings.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use pemu_core::{PemuError, Result, Settings};
use tokio::process::Command;
use tracing::debug;

/// Interpreter probed on the PATH when none is configured.
pub const DEFAULT_INTERPRETER: &str = "java";

/// Paths needed to start the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTools {
    pub interpreter: PathBuf,
    pub engine: PathBuf,
}

/// Whether `path` names an existing regular file.
pub fn is_valid_file(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_file()
}

/// A configured interpreter must exist; otherwise `java -version` must run.
pub async fn resolve_interpreter(settings: &Settings) -> Result<PathBuf> {
    let configured = settings.java_path.trim();
    if !configured.is_empty() {
        let path = PathBuf::from(configured);
        if is_valid_file(&path) {
            return Ok(path);
        }
        debug!(path = configured, "Configured interpreter is not a file");
        return Err(PemuError::InterpreterNotFound);
    }

    if probe(DEFAULT_INTERPRETER).await {
        Ok(PathBuf::from(DEFAULT_INTERPRETER))
    } else {
        Err(PemuError::InterpreterNotFound)
    }
}

pub fn resolve_engine(settings: &Settings) -> Result<PathBuf> {
    let path = PathBuf::from(settings.pemu_jar_path.trim());
    if is_valid_file(&path) {
        Ok(path)
    } else {
        Err(PemuError::InvalidEnginePath(path))
    }
}

pub async fn resolve_tools(settings: &Settings) -> Result<ResolvedTools> {
    let interpreter = resolve_interpreter(settings).await?;
    let engine = resolve_engine(settings)?;
    debug!(
        interpreter = %interpreter.display(),
        engine = %engine.display(),
        "Resolved engine tools"
    );
    Ok(ResolvedTools {
        interpreter,
        engine,
    })
}

async fn probe(program: &str) -> bool {
    let status = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) => status.success(),
        Err(e) => {
            debug!(program, error = %e, "Interpreter probe failed");
            false
        }
    }
}

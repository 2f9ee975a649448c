//! Engine version compatibility gate.
//!
//! The engine is asked for its version with `-ver`; the last line of its
//! output ends with the version in double quotes, e.g.
//! `Processor Emulator version "1.12.3"`.

use std::sync::OnceLock;

use pemu_core::{Compatibility, Result, SupportedRange, Version};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::invocation::{Invocation, InvocationBuilder, VERSION_FLAGS};
use crate::resolve::ResolvedTools;
use crate::runner::{EngineExecutor, ExecutionResult};

/// Where engine releases are published.
pub const RELEASES_PAGE: &str = "https://github.com/Marco4413/ProcessorEmulator/releases";

static VERSION_LINE: OnceLock<Regex> = OnceLock::new();

fn version_line() -> &'static Regex {
    VERSION_LINE.get_or_init(|| Regex::new(r#"^.*"(.+)"$"#).expect("version pattern is valid"))
}

/// Outcome of a version check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Compatible,
    TooLow,
    TooHigh,
    /// The version could not be determined.
    Indeterminate,
}

impl From<Compatibility> for GateStatus {
    fn from(value: Compatibility) -> Self {
        match value {
            Compatibility::Compatible => Self::Compatible,
            Compatibility::TooLow => Self::TooLow,
            Compatibility::TooHigh => Self::TooHigh,
        }
    }
}

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateVerdict {
    pub status: GateStatus,

    /// The version the engine reported, if one was found.
    pub detected: Option<String>,

    /// Message for the user, naming the detected version and the bound.
    pub message: String,
}

impl GateVerdict {
    /// Only a compatible engine lets dependent commands proceed.
    pub fn passed(&self) -> bool {
        self.status == GateStatus::Compatible
    }

    fn indeterminate(detected: Option<String>, reason: impl AsRef<str>) -> Self {
        Self {
            status: GateStatus::Indeterminate,
            detected,
            message: format!(
                "Could not determine the PEMU version: {}\nCheck your PEMU installation or get a release from:\n - {RELEASES_PAGE}",
                reason.as_ref()
            ),
        }
    }
}

/// Extract the quoted version token from the last line of `-ver` output.
pub fn parse_reported_version(stdout: &str) -> Option<String> {
    let last_line = stdout.trim().lines().last()?;
    version_line()
        .captures(last_line.trim_end())
        .map(|captures| captures[1].to_string())
}

/// Checks the installed engine against a [`SupportedRange`].
#[derive(Debug, Clone, Default)]
pub struct CompatibilityGate {
    range: SupportedRange,
}

impl CompatibilityGate {
    pub fn new(range: SupportedRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &SupportedRange {
        &self.range
    }

    /// The `-ver` call: no target file, no word size.
    pub fn version_invocation(tools: &ResolvedTools, default_flags: &str) -> Invocation {
        InvocationBuilder::new(&tools.interpreter, &tools.engine)
            .default_flags(default_flags)
            .target(None)
            .word_size(None)
            .extra_flags(VERSION_FLAGS.iter().copied())
            .build()
    }

    /// Classify a version string reported by the engine.
    pub fn classify(&self, reported: &str) -> GateVerdict {
        let version: Version = match reported.parse() {
            Ok(version) => version,
            Err(e) => {
                return GateVerdict::indeterminate(
                    Some(reported.to_string()),
                    format!("reported version \"{reported}\" is not valid ({e})"),
                )
            }
        };

        let status = GateStatus::from(self.range.classify(&version));
        let message = match status {
            GateStatus::TooLow => format!(
                "The PEMU version in use is old ({reported}), and not supported, please update it to {}\n - {RELEASES_PAGE}",
                self.range.min
            ),
            GateStatus::TooHigh => format!(
                "The PEMU version in use is new ({reported}), and not supported by this version of the\nextension (Max version: {}), please update the extension or use an older PEMU version.",
                self.range.max
            ),
            _ => format!(
                "The PEMU version in use ({reported}) is compatible with this version of the plugin."
            ),
        };

        GateVerdict {
            status,
            detected: Some(reported.to_string()),
            message,
        }
    }

    /// Evaluate the result of a `-ver` run.
    pub fn evaluate(&self, result: &ExecutionResult) -> GateVerdict {
        if !result.succeeded() {
            let reason = if result.stderr.trim().is_empty() {
                result.exit_error.clone().unwrap_or_default()
            } else {
                result.stderr.trim().to_string()
            };
            return GateVerdict::indeterminate(None, format!("the version query failed\n{reason}"));
        }

        match parse_reported_version(&result.stdout) {
            Some(reported) => self.classify(&reported),
            None => GateVerdict::indeterminate(
                None,
                "the engine did not report a version, it may be too old to support -ver",
            ),
        }
    }

    /// Run the version query and evaluate it.
    ///
    /// `on_invocation` sees the `-ver` call just before it runs.
    pub async fn check<F>(
        &self,
        executor: &dyn EngineExecutor,
        tools: &ResolvedTools,
        default_flags: &str,
        on_invocation: F,
    ) -> Result<GateVerdict>
    where
        F: FnOnce(&Invocation) + Send,
    {
        let invocation = Self::version_invocation(tools, default_flags);
        on_invocation(&invocation);
        let result = executor.run_blocking(&invocation).await?;
        Ok(self.evaluate(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::DetachedRun;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct VersionEngine {
        stdout: &'static str,
        seen: Mutex<Vec<Invocation>>,
    }

    #[async_trait]
    impl EngineExecutor for VersionEngine {
        async fn run_blocking(&self, invocation: &Invocation) -> Result<ExecutionResult> {
            self.seen.lock().unwrap().push(invocation.clone());
            Ok(ExecutionResult::success(self.stdout))
        }

        fn run_detached(&self, _invocation: &Invocation) -> Result<DetachedRun> {
            unreachable!("the gate never detaches")
        }
    }

    fn tools() -> ResolvedTools {
        ResolvedTools {
            interpreter: PathBuf::from("java"),
            engine: PathBuf::from("/opt/pemu.jar"),
        }
    }

    #[test]
    fn test_parse_reported_version() {
        assert_eq!(
            parse_reported_version("Processor Emulator version \"1.12.3\"\n"),
            Some("1.12.3".to_string())
        );
        assert_eq!(
            parse_reported_version("banner\nline two\nPEMU \"1.13.0\"\r\n"),
            Some("1.13.0".to_string())
        );
        assert_eq!(parse_reported_version("version \"1.0\" (beta)"), None);
        assert_eq!(parse_reported_version("\"1.12.0\"\nno version here"), None);
        assert_eq!(parse_reported_version(""), None);
    }

    #[test]
    fn test_classify_low() {
        let verdict = CompatibilityGate::default().classify("1.10.0");
        assert_eq!(verdict.status, GateStatus::TooLow);
        assert!(!verdict.passed());
        assert!(verdict.message.contains("(1.10.0)"));
        assert!(verdict.message.contains("update it to 1.12.0"));
    }

    #[test]
    fn test_classify_high() {
        let verdict = CompatibilityGate::default().classify("1.14.0");
        assert_eq!(verdict.status, GateStatus::TooHigh);
        assert!(!verdict.passed());
        assert!(verdict.message.contains("(1.14.0)"));
        assert!(verdict.message.contains("Max version: 1.13.99"));
    }

    #[test]
    fn test_classify_compatible() {
        let verdict = CompatibilityGate::default().classify("1.12.5");
        assert_eq!(verdict.status, GateStatus::Compatible);
        assert!(verdict.passed());
        assert_eq!(verdict.detected.as_deref(), Some("1.12.5"));
    }

    #[test]
    fn test_classify_unparsable_is_indeterminate() {
        let verdict = CompatibilityGate::default().classify("1.13-SNAPSHOT");
        assert_eq!(verdict.status, GateStatus::Indeterminate);
        assert!(!verdict.passed());
        assert!(verdict.message.contains("1.13-SNAPSHOT"));
    }

    #[test]
    fn test_evaluate_missing_token_explains_why() {
        let verdict = CompatibilityGate::default().evaluate(&ExecutionResult::success("usage: pemu"));
        assert_eq!(verdict.status, GateStatus::Indeterminate);
        assert!(verdict.message.contains("did not report a version"));
    }

    #[test]
    fn test_evaluate_failed_run() {
        let verdict = CompatibilityGate::default()
            .evaluate(&ExecutionResult::failure("Command failed: java -jar x\nError: Unable to access jarfile"));
        assert_eq!(verdict.status, GateStatus::Indeterminate);
        assert!(verdict.message.contains("Unable to access jarfile"));
    }

    #[test]
    fn test_version_invocation_has_no_target_or_word_size() {
        let invocation = CompatibilityGate::version_invocation(&tools(), "-q");
        assert!(invocation.target.is_none());
        assert!(invocation.word_size.is_none());
        assert_eq!(invocation.extra_flags, vec!["-ver"]);
        assert_eq!(invocation.default_flags, "-q");
    }

    #[tokio::test]
    async fn test_check_runs_version_query() {
        let engine = VersionEngine {
            stdout: "PEMU version \"1.13.2\"",
            seen: Mutex::new(Vec::new()),
        };
        let mut announced = None;
        let verdict = CompatibilityGate::default()
            .check(&engine, &tools(), "-q", |invocation| {
                announced = Some(invocation.command_line())
            })
            .await
            .unwrap();
        assert!(verdict.passed());

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].command_line().ends_with("-q -ver"));
        assert_eq!(announced, Some(seen[0].command_line()));
    }
}

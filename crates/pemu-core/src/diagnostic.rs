//! Structured diagnostics parsed from PEMU engine output.
//!
//! The engine reports at most one meaningful error per run, as a single line:
//!
//! ```text
//! '<file>': <Category> Error (<line>:<char>): <description>
//! ```
//!
//! Most output lines are not diagnostics, so a failed parse is `None`,
//! never an error.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// File name the engine reports when it cannot attribute an error to a file.
pub const UNKNOWN_FILE: &str = "Unknown";

static DIAGNOSTIC_LINE: OnceLock<Regex> = OnceLock::new();

fn diagnostic_line() -> &'static Regex {
    DIAGNOSTIC_LINE.get_or_init(|| {
        Regex::new(r"^'(.+?)': (.+ Error) \((\d+):(\d+)\): (.+)$")
            .expect("diagnostic pattern is valid")
    })
}

/// A 0-based editor position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// One parsed engine error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Source file name as reported, or [`UNKNOWN_FILE`].
    pub file_name: String,

    /// Category label, always ending in "Error".
    pub error_name: String,

    pub error_description: String,

    /// 1-based line; 0 means unknown.
    pub error_line: u32,

    /// 1-based column; 0 means unknown.
    pub error_char: u32,
}

impl DiagnosticRecord {
    /// Parse a single line, returning `None` if it is not a diagnostic.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = diagnostic_line().captures(line)?;
        let error_line = captures[3].parse().ok()?;
        let error_char = captures[4].parse().ok()?;

        Some(Self {
            file_name: captures[1].to_string(),
            error_name: captures[2].to_string(),
            error_description: captures[5].to_string(),
            error_line,
            error_char,
        })
    }

    /// Find the last diagnostic in a multi-line output blob.
    ///
    /// Lines are scanned from the end, so the engine's final report wins.
    pub fn last_in(output: &str) -> Option<Self> {
        output.trim().lines().rev().find_map(Self::parse)
    }

    pub fn is_file_known(&self) -> bool {
        self.file_name != UNKNOWN_FILE
    }

    pub fn file_name(&self) -> Option<&str> {
        self.is_file_known().then_some(self.file_name.as_str())
    }

    pub fn is_position_known(&self) -> bool {
        self.error_line >= 1 && self.error_char >= 1
    }

    /// The error location converted to 0-based editor coordinates.
    pub fn position(&self) -> Option<Position> {
        self.is_position_known().then(|| Position {
            line: self.error_line - 1,
            character: self.error_char - 1,
        })
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PEMU Compilation Error ->\nFile: \t{}\nName: \t{}\nDesc: \t{}\nLine: \t{}\nChar: \t{}",
            self.file_name, self.error_name, self.error_description, self.error_line, self.error_char
        )
    }
}

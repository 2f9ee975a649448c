//! Engine invocation building.
//!
//! Every engine run has the shape
//!
//! ```text
//! <interpreter> -jar <engine-jar> [defaultFlags] [-p "<path>"] [-b <8|16|24>] [extraFlags...]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pemu_core::PemuError;
use serde::{Deserialize, Serialize};

/// Asks the engine for its version.
pub const VERSION_FLAGS: &[&str] = &["-ver"];

/// Command-line verification with diagnostics.
pub const VERIFY_FLAGS: &[&str] = &["-cl", "-sw", "-ncas", "-v"];

/// Command-line obfuscation.
pub const OBFUSCATE_FLAGS: &[&str] = &["-cl", "-sw", "-ncas", "-o"];

/// Processor word size passed with `-b`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WordSize {
    #[serde(rename = "8")]
    Bits8,
    #[serde(rename = "16")]
    Bits16,
    #[serde(rename = "24")]
    Bits24,
}

impl WordSize {
    pub const ALL: [WordSize; 3] = [WordSize::Bits8, WordSize::Bits16, WordSize::Bits24];

    /// The largest supported word size.
    pub const MAX: WordSize = WordSize::Bits24;

    pub fn bits(&self) -> u8 {
        match self {
            Self::Bits8 => 8,
            Self::Bits16 => 16,
            Self::Bits24 => 24,
        }
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for WordSize {
    type Err = PemuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "8" => Ok(Self::Bits8),
            "16" => Ok(Self::Bits16),
            "24" => Ok(Self::Bits24),
            other => Err(PemuError::Config(format!(
                "unsupported word size '{other}', expected one of 8, 16, 24"
            ))),
        }
    }
}

/// Which file a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFile {
    /// Use the document open in the editor.
    ActiveEditor,
    Path(PathBuf),
    /// Run the engine without `-p`.
    NoFile,
}

/// Which word size a command runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSizeChoice {
    /// Ask the user.
    Prompt,
    Size(WordSize),
    /// Run the engine without `-b`.
    NoSize,
}

/// A fully resolved engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub interpreter: PathBuf,
    pub engine: PathBuf,
    pub default_flags: String,
    pub target: Option<PathBuf>,
    pub word_size: Option<WordSize>,
    pub extra_flags: Vec<String>,
}

impl Invocation {
    /// Render the call as a quoted command line, for display and logs.
    pub fn command_line(&self) -> String {
        let mut line = format!(
            "\"{}\" -jar \"{}\"",
            self.interpreter.display(),
            self.engine.display()
        );
        if !self.default_flags.trim().is_empty() {
            line.push(' ');
            line.push_str(self.default_flags.trim());
        }
        if let Some(target) = &self.target {
            line.push_str(&format!(" -p \"{}\"", target.display()));
        }
        if let Some(word_size) = self.word_size {
            line.push_str(&format!(" -b {word_size}"));
        }
        if !self.extra_flags.is_empty() {
            line.push(' ');
            line.push_str(&self.extra_flags.join(" "));
        }
        line
    }

    /// Program and arguments for spawning without a shell.
    ///
    /// Default flags are split with shell quoting rules, so a quoted value
    /// stays one argument just as it reads in [`command_line`](Self::command_line).
    pub fn argv(&self) -> Result<(PathBuf, Vec<String>), PemuError> {
        let default_flags = shell_words::split(&self.default_flags).map_err(|e| {
            PemuError::Config(format!(
                "engine arguments '{}' cannot be split: {e}",
                self.default_flags
            ))
        })?;

        let mut args = vec![
            "-jar".to_string(),
            self.engine.to_string_lossy().to_string(),
        ];
        args.extend(default_flags);
        if let Some(target) = &self.target {
            args.push("-p".to_string());
            args.push(target.to_string_lossy().to_string());
        }
        if let Some(word_size) = self.word_size {
            args.push("-b".to_string());
            args.push(word_size.to_string());
        }
        args.extend(self.extra_flags.iter().cloned());
        Ok((self.interpreter.clone(), args))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Builder for [`Invocation`].
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    invocation: Invocation,
}

impl InvocationBuilder {
    pub fn new(interpreter: impl Into<PathBuf>, engine: impl Into<PathBuf>) -> Self {
        Self {
            invocation: Invocation {
                interpreter: interpreter.into(),
                engine: engine.into(),
                default_flags: String::new(),
                target: None,
                word_size: None,
                extra_flags: Vec::new(),
            },
        }
    }

    pub fn default_flags(mut self, flags: impl Into<String>) -> Self {
        self.invocation.default_flags = flags.into();
        self
    }

    pub fn target(mut self, target: Option<&Path>) -> Self {
        self.invocation.target = target.map(Path::to_path_buf);
        self
    }

    pub fn word_size(mut self, word_size: Option<WordSize>) -> Self {
        self.invocation.word_size = word_size;
        self
    }

    pub fn extra_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invocation
            .extra_flags
            .extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Invocation {
        self.invocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> InvocationBuilder {
        InvocationBuilder::new("/usr/bin/java", "/opt/pemu.jar")
    }

    #[test]
    fn test_no_target_no_word_size() {
        let invocation = base().extra_flags(VERSION_FLAGS.iter().copied()).build();
        let line = invocation.command_line();
        assert_eq!(line, "\"/usr/bin/java\" -jar \"/opt/pemu.jar\" -ver");
        assert!(!line.contains("-p"));
        assert!(!line.contains("-b"));

        let (_, args) = invocation.argv().unwrap();
        assert!(!args.contains(&"-p".to_string()));
        assert!(!args.contains(&"-b".to_string()));
    }

    #[test]
    fn test_target_precedes_word_size() {
        let invocation = base()
            .default_flags("-nogui")
            .target(Some(Path::new("/src/main.pemu")))
            .word_size(Some(WordSize::Bits16))
            .extra_flags(VERIFY_FLAGS.iter().copied())
            .build();

        assert_eq!(
            invocation.command_line(),
            "\"/usr/bin/java\" -jar \"/opt/pemu.jar\" -nogui -p \"/src/main.pemu\" -b 16 -cl -sw -ncas -v"
        );

        let (program, args) = invocation.argv().unwrap();
        assert_eq!(program, PathBuf::from("/usr/bin/java"));
        assert_eq!(
            args,
            vec![
                "-jar", "/opt/pemu.jar", "-nogui", "-p", "/src/main.pemu", "-b", "16", "-cl",
                "-sw", "-ncas", "-v"
            ]
        );
        let p = args.iter().position(|a| a == "-p").unwrap();
        let b = args.iter().position(|a| a == "-b").unwrap();
        assert!(p < b);
    }

    #[test]
    fn test_paths_with_spaces_stay_single_arguments() {
        let invocation = InvocationBuilder::new("C:/Program Files/java.exe", "/opt/my pemu.jar")
            .target(Some(Path::new("/work/my file.pemu")))
            .build();

        assert!(invocation
            .command_line()
            .starts_with("\"C:/Program Files/java.exe\" -jar \"/opt/my pemu.jar\""));
        let (_, args) = invocation.argv().unwrap();
        assert_eq!(args, vec!["-jar", "/opt/my pemu.jar", "-p", "/work/my file.pemu"]);
    }

    #[test]
    fn test_default_flags_are_split_for_argv() {
        let invocation = base().default_flags("  -a   -b2 ").build();
        assert_eq!(
            invocation.command_line(),
            "\"/usr/bin/java\" -jar \"/opt/pemu.jar\" -a   -b2"
        );
        let (_, args) = invocation.argv().unwrap();
        assert_eq!(args, vec!["-jar", "/opt/pemu.jar", "-a", "-b2"]);
    }

    #[test]
    fn test_quoted_default_flag_stays_one_argument() {
        let invocation = InvocationBuilder::new("java", "/opt/pemu.jar")
            .default_flags(r#"-lib "/my libs/std.pemu""#)
            .build();

        assert_eq!(
            invocation.command_line(),
            r#""java" -jar "/opt/pemu.jar" -lib "/my libs/std.pemu""#
        );
        let (_, args) = invocation.argv().unwrap();
        assert_eq!(args, vec!["-jar", "/opt/pemu.jar", "-lib", "/my libs/std.pemu"]);
    }

    #[test]
    fn test_unbalanced_quote_in_default_flags_is_config_error() {
        let invocation = base().default_flags(r#"-lib "/my libs"#).build();
        let err = invocation.argv().unwrap_err();
        assert!(matches!(err, PemuError::Config(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_word_size_parse_and_display() {
        assert_eq!("8".parse::<WordSize>().unwrap(), WordSize::Bits8);
        assert_eq!(" 24 ".parse::<WordSize>().unwrap(), WordSize::Bits24);
        assert!("32".parse::<WordSize>().is_err());
        assert_eq!(WordSize::MAX.to_string(), "24");
        assert_eq!(WordSize::ALL.iter().max(), Some(&WordSize::MAX));
    }
}

//! The editor side of a command: active document, prompts and navigation.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pemu_core::{Position, Result, RevealStrategy};
use serde::Serialize;

use crate::invocation::WordSize;

/// URI scheme of documents backed by a file on disk.
pub const FILE_SCHEME: &str = "file";

/// The document currently focused in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocument {
    pub scheme: String,
    pub path: PathBuf,
    pub language_id: Option<String>,
}

impl ActiveDocument {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: FILE_SCHEME.to_string(),
            path: path.into(),
            language_id: None,
        }
    }

    /// Parse `scheme://rest` or a bare path (treated as a file).
    pub fn from_uri(uri: &str) -> Self {
        match uri.split_once("://") {
            Some((scheme, rest)) if is_scheme(scheme) => Self {
                scheme: scheme.to_ascii_lowercase(),
                path: PathBuf::from(rest),
                language_id: None,
            },
            _ => Self::file(uri),
        }
    }

    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = Some(language_id.into());
        self
    }

    pub fn is_file(&self) -> bool {
        self.scheme == FILE_SCHEME
    }
}

// Single letters are Windows drive prefixes, not schemes.
fn is_scheme(candidate: &str) -> bool {
    candidate.len() > 1
        && candidate
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Request to open `path` and place the cursor at `position`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavigationRequest {
    pub path: PathBuf,
    pub position: Position,
    pub reveal: RevealStrategy,
}

/// Editor collaborator driven by the command orchestrator.
#[async_trait]
pub trait EditorHost: Send + Sync {
    fn active_document(&self) -> Option<ActiveDocument>;

    /// Ask the user for a word size; `None` means the prompt was dismissed.
    async fn pick_word_size(&self, choices: &[WordSize]) -> Option<WordSize>;

    /// First workspace file whose name is `file_name`.
    async fn find_workspace_file(&self, file_name: &str) -> Option<PathBuf>;

    async fn navigate(&self, request: &NavigationRequest) -> Result<()>;
}

/// Depth-first search under `root` for a file named `file_name`.
///
/// Entries are visited in name order so the result is stable. Hidden
/// directories and `target/` are skipped.
pub fn find_file_by_name(root: &Path, file_name: &str) -> Option<PathBuf> {
    let wanted = Path::new(file_name).file_name()?;

    let mut entries: Vec<_> = fs::read_dir(root).ok()?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() && entry.file_name() == wanted {
            return Some(path);
        }
        if file_type.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with('.') && name != "target" {
                dirs.push(path);
            }
        }
    }

    dirs.iter().find_map(|dir| find_file_by_name(dir, file_name))
}

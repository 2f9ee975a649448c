//! Terminal implementation of the editor host.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use pemu_core::{PemuError, Result};
use pemu_engine::{find_file_by_name, ActiveDocument, EditorHost, NavigationRequest, WordSize};

/// Prompts on stdin, searches the working directory and prints navigation
/// targets as `path:line:column`.
pub struct TerminalHost {
    document: Option<ActiveDocument>,
    workspace_root: PathBuf,
    json: bool,
}

impl TerminalHost {
    pub fn new(document: Option<ActiveDocument>, workspace_root: PathBuf) -> Self {
        Self {
            document,
            workspace_root,
            json: false,
        }
    }

    /// Print navigation requests as JSON.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

#[async_trait]
impl EditorHost for TerminalHost {
    fn active_document(&self) -> Option<ActiveDocument> {
        self.document.clone()
    }

    async fn pick_word_size(&self, choices: &[WordSize]) -> Option<WordSize> {
        let choices = choices.to_vec();
        tokio::task::spawn_blocking(move || {
            let options: Vec<String> = choices.iter().map(ToString::to_string).collect();
            eprint!("Word size ({}): ", options.join("/"));
            io::stderr().flush().ok();

            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => parse_choice(&line, &choices),
            }
        })
        .await
        .ok()
        .flatten()
    }

    async fn find_workspace_file(&self, file_name: &str) -> Option<PathBuf> {
        let root = self.workspace_root.clone();
        let file_name = file_name.to_string();
        tokio::task::spawn_blocking(move || find_file_by_name(&root, &file_name))
            .await
            .ok()
            .flatten()
    }

    async fn navigate(&self, request: &NavigationRequest) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(request).map_err(|e| PemuError::Io(io::Error::other(e)))?
        } else {
            format_location(request)
        };
        println!("{line}");
        Ok(())
    }
}

/// An empty answer or one not in `choices` dismisses the prompt.
fn parse_choice(input: &str, choices: &[WordSize]) -> Option<WordSize> {
    let size: WordSize = input.trim().parse().ok()?;
    choices.contains(&size).then_some(size)
}

/// 1-based `path:line:column`, the form terminals and editors link.
fn format_location(request: &NavigationRequest) -> String {
    format!(
        "{}:{}:{}",
        request.path.display(),
        request.position.line + 1,
        request.position.character + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pemu_core::{Position, RevealStrategy};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("16\n", &WordSize::ALL), Some(WordSize::Bits16));
        assert_eq!(parse_choice("\n", &WordSize::ALL), None);
        assert_eq!(parse_choice("32", &WordSize::ALL), None);
        assert_eq!(parse_choice("8", &[WordSize::Bits24]), None);
    }

    #[test]
    fn test_format_location_is_one_based() {
        let request = NavigationRequest {
            path: PathBuf::from("/src/main.pemu"),
            position: Position {
                line: 2,
                character: 6,
            },
            reveal: RevealStrategy::InCenter,
        };
        assert_eq!(format_location(&request), "/src/main.pemu:3:7");
    }

    #[tokio::test]
    async fn test_find_workspace_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.pemu"), "").unwrap();

        let host = TerminalHost::new(None, dir.path().to_path_buf());
        assert_eq!(
            host.find_workspace_file("main.pemu").await,
            Some(dir.path().join("src/main.pemu"))
        );
        assert_eq!(host.find_workspace_file("other.pemu").await, None);
    }

    #[tokio::test]
    async fn test_active_document() {
        let host = TerminalHost::new(
            Some(ActiveDocument::from_uri("untitled://Untitled-1")),
            PathBuf::from("."),
        );
        let document = host.active_document().unwrap();
        assert!(!document.is_file());
    }
}

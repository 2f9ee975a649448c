//! Declarative visibility rules for the editor's status buttons.
//!
//! Each button carries a [`VisibilityRule`] evaluated against an explicit
//! [`EditorSnapshot`] and the current [`Settings`]; nothing is captured.

use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Language id of PEMU source documents.
pub const PEMU_LANGUAGE_ID: &str = "pemu";

/// Which per-button setting switches a button on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonToggle {
    VerifyCode,
    ObfuscateCode,
    OpenFile,
    Open,
}

impl ButtonToggle {
    pub fn is_enabled(&self, settings: &Settings) -> bool {
        match self {
            Self::VerifyCode => settings.verify_code_status_bar_button,
            Self::ObfuscateCode => settings.obfuscate_code_status_bar_button,
            Self::OpenFile => settings.open_file_status_bar_button,
            Self::Open => settings.open_status_bar_button,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisibilityRule {
    /// Shown whenever the toggle is on.
    Always { toggle: ButtonToggle },
    /// Shown when the toggle is on and the active document has `language`.
    LanguageIs {
        toggle: ButtonToggle,
        language: String,
    },
}

impl VisibilityRule {
    pub fn evaluate(&self, editor: &EditorSnapshot, settings: &Settings) -> bool {
        match self {
            Self::Always { toggle } => toggle.is_enabled(settings),
            Self::LanguageIs { toggle, language } => {
                toggle.is_enabled(settings)
                    && editor.language_id.as_deref() == Some(language.as_str())
            }
        }
    }
}

/// What the rules need to know about the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSnapshot {
    /// Language of the active document; `None` when nothing is open.
    pub language_id: Option<String>,
}

impl EditorSnapshot {
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language_id: Some(language.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusButton {
    /// Command the button triggers.
    pub command: String,
    pub label: String,
    pub tooltip: String,
    /// Higher priority sits further left.
    pub priority: i32,
    pub rule: VisibilityRule,
}

/// The buttons contributed by this tooling.
pub fn default_buttons() -> Vec<StatusButton> {
    let pemu_only = |toggle| VisibilityRule::LanguageIs {
        toggle,
        language: PEMU_LANGUAGE_ID.to_string(),
    };

    vec![
        StatusButton {
            command: "pemu.verifyCode".to_string(),
            label: "PEMU: Verify Code".to_string(),
            tooltip: "Verifies the active file with PEMU".to_string(),
            priority: 3,
            rule: pemu_only(ButtonToggle::VerifyCode),
        },
        StatusButton {
            command: "pemu.obfuscateCode".to_string(),
            label: "PEMU: Obfuscate Code".to_string(),
            tooltip: "Obfuscates the active file with PEMU".to_string(),
            priority: 2,
            rule: pemu_only(ButtonToggle::ObfuscateCode),
        },
        StatusButton {
            command: "pemu.openFile".to_string(),
            label: "PEMU: Open File".to_string(),
            tooltip: "Opens the active file in PEMU".to_string(),
            priority: 1,
            rule: pemu_only(ButtonToggle::OpenFile),
        },
        StatusButton {
            command: "pemu.open".to_string(),
            label: "PEMU: Open".to_string(),
            tooltip: "Opens PEMU".to_string(),
            priority: 0,
            rule: VisibilityRule::Always {
                toggle: ButtonToggle::Open,
            },
        },
    ]
}

/// Buttons that should be shown, highest priority first.
pub fn visible_buttons<'a>(
    buttons: &'a [StatusButton],
    editor: &EditorSnapshot,
    settings: &Settings,
) -> Vec<&'a StatusButton> {
    if !settings.status_bar_buttons {
        return Vec::new();
    }

    let mut visible: Vec<&StatusButton> = buttons
        .iter()
        .filter(|button| button.rule.evaluate(editor, settings))
        .collect();
    visible.sort_by(|a, b| b.priority.cmp(&a.priority));
    visible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(buttons: &[&StatusButton]) -> Vec<String> {
        buttons.iter().map(|b| b.command.clone()).collect()
    }

    #[test]
    fn test_default_settings_on_pemu_file() {
        let buttons = default_buttons();
        let visible = visible_buttons(
            &buttons,
            &EditorSnapshot::with_language(PEMU_LANGUAGE_ID),
            &Settings::default(),
        );
        assert_eq!(commands(&visible), vec!["pemu.verifyCode", "pemu.openFile"]);
    }

    #[test]
    fn test_language_rules_hide_on_other_files() {
        let buttons = default_buttons();
        let settings = Settings {
            open_status_bar_button: true,
            ..Settings::default()
        };
        let visible = visible_buttons(&buttons, &EditorSnapshot::with_language("rust"), &settings);
        assert_eq!(commands(&visible), vec!["pemu.open"]);

        let visible = visible_buttons(&buttons, &EditorSnapshot::default(), &settings);
        assert_eq!(commands(&visible), vec!["pemu.open"]);
    }

    #[test]
    fn test_master_switch_hides_everything() {
        let buttons = default_buttons();
        let settings = Settings {
            status_bar_buttons: false,
            open_status_bar_button: true,
            ..Settings::default()
        };
        let visible = visible_buttons(
            &buttons,
            &EditorSnapshot::with_language(PEMU_LANGUAGE_ID),
            &settings,
        );
        assert!(visible.is_empty());
    }

    #[test]
    fn test_all_toggles_on_sorted_by_priority() {
        let buttons = default_buttons();
        let settings = Settings {
            obfuscate_code_status_bar_button: true,
            open_status_bar_button: true,
            ..Settings::default()
        };
        let visible = visible_buttons(
            &buttons,
            &EditorSnapshot::with_language(PEMU_LANGUAGE_ID),
            &settings,
        );
        assert_eq!(
            commands(&visible),
            vec![
                "pemu.verifyCode",
                "pemu.obfuscateCode",
                "pemu.openFile",
                "pemu.open"
            ]
        );
    }

    #[test]
    fn test_rule_serializes_tagged() {
        let rule = VisibilityRule::Always {
            toggle: ButtonToggle::Open,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "always");
        assert_eq!(json["toggle"], "open");
    }
}

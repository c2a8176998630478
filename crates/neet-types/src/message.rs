//! Terminal messages: the ordered event stream a front-end consumes.
//!
//! The kernel appends messages in exact production order; the front-end
//! drains them. Serialized with an `event` tag so a non-Rust UI can read the
//! JSON form directly:
//!
//! ```json
//! {"event":"output","text":"hi\n","style":{}}
//! {"event":"scripts","names":["a","b"]}
//! ```

use serde::{Deserialize, Serialize};

/// Default colour for error text.
pub const ERROR_COLOR: &str = "#ff0000";

/// Colouring for a piece of terminal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    /// Foreground colour as a hex string (`#rrggbb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Background colour as a hex string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Style {
    /// Unstyled text.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Text with a foreground colour.
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            background: None,
        }
    }

    /// Set the background colour.
    pub fn on(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    /// True if neither colour is set.
    pub fn is_plain(&self) -> bool {
        self.color.is_none() && self.background.is_none()
    }
}

/// One event for the terminal front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TerminalMessage {
    /// Regular output text. Full responses end in `\n`, partial writes don't.
    Output { text: String, style: Style },
    /// Error text, already prefixed with its origin.
    Error { text: String, style: Style },
    /// The terminal should be cleared.
    #[serde(rename = "clear")]
    ClearScreen,
    /// Whether the front-end should accept typed input.
    #[serde(rename = "input")]
    InputEnabled { enabled: bool },
    /// The set of running script instances changed.
    #[serde(rename = "scripts")]
    ScriptListChanged { names: Vec<String> },
}

impl TerminalMessage {
    /// Plain output.
    pub fn output(text: impl Into<String>) -> Self {
        TerminalMessage::Output {
            text: text.into(),
            style: Style::plain(),
        }
    }

    /// Error text in the default error colour.
    pub fn error(text: impl Into<String>) -> Self {
        TerminalMessage::Error {
            text: text.into(),
            style: Style::color(ERROR_COLOR),
        }
    }

    /// The text carried by output and error messages.
    pub fn text(&self) -> Option<&str> {
        match self {
            TerminalMessage::Output { text, .. } | TerminalMessage::Error { text, .. } => Some(text),
            TerminalMessage::ClearScreen
            | TerminalMessage::InputEnabled { .. }
            | TerminalMessage::ScriptListChanged { .. } => None,
        }
    }

    /// True for error messages.
    pub fn is_error(&self) -> bool {
        matches!(self, TerminalMessage::Error { .. })
    }
}

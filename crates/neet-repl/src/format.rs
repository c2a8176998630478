//! Rendering terminal messages for the REPL.
//!
//! Two audiences:
//!
//! - **Text** → output as a terminal shows it, colours as ANSI escapes when
//!   stdout is a TTY
//! - **Json** → one JSON object per message, for programs driving the REPL

use std::io::IsTerminal;

use neet_types::{Style, TerminalMessage};

/// How messages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain text without escapes.
    Plain,
    /// Text with ANSI colours and clear-screen.
    Ansi,
    /// JSON lines.
    Json,
}

/// Detect the text mode based on terminal state.
pub fn detect_mode() -> OutputMode {
    if std::io::stdout().is_terminal() {
        OutputMode::Ansi
    } else {
        OutputMode::Plain
    }
}

/// Render one message, or `None` when it has no visible form in `mode`.
pub fn render(message: &TerminalMessage, mode: OutputMode) -> Option<String> {
    if mode == OutputMode::Json {
        return serde_json::to_string(message).ok().map(|line| line + "\n");
    }

    match message {
        TerminalMessage::Output { text, style } | TerminalMessage::Error { text, style } => {
            if mode == OutputMode::Ansi {
                Some(paint(text, style))
            } else {
                Some(text.clone())
            }
        }
        TerminalMessage::ClearScreen if mode == OutputMode::Ansi => Some("\x1b[2J\x1b[H".to_string()),
        TerminalMessage::ClearScreen
        | TerminalMessage::InputEnabled { .. }
        | TerminalMessage::ScriptListChanged { .. } => None,
    }
}

/// Wrap text in 24-bit colour escapes. Trailing newlines stay outside the
/// escapes so the prompt isn't coloured.
fn paint(text: &str, style: &Style) -> String {
    let mut codes = Vec::new();
    if let Some((r, g, b)) = style.color.as_deref().and_then(parse_hex) {
        codes.push(format!("38;2;{};{};{}", r, g, b));
    }
    if let Some((r, g, b)) = style.background.as_deref().and_then(parse_hex) {
        codes.push(format!("48;2;{};{};{}", r, g, b));
    }
    if codes.is_empty() {
        return text.to_string();
    }

    let body = text.trim_end_matches('\n');
    let tail = &text[body.len()..];
    format!("\x1b[{}m{}\x1b[0m{}", codes.join(";"), body, tail)
}

/// Parse `#rrggbb` (or `#rgb`).
fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let (r, g, b) = (channel(&hex[0..1])?, channel(&hex[1..2])?, channel(&hex[2..3])?);
            Some((r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

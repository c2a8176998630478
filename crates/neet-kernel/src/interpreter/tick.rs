//! The tick engine.
//!
//! A tick evaluates exactly one line. Every path into the interpreter goes
//! through [`evaluate_line`]: the driver ticking an instance, a bare line
//! typed at the REPL, and control-flow commands (`if`, `visit`, `assign`)
//! evaluating a line of their own as a pseudo tick.
//!
//! Messages produced during a tick, nested pseudo ticks included, are
//! collected in a transcript and appended to the bus in one piece when the
//! tick finishes. If the owning instance was stopped while the tick was
//! suspended, the transcript is dropped instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use neet_types::{Style, TerminalMessage, Variable};
use tokio_util::sync::CancellationToken;

use crate::commands::{CommandError, CommandRegistry, LineContext};
use crate::device::InputControl;
use crate::kernel::Shared;
use crate::scheduler::{EndReason, ScriptInstance, StartError};

use super::interpolate::{interpolate, lookup_text};
use super::scope::AssignError;

/// Result of evaluating one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// The line reported an error.
    pub failed: bool,
    /// Explicit counter write (0-based). Suppresses the automatic advance.
    pub jump: Option<usize>,
    /// Responses joined by `\n`; partial writes extend the previous part.
    pub captured: String,
}

/// How a line is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalMode {
    /// Synthetic line evaluated on behalf of another line.
    pub pseudo: bool,
    /// Suppress visible output. Errors are always shown.
    pub quiet: bool,
}

/// What the driver should do with an instance after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Ended(EndReason),
    /// The instance was stopped while the tick ran.
    Cancelled,
}

/// Blank lines and `#` / `//` comments do nothing.
fn is_noop(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with("//")
}

/// Evaluate one line.
///
/// `owner` is the instance the line belongs to, or `None` for a bare line
/// running against the global scope. Boxed because control-flow commands
/// recurse through it.
pub(crate) fn evaluate_line<'a>(
    shared: &'a Arc<Shared>,
    owner: Option<&'a mut ScriptInstance>,
    transcript: &'a mut Vec<TerminalMessage>,
    line: String,
    mode: EvalMode,
) -> BoxFuture<'a, Evaluation> {
    Box::pin(async move {
        let text = line.trim_start().replace('\r', "");
        if is_noop(&text) {
            return Evaluation::default();
        }

        let mut tokens = text.split(' ');
        let name = tokens.next().unwrap_or_default().to_string();
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let mut ctx = TickContext {
            shared,
            owner,
            transcript,
            line,
            mode,
            parts: Vec::new(),
            failed: false,
            jump: None,
        };

        let Some(entry) = shared.commands.lookup(&name) else {
            ctx.error(&format!(
                "'{}' is not recognized as an internal command. Try using command 'help'",
                name
            ));
            return ctx.finish();
        };

        tracing::trace!(
            command = entry.schema().name(),
            script = ctx.instance_name(),
            line = ctx.current_index() + 1,
            pseudo = mode.pseudo,
            "executing line"
        );

        match entry.handler().execute(args, &mut ctx).await {
            Ok(()) => {}
            Err(CommandError::Usage) => {
                let schema = entry.schema();
                ctx.error(&format!(
                    "Invalid usage!\n\n{} {}",
                    schema.name(),
                    schema.render_usage()
                ));
            }
            Err(CommandError::Failed(message)) => ctx.error(&message),
        }
        ctx.finish()
    })
}

/// Run one tick of an instance and decide what happens next.
pub(crate) async fn tick_instance(shared: &Arc<Shared>, instance: &mut ScriptInstance) -> TickOutcome {
    let Some(line) = instance.source.get(instance.counter).cloned() else {
        return TickOutcome::Ended(EndReason::Completed);
    };

    let mut transcript = Vec::new();
    let eval = evaluate_line(
        shared,
        Some(&mut *instance),
        &mut transcript,
        line,
        EvalMode::default(),
    )
    .await;

    let flushed = shared
        .scheduler
        .with_current(instance, || shared.bus.extend(transcript));
    if flushed.is_none() {
        tracing::trace!(script = %instance.name, "instance stopped during tick, output dropped");
        return TickOutcome::Cancelled;
    }

    if eval.failed {
        return TickOutcome::Ended(EndReason::Failed);
    }
    match eval.jump {
        Some(target) => {
            instance.counter = target;
            TickOutcome::Running
        }
        None if instance.counter + 1 < instance.source.len() => {
            instance.counter += 1;
            TickOutcome::Running
        }
        None => TickOutcome::Ended(EndReason::Completed),
    }
}

/// Run a bare line against the global scope and publish its messages.
pub(crate) async fn run_bare(shared: &Arc<Shared>, line: &str) -> Evaluation {
    let mut transcript = Vec::new();
    let eval = evaluate_line(
        shared,
        None,
        &mut transcript,
        line.to_string(),
        EvalMode::default(),
    )
    .await;
    shared.bus.extend(transcript);
    eval
}

/// The [`LineContext`] handed to commands during a tick.
struct TickContext<'a> {
    shared: &'a Arc<Shared>,
    owner: Option<&'a mut ScriptInstance>,
    transcript: &'a mut Vec<TerminalMessage>,
    line: String,
    mode: EvalMode,
    parts: Vec<String>,
    failed: bool,
    jump: Option<usize>,
}

impl TickContext<'_> {
    fn finish(self) -> Evaluation {
        Evaluation {
            failed: self.failed,
            jump: if self.failed { None } else { self.jump },
            captured: self.parts.join("\n"),
        }
    }

    fn error_prefix(&self) -> String {
        match self.owner.as_deref() {
            Some(owner) => format!("{}#{} > ", owner.name, owner.counter + 1),
            None => String::new(),
        }
    }

    /// Stopping the owner (or shutting down, for bare lines) cancels this.
    fn cancel_token(&self) -> CancellationToken {
        match self.owner.as_deref() {
            Some(owner) => owner.cancel.clone(),
            None => self.shared.scheduler.shutdown_token(),
        }
    }
}

#[async_trait]
impl<'a> LineContext for TickContext<'a> {
    fn write(&mut self, text: &str, style: Style) {
        if !self.mode.quiet {
            self.transcript.push(TerminalMessage::Output {
                text: text.to_string(),
                style,
            });
        }
        match self.parts.last_mut() {
            Some(last) => last.push_str(text),
            None => self.parts.push(text.to_string()),
        }
    }

    fn respond(&mut self, text: &str, style: Style) {
        if !self.mode.quiet {
            self.transcript.push(TerminalMessage::Output {
                text: format!("{}\n", text),
                style,
            });
        }
        self.parts.push(text.to_string());
    }

    fn error(&mut self, text: &str) {
        let prefix = self.error_prefix();
        self.transcript.push(TerminalMessage::Error {
            text: format!("{}{}\n", prefix, text),
            style: Style::color(self.shared.config.error_color.clone()),
        });
        self.failed = true;
    }

    fn clear_screen(&mut self) {
        self.transcript.push(TerminalMessage::ClearScreen);
    }

    fn set_counter(&mut self, index: usize) -> bool {
        match self.owner.as_deref() {
            Some(owner) if index < owner.source.len() => {
                self.jump = Some(index);
                true
            }
            _ => false,
        }
    }

    fn current_index(&self) -> usize {
        self.owner.as_deref().map(|o| o.counter).unwrap_or(0)
    }

    fn source(&self) -> &[String] {
        match self.owner.as_deref() {
            Some(owner) => &owner.source,
            None => std::slice::from_ref(&self.line),
        }
    }

    fn is_pseudo(&self) -> bool {
        self.mode.pseudo
    }

    fn instance_name(&self) -> Option<&str> {
        self.owner.as_deref().map(|o| o.name.as_str())
    }

    fn interpolate(&self, text: &str) -> String {
        let globals = self.shared.globals();
        let locals = self.owner.as_deref().map(|o| &o.locals);
        interpolate(text, |name| lookup_text(locals, &globals, name))
    }

    fn variable(&self, name: &str) -> Option<Variable> {
        if let Some(var) = self.owner.as_deref().and_then(|o| o.locals.get(name)) {
            return Some(var.clone());
        }
        self.shared.globals().get(name).cloned()
    }

    fn assign(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        match self.owner.as_deref_mut() {
            Some(owner) => owner.locals.assign(name, value),
            None => self.shared.globals().assign(name, value),
        }
    }

    fn update(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        let local = self
            .owner
            .as_deref()
            .map(|o| o.locals.contains(name))
            .unwrap_or(false);
        if !local && self.shared.globals().contains(name) {
            return self.shared.globals().assign(name, value);
        }
        self.assign(name, value)
    }

    fn remove(&mut self, name: &str) -> Option<Variable> {
        match self.owner.as_deref_mut() {
            Some(owner) => owner.locals.remove(name),
            None => self.shared.globals().remove(name),
        }
    }

    fn assign_global(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        self.shared.globals().assign(name, value)
    }

    fn remove_global(&mut self, name: &str) -> Option<Variable> {
        self.shared.globals().remove(name)
    }

    fn commands(&self) -> &CommandRegistry {
        &self.shared.commands
    }

    fn device(&self) -> &dyn InputControl {
        self.shared.device.as_ref()
    }

    fn typing_cpm(&self) -> Option<f64> {
        match self.owner.as_deref() {
            Some(owner) => owner.settings.typing_cpm,
            None => self.shared.terminal_settings().typing_cpm,
        }
    }

    fn set_typing_cpm(&mut self, cpm: Option<f64>) {
        match self.owner.as_deref_mut() {
            Some(owner) => owner.settings.typing_cpm = cpm,
            None => self.shared.terminal_settings().typing_cpm = cpm,
        }
    }

    async fn evaluate(&mut self, line: &str, quiet: bool) -> Evaluation {
        let mode = EvalMode {
            pseudo: true,
            quiet: quiet || self.mode.quiet,
        };
        let eval = evaluate_line(
            self.shared,
            self.owner.as_deref_mut(),
            &mut *self.transcript,
            line.to_string(),
            mode,
        )
        .await;
        if eval.failed {
            self.failed = true;
        }
        if eval.jump.is_some() {
            self.jump = eval.jump;
        }
        eval
    }

    async fn sleep(&mut self, duration: Duration) {
        let cancel = self.cancel_token();
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    async fn run_scripts(&mut self, names: Vec<String>) -> Result<(), StartError> {
        let invoker = self.instance_name().map(str::to_string);
        let handle = self.shared.start_batch(invoker.as_deref(), &names)?;
        let cancel = self.cancel_token();
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = handle.wait() => {}
        }
        Ok(())
    }

    async fn read_input(&mut self) -> Option<String> {
        let cancel = self.cancel_token();
        self.shared.bus.push(TerminalMessage::InputEnabled { enabled: true });
        self.shared.note_input_request();
        let line = tokio::select! {
            _ = cancel.cancelled() => None,
            line = self.shared.next_input() => line,
        };
        self.shared.bus.push(TerminalMessage::InputEnabled {
            enabled: !self.shared.host_busy(),
        });
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_and_blank_lines_are_noops() {
        assert!(is_noop(""));
        assert!(is_noop("# note"));
        assert!(is_noop("// note"));
        assert!(!is_noop("print #"));
        assert!(!is_noop("/ x"));
    }
}

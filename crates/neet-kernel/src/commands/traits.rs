//! Core command traits and types.

use std::time::Duration;

use async_trait::async_trait;
use neet_types::{CommandSchema, Style, Variable};
use thiserror::Error;

use crate::device::{DeviceError, InputControl};
use crate::interpreter::{AssignError, Evaluation};
use crate::scheduler::StartError;

use super::registry::CommandRegistry;

/// How a command failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Arguments didn't fit the command's usage. Rendered from the schema.
    #[error("invalid usage")]
    Usage,
    /// Execution error with a message for the terminal.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }
}

impl From<AssignError> for CommandError {
    fn from(err: AssignError) -> Self {
        CommandError::Failed(err.to_string())
    }
}

impl From<StartError> for CommandError {
    fn from(err: StartError) -> Self {
        CommandError::Failed(err.to_string())
    }
}

impl From<DeviceError> for CommandError {
    fn from(err: DeviceError) -> Self {
        tracing::warn!(error = %err, "device command failed");
        CommandError::Failed(err.to_string())
    }
}

pub type CommandResult = Result<(), CommandError>;

/// A command that can be executed by the interpreter.
#[async_trait]
pub trait Command: Send + Sync {
    /// Names, description and usage.
    fn schema(&self) -> CommandSchema;

    /// Run with the raw (uninterpolated) argument tokens of the line.
    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult;
}

/// Everything a command handler may do while one line executes.
///
/// The interpreter's tick context implements this; tests can substitute
/// their own.
#[async_trait]
pub trait LineContext: Send {
    /// Partial output without a trailing newline.
    fn write(&mut self, text: &str, style: Style);

    /// A full response line. Also becomes part of the captured result.
    fn respond(&mut self, text: &str, style: Style);

    /// Report an execution error. The line is marked failed.
    fn error(&mut self, text: &str);

    fn clear_screen(&mut self);

    /// Set the owning instance's next line (0-based), suppressing the
    /// automatic advance. Returns false when no instance owns the line.
    fn set_counter(&mut self, index: usize) -> bool;

    /// The owning instance's current line (0-based), or 0 for bare lines.
    fn current_index(&self) -> usize;

    /// The owning instance's source lines, or the bare line itself.
    fn source(&self) -> &[String];

    fn is_pseudo(&self) -> bool;

    fn instance_name(&self) -> Option<&str>;

    /// Expand `$` references against the merged local/global view.
    fn interpolate(&self, text: &str) -> String;

    /// Read a variable: local first, then global.
    fn variable(&self, name: &str) -> Option<Variable>;

    /// Write to the active scope: the instance's locals, or globals for bare lines.
    fn assign(&mut self, name: &str, value: Variable) -> Result<(), AssignError>;

    /// Write a variable wherever it currently lives, else the active scope.
    fn update(&mut self, name: &str, value: Variable) -> Result<(), AssignError>;

    fn remove(&mut self, name: &str) -> Option<Variable>;

    fn assign_global(&mut self, name: &str, value: Variable) -> Result<(), AssignError>;

    fn remove_global(&mut self, name: &str) -> Option<Variable>;

    fn commands(&self) -> &CommandRegistry;

    fn device(&self) -> &dyn InputControl;

    /// Typing speed of the owner (instance or terminal).
    fn typing_cpm(&self) -> Option<f64>;

    fn set_typing_cpm(&mut self, cpm: Option<f64>);

    /// Evaluate another line as a pseudo tick of the same owner.
    ///
    /// A failure there fails this line too; a counter write there applies
    /// to the owner once this line finishes.
    async fn evaluate(&mut self, line: &str, quiet: bool) -> Evaluation;

    /// Suspend this line. Ends early if the owner is stopped.
    async fn sleep(&mut self, duration: Duration);

    /// Start a batch of scripts and wait for every member to end.
    async fn run_scripts(&mut self, names: Vec<String>) -> Result<(), StartError>;

    /// Wait for one line of external input. `None` if the owner is stopped
    /// or input is closed.
    async fn read_input(&mut self) -> Option<String>;
}

//! A running script.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::interpreter::Scope;

/// Identifies the batch an instance was started with.
pub type BatchId = u64;

/// Per-owner settings changed by commands like `typecpm`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OwnerSettings {
    /// Typing speed in characters per minute; `None` types at full speed.
    pub typing_cpm: Option<f64>,
}

/// One execution of a script.
///
/// The instance is owned by the driver's work unit while it runs; the
/// scheduler's active set only keeps its registration (generation, batch and
/// cancellation token).
#[derive(Debug)]
pub struct ScriptInstance {
    pub(crate) name: String,
    pub(crate) source: Arc<[String]>,
    /// Next line to execute, always inside `source` while running.
    pub(crate) counter: usize,
    pub(crate) locals: Scope,
    pub(crate) settings: OwnerSettings,
    pub(crate) generation: u64,
    pub(crate) batch: BatchId,
    pub(crate) cancel: CancellationToken,
}

impl ScriptInstance {
    pub(crate) fn new(
        name: String,
        text: &str,
        generation: u64,
        batch: BatchId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name,
            source: split_source(text).into(),
            counter: 0,
            locals: Scope::new(),
            settings: OwnerSettings::default(),
            generation,
            batch,
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &[String] {
        &self.source
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn locals(&self) -> &Scope {
        &self.locals
    }
}

/// Split script text into lines. `\r\n` endings are accepted.
pub fn split_source(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

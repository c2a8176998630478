//! neet-kernel: the core of the neet scripting runtime.
//!
//! This crate provides:
//!
//! - **Commands**: Command trait, registry, and builtin commands
//! - **Interpreter**: Scopes, `$` interpolation, and the tick engine
//! - **Scheduler**: Cooperative script instances and batch handling
//! - **Bus**: The ordered terminal message stream
//! - **Arithmetic**: Chained operator evaluation for `operation`
//! - **Device**: The input-control seam used by device commands
//! - **Store**: Where `run` finds script text
//! - **Kernel**: The host surface tying it together
//!
//! # Example
//!
//! ```no_run
//! use neet_kernel::{Kernel, KernelConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let kernel = Kernel::new(KernelConfig::isolated())?;
//! kernel.submit_line("var who world").await;
//! kernel.submit_line("print hello $who").await;
//! for message in kernel.drain_messages() {
//!     if let Some(text) = message.text() {
//!         print!("{}", text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod arithmetic;
pub mod bus;
pub mod commands;
pub mod device;
pub mod interpreter;
pub mod kernel;
pub mod scheduler;
pub mod store;
pub mod testing;

pub use bus::MessageBus;
pub use commands::{Command, CommandError, CommandRegistry, CommandResult, LineContext, RegistryError};
pub use device::{HeadlessDevice, InputControl, MouseButton, Point, ScreenSize};
pub use interpreter::{Evaluation, Scope};
pub use kernel::{Kernel, KernelConfig, SCRIPT_DIR_ENV};
pub use scheduler::{BatchHandle, EndReason, StartError, StopTarget};
pub use store::{DirStore, MemoryStore, ScriptStore, StoreError};

// Data types, so embedders need only one dependency
pub use neet_types::{CommandSchema, Style, TerminalMessage, Variable, VariableKind};

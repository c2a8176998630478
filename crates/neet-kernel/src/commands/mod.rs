//! Command system for neet.
//!
//! Every line of a script is `command arg arg ...`. Commands implement the
//! [`Command`] trait and receive a [`LineContext`] for output, variables,
//! control flow and the runtime's collaborators.
//!
//! # Architecture
//!
//! ```text
//! CommandRegistry
//! ├── control   (run, goto, skip, visit, if, assign, wait, stop)
//! ├── terminal  (help, clear, print, write, readline, readkey)
//! ├── vars      (var, glob, deletevar, vartype, list*, obj*)
//! ├── text      (isnumeric, substring, replace, replaceall)
//! ├── math      (operation, math, random, randomf)
//! └── device    (click, move, type, keytap, ...)
//! ```

mod builtin;
mod registry;
mod traits;

pub use builtin::{format_number, parse_integer, parse_number, register_builtins};
pub use registry::{CommandRegistry, RegisteredCommand, RegistryError};
pub use traits::{Command, CommandError, CommandResult, LineContext};

impl CommandRegistry {
    /// A registry holding every builtin command.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        register_builtins(&mut registry)?;
        Ok(registry)
    }
}

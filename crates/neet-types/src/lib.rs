//! Pure data types for neet: variables, terminal messages, command schemas.
//!
//! This crate is a leaf dependency with no async runtime and no I/O.
//! Front-ends that only consume the message stream can depend on it without
//! pulling in the kernel.

pub mod command;
pub mod message;
pub mod value;

// Flat re-exports for convenience
pub use command::*;
pub use message::*;
pub use value::*;

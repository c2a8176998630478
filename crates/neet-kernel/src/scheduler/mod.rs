//! Scheduler module for neet: cooperative script instances.
//!
//! This module provides:
//! - **Active set**: the insertion-ordered registry of running instances,
//!   batch bookkeeping and stop handling.
//! - **Driver**: one task that round-robins a tick of every instance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ScriptScheduler                          │
//! │  active: IndexMap<name, {generation, batch, cancel}>         │
//! │  - admit(batch) → BatchHandle        (ScriptListChanged)     │
//! │  - finish(instance, reason)          (ScriptListChanged)     │
//! │  - stop(name | all)                  (ScriptListChanged)     │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ inbox
//! ┌───────────────────────────▼──────────────────────────────────┐
//! │                         driver                               │
//! │  FuturesUnordered<advance(instance)>                         │
//! │  yield → tick → Running: re-queue / Ended: finish            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod active;
pub(crate) mod driver;
mod instance;

pub use active::{BatchHandle, EndReason, ScriptScheduler, StartError, StopTarget};
pub use instance::{split_source, BatchId, OwnerSettings, ScriptInstance};

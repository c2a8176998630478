//! The active set and batch bookkeeping.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use neet_types::TerminalMessage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::sync::CancellationToken;

use crate::bus::MessageBus;
use crate::store::StoreError;

use super::instance::{BatchId, ScriptInstance};

/// Why a batch was rejected. Nothing starts when one is returned.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("A script file cannot run itself.")]
    SelfReference(String),
    #[error("Cannot run the same file more than once: {0}")]
    Duplicate(String),
    #[error("Script is already running: {0}")]
    AlreadyActive(String),
    #[error("Invalid script: {0}")]
    UnknownScript(String),
    #[error("Scripts need a running tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which instances to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopTarget {
    Named(String),
    All,
}

impl From<&str> for StopTarget {
    /// `all` selects every instance; anything else is a name.
    fn from(name: &str) -> Self {
        if name == "all" {
            StopTarget::All
        } else {
            StopTarget::Named(name.to_string())
        }
    }
}

/// How an instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Ran past its last line.
    Completed,
    /// A line reported an error.
    Failed,
    /// Stopped from outside.
    Stopped,
}

/// Completion signal for a started batch.
#[derive(Debug)]
pub struct BatchHandle {
    id: BatchId,
    names: Vec<String>,
    done: oneshot::Receiver<()>,
}

impl BatchHandle {
    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Wait until every member has ended.
    pub async fn wait(self) {
        // A dropped sender means the scheduler shut down, which also ends the batch.
        let _ = self.done.await;
    }
}

struct ActiveEntry {
    generation: u64,
    batch: BatchId,
    cancel: CancellationToken,
}

struct Batch {
    remaining: usize,
    done: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct State {
    active: IndexMap<String, ActiveEntry>,
    batches: HashMap<BatchId, Batch>,
    next_batch: BatchId,
}

impl State {
    fn member_ended(&mut self, batch: BatchId) {
        let finished = match self.batches.get_mut(&batch) {
            Some(b) => {
                b.remaining = b.remaining.saturating_sub(1);
                b.remaining == 0
            }
            None => false,
        };
        if finished {
            if let Some(mut b) = self.batches.remove(&batch) {
                if let Some(done) = b.done.take() {
                    let _ = done.send(());
                }
            }
            tracing::debug!(batch, "batch finished");
        }
    }

    fn names(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }
}

/// Tracks active instances and hands new ones to the driver.
pub struct ScriptScheduler {
    state: Mutex<State>,
    inbox: mpsc::UnboundedSender<ScriptInstance>,
    driver_inbox: Mutex<Option<mpsc::UnboundedReceiver<ScriptInstance>>>,
    next_generation: AtomicU64,
    idle: Notify,
    shutdown: CancellationToken,
}

impl ScriptScheduler {
    pub fn new() -> Self {
        let (inbox, driver_inbox) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(State::default()),
            inbox,
            driver_inbox: Mutex::new(Some(driver_inbox)),
            next_generation: AtomicU64::new(1),
            idle: Notify::new(),
            shutdown: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate a batch before anything is loaded or started.
    pub fn check(&self, invoker: Option<&str>, names: &[String]) -> Result<(), StartError> {
        if let Some(invoker) = invoker {
            if names.iter().any(|n| n == invoker) {
                return Err(StartError::SelfReference(invoker.to_string()));
            }
        }

        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(StartError::Duplicate(name.clone()));
            }
        }

        let state = self.lock();
        if let Some(name) = names.iter().find(|n| state.active.contains_key(n.as_str())) {
            return Err(StartError::AlreadyActive(name.clone()));
        }
        Ok(())
    }

    /// Register a validated batch of `(name, text)` scripts and queue them.
    ///
    /// Emits one `ScriptListChanged` for the whole batch.
    pub fn admit(
        &self,
        bus: &MessageBus,
        scripts: Vec<(String, String)>,
    ) -> Result<BatchHandle, StartError> {
        let (done_tx, done) = oneshot::channel();
        let names: Vec<String> = scripts.iter().map(|(n, _)| n.clone()).collect();

        let mut state = self.lock();
        // Re-checked under the lock: another batch may have started meanwhile.
        if let Some(name) = names.iter().find(|n| state.active.contains_key(n.as_str())) {
            return Err(StartError::AlreadyActive(name.clone()));
        }

        state.next_batch += 1;
        let id = state.next_batch;

        if scripts.is_empty() {
            let _ = done_tx.send(());
            return Ok(BatchHandle { id, names, done });
        }

        state.batches.insert(
            id,
            Batch {
                remaining: scripts.len(),
                done: Some(done_tx),
            },
        );

        let mut instances = Vec::with_capacity(scripts.len());
        for (name, text) in scripts {
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            let cancel = self.shutdown.child_token();
            state.active.insert(
                name.clone(),
                ActiveEntry {
                    generation,
                    batch: id,
                    cancel: cancel.clone(),
                },
            );
            instances.push(ScriptInstance::new(name, &text, generation, id, cancel));
        }

        tracing::debug!(batch = id, scripts = ?names, "batch started");
        bus.push(TerminalMessage::ScriptListChanged {
            names: state.names(),
        });
        drop(state);

        for instance in instances {
            if self.inbox.send(instance).is_err() {
                tracing::warn!("script driver is gone; instance dropped");
            }
        }
        Ok(BatchHandle { id, names, done })
    }

    /// Hand the driver its inbox. Returns `None` once taken.
    pub(crate) fn take_driver_inbox(&self) -> Option<mpsc::UnboundedReceiver<ScriptInstance>> {
        self.driver_inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// True while `name` is registered with this exact generation.
    pub fn is_current(&self, name: &str, generation: u64) -> bool {
        self.lock()
            .active
            .get(name)
            .map(|e| e.generation == generation)
            .unwrap_or(false)
    }

    /// Run `f` only if the instance is still registered. The active set is
    /// locked for the duration, so a concurrent stop can't interleave.
    pub(crate) fn with_current<R>(
        &self,
        instance: &ScriptInstance,
        f: impl FnOnce() -> R,
    ) -> Option<R> {
        let state = self.lock();
        let current = state
            .active
            .get(&instance.name)
            .map(|e| e.generation == instance.generation)
            .unwrap_or(false);
        if current {
            Some(f())
        } else {
            None
        }
    }

    /// Remove an instance that ended on its own.
    pub(crate) fn finish(&self, bus: &MessageBus, instance: &ScriptInstance, reason: EndReason) {
        let mut state = self.lock();
        let current = state
            .active
            .get(&instance.name)
            .map(|e| e.generation == instance.generation)
            .unwrap_or(false);
        if !current {
            return;
        }

        state.active.shift_remove(&instance.name);
        tracing::debug!(script = %instance.name, ?reason, line = instance.counter + 1, "script ended");
        bus.push(TerminalMessage::ScriptListChanged {
            names: state.names(),
        });
        // After the push, so a waiter never sees the batch end before the list change.
        state.member_ended(instance.batch);
        let idle = state.active.is_empty();
        drop(state);

        if idle {
            self.idle.notify_waiters();
        }
    }

    /// Force-end instances. Returns the names stopped.
    pub fn stop(&self, bus: &MessageBus, target: &StopTarget) -> Vec<String> {
        let mut state = self.lock();
        let names: Vec<String> = match target {
            StopTarget::All => state.names(),
            StopTarget::Named(name) if state.active.contains_key(name.as_str()) => vec![name.clone()],
            StopTarget::Named(_) => Vec::new(),
        };
        if names.is_empty() {
            return names;
        }

        let mut ended = Vec::with_capacity(names.len());
        for name in &names {
            if let Some(entry) = state.active.shift_remove(name.as_str()) {
                entry.cancel.cancel();
                ended.push(entry.batch);
                tracing::debug!(script = %name, reason = ?EndReason::Stopped, "script ended");
            }
        }
        bus.push(TerminalMessage::ScriptListChanged {
            names: state.names(),
        });
        for batch in ended {
            state.member_ended(batch);
        }
        let idle = state.active.is_empty();
        drop(state);

        if idle {
            self.idle.notify_waiters();
        }
        names
    }

    /// Active instance names in start order.
    pub fn names(&self) -> Vec<String> {
        self.lock().names()
    }

    pub fn is_idle(&self) -> bool {
        self.lock().active.is_empty()
    }

    /// Wait until no instance is active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every instance and stop the driver.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Default for ScriptScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptScheduler")
            .field("active", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts(names: &[&str]) -> Vec<(String, String)> {
        names
            .iter()
            .map(|n| (n.to_string(), "print x".to_string()))
            .collect()
    }

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn rejects_self_reference() {
        let scheduler = ScriptScheduler::new();
        let err = scheduler.check(Some("A"), &owned(&["A", "B"])).unwrap_err();
        assert_eq!(err.to_string(), "A script file cannot run itself.");
    }

    #[test]
    fn rejects_duplicates() {
        let scheduler = ScriptScheduler::new();
        let err = scheduler.check(None, &owned(&["A", "A"])).unwrap_err();
        assert_eq!(err.to_string(), "Cannot run the same file more than once: A");
    }

    #[tokio::test]
    async fn admit_registers_in_order_and_emits_once() {
        let scheduler = ScriptScheduler::new();
        let bus = MessageBus::new();
        let handle = scheduler.admit(&bus, scripts(&["b", "a"])).unwrap();

        assert_eq!(scheduler.names(), vec!["b", "a"]);
        assert_eq!(handle.names(), ["b".to_string(), "a".to_string()]);
        assert_eq!(
            bus.drain(),
            vec![TerminalMessage::ScriptListChanged {
                names: owned(&["b", "a"])
            }]
        );
        assert!(scheduler.check(None, &owned(&["a"])).is_err());
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
        let scheduler = ScriptScheduler::new();
        let bus = MessageBus::new();
        let handle = scheduler.admit(&bus, Vec::new()).unwrap();
        handle.wait().await;
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn stop_all_completes_batch() {
        let scheduler = ScriptScheduler::new();
        let bus = MessageBus::new();
        let handle = scheduler.admit(&bus, scripts(&["a", "b"])).unwrap();
        bus.drain();

        let stopped = scheduler.stop(&bus, &StopTarget::All);
        assert_eq!(stopped, owned(&["a", "b"]));
        assert!(scheduler.is_idle());
        handle.wait().await;
        assert_eq!(
            bus.drain(),
            vec![TerminalMessage::ScriptListChanged { names: vec![] }]
        );
    }

    #[tokio::test]
    async fn stop_unknown_is_silent() {
        let scheduler = ScriptScheduler::new();
        let bus = MessageBus::new();
        assert!(scheduler.stop(&bus, &StopTarget::from("ghost")).is_empty());
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn stale_generation_is_not_current() {
        let scheduler = ScriptScheduler::new();
        let bus = MessageBus::new();
        scheduler.admit(&bus, scripts(&["a"])).unwrap();
        let mut inbox = scheduler.take_driver_inbox().unwrap();
        let first = inbox.recv().await.unwrap();

        scheduler.stop(&bus, &StopTarget::Named("a".into()));
        assert!(first.cancel.is_cancelled());
        scheduler.admit(&bus, scripts(&["a"])).unwrap();

        assert!(!scheduler.is_current("a", first.generation));
        assert!(scheduler.with_current(&first, || ()).is_none());
        // Finishing the stale instance must not remove the new one.
        scheduler.finish(&bus, &first, EndReason::Completed);
        assert_eq!(scheduler.names(), vec!["a"]);
    }

    #[test]
    fn stop_target_from_str() {
        assert_eq!(StopTarget::from("all"), StopTarget::All);
        assert_eq!(StopTarget::from("x"), StopTarget::Named("x".into()));
    }
}

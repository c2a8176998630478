//! The script driver.
//!
//! One task owns every running instance. Each instance is a unit in a
//! `FuturesUnordered` work set; a unit yields, runs a single tick and hands
//! the instance back. Running instances are re-queued, ended ones are removed
//! from the active set. A unit that suspends (wait, readline, a nested `run`)
//! only holds up its own instance.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::sync::mpsc;

use crate::interpreter::tick::tick_instance;
use crate::interpreter::TickOutcome;
use crate::kernel::Shared;

use super::instance::ScriptInstance;

type Unit = BoxFuture<'static, (ScriptInstance, TickOutcome)>;

/// Drive instances until the scheduler shuts down.
pub(crate) async fn drive(shared: Arc<Shared>, mut inbox: mpsc::UnboundedReceiver<ScriptInstance>) {
    let shutdown = shared.scheduler.shutdown_token();
    let mut units: FuturesUnordered<Unit> = FuturesUnordered::new();
    tracing::debug!("script driver started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = inbox.recv() => match received {
                Some(instance) => units.push(advance(Arc::clone(&shared), instance).boxed()),
                None => break,
            },
            Some((instance, outcome)) = units.next(), if !units.is_empty() => match outcome {
                TickOutcome::Running => units.push(advance(Arc::clone(&shared), instance).boxed()),
                TickOutcome::Ended(reason) => shared.scheduler.finish(&shared.bus, &instance, reason),
                TickOutcome::Cancelled => {
                    tracing::trace!(script = %instance.name, "dropping stopped instance");
                }
            },
        }
    }

    tracing::debug!(pending = units.len(), "script driver stopped");
}

/// Yield, then run one tick unless the instance was stopped meanwhile.
async fn advance(shared: Arc<Shared>, mut instance: ScriptInstance) -> (ScriptInstance, TickOutcome) {
    tokio::task::yield_now().await;

    if !shared.scheduler.is_current(&instance.name, instance.generation) {
        return (instance, TickOutcome::Cancelled);
    }

    let cancel = instance.cancel.clone();
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => TickOutcome::Cancelled,
        outcome = tick_instance(&shared, &mut instance) => outcome,
    };
    (instance, outcome)
}

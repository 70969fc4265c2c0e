//! Per-slot exclusive, cancellable loads.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{BoxStream, StreamExt};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use super::result::ResultModel;
use crate::error::{ErrorKind, SessionError};

/// Identifies "the current load" a screen cares about.
///
/// Screens usually own one slot, sub-slotted per pane:
/// ```
/// use petsit::load::Slot;
///
/// let slot = Slot::new("sitter_profile").pane("reviews");
/// assert_eq!(slot.as_str(), "sitter_profile/reviews");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot(String);

impl Slot {
    pub fn new(screen: impl Into<String>) -> Self {
        Self(screen.into())
    }

    pub fn pane(&self, pane: &str) -> Self {
        Self(format!("{}/{pane}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slot {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Slot {
    fn from(value: String) -> Self {
        Self(value)
    }
}

struct ActiveLoad {
    generation: u64,
    cancel: CancellationToken,
}

struct SlotState<T> {
    latest: Option<ResultModel<T>>,
    subscribers: Vec<mpsc::UnboundedSender<ResultModel<T>>>,
    active: Option<ActiveLoad>,
}

impl<T> Default for SlotState<T> {
    fn default() -> Self {
        Self {
            latest: None,
            subscribers: Vec::new(),
            active: None,
        }
    }
}

impl<T: Clone> SlotState<T> {
    fn publish(&mut self, model: ResultModel<T>) {
        self.subscribers.retain(|tx| tx.send(model.clone()).is_ok());
        self.latest = Some(model);
    }
}

/// Runs at most one producer per [`Slot`] and publishes its [`ResultModel`].
///
/// Starting a load on a busy slot cancels the running one; its result, if it
/// still arrives, is dropped. Cancellation publishes nothing. Observers get
/// every transition in order, so a slot never shows two terminal states in a
/// row. A producer that panics settles as `Failure(Unknown)`.
///
/// # Example
/// ```
/// use futures::StreamExt;
/// use petsit::load::{LoadCoordinator, ResultModel};
///
/// # #[tokio::main]
/// # async fn main() {
/// let loads: LoadCoordinator<Vec<String>> = LoadCoordinator::new();
/// let mut updates = loads.observe("bookings");
///
/// loads
///     .run("bookings", async { Ok(vec!["walk with Rex".to_string()]) })
///     .await
///     .unwrap();
///
/// assert_eq!(updates.next().await, Some(ResultModel::Pending));
/// assert!(matches!(updates.next().await, Some(ResultModel::Success(_))));
/// # }
/// ```
pub struct LoadCoordinator<T> {
    slots: Arc<Mutex<HashMap<Slot, SlotState<T>>>>,
    generations: Arc<AtomicU64>,
}

impl<T> Clone for LoadCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            generations: self.generations.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for LoadCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> LoadCoordinator<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start `producer` as the active load for `slot`, superseding any
    /// running one. The returned handle completes once the load settles or
    /// is cancelled.
    pub fn run<Fut>(&self, slot: impl Into<Slot>, producer: Fut) -> JoinHandle<()>
    where
        Fut: Future<Output = Result<T, SessionError>> + Send + 'static,
    {
        let slot = slot.into();
        let generation = self.generations.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        {
            let mut slots = self.lock_slots();
            let state = slots.entry(slot.clone()).or_default();
            let next = ActiveLoad {
                generation,
                cancel: cancel.clone(),
            };
            if let Some(previous) = state.active.replace(next) {
                tracing::debug!(slot = %slot, superseded = previous.generation, "superseding load");
                previous.cancel.cancel();
            }
            state.publish(ResultModel::Pending);
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                outcome = AssertUnwindSafe(producer).catch_unwind() => Some(outcome),
            };
            coordinator.settle(&slot, generation, outcome);
        })
    }

    /// Cancel the active load for `slot` without starting another. The last
    /// published state stays in place. Returns whether a load was running.
    pub fn cancel(&self, slot: impl Into<Slot>) -> bool {
        let slot = slot.into();
        let mut slots = self.lock_slots();
        let Some(active) = slots.get_mut(&slot).and_then(|state| state.active.take()) else {
            return false;
        };
        tracing::debug!(slot = %slot, generation = active.generation, "load cancelled");
        active.cancel.cancel();
        true
    }

    /// Cancel any active load for `slot` and drop its state. Open observers
    /// see their streams end. Slots otherwise live as long as the coordinator.
    pub fn forget(&self, slot: impl Into<Slot>) {
        let slot = slot.into();
        let Some(state) = self.lock_slots().remove(&slot) else {
            return;
        };
        if let Some(active) = state.active {
            active.cancel.cancel();
        }
        tracing::debug!(slot = %slot, "slot forgotten");
    }

    /// Latest state followed by every later transition for `slot`.
    pub fn observe(&self, slot: impl Into<Slot>) -> BoxStream<'static, ResultModel<T>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slots = self.lock_slots();
        let state = slots.entry(slot.into()).or_default();
        if let Some(latest) = &state.latest {
            tx.send(latest.clone()).ok();
        }
        state.subscribers.push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }

    pub fn latest(&self, slot: impl Into<Slot>) -> Option<ResultModel<T>> {
        self.lock_slots()
            .get(&slot.into())
            .and_then(|state| state.latest.clone())
    }

    pub fn is_active(&self, slot: impl Into<Slot>) -> bool {
        self.lock_slots()
            .get(&slot.into())
            .is_some_and(|state| state.active.is_some())
    }

    fn settle(
        &self,
        slot: &Slot,
        generation: u64,
        outcome: Option<std::thread::Result<Result<T, SessionError>>>,
    ) {
        let mut slots = self.lock_slots();
        let Some(state) = slots.get_mut(slot) else {
            return;
        };
        let still_active = state
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);
        if !still_active {
            tracing::debug!(slot = %slot, generation, "discarding superseded result");
            return;
        }
        state.active = None;
        let Some(outcome) = outcome else {
            return;
        };
        let model = match outcome {
            Ok(Ok(value)) => ResultModel::Success(value),
            Ok(Err(error)) => {
                tracing::warn!(slot = %slot, kind = %error.kind(), error = %error, "load failed");
                ResultModel::from_error(&error)
            }
            Err(_) => {
                tracing::error!(slot = %slot, generation, "load panicked");
                ResultModel::Failure(ErrorKind::Unknown, Some("load panicked".to_string()))
            }
        };
        state.publish(model);
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<Slot, SlotState<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

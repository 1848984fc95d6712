//! Look-ahead compilation of the next turn
//!
//! While the operator listens to the current turn, the next one is compiled
//! on a background task so its audio is ready when the queue runs low. At most
//! one compilation is in flight and at most one finished batch waits in the
//! pending slot.

use sdk::types::{PerRole, Turn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

use super::command::CompiledBatch;
use super::compiler::TurnCompiler;

#[derive(Debug, Default)]
struct SlotState {
    batch: Option<CompiledBatch>,
    in_flight: bool,
}

/// Hand-off point between the background compile and the executor
#[derive(Debug, Default)]
struct PendingSlot {
    state: Mutex<SlotState>,
    ready: Notify,
}

impl PendingSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Held by the compile task for as long as it owns the in-flight flag.
///
/// `fill` hands the flag back together with the batch. If the task ends any
/// other way the flag is cleared on drop.
struct InFlightGuard {
    slot: Arc<PendingSlot>,
    armed: bool,
}

impl InFlightGuard {
    fn new(slot: Arc<PendingSlot>) -> Self {
        Self { slot, armed: true }
    }

    fn fill(mut self, batch: CompiledBatch) {
        {
            let mut state = self.slot.lock();
            debug_assert!(state.batch.is_none(), "pending slot already full");
            state.batch = Some(batch);
            state.in_flight = false;
            self.armed = false;
        }
        self.slot.ready.notify_waiters();
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.slot.lock().in_flight = false;
        tracing::warn!("Turn compilation ended without a result");
        self.slot.ready.notify_waiters();
    }
}

/// Decides when to compile the next turn and owns the script cursor
pub struct PrefetchScheduler {
    script: Vec<Turn>,
    voices: PerRole<String>,
    next_index: usize,
    low_water_mark: usize,
    compiler: Arc<TurnCompiler>,
    slot: Arc<PendingSlot>,
}

impl PrefetchScheduler {
    pub fn new(
        script: Vec<Turn>,
        voices: PerRole<String>,
        compiler: Arc<TurnCompiler>,
        low_water_mark: usize,
    ) -> Self {
        Self {
            script,
            voices,
            next_index: 0,
            low_water_mark,
            compiler,
            slot: Arc::new(PendingSlot::default()),
        }
    }

    /// Start compiling the next turn if the queue is running low.
    ///
    /// Returns whether a compilation was started. Must be called from inside
    /// a tokio runtime.
    pub fn maybe_prefetch(&mut self, queue_len: usize) -> bool {
        if queue_len >= self.low_water_mark || self.next_index >= self.script.len() {
            return false;
        }

        {
            let mut state = self.slot.lock();
            if state.in_flight || state.batch.is_some() {
                return false;
            }
            state.in_flight = true;
        }

        let index = self.next_index;
        self.next_index += 1;

        let turn = self.script[index].clone();
        let voice = self.voices.get(turn.role).clone();
        let compiler = self.compiler.clone();
        let slot = self.slot.clone();

        tracing::debug!("Prefetching turn {} (queue length {})", index, queue_len);

        tokio::spawn(async move {
            let guard = InFlightGuard::new(slot);
            let batch = compiler.compile(index, &turn, &voice).await;
            guard.fill(batch);
        });

        true
    }

    /// Take the finished batch, if any
    pub fn take_pending(&self) -> Option<CompiledBatch> {
        self.slot.lock().batch.take()
    }

    /// True once every turn has been compiled and handed over
    pub fn is_finished(&self) -> bool {
        if self.next_index < self.script.len() {
            return false;
        }
        let state = self.slot.lock();
        !state.in_flight && state.batch.is_none()
    }

    pub fn is_in_flight(&self) -> bool {
        self.slot.lock().in_flight
    }

    pub fn has_pending(&self) -> bool {
        self.slot.lock().batch.is_some()
    }

    /// Wait until a batch lands in the slot or `timeout` elapses
    pub async fn wait_for_batch(&self, timeout: Duration) {
        let notified = self.slot.ready.notified();
        tokio::pin!(notified);
        // Register before checking so a fill in between is not missed
        notified.as_mut().enable();

        if self.has_pending() {
            return;
        }
        let _ = tokio::time::timeout(timeout, notified).await;
    }

    /// Index of the next turn to compile
    pub fn cursor(&self) -> usize {
        self.next_index
    }
}

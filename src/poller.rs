//! Timer-driven polling against the remote IoT API.
//!
//! Every screen in both binaries is the same pattern: a fixed-interval
//! poller issues a request, the decoded payload runs through a pure
//! reconciliation step, and the result lands in a piece of view state.
//! This module owns the timer half of that pattern and the sequence-guarded
//! state cell the reconciliation results are applied to.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Monotonic tick clock shared by every poller feeding the same state.
///
/// Each scheduled tick takes a sequence number at schedule time; applies
/// carrying an older number than the newest one already applied are
/// discarded, so a slow response can never overwrite fresher state.
#[derive(Debug, Clone, Default)]
pub struct PollSeq(Arc<AtomicU64>);

impl PollSeq {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Handle to a running poller. Stopping cancels the timer only; a request
/// already in flight finishes on its own and is fenced off at the state
/// cell instead.
#[derive(Debug)]
pub struct PollHandle {
    stopped: Arc<AtomicBool>,
    timer: JoinHandle<()>,
}

impl PollHandle {
    /// Cancel the pending timer. Safe to call any number of times.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.timer.abort();
            debug!("Poller stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Spawn a poller: one immediate tick, then one every `interval`.
///
/// Each tick runs as its own task so a slow response never delays the
/// schedule; overlapping responses are ordered by their sequence number
/// at the state cell. A tick may end the schedule from inside by
/// returning `ControlFlow::Break(())`.
pub fn spawn<F, Fut>(interval: Duration, seq: PollSeq, mut tick: F) -> PollHandle
where
    F: FnMut(u64) -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    let stopped = Arc::new(AtomicBool::new(false));

    let timer = tokio::spawn({
        let stopped = Arc::clone(&stopped);
        async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if stopped.load(Ordering::SeqCst) {
                    break;
                }

                let tick_seq = seq.next();
                let fut = tick(tick_seq);
                let stopped = Arc::clone(&stopped);
                tokio::spawn(async move {
                    if fut.await.is_break() {
                        stopped.store(true, Ordering::SeqCst);
                        debug!("Poller ended itself after tick {}", tick_seq);
                    }
                });
            }
        }
    });

    PollHandle { stopped, timer }
}

/// View state owned by a poller's caller, observable through a watch
/// channel and guarded against stale and post-stop writes.
#[derive(Debug, Clone)]
pub struct StateCell<T> {
    last_applied: Arc<Mutex<Option<u64>>>,
    closed: Arc<AtomicBool>,
    tx: Arc<watch::Sender<T>>,
}

impl<T> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);

        Self {
            last_applied: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
            tx: Arc::new(tx),
        }
    }

    /// Apply an update stamped with the tick that produced it. Returns
    /// false when the update is stale (an update from a later tick was
    /// already applied) or the cell is closed.
    pub fn apply(&self, seq: u64, update: impl FnOnce(&mut T)) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Discarding update for closed state (tick {})", seq);
            return false;
        }

        let mut last = self.last_applied.lock().unwrap();
        if let Some(applied) = *last {
            if seq < applied {
                warn!(
                    "Discarding stale update: tick {} arrived after tick {}",
                    seq, applied
                );
                return false;
            }
        }
        *last = Some(seq);
        self.tx.send_modify(update);
        true
    }

    /// Stop accepting updates. Called when the owning view unmounts so a
    /// response still in flight cannot mutate state afterwards.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> StateCell<T> {
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

//! Debounce Module
//!
//! Trailing-edge debounce on top of tokio timers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

#[derive(Debug)]
struct Slot<A> {
    generation: u64,
    args: Option<A>,
    timer: Option<JoinHandle<()>>,
}

// == Debouncer ==
/// Runs a callback once `delay` has passed without a new call, with the
/// arguments of the last call.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer<A: Send + 'static> {
    delay: Duration,
    callback: Callback<A>,
    slot: Arc<Mutex<Slot<A>>>,
}

/// Wraps `f` in a trailing-edge debouncer with the given quiet period.
pub fn debounce<A, F>(f: F, delay: Duration) -> Debouncer<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debouncer::new(f, delay)
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F>(f: F, delay: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            delay,
            callback: Arc::new(f),
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                args: None,
                timer: None,
            })),
        }
    }

    // == Call ==
    /// Schedules the callback with `args`, replacing any pending call and
    /// restarting the quiet period.
    pub fn call(&self, args: A) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.args = Some(args);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let generation = slot.generation;
        let delay = self.delay;
        let shared = Arc::clone(&self.slot);
        let callback = Arc::clone(&self.callback);

        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let args = {
                let mut slot = lock(&shared);
                // A newer call owns the slot now
                if slot.generation != generation {
                    return;
                }
                slot.timer = None;
                slot.args.take()
            };

            if let Some(args) = args {
                callback(args);
            }
        }));
    }

    // == Flush ==
    /// Runs a pending call immediately. Returns whether one was pending.
    pub fn flush(&self) -> bool {
        let args = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
            slot.args.take()
        };

        match args {
            Some(args) => {
                (self.callback)(args);
                true
            }
            None => false,
        }
    }

    // == Cancel ==
    /// Drops a pending call without running it.
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.args = None;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).args.is_some()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<A: Send + 'static> std::fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

// The callback never runs under the lock, so a poisoned slot is still consistent.
fn lock<A>(slot: &Mutex<Slot<A>>) -> MutexGuard<'_, Slot<A>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

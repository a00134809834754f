// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-slot cancellable timer.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Runs an action after a quiet period, keeping at most one pending.
///
/// Arming replaces (and aborts) any action still waiting, so a burst of
/// calls results in a single run of the last action, `delay` after the last
/// call. Once the delay elapsed the action runs in its own task and is no
/// longer affected by [`cancel`](Self::cancel), so a write is never torn
/// halfway through.
///
/// Must be armed from within a tokio runtime.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use laserctl_lib::dispatch::Debouncer;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let debouncer = Debouncer::new(Duration::from_millis(100));
/// let last = Arc::new(AtomicU32::new(0));
///
/// for value in [10, 20, 30] {
///     let last = Arc::clone(&last);
///     debouncer.arm(async move { last.store(value, Ordering::SeqCst) });
/// }
///
/// tokio::time::sleep(Duration::from_millis(150)).await;
/// assert_eq!(last.load(Ordering::SeqCst), 30);
/// # }
/// ```
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates an idle debouncer.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Returns the quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `action` to run after the quiet period, replacing any
    /// pending action.
    pub fn arm<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action);
        });

        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Drops the pending action, if any.
    ///
    /// Returns `true` if an action was still waiting.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    /// Returns `true` while an action is waiting for the quiet period.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(
        debouncer: &Debouncer,
        runs: &Arc<AtomicU32>,
        last: &Arc<AtomicU32>,
        value: u32,
    ) {
        let runs = Arc::clone(runs);
        let last = Arc::clone(last);
        debouncer.arm(async move {
            runs.fetch_add(1, Ordering::SeqCst);
            last.store(value, Ordering::SeqCst);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_last_action_once() {
        let debouncer = Debouncer::new(Duration::from_millis(150));
        let runs = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(0));

        for value in [10, 20, 30] {
            counting(&debouncer, &runs, &last, value);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(debouncer.is_pending());
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 30);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn separated_calls_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(0));

        counting(&debouncer, &runs, &last, 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        counting(&debouncer, &runs, &last, 2);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(last.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(0));

        counting(&debouncer, &runs, &last, 7);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}

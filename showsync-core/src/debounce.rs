//! Debounced value tracking
//!
//! [`Debounced<T>`] follows a rapidly changing input and publishes it only
//! once the input has stayed unchanged for a quiet period. Each new input
//! aborts the pending timer task and starts a fresh one, the same way a keyed
//! debounced task is replaced.
//!
//! # Example
//!
//! ```ignore
//! use showsync_core::Debounced;
//! use std::time::Duration;
//!
//! let mut channel = Debounced::new(String::new(), Duration::from_millis(200));
//! let mut settled = channel.subscribe();
//!
//! channel.set("1".into());
//! channel.set("12".into());
//!
//! settled.changed().await?;
//! assert_eq!(*settled.borrow(), "12");
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::trace;

/// A value that lags its input until the input settles.
///
/// The input can be set from synchronous code, but `set` and `set_delay`
/// spawn timer tasks and must run inside a tokio runtime.
pub struct Debounced<T> {
    input: T,
    delay: Duration,
    output: Arc<watch::Sender<T>>,
    pending: Option<AbortHandle>,
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start with `initial` as both input and output.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (output, _) = watch::channel(initial.clone());
        Self {
            input: initial,
            delay,
            output: Arc::new(output),
            pending: None,
        }
    }

    /// Record a new input and restart the quiet period.
    pub fn set(&mut self, value: T) {
        self.input = value;
        self.schedule();
    }

    /// Change the quiet period.
    ///
    /// An unsettled input restarts its timer with the new delay.
    pub fn set_delay(&mut self, delay: Duration) {
        if delay == self.delay {
            return;
        }
        self.delay = delay;
        if self.is_pending() || *self.output.borrow() != self.input {
            self.schedule();
        }
    }

    /// Drop the pending input, if any, without publishing it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// The settled value.
    pub fn value(&self) -> T {
        self.output.borrow().clone()
    }

    /// The most recent input, settled or not.
    pub fn input(&self) -> &T {
        &self.input
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether an input is waiting for its quiet period to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Receiver notified each time the settled value changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.subscribe()
    }

    fn schedule(&mut self) {
        self.cancel();

        let value = self.input.clone();
        let delay = self.delay;
        let output = Arc::clone(&self.output);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let published = output.send_if_modified(|current| {
                if *current == value {
                    return false;
                }
                *current = value;
                true
            });
            trace!(published, "Debounce settled");
        });

        self.pending = Some(handle.abort_handle());
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Instant};

    const DELAY: Duration = Duration::from_millis(200);

    #[tokio::test(start_paused = true)]
    async fn test_burst_settles_once_on_last_input() {
        let mut name = Debounced::new(String::new(), DELAY);
        let mut settled = name.subscribe();
        let start = Instant::now();

        name.set("L".into());
        sleep(Duration::from_millis(50)).await;
        name.set("Le".into());
        sleep(Duration::from_millis(70)).await;
        name.set("Lea".into());

        settled.changed().await.expect("sender alive");
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(320) && elapsed < Duration::from_millis(322),
            "settled after {elapsed:?}"
        );
        assert_eq!(*settled.borrow_and_update(), "Lea");

        // No further output
        assert!(timeout(Duration::from_secs(1), settled.changed()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_lags_input() {
        let mut count = Debounced::new(0u32, DELAY);
        count.set(5);

        assert_eq!(*count.input(), 5);
        assert_eq!(count.value(), 0);
        assert!(count.is_pending());

        sleep(DELAY + Duration::from_millis(1)).await;
        assert_eq!(count.value(), 5);
        assert!(!count.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_value_not_republished() {
        let mut count = Debounced::new(3u32, DELAY);
        let mut settled = count.subscribe();

        count.set(4);
        count.set(3);

        assert!(timeout(Duration::from_secs(1), settled.changed()).await.is_err());
        assert_eq!(count.value(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_output() {
        let mut count = Debounced::new(0u32, DELAY);
        let mut settled = count.subscribe();

        count.set(1);
        sleep(Duration::from_millis(100)).await;
        drop(count);

        // Sender is gone and nothing was published
        assert!(settled.changed().await.is_err());
        assert_eq!(*settled.borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_change_restarts_timer() {
        let mut count = Debounced::new(0u32, DELAY);
        let mut settled = count.subscribe();
        let start = Instant::now();

        count.set(9);
        sleep(Duration::from_millis(150)).await;
        count.set_delay(Duration::from_millis(100));

        settled.changed().await.expect("sender alive");
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(250) && elapsed < Duration::from_millis(252),
            "settled after {elapsed:?}"
        );
        assert_eq!(count.value(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_input() {
        let mut count = Debounced::new(0u32, DELAY);

        count.set(7);
        count.cancel();
        sleep(DELAY * 2).await;

        assert_eq!(count.value(), 0);
        assert_eq!(*count.input(), 7);
    }
}

//! Test utilities for showsync applications
//!
//! - [`MemoryBridge`]: scripted in-memory [`HostBridge`]
//! - [`EventLog`]: cloneable sink for callbacks, with an async wait
//! - [`char_key`] / [`key_press`]: terminal input for listener tests
//! - Assertion macros over received payloads
//! - Time control (`testing-time` feature) for debounce tests
//!
//! # Example
//!
//! ```ignore
//! use showsync_core::testing::{EventLog, MemoryBridge};
//! use showsync_core::EventChannel;
//!
//! let bridge = Arc::new(MemoryBridge::new());
//! let log = EventLog::new();
//!
//! let sink = log.clone();
//! let _sub = EventChannel::<ActorEvent>::of()
//!     .listen(&bridge, move |event| sink.push(event))
//!     .await?;
//!
//! bridge.emit("actorEvent", json!({"Removed": 3}));
//! log.wait_for_len(1).await;
//! assert_received!(log.snapshot(), ActorEvent::Removed(3));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::bridge::{BridgeError, CommandResponse, HostBridge, HostSubscription, ListenerId};
use crate::listener::RawEvent;

/// How long [`EventLog::wait_for_len`] waits before failing the test.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Terminal input
// ============================================================================

/// Create a `KeyEvent` for a character with no modifiers.
///
/// # Examples
///
/// ```
/// use showsync_core::testing::char_key;
/// use crossterm::event::KeyCode;
///
/// let k = char_key('x');
/// assert_eq!(k.code, KeyCode::Char('x'));
/// ```
pub fn char_key(c: char) -> KeyEvent {
    key_press(KeyCode::Char(c))
}

/// Create a key press for any key code, no modifiers.
pub fn key_press(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::empty(),
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

/// Raw terminal event for a key press, ready for `TerminalEvents::emit`.
pub fn raw_key(code: KeyCode) -> RawEvent {
    RawEvent::Key(key_press(code))
}

// ============================================================================
// EventLog
// ============================================================================

/// Shared, append-only record of values seen by a callback.
///
/// Clones share the same log, so one clone can move into a callback while the
/// test keeps the other.
pub struct EventLog<T> {
    entries: Arc<Mutex<Vec<T>>>,
    notify: Arc<Notify>,
}

impl<T> Clone for EventLog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }
}

impl<T> EventLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value and wake any waiter.
    pub fn push(&self, value: T) {
        lock(&self.entries).push(value);
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *lock(&self.entries))
    }

    /// Wait until at least `n` values were recorded.
    ///
    /// # Panics
    ///
    /// Panics after [`WAIT_LIMIT`], so a missing delivery fails the test
    /// instead of hanging it.
    pub async fn wait_for_len(&self, n: usize) {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.len() >= n {
                    return;
                }
                notified.await;
            }
        };

        if tokio::time::timeout(WAIT_LIMIT, wait).await.is_err() {
            panic!("expected {n} entries, got {} after {WAIT_LIMIT:?}", self.len());
        }
    }
}

impl<T: Clone> EventLog<T> {
    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.entries).clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for EventLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(lock(&self.entries).iter()).finish()
    }
}

// ============================================================================
// MemoryBridge
// ============================================================================

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    channels: Option<HashSet<String>>,
    listeners: HashMap<String, Vec<(ListenerId, mpsc::UnboundedSender<Value>)>>,
    responses: HashMap<String, CommandResponse>,
    invocations: Vec<Value>,
}

/// Minimal scripted host.
///
/// Commands answer with whatever was registered through
/// [`respond`](Self::respond), keyed by the request's `command` field. Events
/// are pushed by the test with [`emit`](Self::emit).
#[derive(Clone, Default)]
pub struct MemoryBridge {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBridge {
    /// Bridge accepting listeners on any channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge that only exposes the given channels.
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bridge = Self::new();
        lock(&bridge.state).channels = Some(channels.into_iter().map(Into::into).collect());
        bridge
    }

    /// Answer every future `command` request with `response`.
    pub fn respond(&self, command: impl Into<String>, response: CommandResponse) {
        lock(&self.state)
            .responses
            .insert(command.into(), response);
    }

    /// Send `payload` to every listener on `channel`. Returns how many got it.
    pub fn emit(&self, channel: &str, payload: Value) -> usize {
        let mut state = lock(&self.state);
        let Some(listeners) = state.listeners.get_mut(channel) else {
            return 0;
        };
        listeners.retain(|(_, tx)| !tx.is_closed());
        listeners
            .iter()
            .filter(|(_, tx)| tx.send(payload.clone()).is_ok())
            .count()
    }

    /// End every stream on `channel`, as a host shutting it down would.
    pub fn close_channel(&self, channel: &str) {
        lock(&self.state).listeners.remove(channel);
    }

    /// Live registrations on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        lock(&self.state)
            .listeners
            .get(channel)
            .map_or(0, |listeners| {
                listeners.iter().filter(|(_, tx)| !tx.is_closed()).count()
            })
    }

    /// Listener registrations held for `channel`, including ones whose
    /// receiver is already gone. Only `unlisten` removes them.
    pub fn registrations(&self, channel: &str) -> usize {
        lock(&self.state).listeners.get(channel).map_or(0, Vec::len)
    }

    /// Every request received so far, in order.
    pub fn invocations(&self) -> Vec<Value> {
        lock(&self.state).invocations.clone()
    }
}

impl HostBridge for MemoryBridge {
    async fn invoke(&self, request: Value) -> Result<CommandResponse, BridgeError> {
        let mut state = lock(&self.state);
        let command = request
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        state.invocations.push(request);
        state
            .responses
            .get(&command)
            .cloned()
            .ok_or(BridgeError::UnknownCommand(command))
    }

    async fn listen(&self, channel: &'static str) -> Result<HostSubscription, BridgeError> {
        let mut state = lock(&self.state);
        if let Some(channels) = &state.channels {
            if !channels.contains(channel) {
                return Err(BridgeError::UnknownChannel(channel.to_owned()));
            }
        }

        state.next_id += 1;
        let id = ListenerId(state.next_id);
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .listeners
            .entry(channel.to_owned())
            .or_default()
            .push((id, tx));

        Ok(HostSubscription {
            id,
            events: Box::pin(UnboundedReceiverStream::new(rx)),
        })
    }

    async fn unlisten(&self, channel: &'static str, id: ListenerId) {
        if let Some(listeners) = lock(&self.state).listeners.get_mut(channel) {
            listeners.retain(|(registered, _)| *registered != id);
        }
    }
}

// ============================================================================
// Time control (feature = "testing-time")
// ============================================================================

/// Freeze the tokio clock for the current runtime.
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Let the tokio clock run again.
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Move the frozen clock forward, firing due timers.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: Duration) {
    tokio::time::advance(duration).await;
}

// ============================================================================
// Assertions
// ============================================================================

/// Assert that a payload matching the pattern was received.
///
/// # Example
///
/// ```ignore
/// use showsync_core::assert_received;
///
/// let events = log.snapshot();
/// assert_received!(events, ActorEvent::Removed(3));
/// assert_received!(events, ActorEvent::Added(id, _) if *id > 2);
/// ```
#[macro_export]
macro_rules! assert_received {
    ($received:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $received.iter().any(|r| matches!(r, $pattern $(if $guard)?)),
            "Expected payload matching `{}` to be received, but got: {:?}",
            stringify!($pattern),
            $received
        );
    };
}

/// Assert that no payload matching the pattern was received.
#[macro_export]
macro_rules! assert_not_received {
    ($received:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$received.iter().any(|r| matches!(r, $pattern $(if $guard)?)),
            "Expected payload matching `{}` NOT to be received, but it was: {:?}",
            stringify!($pattern),
            $received
        );
    };
}

/// Count how many received payloads match a pattern.
#[macro_export]
macro_rules! count_received {
    ($received:expr, $pattern:pat $(if $guard:expr)?) => {
        $received.iter().filter(|r| matches!(r, $pattern $(if $guard)?)).count()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_stream::StreamExt;

    #[test]
    fn test_char_key() {
        let k = char_key('x');
        assert_eq!(k.code, KeyCode::Char('x'));
        assert_eq!(k.modifiers, KeyModifiers::empty());
        assert_eq!(k.kind, KeyEventKind::Press);
    }

    #[tokio::test]
    async fn test_event_log_wait() {
        let log = EventLog::new();
        let writer = log.clone();

        tokio::spawn(async move {
            for n in 0..3 {
                writer.push(n);
                tokio::task::yield_now().await;
            }
        });

        log.wait_for_len(3).await;
        assert_eq!(log.take(), vec![0, 1, 2]);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_memory_bridge_scripted_command() {
        let bridge = MemoryBridge::new();
        bridge.respond("getShow", CommandResponse::error("no show"));

        let response = bridge
            .invoke(json!({"command": "getShow"}))
            .await
            .expect("scripted");
        assert_eq!(response, CommandResponse::error("no show"));

        let unknown = bridge.invoke(json!({"command": "addCue"})).await;
        assert!(matches!(unknown, Err(BridgeError::UnknownCommand(c)) if c == "addCue"));

        assert_eq!(bridge.invocations().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_bridge_delivery_and_close() {
        let bridge = MemoryBridge::new();
        let mut sub = bridge.listen("showEvent").await.expect("listen");

        assert_eq!(bridge.emit("showEvent", json!(1)), 1);
        assert_eq!(sub.events.next().await, Some(json!(1)));

        bridge.close_channel("showEvent");
        assert_eq!(sub.events.next().await, None);
    }

    #[tokio::test]
    async fn test_memory_bridge_unlisten() {
        let bridge = MemoryBridge::new();
        let sub = bridge.listen("actorEvent").await.expect("listen");
        assert_eq!(bridge.listener_count("actorEvent"), 1);

        bridge.unlisten("actorEvent", sub.id).await;
        assert_eq!(bridge.listener_count("actorEvent"), 0);
        assert_eq!(bridge.emit("actorEvent", json!(null)), 0);
    }

    #[derive(Debug, PartialEq)]
    enum Seen {
        Added(u32),
        Removed(u32),
    }

    #[test]
    fn test_assert_macros() {
        let received = vec![Seen::Added(1), Seen::Removed(1), Seen::Added(2)];

        assert_received!(received, Seen::Removed(1));
        assert_received!(received, Seen::Added(id) if *id > 1);
        assert_not_received!(received, Seen::Removed(2));
        assert_eq!(count_received!(received, Seen::Added(_)), 2);
    }
}

//! Scoped listener binding for native event sources
//!
//! A [`ScopedListener`] attaches one callback to an [`EventSource`] and keeps
//! it attached exactly as long as the guard lives, or until its dependency
//! value changes. Every `add_listener` is paired with exactly one
//! `remove_listener`.
//!
//! Which events a source can emit is part of its type: a source emits `E`
//! only if it implements `EventSource<E>`. Binding an event the source does
//! not emit fails to compile:
//!
//! ```compile_fail
//! use showsync_core::listener::{EventSource, KeyDown, Listener, Resize, ScopedListener};
//! use showsync_core::ListenerId;
//! use crossterm::event::KeyEvent;
//!
//! struct Keyboard;
//!
//! impl EventSource<KeyDown> for Keyboard {
//!     fn add_listener(&self, _listener: Listener<KeyEvent>) -> ListenerId {
//!         ListenerId(0)
//!     }
//!     fn remove_listener(&self, _id: ListenerId) -> bool {
//!         true
//!     }
//! }
//!
//! // A keyboard never resizes
//! let _guard = ScopedListener::<_, Resize>::bind(Keyboard, |_size| {});
//! ```
//!
//! [`TerminalEvents`] is the concrete source for the terminal UI; it is fed
//! from the crossterm poller spawned by [`spawn_event_poller`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossterm::event::{self, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::bridge::ListenerId;

/// A named event a native source can emit.
pub trait NativeEvent: 'static {
    /// Event name, for diagnostics
    const NAME: &'static str;
    /// Data handed to listeners
    type Payload: 'static;
}

/// Callback registered on a native source.
pub type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// A native source able to emit `E`.
pub trait EventSource<E: NativeEvent> {
    /// Attach `listener`, returning the id needed to detach it.
    fn add_listener(&self, listener: Listener<E::Payload>) -> ListenerId;

    /// Detach a listener. Returns false if the id was not attached.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

impl<E: NativeEvent, T: EventSource<E> + ?Sized> EventSource<E> for &T {
    fn add_listener(&self, listener: Listener<E::Payload>) -> ListenerId {
        (**self).add_listener(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        (**self).remove_listener(id)
    }
}

impl<E: NativeEvent, T: EventSource<E> + ?Sized> EventSource<E> for Arc<T> {
    fn add_listener(&self, listener: Listener<E::Payload>) -> ListenerId {
        (**self).add_listener(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        (**self).remove_listener(id)
    }
}

/// RAII binding of one listener to one source.
///
/// `D` is the dependency value. [`update`](Self::update) re-binds only when it
/// changed; use `()` for a binding that never re-binds.
pub struct ScopedListener<S, E, D = ()>
where
    S: EventSource<E>,
    E: NativeEvent,
{
    source: S,
    deps: D,
    id: Option<ListenerId>,
    _event: PhantomData<fn() -> E>,
}

impl<S, E> ScopedListener<S, E, ()>
where
    S: EventSource<E>,
    E: NativeEvent,
{
    /// Attach `listener` to `source` until the guard is dropped.
    pub fn bind<F>(source: S, listener: F) -> Self
    where
        F: Fn(&E::Payload) + Send + Sync + 'static,
    {
        Self::bind_with_deps(source, (), listener)
    }
}

impl<S, E, D> ScopedListener<S, E, D>
where
    S: EventSource<E>,
    E: NativeEvent,
    D: PartialEq,
{
    /// Attach `listener`, remembering `deps` for later [`update`](Self::update) calls.
    pub fn bind_with_deps<F>(source: S, deps: D, listener: F) -> Self
    where
        F: Fn(&E::Payload) + Send + Sync + 'static,
    {
        let id = source.add_listener(Arc::new(listener));
        trace!(event = E::NAME, listener = %id, "Listener attached");
        Self {
            source,
            deps,
            id: Some(id),
            _event: PhantomData,
        }
    }

    /// Re-bind when `deps` differs from the current dependency value.
    ///
    /// The old listener is removed before the new one is added. A detached
    /// guard is always re-attached. Returns whether a new listener was bound.
    pub fn update<F>(&mut self, deps: D, make_listener: impl FnOnce(&D) -> F) -> bool
    where
        F: Fn(&E::Payload) + Send + Sync + 'static,
    {
        if self.id.is_some() && self.deps == deps {
            return false;
        }

        self.detach();
        let listener = make_listener(&deps);
        let id = self.source.add_listener(Arc::new(listener));
        trace!(event = E::NAME, listener = %id, "Listener re-attached");
        self.id = Some(id);
        self.deps = deps;
        true
    }
}

impl<S, E, D> ScopedListener<S, E, D>
where
    S: EventSource<E>,
    E: NativeEvent,
{
    /// Detach now instead of on drop. Idempotent.
    pub fn detach(&mut self) {
        if let Some(id) = self.id.take() {
            self.source.remove_listener(id);
            trace!(event = E::NAME, listener = %id, "Listener detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.id.is_some()
    }

    pub fn deps(&self) -> &D {
        &self.deps
    }
}

impl<S, E, D> Drop for ScopedListener<S, E, D>
where
    S: EventSource<E>,
    E: NativeEvent,
{
    fn drop(&mut self) {
        self.detach();
    }
}

impl<S, E, D> fmt::Debug for ScopedListener<S, E, D>
where
    S: EventSource<E>,
    E: NativeEvent,
    D: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedListener")
            .field("event", &E::NAME)
            .field("deps", &self.deps)
            .field("id", &self.id)
            .finish()
    }
}

// ============================================================================
// Terminal source
// ============================================================================

/// Key pressed (or auto-repeated). Releases are not reported.
#[derive(Debug, Clone, Copy)]
pub enum KeyDown {}

impl NativeEvent for KeyDown {
    const NAME: &'static str = "keydown";
    type Payload = KeyEvent;
}

/// Mouse click, drag, move or scroll.
#[derive(Debug, Clone, Copy)]
pub enum MouseInput {}

impl NativeEvent for MouseInput {
    const NAME: &'static str = "mouse";
    type Payload = MouseEvent;
}

/// Terminal resized to `(columns, rows)`.
#[derive(Debug, Clone, Copy)]
pub enum Resize {}

impl NativeEvent for Resize {
    const NAME: &'static str = "resize";
    type Payload = (u16, u16);
}

/// Raw event from crossterm before processing
#[derive(Debug, Clone)]
pub enum RawEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

type Slot<P> = Vec<(ListenerId, Listener<P>)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    key_down: Slot<KeyEvent>,
    mouse: Slot<MouseEvent>,
    resize: Slot<(u16, u16)>,
}

impl Registry {
    fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }
}

/// The terminal as a native event source.
///
/// Cheap to clone; clones share listeners.
#[derive(Clone, Default)]
pub struct TerminalEvents {
    registry: Arc<Mutex<Registry>>,
}

impl TerminalEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a raw terminal event to the matching listeners.
    ///
    /// Listeners run on the caller's task, outside the registry lock, so they
    /// may attach or detach listeners themselves. Returns how many ran.
    pub fn emit(&self, raw: &RawEvent) -> usize {
        match raw {
            RawEvent::Key(key) if key.kind == KeyEventKind::Release => 0,
            RawEvent::Key(key) => notify(self.snapshot(|r| &r.key_down), key),
            RawEvent::Mouse(mouse) => notify(self.snapshot(|r| &r.mouse), mouse),
            RawEvent::Resize(w, h) => notify(self.snapshot(|r| &r.resize), &(*w, *h)),
        }
    }

    /// Number of attached listeners across all events.
    pub fn listener_count(&self) -> usize {
        let registry = self.lock();
        registry.key_down.len() + registry.mouse.len() + registry.resize.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot<P>(&self, slot: impl FnOnce(&Registry) -> &Slot<P>) -> Vec<Listener<P>> {
        let registry = self.lock();
        slot(&*registry)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

fn notify<P>(listeners: Vec<Listener<P>>, payload: &P) -> usize {
    for listener in &listeners {
        listener(payload);
    }
    listeners.len()
}

impl fmt::Debug for TerminalEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

macro_rules! terminal_source {
    ($event:ty, $slot:ident) => {
        impl EventSource<$event> for TerminalEvents {
            fn add_listener(
                &self,
                listener: Listener<<$event as NativeEvent>::Payload>,
            ) -> ListenerId {
                let mut registry = self.lock();
                let id = registry.allocate();
                registry.$slot.push((id, listener));
                id
            }

            fn remove_listener(&self, id: ListenerId) -> bool {
                let mut registry = self.lock();
                let before = registry.$slot.len();
                registry.$slot.retain(|(attached, _)| *attached != id);
                registry.$slot.len() != before
            }
        }
    };
}

terminal_source!(KeyDown, key_down);
terminal_source!(MouseInput, mouse);
terminal_source!(Resize, resize);

/// Timing of the crossterm poller.
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Timeout passed to each `crossterm::event::poll` call.
    pub poll_timeout: Duration,
    /// Sleep between poll cycles.
    pub loop_sleep: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            loop_sleep: Duration::from_millis(16),
        }
    }
}

/// Spawn the event polling task with cancellation support
///
/// Polls crossterm and forwards key, mouse and resize events through `tx`.
/// The receiving loop hands them to [`TerminalEvents::emit`].
pub fn spawn_event_poller(
    tx: mpsc::UnboundedSender<RawEvent>,
    config: PollerConfig,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        const MAX_EVENTS_PER_BATCH: usize = 20;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Event poller cancelled, draining buffer");
                    while event::poll(Duration::ZERO).unwrap_or(false) {
                        let _ = event::read();
                    }
                    break;
                }
                _ = tokio::time::sleep(config.loop_sleep) => {
                    let mut events_processed = 0;
                    while events_processed < MAX_EVENTS_PER_BATCH
                        && event::poll(config.poll_timeout).unwrap_or(false)
                    {
                        events_processed += 1;
                        let raw = match event::read() {
                            Ok(event::Event::Key(key)) => RawEvent::Key(key),
                            Ok(event::Event::Mouse(mouse)) => RawEvent::Mouse(mouse),
                            Ok(event::Event::Resize(w, h)) => RawEvent::Resize(w, h),
                            _ => continue,
                        };
                        if tx.send(raw).is_err() {
                            debug!("Event channel closed, stopping poller");
                            return;
                        }
                    }
                }
            }
        }
    })
}

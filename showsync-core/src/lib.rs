//! Core synchronization primitives for showsync
//!
//! This crate provides the building blocks for keeping a front-end replica of
//! a host-owned document in sync, following an event-sourced architecture:
//! the host is the source of truth, and the front end folds the events it
//! broadcasts.
//!
//! # Core Concepts
//!
//! - **HostBridge**: Command/response surface plus named event channels
//! - **EventChannel**: Typed, ordered delivery from one host channel
//! - **KeyedVariant / Route**: Tag-to-handler routing for tagged-union events
//! - **ConfirmationBroker**: Queued yes/no prompts awaited by any task
//! - **Debounced**: Values that settle after a quiet period
//! - **ScopedListener**: RAII binding of a callback to a native event source
//!
//! # Basic Example
//!
//! ```ignore
//! use showsync_core::prelude::*;
//!
//! #[derive(Deserialize, KeyedVariant)]
//! #[keyed(channel = "groupEvent")]
//! enum GroupEvent {
//!     Added(GroupId, Group),
//!     Removed(GroupId),
//! }
//!
//! let unlisten = listen_keyed::<GroupEvent, _, _>(&bridge, groups).await?;
//! // ...
//! unlisten.unlisten().await?;
//! ```

pub mod bridge;
pub mod channel;
pub mod confirm;
pub mod debounce;
pub mod dispatch;
pub mod listener;
pub mod subscriptions;
pub mod testing;

// Host boundary
pub use bridge::{
    BridgeError, CommandResponse, EventStream, HostBridge, HostSubscription, ListenerId,
};

// Channels and dispatch
pub use channel::{ChannelError, EventChannel, HostEvent, Unlisten};
pub use dispatch::{dispatch_value, listen_keyed, KeyedVariant, Route};
pub use subscriptions::{ChannelSubscriptions, SubKey};

// UI-side primitives
pub use confirm::{
    BrokerPhase, Confirmation, ConfirmationBroker, ConfirmationContent, ConfirmStyle, Prompt,
    PromptId,
};
pub use debounce::Debounced;
pub use listener::{
    spawn_event_poller, EventSource, KeyDown, Listener, MouseInput, NativeEvent, PollerConfig,
    RawEvent, Resize, ScopedListener, TerminalEvents,
};

// Testing exports
pub use testing::{char_key, key_press, raw_key, EventLog, MemoryBridge};

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{BridgeError, CommandResponse, HostBridge, ListenerId};
    pub use crate::channel::{ChannelError, EventChannel, HostEvent, Unlisten};
    pub use crate::confirm::{ConfirmationBroker, ConfirmationContent, ConfirmStyle};
    pub use crate::debounce::Debounced;
    pub use crate::dispatch::{listen_keyed, KeyedVariant, Route};
    pub use crate::listener::{
        EventSource, KeyDown, MouseInput, NativeEvent, Resize, ScopedListener, TerminalEvents,
    };
    pub use crate::subscriptions::{ChannelSubscriptions, SubKey};
}

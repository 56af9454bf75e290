//! Keyed variant dispatch
//!
//! Host events are tagged unions serialized as single-key records
//! (`{"Added": [3, {...}]}`). Decoding turns them into a Rust enum; routing
//! then calls exactly one method of a handler trait per variant. Both traits
//! are normally derived with `#[derive(KeyedVariant)]`, which also generates
//! the handler trait with one required method per variant, so a handler that
//! misses a variant does not compile.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Deserialize, KeyedVariant)]
//! #[keyed(channel = "actorEvent")]
//! enum ActorEvent {
//!     Added(ActorId, Actor),
//!     Removed(ActorId),
//! }
//!
//! struct Roster(HashMap<ActorId, Actor>);
//!
//! impl ActorEventHandler for Roster {
//!     fn on_added(&mut self, (id, actor): (ActorId, Actor)) {
//!         self.0.insert(id, actor);
//!     }
//!     fn on_removed(&mut self, id: ActorId) {
//!         self.0.remove(&id);
//!     }
//! }
//!
//! let unlisten = listen_keyed::<ActorEvent, _, _>(&bridge, roster).await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::bridge::HostBridge;
use crate::channel::{ChannelError, EventChannel, HostEvent, Unlisten};

/// A tagged union whose variants are identified by a static tag.
pub trait KeyedVariant {
    /// Every tag this union can carry, in declaration order
    const TAGS: &'static [&'static str];

    /// Tag of this value
    fn tag(&self) -> &'static str;
}

/// Routes a variant to the matching method of handler `H`.
pub trait Route<H: ?Sized>: KeyedVariant {
    /// Invoke exactly one handler method with the variant's unwrapped data.
    fn route(self, handler: &mut H);
}

/// Subscribe `handler` to the channel of `E`.
///
/// Each payload is decoded into `E` and routed to `handler`. The returned
/// handle tears the subscription down like any other channel subscription.
pub async fn listen_keyed<E, H, B>(
    bridge: &Arc<B>,
    mut handler: H,
) -> Result<Unlisten<B>, ChannelError>
where
    E: HostEvent + Route<H>,
    H: Send + 'static,
    B: HostBridge,
{
    EventChannel::<E>::of()
        .listen(bridge, move |event: E| {
            trace!(channel = E::CHANNEL, tag = event.tag(), "Routing host event");
            event.route(&mut handler);
        })
        .await
}

/// Decode one raw payload and route it, without a bridge.
///
/// Returns the routed tag.
pub fn dispatch_value<E, H>(payload: Value, handler: &mut H) -> Result<&'static str, serde_json::Error>
where
    E: HostEvent + Route<H>,
    H: ?Sized,
{
    let event: E = serde_json::from_value(payload)?;
    let tag = event.tag();
    event.route(handler);
    Ok(tag)
}

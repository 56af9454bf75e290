//! Typed adapter over a single named host channel
//!
//! A host channel delivers JSON payloads. [`EventChannel<T>`] decodes each
//! payload into `T` and hands it to a callback, one invocation per message,
//! in the order the host sent them. Listening returns an [`Unlisten`] handle;
//! awaiting [`Unlisten::unlisten`] guarantees that no further callback
//! invocations happen.
//!
//! # Example
//!
//! ```ignore
//! use showsync_core::{EventChannel, HostEvent};
//!
//! #[derive(serde::Deserialize)]
//! enum ActorEvent { Added(u32, Actor), Removed(u32) }
//!
//! impl HostEvent for ActorEvent {
//!     const CHANNEL: &'static str = "actorEvent";
//! }
//!
//! let unlisten = EventChannel::<ActorEvent>::of()
//!     .listen(&bridge, |event| println!("{event:?}"))
//!     .await?;
//!
//! // ... later, on teardown
//! unlisten.unlisten().await?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::bridge::{BridgeError, HostBridge, HostSubscription, ListenerId};

/// A payload type bound to the host channel that carries it.
///
/// This is the compile-time mapping from channel to payload: a channel name
/// can only be listened to with the type that declares it.
pub trait HostEvent: DeserializeOwned + Send + 'static {
    /// Name of the host channel
    const CHANNEL: &'static str;
}

/// Failures of a channel subscription.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The bridge refused or lost the registration
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    /// A payload did not match the channel's declared union.
    ///
    /// Delivery on the subscription stops at the first such payload.
    #[error("undecodable payload on channel `{channel}`: {source}")]
    Decode {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The callback panicked while handling a payload
    #[error("listener on channel `{channel}` panicked")]
    Panicked { channel: &'static str },
}

/// Typed view of one host channel.
pub struct EventChannel<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> EventChannel<T> {
    /// Bind a payload type to an explicitly named channel.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: HostEvent> EventChannel<T> {
    /// The channel declared by `T`.
    pub const fn of() -> Self {
        Self::named(T::CHANNEL)
    }
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EventChannel<T> {}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventChannel").field(&self.name).finish()
    }
}

impl<T> EventChannel<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Register `callback` for every message on this channel.
    ///
    /// The callback runs on a delivery task, once per message, in host order.
    /// Must be called from within a tokio runtime.
    pub async fn listen<B, F>(
        &self,
        bridge: &Arc<B>,
        mut callback: F,
    ) -> Result<Unlisten<B>, ChannelError>
    where
        B: HostBridge,
        F: FnMut(T) + Send + 'static,
    {
        let channel = self.name;
        let HostSubscription { id, mut events } = bridge.listen(channel).await?;
        debug!(channel, listener = %id, "Listening to host channel");

        let task = tokio::spawn(async move {
            while let Some(raw) = events.next().await {
                match serde_json::from_value::<T>(raw) {
                    Ok(payload) => callback(payload),
                    Err(source) => {
                        error!(channel, error = %source, "Undecodable host event, stopping delivery");
                        return Err(ChannelError::Decode { channel, source });
                    }
                }
            }
            debug!(channel, "Host channel closed");
            Ok(())
        });

        Ok(Unlisten {
            bridge: Arc::clone(bridge),
            channel,
            id,
            task: Some(task),
        })
    }
}

/// Handle to a live channel subscription.
///
/// Awaiting [`unlisten`](Self::unlisten) is the orderly teardown. Dropping the
/// handle stops delivery as well, but cannot release the host-side
/// registration eagerly; the bridge notices the closed stream instead.
#[must_use = "dropping an Unlisten stops delivery immediately"]
pub struct Unlisten<B: HostBridge> {
    bridge: Arc<B>,
    channel: &'static str,
    id: ListenerId,
    task: Option<JoinHandle<Result<(), ChannelError>>>,
}

impl<B: HostBridge> Unlisten<B> {
    /// Channel this subscription listens to.
    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Host-side registration id.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether messages are still being delivered.
    ///
    /// False once the host closed the channel or a payload failed to decode.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop delivery and release the host-side registration.
    ///
    /// When this returns, the callback is not running and will not run again.
    /// Reports a decode failure or a panic that ended delivery earlier.
    pub async fn unlisten(mut self) -> Result<(), ChannelError> {
        let outcome = match self.task.take() {
            Some(task) => {
                task.abort();
                match task.await {
                    Ok(result) => result,
                    Err(err) if err.is_cancelled() => Ok(()),
                    Err(_) => Err(ChannelError::Panicked {
                        channel: self.channel,
                    }),
                }
            }
            None => Ok(()),
        };

        self.bridge.unlisten(self.channel, self.id).await;
        debug!(channel = self.channel, listener = %self.id, "Unlistened host channel");
        outcome
    }
}

impl<B: HostBridge> fmt::Debug for Unlisten<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unlisten")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl<B: HostBridge> Drop for Unlisten<B> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EventLog, MemoryBridge};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    enum CounterEvent {
        Bumped(u32),
        Reset,
    }

    impl HostEvent for CounterEvent {
        const CHANNEL: &'static str = "counterEvent";
    }

    #[test]
    fn test_channel_name_from_payload_type() {
        assert_eq!(EventChannel::<CounterEvent>::of().name(), "counterEvent");
        assert_eq!(EventChannel::<u32>::named("raw").name(), "raw");
    }

    #[tokio::test]
    async fn test_listen_delivers_in_order() {
        let bridge = Arc::new(MemoryBridge::new());
        let log = EventLog::new();

        let sink = log.clone();
        let unlisten = EventChannel::<CounterEvent>::of()
            .listen(&bridge, move |event| sink.push(event))
            .await
            .expect("listen");

        bridge.emit("counterEvent", json!({"Bumped": 1}));
        bridge.emit("counterEvent", json!("Reset"));
        bridge.emit("counterEvent", json!({"Bumped": 2}));

        log.wait_for_len(3).await;
        assert_eq!(
            log.snapshot(),
            vec![
                CounterEvent::Bumped(1),
                CounterEvent::Reset,
                CounterEvent::Bumped(2)
            ]
        );

        unlisten.unlisten().await.expect("clean unlisten");
    }

    #[tokio::test]
    async fn test_no_delivery_after_unlisten() {
        let bridge = Arc::new(MemoryBridge::new());
        let log = EventLog::new();

        let sink = log.clone();
        let unlisten = EventChannel::<CounterEvent>::of()
            .listen(&bridge, move |event| sink.push(event))
            .await
            .expect("listen");

        bridge.emit("counterEvent", json!({"Bumped": 1}));
        log.wait_for_len(1).await;

        unlisten.unlisten().await.expect("clean unlisten");
        assert_eq!(bridge.listener_count("counterEvent"), 0);

        // Nobody is listening any more
        assert_eq!(bridge.emit("counterEvent", json!({"Bumped": 2})), 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_stops_delivery() {
        let bridge = Arc::new(MemoryBridge::new());
        let log = EventLog::new();

        let sink = log.clone();
        let unlisten = EventChannel::<CounterEvent>::of()
            .listen(&bridge, move |event| sink.push(event))
            .await
            .expect("listen");

        bridge.emit("counterEvent", json!({"Exploded": true}));
        bridge.emit("counterEvent", json!({"Bumped": 3}));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(log.is_empty());
        assert!(!unlisten.is_active());

        let err = unlisten.unlisten().await.expect_err("decode failure");
        assert!(matches!(
            err,
            ChannelError::Decode {
                channel: "counterEvent",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_listen_unknown_channel_fails() {
        let bridge = Arc::new(MemoryBridge::with_channels(["actorEvent"]));

        let result = EventChannel::<CounterEvent>::of()
            .listen(&bridge, |_| {})
            .await;

        assert!(matches!(
            result,
            Err(ChannelError::Bridge(BridgeError::UnknownChannel(_)))
        ));
    }

    #[tokio::test]
    async fn test_drop_stops_delivery() {
        let bridge = Arc::new(MemoryBridge::new());
        let log = EventLog::new();

        let sink = log.clone();
        let unlisten = EventChannel::<CounterEvent>::of()
            .listen(&bridge, move |event| sink.push(event))
            .await
            .expect("listen");
        drop(unlisten);

        tokio::time::sleep(Duration::from_millis(10)).await;
        bridge.emit("counterEvent", json!("Reset"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(log.is_empty());
    }
}

//! Keyed registry of live host channel subscriptions
//!
//! Owners that hold several channel subscriptions (the replica store holds
//! four) keep them here so teardown is a single call.
//!
//! # Example
//!
//! ```ignore
//! use showsync_core::{ChannelSubscriptions, EventChannel};
//!
//! let mut subs = ChannelSubscriptions::new();
//!
//! let unlisten = EventChannel::<ActorEvent>::of().listen(&bridge, on_actor).await?;
//! subs.replace("actors", unlisten).await?;
//!
//! // Tear everything down on shutdown
//! subs.unlisten_all().await?;
//! ```

use std::collections::HashMap;

use tracing::{debug, error};

use crate::bridge::HostBridge;
use crate::channel::{ChannelError, Unlisten};

/// Identifies a subscription for replacement and cancellation.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubKey(String);

impl SubKey {
    /// Create a new subscription key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for SubKey {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SubKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Channel subscriptions indexed by key.
///
/// At most one subscription per key. Dropping the registry drops every
/// handle, which stops delivery on all of them.
pub struct ChannelSubscriptions<B: HostBridge> {
    handles: HashMap<SubKey, Unlisten<B>>,
}

impl<B: HostBridge> Default for ChannelSubscriptions<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: HostBridge> ChannelSubscriptions<B> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Install `unlisten` under `key`.
    ///
    /// A previous subscription under the same key is torn down first. Its
    /// teardown error, if any, is returned after the new one is installed.
    pub async fn replace(
        &mut self,
        key: impl Into<SubKey>,
        unlisten: Unlisten<B>,
    ) -> Result<(), ChannelError> {
        let key = key.into();
        let previous = self.handles.remove(&key);

        let outcome = match previous {
            Some(old) => {
                debug!(key = key.name(), channel = old.channel(), "Replacing subscription");
                old.unlisten().await
            }
            None => Ok(()),
        };

        self.handles.insert(key, unlisten);
        outcome
    }

    /// Tear down the subscription under `key`. Unknown keys are a no-op.
    pub async fn cancel(&mut self, key: &SubKey) -> Result<(), ChannelError> {
        match self.handles.remove(key) {
            Some(unlisten) => unlisten.unlisten().await,
            None => Ok(()),
        }
    }

    /// Tear down every subscription.
    ///
    /// All of them are released even when some fail; the first failure is
    /// returned.
    pub async fn unlisten_all(&mut self) -> Result<(), ChannelError> {
        let mut first_error = None;
        for (key, unlisten) in self.handles.drain() {
            if let Err(err) = unlisten.unlisten().await {
                error!(key = key.name(), error = %err, "Subscription ended with an error");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Check if a subscription is registered under `key` and still delivering.
    pub fn is_active(&self, key: &SubKey) -> bool {
        self.handles.get(key).is_some_and(Unlisten::is_active)
    }

    /// Get the number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if there are no registered subscriptions.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Get the keys of all registered subscriptions.
    pub fn active_keys(&self) -> impl Iterator<Item = &SubKey> {
        self.handles.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::EventChannel;
    use crate::testing::{EventLog, MemoryBridge};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_sub_key() {
        let k1 = SubKey::new("test");
        let k2 = SubKey::from("test");
        let k3: SubKey = "test".into();

        assert_eq!(k1, k2);
        assert_eq!(k2, k3);
        assert_eq!(k1.name(), "test");
    }

    #[tokio::test]
    async fn test_replace_tears_down_previous() {
        let bridge = Arc::new(MemoryBridge::new());
        let log = EventLog::new();
        let mut subs = ChannelSubscriptions::new();

        let first = log.clone();
        let unlisten = EventChannel::<u32>::named("numbers")
            .listen(&bridge, move |n| first.push(n))
            .await
            .expect("listen");
        subs.replace("numbers", unlisten).await.expect("replace");

        let second = log.clone();
        let unlisten = EventChannel::<u32>::named("numbers")
            .listen(&bridge, move |n| second.push(n * 100))
            .await
            .expect("listen");
        subs.replace("numbers", unlisten).await.expect("replace");

        assert_eq!(subs.len(), 1);
        assert_eq!(bridge.listener_count("numbers"), 1);

        bridge.emit("numbers", json!(2));
        log.wait_for_len(1).await;
        assert_eq!(log.snapshot(), vec![200]);
    }

    #[tokio::test]
    async fn test_unlisten_all_releases_everything() {
        let bridge = Arc::new(MemoryBridge::new());
        let mut subs = ChannelSubscriptions::new();

        for name in ["a", "b"] {
            let unlisten = EventChannel::<u32>::named(name)
                .listen(&bridge, |_| {})
                .await
                .expect("listen");
            subs.replace(name, unlisten).await.expect("replace");
        }

        assert!(subs.is_active(&SubKey::new("a")));
        assert_eq!(subs.len(), 2);

        subs.unlisten_all().await.expect("clean teardown");

        assert!(subs.is_empty());
        assert_eq!(bridge.listener_count("a"), 0);
        assert_eq!(bridge.listener_count("b"), 0);
    }

    #[tokio::test]
    async fn test_unlisten_all_reports_decode_failure() {
        let bridge = Arc::new(MemoryBridge::new());
        let mut subs = ChannelSubscriptions::new();

        let unlisten = EventChannel::<u32>::named("numbers")
            .listen(&bridge, |_| {})
            .await
            .expect("listen");
        subs.replace("numbers", unlisten).await.expect("replace");

        bridge.emit("numbers", json!("not a number"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!subs.is_active(&SubKey::new("numbers")));

        let err = subs.unlisten_all().await.expect_err("decode failure");
        assert!(matches!(err, ChannelError::Decode { channel: "numbers", .. }));
    }

    #[tokio::test]
    async fn test_cancel_unknown_key_is_noop() {
        let mut subs = ChannelSubscriptions::<MemoryBridge>::new();
        subs.cancel(&SubKey::new("missing")).await.expect("noop");
        assert!(subs.is_empty());
    }
}

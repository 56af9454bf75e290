//! Replica store
//!
//! Holds the front end's copy of the show document. The replica starts
//! [`Replica::Uninitialized`] and becomes [`Replica::Ready`] once, when the
//! startup snapshot arrives. From then on it only changes by folding host
//! events; commands never write to it.
//!
//! Every change publishes a fresh `Arc` root through a `watch` channel, so a
//! reader holding an old [`Document`] keeps a consistent view and can detect
//! a change with [`Document::same_root`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::commands::HostCommands;
use crate::config::{CueIndexPolicy, ReplicaConfig};
use crate::events::{
    ActorEvent, ActorEventHandler, GroupEvent, GroupEventHandler, ShowEvent, ShowEventHandler,
    ShowStateEvent, ShowStateEventHandler,
};
use crate::model::{Actor, ActorId, Cue, Group, GroupId, Show, ShowState};
use crate::{listen_keyed, ChannelError, ChannelSubscriptions, HostBridge};

/// A ready replica's content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub show: Arc<Show>,
    pub show_state: Arc<ShowState>,
}

impl Document {
    pub fn new(show: Show, show_state: ShowState) -> Self {
        Self {
            show: Arc::new(show),
            show_state: Arc::new(show_state),
        }
    }

    /// Whether both roots are the very same allocations as `other`'s.
    pub fn same_root(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.show, &other.show) && Arc::ptr_eq(&self.show_state, &other.show_state)
    }
}

/// Lifecycle of the replica.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Replica {
    /// No snapshot yet; events are ignored
    #[default]
    Uninitialized,
    Ready(Document),
}

impl Replica {
    pub fn is_ready(&self) -> bool {
        matches!(self, Replica::Ready(_))
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Replica::Ready(document) => Some(document),
            Replica::Uninitialized => None,
        }
    }
}

// ============================================================================
// Fold
// ============================================================================

/// Applies host events to the replica.
///
/// Implements the handler trait of each of the four event channels. Clones
/// share the same replica, so one clone can be handed to each channel.
#[derive(Clone)]
pub struct ReplicaFold {
    replica: Arc<watch::Sender<Replica>>,
    cue_index_policy: CueIndexPolicy,
}

impl ReplicaFold {
    pub fn new(config: &ReplicaConfig) -> Self {
        let (replica, _) = watch::channel(Replica::Uninitialized);
        Self {
            replica: Arc::new(replica),
            cue_index_policy: config.cue_index_policy,
        }
    }

    /// Read-only view of the replica this fold writes.
    pub fn handle(&self) -> ReplicaHandle {
        ReplicaHandle {
            replica: self.replica.subscribe(),
        }
    }

    pub fn replica(&self) -> Replica {
        self.replica.borrow().clone()
    }

    /// Install the startup snapshot.
    ///
    /// Returns `false`, leaving the replica untouched, if it is already
    /// ready.
    pub fn seed(&self, show: Show, show_state: ShowState) -> bool {
        self.replica.send_if_modified(|replica| match replica {
            Replica::Uninitialized => {
                debug!(
                    actors = show.actors.len(),
                    groups = show.groups.len(),
                    cues = show.cues.len(),
                    "Replica ready"
                );
                *replica = Replica::Ready(Document::new(show, show_state));
                true
            }
            Replica::Ready(_) => false,
        })
    }

    fn update_show(&self, event: &'static str, apply: impl FnOnce(&mut Show) -> bool) {
        self.replica.send_if_modified(|replica| {
            let Replica::Ready(document) = replica else {
                trace!(event, "Replica not ready, dropping event");
                return false;
            };

            let mut show = Show::clone(&document.show);
            if !apply(&mut show) {
                return false;
            }
            document.show = Arc::new(show);
            true
        });
    }

    fn replace_show_state(&self, show_state: ShowState) {
        self.replica.send_if_modified(|replica| {
            let Replica::Ready(document) = replica else {
                trace!(event = "Update", "Replica not ready, dropping event");
                return false;
            };
            document.show_state = Arc::new(show_state);
            true
        });
    }
}

impl fmt::Debug for ReplicaFold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaFold")
            .field("ready", &self.replica.borrow().is_ready())
            .field("cue_index_policy", &self.cue_index_policy)
            .finish()
    }
}

impl ShowEventHandler for ReplicaFold {
    fn on_loaded(&mut self, show: Show) {
        self.update_show("Loaded", |current| {
            *current = show;
            true
        });
    }

    fn on_cue_added(&mut self, (index, cue): (u32, Cue)) {
        let policy = self.cue_index_policy;
        self.update_show("CueAdded", |show| {
            let len = show.cues.len();
            let index = index as usize;
            if index <= len {
                show.cues.insert(index, cue);
                return true;
            }

            match policy {
                CueIndexPolicy::Clamp => {
                    warn!(index, len, cue = %cue.id, "Cue index past end, appending");
                    show.cues.push(cue);
                    true
                }
                CueIndexPolicy::Strict => {
                    warn!(index, len, cue = %cue.id, "Cue index past end, dropping event");
                    false
                }
            }
        });
    }
}

impl ShowStateEventHandler for ReplicaFold {
    fn on_update(&mut self, show_state: ShowState) {
        self.replace_show_state(show_state);
    }
}

impl ActorEventHandler for ReplicaFold {
    fn on_added(&mut self, (id, actor): (ActorId, Actor)) {
        self.update_show("Added", |show| {
            show.actors.insert(id, actor);
            true
        });
    }

    fn on_removed(&mut self, id: ActorId) {
        self.update_show("Removed", |show| show.actors.remove(&id).is_some());
    }
}

impl GroupEventHandler for ReplicaFold {
    fn on_added(&mut self, (id, group): (GroupId, Group)) {
        self.update_show("Added", |show| {
            show.groups.insert(id, group);
            true
        });
    }

    fn on_removed(&mut self, id: GroupId) {
        self.update_show("Removed", |show| show.groups.remove(&id).is_some());
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Read-only access to the replica.
///
/// Cheap to clone. Each clone tracks changes on its own.
#[derive(Clone, Debug)]
pub struct ReplicaHandle {
    replica: watch::Receiver<Replica>,
}

impl ReplicaHandle {
    /// Current replica, marking it seen.
    pub fn replica(&mut self) -> Replica {
        self.replica.borrow_and_update().clone()
    }

    /// Current document, if ready.
    pub fn document(&self) -> Option<Document> {
        self.replica.borrow().document().cloned()
    }

    pub fn show(&self) -> Option<Arc<Show>> {
        self.replica
            .borrow()
            .document()
            .map(|document| Arc::clone(&document.show))
    }

    pub fn show_state(&self) -> Option<Arc<ShowState>> {
        self.replica
            .borrow()
            .document()
            .map(|document| Arc::clone(&document.show_state))
    }

    pub fn is_ready(&self) -> bool {
        self.replica.borrow().is_ready()
    }

    /// Wait for the next change since the replica was last read through
    /// this handle.
    ///
    /// Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.replica.changed().await.is_ok()
    }

    /// Wait until the replica is ready.
    ///
    /// Returns `None` if the store goes away first.
    pub async fn wait_ready(&mut self) -> Option<Document> {
        let replica = self.replica.wait_for(Replica::is_ready).await.ok()?;
        replica.document().cloned()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Owns the replica and its four channel subscriptions.
pub struct ReplicaStore<B: HostBridge> {
    fold: ReplicaFold,
    commands: HostCommands<B>,
    subscriptions: ChannelSubscriptions<B>,
}

impl<B: HostBridge> ReplicaStore<B> {
    /// Fetch the startup snapshot, then subscribe to the host channels.
    ///
    /// Nothing the host broadcasts before the subscriptions exist reaches the
    /// replica; the snapshot already reflects it. A failed subscription is an
    /// error, and every channel subscribed so far is released. A failed
    /// snapshot is not: the store stays uninitialized and is not retried.
    pub async fn start(bridge: Arc<B>, config: ReplicaConfig) -> Result<Self, ChannelError> {
        let fold = ReplicaFold::new(&config);
        let commands = HostCommands::new(Arc::clone(&bridge));

        match commands.get_show().await {
            Ok((show, show_state)) => {
                fold.seed(show, show_state);
            }
            Err(err) => {
                warn!(error = %err, "Snapshot fetch failed, replica stays uninitialized");
            }
        }

        let mut subscriptions = ChannelSubscriptions::new();
        if let Err(err) = subscribe(&bridge, &fold, &mut subscriptions).await {
            if let Err(teardown) = subscriptions.unlisten_all().await {
                debug!(error = %teardown, "Partial subscriptions ended with an error");
            }
            return Err(err);
        }
        debug!(channels = subscriptions.len(), "Replica subscribed");

        Ok(Self {
            fold,
            commands,
            subscriptions,
        })
    }

    pub fn handle(&self) -> ReplicaHandle {
        self.fold.handle()
    }

    /// Commands against the same host.
    pub fn commands(&self) -> &HostCommands<B> {
        &self.commands
    }

    pub fn replica(&self) -> Replica {
        self.fold.replica()
    }

    /// Release every channel subscription.
    ///
    /// Handles keep the last replica value.
    pub async fn shutdown(mut self) -> Result<(), ChannelError> {
        debug!("Replica shutting down");
        self.subscriptions.unlisten_all().await
    }
}

async fn subscribe<B: HostBridge>(
    bridge: &Arc<B>,
    fold: &ReplicaFold,
    subscriptions: &mut ChannelSubscriptions<B>,
) -> Result<(), ChannelError> {
    subscriptions
        .replace("show", listen_keyed::<ShowEvent, _, _>(bridge, fold.clone()).await?)
        .await?;
    subscriptions
        .replace(
            "show_state",
            listen_keyed::<ShowStateEvent, _, _>(bridge, fold.clone()).await?,
        )
        .await?;
    subscriptions
        .replace("actors", listen_keyed::<ActorEvent, _, _>(bridge, fold.clone()).await?)
        .await?;
    subscriptions
        .replace("groups", listen_keyed::<GroupEvent, _, _>(bridge, fold.clone()).await?)
        .await
}

impl<B: HostBridge> fmt::Debug for ReplicaStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaStore")
            .field("fold", &self.fold)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch_value;
    use crate::model::{ChannelId, CueId};
    use serde_json::json;

    fn ready_fold(config: ReplicaConfig) -> ReplicaFold {
        let fold = ReplicaFold::new(&config);
        assert!(fold.seed(Show::default(), ShowState::default()));
        fold
    }

    fn show(fold: &ReplicaFold) -> Arc<Show> {
        fold.handle().show().expect("ready")
    }

    fn cue_ids(fold: &ReplicaFold) -> Vec<u32> {
        show(fold).cues.iter().map(|cue| cue.id.major).collect()
    }

    fn cue(major: u32) -> Cue {
        Cue::new(CueId::new(major, 0), format!("Cue {major}"))
    }

    #[test]
    fn test_events_before_seed_are_dropped() {
        let mut fold = ReplicaFold::new(&ReplicaConfig::default());
        let handle = fold.handle();

        dispatch_value::<ActorEvent, _>(
            json!({"Added": [1, {"channel": 1, "name": "Early", "color": null}]}),
            &mut fold,
        )
        .unwrap();
        assert!(!handle.is_ready());
        assert_eq!(fold.replica(), Replica::Uninitialized);

        assert!(fold.seed(Show::default(), ShowState::default()));
        assert!(show(&fold).actors.is_empty());
        assert!(!fold.seed(Show::default(), ShowState::default()));
    }

    #[test]
    fn test_actor_added_after_empty_snapshot() {
        let mut fold = ready_fold(ReplicaConfig::default());

        dispatch_value::<ActorEvent, _>(
            json!({"Added": [7, {"channel": 3, "name": "Lead", "color": null}]}),
            &mut fold,
        )
        .unwrap();

        let show = show(&fold);
        assert_eq!(show.actors.len(), 1);
        assert_eq!(
            show.actor(ActorId(7)),
            Some(&Actor::new(ChannelId::new(3).unwrap(), "Lead", None))
        );
    }

    #[test]
    fn test_roster_is_net_effect_of_sequence() {
        let mut fold = ready_fold(ReplicaConfig::default());
        let group = |name: &str| Group::new(name, None, vec![ActorId(1)]);

        GroupEventHandler::on_added(&mut fold, (GroupId(1), group("Choir")));
        GroupEventHandler::on_added(&mut fold, (GroupId(2), group("Band")));
        GroupEventHandler::on_removed(&mut fold, GroupId(1));
        GroupEventHandler::on_added(&mut fold, (GroupId(2), group("Horns")));
        GroupEventHandler::on_removed(&mut fold, GroupId(9));
        GroupEventHandler::on_removed(&mut fold, GroupId(1));

        let show = show(&fold);
        assert_eq!(show.groups.len(), 1);
        assert_eq!(show.group(GroupId(2)).map(|g| g.name.as_str()), Some("Horns"));
    }

    #[test]
    fn test_noop_removal_keeps_root() {
        let mut fold = ready_fold(ReplicaConfig::default());
        let before = fold.handle().document().unwrap();

        ActorEventHandler::on_removed(&mut fold, ActorId(42));
        let after = fold.handle().document().unwrap();
        assert!(before.same_root(&after));

        ActorEventHandler::on_added(
            &mut fold,
            (ActorId(42), Actor::new(ChannelId::new(1).unwrap(), "Ada", None)),
        );
        let changed = fold.handle().document().unwrap();
        assert!(!after.same_root(&changed));
        assert!(after.show.actors.is_empty());
    }

    #[test]
    fn test_cue_added_inserts_and_shifts() {
        let mut fold = ready_fold(ReplicaConfig::default());

        fold.on_cue_added((0, cue(2)));
        fold.on_cue_added((1, cue(4)));
        fold.on_cue_added((0, cue(1)));
        fold.on_cue_added((2, cue(3)));
        assert_eq!(cue_ids(&fold), vec![1, 2, 3, 4]);

        // Appending at index == len
        fold.on_cue_added((4, cue(5)));
        assert_eq!(cue_ids(&fold), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cue_index_past_end_policies() {
        let mut clamp = ready_fold(ReplicaConfig::default());
        clamp.on_cue_added((3, cue(1)));
        assert_eq!(cue_ids(&clamp), vec![1]);

        let mut strict = ready_fold(ReplicaConfig::new().with_cue_index_policy(CueIndexPolicy::Strict));
        strict.on_cue_added((3, cue(1)));
        assert!(cue_ids(&strict).is_empty());
    }

    #[test]
    fn test_loaded_and_update_replace_wholesale() {
        let mut fold = ready_fold(ReplicaConfig::default());
        fold.on_cue_added((0, cue(1)));

        let mut loaded = Show::default();
        loaded.cues.push(cue(7));
        loaded.cues.push(cue(8));
        fold.on_loaded(loaded.clone());
        assert_eq!(*show(&fold), loaded);

        fold.on_update(ShowState {
            current_cue_id: Some(CueId::new(8, 0)),
        });
        let state = fold.handle().show_state().unwrap();
        assert_eq!(state.current_cue_id, Some(CueId::new(8, 0)));
    }

    #[tokio::test]
    async fn test_handle_wait_ready() {
        let fold = ReplicaFold::new(&ReplicaConfig::default());
        let mut handle = fold.handle();

        let waiter = tokio::spawn(async move { handle.wait_ready().await });
        tokio::task::yield_now().await;
        fold.seed(Show::default(), ShowState::default());

        let document = waiter.await.unwrap().expect("ready");
        assert!(document.show.cues.is_empty());
    }

    #[tokio::test]
    async fn test_handle_sees_store_drop() {
        let fold = ReplicaFold::new(&ReplicaConfig::default());
        let mut handle = fold.handle();
        drop(fold);
        assert!(!handle.changed().await);
        assert!(handle.wait_ready().await.is_none());
    }
}

//! showsync: a front-end replica of a host-owned show document
//!
//! The host owns the show (actors, groups, cues, playback position) and
//! broadcasts every change on four event channels. The front end keeps a
//! read-only replica by folding those events onto a startup snapshot, and
//! changes the show only by sending commands to the host.
//!
//! # Example
//! ```ignore
//! use showsync::prelude::*;
//!
//! let bridge = Arc::new(host);
//! let store = ReplicaStore::start(Arc::clone(&bridge), ReplicaConfig::default()).await?;
//!
//! let mut replica = store.handle();
//! let document = replica.wait_ready().await;
//!
//! store.commands().add_cue().await?;
//! replica.changed().await;
//!
//! store.shutdown().await?;
//! ```

// Lets the derive macro's `::showsync::` paths resolve inside this crate
extern crate self as showsync;

// Re-export everything from core
pub use showsync_core::*;

// Re-export derive macros
pub use showsync_macros::KeyedVariant;

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod lookup;
pub mod model;
pub mod replica;
pub mod testing;

pub use commands::{ChannelInfo, HostCommand, HostCommands};
pub use config::{CueIndexPolicy, ReplicaConfig};
pub use error::{CommandError, ModelError};
pub use events::{
    ActorEvent, ActorEventHandler, GroupEvent, GroupEventHandler, ShowEvent, ShowEventHandler,
    ShowStateEvent, ShowStateEventHandler,
};
pub use lookup::{ChannelLookup, LookupState, LOOKUP_DEBOUNCE};
pub use replica::{Document, Replica, ReplicaFold, ReplicaHandle, ReplicaStore};
pub use testing::LoopbackHost;

/// Prelude for convenient imports
pub mod prelude {
    pub use showsync_core::prelude::*;

    pub use crate::KeyedVariant;

    // Show model
    pub use crate::model::{
        Actor, ActorId, ChannelId, Cue, CueId, DcaAssignment, Group, GroupId, Show, ShowState,
        SingleDcaAssignment, WingColor,
    };

    // Events and their handlers
    pub use crate::events::{
        ActorEvent, ActorEventHandler, GroupEvent, GroupEventHandler, ShowEvent, ShowEventHandler,
        ShowStateEvent, ShowStateEventHandler,
    };

    // Replica and commands
    pub use crate::{
        ChannelInfo, ChannelLookup, CommandError, CueIndexPolicy, Document, HostCommands, Replica,
        ReplicaConfig, ReplicaHandle, ReplicaStore,
    };
}

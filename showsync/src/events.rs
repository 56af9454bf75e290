//! The four host event channels
//!
//! Each payload is a tagged union serialized as a single-key record, e.g.
//! `{"Removed": 3}` on `actorEvent`. Deriving `KeyedVariant` gives each union
//! a handler trait (`ShowEventHandler`, `ActorEventHandler`, ...) with one
//! required method per variant.
//!
//! A handler covering every variant compiles and routes:
//!
//! ```
//! use showsync::{KeyedVariant, Route};
//!
//! #[derive(KeyedVariant)]
//! enum CrewEvent {
//!     Added(u32),
//!     Removed(u32),
//! }
//!
//! struct Crew(Vec<u32>);
//!
//! impl CrewEventHandler for Crew {
//!     fn on_added(&mut self, id: u32) {
//!         self.0.push(id);
//!     }
//!     fn on_removed(&mut self, id: u32) {
//!         self.0.retain(|member| *member != id);
//!     }
//! }
//!
//! let mut crew = Crew(vec![]);
//! CrewEvent::Added(4).route(&mut crew);
//! CrewEvent::Added(5).route(&mut crew);
//! CrewEvent::Removed(4).route(&mut crew);
//! assert_eq!(crew.0, vec![5]);
//! ```
//!
//! Leaving a variant out does not:
//!
//! ```compile_fail
//! use showsync::KeyedVariant;
//!
//! #[derive(KeyedVariant)]
//! enum CrewEvent {
//!     Added(u32),
//!     Removed(u32),
//! }
//!
//! struct Crew(Vec<u32>);
//!
//! // No `on_removed`
//! impl CrewEventHandler for Crew {
//!     fn on_added(&mut self, id: u32) {
//!         self.0.push(id);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{Actor, ActorId, Cue, Group, GroupId, Show, ShowState};
use crate::KeyedVariant;

/// Show lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, KeyedVariant)]
#[keyed(channel = "showEvent")]
pub enum ShowEvent {
    /// A show file was opened; replaces the whole document
    Loaded(Show),
    /// A cue was inserted at the given position
    CueAdded(u32, Cue),
}

/// Live playback position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, KeyedVariant)]
#[keyed(channel = "showStateEvent")]
pub enum ShowStateEvent {
    Update(ShowState),
}

/// Actor roster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, KeyedVariant)]
#[keyed(channel = "actorEvent")]
pub enum ActorEvent {
    Added(ActorId, Actor),
    Removed(ActorId),
}

/// Group roster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, KeyedVariant)]
#[keyed(channel = "groupEvent")]
pub enum GroupEvent {
    Added(GroupId, Group),
    Removed(GroupId),
}

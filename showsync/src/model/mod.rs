//! The show document as the host broadcasts it
//!
//! Referenced ids (group members, DCA assignments) are not checked: a
//! reference may outlive the actor or group it names.

mod actor;
mod color;
mod cue;
mod group;
mod show;

pub use actor::{Actor, ActorId, ChannelId};
pub use color::WingColor;
pub use cue::{Cue, CueId, DcaAssignment, SingleDcaAssignment, NUM_DCAS};
pub use group::{Group, GroupId};
pub use show::{Show, ShowState, UNASSIGNED};

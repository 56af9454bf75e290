use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ActorId, WingColor};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl From<u32> for GroupId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named set of actors, assigned to a DCA as one.
///
/// Member ids may refer to actors that no longer exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    pub color: Option<WingColor>,
    pub actors: Vec<ActorId>,
}

impl Group {
    pub fn new(name: impl Into<String>, color: Option<WingColor>, actors: Vec<ActorId>) -> Self {
        Self {
            name: name.into(),
            color,
            actors,
        }
    }
}

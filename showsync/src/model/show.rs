use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Actor, ActorId, Cue, CueId, Group, GroupId, SingleDcaAssignment};

/// Label of an empty DCA assignment.
pub const UNASSIGNED: &str = "Unassigned";

/// The show document.
///
/// Map order carries no meaning; display helpers sort by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    #[serde(default)]
    pub actors: HashMap<ActorId, Actor>,
    #[serde(default)]
    pub groups: HashMap<GroupId, Group>,
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl Show {
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn cue(&self, id: CueId) -> Option<&Cue> {
        self.cues.iter().find(|cue| cue.id == id)
    }

    /// Position of cue `id` in the cue list.
    pub fn cue_index(&self, id: CueId) -> Option<usize> {
        self.cues.iter().position(|cue| cue.id == id)
    }

    /// Actors sorted by id.
    pub fn sorted_actors(&self) -> Vec<(ActorId, &Actor)> {
        let mut actors: Vec<_> = self.actors.iter().map(|(id, a)| (*id, a)).collect();
        actors.sort_by_key(|(id, _)| *id);
        actors
    }

    /// Groups sorted by id.
    pub fn sorted_groups(&self) -> Vec<(GroupId, &Group)> {
        let mut groups: Vec<_> = self.groups.iter().map(|(id, g)| (*id, g)).collect();
        groups.sort_by_key(|(id, _)| *id);
        groups
    }

    /// Id for a new cue: the next major after the highest existing id.
    pub fn next_cue_id(&self) -> CueId {
        self.cues
            .iter()
            .map(|cue| cue.id)
            .max()
            .map_or_else(CueId::default, |id| id.next())
    }

    /// Insert `cue` before the first cue with a greater id. Returns its index.
    pub fn insert_cue_sorted(&mut self, cue: Cue) -> usize {
        let index = self
            .cues
            .iter()
            .position(|existing| existing.id > cue.id)
            .unwrap_or(self.cues.len());
        self.cues.insert(index, cue);
        index
    }

    /// Human-readable label of a DCA assignment.
    ///
    /// A reference to a removed actor or group renders as `?`.
    pub fn assignment_label(&self, assignment: SingleDcaAssignment) -> String {
        match assignment {
            SingleDcaAssignment::None => UNASSIGNED.to_owned(),
            SingleDcaAssignment::Actor(id) => {
                let name = self.actor(id).map_or("?", |actor| actor.name.as_str());
                format!("{name} (actors)")
            }
            SingleDcaAssignment::Group(id) => {
                let name = self.group(id).map_or("?", |group| group.name.as_str());
                format!("{name} (groups)")
            }
        }
    }
}

/// Live playback state, replaced as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowState {
    pub current_cue_id: Option<CueId>,
}

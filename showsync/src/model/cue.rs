use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ActorId, GroupId};
use crate::error::ModelError;

/// Number of DCA faders a cue assigns.
pub const NUM_DCAS: usize = 16;

/// Cue number, ordered by `major` then `minor` and shown as `major.minor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CueId {
    pub major: u32,
    pub minor: u32,
}

impl CueId {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// First id of the next major number.
    pub fn next(&self) -> Self {
        Self::new(self.major + 1, 0)
    }
}

impl Default for CueId {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What one DCA fader controls in a cue.
///
/// On the wire: `"None"`, `{"Actor": 3}` or `{"Group": 1}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SingleDcaAssignment {
    #[default]
    None,
    Actor(ActorId),
    Group(GroupId),
}

/// Assignment of all DCA faders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcaAssignment {
    pub assignment: [SingleDcaAssignment; NUM_DCAS],
}

impl DcaAssignment {
    pub fn get(&self, dca_index: usize) -> Option<SingleDcaAssignment> {
        self.assignment.get(dca_index).copied()
    }

    pub fn set(
        &mut self,
        dca_index: usize,
        assignment: SingleDcaAssignment,
    ) -> Result<(), ModelError> {
        let slot = self
            .assignment
            .get_mut(dca_index)
            .ok_or(ModelError::DcaOutOfRange(dca_index))?;
        *slot = assignment;
        Ok(())
    }

    /// Number of faders with something assigned.
    pub fn assigned(&self) -> usize {
        self.assignment
            .iter()
            .filter(|a| **a != SingleDcaAssignment::None)
            .count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub id: CueId,
    pub name: String,
    pub dca: DcaAssignment,
}

impl Cue {
    /// A cue with nothing assigned.
    pub fn new(id: CueId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            dca: DcaAssignment::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cue_id_order_and_display() {
        let mut ids = vec![CueId::new(2, 0), CueId::new(1, 5), CueId::new(1, 0)];
        ids.sort();
        assert_eq!(ids, vec![CueId::new(1, 0), CueId::new(1, 5), CueId::new(2, 0)]);
        assert_eq!(CueId::new(3, 1).to_string(), "3.1");
        assert_eq!(CueId::new(3, 1).next(), CueId::new(4, 0));
    }

    #[test]
    fn test_assignment_wire_format() {
        let none: SingleDcaAssignment = serde_json::from_value(json!("None")).unwrap();
        let actor: SingleDcaAssignment = serde_json::from_value(json!({"Actor": 3})).unwrap();
        let group: SingleDcaAssignment = serde_json::from_value(json!({"Group": 1})).unwrap();

        assert_eq!(none, SingleDcaAssignment::None);
        assert_eq!(actor, SingleDcaAssignment::Actor(ActorId(3)));
        assert_eq!(group, SingleDcaAssignment::Group(GroupId(1)));
    }

    #[test]
    fn test_dca_set_bounds() {
        let mut dca = DcaAssignment::default();
        dca.set(15, SingleDcaAssignment::Actor(ActorId(1))).unwrap();
        assert_eq!(dca.get(15), Some(SingleDcaAssignment::Actor(ActorId(1))));
        assert_eq!(dca.assigned(), 1);

        assert_eq!(
            dca.set(NUM_DCAS, SingleDcaAssignment::None),
            Err(ModelError::DcaOutOfRange(NUM_DCAS))
        );
        assert_eq!(dca.get(NUM_DCAS), None);
    }

    #[test]
    fn test_cue_json() {
        let cue = Cue::new(CueId::new(1, 0), "Opening");
        let value = serde_json::to_value(&cue).unwrap();
        assert_eq!(value["id"], json!({"major": 1, "minor": 0}));
        assert_eq!(value["dca"]["assignment"].as_array().map(Vec::len), Some(NUM_DCAS));
    }
}

//! Typed host commands
//!
//! A command is encoded as `{"command": "<name>", "args": {...}}` and answered
//! with a [`CommandResponse`]. Commands never touch the local replica: their
//! effects arrive back as host events, and call sites that want to update a
//! local view early do so from the returned result.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CommandError;
use crate::model::{ActorId, ChannelId, CueId, Show, ShowState, SingleDcaAssignment, WingColor};
use crate::{BridgeError, CommandResponse, HostBridge};

/// Name and color configured on a console input channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub name: String,
    pub color: Option<WingColor>,
}

/// Every command the host understands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "command",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum HostCommand {
    GetShow,
    AddActor {
        channel: ChannelId,
        name: String,
        color: Option<WingColor>,
    },
    ImportActors {
        from: ChannelId,
        to: ChannelId,
    },
    AddGroup {
        actors: Vec<ActorId>,
        name: String,
        color: Option<WingColor>,
    },
    AddCue,
    RenameCue {
        cue_id: CueId,
        name: String,
    },
    DeleteCue {
        cue_id: CueId,
    },
    SetCueDcaAssignment {
        cue_id: CueId,
        dca_index: usize,
        assignment: SingleDcaAssignment,
    },
    GetWingChannelInfo {
        channel: ChannelId,
    },
    GotoCue {
        cue_id: CueId,
    },
}

impl HostCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::GetShow => "getShow",
            HostCommand::AddActor { .. } => "addActor",
            HostCommand::ImportActors { .. } => "importActors",
            HostCommand::AddGroup { .. } => "addGroup",
            HostCommand::AddCue => "addCue",
            HostCommand::RenameCue { .. } => "renameCue",
            HostCommand::DeleteCue { .. } => "deleteCue",
            HostCommand::SetCueDcaAssignment { .. } => "setCueDcaAssignment",
            HostCommand::GetWingChannelInfo { .. } => "getWingChannelInfo",
            HostCommand::GotoCue { .. } => "gotoCue",
        }
    }
}

/// Client for the host command surface.
pub struct HostCommands<B> {
    bridge: Arc<B>,
}

impl<B> Clone for HostCommands<B> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
        }
    }
}

impl<B> fmt::Debug for HostCommands<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCommands").finish_non_exhaustive()
    }
}

impl<B: HostBridge> HostCommands<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    /// Run `command` and decode its result data as `T`.
    ///
    /// There is no timeout: a host that never answers leaves the future
    /// pending.
    pub async fn invoke<T: DeserializeOwned>(&self, command: HostCommand) -> Result<T, CommandError> {
        let name = command.name();
        let request = serde_json::to_value(&command).map_err(BridgeError::from)?;
        debug!(command = name, "Invoking host command");

        match self.bridge.invoke(request).await? {
            CommandResponse::Ok { data } => serde_json::from_value(data)
                .map_err(|source| CommandError::Decode { command: name, source }),
            CommandResponse::Error { error } => {
                warn!(command = name, error = %error, "Host rejected command");
                Err(CommandError::Rejected {
                    command: name,
                    message: error,
                })
            }
        }
    }

    /// The full document and playback state.
    pub async fn get_show(&self) -> Result<(Show, ShowState), CommandError> {
        self.invoke(HostCommand::GetShow).await
    }

    pub async fn add_actor(
        &self,
        channel: ChannelId,
        name: impl Into<String>,
        color: Option<WingColor>,
    ) -> Result<(), CommandError> {
        self.invoke(HostCommand::AddActor {
            channel,
            name: name.into(),
            color,
        })
        .await
    }

    /// Create one actor per console channel in `from..=to`.
    pub async fn import_actors(&self, from: ChannelId, to: ChannelId) -> Result<(), CommandError> {
        self.invoke(HostCommand::ImportActors { from, to }).await
    }

    pub async fn add_group(
        &self,
        actors: Vec<ActorId>,
        name: impl Into<String>,
        color: Option<WingColor>,
    ) -> Result<(), CommandError> {
        self.invoke(HostCommand::AddGroup {
            actors,
            name: name.into(),
            color,
        })
        .await
    }

    pub async fn add_cue(&self) -> Result<(), CommandError> {
        self.invoke(HostCommand::AddCue).await
    }

    pub async fn rename_cue(&self, cue_id: CueId, name: impl Into<String>) -> Result<(), CommandError> {
        self.invoke(HostCommand::RenameCue {
            cue_id,
            name: name.into(),
        })
        .await
    }

    pub async fn delete_cue(&self, cue_id: CueId) -> Result<(), CommandError> {
        self.invoke(HostCommand::DeleteCue { cue_id }).await
    }

    pub async fn set_cue_dca_assignment(
        &self,
        cue_id: CueId,
        dca_index: usize,
        assignment: SingleDcaAssignment,
    ) -> Result<(), CommandError> {
        self.invoke(HostCommand::SetCueDcaAssignment {
            cue_id,
            dca_index,
            assignment,
        })
        .await
    }

    pub async fn get_channel_info(&self, channel: ChannelId) -> Result<ChannelInfo, CommandError> {
        self.invoke(HostCommand::GetWingChannelInfo { channel }).await
    }

    pub async fn goto_cue(&self, cue_id: CueId) -> Result<(), CommandError> {
        self.invoke(HostCommand::GotoCue { cue_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBridge;
    use serde_json::json;

    #[test]
    fn test_command_wire_format() {
        let value = serde_json::to_value(HostCommand::SetCueDcaAssignment {
            cue_id: CueId::new(1, 0),
            dca_index: 3,
            assignment: SingleDcaAssignment::Actor(ActorId(2)),
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "command": "setCueDcaAssignment",
                "args": {
                    "cueId": {"major": 1, "minor": 0},
                    "dcaIndex": 3,
                    "assignment": {"Actor": 2}
                }
            })
        );
        assert_eq!(serde_json::to_value(HostCommand::AddCue).unwrap(), json!({"command": "addCue"}));
    }

    #[test]
    fn test_names_match_wire_tags() {
        let commands = [
            HostCommand::GetShow,
            HostCommand::AddCue,
            HostCommand::GotoCue { cue_id: CueId::new(2, 0) },
            HostCommand::GetWingChannelInfo { channel: ChannelId::new(4).unwrap() },
        ];
        for command in commands {
            let value = serde_json::to_value(&command).unwrap();
            assert_eq!(value["command"], json!(command.name()));
        }
    }

    #[tokio::test]
    async fn test_ok_result_is_decoded() {
        let bridge = MemoryBridge::new();
        bridge.respond(
            "getWingChannelInfo",
            CommandResponse::ok(json!({"name": "Vox 1", "color": "Red"})).unwrap(),
        );

        let commands = HostCommands::new(Arc::new(bridge.clone()));
        let info = commands
            .get_channel_info(ChannelId::new(1).unwrap())
            .await
            .expect("ok");

        assert_eq!(info, ChannelInfo { name: "Vox 1".into(), color: Some(WingColor::Red) });
        assert_eq!(bridge.invocations()[0]["args"]["channel"], json!(1));
    }

    #[tokio::test]
    async fn test_error_result_is_rejected() {
        let bridge = MemoryBridge::new();
        bridge.respond("gotoCue", CommandResponse::error("Console not connected"));

        let commands = HostCommands::new(Arc::new(bridge));
        let err = commands.goto_cue(CueId::new(1, 0)).await.expect_err("rejected");

        assert_eq!(err.host_message(), Some("Console not connected"));
        assert!(matches!(err, CommandError::Rejected { command: "gotoCue", .. }));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_decode_error() {
        let bridge = MemoryBridge::new();
        bridge.respond("getShow", CommandResponse::ok(json!("not a show")).unwrap());

        let commands = HostCommands::new(Arc::new(bridge));
        let err = commands.get_show().await.expect_err("decode");
        assert!(matches!(err, CommandError::Decode { command: "getShow", .. }));
    }
}

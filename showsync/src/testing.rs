//! Test utilities for show replicas
//!
//! Re-exports everything from `showsync_core::testing` and adds
//! [`LoopbackHost`], an in-process host that owns the authoritative show and
//! answers the full command surface.

pub use showsync_core::testing::*;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::commands::{ChannelInfo, HostCommand};
use crate::events::{ActorEvent, GroupEvent, ShowEvent, ShowStateEvent};
use crate::model::{Actor, ActorId, ChannelId, Cue, CueId, Group, GroupId, Show, ShowState};
use crate::{BridgeError, CommandResponse, HostBridge, HostEvent, HostSubscription, ListenerId};

#[derive(Default)]
struct HostState {
    show: Show,
    show_state: ShowState,
    console: HashMap<ChannelId, ChannelInfo>,
    console_offline: bool,
    rejections: HashMap<&'static str, String>,
}

impl HostState {
    fn next_actor_id(&self) -> ActorId {
        self.show
            .actors
            .keys()
            .max()
            .map_or(ActorId(1), |id| ActorId(id.0 + 1))
    }

    fn next_group_id(&self) -> GroupId {
        self.show
            .groups
            .keys()
            .max()
            .map_or(GroupId(1), |id| GroupId(id.0 + 1))
    }

    fn channel_info(&self, channel: ChannelId) -> ChannelInfo {
        self.console.get(&channel).cloned().unwrap_or_else(|| ChannelInfo {
            name: format!("Ch {channel}"),
            color: None,
        })
    }

    fn cue_mut(&mut self, cue_id: CueId) -> Result<&mut Cue, String> {
        self.show
            .cues
            .iter_mut()
            .find(|cue| cue.id == cue_id)
            .ok_or_else(|| "Cue not found".to_owned())
    }
}

/// In-process host.
///
/// Owns an authoritative [`Show`] and [`ShowState`], runs every
/// [`HostCommand`] against them, and broadcasts the resulting events the way
/// a real host does: `Added` for roster changes, `CueAdded` for new cues,
/// `Update` after going to a cue. Renames, deletions and DCA changes are not
/// broadcast.
///
/// Tests can also push arbitrary payloads with [`emit_raw`](Self::emit_raw).
#[derive(Clone, Default)]
pub struct LoopbackHost {
    channels: MemoryBridge,
    state: Arc<Mutex<HostState>>,
}

impl LoopbackHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host starting with `show` loaded.
    pub fn with_show(show: Show) -> Self {
        let host = Self::new();
        host.lock().show = show;
        host
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The authoritative show.
    pub fn show(&self) -> Show {
        self.lock().show.clone()
    }

    pub fn show_state(&self) -> ShowState {
        self.lock().show_state.clone()
    }

    /// Configure what the console reports for `channel`.
    pub fn set_channel_info(&self, channel: ChannelId, info: ChannelInfo) {
        self.lock().console.insert(channel, info);
    }

    /// Simulate a disconnected console: cue playback and channel lookups fail.
    pub fn set_console_offline(&self, offline: bool) {
        self.lock().console_offline = offline;
    }

    /// Reject the next `command` with `message`.
    pub fn reject_next(&self, command: &'static str, message: impl Into<String>) {
        self.lock().rejections.insert(command, message.into());
    }

    /// Open a different show: resets playback and broadcasts both.
    pub fn load(&self, show: Show) {
        let mut state = self.lock();
        state.show = show.clone();
        state.show_state = ShowState::default();
        self.broadcast(&ShowStateEvent::Update(ShowState::default()));
        self.broadcast(&ShowEvent::Loaded(show));
    }

    /// Broadcast a typed event without touching the authoritative show.
    pub fn emit<E: HostEvent + Serialize>(&self, event: &E) -> usize {
        self.broadcast(event)
    }

    /// Broadcast a raw payload on `channel`.
    pub fn emit_raw(&self, channel: &str, payload: Value) -> usize {
        self.channels.emit(channel, payload)
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels.listener_count(channel)
    }

    fn broadcast<E: HostEvent + Serialize>(&self, event: &E) -> usize {
        match serde_json::to_value(event) {
            Ok(payload) => self.channels.emit(E::CHANNEL, payload),
            Err(err) => {
                debug!(channel = E::CHANNEL, error = %err, "Event not serializable");
                0
            }
        }
    }

    fn execute(&self, command: HostCommand) -> Result<Value, String> {
        let mut state = self.lock();
        if let Some(message) = state.rejections.remove(command.name()) {
            return Err(message);
        }

        match command {
            HostCommand::GetShow => to_data(&(&state.show, &state.show_state)),
            HostCommand::AddActor {
                channel,
                name,
                color,
            } => {
                let id = state.next_actor_id();
                let actor = Actor::new(channel, name, color);
                state.show.actors.insert(id, actor.clone());
                self.broadcast(&ActorEvent::Added(id, actor));
                Ok(Value::Null)
            }
            HostCommand::ImportActors { from, to } => {
                if from > to {
                    return Err("Invalid channel range".to_owned());
                }
                for channel in ChannelId::all().filter(|c| (from..=to).contains(c)) {
                    let info = state.channel_info(channel);
                    let id = state.next_actor_id();
                    let actor = Actor::new(channel, info.name, info.color);
                    state.show.actors.insert(id, actor.clone());
                    self.broadcast(&ActorEvent::Added(id, actor));
                }
                Ok(Value::Null)
            }
            HostCommand::AddGroup {
                actors,
                name,
                color,
            } => {
                let id = state.next_group_id();
                let group = Group::new(name, color, actors);
                state.show.groups.insert(id, group.clone());
                self.broadcast(&GroupEvent::Added(id, group));
                Ok(Value::Null)
            }
            HostCommand::AddCue => {
                let cue_id = state.show.next_cue_id();
                let cue = Cue::new(cue_id, format!("Cue {cue_id}"));
                let index = state.show.insert_cue_sorted(cue.clone());
                let index = u32::try_from(index).map_err(|err| err.to_string())?;
                self.broadcast(&ShowEvent::CueAdded(index, cue));
                Ok(Value::Null)
            }
            HostCommand::RenameCue { cue_id, name } => {
                state.cue_mut(cue_id)?.name = name;
                Ok(Value::Null)
            }
            HostCommand::DeleteCue { cue_id } => {
                let index = state.show.cue_index(cue_id).ok_or("Cue not found")?;
                state.show.cues.remove(index);
                Ok(Value::Null)
            }
            HostCommand::SetCueDcaAssignment {
                cue_id,
                dca_index,
                assignment,
            } => {
                state
                    .cue_mut(cue_id)?
                    .dca
                    .set(dca_index, assignment)
                    .map_err(|err| err.to_string())?;
                Ok(Value::Null)
            }
            HostCommand::GetWingChannelInfo { channel } => {
                if state.console_offline {
                    return Err("Console not connected".to_owned());
                }
                to_data(&state.channel_info(channel))
            }
            HostCommand::GotoCue { cue_id } => {
                if state.console_offline {
                    return Err("Console not connected".to_owned());
                }
                if state.show.cue(cue_id).is_none() {
                    return Err("Cue not found".to_owned());
                }
                state.show_state.current_cue_id = Some(cue_id);
                self.broadcast(&ShowStateEvent::Update(state.show_state.clone()));
                Ok(Value::Null)
            }
        }
    }
}

fn to_data(data: &impl Serialize) -> Result<Value, String> {
    serde_json::to_value(data).map_err(|err| err.to_string())
}

impl HostBridge for LoopbackHost {
    async fn invoke(&self, request: Value) -> Result<CommandResponse, BridgeError> {
        let command: HostCommand = serde_json::from_value(request)?;
        let name = command.name();

        let response = match self.execute(command) {
            Ok(data) => CommandResponse::Ok { data },
            Err(error) => CommandResponse::Error { error },
        };
        debug!(command = name, ok = response.is_ok(), "Loopback command");
        Ok(response)
    }

    async fn listen(&self, channel: &'static str) -> Result<HostSubscription, BridgeError> {
        self.channels.listen(channel).await
    }

    async fn unlisten(&self, channel: &'static str, id: ListenerId) {
        self.channels.unlisten(channel, id).await
    }
}

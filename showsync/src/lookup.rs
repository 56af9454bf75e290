//! Console channel lookup for actor forms
//!
//! While a channel number is being typed, the lookup waits for it to settle,
//! then asks the host what the console has configured on that channel.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::commands::{ChannelInfo, HostCommands};
use crate::model::ChannelId;
use crate::{Debounced, HostBridge};

/// Quiet period before a typed channel is looked up.
pub const LOOKUP_DEBOUNCE: Duration = Duration::from_millis(200);

/// Published state of a [`ChannelLookup`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupState {
    /// Settled channel, if the input is a valid one
    pub channel: Option<ChannelId>,
    pub fetching: bool,
    /// Console info for `channel`, once fetched
    pub info: Option<ChannelInfo>,
}

/// Debounced channel-info lookup.
///
/// Must be created inside a tokio runtime.
pub struct ChannelLookup {
    channel: Debounced<Option<ChannelId>>,
    state: watch::Receiver<LookupState>,
    worker: JoinHandle<()>,
}

impl ChannelLookup {
    pub fn new<B: HostBridge>(commands: HostCommands<B>) -> Self {
        Self::with_delay(commands, LOOKUP_DEBOUNCE)
    }

    pub fn with_delay<B: HostBridge>(commands: HostCommands<B>, delay: Duration) -> Self {
        let channel = Debounced::new(None, delay);
        let (state_tx, state) = watch::channel(LookupState::default());
        let worker = tokio::spawn(run_lookups(commands, channel.subscribe(), state_tx));

        Self {
            channel,
            state,
            worker,
        }
    }

    /// Set the channel being typed. `None` clears the lookup once settled.
    pub fn set_channel(&mut self, channel: Option<ChannelId>) {
        self.channel.set(channel);
    }

    /// Set the channel from raw form text. Text that is not a valid channel
    /// counts as no channel.
    pub fn set_input(&mut self, text: &str) {
        let channel = text
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|n| ChannelId::new(n).ok());
        self.set_channel(channel);
    }

    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.clone()
    }
}

impl Drop for ChannelLookup {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_lookups<B: HostBridge>(
    commands: HostCommands<B>,
    mut settled: watch::Receiver<Option<ChannelId>>,
    state: watch::Sender<LookupState>,
) {
    while settled.changed().await.is_ok() {
        let channel = *settled.borrow_and_update();
        let Some(channel) = channel else {
            state.send_replace(LookupState::default());
            continue;
        };

        state.send_replace(LookupState {
            channel: Some(channel),
            fetching: true,
            info: None,
        });
        debug!(channel = channel.get(), "Looking up console channel");

        let result = commands.get_channel_info(channel).await;
        if *settled.borrow() != Some(channel) {
            // Superseded while fetching; the next iteration handles it
            continue;
        }

        let info = match result {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(channel = channel.get(), error = %err, "Channel lookup failed");
                None
            }
        };
        state.send_replace(LookupState {
            channel: Some(channel),
            fetching: false,
            info,
        });
    }
}

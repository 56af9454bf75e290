use showsync_core::BridgeError;

/// A value outside what the show model accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("channel {0} is out of range (1..=48)")]
    ChannelOutOfRange(u32),
    #[error("color code {0} is out of range (1..=12)")]
    ColorOutOfRange(u8),
    #[error("DCA index {0} is out of range (0..16)")]
    DcaOutOfRange(usize),
}

/// Failure of a host command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command ran on the host and reported an error
    #[error("host rejected `{command}`: {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },
    /// The host answered with data of the wrong shape
    #[error("unexpected response to `{command}`: {source}")]
    Decode {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The request never completed
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl CommandError {
    /// The host's own error message, if the host rejected the command.
    pub fn host_message(&self) -> Option<&str> {
        match self {
            CommandError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

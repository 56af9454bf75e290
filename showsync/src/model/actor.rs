use std::fmt;

use serde::{Deserialize, Serialize};

use super::WingColor;
use crate::error::ModelError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u32);

impl From<u32> for ActorId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An input channel of the console, `1..=48`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ChannelId(u8);

impl ChannelId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 48;

    pub fn new(channel: u32) -> Result<Self, ModelError> {
        u8::try_from(channel)
            .ok()
            .filter(|c| (Self::MIN..=Self::MAX).contains(c))
            .map(Self)
            .ok_or(ModelError::ChannelOutOfRange(channel))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every valid channel, in order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u32> for ChannelId {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelId> for u32 {
    fn from(channel: ChannelId) -> Self {
        u32::from(channel.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A performer, bound to one console input channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub channel: ChannelId,
    pub name: String,
    pub color: Option<WingColor>,
}

impl Actor {
    pub fn new(channel: ChannelId, name: impl Into<String>, color: Option<WingColor>) -> Self {
        Self {
            channel,
            name: name.into(),
            color,
        }
    }
}

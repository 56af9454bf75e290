//! Replica store configuration

/// What to do with a `CueAdded` whose index is past the end of the cue list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CueIndexPolicy {
    /// Append the cue and log a warning
    #[default]
    Clamp,
    /// Drop the event and log a warning
    Strict,
}

/// Settings for a [`ReplicaStore`](crate::ReplicaStore).
///
/// # Example
/// ```
/// use showsync::{CueIndexPolicy, ReplicaConfig};
///
/// let config = ReplicaConfig::new().with_cue_index_policy(CueIndexPolicy::Strict);
/// assert_eq!(config.cue_index_policy, CueIndexPolicy::Strict);
/// assert_eq!(ReplicaConfig::default().cue_index_policy, CueIndexPolicy::Clamp);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReplicaConfig {
    pub cue_index_policy: CueIndexPolicy,
}

impl ReplicaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cue_index_policy(mut self, policy: CueIndexPolicy) -> Self {
        self.cue_index_policy = policy;
        self
    }
}

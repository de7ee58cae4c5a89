//! Capability contract between metadata sources and the aggregator.

use thiserror::Error;

/// One candidate source of instance configuration, probed and drained by the
/// aggregator. Implementations capture their state at construction time;
/// these accessors must not re-trigger I/O.
pub trait Provider {
    /// Human-readable identity for logging and diagnostics.
    fn describe(&self) -> String;

    /// True iff the source yielded usable (non-empty) user-data.
    fn probe(&self) -> bool;

    /// The captured user-data. A stored construction error is authoritative
    /// and is returned instead of any bytes.
    fn extract(&self) -> Result<&[u8], ProviderError>;
}

/// Terminal errors captured during provider construction.
///
/// Sources are rendered to strings at capture time so the error can be handed
/// out on every `extract()` call of an otherwise immutable provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("failed to create mount point: {0}")]
    MountPoint(String),

    #[error("failed to mount {device} ({fstype}): {reason}")]
    Mount {
        device: String,
        fstype: String,
        reason: String,
    },

    #[error("no user_data found in ./openstack/latest/user_data")]
    MissingUserData,

    #[error("failed to read user_data: {0}")]
    UserData(String),
}

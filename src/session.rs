//! User session lifecycle signals.

use crate::model::OwnerId;

/// Buffer size of the session broadcast channel.
pub const SESSION_CHANNEL_CAPACITY: usize = 16;

/// Emitted when the signed-in account changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// A user signed in; their initial snapshot follows on the snapshot stream.
    Started { owner: OwnerId },
    /// The user signed out. Every outstanding reminder must go.
    Ended,
}

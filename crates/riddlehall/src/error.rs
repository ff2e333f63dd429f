//! Unified error type for Riddlehall.

use riddlehall_protocol::ProtocolError;
use riddlehall_room::RoomError;

use crate::config::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// When using the `riddlehall` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RiddlehallError {
    /// A client-supplied value could not be understood.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room or match rule rejected the request.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The service configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

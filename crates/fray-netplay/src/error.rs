//! Netplay error types.

use fray_core::Frame;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetcodeError {
    /// A rollback target is older than every retained snapshot, so the
    /// session cannot reconstruct the past state it would need to
    /// resimulate from.
    #[error("rollback to frame {target} impossible: oldest retained snapshot is {oldest:?}")]
    RollbackImpossible {
        target: Frame,
        oldest: Option<Frame>,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] fray_netproto::error::ProtoError),

    #[error("transport closed")]
    TransportClosed,
}

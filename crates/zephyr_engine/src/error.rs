//! Error types for the synchronization engine.

use crate::resolver::StoreSide;
use thiserror::Error;
use zephyr_store::StoreError;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A store adapter call failed.
    ///
    /// Write rejections and unavailability surface here, tagged with the
    /// side they came from. An in-flight operation aborts without rolling
    /// back keys it already wrote; partial application is a documented
    /// outcome, not corruption.
    #[error("{side} store: {source}")]
    Store {
        /// Which store the failing call was issued against.
        side: StoreSide,
        /// The underlying adapter error.
        #[source]
        source: StoreError,
    },

    /// A synchronization was requested while another one is in flight.
    ///
    /// Only the non-queuing [`try_sync`](crate::Zephyr::try_sync) entry
    /// point reports this; the queuing entry points wait instead.
    #[error("a synchronization is already in progress")]
    SyncInProgress,
}

impl SyncError {
    /// Tags a store error with the local side.
    pub fn local(source: StoreError) -> Self {
        Self::Store {
            side: StoreSide::Local,
            source,
        }
    }

    /// Tags a store error with the remote side.
    pub fn remote(source: StoreError) -> Self {
        Self::Store {
            side: StoreSide::Remote,
            source,
        }
    }

    /// Tags a store error with the given side.
    pub fn store(side: StoreSide, source: StoreError) -> Self {
        Self::Store { side, source }
    }
}

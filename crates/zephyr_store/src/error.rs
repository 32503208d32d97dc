//! Error types for store adapter operations.

use thiserror::Error;

/// Result type for store adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when reading from or writing to a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected a write (unsupported value type, quota, ...).
    ///
    /// Callers surface this to the application; the retry policy belongs
    /// to the backend, not to the synchronization core.
    #[error("write rejected for key '{key}': {reason}")]
    WriteRejected {
        /// The key whose write was rejected.
        key: String,
        /// Backend-provided reason.
        reason: String,
    },

    /// The backend is not currently reachable or initialized.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An unsubscribe was attempted with a handle this store never issued
    /// or has already released.
    #[error("unknown subscription handle {0:?}")]
    UnknownSubscription(crate::store::SubscriptionId),
}

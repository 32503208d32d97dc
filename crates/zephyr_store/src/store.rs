//! Store adapter trait definition.

use crate::error::StoreResult;
use crate::value::{StoreContents, Value};
use std::sync::Arc;

/// Callback invoked when a subscribed key changes.
///
/// The callback receives the key that changed. A backend whose native
/// notification reports several keys at once must decompose the batch and
/// invoke each matching scoped callback once per key.
pub type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Opaque handle identifying one active subscription on one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A uniform adapter over a concrete key-value backend.
///
/// Two instances exist at runtime: the local store and the cloud-replicated
/// remote store. The synchronization core owns no data of its own; it only
/// reads and writes through this contract.
///
/// # Invariants
///
/// - A completed `write` is visible to every subsequent `read`/`read_all`
///   on the same adapter (no client-side caching lag)
/// - Change callbacks fire for writes performed through the backend's own
///   external mutation path; they are scoped to the key they were
///   subscribed with
/// - Adapters must be `Send + Sync` because notifications may be delivered
///   on a thread distinct from the caller's
///
/// # Implementors
///
/// - [`super::MemoryStore`] - in-memory reference store, used by tests and
///   embedders that bring their own persistence
pub trait KeyValueStore: Send + Sync {
    /// Reads every key-value pair currently in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`](crate::StoreError::Unavailable)
    /// if the backend is not reachable.
    fn read_all(&self) -> StoreResult<StoreContents>;

    /// Reads a single key. Returns `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`](crate::StoreError::Unavailable)
    /// if the backend is not reachable.
    fn read(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Writes a single key. `None` deletes the key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteRejected`](crate::StoreError::WriteRejected)
    /// if the backend refuses the value (unsupported type, quota), or
    /// [`StoreError::Unavailable`](crate::StoreError::Unavailable) if the
    /// backend is not reachable. Callers surface write rejections and do not
    /// retry automatically.
    fn write(&self, key: &str, value: Option<Value>) -> StoreResult<()>;

    /// Subscribes `on_change` to changes of `key`.
    ///
    /// Returns a handle to pass to [`unsubscribe`](KeyValueStore::unsubscribe).
    /// Multiple subscriptions may exist for the same key; each fires
    /// independently.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`](crate::StoreError::Unavailable)
    /// if the backend is not reachable.
    fn subscribe(&self, key: &str, on_change: ChangeCallback) -> StoreResult<SubscriptionId>;

    /// Releases a subscription previously returned by
    /// [`subscribe`](KeyValueStore::subscribe).
    ///
    /// # Errors
    ///
    /// Returns
    /// [`StoreError::UnknownSubscription`](crate::StoreError::UnknownSubscription)
    /// if the handle was never issued or has already been released.
    fn unsubscribe(&self, id: SubscriptionId) -> StoreResult<()>;
}

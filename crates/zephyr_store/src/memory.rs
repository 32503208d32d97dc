//! In-memory reference store.

use crate::error::{StoreError, StoreResult};
use crate::store::{ChangeCallback, KeyValueStore, SubscriptionId};
use crate::value::{StoreContents, Value};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

struct Subscription {
    id: SubscriptionId,
    key: String,
    on_change: ChangeCallback,
}

/// An in-memory key-value store.
///
/// This store keeps all data in memory and is suitable for:
/// - Unit and integration tests of the synchronization engine
/// - Embedders that bring their own persistence and only need a scratch store
///
/// Change callbacks fire synchronously on the writing thread, after the data
/// lock has been released, so a callback may freely re-enter the store.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use zephyr_store::{KeyValueStore, MemoryStore, Value};
///
/// let store = MemoryStore::new();
/// store.write("theme", Some(Value::from("dark"))).unwrap();
/// assert_eq!(store.read("theme").unwrap(), Some(Value::from("dark")));
/// ```
#[derive(Default)]
pub struct MemoryStore {
    name: String,
    data: RwLock<StoreContents>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
    write_count: AtomicU64,
    unavailable: AtomicBool,
    rejected_keys: RwLock<HashSet<String>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Creates a new empty store with a name used in error messages.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a copy of the current contents.
    ///
    /// Useful for assertions; unlike [`KeyValueStore::read_all`] it ignores
    /// the availability toggle.
    #[must_use]
    pub fn contents(&self) -> StoreContents {
        self.data.read().clone()
    }

    /// Returns the number of writes (including deletes) performed so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Simulates the backend becoming unreachable.
    ///
    /// While unavailable, reads and writes fail with
    /// [`StoreError::Unavailable`]. Subscription bookkeeping still works, so
    /// an engine can always tear down or reinstall its observers.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every future write to `key` fail with
    /// [`StoreError::WriteRejected`], simulating a backend type/quota
    /// rejection.
    pub fn reject_writes_to(&self, key: impl Into<String>) {
        self.rejected_keys.write().insert(key.into());
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(self.name.clone()))
        } else {
            Ok(())
        }
    }

    fn notify(&self, key: &str) {
        // Clone matching callbacks out of the lock so a callback can
        // subscribe, unsubscribe, or write without deadlocking.
        let callbacks: Vec<ChangeCallback> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.key == key)
            .map(|s| ChangeCallback::clone(&s.on_change))
            .collect();

        for callback in callbacks {
            callback(key);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn read_all(&self) -> StoreResult<StoreContents> {
        self.check_available()?;
        Ok(self.data.read().clone())
    }

    fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        self.check_available()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: Option<Value>) -> StoreResult<()> {
        self.check_available()?;
        if self.rejected_keys.read().contains(key) {
            return Err(StoreError::WriteRejected {
                key: key.to_owned(),
                reason: "backend rejected value".to_owned(),
            });
        }

        {
            let mut data = self.data.write();
            match value {
                Some(value) => {
                    data.insert(key.to_owned(), value);
                }
                None => {
                    data.remove(key);
                }
            }
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);

        self.notify(key);
        Ok(())
    }

    fn subscribe(&self, key: &str, on_change: ChangeCallback) -> StoreResult<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscriptions.write().push(Subscription {
            id,
            key: key.to_owned(),
            on_change,
        });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> StoreResult<()> {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        if subscriptions.len() == before {
            return Err(StoreError::UnknownSubscription(id));
        }
        Ok(())
    }
}

//! Change watcher: bridges store change notifications into targeted syncs.

use crate::clock::touch_clock;
use crate::error::{SyncError, SyncResult};
use crate::resolver::StoreSide;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use zephyr_store::{ChangeCallback, KeyValueStore, SubscriptionId};

/// Invoked with the monitored keys that survived filtering; performs the
/// targeted sync for them.
pub(crate) type SyncHandler = Arc<dyn Fn(&[String]) -> SyncResult<()> + Send + Sync>;

struct WatchedKey {
    key: String,
    local_id: SubscriptionId,
    remote_id: SubscriptionId,
}

/// Watches monitored keys on both stores and routes their external changes
/// into targeted syncs.
///
/// Holds the monitored-key set (ordered, unique) and the per-key
/// subscription handles on both stores. The engine detaches every
/// subscription before a sync writes anything and reattaches them after the
/// clock write has completed, so the engine's own writes are never observed
/// as external changes.
pub(crate) struct ChangeWatcher {
    local: Arc<dyn KeyValueStore>,
    remote: Arc<dyn KeyValueStore>,
    clock_key: String,
    debug: Arc<AtomicBool>,
    monitored: RwLock<Vec<String>>,
    attached: Mutex<Vec<WatchedKey>>,
    handler: RwLock<Option<SyncHandler>>,
    self_ref: RwLock<Weak<ChangeWatcher>>,
}

impl ChangeWatcher {
    pub(crate) fn new(
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn KeyValueStore>,
        clock_key: String,
        debug: Arc<AtomicBool>,
    ) -> Arc<Self> {
        let watcher = Arc::new(Self {
            local,
            remote,
            clock_key,
            debug,
            monitored: RwLock::new(Vec::new()),
            attached: Mutex::new(Vec::new()),
            handler: RwLock::new(None),
            self_ref: RwLock::new(Weak::new()),
        });
        *watcher.self_ref.write() = Arc::downgrade(&watcher);
        watcher
    }

    pub(crate) fn set_handler(&self, handler: SyncHandler) {
        *self.handler.write() = Some(handler);
    }

    pub(crate) fn monitored_keys(&self) -> Vec<String> {
        self.monitored.read().clone()
    }

    /// Adds a key to the monitored set and installs its subscriptions on
    /// both stores. Idempotent; the reserved clock key is silently refused.
    ///
    /// Returns `Ok(true)` if the key was newly added.
    pub(crate) fn add_key(&self, key: &str) -> SyncResult<bool> {
        if key == self.clock_key {
            // Monitoring the clock key would make every sync's own clock
            // write re-trigger a sync.
            return Ok(false);
        }
        if self.monitored.read().iter().any(|m| m == key) {
            return Ok(false);
        }

        self.install(key)?;
        self.monitored.write().push(key.to_owned());
        Ok(true)
    }

    /// Removes a key from the monitored set and tears down its
    /// subscriptions. A key that is not monitored is a no-op.
    ///
    /// Returns `true` if the key was monitored.
    pub(crate) fn remove_key(&self, key: &str) -> bool {
        let mut monitored = self.monitored.write();
        let before = monitored.len();
        // Removal by value; positions in the caller's list are irrelevant.
        monitored.retain(|m| m != key);
        if monitored.len() == before {
            return false;
        }
        drop(monitored);

        let entry = {
            let mut attached = self.attached.lock();
            attached
                .iter()
                .position(|w| w.key == key)
                .map(|i| attached.swap_remove(i))
        };
        if let Some(entry) = entry {
            self.release(&entry);
        }
        true
    }

    /// Tears down every installed subscription without touching the
    /// monitored set. Called before a sync operation writes anything.
    pub(crate) fn detach_all(&self) {
        let entries: Vec<WatchedKey> = self.attached.lock().drain(..).collect();
        for entry in entries {
            self.release(&entry);
        }
    }

    /// Reinstalls subscriptions for every monitored key. Called after all
    /// writes of a sync operation, including the clock write, have returned.
    ///
    /// Best-effort: a store that refuses a subscription is logged and
    /// skipped; the next reattach will try again.
    pub(crate) fn reattach_all(&self) {
        let keys = self.monitored_keys();
        for key in keys {
            if let Err(err) = self.install(&key) {
                tracing::warn!(target: "zephyr", key = %key, error = %err, "failed to reattach observer");
            }
        }
    }

    /// Routes one change notification through the monitored-key filter.
    ///
    /// The reserved clock key and unmonitored keys are dropped. The clock
    /// of the store the change originated from is refreshed first, making
    /// that store authoritative for the sync that follows; the surviving
    /// keys then go through one targeted sync as a single batch, so every
    /// key in the batch moves in the same globally-resolved direction.
    /// Whether keys within one batch could legitimately need opposite
    /// directions is a known, deliberate simplification.
    ///
    /// On sync failure the error is logged and the subscriptions stay
    /// installed; the next external change will attempt sync again.
    pub(crate) fn handle_change(&self, origin: StoreSide, keys: &[String]) {
        let interesting: Vec<String> = {
            let monitored = self.monitored.read();
            keys.iter()
                .filter(|k| *k != &self.clock_key && monitored.iter().any(|m| &m == k))
                .cloned()
                .collect()
        };
        if interesting.is_empty() {
            return;
        }

        // The store that just changed holds the newest data; stamp it so
        // the resolver picks it. The clock key itself is never monitored,
        // so this write cannot re-enter the watcher.
        let origin_store = match origin {
            StoreSide::Local => &self.local,
            StoreSide::Remote => &self.remote,
        };
        if let Err(err) = touch_clock(origin_store.as_ref(), &self.clock_key) {
            tracing::warn!(target: "zephyr", %origin, error = %err, "failed to stamp changed store");
            return;
        }

        let handler = self.handler.read().clone();
        if let Some(handler) = handler {
            if let Err(err) = handler(&interesting) {
                tracing::warn!(
                    target: "zephyr",
                    keys = ?interesting,
                    error = %err,
                    "change-triggered sync failed"
                );
            }
        }
    }

    fn install(&self, key: &str) -> SyncResult<()> {
        let local_id = self
            .local
            .subscribe(key, self.callback_for(StoreSide::Local))
            .map_err(SyncError::local)?;
        let remote_id = match self
            .remote
            .subscribe(key, self.callback_for(StoreSide::Remote))
        {
            Ok(id) => id,
            Err(err) => {
                if let Err(release_err) = self.local.unsubscribe(local_id) {
                    tracing::warn!(target: "zephyr", key = %key, error = %release_err, "failed to release local observer");
                }
                return Err(SyncError::remote(err));
            }
        };

        self.attached.lock().push(WatchedKey {
            key: key.to_owned(),
            local_id,
            remote_id,
        });
        self.report(&format!("Subscribed '{key}' for observation."));
        Ok(())
    }

    fn callback_for(&self, origin: StoreSide) -> ChangeCallback {
        let weak = self.self_ref.read().clone();
        Arc::new(move |changed: &str| {
            if let Some(watcher) = weak.upgrade() {
                watcher.handle_change(origin, &[changed.to_owned()]);
            }
        })
    }

    fn release(&self, entry: &WatchedKey) {
        if let Err(err) = self.local.unsubscribe(entry.local_id) {
            tracing::warn!(target: "zephyr", key = %entry.key, error = %err, "failed to release local observer");
        }
        if let Err(err) = self.remote.unsubscribe(entry.remote_id) {
            tracing::warn!(target: "zephyr", key = %entry.key, error = %err, "failed to release remote observer");
        }
        self.report(&format!("Unsubscribed '{}' from observation.", entry.key));
    }

    fn report(&self, status: &str) {
        if self.debug.load(Ordering::Relaxed) {
            tracing::debug!(target: "zephyr", "{status}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DEFAULT_CLOCK_KEY;
    use parking_lot::Mutex as PlMutex;
    use zephyr_store::MemoryStore;

    fn watcher_with_stores() -> (Arc<ChangeWatcher>, Arc<MemoryStore>, Arc<MemoryStore>) {
        let local = Arc::new(MemoryStore::named("local"));
        let remote = Arc::new(MemoryStore::named("remote"));
        let watcher = ChangeWatcher::new(
            Arc::clone(&local) as Arc<dyn KeyValueStore>,
            Arc::clone(&remote) as Arc<dyn KeyValueStore>,
            DEFAULT_CLOCK_KEY.to_owned(),
            Arc::new(AtomicBool::new(false)),
        );
        (watcher, local, remote)
    }

    fn recording_handler() -> (SyncHandler, Arc<PlMutex<Vec<Vec<String>>>>) {
        let calls = Arc::new(PlMutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        let handler: SyncHandler = Arc::new(move |keys: &[String]| {
            calls_clone.lock().push(keys.to_vec());
            Ok(())
        });
        (handler, calls)
    }

    #[test]
    fn add_key_installs_on_both_stores() {
        let (watcher, local, remote) = watcher_with_stores();
        assert!(watcher.add_key("theme").unwrap());
        assert_eq!(local.subscription_count(), 1);
        assert_eq!(remote.subscription_count(), 1);
        assert_eq!(watcher.monitored_keys(), vec!["theme".to_owned()]);
    }

    #[test]
    fn add_key_is_idempotent() {
        let (watcher, local, _) = watcher_with_stores();
        assert!(watcher.add_key("theme").unwrap());
        assert!(!watcher.add_key("theme").unwrap());
        assert_eq!(local.subscription_count(), 1);
    }

    #[test]
    fn clock_key_is_refused() {
        let (watcher, local, _) = watcher_with_stores();
        assert!(!watcher.add_key(DEFAULT_CLOCK_KEY).unwrap());
        assert!(watcher.monitored_keys().is_empty());
        assert_eq!(local.subscription_count(), 0);
    }

    #[test]
    fn remove_key_tears_down_both_subscriptions() {
        let (watcher, local, remote) = watcher_with_stores();
        watcher.add_key("theme").unwrap();
        assert!(watcher.remove_key("theme"));
        assert_eq!(local.subscription_count(), 0);
        assert_eq!(remote.subscription_count(), 0);
        assert!(watcher.monitored_keys().is_empty());
    }

    #[test]
    fn remove_unmonitored_key_is_noop() {
        let (watcher, _, _) = watcher_with_stores();
        assert!(!watcher.remove_key("never-added"));
    }

    #[test]
    fn handle_change_filters_clock_and_unmonitored_keys() {
        let (watcher, _, _) = watcher_with_stores();
        let (handler, calls) = recording_handler();
        watcher.set_handler(handler);
        watcher.add_key("theme").unwrap();
        watcher.add_key("locale").unwrap();

        watcher.handle_change(
            StoreSide::Local,
            &[
                "theme".to_owned(),
                DEFAULT_CLOCK_KEY.to_owned(),
                "unmonitored".to_owned(),
                "locale".to_owned(),
            ],
        );

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["theme".to_owned(), "locale".to_owned()]);
    }

    #[test]
    fn handle_change_stamps_the_originating_store() {
        let (watcher, local, remote) = watcher_with_stores();
        let (handler, _) = recording_handler();
        watcher.set_handler(handler);
        watcher.add_key("theme").unwrap();

        watcher.handle_change(StoreSide::Remote, &["theme".to_owned()]);

        assert!(remote.read(DEFAULT_CLOCK_KEY).unwrap().is_some());
        assert!(local.read(DEFAULT_CLOCK_KEY).unwrap().is_none());
    }

    #[test]
    fn handle_change_with_nothing_interesting_does_not_invoke_handler() {
        let (watcher, _, _) = watcher_with_stores();
        let (handler, calls) = recording_handler();
        watcher.set_handler(handler);
        watcher.add_key("theme").unwrap();

        watcher.handle_change(
            StoreSide::Local,
            &[DEFAULT_CLOCK_KEY.to_owned(), "other".to_owned()],
        );
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn detach_then_reattach_restores_subscriptions() {
        let (watcher, local, remote) = watcher_with_stores();
        watcher.add_key("a").unwrap();
        watcher.add_key("b").unwrap();

        watcher.detach_all();
        assert_eq!(local.subscription_count(), 0);
        assert_eq!(remote.subscription_count(), 0);
        // The monitored set survives the suppression window.
        assert_eq!(watcher.monitored_keys().len(), 2);

        watcher.reattach_all();
        assert_eq!(local.subscription_count(), 2);
        assert_eq!(remote.subscription_count(), 2);
    }

    #[test]
    fn store_write_reaches_handler_through_subscription() {
        let (watcher, local, _) = watcher_with_stores();
        let (handler, calls) = recording_handler();
        watcher.set_handler(handler);
        watcher.add_key("theme").unwrap();

        local
            .write("theme", Some(zephyr_store::Value::from("dark")))
            .unwrap();

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["theme".to_owned()]);
    }
}

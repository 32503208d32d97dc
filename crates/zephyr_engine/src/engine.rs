//! The synchronization engine.

use crate::clock::{read_clock, touch_clock};
use crate::config::ZephyrConfig;
use crate::error::{SyncError, SyncResult};
use crate::resolver::{latest_store, StoreSide, SyncDirection};
use crate::watcher::{ChangeWatcher, SyncHandler};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zephyr_store::{KeyValueStore, Value};

/// Observable state of the engine, per sync invocation.
///
/// A sync operation walks `Idle → ObserversDetached → ResolvingDirection →
/// Copying → ClockUpdated → ObserversReattached → Idle`. Operations are
/// serialized; the state never reflects two overlapping invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No synchronization in flight.
    Idle,
    /// Observers have been detached; writes are suppressed from the watcher.
    ObserversDetached,
    /// Reading both clock values to pick the authoritative store.
    ResolvingDirection,
    /// Copying keys from the authoritative store into the other.
    Copying,
    /// The destination's clock value has been refreshed.
    ClockUpdated,
    /// Observers have been reinstalled; the operation is finishing.
    ObserversReattached,
}

/// Bidirectional last-write-wins synchronization between a local and a
/// remote key-value store.
///
/// A `Zephyr` instance owns no data. It reads and writes both stores
/// through the [`KeyValueStore`] adapter contract, resolves the
/// authoritative direction from the two sync clock values, and keeps a set
/// of monitored keys whose external changes trigger targeted syncs.
///
/// The host application owns the instance's lifetime; there is no global
/// state.
///
/// # Concurrency
///
/// All sync operations - full, key-batch, or watcher-triggered - are
/// serialized on an internal mutex. Observer suppression is a correctness
/// mechanism, not logging hygiene: subscriptions are detached before the
/// first write and reinstalled only after every write of the operation,
/// including the clock write, has returned. This holds on error paths too.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use zephyr_engine::Zephyr;
/// use zephyr_store::{KeyValueStore, MemoryStore, Value};
///
/// let local = Arc::new(MemoryStore::named("local"));
/// let remote = Arc::new(MemoryStore::named("remote"));
/// local.write("theme", Some(Value::from("dark"))).unwrap();
///
/// let zephyr = Zephyr::new(local.clone(), remote.clone());
/// zephyr.sync(&[]).unwrap();
/// assert_eq!(remote.read("theme").unwrap(), Some(Value::from("dark")));
/// ```
pub struct Zephyr {
    local: Arc<dyn KeyValueStore>,
    remote: Arc<dyn KeyValueStore>,
    config: ZephyrConfig,
    watcher: Arc<ChangeWatcher>,
    sync_lock: Mutex<()>,
    state: RwLock<SyncState>,
    debug: Arc<AtomicBool>,
}

impl Zephyr {
    /// Creates an engine over the two stores with the default configuration.
    pub fn new(local: Arc<dyn KeyValueStore>, remote: Arc<dyn KeyValueStore>) -> Arc<Self> {
        Self::with_config(local, remote, ZephyrConfig::default())
    }

    /// Creates an engine over the two stores with an explicit configuration.
    pub fn with_config(
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn KeyValueStore>,
        config: ZephyrConfig,
    ) -> Arc<Self> {
        let debug = Arc::new(AtomicBool::new(config.debug));
        let watcher = ChangeWatcher::new(
            Arc::clone(&local),
            Arc::clone(&remote),
            config.clock_key.clone(),
            Arc::clone(&debug),
        );

        let engine = Arc::new(Self {
            local,
            remote,
            config,
            watcher,
            sync_lock: Mutex::new(()),
            state: RwLock::new(SyncState::Idle),
            debug,
        });

        // Watcher-triggered syncs go through the same serialized path as
        // application-issued ones. The weak reference breaks the cycle
        // between the engine and the callbacks it installs.
        let weak = Arc::downgrade(&engine);
        let handler: SyncHandler = Arc::new(move |keys: &[String]| match weak.upgrade() {
            Some(engine) => engine.sync_keys(keys),
            None => Ok(()),
        });
        engine.watcher.set_handler(handler);

        engine
    }

    /// Synchronizes the two stores.
    ///
    /// With an empty `keys` slice this performs a full resolve-and-sync
    /// ([`sync_all`](Self::sync_all)); otherwise a targeted sync restricted
    /// to the given keys ([`sync_keys`](Self::sync_keys)). The direction is
    /// resolved globally, never per key.
    ///
    /// Queues behind any synchronization already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if a store adapter call fails. The
    /// operation aborts without rolling back keys it already wrote.
    pub fn sync(&self, keys: &[String]) -> SyncResult<()> {
        if keys.is_empty() {
            self.sync_all()
        } else {
            self.sync_keys(keys)
        }
    }

    /// Copies every key from the authoritative store into the other.
    ///
    /// The authoritative direction is decided once from the two clock
    /// values. Every key except the reserved clock key is copied,
    /// overwriting existing entries; keys present only in the destination
    /// are left alone. After the copy, a fresh clock value is written into
    /// the destination store - the store just written-to is the one that
    /// now reflects the synchronized state.
    ///
    /// Queues behind any synchronization already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if a store adapter call fails; keys
    /// written before the failure stay written.
    pub fn sync_all(&self) -> SyncResult<()> {
        let _guard = self.sync_lock.lock();
        self.with_observers_suppressed(|engine| engine.copy_all())
    }

    /// Synchronizes only the given keys, in one globally-resolved direction.
    ///
    /// For each key the value is copied from the authoritative store to the
    /// other; a key absent in the source propagates as a deletion. The
    /// destination's clock value is refreshed after each key write. The
    /// reserved clock key is skipped.
    ///
    /// Queues behind any synchronization already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if a store adapter call fails; keys
    /// written before the failure stay written.
    pub fn sync_keys(&self, keys: &[String]) -> SyncResult<()> {
        let _guard = self.sync_lock.lock();
        self.with_observers_suppressed(|engine| engine.copy_keys(keys))
    }

    /// Non-queuing variant of [`sync`](Self::sync).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncInProgress`] if another synchronization is
    /// in flight, otherwise behaves exactly like [`sync`](Self::sync).
    pub fn try_sync(&self, keys: &[String]) -> SyncResult<()> {
        let Some(_guard) = self.sync_lock.try_lock() else {
            return Err(SyncError::SyncInProgress);
        };
        if keys.is_empty() {
            self.with_observers_suppressed(|engine| engine.copy_all())
        } else {
            self.with_observers_suppressed(|engine| engine.copy_keys(keys))
        }
    }

    /// Starts monitoring the given keys.
    ///
    /// Each newly monitored key gets a change subscription on both stores;
    /// an external change to it triggers a targeted sync of that key. Keys
    /// already monitored are no-ops, and the reserved clock key is silently
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if a store refuses a subscription; keys
    /// processed before the failure stay monitored.
    pub fn add_keys_to_be_monitored(&self, keys: &[String]) -> SyncResult<()> {
        let _guard = self.sync_lock.lock();
        for key in keys {
            self.watcher.add_key(key)?;
        }
        Ok(())
    }

    /// Stops monitoring the given keys.
    ///
    /// Keys that are not monitored are no-ops.
    pub fn remove_keys_from_being_monitored(&self, keys: &[String]) {
        let _guard = self.sync_lock.lock();
        for key in keys {
            self.watcher.remove_key(key);
        }
    }

    /// Returns the currently monitored keys, in insertion order.
    #[must_use]
    pub fn monitored_keys(&self) -> Vec<String> {
        self.watcher.monitored_keys()
    }

    /// Returns the engine's current state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Enables or disables per-key status lines (emitted at `tracing`
    /// debug level).
    pub fn set_debug_enabled(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether per-key status lines are enabled.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Runs `op` inside the observer suppression window.
    ///
    /// Observers are reattached whether `op` succeeds or fails, so an
    /// aborted operation never leaves the watcher dark.
    fn with_observers_suppressed<F>(&self, op: F) -> SyncResult<()>
    where
        F: FnOnce(&Self) -> SyncResult<()>,
    {
        self.set_state(SyncState::ObserversDetached);
        self.watcher.detach_all();

        let result = op(self);

        self.watcher.reattach_all();
        self.set_state(SyncState::ObserversReattached);
        self.set_state(SyncState::Idle);
        result
    }

    fn copy_all(&self) -> SyncResult<()> {
        let source_side = self.resolve_direction()?;
        let dest_side = source_side.opposite();
        let direction = source_side.direction();
        let source = self.store(source_side);
        let dest = self.store(dest_side);

        self.set_state(SyncState::Copying);
        let snapshot = source
            .read_all()
            .map_err(|e| SyncError::store(source_side, e))?;
        for (key, value) in snapshot {
            if key == self.config.clock_key {
                continue;
            }
            self.report_write(&key, Some(&value), direction);
            dest.write(&key, Some(value))
                .map_err(|e| SyncError::store(dest_side, e))?;
        }

        touch_clock(dest.as_ref(), &self.config.clock_key)
            .map_err(|e| SyncError::store(dest_side, e))?;
        self.set_state(SyncState::ClockUpdated);
        Ok(())
    }

    fn copy_keys(&self, keys: &[String]) -> SyncResult<()> {
        let source_side = self.resolve_direction()?;
        let dest_side = source_side.opposite();
        let direction = source_side.direction();
        let source = self.store(source_side);
        let dest = self.store(dest_side);

        self.set_state(SyncState::Copying);
        for key in keys {
            if key == &self.config.clock_key {
                continue;
            }
            let value = source
                .read(key)
                .map_err(|e| SyncError::store(source_side, e))?;
            self.report_write(key, value.as_ref(), direction);
            dest.write(key, value)
                .map_err(|e| SyncError::store(dest_side, e))?;
            touch_clock(dest.as_ref(), &self.config.clock_key)
                .map_err(|e| SyncError::store(dest_side, e))?;
        }

        self.set_state(SyncState::ClockUpdated);
        Ok(())
    }

    fn resolve_direction(&self) -> SyncResult<StoreSide> {
        self.set_state(SyncState::ResolvingDirection);
        let local_clock =
            read_clock(self.local.as_ref(), &self.config.clock_key).map_err(SyncError::local)?;
        let remote_clock =
            read_clock(self.remote.as_ref(), &self.config.clock_key).map_err(SyncError::remote)?;
        Ok(latest_store(local_clock, remote_clock))
    }

    fn store(&self, side: StoreSide) -> &Arc<dyn KeyValueStore> {
        match side {
            StoreSide::Local => &self.local,
            StoreSide::Remote => &self.remote,
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn report_write(&self, key: &str, value: Option<&Value>, direction: SyncDirection) {
        if !self.debug.load(Ordering::Relaxed) {
            return;
        }
        let rendered = match value {
            Some(value) => format!("{value:?}"),
            None => "absent".to_owned(),
        };
        tracing::debug!(
            target: "zephyr",
            "Synchronizing key '{key}' with value '{rendered}' {direction}."
        );
    }
}

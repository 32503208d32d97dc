//! # Zephyr Engine
//!
//! Bidirectional, last-write-wins synchronization between two key-value
//! stores (a local store and a cloud-replicated remote store), driven by
//! change notifications.
//!
//! This crate provides:
//! - A pure conflict resolver over the two stores' sync clock values
//! - The [`Zephyr`] engine: full-store and targeted key synchronization in
//!   the authoritative direction
//! - A change watcher that turns external changes of monitored keys into
//!   targeted syncs
//! - Observer suppression around every sync, so the engine's own writes
//!   never feed back into it
//!
//! ## Architecture
//!
//! Each store holds its last-synchronization instant under a reserved
//! clock key ([`DEFAULT_CLOCK_KEY`]). A sync reads both clocks, picks the
//! authoritative store (strictly newer clock wins; ties and the bootstrap
//! case favor local), copies data into the other store, and then refreshes
//! the *destination's* clock - the store just written-to is the one that
//! now reflects the synchronized state.
//!
//! ## Key Invariants
//!
//! - One synchronization in flight at a time; operations are serialized
//! - Observers are detached before the first write and reattached only
//!   after the clock write has returned, on error paths too
//! - The clock key is never copied between stores and can never be
//!   monitored
//! - Direction is resolved once per operation, never per key
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use zephyr_engine::Zephyr;
//! use zephyr_store::{KeyValueStore, MemoryStore, Value};
//!
//! let local = Arc::new(MemoryStore::named("local"));
//! let remote = Arc::new(MemoryStore::named("remote"));
//! let zephyr = Zephyr::new(local.clone(), remote.clone());
//!
//! // Changes to monitored keys propagate automatically.
//! zephyr.add_keys_to_be_monitored(&["theme".to_owned()]).unwrap();
//! local.write("theme", Some(Value::from("dark"))).unwrap();
//! assert_eq!(remote.read("theme").unwrap(), Some(Value::from("dark")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod engine;
mod error;
mod resolver;
mod watcher;

pub use clock::DEFAULT_CLOCK_KEY;
pub use config::ZephyrConfig;
pub use engine::{SyncState, Zephyr};
pub use error::{SyncError, SyncResult};
pub use resolver::{latest_store, StoreSide, SyncDirection};

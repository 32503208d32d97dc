//! # Zephyr Store
//!
//! Store adapter trait and reference implementation for Zephyr.
//!
//! This crate defines the uniform contract the synchronization engine uses
//! to talk to a concrete key-value backend. Two adapter instances exist at
//! runtime - one for the local store and one for the cloud-replicated remote
//! store - and the engine treats them interchangeably.
//!
//! ## Design Principles
//!
//! - Adapters expose read-all, read-one, write-one, and per-key change
//!   subscriptions; nothing else
//! - Persistence and wire formats are entirely the adapter's concern
//! - Values are a closed tagged variant ([`Value`]) so the contract is
//!   statically checkable
//! - Must be `Send + Sync`; change notifications may arrive on a thread
//!   distinct from the caller's
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - in-memory store for tests and ephemeral use
//!
//! ## Example
//!
//! ```rust
//! use zephyr_store::{KeyValueStore, MemoryStore, Value};
//!
//! let store = MemoryStore::new();
//! store.write("theme", Some(Value::from("dark"))).unwrap();
//! assert_eq!(store.read("theme").unwrap(), Some(Value::from("dark")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;
mod value;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{ChangeCallback, KeyValueStore, SubscriptionId};
pub use value::{StoreContents, Value};

//! Persistence for canonical events.
//!
//! Reconciliation talks to the [`EventStore`] trait only. [`PgEventStore`]
//! is the production backend; [`MemoryEventStore`] (feature `test-utils`)
//! backs tests.

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryEventStore;
pub use store::{EventStore, PgEventStore};
pub use types::StoredEvent;

//! In-memory storage backend.
//!
//! [`InMemoryStorage`] implements every capability of the object-storage
//! contract on top of a papaya lock-free HashMap. It backs local development
//! setups and the test suites of the dual-write router, where one instance
//! plays the legacy store and another the unified store.
//!
//! # Example
//!
//! ```ignore
//! use dualstore_db_memory::InMemoryStorage;
//!
//! let legacy = InMemoryStorage::with_backend_name("playlists", "legacy-memory").into_handle();
//! let unified = InMemoryStorage::new("playlists").into_handle();
//! ```

pub mod storage;

pub use storage::InMemoryStorage;

// Re-export the contract for convenience
pub use dualstore_storage::{StorageError, StorageHandle};

//! # dualstore-storage
//!
//! The object-storage contract every backend implements.
//!
//! A store must be able to `get` objects ([`ObjectStorage`]). Creating,
//! updating, deleting, listing and watching are separate capabilities
//! ([`Creater`], [`Updater`], [`Deleter`], [`Lister`], [`Watcher`]); a
//! [`StorageHandle`] records which of them a store provides, so callers can
//! check support once, up front, instead of probing at call time.
//!
//! ## Example
//!
//! ```ignore
//! use dualstore_storage::{CreateOptions, RequestContext, StorageHandle};
//!
//! let handle = StorageHandle::full(Arc::new(store));
//! let ctx = RequestContext::background();
//!
//! if let Some(creater) = handle.creater() {
//!     creater.create(&ctx, &object, None, &CreateOptions::default()).await?;
//! }
//! let current = handle.storage().get(&ctx, "a", &GetOptions::default()).await?;
//! ```

mod context;
mod error;
mod handle;
mod traits;
mod types;
mod watch;

pub use context::RequestContext;
pub use error::{ErrorCategory, StorageError};
pub use handle::{Capabilities, Operation, StorageHandle};
pub use traits::{Creater, Deleter, Lister, ObjectStorage, Updater, Watcher};
pub use types::{
    CreateOptions, DeleteOptions, GetOptions, ListOptions, ObjectList, Preconditions,
    UpdateOptions, ValidateObjectFn,
};
pub use watch::WatchStream;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

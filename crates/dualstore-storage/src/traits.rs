//! Storage capability traits.
//!
//! [`ObjectStorage`] is the minimum every store provides. The remaining traits
//! are independent capabilities; a store implements only those it supports and
//! advertises them through a [`StorageHandle`](crate::StorageHandle).

use async_trait::async_trait;
use dualstore_core::ResourceObject;

use crate::context::RequestContext;
use crate::error::StorageError;
use crate::types::{
    CreateOptions, DeleteOptions, GetOptions, ListOptions, ObjectList, UpdateOptions,
    ValidateObjectFn,
};
use crate::watch::WatchStream;

/// Read access by name. Mandatory for every store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Reads an object by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<ResourceObject, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait Creater: Send + Sync {
    /// Persists a new object and returns it as stored.
    ///
    /// `validation`, when given, is run against the object before it is
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if an object with the same name exists.
    /// Returns `StorageError::InvalidResource` if the object is rejected.
    async fn create(
        &self,
        ctx: &RequestContext,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &CreateOptions,
    ) -> Result<ResourceObject, StorageError>;
}

#[async_trait]
pub trait Updater: Send + Sync {
    /// Replaces the object called `name`.
    ///
    /// When `object` carries a resource version the update only succeeds if
    /// it matches the stored one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist and
    /// `options.allow_create` is false.
    /// Returns `StorageError::VersionConflict` on a resource version mismatch.
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &UpdateOptions,
    ) -> Result<ResourceObject, StorageError>;
}

#[async_trait]
pub trait Deleter: Send + Sync {
    /// Deletes the object called `name` and returns its last stored state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::VersionConflict` if a precondition fails.
    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        validation: Option<&ValidateObjectFn>,
        options: &DeleteOptions,
    ) -> Result<ResourceObject, StorageError>;
}

#[async_trait]
pub trait Lister: Send + Sync {
    async fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<ObjectList, StorageError>;
}

#[async_trait]
pub trait Watcher: Send + Sync {
    /// Starts watching for changes made after the call.
    async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StorageError>;
}

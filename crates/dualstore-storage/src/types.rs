//! Option and result types used by the storage traits.

use dualstore_core::ResourceObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StorageError;

/// Caller-supplied validation run by a store before it persists an object.
///
/// A rejection should be reported as [`StorageError::InvalidResource`].
pub type ValidateObjectFn = dyn Fn(&ResourceObject) -> Result<(), StorageError> + Send + Sync;

/// Options for a create operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptions {
    /// Validate and return the would-be object without persisting it.
    #[serde(default)]
    pub dry_run: bool,
}

impl CreateOptions {
    #[must_use]
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Options for a get operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOptions {
    /// Read the object at this resource version rather than the latest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl GetOptions {
    #[must_use]
    pub fn at_version(resource_version: impl Into<String>) -> Self {
        Self {
            resource_version: Some(resource_version.into()),
        }
    }
}

/// Options for an update operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    #[serde(default)]
    pub dry_run: bool,
    /// Create the object when it does not exist yet.
    #[serde(default)]
    pub allow_create: bool,
}

/// Preconditions checked against the stored object before a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preconditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Options for a delete operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Preconditions>,
}

impl DeleteOptions {
    /// Only delete when the stored object is at `resource_version`.
    #[must_use]
    pub fn with_resource_version(resource_version: impl Into<String>) -> Self {
        Self {
            dry_run: false,
            preconditions: Some(Preconditions {
                resource_version: Some(resource_version.into()),
                uid: None,
            }),
        }
    }
}

/// Options for list and watch operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Equality label selector; every entry must match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_selector: BTreeMap<String, String>,
    /// Maximum number of items to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Opaque token returned by a previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ListOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_selector.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_continue(mut self, token: impl Into<String>) -> Self {
        self.continue_token = Some(token.into());
        self
    }
}

/// A page of objects returned by a list operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList {
    pub items: Vec<ResourceObject>,
    /// The store's resource version at the time of the list.
    pub resource_version: String,
    /// Set when more items are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
}

impl ObjectList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.continue_token.is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(ResourceObject::name)
    }
}

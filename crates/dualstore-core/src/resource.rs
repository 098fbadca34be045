use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Metadata shared by every stored object.
///
/// `uid`, `resource_version`, `creation_timestamp` and `generation` are owned by
/// the store that persisted the object; callers set them only to express
/// preconditions (e.g. an expected resource version on update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub creation_timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub generation: i64,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// An opaque, versioned object identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Value,
}

impl ResourceObject {
    pub fn new(name: impl Into<String>, spec: Value) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
            spec,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata.namespace = Some(namespace.into());
        self
    }

    pub fn with_generate_name(mut self, prefix: impl Into<String>) -> Self {
        self.metadata.generate_name = Some(prefix.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_resource_version(mut self, resource_version: impl Into<String>) -> Self {
        self.metadata.resource_version = Some(resource_version.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }

    /// Returns true when every selector entry is present in the object's labels.
    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        selector
            .iter()
            .all(|(k, v)| self.metadata.labels.get(k) == Some(v))
    }

    /// Clears the fields a store assigns on persist, so the object can be
    /// written into a different store.
    pub fn strip_server_fields(mut self) -> Self {
        self.metadata.uid = None;
        self.metadata.resource_version = None;
        self.metadata.creation_timestamp = None;
        self.metadata.generation = 0;
        self
    }
}

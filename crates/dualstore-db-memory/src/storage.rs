use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dualstore_core::{ResourceObject, WatchBroadcaster, generate_name, generate_uid, validate_name};
use dualstore_storage::{
    CreateOptions, Creater, DeleteOptions, Deleter, GetOptions, ListOptions, Lister, ObjectList,
    ObjectStorage, RequestContext, StorageError, StorageHandle, UpdateOptions, Updater,
    ValidateObjectFn, WatchStream, Watcher,
};
use papaya::HashMap as PapayaHashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

/// Resource version meaning "whatever is current".
const ANY_RESOURCE_VERSION: &str = "0";

/// In-memory object store for a single resource.
///
/// This storage implementation provides:
/// - Lock-free concurrent reads via papaya::HashMap
/// - A single store-wide resource version counter
/// - Optimistic concurrency on update and delete
/// - Label-filtered, paginated listing
/// - Watch events for every persisted write
#[derive(Debug)]
pub struct InMemoryStorage {
    resource: String,
    backend_name: &'static str,
    /// Objects keyed by name
    data: PapayaHashMap<String, ResourceObject>,
    /// Last assigned resource version
    version_counter: AtomicU64,
    /// Serialises read-modify-write sequences
    write_lock: Mutex<()>,
    broadcaster: WatchBroadcaster,
}

impl InMemoryStorage {
    pub fn new(resource: impl Into<String>) -> Self {
        Self::with_backend_name(resource, "memory")
    }

    pub fn with_backend_name(resource: impl Into<String>, backend_name: &'static str) -> Self {
        Self {
            resource: resource.into(),
            backend_name,
            data: PapayaHashMap::new(),
            version_counter: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            broadcaster: WatchBroadcaster::new(),
        }
    }

    /// Wraps the store in a handle exposing every capability.
    pub fn into_handle(self) -> StorageHandle {
        StorageHandle::full(Arc::new(self))
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.pin().contains_key(name)
    }

    /// The resource version assigned by the most recent write.
    pub fn current_resource_version(&self) -> u64 {
        self.version_counter.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> String {
        (self.version_counter.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn lookup(&self, name: &str) -> Result<ResourceObject, StorageError> {
        self.data
            .pin()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(&self.resource, name))
    }

    /// Inserts a new object. Callers must hold `write_lock`.
    fn insert_new(
        &self,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        dry_run: bool,
    ) -> Result<ResourceObject, StorageError> {
        let mut obj = object.clone();
        if obj.metadata.name.is_empty() {
            match obj.metadata.generate_name.as_deref() {
                Some(prefix) if !prefix.is_empty() => obj.metadata.name = generate_name(prefix),
                _ => {
                    return Err(StorageError::invalid_resource(
                        "name or generateName is required",
                    ));
                }
            }
        }
        validate_name(&obj.metadata.name)
            .map_err(|e| StorageError::invalid_resource(e.to_string()))?;
        if obj.metadata.resource_version.is_some() {
            return Err(StorageError::invalid_resource(
                "resourceVersion should not be set on objects to be created",
            ));
        }
        run_validation(validation, &obj)?;

        if self.data.pin().contains_key(&obj.metadata.name) {
            return Err(StorageError::already_exists(&self.resource, &obj.metadata.name));
        }

        obj.metadata.uid = Some(generate_uid());
        obj.metadata.creation_timestamp = Some(OffsetDateTime::now_utc());
        obj.metadata.generation = 1;
        if dry_run {
            return Ok(obj);
        }

        obj.metadata.resource_version = Some(self.next_version());
        self.data.pin().insert(obj.metadata.name.clone(), obj.clone());

        debug!(
            backend = self.backend_name,
            resource = %self.resource,
            name = %obj.metadata.name,
            resource_version = ?obj.metadata.resource_version,
            "object created"
        );
        self.broadcaster.send_added(obj.clone());
        Ok(obj)
    }
}

fn run_validation(
    validation: Option<&ValidateObjectFn>,
    object: &ResourceObject,
) -> Result<(), StorageError> {
    match validation {
        Some(validate) => validate(object),
        None => Ok(()),
    }
}

fn actual_version(object: &ResourceObject) -> String {
    object.resource_version().unwrap_or_default().to_string()
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn get(
        &self,
        _ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<ResourceObject, StorageError> {
        let obj = self.lookup(name)?;

        // Only the latest version is kept.
        if let Some(requested) = options.resource_version.as_deref()
            && requested != ANY_RESOURCE_VERSION
            && obj.resource_version() != Some(requested)
        {
            return Err(StorageError::version_conflict(requested, actual_version(&obj)));
        }
        Ok(obj)
    }

    fn backend_name(&self) -> &'static str {
        self.backend_name
    }
}

#[async_trait]
impl Creater for InMemoryStorage {
    async fn create(
        &self,
        _ctx: &RequestContext,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &CreateOptions,
    ) -> Result<ResourceObject, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.insert_new(object, validation, options.dry_run)
    }
}

#[async_trait]
impl Updater for InMemoryStorage {
    async fn update(
        &self,
        _ctx: &RequestContext,
        name: &str,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &UpdateOptions,
    ) -> Result<ResourceObject, StorageError> {
        if !object.name().is_empty() && object.name() != name {
            return Err(StorageError::invalid_resource(format!(
                "the name of the object ({}) does not match the name on the URL ({name})",
                object.name()
            )));
        }

        let _guard = self.write_lock.lock().await;
        let current = match self.lookup(name) {
            Ok(current) => current,
            Err(err) if err.is_not_found() && options.allow_create => {
                if object.resource_version().is_some() {
                    return Err(err);
                }
                let mut new_object = object.clone();
                new_object.metadata.name = name.to_string();
                return self.insert_new(&new_object, validation, options.dry_run);
            }
            Err(err) => return Err(err),
        };

        if let Some(expected) = object.resource_version()
            && current.resource_version() != Some(expected)
        {
            return Err(StorageError::version_conflict(expected, actual_version(&current)));
        }

        let mut updated = object.clone();
        updated.metadata.name = name.to_string();
        updated.metadata.uid = current.metadata.uid.clone();
        updated.metadata.creation_timestamp = current.metadata.creation_timestamp;
        updated.metadata.generation = if updated.spec == current.spec {
            current.metadata.generation
        } else {
            current.metadata.generation + 1
        };
        updated.metadata.resource_version = current.metadata.resource_version.clone();
        run_validation(validation, &updated)?;
        if options.dry_run {
            return Ok(updated);
        }

        updated.metadata.resource_version = Some(self.next_version());
        self.data.pin().insert(name.to_string(), updated.clone());

        debug!(
            backend = self.backend_name,
            resource = %self.resource,
            name,
            resource_version = ?updated.metadata.resource_version,
            "object updated"
        );
        self.broadcaster.send_modified(updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl Deleter for InMemoryStorage {
    async fn delete(
        &self,
        _ctx: &RequestContext,
        name: &str,
        validation: Option<&ValidateObjectFn>,
        options: &DeleteOptions,
    ) -> Result<ResourceObject, StorageError> {
        let _guard = self.write_lock.lock().await;
        let current = self.lookup(name)?;

        if let Some(preconditions) = &options.preconditions {
            if let Some(expected) = preconditions.resource_version.as_deref()
                && current.resource_version() != Some(expected)
            {
                return Err(StorageError::version_conflict(expected, actual_version(&current)));
            }
            if let Some(expected) = preconditions.uid.as_deref()
                && current.metadata.uid.as_deref() != Some(expected)
            {
                return Err(StorageError::version_conflict(
                    expected,
                    current.metadata.uid.clone().unwrap_or_default(),
                ));
            }
        }
        run_validation(validation, &current)?;
        if options.dry_run {
            return Ok(current);
        }

        self.data.pin().remove(name);
        // Deletions advance the store version too, so list versions stay monotonic.
        let _ = self.next_version();

        debug!(
            backend = self.backend_name,
            resource = %self.resource,
            name,
            "object deleted"
        );
        self.broadcaster.send_deleted(current.clone());
        Ok(current)
    }
}

#[async_trait]
impl Lister for InMemoryStorage {
    async fn list(
        &self,
        _ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<ObjectList, StorageError> {
        let mut items: Vec<ResourceObject> = {
            let guard = self.data.pin();
            guard
                .iter()
                .map(|(_, obj)| obj)
                .filter(|obj| obj.matches_labels(&options.label_selector))
                .cloned()
                .collect()
        };
        items.sort_by(|a, b| a.name().cmp(b.name()));

        if let Some(token) = options.continue_token.as_deref() {
            items.retain(|obj| obj.name() > token);
        }

        let continue_token = match options.limit {
            Some(limit) if limit > 0 && items.len() > limit => {
                items.truncate(limit);
                items.last().map(|obj| obj.name().to_string())
            }
            _ => None,
        };

        Ok(ObjectList {
            items,
            resource_version: self.current_resource_version().to_string(),
            continue_token,
        })
    }
}

#[async_trait]
impl Watcher for InMemoryStorage {
    async fn watch(
        &self,
        _ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StorageError> {
        debug!(
            backend = self.backend_name,
            resource = %self.resource,
            "watch started"
        );
        Ok(WatchStream::new(
            self.broadcaster.subscribe(),
            options.label_selector.clone(),
        ))
    }
}

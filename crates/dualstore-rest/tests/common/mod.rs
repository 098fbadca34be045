//! Shared fixtures for dual writer tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dualstore_core::ResourceObject;
use dualstore_db_memory::InMemoryStorage;
use dualstore_rest::{DualWriter, DualWriterMode, MirrorOutcome, MirrorReport, MirrorSink};
use dualstore_storage::{
    CreateOptions, Creater, DeleteOptions, Deleter, GetOptions, ListOptions, Lister, ObjectList,
    ObjectStorage, Operation, RequestContext, StorageError, StorageHandle, UpdateOptions, Updater,
    ValidateObjectFn, WatchStream, Watcher,
};
use serde_json::json;

pub const RESOURCE: &str = "playlists";

/// An in-memory store that counts calls per operation and can be told to
/// fail them.
#[derive(Debug)]
pub struct InstrumentedStorage {
    inner: InMemoryStorage,
    calls: [AtomicUsize; 6],
    faults: [AtomicBool; 6],
}

impl InstrumentedStorage {
    pub fn new(backend_name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStorage::with_backend_name(RESOURCE, backend_name),
            calls: Default::default(),
            faults: Default::default(),
        })
    }

    pub fn handle(self: &Arc<Self>) -> StorageHandle {
        StorageHandle::full(self.clone())
    }

    /// Number of times `operation` was actually executed.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        Operation::ALL.into_iter().map(|op| self.calls(op)).sum()
    }

    pub fn fail(&self, operation: Operation) {
        self.faults[operation.index()].store(true, Ordering::SeqCst);
    }

    pub fn heal(&self, operation: Operation) {
        self.faults[operation.index()].store(false, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryStorage {
        &self.inner
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Reads straight from the wrapped store without counting the call.
    pub async fn peek(&self, name: &str) -> Option<ResourceObject> {
        self.inner
            .get(&RequestContext::background(), name, &GetOptions::default())
            .await
            .ok()
    }

    fn enter(&self, operation: Operation) -> Result<(), StorageError> {
        self.calls[operation.index()].fetch_add(1, Ordering::SeqCst);
        if self.faults[operation.index()].load(Ordering::SeqCst) {
            return Err(StorageError::connection_error(format!(
                "{} unavailable for {operation}",
                self.inner.backend_name()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for InstrumentedStorage {
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<ResourceObject, StorageError> {
        self.enter(Operation::Get)?;
        self.inner.get(ctx, name, options).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[async_trait]
impl Creater for InstrumentedStorage {
    async fn create(
        &self,
        ctx: &RequestContext,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &CreateOptions,
    ) -> Result<ResourceObject, StorageError> {
        self.enter(Operation::Create)?;
        self.inner.create(ctx, object, validation, options).await
    }
}

#[async_trait]
impl Updater for InstrumentedStorage {
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &UpdateOptions,
    ) -> Result<ResourceObject, StorageError> {
        self.enter(Operation::Update)?;
        self.inner
            .update(ctx, name, object, validation, options)
            .await
    }
}

#[async_trait]
impl Deleter for InstrumentedStorage {
    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        validation: Option<&ValidateObjectFn>,
        options: &DeleteOptions,
    ) -> Result<ResourceObject, StorageError> {
        self.enter(Operation::Delete)?;
        self.inner.delete(ctx, name, validation, options).await
    }
}

#[async_trait]
impl Lister for InstrumentedStorage {
    async fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<ObjectList, StorageError> {
        self.enter(Operation::List)?;
        self.inner.list(ctx, options).await
    }
}

#[async_trait]
impl Watcher for InstrumentedStorage {
    async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StorageError> {
        self.enter(Operation::Watch)?;
        self.inner.watch(ctx, options).await
    }
}

/// Keeps every mirror report it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<MirrorReport>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<MirrorReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<MirrorReport> {
        self.reports()
            .into_iter()
            .filter(|r| r.outcome.is_failure())
            .collect()
    }

    pub fn mirrored(&self) -> usize {
        self.reports()
            .iter()
            .filter(|r| matches!(r.outcome, MirrorOutcome::Mirrored))
            .count()
    }
}

impl MirrorSink for RecordingSink {
    fn record(&self, report: &MirrorReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// A dual writer over two fresh instrumented stores.
pub struct Fixture {
    pub legacy: Arc<InstrumentedStorage>,
    pub unified: Arc<InstrumentedStorage>,
    pub sink: Arc<RecordingSink>,
    pub writer: DualWriter,
}

impl Fixture {
    pub fn new(mode: DualWriterMode) -> Self {
        Self::with_handles(mode, |legacy| legacy, |unified| unified)
    }

    /// Lets a test narrow either store's capabilities before the writer is built.
    pub fn with_handles(
        mode: DualWriterMode,
        legacy_handle: impl FnOnce(StorageHandle) -> StorageHandle,
        unified_handle: impl FnOnce(StorageHandle) -> StorageHandle,
    ) -> Self {
        let legacy = InstrumentedStorage::new("legacy");
        let unified = InstrumentedStorage::new("unified");
        let sink = RecordingSink::new();
        let writer = DualWriter::new(
            mode,
            legacy_handle(legacy.handle()),
            unified_handle(unified.handle()),
        )
        .with_resource(RESOURCE)
        .with_sink(sink.clone());

        Self {
            legacy,
            unified,
            sink,
            writer,
        }
    }

    pub fn ctx(&self) -> RequestContext {
        RequestContext::background().with_request_id("test-request")
    }
}

pub fn playlist(name: &str) -> ResourceObject {
    ResourceObject::new(name, json!({"title": name, "interval": "5m", "items": []}))
}

//! The dual writer: one storage facade over a legacy and a unified store.
//!
//! Every call is routed by the writer's [`ModePolicy`]. Writes go to the
//! authoritative store first; only when that succeeds is the same change
//! mirrored to the other store. Reads are answered by a single store and are
//! never mirrored.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dualstore_core::ResourceObject;
use dualstore_storage::{
    CreateOptions, Creater, DeleteOptions, Deleter, GetOptions, ListOptions, Lister, ObjectList,
    ObjectStorage, Operation, RequestContext, StorageError, StorageHandle, UpdateOptions, Updater,
    ValidateObjectFn, WatchStream, Watcher,
};
use tracing::{error, warn};

use crate::mirror::{self, MirrorOutcome, MirrorReport, MirrorSink, TracingMirrorSink, try_mirror};
use crate::mode::{Backend, DualWriterMode, MirrorTarget, ModePolicy, Route};

const UNKNOWN_RESOURCE: &str = "unknown";

/// A store that cannot serve an operation its mode routes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGap {
    pub operation: Operation,
    pub backend: Backend,
    pub backend_name: &'static str,
}

impl fmt::Display for CapabilityGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} store '{}' does not support {}",
            self.backend, self.backend_name, self.operation
        )
    }
}

/// Routes storage calls between a legacy and a unified store.
///
/// `DualWriter` implements every storage capability trait itself, so it can
/// be wrapped in [`StorageHandle::full`] and used wherever a single store is
/// expected.
#[derive(Clone)]
pub struct DualWriter {
    policy: ModePolicy,
    legacy: StorageHandle,
    unified: StorageHandle,
    resource: String,
    sink: Arc<dyn MirrorSink>,
    gaps: Vec<CapabilityGap>,
}

impl DualWriter {
    /// Builds a writer, logging a warning for every capability gap.
    ///
    /// Calls to an operation with a gap fail with a configuration error
    /// before any store is touched.
    pub fn new(mode: DualWriterMode, legacy: StorageHandle, unified: StorageHandle) -> Self {
        let policy = ModePolicy::for_mode(mode);
        let gaps = capability_gaps(&policy, &legacy, &unified);
        for gap in &gaps {
            warn!(mode = %mode, gap = %gap, "dual writer capability gap");
        }

        Self {
            policy,
            legacy,
            unified,
            resource: UNKNOWN_RESOURCE.to_string(),
            sink: Arc::new(TracingMirrorSink::new()),
            gaps,
        }
    }

    /// Builds a writer, rejecting any capability gap.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` listing every gap.
    pub fn try_new(
        mode: DualWriterMode,
        legacy: StorageHandle,
        unified: StorageHandle,
    ) -> Result<Self, StorageError> {
        let policy = ModePolicy::for_mode(mode);
        let gaps = capability_gaps(&policy, &legacy, &unified);
        let writer = Self {
            policy,
            legacy,
            unified,
            resource: UNKNOWN_RESOURCE.to_string(),
            sink: Arc::new(TracingMirrorSink::new()),
            gaps,
        };
        writer.validate()?;
        Ok(writer)
    }

    /// Sets the resource name used in logs and mirror reports.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MirrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn mode(&self) -> DualWriterMode {
        self.policy.mode()
    }

    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn legacy(&self) -> &StorageHandle {
        &self.legacy
    }

    pub fn unified(&self) -> &StorageHandle {
        &self.unified
    }

    pub fn capability_gaps(&self) -> &[CapabilityGap] {
        &self.gaps
    }

    /// Fails when any operation routes to a store that cannot serve it.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.gaps.is_empty() {
            return Ok(());
        }
        let gaps: Vec<String> = self.gaps.iter().map(ToString::to_string).collect();
        Err(StorageError::configuration(format!(
            "dual writer mode {} for '{}': {}",
            self.mode(),
            self.resource,
            gaps.join("; ")
        )))
    }

    fn handle(&self, backend: Backend) -> &StorageHandle {
        match backend {
            Backend::Legacy => &self.legacy,
            Backend::Unified => &self.unified,
        }
    }

    /// Looks up the route for `operation`, failing on a capability gap.
    fn route(&self, operation: Operation) -> Result<Route, StorageError> {
        match self.gaps.iter().find(|gap| gap.operation == operation) {
            Some(gap) => Err(StorageError::configuration(gap.to_string())),
            None => Ok(self.policy.route(operation)),
        }
    }

    fn unsupported(&self, operation: Operation, backend: Backend) -> StorageError {
        StorageError::configuration(
            CapabilityGap {
                operation,
                backend,
                backend_name: self.handle(backend).backend_name(),
            }
            .to_string(),
        )
    }

    fn creater(&self, backend: Backend) -> Result<&dyn Creater, StorageError> {
        self.handle(backend)
            .creater()
            .ok_or_else(|| self.unsupported(Operation::Create, backend))
    }

    fn updater(&self, backend: Backend) -> Result<&dyn Updater, StorageError> {
        self.handle(backend)
            .updater()
            .ok_or_else(|| self.unsupported(Operation::Update, backend))
    }

    fn deleter(&self, backend: Backend) -> Result<&dyn Deleter, StorageError> {
        self.handle(backend)
            .deleter()
            .ok_or_else(|| self.unsupported(Operation::Delete, backend))
    }

    fn lister(&self, backend: Backend) -> Result<&dyn Lister, StorageError> {
        self.handle(backend)
            .lister()
            .ok_or_else(|| self.unsupported(Operation::List, backend))
    }

    fn watcher(&self, backend: Backend) -> Result<&dyn Watcher, StorageError> {
        self.handle(backend)
            .watcher()
            .ok_or_else(|| self.unsupported(Operation::Watch, backend))
    }

    fn log_authoritative_failure(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        backend: Backend,
        name: &str,
        err: &StorageError,
    ) {
        error!(
            mode = %self.mode(),
            operation = %operation,
            backend = %backend,
            resource = %self.resource,
            name = %name,
            request_id = %ctx.request_id(),
            error = %err,
            "authoritative storage call failed"
        );
    }

    fn settle(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        target: MirrorTarget,
        name: &str,
        outcome: MirrorOutcome,
    ) -> Result<(), StorageError> {
        mirror::settle(
            self.sink.as_ref(),
            MirrorReport {
                mode: self.mode(),
                operation,
                backend: target.backend,
                policy: target.policy,
                resource: self.resource.clone(),
                name: name.to_string(),
                request_id: ctx.request_id().to_string(),
                outcome,
            },
        )
    }
}

fn capability_gaps(
    policy: &ModePolicy,
    legacy: &StorageHandle,
    unified: &StorageHandle,
) -> Vec<CapabilityGap> {
    Operation::ALL
        .into_iter()
        .flat_map(|op| policy.participants(op).map(move |backend| (op, backend)))
        .filter_map(|(operation, backend)| {
            let handle = match backend {
                Backend::Legacy => legacy,
                Backend::Unified => unified,
            };
            (!handle.capabilities().supports(operation)).then(|| CapabilityGap {
                operation,
                backend,
                backend_name: handle.backend_name(),
            })
        })
        .collect()
}

impl fmt::Debug for DualWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualWriter")
            .field("mode", &self.mode())
            .field("resource", &self.resource)
            .field("legacy", &self.legacy)
            .field("unified", &self.unified)
            .field("gaps", &self.gaps.len())
            .finish()
    }
}

#[async_trait]
impl ObjectStorage for DualWriter {
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<ResourceObject, StorageError> {
        let route = self.route(Operation::Get)?;
        self.handle(route.authoritative)
            .storage()
            .get(ctx, name, options)
            .await
    }

    fn backend_name(&self) -> &'static str {
        "dualwriter"
    }
}

#[async_trait]
impl Creater for DualWriter {
    async fn create(
        &self,
        ctx: &RequestContext,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &CreateOptions,
    ) -> Result<ResourceObject, StorageError> {
        let route = self.route(Operation::Create)?;

        let created = self
            .creater(route.authoritative)?
            .create(ctx, object, validation, options)
            .await
            .inspect_err(|err| {
                self.log_authoritative_failure(
                    ctx,
                    Operation::Create,
                    route.authoritative,
                    object.name(),
                    err,
                );
            })?;

        if let Some(target) = route.mirror {
            let store = self.creater(target.backend)?;
            let payload = created.clone().strip_server_fields();
            let outcome = try_mirror(
                ctx,
                options.dry_run,
                store.create(ctx, &payload, validation, options),
            )
            .await;
            self.settle(ctx, Operation::Create, target, created.name(), outcome)?;
        }

        Ok(created)
    }
}

#[async_trait]
impl Updater for DualWriter {
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        object: &ResourceObject,
        validation: Option<&ValidateObjectFn>,
        options: &UpdateOptions,
    ) -> Result<ResourceObject, StorageError> {
        let route = self.route(Operation::Update)?;

        let updated = self
            .updater(route.authoritative)?
            .update(ctx, name, object, validation, options)
            .await
            .inspect_err(|err| {
                self.log_authoritative_failure(ctx, Operation::Update, route.authoritative, name, err);
            })?;

        if let Some(target) = route.mirror {
            let store = self.updater(target.backend)?;
            let payload = updated.clone().strip_server_fields();
            // The mirror may never have seen the object.
            let mirror_options = UpdateOptions {
                dry_run: options.dry_run,
                allow_create: true,
            };
            let outcome = try_mirror(
                ctx,
                options.dry_run,
                store.update(ctx, name, &payload, validation, &mirror_options),
            )
            .await;
            self.settle(ctx, Operation::Update, target, name, outcome)?;
        }

        Ok(updated)
    }
}

#[async_trait]
impl Deleter for DualWriter {
    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        validation: Option<&ValidateObjectFn>,
        options: &DeleteOptions,
    ) -> Result<ResourceObject, StorageError> {
        let route = self.route(Operation::Delete)?;

        let deleted = self
            .deleter(route.authoritative)?
            .delete(ctx, name, validation, options)
            .await
            .inspect_err(|err| {
                self.log_authoritative_failure(ctx, Operation::Delete, route.authoritative, name, err);
            })?;

        if let Some(target) = route.mirror {
            let store = self.deleter(target.backend)?;
            // Preconditions were checked against the authoritative copy.
            let mirror_options = DeleteOptions {
                dry_run: options.dry_run,
                preconditions: None,
            };
            let outcome = match try_mirror(
                ctx,
                options.dry_run,
                store.delete(ctx, name, None, &mirror_options),
            )
            .await
            {
                MirrorOutcome::Failed(err) if err.is_not_found() => MirrorOutcome::Mirrored,
                outcome => outcome,
            };
            self.settle(ctx, Operation::Delete, target, name, outcome)?;
        }

        Ok(deleted)
    }
}

#[async_trait]
impl Lister for DualWriter {
    async fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<ObjectList, StorageError> {
        let route = self.route(Operation::List)?;
        self.lister(route.authoritative)?.list(ctx, options).await
    }
}

#[async_trait]
impl Watcher for DualWriter {
    async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StorageError> {
        let route = self.route(Operation::Watch)?;
        self.watcher(route.authoritative)?.watch(ctx, options).await
    }
}

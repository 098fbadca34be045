//! Capability descriptors and store handles.
//!
//! A [`StorageHandle`] bundles a store's mandatory read access with the
//! optional write/list/watch capabilities it was registered with. The
//! resulting [`Capabilities`] are known as soon as the handle is built, so a
//! consumer can validate its requirements at startup.

use std::fmt;
use std::sync::Arc;

use crate::traits::{Creater, Deleter, Lister, ObjectStorage, Updater, Watcher};

/// An operation of the object-storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
    List,
    Watch,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Get,
        Operation::Update,
        Operation::Delete,
        Operation::List,
        Operation::Watch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Watch => "watch",
        }
    }

    /// Returns true for operations that change stored state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Delete
        )
    }

    /// Position of the operation in [`Operation::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of optional operations a store supports. `get` is always supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub list: bool,
    pub watch: bool,
}

impl Capabilities {
    pub const READ_ONLY: Capabilities = Capabilities {
        create: false,
        update: false,
        delete: false,
        list: false,
        watch: false,
    };

    pub const ALL: Capabilities = Capabilities {
        create: true,
        update: true,
        delete: true,
        list: true,
        watch: true,
    };

    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Get => true,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
            Operation::List => self.list,
            Operation::Watch => self.watch,
        }
    }

    /// Returns the operations from `required` this store does not support.
    pub fn missing(&self, required: impl IntoIterator<Item = Operation>) -> Vec<Operation> {
        required
            .into_iter()
            .filter(|op| !self.supports(*op))
            .collect()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let supported: Vec<&str> = Operation::ALL
            .iter()
            .filter(|op| self.supports(**op))
            .map(Operation::as_str)
            .collect();
        f.write_str(&supported.join(","))
    }
}

/// A handle to one storage backend and the capabilities it was registered with.
#[derive(Clone)]
pub struct StorageHandle {
    storage: Arc<dyn ObjectStorage>,
    creater: Option<Arc<dyn Creater>>,
    updater: Option<Arc<dyn Updater>>,
    deleter: Option<Arc<dyn Deleter>>,
    lister: Option<Arc<dyn Lister>>,
    watcher: Option<Arc<dyn Watcher>>,
}

impl StorageHandle {
    /// A read-only handle: only `get` is available.
    pub fn new<S: ObjectStorage + 'static>(storage: Arc<S>) -> Self {
        let storage: Arc<dyn ObjectStorage> = storage;
        Self {
            storage,
            creater: None,
            updater: None,
            deleter: None,
            lister: None,
            watcher: None,
        }
    }

    /// A handle exposing every capability of a store that implements them all.
    pub fn full<S>(storage: Arc<S>) -> Self
    where
        S: ObjectStorage + Creater + Updater + Deleter + Lister + Watcher + 'static,
    {
        Self::new(storage.clone())
            .with_creater(storage.clone())
            .with_updater(storage.clone())
            .with_deleter(storage.clone())
            .with_lister(storage.clone())
            .with_watcher(storage)
    }

    pub fn with_creater<C: Creater + 'static>(mut self, creater: Arc<C>) -> Self {
        let creater: Arc<dyn Creater> = creater;
        self.creater = Some(creater);
        self
    }

    pub fn with_updater<U: Updater + 'static>(mut self, updater: Arc<U>) -> Self {
        let updater: Arc<dyn Updater> = updater;
        self.updater = Some(updater);
        self
    }

    pub fn with_deleter<D: Deleter + 'static>(mut self, deleter: Arc<D>) -> Self {
        let deleter: Arc<dyn Deleter> = deleter;
        self.deleter = Some(deleter);
        self
    }

    pub fn with_lister<L: Lister + 'static>(mut self, lister: Arc<L>) -> Self {
        let lister: Arc<dyn Lister> = lister;
        self.lister = Some(lister);
        self
    }

    pub fn with_watcher<W: Watcher + 'static>(mut self, watcher: Arc<W>) -> Self {
        let watcher: Arc<dyn Watcher> = watcher;
        self.watcher = Some(watcher);
        self
    }

    /// Drops a capability from the handle. `get` cannot be removed.
    pub fn without(mut self, operation: Operation) -> Self {
        match operation {
            Operation::Get => {}
            Operation::Create => self.creater = None,
            Operation::Update => self.updater = None,
            Operation::Delete => self.deleter = None,
            Operation::List => self.lister = None,
            Operation::Watch => self.watcher = None,
        }
        self
    }

    pub fn storage(&self) -> &dyn ObjectStorage {
        self.storage.as_ref()
    }

    pub fn creater(&self) -> Option<&dyn Creater> {
        self.creater.as_deref()
    }

    pub fn updater(&self) -> Option<&dyn Updater> {
        self.updater.as_deref()
    }

    pub fn deleter(&self) -> Option<&dyn Deleter> {
        self.deleter.as_deref()
    }

    pub fn lister(&self) -> Option<&dyn Lister> {
        self.lister.as_deref()
    }

    pub fn watcher(&self) -> Option<&dyn Watcher> {
        self.watcher.as_deref()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            create: self.creater.is_some(),
            update: self.updater.is_some(),
            delete: self.deleter.is_some(),
            list: self.lister.is_some(),
            watch: self.watcher.is_some(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }
}

impl fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageHandle")
            .field("backend", &self.backend_name())
            .field("capabilities", &self.capabilities().to_string())
            .finish()
    }
}

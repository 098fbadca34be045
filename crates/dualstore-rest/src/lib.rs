//! # dualstore-rest
//!
//! Dual-write routing for migrating a resource from a legacy store to a
//! unified store.
//!
//! A [`DualWriter`] sits in front of both stores and implements the same
//! storage traits they do. Its [`DualWriterMode`] decides, per operation,
//! which store answers the caller and which store receives a mirror copy of
//! every successful write. Moving a resource to the next migration phase is a
//! settings change; callers keep talking to the same handle.
//!
//! ## Example
//!
//! ```ignore
//! use dualstore_rest::{DualWriter, DualWriterMode};
//! use dualstore_storage::{CreateOptions, RequestContext, StorageHandle};
//!
//! let writer = DualWriter::try_new(DualWriterMode::Mode3, legacy, unified)?
//!     .with_resource("playlists");
//! let handle = StorageHandle::full(Arc::new(writer));
//!
//! let ctx = RequestContext::background().with_timeout(Duration::from_secs(5));
//! let created = handle
//!     .creater()
//!     .expect("dual writer supports create")
//!     .create(&ctx, &object, None, &CreateOptions::default())
//!     .await?;
//! ```
//!
//! Settings are usually loaded from `dualstore.toml`:
//!
//! ```toml
//! default_mode = 1
//! strict_capabilities = true
//!
//! [logging]
//! level = "info"
//!
//! [resources.playlists]
//! mode = 3
//! ```

pub mod dualwriter;
pub mod mirror;
pub mod mode;
pub mod observability;
pub mod settings;

pub use dualwriter::{CapabilityGap, DualWriter};
pub use mirror::{
    MirrorOutcome, MirrorReport, MirrorSink, MirrorStats, MirrorStatsSnapshot, SkipReason,
    TracingMirrorSink, try_mirror,
};
pub use mode::{
    Backend, DualWriterMode, InvalidModeError, MirrorPolicy, MirrorTarget, ModePolicy, Route,
};
pub use settings::loader::load_settings;
pub use settings::{DualWriterSettings, LoggingConfig, ResourceSettings, SettingsError};

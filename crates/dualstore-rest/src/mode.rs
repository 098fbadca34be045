//! Migration modes and their per-operation routing tables.
//!
//! | Mode | Reads   | Write authority | Write mirror          |
//! |------|---------|-----------------|-----------------------|
//! | 0    | legacy  | legacy          | -                     |
//! | 1    | legacy  | legacy          | unified (best effort) |
//! | 2    | legacy  | legacy          | unified (required)    |
//! | 3    | unified | unified         | legacy (best effort)  |
//! | 4    | unified | unified         | -                     |

use std::fmt;
use std::str::FromStr;

use dualstore_storage::Operation;
use serde::{Deserialize, Serialize};

/// Phase of a migration from the legacy store to the unified store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum DualWriterMode {
    /// Legacy store only.
    #[default]
    Mode0,
    /// Legacy authoritative, unified kept warm on a best-effort basis.
    Mode1,
    /// Legacy authoritative for reads, both stores must accept every write.
    Mode2,
    /// Unified authoritative, legacy kept warm for rollback.
    Mode3,
    /// Unified store only.
    Mode4,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid dual writer mode '{0}', expected 0..=4")]
pub struct InvalidModeError(pub String);

impl DualWriterMode {
    pub const ALL: [DualWriterMode; 5] = [
        DualWriterMode::Mode0,
        DualWriterMode::Mode1,
        DualWriterMode::Mode2,
        DualWriterMode::Mode3,
        DualWriterMode::Mode4,
    ];

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for DualWriterMode {
    type Error = InvalidModeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| InvalidModeError(value.to_string()))
    }
}

impl From<DualWriterMode> for u8 {
    fn from(mode: DualWriterMode) -> Self {
        mode.as_u8()
    }
}

impl FromStr for DualWriterMode {
    type Err = InvalidModeError;

    /// Accepts `3` as well as `mode3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("mode").unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .map_err(|_| InvalidModeError(s.to_string()))
            .and_then(|n| Self::try_from(n).map_err(|_| InvalidModeError(s.to_string())))
    }
}

impl fmt::Display for DualWriterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// One of the two stores behind a dual writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Legacy,
    Unified,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Legacy => "legacy",
            Backend::Unified => "unified",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a failed mirror write is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorPolicy {
    /// Recorded, never returned to the caller.
    BestEffort,
    /// Recorded and returned to the caller.
    Required,
}

impl fmt::Display for MirrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorPolicy::BestEffort => write!(f, "best_effort"),
            MirrorPolicy::Required => write!(f, "required"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorTarget {
    pub backend: Backend,
    pub policy: MirrorPolicy,
}

/// Where one operation goes.
///
/// The authoritative store answers the call; the mirror, if any, is written
/// only after the authoritative write succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub authoritative: Backend,
    pub mirror: Option<MirrorTarget>,
}

impl Route {
    const fn single(backend: Backend) -> Self {
        Self {
            authoritative: backend,
            mirror: None,
        }
    }

    const fn mirrored(authoritative: Backend, mirror: Backend, policy: MirrorPolicy) -> Self {
        Self {
            authoritative,
            mirror: Some(MirrorTarget {
                backend: mirror,
                policy,
            }),
        }
    }

    /// Stores touched by this route, authoritative first.
    pub fn participants(&self) -> impl Iterator<Item = Backend> + use<> {
        let mirror = self.mirror.map(|m| m.backend);
        std::iter::once(self.authoritative).chain(mirror)
    }
}

/// The routing table of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    mode: DualWriterMode,
    /// Indexed by `Operation::index()`.
    routes: [Route; 6],
}

impl ModePolicy {
    pub const fn for_mode(mode: DualWriterMode) -> Self {
        use Backend::{Legacy, Unified};
        use MirrorPolicy::{BestEffort, Required};

        let (reads, writes) = match mode {
            DualWriterMode::Mode0 => (Legacy, Route::single(Legacy)),
            DualWriterMode::Mode1 => (Legacy, Route::mirrored(Legacy, Unified, BestEffort)),
            DualWriterMode::Mode2 => (Legacy, Route::mirrored(Legacy, Unified, Required)),
            DualWriterMode::Mode3 => (Unified, Route::mirrored(Unified, Legacy, BestEffort)),
            DualWriterMode::Mode4 => (Unified, Route::single(Unified)),
        };
        let read = Route::single(reads);

        // Same order as Operation::ALL: create, get, update, delete, list, watch.
        Self {
            mode,
            routes: [writes, read, writes, writes, read, read],
        }
    }

    pub fn mode(&self) -> DualWriterMode {
        self.mode
    }

    pub fn route(&self, operation: Operation) -> Route {
        self.routes[operation.index()]
    }

    pub fn participants(&self, operation: Operation) -> impl Iterator<Item = Backend> + use<> {
        self.route(operation).participants()
    }
}

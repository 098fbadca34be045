use std::collections::BTreeMap;
use std::sync::Arc;

use dualstore_storage::{StorageError, StorageHandle};
use serde::{Deserialize, Serialize};

use crate::dualwriter::DualWriter;
use crate::mirror::MirrorSink;
use crate::mode::DualWriterMode;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings build error: {0}")]
    Build(#[from] ::config::ConfigError),

    #[error("settings parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid settings: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualWriterSettings {
    /// Mode for resources without an entry in `resources`.
    #[serde(default)]
    pub default_mode: DualWriterMode,
    /// Reject stores that cannot serve every operation their mode routes to
    /// them, instead of failing those calls at runtime.
    #[serde(default = "default_strict_capabilities")]
    pub strict_capabilities: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSettings>,
}

fn default_strict_capabilities() -> bool {
    true
}

impl Default for DualWriterSettings {
    fn default() -> Self {
        Self {
            default_mode: DualWriterMode::default(),
            strict_capabilities: default_strict_capabilities(),
            logging: LoggingConfig::default(),
            resources: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSettings {
    pub mode: DualWriterMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DualWriterSettings {
    /// Parses settings from TOML and validates them.
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(SettingsError::Validation(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join("/"),
                self.logging.level
            )));
        }
        if let Some(name) = self.resources.keys().find(|name| name.trim().is_empty()) {
            return Err(SettingsError::Validation(format!(
                "resource name must not be empty, got '{name}'"
            )));
        }
        Ok(())
    }

    /// The mode configured for `resource`, falling back to `default_mode`.
    pub fn mode_for(&self, resource: &str) -> DualWriterMode {
        self.resources
            .get(resource)
            .map(|r| r.mode)
            .unwrap_or(self.default_mode)
    }

    /// Builds the dual writer for `resource` in its configured mode.
    ///
    /// With `strict_capabilities` any capability gap is an error; otherwise
    /// gaps are logged and the affected operations fail when called.
    pub fn dual_writer(
        &self,
        resource: &str,
        legacy: StorageHandle,
        unified: StorageHandle,
    ) -> Result<DualWriter, StorageError> {
        let writer =
            DualWriter::new(self.mode_for(resource), legacy, unified).with_resource(resource);
        if self.strict_capabilities {
            writer.validate()?;
        }
        Ok(writer)
    }

    /// Like [`dual_writer`](Self::dual_writer) with a custom mirror sink.
    pub fn dual_writer_with_sink(
        &self,
        resource: &str,
        legacy: StorageHandle,
        unified: StorageHandle,
        sink: Arc<dyn MirrorSink>,
    ) -> Result<DualWriter, StorageError> {
        self.dual_writer(resource, legacy, unified)
            .map(|writer| writer.with_sink(sink))
    }
}

pub mod loader {
    use super::{DualWriterSettings, SettingsError};
    use ::config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads settings from an optional TOML file plus environment overrides.
    ///
    /// Without `path`, `dualstore.toml` in the working directory is used if
    /// present. Environment variables override the file, e.g.
    /// `DUALSTORE__RESOURCES__PLAYLISTS__MODE=3`.
    pub fn load_settings(path: Option<&str>) -> Result<DualWriterSettings, SettingsError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or("dualstore.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            Environment::with_prefix("DUALSTORE")
                .try_parsing(true)
                .separator("__"),
        );

        let settings: DualWriterSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

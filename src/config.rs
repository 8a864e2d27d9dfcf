// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that Minus uses, along with the
//! logic to find, load, and store it for a given [`SettingsScope`].
//!
//! # General Layout
//!
//! ```toml
//! [sync]
//! primary_project = "~/Projects/Primary"
//! detect_local_only = false
//! missing_sentinel = "none"
//! request_timeout = 60
//! asset_prefix = "com.studio.assets"
//!
//! [clone]
//! allow_local_packages = false
//! folders = ["Assets/Art"]
//! ```
//!
//! Every key is optional.

use crate::path::{settings_path, ProjectLayout, SettingsScope};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, info, instrument};

const DEFAULT_MISSING_SENTINEL: &str = "none";
const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Settings layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct MinusSettings {
    /// Settings for comparison against primary project.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Settings for creation of new projects.
    #[serde(default)]
    pub clone: CloneSettings,
}

impl MinusSettings {
    /// Load settings of project.
    ///
    /// Prefers project scoped settings over user scoped settings. Falls back
    /// to default settings if neither exists.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if settings file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if settings are malformed.
    /// - Return [`ConfigError::NoWayHome`] if user configuration directory
    ///   cannot be determined.
    pub fn load(project: &ProjectLayout) -> Result<Self> {
        for scope in [SettingsScope::Project, SettingsScope::User] {
            if let Some(settings) = Self::load_scope(scope, project)? {
                return Ok(settings);
            }
        }

        debug!("no settings found, use defaults");
        Ok(Self::default())
    }

    /// Load settings of a specific scope.
    ///
    /// Returns [`None`] if no settings file exists for the scope.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if settings file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if settings are malformed.
    /// - Return [`ConfigError::NoWayHome`] if user configuration directory
    ///   cannot be determined.
    #[instrument(skip(project), level = "debug")]
    pub fn load_scope(scope: SettingsScope, project: &ProjectLayout) -> Result<Option<Self>> {
        let path = settings_path(scope, project)?;
        match read_to_string(&path) {
            Ok(data) => {
                debug!("load settings from {:?}", path.display());
                Ok(Some(data.parse()?))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ConfigError::Read {
                source: err,
                settings_path: path,
            }),
        }
    }

    /// Store settings for given scope.
    ///
    /// Creates parent directories of settings file if needed.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Write`] if settings file cannot be written.
    /// - Return [`ConfigError::Serialize`] if settings cannot be serialized.
    /// - Return [`ConfigError::NoWayHome`] if user configuration directory
    ///   cannot be determined.
    #[instrument(skip(self, project), level = "debug")]
    pub fn save(&self, scope: SettingsScope, project: &ProjectLayout) -> Result<PathBuf> {
        let path = settings_path(scope, project)?;
        let write_error = |err| ConfigError::Write {
            source: err,
            settings_path: path.clone(),
        };

        if let Some(parent) = path.parent() {
            mkdirp::mkdirp(parent).map_err(write_error)?;
        }

        let data = toml::ser::to_string_pretty(self)?;
        write(&path, data).map_err(write_error)?;
        info!("settings saved to {:?}", path.display());

        Ok(path)
    }

    /// Layout of configured primary project.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoPrimaryProject`] if no primary project is
    ///   configured.
    pub fn primary_project(&self) -> Result<ProjectLayout> {
        self.sync
            .primary_project
            .as_ref()
            .map(|path| ProjectLayout::new(path.as_path()))
            .ok_or(ConfigError::NoPrimaryProject)
    }

    /// Time to wait on package manager requests, at least one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout.max(1))
    }
}

impl FromStr for MinusSettings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: MinusSettings =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        if settings.sync.request_timeout == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        // INVARIANT: Perform shell expansion on primary project path.
        if let Some(path) = &settings.sync.primary_project {
            settings.sync.primary_project = Some(ProjectPath::new(
                shellexpand::full(path.to_string().as_str())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(settings)
    }
}

impl Display for MinusSettings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Settings for comparison against primary project.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Path to primary project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_project: Option<ProjectPath>,

    /// Classify packages referenced by file system path as local-only.
    #[serde(default)]
    pub detect_local_only: bool,

    /// Text shown in place of local version of missing packages.
    #[serde(default = "default_missing_sentinel")]
    pub missing_sentinel: String,

    /// Seconds to wait on package manager requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Package name prefix that marks asset packages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_prefix: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            primary_project: None,
            detect_local_only: false,
            missing_sentinel: default_missing_sentinel(),
            request_timeout: default_request_timeout(),
            asset_prefix: None,
        }
    }
}

fn default_missing_sentinel() -> String {
    DEFAULT_MISSING_SENTINEL.into()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

/// Settings for creation of new projects.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CloneSettings {
    /// Allow cloning projects that reference packages by file system path.
    #[serde(default)]
    pub allow_local_packages: bool,

    /// Extra folders to copy into new projects.
    #[serde(default)]
    pub folders: Vec<String>,
}

/// Path to a project root.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProjectPath(PathBuf);

impl ProjectPath {
    /// Construct new project path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat project path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for ProjectPath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Settings location cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Settings file cannot be read from.
    #[error("failed to read settings at {:?}", settings_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        settings_path: PathBuf,
    },

    /// Settings file cannot be written to.
    #[error("failed to write settings at {:?}", settings_path.display())]
    Write {
        #[source]
        source: std::io::Error,
        settings_path: PathBuf,
    },

    /// Package manager requests would time out right away.
    #[error("request_timeout must be at least one second")]
    ZeroRequestTimeout,

    /// No primary project configured.
    #[error("no primary project configured, use \"minus config set-primary <path>\"")]
    NoPrimaryProject,
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

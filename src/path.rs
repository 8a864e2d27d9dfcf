// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for project files that need to be
//! read, compared, or written in some way.
//!
//! # Project Layout
//!
//! ```text
//! <project>/
//! ├── Assets/
//! ├── Packages/
//! │   └── manifest.json
//! └── ProjectSettings/
//!     ├── *.asset
//!     └── Packages/com.machinmachines.minus/Settings.toml
//! ```

use std::path::{Path, PathBuf};

pub const ASSETS_DIR: &str = "Assets";
pub const PACKAGES_DIR: &str = "Packages";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const PROJECT_SETTINGS_DIR: &str = "ProjectSettings";
pub const SETTINGS_PACKAGE_NAME: &str = "com.machinmachines.minus";
pub const SETTINGS_FILE: &str = "Settings.toml";

/// Directory layout of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Construct new project layout rooted at `root`.
    ///
    /// Does not check if the project actually exists.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.packages_dir().join(MANIFEST_FILE)
    }

    pub fn settings_dir(&self) -> PathBuf {
        self.root.join(PROJECT_SETTINGS_DIR)
    }

    /// Path to a single file of the project settings directory.
    pub fn settings_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.settings_dir().join(name)
    }
}

/// Where settings get stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScope {
    /// Stored inside of the project, shared by everyone using it.
    #[default]
    Project,

    /// Stored in the user's configuration directory.
    User,
}

/// Determine absolute path to settings file of given scope.
///
/// Project scoped settings live at
/// `ProjectSettings/Packages/com.machinmachines.minus/Settings.toml` of the
/// project. User scoped settings live at `$XDG_CONFIG_HOME/minus/Settings.toml`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if user configuration directory cannot be
///   determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn settings_path(scope: SettingsScope, project: &ProjectLayout) -> Result<PathBuf> {
    match scope {
        SettingsScope::Project => Ok(project
            .settings_dir()
            .join(PACKAGES_DIR)
            .join(SETTINGS_PACKAGE_NAME)
            .join(SETTINGS_FILE)),
        SettingsScope::User => dirs::config_dir()
            .map(|path| path.join("minus").join(SETTINGS_FILE))
            .ok_or(NoWayHome),
    }
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

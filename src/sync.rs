// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Synchronization against primary project.
//!
//! The [`Synchronizer`] gathers the state of both projects, compares them,
//! and pulls mismatched packages or settings files over from the primary
//! project on request.
//!
//! # Synchronization Sequence
//!
//! 1. Read the manifest of the primary project.
//! 2. List packages of this project through the package manager.
//! 3. Hash the settings directory of the primary project.
//! 4. Hash the settings directory of this project.
//! 5. Compare packages, then settings.
//!
//! Any failure aborts the whole sequence. Nothing is compared on partial
//! state.

use crate::{
    catalog::{PackageCatalog, PackageIdentifier},
    compare::{compare_packages, compare_settings, PackageReport, SettingsReport},
    config::MinusSettings,
    hash::{hash_directory, FileChecksumMap, HashError},
    manifest::{read_error, ManifestError, ManifestParser},
    package_manager::{ClientError, ManifestPackageManager, PackageClient, PackageManager},
    path::ProjectLayout,
    prompt::{Confirmation, Outcome, PromptError},
};

use std::{fs::copy, path::PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, instrument, warn};

/// Gathered state of both projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub primary_packages: PackageCatalog,
    pub local_packages: PackageCatalog,
    pub primary_settings: FileChecksumMap,
    pub local_settings: FileChecksumMap,
    pub packages: PackageReport,
    pub settings: SettingsReport,
}

/// Result of a single package update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
    pub identifier: PackageIdentifier,
    pub status: UpdateStatus,
}

/// Status of a single package update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Package manager installed the primary version.
    Updated,

    /// User declined the update.
    Cancelled,

    /// Package manager failed the request.
    Failed(String),
}

/// Synchronize this project against a primary project.
#[derive(Debug)]
pub struct Synchronizer<M = ManifestPackageManager>
where
    M: PackageManager,
{
    local: ProjectLayout,
    primary: ProjectLayout,
    parser: ManifestParser,
    client: PackageClient<M>,
    detect_local_only: bool,
}

impl Synchronizer<ManifestPackageManager> {
    /// Construct new synchronizer from settings.
    ///
    /// Packages of this project are managed through its manifest.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Config`] if no primary project is configured.
    pub fn from_settings(local: ProjectLayout, settings: &MinusSettings) -> Result<Self> {
        let parser = ManifestParser::new().with_asset_prefix(settings.sync.asset_prefix.clone());
        let manager = ManifestPackageManager::new(local.manifest_path(), parser.clone());
        let client = PackageClient::new(manager, settings.request_timeout());

        Ok(Self::new(local, settings.primary_project()?, client, parser)
            .with_local_only_detection(settings.sync.detect_local_only))
    }
}

impl<M> Synchronizer<M>
where
    M: PackageManager,
{
    /// Construct new synchronizer.
    pub fn new(
        local: ProjectLayout,
        primary: ProjectLayout,
        client: PackageClient<M>,
        parser: ManifestParser,
    ) -> Self {
        Self {
            local,
            primary,
            parser,
            client,
            detect_local_only: false,
        }
    }

    /// Classify packages referenced by file system path as local-only.
    pub fn with_local_only_detection(mut self, detect_local_only: bool) -> Self {
        self.detect_local_only = detect_local_only;
        self
    }

    pub fn local(&self) -> &ProjectLayout {
        &self.local
    }

    pub fn primary(&self) -> &ProjectLayout {
        &self.primary
    }

    pub fn client(&self) -> &PackageClient<M> {
        &self.client
    }

    /// Gather and compare state of both projects.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Manifest`] if primary manifest cannot be read.
    /// - Return [`SyncError::Client`] if packages of this project cannot be
    ///   listed.
    /// - Return [`SyncError::Hash`] if either settings directory cannot be
    ///   hashed.
    #[instrument(skip(self), level = "debug")]
    pub async fn synchronize(&self) -> Result<SyncState> {
        info!(
            "synchronize {:?} against {:?}",
            self.local.root().display(),
            self.primary.root().display()
        );

        let manifest_path = self.primary.manifest_path();
        let manifest = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|err| read_error(err, &manifest_path))?;
        let primary_packages = self.parser.parse(&manifest);
        let local_packages = self.client.list().await?;
        let primary_settings = hash_in_background(self.primary.settings_dir()).await?;
        let local_settings = hash_in_background(self.local.settings_dir()).await?;

        let packages = compare_packages(&primary_packages, &local_packages, self.detect_local_only);
        let settings = compare_settings(&primary_settings, &local_settings);
        debug!(
            "{} packages mismatched, {} settings files mismatched",
            packages.mismatched().count(),
            settings.mismatched.len()
        );

        Ok(SyncState {
            primary_packages,
            local_packages,
            primary_settings,
            local_settings,
            packages,
            settings,
        })
    }

    /// Install primary version of mismatched packages.
    ///
    /// Only updates packages listed in `names`, or every mismatched package
    /// if `names` is empty. Each update is confirmed first. Package manager
    /// failures are reported per package, and do not stop the remaining
    /// updates.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::UnknownPackage`] if a listed package is not part
    ///   of the primary project.
    /// - Return [`SyncError::Prompt`] if user cannot be prompted.
    #[instrument(skip(self, state, names, confirm), level = "debug")]
    pub async fn update_packages(
        &self,
        state: &SyncState,
        names: &[String],
        confirm: &impl Confirmation,
    ) -> Result<Vec<PackageUpdate>> {
        if let Some(unknown) = names
            .iter()
            .find(|name| state.primary_packages.get(name).is_none())
        {
            return Err(SyncError::UnknownPackage(unknown.clone()));
        }

        let mut updates = Vec::new();
        for comparison in state.packages.mismatched() {
            let name = comparison.entry.name();
            if !names.is_empty() && !names.iter().any(|n| n == name) {
                continue;
            }

            let identifier = comparison.entry.identifier();
            let message = format!(
                "Do you really want to update the package {} to version {}?",
                identifier.name, identifier.version
            );
            if !confirm.confirm(&message)? {
                info!("update of {identifier} cancelled");
                updates.push(PackageUpdate {
                    identifier,
                    status: UpdateStatus::Cancelled,
                });
                continue;
            }

            let status = match self.client.add(&identifier).await {
                Ok(_) => UpdateStatus::Updated,
                Err(err) => {
                    warn!("failed to update {identifier}: {err}");
                    UpdateStatus::Failed(err.to_string())
                }
            };
            updates.push(PackageUpdate { identifier, status });
        }

        for name in names {
            if state.packages.valid().any(|c| c.entry.name() == name) {
                info!("package {name} already up to date");
            }
        }

        Ok(updates)
    }

    /// Copy primary version of mismatched settings files over local ones.
    ///
    /// Only updates files listed in `names`, or every mismatched file if
    /// `names` is empty. Each copy is confirmed first.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::UnknownSettingsFile`] if a listed file is not
    ///   part of the primary project.
    /// - Return [`SyncError::CopySettings`] if a file cannot be copied.
    /// - Return [`SyncError::Prompt`] if user cannot be prompted.
    #[instrument(skip(self, state, names, confirm), level = "debug")]
    pub fn update_setting_files(
        &self,
        state: &SyncState,
        names: &[String],
        confirm: &impl Confirmation,
    ) -> Result<Vec<(String, Outcome)>> {
        if let Some(unknown) = names
            .iter()
            .find(|name| !state.primary_settings.contains_key(name.as_str()))
        {
            return Err(SyncError::UnknownSettingsFile(unknown.clone()));
        }

        let mut outcomes = Vec::new();
        for name in &state.settings.mismatched {
            if !names.is_empty() && !names.contains(name) {
                continue;
            }

            if !confirm.confirm(&format!("Do you really want to update the file {name}?"))? {
                info!("update of {name} cancelled");
                outcomes.push((name.clone(), Outcome::Cancelled));
                continue;
            }

            let from = self.primary.settings_file(name);
            let to = self.local.settings_file(name);
            copy(&from, &to).map_err(|err| SyncError::CopySettings {
                source: err,
                from: from.clone(),
                to: to.clone(),
            })?;
            info!("copied {:?} to {:?}", from.display(), to.display());
            outcomes.push((name.clone(), Outcome::Done));
        }

        if outcomes.iter().any(|(_, outcome)| *outcome == Outcome::Done) {
            warn!("settings files changed, restart the editor to apply them");
        }

        Ok(outcomes)
    }
}

async fn hash_in_background(dir: PathBuf) -> Result<FileChecksumMap> {
    Ok(spawn_blocking(move || hash_directory(dir)).await??)
}

/// Synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Primary manifest cannot be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Settings directory cannot be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Package manager request fails.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Settings cannot be used.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// User cannot be prompted.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Background task panics or gets cancelled.
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    /// Package is not part of primary project.
    #[error("package {0:?} is not part of the primary project")]
    UnknownPackage(String),

    /// Settings file is not part of primary project.
    #[error("settings file {0:?} is not part of the primary project")]
    UnknownSettingsFile(String),

    /// Settings file cannot be copied.
    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    CopySettings {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = SyncError> = std::result::Result<T, E>;

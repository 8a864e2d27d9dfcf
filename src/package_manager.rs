// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package manager access.
//!
//! Minus never resolves or installs packages by itself. Listing installed
//! packages and installing a specific version is delegated to a
//! [`PackageManager`]. Requests are asynchronous, and resolve exactly once
//! with either their result, or a failure message.
//!
//! # Request Slots
//!
//! The [`PackageClient`] guards a package manager with one slot per request
//! kind. Only one list request and one add request can be in flight at any
//! given time. A request whose slot is taken is rejected right away instead
//! of being queued. Every request is bounded by a timeout, so an unresponsive
//! package manager surfaces as an error instead of a hang. Slots are released
//! on every completion path, be it success, failure, or timeout.

use crate::{
    catalog::{PackageCatalog, PackageEntry, PackageIdentifier},
    manifest::{read_error, upsert_dependency, ManifestError, ManifestParser},
};

use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    future::Future,
    path::PathBuf,
    time::Duration,
};
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, info, instrument};

/// Package manager collaborator.
pub trait PackageManager: Send + Sync {
    /// List installed packages.
    fn list(&self) -> impl Future<Output = Result<PackageCatalog, RequestFailure>> + Send;

    /// Install package at specific version.
    ///
    /// Returns the installed package.
    fn add(
        &self,
        identifier: &PackageIdentifier,
    ) -> impl Future<Output = Result<PackageEntry, RequestFailure>> + Send;
}

/// Package manager backed by project manifest.
///
/// Lists packages by reading the manifest, and installs them by rewriting the
/// version of their dependency line.
#[derive(Debug, Clone)]
pub struct ManifestPackageManager {
    manifest_path: PathBuf,
    parser: ManifestParser,
}

impl ManifestPackageManager {
    /// Construct new manifest backed package manager.
    pub fn new(manifest_path: impl Into<PathBuf>, parser: ManifestParser) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            parser,
        }
    }

    async fn read(&self) -> Result<String, ManifestError> {
        tokio::fs::read_to_string(&self.manifest_path)
            .await
            .map_err(|err| read_error(err, &self.manifest_path))
    }
}

impl PackageManager for ManifestPackageManager {
    #[instrument(skip(self), level = "debug")]
    async fn list(&self) -> Result<PackageCatalog, RequestFailure> {
        debug!("list packages of {:?}", self.manifest_path.display());
        let text = self.read().await?;
        Ok(self.parser.parse(&text))
    }

    #[instrument(skip(self), level = "debug")]
    async fn add(&self, identifier: &PackageIdentifier) -> Result<PackageEntry, RequestFailure> {
        let text = self.read().await?;
        let text = upsert_dependency(&text, &identifier.name, &identifier.version)?;
        tokio::fs::write(&self.manifest_path, text)
            .await
            .map_err(|err| ManifestError::Write {
                source: err,
                manifest_path: self.manifest_path.clone(),
            })?;

        info!("package {identifier} installed");
        Ok(PackageEntry::new(&identifier.name, &identifier.version))
    }
}

/// Serialized, time bounded access to a package manager.
#[derive(Debug)]
pub struct PackageClient<M>
where
    M: PackageManager,
{
    manager: M,
    list_slot: Mutex<()>,
    add_slot: Mutex<()>,
    timeout: Duration,
}

impl<M> PackageClient<M>
where
    M: PackageManager,
{
    /// Construct new package client.
    pub fn new(manager: M, timeout: Duration) -> Self {
        Self {
            manager,
            list_slot: Mutex::new(()),
            add_slot: Mutex::new(()),
            timeout,
        }
    }

    /// Check if any request is in flight.
    pub fn is_busy(&self) -> bool {
        self.list_slot.try_lock().is_err() || self.add_slot.try_lock().is_err()
    }

    /// List installed packages.
    ///
    /// # Errors
    ///
    /// - Return [`ClientError::Busy`] if a list request is in flight.
    /// - Return [`ClientError::Timeout`] if the request takes too long.
    /// - Return [`ClientError::Request`] if the package manager fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<PackageCatalog> {
        let _slot = self
            .list_slot
            .try_lock()
            .map_err(|_| ClientError::Busy(RequestKind::List))?;

        let catalog = timeout(self.timeout, self.manager.list())
            .await
            .map_err(|_| ClientError::Timeout {
                kind: RequestKind::List,
                after: self.timeout,
            })??;
        debug!("package manager listed {} packages", catalog.len());

        Ok(catalog)
    }

    /// Install package at specific version.
    ///
    /// # Errors
    ///
    /// - Return [`ClientError::Busy`] if an add request is in flight.
    /// - Return [`ClientError::Timeout`] if the request takes too long.
    /// - Return [`ClientError::Request`] if the package manager fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn add(&self, identifier: &PackageIdentifier) -> Result<PackageEntry> {
        let _slot = self
            .add_slot
            .try_lock()
            .map_err(|_| ClientError::Busy(RequestKind::Add))?;

        let entry = timeout(self.timeout, self.manager.add(identifier))
            .await
            .map_err(|_| ClientError::Timeout {
                kind: RequestKind::Add,
                after: self.timeout,
            })??;

        Ok(entry)
    }
}

/// Kind of package manager request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    List,
    Add,
}

impl Display for RequestKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::List => fmt.write_str("list"),
            Self::Add => fmt.write_str("add"),
        }
    }
}

/// Package manager reported a failed request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestFailure {
    pub message: String,
}

impl RequestFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ManifestError> for RequestFailure {
    fn from(err: ManifestError) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(&format!(": {cause}"));
            source = cause.source();
        }

        Self { message }
    }
}

/// Package client error types.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request of the same kind is already in flight.
    #[error("a package {0} request is already in flight")]
    Busy(RequestKind),

    /// Request did not complete in time.
    #[error("package {kind} request timed out after {after:?}")]
    Timeout { kind: RequestKind, after: Duration },

    /// Package manager failed request.
    #[error("package manager request failed: {0}")]
    Request(#[from] RequestFailure),
}

/// Friendly result alias :3
type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = indoc! {r#"
        {
          "dependencies": {
            "com.unity.timeline": "1.6.4",
            "com.unity.ugui": "1.0.0"
          }
        }
    "#};

    struct FakeManager {
        delay: Duration,
        failure: Option<&'static str>,
    }

    impl FakeManager {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                failure: None,
            }
        }

        fn failing(message: &'static str) -> Self {
            Self {
                delay: Duration::ZERO,
                failure: Some(message),
            }
        }
    }

    impl PackageManager for FakeManager {
        async fn list(&self) -> Result<PackageCatalog, RequestFailure> {
            tokio::time::sleep(self.delay).await;
            match self.failure {
                Some(message) => Err(RequestFailure::new(message)),
                None => Ok([PackageEntry::new("pkg.a", "1.0.0")].into_iter().collect()),
            }
        }

        async fn add(&self, identifier: &PackageIdentifier) -> Result<PackageEntry, RequestFailure> {
            tokio::time::sleep(self.delay).await;
            match self.failure {
                Some(message) => Err(RequestFailure::new(message)),
                None => Ok(PackageEntry::new(&identifier.name, &identifier.version)),
            }
        }
    }

    #[tokio::test]
    async fn reject_concurrent_requests_of_same_kind() {
        let client = PackageClient::new(
            FakeManager::new(Duration::from_millis(50)),
            Duration::from_secs(5),
        );

        let (first, second) = tokio::join!(client.list(), client.list());
        assert_eq!(first.unwrap().len(), 1);
        assert!(matches!(second, Err(ClientError::Busy(RequestKind::List))));
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn allow_concurrent_requests_of_different_kind() {
        let client = PackageClient::new(
            FakeManager::new(Duration::from_millis(20)),
            Duration::from_secs(5),
        );

        let identifier = PackageIdentifier::new("pkg.a", "2.0.0");
        let (listed, added) = tokio::join!(client.list(), client.add(&identifier));
        assert_eq!(listed.unwrap().len(), 1);
        assert_eq!(added.unwrap().version(), "2.0.0");
    }

    #[tokio::test]
    async fn time_out_unresponsive_manager() {
        let client = PackageClient::new(
            FakeManager::new(Duration::from_secs(30)),
            Duration::from_millis(10),
        );

        let result = client.list().await;
        assert!(matches!(
            result,
            Err(ClientError::Timeout {
                kind: RequestKind::List,
                ..
            })
        ));
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn surface_manager_failure() {
        let client = PackageClient::new(FakeManager::failing("registry offline"), Duration::from_secs(5));

        let result = client
            .add(&PackageIdentifier::new("pkg.a", "2.0.0"))
            .await;
        match result {
            Err(ClientError::Request(failure)) => assert_eq!(failure.message, "registry offline"),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn manifest_manager_list_and_add() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let manifest_path = dir.path().join("manifest.json");
        tokio::fs::write(&manifest_path, MANIFEST).await?;

        let manager = ManifestPackageManager::new(&manifest_path, ManifestParser::new());
        let catalog = manager.list().await?;
        assert_eq!(catalog.find_version("com.unity.ugui"), Some("1.0.0"));

        let installed = manager
            .add(&"com.unity.ugui@2.0.0".parse::<PackageIdentifier>()?)
            .await?;
        assert_eq!(installed, PackageEntry::new("com.unity.ugui", "2.0.0"));
        manager
            .add(&PackageIdentifier::new("com.unity.cinemachine", "2.9.7"))
            .await?;

        let catalog = manager.list().await?;
        let result = catalog
            .iter()
            .map(|entry| (entry.name(), entry.version()))
            .collect::<Vec<_>>();
        assert_eq!(
            result,
            vec![
                ("com.unity.cinemachine", "2.9.7"),
                ("com.unity.timeline", "1.6.4"),
                ("com.unity.ugui", "2.0.0"),
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn manifest_manager_missing_manifest() {
        let manager = ManifestPackageManager::new("/nonexistent/manifest.json", ManifestParser::new());
        let result = manager.list().await;
        assert_eq!(
            result,
            Err(RequestFailure::new(
                "manifest not found at \"/nonexistent/manifest.json\""
            ))
        );
    }
}

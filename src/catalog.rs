// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package catalog representation.
//!
//! A __catalog__ is an ordered listing of packages declared by a project. The
//! order of a catalog is the order its packages were discovered in, e.g., the
//! line order of the dependency block of a manifest, or the order the package
//! manager reported them in.
//!
//! # Package Identity
//!
//! The name of a package is its identity within a catalog. A catalog never
//! holds two packages with the same name. Inserting a package whose name is
//! already present replaces the version of the existing entry in place, so
//! the last write wins without disturbing the insertion order.
//!
//! # Scopes
//!
//! Package names are namespaced with dots, e.g., "com.unity.timeline". The
//! __scope__ of a package is everything before the last dot of its name, so
//! "com.unity.timeline" has the scope "com.unity". A name without any dot is
//! its own scope.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

const SCOPE_SEPARATOR: char = '.';

/// Single package declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    name: String,
    version: String,
    scope: String,

    /// Whether the package takes part in selective operations like cloning.
    pub selected: bool,

    /// Whether the package name matched the configured asset prefix.
    pub is_asset: bool,
}

impl PackageEntry {
    /// Construct new package entry.
    ///
    /// Derives the scope of the package from its name. New entries are always
    /// selected, and never flagged as assets.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let scope = match name.rfind(SCOPE_SEPARATOR) {
            Some(index) => name[..index].to_string(),
            None => name.clone(),
        };

        Self {
            name,
            version: version.into(),
            scope,
            selected: true,
            is_asset: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Version references a package on the local file system, e.g.,
    /// "file:../com.studio.tools".
    pub fn is_local(&self) -> bool {
        is_local_version(&self.version)
    }

    /// Package identifier to hand over to a package manager.
    pub fn identifier(&self) -> PackageIdentifier {
        PackageIdentifier::new(&self.name, &self.version)
    }
}

/// Check if version string marks a package referenced by file system path.
pub fn is_local_version(version: &str) -> bool {
    version.contains("file:")
}

/// Ordered, name-unique listing of packages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageCatalog {
    entries: Vec<PackageEntry>,
}

impl PackageCatalog {
    /// Construct new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert package entry.
    ///
    /// Replaces an existing entry of the same name in place. The replaced
    /// entry keeps its position, but takes the version of the new one.
    pub fn insert(&mut self, entry: PackageEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Find version of package by exact, case-sensitive name.
    ///
    /// Returns [`None`] when no package carries the name.
    pub fn find_version(&self, name: &str) -> Option<&str> {
        self.get(name).map(PackageEntry::version)
    }

    pub fn get(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PackageEntry> {
        self.entries.iter_mut().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if any package is referenced through the local file system.
    pub fn has_local_packages(&self) -> bool {
        self.entries.iter().any(PackageEntry::is_local)
    }

    /// Flag every package whose name starts with `prefix` as an asset.
    pub fn flag_assets(&mut self, prefix: &str) {
        for entry in &mut self.entries {
            entry.is_asset = entry.name.starts_with(prefix);
        }
    }

    pub fn select_all(&mut self) {
        self.entries.iter_mut().for_each(|entry| entry.selected = true);
    }

    pub fn deselect_all(&mut self) {
        self.entries.iter_mut().for_each(|entry| entry.selected = false);
    }

    /// Deselect listed packages.
    ///
    /// Returns names that are not part of the catalog.
    pub fn deselect<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut unknown = Vec::new();
        for name in names {
            match self.get_mut(name) {
                Some(entry) => entry.selected = false,
                None => unknown.push(name.to_string()),
            }
        }

        unknown
    }

    pub fn deselect_assets(&mut self) {
        for entry in self.entries.iter_mut().filter(|entry| entry.is_asset) {
            entry.selected = false;
        }
    }

    /// Names of packages that are not selected.
    pub fn deselected_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| !entry.selected)
            .map(PackageEntry::name)
            .collect()
    }
}

impl FromIterator<PackageEntry> for PackageCatalog {
    fn from_iter<I: IntoIterator<Item = PackageEntry>>(iter: I) -> Self {
        let mut catalog = PackageCatalog::new();
        for entry in iter {
            catalog.insert(entry);
        }

        catalog
    }
}

impl<'a> IntoIterator for &'a PackageCatalog {
    type Item = &'a PackageEntry;
    type IntoIter = std::slice::Iter<'a, PackageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Package identifier of the form "name@version".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentifier {
    pub name: String,
    pub version: String,
}

impl PackageIdentifier {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Display for PackageIdentifier {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}@{}", self.name, self.version)
    }
}

impl FromStr for PackageIdentifier {
    type Err = IdentifierError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        // INVARIANT: Split at first '@', because versions like git URLs may
        //   contain '@' themselves.
        match data.split_once('@') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(Self::new(name, version))
            }
            _ => Err(IdentifierError(data.to_string())),
        }
    }
}

/// Package identifier is not of the form "name@version".
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid package identifier {0:?}, expected \"name@version\"")]
pub struct IdentifierError(pub String);

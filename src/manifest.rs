// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package manifest handling.
//!
//! A project declares its packages in a __manifest__ file, i.e.,
//! `Packages/manifest.json`. Although the manifest is JSON, it is never fed
//! to a JSON decoder. Instead it is scanned line by line, where each line of
//! the dependency block is expected to carry exactly one `"name": "version"`
//! pair:
//!
//! ```text
//! {
//!   "dependencies": {
//!     "com.unity.timeline": "1.6.4",
//!     "com.studio.tools": "file:../../tools",
//!     "com.unity.ugui": "1.0.0"
//!   },
//!   "scopedRegistries": []
//! }
//! ```
//!
//! # Leniency
//!
//! Line scanning tolerates formatting variance that a strict JSON parser
//! would reject, e.g., dangling commas, or stray lines inside of the
//! dependency block. Lines that do not match the `"name": "version"` pattern
//! are skipped without complaint. Only the first match of each line counts.
//!
//! The dependency block starts after the first line containing
//! `"dependencies": {`, and ends at the first line containing `},`. A
//! manifest whose dependency block is the last member of the document has no
//! `},` line, so scanning simply runs until the end of the text.
//!
//! # Rewriting
//!
//! Edits made to the manifest are line-level edits as well, so everything
//! outside of the touched lines is preserved byte for byte.

use crate::catalog::{PackageCatalog, PackageEntry};

use regex::Regex;
use std::{
    collections::HashSet,
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tracing::{debug, instrument};

const DEPENDENCY_BLOCK_START: &str = "\"dependencies\": {";
const DEPENDENCY_BLOCK_END: &str = "},";

static PACKAGE_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(.*)": "(.*)",*"#).unwrap());

/// Line scanning manifest parser.
#[derive(Debug, Default, Clone)]
pub struct ManifestParser {
    asset_prefix: Option<String>,
}

impl ManifestParser {
    /// Construct new manifest parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag packages whose name starts with `prefix` as assets.
    ///
    /// Without a prefix, no package is ever flagged as an asset.
    pub fn with_asset_prefix(mut self, prefix: Option<impl Into<String>>) -> Self {
        self.asset_prefix = prefix.map(Into::into);
        self
    }

    /// Parse package catalog out of manifest text.
    pub fn parse(&self, text: &str) -> PackageCatalog {
        let mut lines = text.lines();

        // INVARIANT: Skip everything up to, and including, the start of the
        //   dependency block. Reaching the end first means no dependencies.
        for line in lines.by_ref() {
            if line.contains(DEPENDENCY_BLOCK_START) {
                break;
            }
        }

        let mut catalog = PackageCatalog::new();
        for line in lines {
            if line.contains(DEPENDENCY_BLOCK_END) {
                break;
            }

            if let Some((name, version)) = match_dependency(line) {
                catalog.insert(PackageEntry::new(name, version));
            }
        }

        if let Some(prefix) = &self.asset_prefix {
            catalog.flag_assets(prefix);
        }

        catalog
    }

    /// Read and parse manifest file.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::Missing`] if manifest does not exist.
    /// - Return [`ManifestError::Read`] if manifest cannot be read.
    #[instrument(skip(self, path), level = "debug")]
    pub fn read(&self, path: impl AsRef<Path>) -> Result<PackageCatalog> {
        debug!("read manifest {:?}", path.as_ref().display());
        let text = read_manifest(path)?;
        Ok(self.parse(&text))
    }
}

/// Read raw manifest text.
///
/// # Errors
///
/// - Return [`ManifestError::Missing`] if manifest does not exist.
/// - Return [`ManifestError::Read`] if manifest cannot be read.
pub fn read_manifest(path: impl AsRef<Path>) -> Result<String> {
    read_to_string(path.as_ref()).map_err(|err| read_error(err, path.as_ref()))
}

pub(crate) fn read_error(err: std::io::Error, path: &Path) -> ManifestError {
    match err.kind() {
        ErrorKind::NotFound => ManifestError::Missing {
            manifest_path: path.to_path_buf(),
        },
        _ => ManifestError::Read {
            source: err,
            manifest_path: path.to_path_buf(),
        },
    }
}

/// Check if any line of manifest references a package by file system path.
pub fn contains_local_packages(text: &str) -> bool {
    text.lines().any(|line| line.contains("file:"))
}

/// Remove lines of excluded packages from manifest text.
///
/// A line belongs to a package when its first quoted token is the package
/// name. Blank lines are dropped afterwards.
pub fn strip_packages<'a>(text: &str, excluded: impl IntoIterator<Item = &'a str>) -> String {
    let excluded = excluded.into_iter().collect::<HashSet<_>>();
    let mut out = String::new();

    for line in text.lines() {
        let mut tokens = line.split('"');
        let first_quoted = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(_), Some(name), Some(_)) => Some(name),
            _ => None,
        };

        if first_quoted.is_some_and(|name| excluded.contains(name)) {
            debug!("strip manifest line {line:?}");
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Set version of dependency in manifest text.
///
/// Replaces the version of an existing dependency in place, keeping its
/// indentation and trailing comma. Otherwise inserts the dependency as the
/// first entry of the dependency block.
///
/// # Errors
///
/// - Return [`ManifestError::NoDependencyBlock`] if manifest text lacks a
///   dependency block to insert into, or declares a filled block on a single
///   line.
pub fn upsert_dependency(text: &str, name: &str, version: &str) -> Result<String> {
    let mut lines = text.lines().map(str::to_owned).collect::<Vec<_>>();
    let start = lines
        .iter()
        .position(|line| line.contains(DEPENDENCY_BLOCK_START))
        .ok_or(ManifestError::NoDependencyBlock)?;

    // INVARIANT: A block that closes on its start line, e.g.,
    //   `"dependencies": {},`, gets expanded over multiple lines.
    let marker_end =
        lines[start].find(DEPENDENCY_BLOCK_START).unwrap_or(0) + DEPENDENCY_BLOCK_START.len();
    let rest = lines[start][marker_end..].to_string();
    if !rest.trim().is_empty() {
        let tail = rest
            .trim_start()
            .strip_prefix('}')
            .ok_or(ManifestError::NoDependencyBlock)?;
        if !tail.trim().is_empty() && tail.trim() != "," {
            return Err(ManifestError::NoDependencyBlock);
        }

        let indent = indentation(&lines[start]).to_string();
        let head = lines[start][..marker_end].to_string();
        let entry = format!("{indent}  \"{name}\": \"{version}\"");
        let close = format!("{indent}}}{}", tail.trim());
        lines[start] = head;
        lines.insert(start + 1, entry);
        lines.insert(start + 2, close);
        return Ok(join_lines(&lines, text));
    }

    let mut existing = None;
    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim_start().starts_with('}') {
            break;
        }

        if match_dependency(line).is_some_and(|(key, _)| key == name) {
            existing = Some(index);
            break;
        }
    }

    match existing {
        Some(index) => {
            let line = &lines[index];
            let indent = indentation(line);
            let comma = if line.trim_end().ends_with(',') { "," } else { "" };
            lines[index] = format!("{indent}\"{name}\": \"{version}\"{comma}");
        }
        None => {
            let next = lines.get(start + 1).map(String::as_str).unwrap_or("}");
            let is_empty_block = next.trim_start().starts_with('}');
            let indent = if is_empty_block {
                format!("{}  ", indentation(&lines[start]))
            } else {
                indentation(next).to_string()
            };
            let comma = if is_empty_block { "" } else { "," };
            lines.insert(
                start + 1,
                format!("{indent}\"{name}\": \"{version}\"{comma}"),
            );
        }
    }

    Ok(join_lines(&lines, text))
}

fn join_lines(lines: &[String], text: &str) -> String {
    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }

    out
}

fn match_dependency(line: &str) -> Option<(&str, &str)> {
    PACKAGE_VERSION_PATTERN.captures(line).map(|captures| {
        let (_, [name, version]) = captures.extract();
        (name, version)
    })
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file does not exist.
    #[error("manifest not found at {:?}", manifest_path.display())]
    Missing { manifest_path: PathBuf },

    /// Manifest file cannot be read from.
    #[error("failed to read manifest at {:?}", manifest_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        manifest_path: PathBuf,
    },

    /// Manifest file cannot be written to.
    #[error("failed to write manifest at {:?}", manifest_path.display())]
    Write {
        #[source]
        source: std::io::Error,
        manifest_path: PathBuf,
    },

    /// Manifest has no dependency block.
    #[error("manifest has no \"dependencies\" block")]
    NoDependencyBlock,
}

/// Friendly result alias :3
type Result<T, E = ManifestError> = std::result::Result<T, E>;

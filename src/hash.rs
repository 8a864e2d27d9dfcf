// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directory content hashing.
//!
//! Settings of a project live in a flat directory, i.e., `ProjectSettings`.
//! Comparing two of these directories only needs to know which files exist
//! and whether their content is identical, so each regular file directly
//! inside of the directory is reduced to a digest of its content.
//!
//! Subdirectories are not traversed, and symbolic links are not followed.

use sha2::{Digest, Sha256};
use std::{
    collections::BTreeMap,
    fs::{read_dir, File},
    io::{copy, BufReader, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Mapping of file name to lowercase hexadecimal content digest.
pub type FileChecksumMap = BTreeMap<String, String>;

/// Compute content digest of every regular file directly inside directory.
///
/// An existing directory without files yields an empty map.
///
/// # Errors
///
/// - Return [`HashError::MissingDirectory`] if directory does not exist.
/// - Return [`HashError::NotADirectory`] if path is not a directory.
/// - Return [`HashError::ReadDirectory`] if directory cannot be listed.
/// - Return [`HashError::ReadFile`] if a file cannot be read.
#[instrument(skip(dir), level = "debug")]
pub fn hash_directory(dir: impl AsRef<Path>) -> Result<FileChecksumMap> {
    let dir = dir.as_ref();
    debug!("hash files of {:?}", dir.display());

    let entries = read_dir(dir).map_err(|err| match err.kind() {
        ErrorKind::NotFound => HashError::MissingDirectory {
            dir: dir.to_path_buf(),
        },
        _ if dir.is_file() => HashError::NotADirectory {
            dir: dir.to_path_buf(),
        },
        _ => HashError::ReadDirectory {
            source: err,
            dir: dir.to_path_buf(),
        },
    })?;

    let mut checksums = FileChecksumMap::new();
    for entry in entries {
        let entry = entry.map_err(|err| HashError::ReadDirectory {
            source: err,
            dir: dir.to_path_buf(),
        })?;

        let file_type = entry.file_type().map_err(|err| HashError::ReadDirectory {
            source: err,
            dir: dir.to_path_buf(),
        })?;
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        checksums.insert(name, hash_file(entry.path())?);
    }

    Ok(checksums)
}

/// Compute lowercase hexadecimal content digest of file.
///
/// # Errors
///
/// - Return [`HashError::ReadFile`] if file cannot be read.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let read_error = |err| HashError::ReadFile {
        source: err,
        path: path.to_path_buf(),
    };

    let mut reader = BufReader::new(File::open(path).map_err(read_error)?);
    let mut hasher = Sha256::new();
    copy(&mut reader, &mut hasher).map_err(read_error)?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// Directory hashing error types.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Directory does not exist.
    #[error("directory {:?} does not exist", dir.display())]
    MissingDirectory { dir: PathBuf },

    /// Path exists, but is not a directory.
    #[error("path {:?} is not a directory", dir.display())]
    NotADirectory { dir: PathBuf },

    /// Directory cannot be listed.
    #[error("failed to list directory {:?}", dir.display())]
    ReadDirectory {
        #[source]
        source: std::io::Error,
        dir: PathBuf,
    },

    /// File cannot be read.
    #[error("failed to read file {:?}", path.display())]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = HashError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::{create_dir, create_dir_all, write};

    #[sealed_test]
    fn hash_is_deterministic() -> anyhow::Result<()> {
        write("first.asset", "TagManager: 1")?;
        write("second.asset", "TagManager: 1")?;
        write("third.asset", "TagManager: 2")?;

        let first = hash_file("first.asset")?;
        assert_eq!(first, hash_file("first.asset")?);
        assert_eq!(first, hash_file("second.asset")?);
        assert_ne!(first, hash_file("third.asset")?);

        // Lowercase hexadecimal SHA-256 without separators.
        assert_eq!(first.len(), 64);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

        Ok(())
    }

    #[sealed_test]
    fn hash_known_digest() -> anyhow::Result<()> {
        write("empty.asset", "")?;
        assert_eq!(
            hash_file("empty.asset")?,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        Ok(())
    }

    #[sealed_test]
    fn hash_directory_is_flat() -> anyhow::Result<()> {
        create_dir_all("ProjectSettings/Packages/com.studio.tool")?;
        write("ProjectSettings/TagManager.asset", "tags")?;
        write("ProjectSettings/QualitySettings.asset", "quality")?;
        write("ProjectSettings/Packages/com.studio.tool/Settings.json", "{}")?;

        let result = hash_directory("ProjectSettings")?;
        let names = result.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(names, vec!["QualitySettings.asset", "TagManager.asset"]);
        assert_eq!(
            result["TagManager.asset"],
            hash_file("ProjectSettings/TagManager.asset")?
        );

        Ok(())
    }

    #[sealed_test]
    fn hash_empty_directory() -> anyhow::Result<()> {
        create_dir("ProjectSettings")?;
        assert_eq!(hash_directory("ProjectSettings")?, FileChecksumMap::new());
        Ok(())
    }

    #[sealed_test]
    fn hash_missing_directory() {
        let result = hash_directory("ProjectSettings");
        assert!(matches!(result, Err(HashError::MissingDirectory { .. })));
    }
}

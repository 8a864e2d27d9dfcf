// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Primary to local comparison.
//!
//! The __primary__ project is the source of truth. Comparison walks the
//! primary side once, in its own order, and classifies every primary package
//! or settings file against the local side. Packages or files that only exist
//! locally are never reported. Every primary item lands in exactly one
//! category.
//!
//! # Package Categories
//!
//! | Category   | Local version                                        |
//! |------------|------------------------------------------------------|
//! | local-only | contains "file:" (only when detection is requested)  |
//! | valid      | equal to primary version                             |
//! | missing    | absent                                               |
//! | invalid    | anything else                                        |
//!
//! Categories are checked top to bottom, so local-only wins over valid.
//!
//! # Reports
//!
//! Reports render as a header line, `=== OK ===` or `=== INVALID ===`,
//! followed by one line per item. Invalid items are always listed. Everything
//! else is only listed in verbose mode.

use crate::{
    catalog::{is_local_version, PackageCatalog, PackageEntry},
    hash::FileChecksumMap,
};

const OK_HEADER: &str = "=== OK ===";
const INVALID_HEADER: &str = "=== INVALID ===";

/// Classification of a single primary package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    /// Local version equals primary version.
    Valid,

    /// Package is not installed locally.
    Missing,

    /// Local version differs from primary version.
    Invalid { actual: String },

    /// Local version references the local file system.
    LocalOnly { actual: String },
}

/// Primary package paired with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageComparison {
    pub entry: PackageEntry,
    pub status: PackageStatus,
}

impl PackageComparison {
    /// Local version of package, if installed.
    pub fn local_version(&self) -> Option<&str> {
        match &self.status {
            PackageStatus::Valid => Some(self.entry.version()),
            PackageStatus::Missing => None,
            PackageStatus::Invalid { actual } | PackageStatus::LocalOnly { actual } => {
                Some(actual)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == PackageStatus::Valid
    }
}

/// Outcome of comparing primary packages against local packages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageReport {
    comparisons: Vec<PackageComparison>,
}

impl PackageReport {
    /// All comparisons in primary order.
    pub fn iter(&self) -> impl Iterator<Item = &PackageComparison> {
        self.comparisons.iter()
    }

    pub fn len(&self) -> usize {
        self.comparisons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparisons.is_empty()
    }

    pub fn valid(&self) -> impl Iterator<Item = &PackageComparison> {
        self.iter().filter(|c| c.is_valid())
    }

    pub fn missing(&self) -> impl Iterator<Item = &PackageComparison> {
        self.iter()
            .filter(|c| matches!(c.status, PackageStatus::Missing))
    }

    pub fn invalid(&self) -> impl Iterator<Item = &PackageComparison> {
        self.iter()
            .filter(|c| matches!(c.status, PackageStatus::Invalid { .. }))
    }

    pub fn local_only(&self) -> impl Iterator<Item = &PackageComparison> {
        self.iter()
            .filter(|c| matches!(c.status, PackageStatus::LocalOnly { .. }))
    }

    /// Packages whose local state differs from primary in any way.
    pub fn mismatched(&self) -> impl Iterator<Item = &PackageComparison> {
        self.iter().filter(|c| !c.is_valid())
    }

    /// No package has an invalid version.
    pub fn is_ok(&self) -> bool {
        self.invalid().next().is_none()
    }

    /// Render textual report.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::from(if self.is_ok() { OK_HEADER } else { INVALID_HEADER });

        for comparison in self.invalid() {
            out.push_str(&format!(
                "\n Invalid Package : {} / local version : {} - primary version : {}",
                comparison.entry.name(),
                comparison.local_version().unwrap_or_default(),
                comparison.entry.version(),
            ));
        }

        if verbose {
            for comparison in self.valid() {
                out.push_str(&format!(
                    "\n Valid Package {} / version : {}",
                    comparison.entry.name(),
                    comparison.entry.version(),
                ));
            }

            for comparison in self.missing() {
                out.push_str(&format!(
                    "\n Missing Package : {} / primary version : {}",
                    comparison.entry.name(),
                    comparison.entry.version(),
                ));
            }

            for comparison in self.local_only() {
                out.push_str(&format!(
                    "\n Local Package : {} / local version : {} - primary version : {}",
                    comparison.entry.name(),
                    comparison.local_version().unwrap_or_default(),
                    comparison.entry.version(),
                ));
            }
        }

        out
    }

    /// Render aligned table of package name, primary version, and local
    /// version.
    ///
    /// Packages missing locally show `missing_sentinel` as their local
    /// version.
    pub fn render_table(&self, missing_sentinel: &str) -> String {
        let width = self
            .iter()
            .map(|c| c.entry.name().len())
            .chain(["Package name".len()])
            .max()
            .unwrap_or_default();
        let version_width = self
            .iter()
            .map(|c| c.entry.version().len())
            .chain(["Primary".len()])
            .max()
            .unwrap_or_default();

        let mut out = format!("{:<width$}  {:<version_width$}  This", "Package name", "Primary");
        for comparison in self.iter() {
            out.push_str(&format!(
                "\n{:<width$}  {:<version_width$}  {}",
                comparison.entry.name(),
                comparison.entry.version(),
                comparison.local_version().unwrap_or(missing_sentinel),
            ));
        }

        out
    }
}

/// Classify every primary package against the local catalog.
///
/// Packages whose local version references the local file system are only
/// classified as local-only when `detect_local_only` is set.
pub fn compare_packages(
    primary: &PackageCatalog,
    local: &PackageCatalog,
    detect_local_only: bool,
) -> PackageReport {
    let comparisons = primary
        .iter()
        .map(|entry| {
            let status = match local.find_version(entry.name()) {
                Some(actual) if detect_local_only && is_local_version(actual) => {
                    PackageStatus::LocalOnly {
                        actual: actual.to_string(),
                    }
                }
                Some(actual) if actual == entry.version() => PackageStatus::Valid,
                None => PackageStatus::Missing,
                Some(actual) => PackageStatus::Invalid {
                    actual: actual.to_string(),
                },
            };

            PackageComparison {
                entry: entry.clone(),
                status,
            }
        })
        .collect();

    PackageReport { comparisons }
}

/// Outcome of comparing primary settings files against local ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsReport {
    /// Files whose checksum matches.
    pub matching: Vec<String>,

    /// Files whose checksum differs, or that do not exist locally.
    pub mismatched: Vec<String>,
}

impl SettingsReport {
    /// No settings file is mismatched.
    pub fn is_ok(&self) -> bool {
        self.mismatched.is_empty()
    }

    pub fn is_mismatched(&self, name: &str) -> bool {
        self.mismatched.iter().any(|file| file == name)
    }

    /// Render textual report.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::from(if self.is_ok() { OK_HEADER } else { INVALID_HEADER });

        for name in &self.mismatched {
            out.push_str(&format!("\n Invalid Settings : {name}"));
        }

        if verbose {
            for name in &self.matching {
                out.push_str(&format!("\n Valid Settings : {name}"));
            }
        }

        out
    }
}

/// Classify every primary settings file against local checksums.
pub fn compare_settings(primary: &FileChecksumMap, local: &FileChecksumMap) -> SettingsReport {
    let mut report = SettingsReport::default();
    for (name, checksum) in primary {
        if local.get(name) == Some(checksum) {
            report.matching.push(name.clone());
        } else {
            report.mismatched.push(name.clone());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn catalog(pairs: &[(&str, &str)]) -> PackageCatalog {
        pairs
            .iter()
            .map(|(name, version)| PackageEntry::new(*name, *version))
            .collect()
    }

    fn checksums(pairs: &[(&str, &str)]) -> FileChecksumMap {
        pairs
            .iter()
            .map(|(name, checksum)| (name.to_string(), checksum.to_string()))
            .collect()
    }

    #[test_case(&[("pkg.a", "1.0.0")], false, PackageStatus::Valid; "same version")]
    #[test_case(&[], false, PackageStatus::Missing; "not installed")]
    #[test_case(
        &[("pkg.a", "2.0.0")],
        false,
        PackageStatus::Invalid { actual: "2.0.0".into() };
        "other version"
    )]
    #[test_case(
        &[("pkg.a", "file:../pkg.a")],
        true,
        PackageStatus::LocalOnly { actual: "file:../pkg.a".into() };
        "local package detected"
    )]
    #[test_case(
        &[("pkg.a", "file:../pkg.a")],
        false,
        PackageStatus::Invalid { actual: "file:../pkg.a".into() };
        "local package not detected"
    )]
    #[test]
    fn classify_package(local: &[(&str, &str)], detect_local_only: bool, expect: PackageStatus) {
        let report = compare_packages(
            &catalog(&[("pkg.a", "1.0.0")]),
            &catalog(local),
            detect_local_only,
        );
        let result = report.iter().map(|c| c.status.clone()).collect::<Vec<_>>();
        self::assert_eq!(result, vec![expect]);
    }

    #[test]
    fn local_only_takes_precedence_over_valid() {
        let primary = catalog(&[("pkg.a", "file:../pkg.a")]);
        let local = catalog(&[("pkg.a", "file:../pkg.a")]);

        let report = compare_packages(&primary, &local, true);
        assert_eq!(report.local_only().count(), 1);

        let report = compare_packages(&primary, &local, false);
        assert_eq!(report.valid().count(), 1);
    }

    #[test]
    fn every_primary_package_is_classified_once() {
        let primary = catalog(&[
            ("pkg.a", "1.0.0"),
            ("pkg.b", "1.0.0"),
            ("pkg.c", "1.0.0"),
            ("pkg.d", "1.0.0"),
            ("pkg.e", "1.0.0"),
        ]);
        let local = catalog(&[
            ("pkg.a", "1.0.0"),
            ("pkg.c", "0.9.0"),
            ("pkg.d", "file:../pkg.d"),
            ("pkg.z", "1.0.0"),
        ]);

        let report = compare_packages(&primary, &local, true);
        let total = report.valid().count()
            + report.missing().count()
            + report.invalid().count()
            + report.local_only().count();
        assert_eq!(total, primary.len());
        assert_eq!(report.len(), primary.len());
        assert_eq!(report.mismatched().count(), 4);
    }

    #[test]
    fn render_ok_package_report() {
        let primary = catalog(&[("pkg.a", "1.0.0"), ("pkg.b", "1.0.0")]);
        let local = catalog(&[("pkg.a", "1.0.0")]);
        let report = compare_packages(&primary, &local, false);

        assert_eq!(report.render(false), "=== OK ===");
        let expect = indoc! {"
            === OK ===
             Valid Package pkg.a / version : 1.0.0
             Missing Package : pkg.b / primary version : 1.0.0"};
        assert_eq!(report.render(true), expect);
    }

    #[test]
    fn render_invalid_package_report() {
        let primary = catalog(&[("pkg.a", "1.0.0"), ("pkg.b", "1.0.0"), ("pkg.c", "1.0.0")]);
        let local = catalog(&[
            ("pkg.a", "2.0.0"),
            ("pkg.b", "1.0.0"),
            ("pkg.c", "file:../pkg.c"),
        ]);
        let report = compare_packages(&primary, &local, true);

        let expect = indoc! {"
            === INVALID ===
             Invalid Package : pkg.a / local version : 2.0.0 - primary version : 1.0.0"};
        assert_eq!(report.render(false), expect);

        let expect = indoc! {"
            === INVALID ===
             Invalid Package : pkg.a / local version : 2.0.0 - primary version : 1.0.0
             Valid Package pkg.b / version : 1.0.0
             Local Package : pkg.c / local version : file:../pkg.c - primary version : 1.0.0"};
        assert_eq!(report.render(true), expect);
    }

    #[test]
    fn render_package_table() {
        let primary = catalog(&[("com.unity.timeline", "1.6.4"), ("pkg.b", "10.0.0")]);
        let local = catalog(&[("com.unity.timeline", "1.7.0")]);
        let report = compare_packages(&primary, &local, false);

        let expect = indoc! {"
            Package name        Primary  This
            com.unity.timeline  1.6.4    1.7.0
            pkg.b               10.0.0   missing"};
        assert_eq!(report.render_table("missing"), expect);
    }

    #[test]
    fn compare_settings_files() {
        let report = compare_settings(&checksums(&[("a.asset", "h1")]), &FileChecksumMap::new());
        assert_eq!(report.mismatched, vec!["a.asset".to_string()]);
        assert!(report.matching.is_empty());

        let report = compare_settings(
            &checksums(&[("a.asset", "h1")]),
            &checksums(&[("a.asset", "h1")]),
        );
        assert_eq!(report.matching, vec!["a.asset".to_string()]);
        assert!(report.mismatched.is_empty());
    }

    #[test]
    fn render_settings_report() {
        let report = compare_settings(
            &checksums(&[("a.asset", "h1"), ("b.asset", "h2"), ("c.asset", "h3")]),
            &checksums(&[("a.asset", "h1"), ("b.asset", "h9"), ("d.asset", "h4")]),
        );

        let expect = indoc! {"
            === INVALID ===
             Invalid Settings : b.asset
             Invalid Settings : c.asset"};
        assert_eq!(report.render(false), expect);

        let expect = indoc! {"
            === INVALID ===
             Invalid Settings : b.asset
             Invalid Settings : c.asset
             Valid Settings : a.asset"};
        assert_eq!(report.render(true), expect);

        let report = compare_settings(
            &checksums(&[("a.asset", "h1")]),
            &checksums(&[("a.asset", "h1")]),
        );
        assert_eq!(report.render(false), "=== OK ===");
    }
}

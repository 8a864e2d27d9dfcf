// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Creation of new projects from an existing one.
//!
//! A clone receives the package manifest and settings of the source project,
//! an empty asset directory, and any extra folders configured through
//! [`CloneSettings::folders`]. Packages that are deselected in the given
//! catalog are stripped from the copied manifest. Finally, the new project
//! gets told that the source project is its primary project.

use crate::{
    catalog::PackageCatalog,
    config::{CloneSettings, MinusSettings, ProjectPath},
    manifest::{contains_local_packages, read_manifest, strip_packages, ManifestError},
    path::{ProjectLayout, SettingsScope},
    prompt::{Confirmation, Outcome, PromptError},
};

use ignore::WalkBuilder;
use indicatif::ProgressBar;
use mkdirp::mkdirp;
use std::{
    fs::{canonicalize, copy, read_dir, remove_dir_all, remove_file, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Create new projects from a source project.
#[derive(Debug, Clone)]
pub struct ProjectCloner {
    source: ProjectLayout,
    settings: CloneSettings,
    bar: Option<ProgressBar>,
}

impl ProjectCloner {
    /// Construct new cloner of `source` project.
    pub fn new(source: ProjectLayout, settings: CloneSettings) -> Self {
        Self {
            source,
            settings,
            bar: None,
        }
    }

    /// Report copied files through `bar`.
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = Some(bar);
        self
    }

    /// Clone source project into `destination`.
    ///
    /// Backslashes of `destination` are treated as path separators. Creation
    /// of the new project is confirmed first. If the source project
    /// references packages by file system path, and local packages are not
    /// allowed, then the clone is confirmed a second time.
    ///
    /// # Errors
    ///
    /// - Return [`CloneError::NoDestination`] if `destination` is blank.
    /// - Return [`CloneError::DestinationNotEmpty`] if `destination` already
    ///   contains files.
    /// - Return [`CloneError::MissingFolder`] if source project lacks its
    ///   package or settings directory.
    /// - Return [`CloneError::Manifest`] if source manifest cannot be read,
    ///   or copied manifest cannot be rewritten.
    /// - Return [`CloneError::Prompt`] if user cannot be prompted.
    #[instrument(skip(self, packages, confirm), level = "debug")]
    pub fn clone_project(
        &self,
        destination: &str,
        packages: &PackageCatalog,
        confirm: &impl Confirmation,
    ) -> Result<Outcome> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(CloneError::NoDestination);
        }
        let destination = ProjectLayout::new(destination.replace('\\', "/"));

        if !confirm.confirm(&format!(
            "Do you really want to create a new project on this path: {}?",
            destination.root().display()
        ))? {
            info!("clone cancelled");
            return Ok(Outcome::Cancelled);
        }

        let manifest = read_manifest(self.source.manifest_path())?;
        if !self.settings.allow_local_packages
            && contains_local_packages(&manifest)
            && !confirm.confirm(
                "This project references packages by file system path, \
                 which may not resolve in the new project. Continue anyway?",
            )?
        {
            info!("clone cancelled");
            return Ok(Outcome::Cancelled);
        }

        for required in [self.source.packages_dir(), self.source.settings_dir()] {
            if !required.is_dir() {
                return Err(CloneError::MissingFolder { path: required });
            }
        }

        if is_populated(destination.root()) {
            return Err(CloneError::DestinationNotEmpty {
                path: destination.root().to_path_buf(),
            });
        }

        let existed = destination.root().exists();
        if let Err(err) = self.populate(&destination, packages) {
            discard(destination.root(), existed);
            return Err(err);
        }

        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        info!("created new project at {:?}", destination.root().display());

        Ok(Outcome::Done)
    }

    fn populate(&self, destination: &ProjectLayout, packages: &PackageCatalog) -> Result<()> {
        create_dir(destination.root())?;
        create_dir(destination.assets_dir())?;
        self.copy_tree(&self.source.packages_dir(), &destination.packages_dir())?;
        self.copy_tree(&self.source.settings_dir(), &destination.settings_dir())?;

        for folder in &self.settings.folders {
            let folder = folder.trim();
            if folder.is_empty() {
                continue;
            }

            let from = self.source.root().join(folder);
            if !from.is_dir() {
                warn!("skip missing folder {:?}", from.display());
                continue;
            }
            self.copy_tree(&from, &destination.root().join(folder))?;
        }

        let excluded = packages.deselected_names();
        debug!("exclude packages {excluded:?}");
        let manifest_path = destination.manifest_path();
        let manifest = strip_packages(&read_manifest(&manifest_path)?, excluded);
        write(&manifest_path, manifest).map_err(|err| ManifestError::Write {
            source: err,
            manifest_path,
        })?;

        self.link_primary(destination)
    }

    fn link_primary(&self, destination: &ProjectLayout) -> Result<()> {
        let primary = canonicalize(self.source.root()).map_err(|err| CloneError::Resolve {
            source: err,
            path: self.source.root().to_path_buf(),
        })?;

        let mut settings =
            MinusSettings::load_scope(SettingsScope::Project, destination)?.unwrap_or_default();
        settings.sync.primary_project = Some(ProjectPath::new(primary));
        settings.save(SettingsScope::Project, destination)?;

        Ok(())
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        debug!("copy {:?} to {:?}", from.display(), to.display());
        if let Some(bar) = &self.bar {
            bar.set_message(from.display().to_string());
        }

        for entry in WalkBuilder::new(from).standard_filters(false).build() {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(from) else {
                continue;
            };
            let target = to.join(relative);

            match entry.file_type() {
                Some(kind) if kind.is_dir() => create_dir(&target)?,
                Some(kind) if kind.is_file() => {
                    copy(entry.path(), &target).map_err(|err| CloneError::Copy {
                        source: err,
                        path: entry.path().to_path_buf(),
                    })?;
                    if let Some(bar) = &self.bar {
                        bar.inc(1);
                    }
                }
                _ => debug!("skip {:?}", entry.path().display()),
            }
        }

        Ok(())
    }
}

/// Remove whatever a failed clone left behind.
///
/// Only the contents are removed if the destination existed beforehand.
fn discard(path: &Path, existed: bool) {
    let result = if existed {
        read_dir(path).and_then(|entries| {
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    remove_dir_all(entry.path())?;
                } else {
                    remove_file(entry.path())?;
                }
            }
            Ok(())
        })
    } else {
        remove_dir_all(path)
    };

    if let Err(err) = result {
        warn!("failed to clean up {:?}: {err}", path.display());
    }
}

fn is_populated(path: &Path) -> bool {
    read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}

fn create_dir(path: impl AsRef<Path>) -> Result<()> {
    mkdirp(path.as_ref()).map_err(|err| CloneError::CreateDir {
        source: err,
        path: path.as_ref().to_path_buf(),
    })?;

    Ok(())
}

/// Clone error types.
#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    /// No destination given.
    #[error("no destination given for new project")]
    NoDestination,

    /// Destination already has content.
    #[error("destination {:?} is not empty", path.display())]
    DestinationNotEmpty { path: PathBuf },

    /// Source project lacks required folder.
    #[error("source project has no folder {:?}", path.display())]
    MissingFolder { path: PathBuf },

    /// Source project path cannot be resolved.
    #[error("failed to resolve project path {:?}", path.display())]
    Resolve {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// File cannot be copied.
    #[error("failed to copy {:?}", path.display())]
    Copy {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source tree cannot be walked.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Manifest cannot be read or rewritten.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Settings of new project cannot be written.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// User cannot be prompted.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Friendly result alias :3
type Result<T, E = CloneError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{manifest::ManifestParser, prompt::AssumeAnswer};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{cell::RefCell, collections::VecDeque, fs};

    const MANIFEST: &str = indoc! {r#"
        {
          "dependencies": {
            "com.studio.assets.trees": "1.0.0",
            "com.unity.timeline": "1.6.4",
            "com.unity.ugui": "1.0.0"
          }
        }
    "#};

    struct Answers(RefCell<VecDeque<bool>>);

    impl Answers {
        fn new(answers: impl IntoIterator<Item = bool>) -> Self {
            Self(RefCell::new(answers.into_iter().collect()))
        }

        fn remaining(&self) -> usize {
            self.0.borrow().len()
        }
    }

    impl Confirmation for Answers {
        fn confirm(&self, _message: &str) -> crate::prompt::Result<bool> {
            Ok(self.0.borrow_mut().pop_front().unwrap_or(false))
        }
    }

    fn setup_source(manifest: &str) -> anyhow::Result<ProjectLayout> {
        let source = ProjectLayout::new("source");
        fs::create_dir_all(source.packages_dir())?;
        fs::create_dir_all(source.settings_dir())?;
        fs::create_dir_all(source.assets_dir().join("Art/Textures"))?;
        fs::create_dir_all(source.assets_dir().join("Scenes"))?;
        fs::write(source.manifest_path(), manifest)?;
        fs::write(source.settings_file("TagManager.asset"), "tags")?;
        fs::write(source.assets_dir().join("Art/Textures/bark.png"), "bark")?;
        fs::write(source.assets_dir().join("Scenes/Main.unity"), "scene")?;

        Ok(source)
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/nonexistent/minus-test-config")])]
    fn clone_project_copies_layout() -> anyhow::Result<()> {
        let source = setup_source(MANIFEST)?;
        let settings = CloneSettings {
            allow_local_packages: false,
            folders: vec![" Assets/Art ".into()],
        };

        let mut packages = ManifestParser::new()
            .with_asset_prefix(Some("com.studio.assets"))
            .parse(MANIFEST);
        packages.deselect_assets();

        let cloner = ProjectCloner::new(source.clone(), settings);
        let outcome = cloner.clone_project("clones\\game", &packages, &AssumeAnswer::YES)?;
        assert_eq!(outcome, Outcome::Done);

        let clone = ProjectLayout::new("clones/game");
        assert!(clone.assets_dir().is_dir());
        assert_eq!(
            fs::read_to_string(clone.assets_dir().join("Art/Textures/bark.png"))?,
            "bark"
        );
        assert!(!clone.assets_dir().join("Scenes").exists());
        assert_eq!(fs::read_to_string(clone.settings_file("TagManager.asset"))?, "tags");

        let expect = indoc! {r#"
            {
              "dependencies": {
                "com.unity.timeline": "1.6.4",
                "com.unity.ugui": "1.0.0"
              }
            }
        "#};
        assert_eq!(fs::read_to_string(clone.manifest_path())?, expect);

        let settings = MinusSettings::load(&clone)?;
        assert_eq!(settings.primary_project()?, ProjectLayout::new(canonicalize(source.root())?));

        Ok(())
    }

    #[test]
    fn clone_project_without_destination() {
        let cloner = ProjectCloner::new(ProjectLayout::new("source"), CloneSettings::default());
        let result = cloner.clone_project("   ", &PackageCatalog::new(), &AssumeAnswer::YES);
        assert!(matches!(result, Err(CloneError::NoDestination)));
    }

    #[sealed_test]
    fn clone_project_declined() -> anyhow::Result<()> {
        let source = setup_source(MANIFEST)?;
        let cloner = ProjectCloner::new(source, CloneSettings::default());

        let outcome = cloner.clone_project("clone", &PackageCatalog::new(), &AssumeAnswer::NO)?;
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(!Path::new("clone").exists());

        Ok(())
    }

    #[sealed_test]
    fn clone_project_with_local_packages_declined() -> anyhow::Result<()> {
        let manifest = indoc! {r#"
            {
              "dependencies": {
                "com.studio.tools": "file:../tools",
                "com.unity.ugui": "1.0.0"
              }
            }
        "#};
        let source = setup_source(manifest)?;
        let cloner = ProjectCloner::new(source, CloneSettings::default());

        let answers = Answers::new([true, false]);
        let outcome = cloner.clone_project("clone", &PackageCatalog::new(), &answers)?;
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(answers.remaining(), 0);
        assert!(!Path::new("clone").exists());

        Ok(())
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/nonexistent/minus-test-config")])]
    fn clone_project_with_local_packages_allowed() -> anyhow::Result<()> {
        let manifest = indoc! {r#"
            {
              "dependencies": {
                "com.studio.tools": "file:../tools"
              }
            }
        "#};
        let source = setup_source(manifest)?;
        let settings = CloneSettings {
            allow_local_packages: true,
            folders: Vec::new(),
        };
        let cloner = ProjectCloner::new(source, settings);

        let answers = Answers::new([true]);
        let outcome = cloner.clone_project("clone", &PackageCatalog::new(), &answers)?;
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(fs::read_to_string("clone/Packages/manifest.json")?, manifest);

        Ok(())
    }

    #[sealed_test]
    fn clone_project_into_populated_destination() -> anyhow::Result<()> {
        let source = setup_source(MANIFEST)?;
        fs::create_dir_all("clone")?;
        fs::write("clone/notes.txt", "keep me")?;

        let cloner = ProjectCloner::new(source, CloneSettings::default());
        let result = cloner.clone_project("clone", &PackageCatalog::new(), &AssumeAnswer::YES);
        assert!(matches!(result, Err(CloneError::DestinationNotEmpty { .. })));
        assert_eq!(fs::read_to_string("clone/notes.txt")?, "keep me");

        Ok(())
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/nonexistent/minus-test-config")])]
    fn clone_project_without_source_settings() -> anyhow::Result<()> {
        let source = setup_source(MANIFEST)?;
        fs::remove_dir_all(source.settings_dir())?;

        let cloner = ProjectCloner::new(source.clone(), CloneSettings::default());
        let result = cloner.clone_project("clone", &PackageCatalog::new(), &AssumeAnswer::YES);
        assert!(matches!(result, Err(CloneError::MissingFolder { .. })));
        assert!(!Path::new("clone").exists());

        fs::create_dir_all(source.settings_dir())?;
        let outcome = cloner.clone_project("clone", &PackageCatalog::new(), &AssumeAnswer::YES)?;
        assert_eq!(outcome, Outcome::Done);
        assert!(Path::new("clone/Packages/manifest.json").exists());

        Ok(())
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/nonexistent/minus-test-config")])]
    fn clone_project_cleans_up_after_failure() -> anyhow::Result<()> {
        let source = setup_source(MANIFEST)?;
        fs::write(source.settings_file("Packages"), "not a directory")?;
        let cloner = ProjectCloner::new(source, CloneSettings::default());

        let result = cloner.clone_project("clone", &PackageCatalog::new(), &AssumeAnswer::YES);
        assert!(matches!(result, Err(CloneError::Config(_))));
        assert!(!Path::new("clone").exists());

        fs::create_dir("empty")?;
        let result = cloner.clone_project("empty", &PackageCatalog::new(), &AssumeAnswer::YES);
        assert!(matches!(result, Err(CloneError::Config(_))));
        assert!(Path::new("empty").is_dir());
        assert_eq!(fs::read_dir("empty")?.count(), 0);

        Ok(())
    }
}

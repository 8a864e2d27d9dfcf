// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use minus::{
    clone::ProjectCloner,
    config::{MinusSettings, ProjectPath},
    manifest::ManifestParser,
    path::{ProjectLayout, SettingsScope},
    prompt::{AssumeAnswer, Confirmation, InquirePrompt, Outcome},
    sync::{Synchronizer, UpdateStatus},
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::{fs::canonicalize, path::PathBuf, process::exit, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "minus [options] <minus-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to project to operate on.
    #[arg(short, long, global = true, default_value = ".", value_name = "path")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let project = ProjectLayout::new(self.project);
        match self.command {
            Command::Status(opts) => run_status(project, opts).await,
            Command::Update(opts) => run_update(project, opts).await,
            Command::UpdateSettings(opts) => run_update_settings(project, opts).await,
            Command::Clone(opts) => run_clone(project, opts),
            Command::Config(command) => run_config(project, command),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Compare project against primary project.
    #[command(override_usage = "minus status [options]")]
    Status(StatusOptions),

    /// Install primary version of mismatched packages.
    #[command(override_usage = "minus update [options] [<package>]...")]
    Update(UpdateOptions),

    /// Copy primary version of mismatched settings files.
    #[command(override_usage = "minus update-settings [options] [<file>]...")]
    UpdateSettings(UpdateSettingsOptions),

    /// Create new project from this project.
    #[command(override_usage = "minus clone [options] <path>")]
    Clone(CloneOptions),

    /// Show or change settings.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct StatusOptions {
    /// Also list valid, missing, and local-only entries.
    #[arg(short, long)]
    pub verbose: bool,

    /// Report packages installed from the file system as local-only.
    #[arg(short, long)]
    pub local_only: bool,

    /// Compare against this primary project instead of the configured one.
    #[arg(long, value_name = "path")]
    pub primary: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UpdateOptions {
    /// Names of packages to update.
    #[arg(group = "target", value_name = "package")]
    pub packages: Vec<String>,

    /// Update every mismatched package.
    #[arg(short, long, group = "target")]
    pub all: bool,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UpdateSettingsOptions {
    /// Names of settings files to update.
    #[arg(group = "target", value_name = "file")]
    pub files: Vec<String>,

    /// Update every mismatched settings file.
    #[arg(short, long, group = "target")]
    pub all: bool,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CloneOptions {
    /// Path of new project.
    #[arg(required = true, value_name = "path")]
    pub destination: String,

    /// Leave package out of new project.
    #[arg(short, long, value_name = "package")]
    pub exclude: Vec<String>,

    /// Leave asset packages out of new project.
    #[arg(long)]
    pub exclude_assets: bool,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Show effective settings.
    Show(ScopeOptions),

    /// Set path to primary project.
    SetPrimary {
        #[arg(required = true, value_name = "path")]
        path: PathBuf,

        #[command(flatten)]
        scope: ScopeOptions,
    },

    /// Set extra folders copied into new projects.
    SetFolders {
        #[arg(value_name = "folder")]
        folders: Vec<String>,

        #[command(flatten)]
        scope: ScopeOptions,
    },

    /// Allow cloning projects with packages installed from the file system.
    AllowLocalPackages {
        #[arg(required = true, value_name = "bool", action = ArgAction::Set)]
        allow: bool,

        #[command(flatten)]
        scope: ScopeOptions,
    },
}

#[derive(Args, Clone, Debug)]
struct ScopeOptions {
    /// Use user settings instead of project settings.
    #[arg(short, long)]
    pub user: bool,
}

impl ScopeOptions {
    fn scope(&self) -> SettingsScope {
        if self.user {
            SettingsScope::User
        } else {
            SettingsScope::Project
        }
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_status(project: ProjectLayout, opts: StatusOptions) -> Result<()> {
    let mut settings = MinusSettings::load(&project)?;
    if let Some(primary) = opts.primary {
        settings.sync.primary_project = Some(ProjectPath::new(primary));
    }
    if opts.local_only {
        settings.sync.detect_local_only = true;
    }

    let synchronizer = Synchronizer::from_settings(project, &settings)?;
    let bar = spinner("Waiting for synchronization...")?;
    let state = synchronizer.synchronize().await;
    bar.finish_and_clear();
    let state = state?;

    println!("Packages\n{}\n", state.packages.render(opts.verbose));
    println!("Settings\n{}\n", state.settings.render(opts.verbose));
    print!("{}", state.packages.render_table(&settings.sync.missing_sentinel));

    Ok(())
}

async fn run_update(project: ProjectLayout, opts: UpdateOptions) -> Result<()> {
    if opts.packages.is_empty() && !opts.all {
        bail!("name packages to update, or use --all");
    }

    let settings = MinusSettings::load(&project)?;
    let synchronizer = Synchronizer::from_settings(project, &settings)?;
    let bar = spinner("Waiting for synchronization...")?;
    let state = match synchronizer.synchronize().await {
        Ok(state) => state,
        Err(err) => {
            bar.finish_and_clear();
            return Err(err.into());
        }
    };

    bar.set_message("Updating packages...");
    let prompt = prompter(opts.yes, &bar);
    let updates = synchronizer
        .update_packages(&state, &opts.packages, &prompt)
        .await;
    bar.finish_and_clear();

    let updates = updates?;
    if updates.is_empty() {
        info!("packages already up to date");
    }

    let mut failed = 0;
    for update in updates {
        match update.status {
            UpdateStatus::Updated => println!("updated {}", update.identifier),
            UpdateStatus::Cancelled => println!("skipped {}", update.identifier),
            UpdateStatus::Failed(message) => {
                failed += 1;
                warn!("failed to update {}: {message}", update.identifier);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} package updates failed");
    }

    Ok(())
}

async fn run_update_settings(project: ProjectLayout, opts: UpdateSettingsOptions) -> Result<()> {
    if opts.files.is_empty() && !opts.all {
        bail!("name settings files to update, or use --all");
    }

    let settings = MinusSettings::load(&project)?;
    let synchronizer = Synchronizer::from_settings(project, &settings)?;
    let bar = spinner("Waiting for synchronization...")?;
    let state = synchronizer.synchronize().await;
    bar.finish_and_clear();
    let state = state?;

    let prompt = prompter(opts.yes, &bar);
    let outcomes = synchronizer.update_setting_files(&state, &opts.files, &prompt)?;
    if outcomes.is_empty() {
        info!("settings files already up to date");
    }

    for (name, outcome) in outcomes {
        match outcome {
            Outcome::Done => println!("updated {name}"),
            Outcome::Cancelled => println!("skipped {name}"),
        }
    }

    Ok(())
}

fn run_clone(project: ProjectLayout, opts: CloneOptions) -> Result<()> {
    let settings = MinusSettings::load(&project)?;
    let mut packages = ManifestParser::new()
        .with_asset_prefix(settings.sync.asset_prefix.clone())
        .read(project.manifest_path())?;

    if opts.exclude_assets {
        if settings.sync.asset_prefix.is_none() {
            warn!("no asset prefix configured, no package counts as asset");
        }
        packages.deselect_assets();
    }
    for name in packages.deselect(opts.exclude.iter().map(String::as_str)) {
        warn!("package {name} is not part of this project");
    }

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{elapsed_precise:.green}  {pos:>6} files  {msg}",
    )?);
    let cloner = ProjectCloner::new(project, settings.clone).with_progress_bar(bar.clone());
    let outcome = cloner.clone_project(&opts.destination, &packages, &prompter(opts.yes, &bar));
    bar.finish_and_clear();

    if outcome? == Outcome::Cancelled {
        println!("clone cancelled");
    }

    Ok(())
}

fn run_config(project: ProjectLayout, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show(scope) => {
            let settings = if scope.user {
                MinusSettings::load_scope(SettingsScope::User, &project)?.unwrap_or_default()
            } else {
                MinusSettings::load(&project)?
            };
            print!("{settings}");
            Ok(())
        }
        ConfigCommand::SetPrimary { path, scope } => {
            let path = canonicalize(&path)
                .with_context(|| format!("cannot resolve primary project {:?}", path.display()))?;
            edit_settings(&project, scope.scope(), |settings| {
                settings.sync.primary_project = Some(ProjectPath::new(path));
            })
        }
        ConfigCommand::SetFolders { folders, scope } => {
            edit_settings(&project, scope.scope(), |settings| {
                settings.clone.folders = folders;
            })
        }
        ConfigCommand::AllowLocalPackages { allow, scope } => {
            edit_settings(&project, scope.scope(), |settings| {
                settings.clone.allow_local_packages = allow;
            })
        }
    }
}

fn edit_settings(
    project: &ProjectLayout,
    scope: SettingsScope,
    edit: impl FnOnce(&mut MinusSettings),
) -> Result<()> {
    let mut settings = MinusSettings::load_scope(scope, project)?.unwrap_or_default();
    edit(&mut settings);
    settings.save(scope, project)?;

    Ok(())
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} {elapsed_precise:.green}  {msg}",
    )?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    Ok(bar)
}

fn prompter(assume_yes: bool, bar: &ProgressBar) -> Box<dyn Confirmation> {
    if assume_yes {
        Box::new(AssumeAnswer::YES)
    } else {
        Box::new(InquirePrompt::with_progress_bar(bar.clone()))
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use vcs_version::backend::Backend;
use vcs_version::config::{self, Config};
use vcs_version::domain::Increment;
use vcs_version::plugin;
use vcs_version::registry::{detect_markers, Registry};
use vcs_version::ui::{self, BackendReport};
use vcs_version::versioning::Versioning;

#[derive(Parser)]
#[command(
    name = "vcs-version",
    version,
    about = "Compute package versions and file lists from version control"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = ".", help = "Repository location")]
    location: PathBuf,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current version (the default command)
    Version {
        #[arg(short, long, help = "Component to bump: major, minor or patch")]
        increment: Option<Increment>,
    },
    /// Print the version expected to follow the latest release
    Next {
        #[arg(short, long, help = "Component to bump: major, minor or patch")]
        increment: Option<Increment>,
    },
    /// List tracked files, including sub-repositories
    Files,
    /// List repository tags, most recent first
    Tags {
        #[arg(long, help = "Only tags reachable from the revision")]
        ancestral: bool,

        #[arg(long, help = "Revision for --ancestral (default: working copy parent)")]
        rev: Option<String>,
    },
    /// Show every backend and which one is selected
    Backends,
    /// Describe the working copy relative to the latest numbered tag
    Describe,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match config::load_config(args.config.as_deref(), &args.location) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let command = args.command.unwrap_or(Command::Version { increment: None });
    if let Err(e) = run(command, &args.location, config) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Command, location: &Path, mut config: Config) -> Result<()> {
    match command {
        Command::Version { increment } => {
            if let Some(increment) = increment {
                config.versioning.increment = increment;
            }
            let version = plugin::calculate_version(location, &config)?;
            println!("{}", version);
        }
        Command::Next { increment } => {
            let manager = select(location, &config)?;
            let next = manager
                .get_next_version(increment.or(Some(config.versioning.increment)))
                .context("Cannot infer the next version")?;
            println!("{}", next);
        }
        Command::Files => {
            let files = plugin::file_finder(location, &config);
            ui::display_files(&files);
        }
        Command::Tags { ancestral, rev } => {
            let manager = select(location, &config)?;
            let tags = if ancestral {
                manager.get_ancestral_tags(rev.as_deref())?
            } else {
                manager.get_repo_tags()?
            };
            ui::display_tags(&tags);
        }
        Command::Backends => {
            let registry = Registry::new(&config.backends);
            let mut reports: Vec<BackendReport> = registry
                .candidates(location)
                .iter()
                .map(|backend| report(backend.as_ref()))
                .collect();
            reports.sort_by(|a, b| b.valid.cmp(&a.valid).then(b.priority.cmp(&a.priority)));
            ui::display_backends(&reports);

            let markers = detect_markers(location);
            if markers.is_empty() {
                ui::display_status(&format!("No repository marker at {}", location.display()));
            } else {
                ui::display_status(&format!(
                    "Repository markers at {}: {}",
                    location.display(),
                    markers.join(", ")
                ));
            }
        }
        Command::Describe => {
            let manager = select(location, &config)?;
            let description = manager.describe_version()?;
            ui::display_description(&description);
        }
    }
    Ok(())
}

fn select(location: &Path, config: &Config) -> Result<Box<dyn Backend>> {
    let manager = Registry::new(&config.backends).get_first_valid_manager(location)?;
    log::info!("using the {} backend at {}", manager.name(), location.display());
    Ok(manager)
}

fn report(backend: &dyn Backend) -> BackendReport {
    let valid = backend.is_valid();
    BackendReport {
        name: backend.name(),
        priority: backend.priority(),
        valid,
        tool_version: backend.tool_version().map(|v| v.to_string()),
        root: if valid { backend.find_root() } else { None },
    }
}

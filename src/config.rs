// Configuration module: command line flags and environment variables are
// resolved into a single `Settings` value that the rest of the CLI reads.

use clap::Parser;
use std::path::PathBuf;

/// Command line surface. Every flag also has an environment variable so
/// a shell profile can pin the archive location once.
#[derive(Parser, Debug)]
#[command(version, about = "Back up and restore OP-1 projects.")]
pub struct Cli {
    /// Directory holding one folder per project.
    #[arg(long, env = "OP1MGR_PROJECTS_DIR", value_name = "PATH")]
    pub projects_dir: Option<PathBuf>,

    /// Mount point to probe before the usual removable volume locations.
    #[arg(long, env = "OP1MGR_DEVICE", value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub projects_dir: PathBuf,
    pub device: Option<PathBuf>,
    pub verbose: u8,
}

impl Settings {
    /// Parse the process arguments and environment.
    pub fn from_args() -> Self {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Self {
        Settings {
            projects_dir: cli.projects_dir.unwrap_or_else(default_projects_dir),
            device: cli.device,
            verbose: cli.verbose,
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// `<home>/OP-1/projects`, or a relative `OP-1/projects` when no home
/// directory can be determined.
pub fn default_projects_dir() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join("OP-1").join("projects")
}

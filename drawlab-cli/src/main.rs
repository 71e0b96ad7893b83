// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Drawlab CLI - open and save diagrams stored in GitLab.
//!
//! Paths are handle paths: `group/…/project/ref/path/to/file`.
//!
//! # Examples
//!
//! ```bash
//! # Sign in and remember the token
//! drawlab login --remember
//!
//! # Download a diagram
//! drawlab get acme/design/diagrams/main/flows/login.drawio --out login.drawio
//!
//! # Upload it again
//! drawlab put acme/design/diagrams/main/flows/login.drawio login.drawio -m "Update login flow" --overwrite
//!
//! # Browse
//! drawlab ls acme/design/diagrams/main/flows
//! drawlab branches acme/design/diagrams
//! ```

mod app;
mod commands;
mod launcher;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use drawlab_fetch::FetchError;
use drawlab_gitlab::GitLabError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{auth, browse, config, files};

// ============================================================================
// CLI Definition
// ============================================================================

/// Drawlab CLI - diagrams stored in GitLab.
#[derive(Parser)]
#[command(name = "drawlab")]
#[command(about = "Open and save diagrams stored in GitLab repositories")]
#[command(long_about = r"
Drawlab reads and writes single files in GitLab repositories.

Files are addressed by handle paths:

  group/subgroup/project/ref/path/to/file.drawio

The position of the ref is found automatically; group paths may be nested
and refs may contain percent-encoded slashes (feature%2Fx).

Configuration is read from the config file (see `drawlab config path`) and
the DRAWLAB_GITLAB_URL, DRAWLAB_GITLAB_CLIENT_ID and
DRAWLAB_GITLAB_REDIRECT_URI environment variables.
")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Sign in to GitLab.
    Login(auth::LoginArgs),

    /// Sign out and forget the remembered token.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Download a file.
    Get(files::GetArgs),

    /// Upload a file, creating it if it does not exist.
    Put(files::PutArgs),

    /// Check whether a file exists.
    Exists(files::ExistsArgs),

    /// List a folder.
    Ls(browse::LsArgs),

    /// List branches of a project.
    Branches(browse::BranchesArgs),

    /// List projects of a group or of the signed-in user.
    Projects(browse::ProjectsArgs),

    /// List groups of the signed-in user.
    Groups(browse::PageArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// File or project not found.
    NotFound = 2,
    /// Edit conflict.
    Conflict = 3,
    /// Timeout.
    Timeout = 4,
    /// Sign-in failed or was declined.
    Unauthorized = 5,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    pub fn for_error(error: &anyhow::Error) -> Self {
        let fetch = error
            .downcast_ref::<GitLabError>()
            .and_then(|e| match e {
                GitLabError::Fetch(f) => Some(f),
                _ => None,
            })
            .or_else(|| error.downcast_ref::<FetchError>());

        match fetch {
            Some(e) if e.is_not_found() => Self::NotFound,
            Some(e) if e.is_conflict() => Self::Conflict,
            Some(FetchError::Timeout(_)) => Self::Timeout,
            Some(e) if e.retry_action().is_some() => Self::Unauthorized,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("drawlab=debug,info")
    } else {
        let level = drawlab_store::Config::load()
            .map(|c| c.general.log_level)
            .unwrap_or_else(|_| "warn".to_string());
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("drawlab={level}")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Login(args) => auth::login(args, &cli).await,
        Commands::Logout => auth::logout(&cli).await,
        Commands::Whoami => auth::whoami(&cli).await,
        Commands::Get(args) => files::get(args, &cli).await,
        Commands::Put(args) => files::put(args, &cli).await,
        Commands::Exists(args) => files::exists(args, &cli).await,
        Commands::Ls(args) => browse::ls(args, &cli).await,
        Commands::Branches(args) => browse::branches(args, &cli).await,
        Commands::Projects(args) => browse::projects(args, &cli).await,
        Commands::Groups(args) => browse::groups(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli),
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}

//! Config command - show configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use drawlab_store::{Config, default_config_path, default_ref_cache_path};

use super::print_json;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration, environment overrides applied.
    Show,

    /// Show configuration and cache paths.
    Path,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_paths(cli),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.format {
        OutputFormat::Text => {
            let or_unset = |v: &str| if v.is_empty() { "(not set)".to_string() } else { v.to_string() };

            println!("Drawlab Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("GitLab URL:     {}", config.gitlab.url);
            println!("Client id:      {}", or_unset(&config.gitlab.client_id));
            println!("Redirect URI:   {}", or_unset(&config.gitlab.redirect_uri));
            println!("Scope:          {}", config.gitlab.scope);
            println!();
            println!("Timeout:        {}s", config.general.timeout_secs);
            println!("Remember token: {}", config.general.remember_token);
            println!("Log level:      {}", config.general.log_level);
        }
        OutputFormat::Json => print_json(cli, &config)?,
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_path = default_config_path();
    let cache_path = default_ref_cache_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Config file:    {}", config_path.display());
            println!("Ref cache:      {}", cache_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "configFile": config_path.display().to_string(),
                "refCache": cache_path.display().to_string(),
            });
            print_json(cli, &paths)?;
        }
    }

    Ok(())
}

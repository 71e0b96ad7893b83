//! Sign-in commands.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{print_json, text};
use crate::app::App;
use crate::{Cli, OutputFormat};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    /// Remember the token in the system keychain.
    #[arg(long)]
    pub remember: bool,
}

/// Runs the authorization flow and shows who signed in.
pub async fn login(args: &LoginArgs, cli: &Cli) -> Result<()> {
    let app = App::open(args.remember.then_some(true)).await?;

    app.storage.session().authenticate().await?;
    let identity = app.storage.identity().await?;
    info!(user = %identity.username, "Signed in");

    match cli.format {
        OutputFormat::Text => println!("Signed in as {}", text(cli).format_identity(&identity)),
        OutputFormat::Json => print_json(cli, &identity)?,
    }
    Ok(())
}

/// Signs out and removes the remembered token.
pub async fn logout(cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    app.storage.logout().await?;

    match cli.format {
        OutputFormat::Text => println!("Signed out"),
        OutputFormat::Json => print_json(cli, &serde_json::json!({ "signedOut": true }))?,
    }
    Ok(())
}

/// Shows the signed-in user, signing in first if needed.
pub async fn whoami(cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let identity = app.storage.identity().await?;

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_identity(&identity)),
        OutputFormat::Json => print_json(cli, &identity)?,
    }
    Ok(())
}

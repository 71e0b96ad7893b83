//! Listing commands: ls, branches, projects, groups.

use anyhow::Result;
use clap::Args;

use super::text;
use crate::app::App;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Page selection shared by the listings.
#[derive(Args)]
pub struct PageArgs {
    /// Page to show, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

/// Arguments for the ls command.
#[derive(Args)]
pub struct LsArgs {
    /// Handle path of the folder, e.g. `group/project/ref/folder`.
    pub path: String,

    #[command(flatten)]
    pub page: PageArgs,
}

/// Arguments for the branches command.
#[derive(Args)]
pub struct BranchesArgs {
    /// Project path, e.g. `group/project`.
    pub project: String,

    #[command(flatten)]
    pub page: PageArgs,
}

/// Arguments for the projects command.
#[derive(Args)]
pub struct ProjectsArgs {
    /// List projects of this group id instead of your own.
    #[arg(long)]
    pub group: Option<u64>,

    #[command(flatten)]
    pub page: PageArgs,
}

/// Lists a folder.
pub async fn ls(args: &LsArgs, cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let folder = app.resolve(&args.path, true).await?;
    let page = app.storage.browser().tree(&folder, args.page.page).await?;

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_tree(&page)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_page(&page)?),
    }
    Ok(())
}

/// Lists branches of a project.
pub async fn branches(args: &BranchesArgs, cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let project = args.project.trim_matches('/');
    let page = app.storage.browser().branches(project, args.page.page).await?;

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_branches(&page)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_page(&page)?),
    }
    Ok(())
}

/// Lists projects of a group or of the signed-in user.
pub async fn projects(args: &ProjectsArgs, cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let browser = app.storage.browser();
    let page = match args.group {
        Some(id) => browser.group_projects(id, args.page.page).await?,
        None => browser.user_projects(args.page.page).await?,
    };

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_projects(&page)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_page(&page)?),
    }
    Ok(())
}

/// Lists groups of the signed-in user.
pub async fn groups(args: &PageArgs, cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let page = app.storage.browser().groups(args.page).await?;

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_groups(&page)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_page(&page)?),
    }
    Ok(())
}

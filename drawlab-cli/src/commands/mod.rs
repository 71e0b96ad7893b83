//! CLI command implementations.

pub mod auth;
pub mod browse;
pub mod config;
pub mod files;

use anyhow::Result;
use serde::Serialize;

use crate::Cli;
use crate::output::{JsonFormatter, TextFormatter};

/// Text formatter honoring `--no-color`.
pub fn text(cli: &Cli) -> TextFormatter {
    TextFormatter::new(!cli.no_color)
}

/// Prints `data` as JSON honoring `--pretty`.
pub fn print_json<T: Serialize + ?Sized>(cli: &Cli, data: &T) -> Result<()> {
    println!("{}", JsonFormatter::new(cli.pretty).format(data)?);
    Ok(())
}

//! Output formatting for CLI.

mod json;
mod text;

pub use json::{ExistsOutput, FileOutput, JsonFormatter, WriteOutput};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;

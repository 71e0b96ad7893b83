//! File commands: get, put, exists.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use drawlab_gitlab::codec::{self, FileKind};
use drawlab_gitlab::{InsertOptions, WriteReceipt};
use tracing::{debug, info};

use super::{print_json, text};
use crate::app::{App, split_parent};
use crate::output::{ExistsOutput, FileOutput, WriteOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the get command.
#[derive(Args)]
pub struct GetArgs {
    /// Handle path of the file.
    pub path: String,

    /// Write the content to this file instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Open the file as a shape library.
    #[arg(long)]
    pub library: bool,
}

/// Arguments for the put command.
#[derive(Args)]
pub struct PutArgs {
    /// Handle path of the file.
    pub path: String,

    /// Local file to upload.
    pub file: PathBuf,

    /// Commit message.
    #[arg(long, short)]
    pub message: Option<String>,

    /// Replace the file if it already exists.
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments for the exists command.
#[derive(Args)]
pub struct ExistsArgs {
    /// Handle path of the file.
    pub path: String,
}

/// Downloads a file.
pub async fn get(args: &GetArgs, cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let handle = app.get_file(&args.path, args.library).await?;

    let Some(out) = &args.out else {
        match cli.format {
            OutputFormat::Text => println!("{}", handle.content),
            OutputFormat::Json => print_json(cli, &FileOutput::new(&handle, None))?,
        }
        return Ok(());
    };

    let bytes = content_bytes(&handle.content)?;
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    debug!(path = %out.display(), size = bytes.len(), "Saved");

    let saved_to = out.display().to_string();
    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_file(&handle, &saved_to, bytes.len())),
        OutputFormat::Json => print_json(cli, &FileOutput::new(&handle, Some(saved_to)))?,
    }
    Ok(())
}

/// Uploads a file, creating it when the path does not exist yet.
pub async fn put(args: &PutArgs, cli: &Cli) -> Result<()> {
    let (folder, name) =
        split_parent(&args.path).with_context(|| format!("'{}' is not a file path", args.path))?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let content = file_content(&name, bytes)?;

    let app = App::open(None).await?;

    let (receipt, created): (WriteReceipt, bool) = match app.get_file(&args.path, false).await {
        Ok(mut handle) => {
            if !args.overwrite {
                bail!("{} already exists; pass --overwrite to replace it", args.path);
            }
            let message = args.message.clone().unwrap_or_else(|| format!("Update {name}"));
            handle.content = content;
            (app.storage.save_file(&mut handle, true, &message).await?, false)
        }
        Err(e) if e.is_not_found() => {
            debug!(path = %args.path, "Not found, creating");
            let message = args.message.clone().unwrap_or_else(|| format!("Add {name}"));
            let folder_coord = app.resolve(&folder, true).await?;

            let options = InsertOptions {
                message: message.clone(),
                known_index: Some(folder_coord.ref_index),
                ..InsertOptions::default()
            };
            let mut handle = app.storage.insert_file(&folder, &name, &content, options).await?;
            let receipt = app.storage.save_file(&mut handle, false, &message).await?;
            app.remember(&handle.meta.coordinate()).await;
            (receipt, true)
        }
        Err(e) => return Err(e.into()),
    };

    info!(path = %args.path, created, diverged = receipt.is_diverged(), "Put finished");

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_write(&args.path, &receipt, created)),
        OutputFormat::Json => print_json(cli, &WriteOutput::new(&args.path, &receipt, created))?,
    }
    Ok(())
}

/// Checks whether a file exists.
pub async fn exists(args: &ExistsArgs, cli: &Cli) -> Result<()> {
    let app = App::open(None).await?;
    let existence = app.check_exists(&args.path).await?;

    match cli.format {
        OutputFormat::Text => println!("{}", text(cli).format_exists(&args.path, &existence)),
        OutputFormat::Json => print_json(cli, &ExistsOutput::new(&args.path, &existence))?,
    }
    Ok(())
}

/// Bytes to write locally for decoded handle content; image data URIs are
/// unpacked.
fn content_bytes(content: &str) -> Result<Vec<u8>> {
    match codec::data_uri_payload(content) {
        Some(payload) => Ok(codec::decode_bytes(payload)?),
        None => Ok(content.as_bytes().to_vec()),
    }
}

/// Handle content for a local file: images become data URIs, everything
/// else must be UTF-8 text.
fn file_content(name: &str, bytes: Vec<u8>) -> Result<String> {
    let kind = FileKind::from_name(name);
    match kind.mime() {
        Some(mime) => Ok(codec::data_uri(mime, &codec::encode_bytes(&bytes))),
        None => String::from_utf8(bytes).with_context(|| format!("{name} is not UTF-8 text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_content_text() {
        let content = file_content("a.drawio", b"<mxfile/>".to_vec()).unwrap();
        assert_eq!(content, "<mxfile/>");
    }

    #[test]
    fn test_file_content_image_roundtrips_bytes() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 255];
        let content = file_content("a.png", bytes.clone()).unwrap();

        assert!(content.starts_with("data:image/png;base64,"));
        assert_eq!(content_bytes(&content).unwrap(), bytes);
    }

    #[test]
    fn test_file_content_rejects_binary_text() {
        assert!(file_content("a.drawio", vec![0xff, 0xfe]).is_err());
    }
}

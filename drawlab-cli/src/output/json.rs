//! JSON output formatting.

use anyhow::Result;
use drawlab_core::FileHandle;
use drawlab_gitlab::{Existence, Page, WriteOutcome, WriteReceipt};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// An opened file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutput {
    pub path: String,
    pub org: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub ref_index: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub html_url: String,
    pub download_url: String,
    pub is_library: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileOutput {
    /// Builds the output; content is included only when not saved to a file.
    pub fn new(handle: &FileHandle, saved_to: Option<String>) -> Self {
        let meta = &handle.meta;
        Self {
            path: handle.handle_path(),
            org: meta.org.clone(),
            repo: meta.repo.clone(),
            reference: meta.reference.clone(),
            ref_index: meta.ref_index,
            name: meta.name.clone(),
            revision: meta.last_revision.as_ref().map(ToString::to_string),
            html_url: meta.html_url.clone(),
            download_url: meta.download_url.clone(),
            is_library: handle.is_library,
            content: saved_to.is_none().then(|| handle.content.clone()),
            saved_to,
        }
    }
}

/// Result of a write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutput {
    pub path: String,
    pub created: bool,
    pub revision: String,
    pub diverged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_revision: Option<String>,
}

impl WriteOutput {
    /// Builds the output from a receipt.
    pub fn new(path: &str, receipt: &WriteReceipt, created: bool) -> Self {
        let local_revision = match &receipt.outcome {
            WriteOutcome::WrittenButDiverged { local_revision, .. } => {
                local_revision.as_ref().map(ToString::to_string)
            }
            WriteOutcome::Written { .. } => None,
        };

        Self {
            path: path.to_string(),
            created,
            revision: receipt.remote_revision().to_string(),
            diverged: receipt.is_diverged(),
            local_revision,
        }
    }
}

/// Result of an existence check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsOutput {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl ExistsOutput {
    /// Builds the output.
    pub fn new(path: &str, existence: &Existence) -> Self {
        let (exists, revision) = match existence {
            Existence::Exists { revision } => (true, revision.as_ref().map(ToString::to_string)),
            Existence::Missing => (false, None),
        };
        Self {
            path: path.to_string(),
            exists,
            revision,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutput<'a, T: Serialize> {
    pub page: u32,
    pub has_more: bool,
    pub items: &'a [T],
}

impl<'a, T: Serialize> From<&'a Page<T>> for PageOutput<'a, T> {
    fn from(page: &'a Page<T>) -> Self {
        Self {
            page: page.page,
            has_more: page.has_more,
            items: &page.items,
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a page of a listing.
    pub fn format_page<T: Serialize>(&self, page: &Page<T>) -> Result<String> {
        self.format(&PageOutput::from(page))
    }
}

//! Text output formatting with colors.

use drawlab_core::{FileHandle, Identity};
use drawlab_gitlab::{Branch, Existence, Group, Page, Project, TreeEntry, WriteOutcome, WriteReceipt};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the summary of an opened file.
    pub fn format_file(&self, handle: &FileHandle, saved_to: &str, bytes: usize) -> String {
        let meta = &handle.meta;
        let mut lines = vec![format!(
            "{} {}",
            self.green("✓"),
            self.bold(&handle.handle_path())
        )];

        lines.push(format!("  Saved to:  {saved_to} ({})", format_size(bytes)));
        lines.push(format!(
            "  Project:   {}",
            if meta.org.is_empty() {
                meta.repo.clone()
            } else {
                format!("{}/{}", meta.org, meta.repo)
            }
        ));
        lines.push(format!("  Ref:       {} {}", meta.reference, self.dim(&format!("(index {})", meta.ref_index))));
        if let Some(revision) = &meta.last_revision {
            lines.push(format!("  Revision:  {}", short_revision(revision.as_str())));
        }
        if handle.is_library {
            lines.push(format!("  {}", self.cyan("Shape library")));
        }
        lines.push(format!("  {}", self.dim(&meta.html_url)));

        lines.join("\n")
    }

    /// Formats the result of a write.
    pub fn format_write(&self, path: &str, receipt: &WriteReceipt, created: bool) -> String {
        let verb = if created { "Created" } else { "Updated" };

        match &receipt.outcome {
            WriteOutcome::Written { revision } => format!(
                "{} {verb} {} {}",
                self.green("✓"),
                self.bold(path),
                self.dim(&format!("@ {}", short_revision(revision.as_str())))
            ),
            WriteOutcome::WrittenButDiverged {
                local_revision,
                remote_revision,
            } => {
                let base = local_revision
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |r| short_revision(r.as_str()));
                format!(
                    "{} {verb} {}, but the stored content differs from what was sent.\n  \
                     Someone else changed the file. Based on {base}, now at {}.",
                    self.yellow("!"),
                    self.bold(path),
                    short_revision(remote_revision.as_str())
                )
            }
        }
    }

    /// Formats an existence check.
    pub fn format_exists(&self, path: &str, existence: &Existence) -> String {
        match existence {
            Existence::Exists { revision } => {
                let revision = revision
                    .as_ref()
                    .map(|r| format!(" {}", self.dim(&format!("@ {}", short_revision(r.as_str())))))
                    .unwrap_or_default();
                format!("{} {path}{revision}", self.green("exists"))
            }
            Existence::Missing => format!("{} {path}", self.red("missing")),
        }
    }

    /// Formats the signed-in user.
    pub fn format_identity(&self, identity: &Identity) -> String {
        format!("{} {}", self.bold(&identity.username), self.dim(&format!("(id {})", identity.id)))
    }

    /// Formats a folder listing; folders first.
    pub fn format_tree(&self, page: &Page<TreeEntry>) -> String {
        let mut entries: Vec<&TreeEntry> = page.items.iter().collect();
        entries.sort_by_key(|e| (!e.is_folder(), e.name.to_lowercase()));

        let lines = entries
            .iter()
            .map(|e| {
                if e.is_folder() {
                    self.blue(&format!("{}/", e.name))
                } else {
                    e.name.clone()
                }
            })
            .collect();
        self.with_footer(lines, page)
    }

    /// Formats a branch listing.
    pub fn format_branches(&self, page: &Page<Branch>) -> String {
        let lines = page
            .items
            .iter()
            .map(|b| {
                if b.default {
                    format!("{} {}", b.name, self.dim("(default)"))
                } else {
                    b.name.clone()
                }
            })
            .collect();
        self.with_footer(lines, page)
    }

    /// Formats a project listing.
    pub fn format_projects(&self, page: &Page<Project>) -> String {
        let lines = page
            .items
            .iter()
            .map(|p| match &p.default_branch {
                Some(branch) => format!("{} {}", p.path_with_namespace, self.dim(&format!("[{branch}]"))),
                None => format!("{} {}", p.path_with_namespace, self.dim("(empty)")),
            })
            .collect();
        self.with_footer(lines, page)
    }

    /// Formats a group listing.
    pub fn format_groups(&self, page: &Page<Group>) -> String {
        let lines = page
            .items
            .iter()
            .map(|g| format!("{} {}", g.full_path, self.dim(&format!("(id {})", g.id))))
            .collect();
        self.with_footer(lines, page)
    }

    fn with_footer<T>(&self, mut lines: Vec<String>, page: &Page<T>) -> String {
        if lines.is_empty() {
            lines.push(self.dim("(empty)"));
        }
        if page.has_more {
            lines.push(self.dim(&format!("… more with --page {}", page.page + 1)));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color Helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// First 8 characters of a commit id.
pub fn short_revision(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Human-readable byte count.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

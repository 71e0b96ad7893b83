//! CLI output formatting tests.

use drawlab_core::{FileHandle, FileMeta, RevisionToken};
use drawlab_gitlab::{Branch, Existence, FileResponse, Page, TreeEntry, TreeEntryKind, WriteOutcome, WriteReceipt};

fn handle() -> FileHandle {
    FileHandle::new(
        FileMeta {
            org: "acme/design".to_string(),
            repo: "diagrams".to_string(),
            reference: "main".to_string(),
            name: "a.drawio".to_string(),
            path: "flows/a.drawio".to_string(),
            html_url: "https://gitlab.example.com/acme/design/diagrams/blob/main/flows/a.drawio".to_string(),
            download_url: "https://gitlab.example.com/acme/design/diagrams/raw/main/flows/a.drawio?inline=false"
                .to_string(),
            last_revision: Some(RevisionToken::new("0123456789abcdef")),
            ref_index: 3,
            is_new: false,
        },
        "<mxfile/>",
    )
}

fn receipt(outcome: WriteOutcome) -> WriteReceipt {
    WriteReceipt {
        outcome,
        remote: FileResponse {
            file_name: "a.drawio".to_string(),
            file_path: "flows/a.drawio".to_string(),
            encoding: Some("base64".to_string()),
            content: String::new(),
            last_commit_id: Some("fedcba9876543210".to_string()),
            reference: Some("main".to_string()),
        },
    }
}

fn diverged() -> WriteReceipt {
    receipt(WriteOutcome::WrittenButDiverged {
        local_revision: Some(RevisionToken::new("0123456789abcdef")),
        remote_revision: RevisionToken::new("fedcba9876543210"),
    })
}

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_size, short_revision};
    use super::*;

    #[test]
    fn test_short_revision() {
        assert_eq!(short_revision("0123456789abcdef"), "01234567");
        assert_eq!(short_revision("abc"), "abc");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_file() {
        let output = TextFormatter::new(false).format_file(&handle(), "a.drawio", 9);

        assert!(output.contains("acme/design/diagrams/main/flows/a.drawio"));
        assert!(output.contains("Project:   acme/design/diagrams"));
        assert!(output.contains("(index 3)"));
        assert!(output.contains("Revision:  01234567"));
        assert!(!output.contains('\x1b'));
    }

    #[test]
    fn test_format_write_clean() {
        let receipt = receipt(WriteOutcome::Written {
            revision: RevisionToken::new("fedcba9876543210"),
        });
        let output = TextFormatter::new(false).format_write("acme/diagrams/main/a.drawio", &receipt, true);

        assert_eq!(output, "✓ Created acme/diagrams/main/a.drawio @ fedcba98");
    }

    #[test]
    fn test_format_write_diverged() {
        let output = TextFormatter::new(false).format_write("acme/diagrams/main/a.drawio", &diverged(), false);

        assert!(output.starts_with("! Updated"));
        assert!(output.contains("Based on 01234567, now at fedcba98"));
    }

    #[test]
    fn test_format_exists() {
        let formatter = TextFormatter::new(false);
        let exists = Existence::Exists {
            revision: Some(RevisionToken::new("0123456789abcdef")),
        };

        assert_eq!(formatter.format_exists("p", &exists), "exists p @ 01234567");
        assert_eq!(formatter.format_exists("p", &Existence::Missing), "missing p");
    }

    #[test]
    fn test_format_tree_folders_first() {
        let entry = |name: &str, kind| TreeEntry {
            id: "x".to_string(),
            name: name.to_string(),
            kind,
            path: name.to_string(),
        };
        let page = Page {
            items: vec![
                entry("b.drawio", TreeEntryKind::Blob),
                entry("flows", TreeEntryKind::Tree),
                entry("a.drawio", TreeEntryKind::Blob),
            ],
            page: 1,
            has_more: true,
        };

        let output = TextFormatter::new(false).format_tree(&page);
        assert_eq!(output, "flows/\na.drawio\nb.drawio\n… more with --page 2");
    }

    #[test]
    fn test_format_empty_listing() {
        let page: Page<Branch> = Page {
            items: vec![],
            page: 1,
            has_more: false,
        };
        assert_eq!(TextFormatter::new(false).format_branches(&page), "(empty)");
    }

    #[test]
    fn test_colors() {
        let output = TextFormatter::new(true).format_exists("p", &Existence::Missing);
        assert!(output.contains("\x1b[31m"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{ExistsOutput, FileOutput, JsonFormatter, WriteOutput};
    use super::*;

    #[test]
    fn test_file_output_with_content() {
        let json = JsonFormatter::new(false)
            .format(&FileOutput::new(&handle(), None))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["path"], "acme/design/diagrams/main/flows/a.drawio");
        assert_eq!(value["ref"], "main");
        assert_eq!(value["refIndex"], 3);
        assert_eq!(value["content"], "<mxfile/>");
        assert!(value.get("savedTo").is_none());
    }

    #[test]
    fn test_file_output_saved() {
        let output = FileOutput::new(&handle(), Some("a.drawio".to_string()));
        assert!(output.content.is_none());
        assert_eq!(output.saved_to.as_deref(), Some("a.drawio"));
    }

    #[test]
    fn test_write_output_diverged() {
        let output = WriteOutput::new("p", &diverged(), false);

        assert!(output.diverged);
        assert!(!output.created);
        assert_eq!(output.revision, "fedcba9876543210");
        assert_eq!(output.local_revision.as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_exists_output() {
        let json = JsonFormatter::new(false)
            .format(&ExistsOutput::new("p", &Existence::Missing))
            .unwrap();
        assert_eq!(json, r#"{"path":"p","exists":false}"#);
    }

    #[test]
    fn test_page_output() {
        let page = Page {
            items: vec![Branch {
                name: "main".to_string(),
                default: true,
            }],
            page: 2,
            has_more: false,
        };
        let json = JsonFormatter::new(false).format_page(&page).unwrap();
        assert_eq!(
            json,
            r#"{"page":2,"hasMore":false,"items":[{"name":"main","default":true}]}"#
        );
    }
}

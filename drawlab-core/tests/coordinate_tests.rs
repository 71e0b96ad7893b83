//! Integration tests for coordinates and file handles.

use drawlab_core::{
    FileHandle, FileMeta, RepositoryCoordinate, RevisionToken, split_handle_path,
};

#[test]
fn test_every_valid_index_reassembles_the_path() {
    let path = "acme/platform/tools/diagrams/release-1.2/docs/arch/overview.drawio";
    let tokens = split_handle_path(path);

    for index in 1..tokens.len() {
        let coord = RepositoryCoordinate::from_tokens(&tokens, index).unwrap();
        assert_eq!(coord.handle_path(), path, "index {index}");
        assert_eq!(coord.repository, tokens[index - 1]);
        assert_eq!(coord.reference, tokens[index]);
    }
}

#[test]
fn test_single_segment_project_has_no_organization() {
    let coord = RepositoryCoordinate::parse("diagrams/main/a.drawio", 1).unwrap();
    assert!(coord.organization.is_empty());
    assert_eq!(coord.project_path(), "diagrams");
}

#[test]
fn test_handle_serialization_roundtrip() {
    let meta = FileMeta {
        org: "acme".to_string(),
        repo: "diagrams".to_string(),
        reference: "main".to_string(),
        name: "a.drawio".to_string(),
        path: "a.drawio".to_string(),
        html_url: "https://gitlab.com/acme/diagrams/blob/main/a.drawio".to_string(),
        download_url: "https://gitlab.com/acme/diagrams/raw/main/a.drawio?inline=false"
            .to_string(),
        last_revision: Some(RevisionToken::new("c0ffee")),
        ref_index: 2,
        is_new: true,
    };
    let handle = FileHandle::new(meta, "<mxfile/>");

    let json = serde_json::to_string(&handle).unwrap();
    let parsed: FileHandle = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, handle);
    assert_eq!(parsed.handle_path(), "acme/diagrams/main/a.drawio");
}

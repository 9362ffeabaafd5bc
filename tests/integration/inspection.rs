//! Integration tests for document inspection and loading.

use pdfweave::document::{DocumentStatus, SourceFile};
use pdfweave::inspect::Inspector;
use pdfweave::{Config, ErrorKind};
use rstest::rstest;
use std::sync::Arc;
use tempfile::TempDir;

use crate::common::{encrypted_pdf, harness, tagged_pdf};

#[rstest]
#[case::single(1)]
#[case::few(5)]
#[case::many(25)]
#[tokio::test]
async fn test_page_count_matches_encoded_pages(#[case] pages: u32) {
    let info = Inspector::default()
        .inspect("doc.pdf", Arc::from(tagged_pdf(1, pages)))
        .await
        .unwrap();
    assert_eq!(info.page_count, pages);
}

#[tokio::test]
async fn test_non_pdf_is_rejected_before_parsing() {
    // A valid PDF body behind a stray byte is still not a PDF.
    let mut bytes = b" ".to_vec();
    bytes.extend(tagged_pdf(1, 1));

    let err = Inspector::default()
        .inspect("shifted.pdf", Arc::from(bytes))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotAPdf));
}

#[tokio::test]
async fn test_workspace_classifies_each_file() {
    let mut h = harness(Config::default());
    h.workspace.add_files([
        SourceFile::new("ok.pdf", tagged_pdf(1, 2)),
        SourceFile::new("locked.pdf", encrypted_pdf()),
        SourceFile::new("broken.pdf", b"%PDF-1.7\n1 0 obj".to_vec()),
        SourceFile::new("photo.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
    ]);
    h.workspace.inspect_pending().await;

    let statuses: Vec<DocumentStatus> = h
        .workspace
        .documents()
        .iter()
        .map(|d| d.status().clone())
        .collect();

    assert!(statuses[0].is_ready());
    assert_eq!(
        &statuses[1..],
        &[
            DocumentStatus::Failed(ErrorKind::PasswordProtected),
            DocumentStatus::Failed(ErrorKind::CorruptedOrInvalid),
            DocumentStatus::Failed(ErrorKind::NotAPdf),
        ]
    );

    // Failed documents get a placeholder per failure kind.
    let ids: Vec<_> = h.workspace.documents().iter().map(|d| d.id()).collect();
    assert!(h.workspace.error_preview(ids[0]).is_none());
    let locked = h.workspace.error_preview(ids[1]).unwrap();
    let broken = h.workspace.error_preview(ids[2]).unwrap();
    let foreign = h.workspace.error_preview(ids[3]).unwrap();
    assert_ne!(locked.jpeg, broken.jpeg);
    assert_eq!(broken.jpeg, foreign.jpeg);
}

#[tokio::test]
async fn test_load_sources_from_disk() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.pdf"), tagged_pdf(1, 1)).unwrap();
    std::fs::write(dir.path().join("b.pdf"), tagged_pdf(2, 3)).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a pdf").unwrap();

    let pattern = format!("{}/*.pdf", dir.path().display());
    let mut files = SourceFile::from_patterns([pattern]).await.unwrap();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);

    let single = SourceFile::from_path(dir.path().join("b.pdf")).await.unwrap();
    assert_eq!(single.bytes, tagged_pdf(2, 3));
}

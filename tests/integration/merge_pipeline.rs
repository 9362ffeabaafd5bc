//! Integration tests for selection, merging and delivery.

use pdfweave::document::{DocumentId, PageKey, SourceFile};
use pdfweave::merge::{MergeMode, MergeOptions, MergeRequest, MergeSource, Merger};
use pdfweave::output::{DirectorySink, Download, DownloadSink, deliver_with_release};
use pdfweave::workspace::MergeOutcome;
use pdfweave::{Config, ErrorKind, Workspace};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::{harness, page_contents, page_marker, render_document, tagged_pdf};

async fn two_documents(h: &mut crate::common::Harness) -> (DocumentId, DocumentId) {
    let ids = h.workspace.add_files([
        SourceFile::new("a.pdf", tagged_pdf(1, 3)),
        SourceFile::new("b.pdf", tagged_pdf(2, 2)),
    ]);
    h.workspace.inspect_pending().await;
    render_document(&mut h.workspace, ids[0]).await;
    render_document(&mut h.workspace, ids[1]).await;
    (ids[0], ids[1])
}

#[tokio::test]
async fn test_selection_merges_in_list_order() {
    let mut h = harness(Config::default());
    let (a, b) = two_documents(&mut h).await;

    // Selected as A:2, B:1, A:1.
    for key in [PageKey::new(a, 2), PageKey::new(b, 1), PageKey::new(a, 1)] {
        assert_eq!(h.workspace.toggle(key), Some(true));
    }

    let delivery = h.workspace.merge_selected(Some("report")).await.unwrap();
    assert_eq!(delivery.report.filename, "report.pdf");

    let staged = h.sink.get(delivery.ticket).unwrap();
    assert_eq!(
        page_contents(&staged.bytes),
        vec![page_marker(1, 2), page_marker(1, 1), page_marker(2, 1)]
    );
}

#[tokio::test]
async fn test_reordering_documents_changes_merge_order() {
    let mut h = harness(Config::default());
    let (a, b) = two_documents(&mut h).await;
    h.workspace.toggle(PageKey::new(a, 3));
    h.workspace.toggle(PageKey::new(b, 2));

    h.workspace.move_document(b, 0).unwrap();
    let delivery = h.workspace.merge_selected(None).await.unwrap();

    let staged = h.sink.get(delivery.ticket).unwrap();
    assert_eq!(
        page_contents(&staged.bytes),
        vec![page_marker(2, 2), page_marker(1, 3)]
    );
    assert!(
        delivery
            .report
            .filename
            .starts_with("merged-selected-pages-")
    );
}

#[tokio::test]
async fn test_all_pages_preserves_count_and_content() {
    let mut h = harness(Config::default());
    let id = h
        .workspace
        .add_files([SourceFile::new("a.pdf", tagged_pdf(4, 5))])[0];
    h.workspace.inspect_pending().await;

    let outcome = h.workspace.merge_all(Some("report.pdf"), |_| true).await.unwrap();
    let MergeOutcome::Delivered(delivery) = outcome else {
        panic!("merge was declined");
    };

    assert_eq!(delivery.report.filename, "report.pdf");
    assert_eq!(delivery.report.statistics.total_pages, 5);
    let staged = h.sink.get(delivery.ticket).unwrap();
    let expected: Vec<Vec<u8>> = (1..=5).map(|page| page_marker(4, page)).collect();
    assert_eq!(page_contents(&staged.bytes), expected);
    assert!(h.workspace.pages(id).len() == 5);
}

#[tokio::test]
async fn test_declined_merge_all_delivers_nothing() {
    let mut h = harness(Config::default());
    let (a, _) = two_documents(&mut h).await;
    h.workspace.toggle(PageKey::new(a, 1));

    let outcome = h.workspace.merge_all(None, |_| false).await.unwrap();
    assert!(matches!(outcome, MergeOutcome::Declined));
    assert_eq!(h.sink.staged_count(), 0);
}

#[tokio::test]
async fn test_selected_pages_out_of_range_is_empty_result() {
    let request = MergeRequest {
        mode: MergeMode::SelectedPages,
        sources: vec![MergeSource {
            document: DocumentId::new(),
            name: "a.pdf".to_string(),
            bytes: Arc::from(tagged_pdf(1, 2)),
            pages: vec![3, 4, 10],
        }],
        options: MergeOptions::default(),
    };

    let err = Merger::default().merge(request).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EmptyResult));
}

#[tokio::test]
async fn test_failed_source_is_skipped_with_diagnostic() {
    let mut h = harness(Config::default());
    h.workspace.add_files([
        SourceFile::new("a.pdf", tagged_pdf(1, 1)),
        SourceFile::new("b.pdf", tagged_pdf(2, 1)),
    ]);
    h.workspace.inspect_pending().await;

    // Corrupt b's bytes after inspection by merging a hand-built plan.
    let docs = h.workspace.documents();
    let mut request = MergeRequest::all_pages(docs, MergeOptions::default());
    request.sources[1].bytes = Arc::from(b"%PDF-1.4 truncated".to_vec());

    let merged = Merger::default().merge(request).await.unwrap();
    assert_eq!(merged.report.statistics.total_pages, 1);
    assert_eq!(merged.report.diagnostics.len(), 1);
    assert_eq!(merged.report.diagnostics[0].name, "b.pdf");
    assert_eq!(
        merged.report.diagnostics[0].kind,
        ErrorKind::CorruptedOrInvalid
    );
}

#[tokio::test(start_paused = true)]
async fn test_download_released_after_delay() {
    let config = Config {
        download_release_delay_ms: 5_000,
        ..Config::default()
    };
    let mut h = harness(config);
    h.workspace
        .add_files([SourceFile::new("a.pdf", tagged_pdf(1, 1))]);
    h.workspace.inspect_pending().await;

    let MergeOutcome::Delivered(delivery) =
        h.workspace.merge_all(None, |_| true).await.unwrap()
    else {
        panic!("merge was declined");
    };

    assert!(h.sink.is_staged(delivery.ticket));
    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(h.sink.is_staged(delivery.ticket));

    delivery.release.await.unwrap();
    assert!(!h.sink.is_staged(delivery.ticket));
}

#[tokio::test]
async fn test_directory_sink_receives_merge() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(DirectorySink::new(dir.path()));
    let mut workspace = Workspace::new(Config::default(), sink.clone()).unwrap();
    workspace.add_files([SourceFile::new("a.pdf", tagged_pdf(3, 2))]);
    workspace.inspect_pending().await;

    let MergeOutcome::Delivered(delivery) =
        workspace.merge_all(Some("bundle"), |_| true).await.unwrap()
    else {
        panic!("merge was declined");
    };

    let path = sink.path_of(delivery.ticket).unwrap();
    assert_eq!(path, dir.path().join("bundle.pdf"));
    let written = std::fs::read(&path).unwrap();
    assert_eq!(page_contents(&written).len(), 2);
}

#[tokio::test]
async fn test_deliver_with_release_to_custom_sink() {
    let dir = TempDir::new().unwrap();
    let sink: Arc<dyn DownloadSink> = Arc::new(DirectorySink::new(dir.path()));
    let (_, release) = deliver_with_release(
        sink,
        Download::pdf("x.pdf", tagged_pdf(1, 1)),
        Duration::from_millis(10),
    )
    .await
    .unwrap();

    release.await.unwrap();
    assert!(dir.path().join("x.pdf").exists());
}

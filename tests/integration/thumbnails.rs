//! Integration tests for thumbnail rendering, caching and scheduling.

use pdfweave::document::{PageKey, SourceFile};
use pdfweave::selection::RenderState;
use pdfweave::thumbnail::{CacheKey, Thumbnail, ThumbnailCache, ThumbnailRenderer, fingerprint};
use pdfweave::viewport::VisibilityEvent;
use pdfweave::{Config, ErrorKind};
use std::sync::Arc;

use crate::common::{CountingRasterizer, encrypted_pdf, harness, render_document, tagged_pdf};

fn thumb(marker: u8) -> Arc<Thumbnail> {
    Arc::new(Thumbnail {
        width: 1,
        height: 1,
        scale: 1.0,
        jpeg: vec![marker],
    })
}

#[test]
fn test_fifo_evicts_first_inserted_key() {
    let mut cache = ThumbnailCache::new(3);
    for page in 1..=3 {
        cache.insert(CacheKey::new("doc", page, 1.0), thumb(page as u8));
    }
    // Reads do not refresh.
    assert!(cache.get(&CacheKey::new("doc", 1, 1.0)).is_some());

    cache.insert(CacheKey::new("doc", 4, 1.0), thumb(4));

    assert_eq!(cache.len(), 3);
    assert!(!cache.contains(&CacheKey::new("doc", 1, 1.0)));
    for page in 2..=4 {
        assert!(cache.contains(&CacheKey::new("doc", page, 1.0)));
    }
}

#[test]
fn test_purge_is_selective() {
    let mut cache = ThumbnailCache::new(10);
    cache.insert(CacheKey::new("aaaa", 1, 1.0), thumb(1));
    cache.insert(CacheKey::new("aaaa", 2, 1.0), thumb(2));
    cache.insert(CacheKey::new("bbbb", 1, 1.0), thumb(3));

    assert_eq!(cache.purge_fingerprint("aaaa"), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&CacheKey::new("bbbb", 1, 1.0)));
}

#[tokio::test]
async fn test_cached_request_renders_once() {
    let config = Config::default();
    let backend = Arc::new(CountingRasterizer::default());
    let mut renderer = ThumbnailRenderer::with_rasterizer(&config, backend.clone());

    let bytes: Arc<[u8]> = Arc::from(tagged_pdf(1, 2));
    let fp = fingerprint::compute(&bytes, config.fingerprint_prefix_len);

    let first = renderer.render("a.pdf", bytes.clone(), &fp, 1).await.unwrap();
    let second = renderer.render("a.pdf", bytes, &fp, 1).await.unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_password_protected_never_reaches_rasterizer() {
    let mut h = harness(Config::default());
    let ids = h
        .workspace
        .add_files([SourceFile::new("locked.pdf", encrypted_pdf())]);
    h.workspace.inspect_pending().await;

    // Visibility events for pages the document would have had.
    let queued = h
        .workspace
        .on_visible((1..=3).map(|page| VisibilityEvent::from(PageKey::new(ids[0], page))));
    h.workspace.render_queued().await;

    assert_eq!(queued, 0);
    assert_eq!(h.backend.calls(), 0);
    assert!(h.workspace.pages(ids[0]).is_empty());
}

#[tokio::test]
async fn test_only_visible_pages_render() {
    let mut h = harness(Config::default());
    let id = h
        .workspace
        .add_files([SourceFile::new("long.pdf", tagged_pdf(1, 30))])[0];
    h.workspace.inspect_pending().await;

    // 300px slots with a 20px gap. Slot 3 starts at 660, inside the 50px margin.
    let slots = h.workspace.placeholders(300.0, 20.0);
    let viewport = h.workspace.viewport(0.0, 620.0);
    assert_eq!(h.workspace.update_viewport(&viewport, &slots), 3);
    h.workspace.render_queued().await;
    assert_eq!(h.backend.calls(), 3);

    // Same viewport again: nothing new.
    assert_eq!(h.workspace.update_viewport(&viewport, &slots), 0);

    let states: Vec<&str> = h
        .workspace
        .pages(id)
        .iter()
        .take(4)
        .map(|e| e.state().as_str())
        .collect();
    assert_eq!(states, vec!["ready", "ready", "ready", "not-started"]);
}

#[tokio::test]
async fn test_out_of_order_results_apply_by_page() {
    let mut h = harness(Config::default());
    let id = h
        .workspace
        .add_files([SourceFile::new("a.pdf", tagged_pdf(1, 2))])[0];
    h.workspace.inspect_pending().await;
    h.workspace.on_visible([
        VisibilityEvent::from(PageKey::new(id, 1)),
        VisibilityEvent::from(PageKey::new(id, 2)),
    ]);

    let first = h.workspace.next_render_task().unwrap();
    let second = h.workspace.next_render_task().unwrap();
    let (a, b) = (first.run().await, second.run().await);

    assert!(h.workspace.apply_render(b));
    assert!(h.workspace.apply_render(a));
    assert!(h.workspace.pages(id).iter().all(|e| e.is_ready()));
}

#[tokio::test]
async fn test_removed_document_results_are_discarded() {
    let mut h = harness(Config::default());
    let id = h
        .workspace
        .add_files([SourceFile::new("a.pdf", tagged_pdf(1, 1))])[0];
    h.workspace.inspect_pending().await;
    h.workspace
        .on_visible([VisibilityEvent::from(PageKey::new(id, 1))]);

    let task = h.workspace.next_render_task().unwrap();
    assert_eq!(
        h.workspace.page(task.key()).map(|e| e.state().clone()),
        Some(RenderState::Loading)
    );

    h.workspace.remove(id).unwrap();
    let outcome = task.run().await;

    assert!(!h.workspace.apply_render(outcome));
    assert!(h.workspace.renderer().cache().is_empty());
}

#[tokio::test]
async fn test_scale_applies_to_every_backend() {
    let mut config = Config::default();
    config.thumbnail.scale = 0.5;
    let mut h = harness(config.clone());
    let id = h
        .workspace
        .add_files([SourceFile::new("a.pdf", tagged_pdf(1, 1))])[0];
    h.workspace.inspect_pending().await;
    render_document(&mut h.workspace, id).await;

    let pages = h.workspace.pages(id);
    let thumb = pages[0].thumbnail().unwrap();
    assert_eq!((thumb.width, thumb.height), (93, 140));

    let mut renderer = ThumbnailRenderer::from_config(&config);
    let thumb = renderer
        .render("a.pdf", Arc::from(tagged_pdf(1, 1)), "fp", 1)
        .await
        .unwrap();
    assert_eq!((thumb.width, thumb.height), (93, 140));
    assert_eq!(thumb.mime_type(), "image/jpeg");

    let err = renderer
        .render("locked.pdf", Arc::from(encrypted_pdf()), "fp2", 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::PasswordProtected));
}

//! Shared helpers for the integration tests.
//!
//! Fixtures are built in memory with lopdf; every page paints one block whose
//! content stream identifies its document tag and page number.

#![allow(dead_code)]

use image::RgbImage;
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pdfweave::Config;
use pdfweave::document::DocumentId;
use pdfweave::output::MemorySink;
use pdfweave::thumbnail::{FitBox, RasterError, Rasterizer, ThumbnailRenderer};
use pdfweave::viewport::VisibilityEvent;
use pdfweave::workspace::Workspace;

/// Content stream identifying page `page` of document `tag`.
pub fn page_marker(tag: u8, page: u32) -> Vec<u8> {
    format!(
        "q 0.{} 0.{:02} 0.5 rg {} {} 120 160 re f Q",
        tag % 10,
        page % 100,
        20 + page % 40,
        40 + page % 60
    )
    .into_bytes()
}

/// Build a document with `pages` marked pages.
///
/// # Arguments
///
/// * `tag` - Distinguishes documents in merged output
/// * `pages` - Number of pages
pub fn tagged_document(tag: u8, pages: u32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (1..=pages)
        .map(|page| {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), page_marker(tag, page)));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 300.into()],
            "Resources" => Dictionary::new(),
        }
        .into(),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Serialize a document.
pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize fixture");
    bytes
}

/// Bytes of a [`tagged_document`].
pub fn tagged_pdf(tag: u8, pages: u32) -> Vec<u8> {
    to_bytes(tagged_document(tag, pages))
}

/// A one-page document declaring encryption no empty password opens.
pub fn encrypted_pdf() -> Vec<u8> {
    let mut doc = tagged_document(9, 1);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 5,
        "R" => 6,
        "Length" => 256,
        "P" => -1028,
        "O" => Object::String(vec![0x11u8; 48], StringFormat::Hexadecimal),
        "U" => Object::String(vec![0x22u8; 48], StringFormat::Hexadecimal),
        "OE" => Object::String(vec![0x33u8; 32], StringFormat::Hexadecimal),
        "UE" => Object::String(vec![0x44u8; 32], StringFormat::Hexadecimal),
        "Perms" => Object::String(vec![0x55u8; 16], StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(vec![0x01u8; 16], StringFormat::Hexadecimal),
            Object::String(vec![0x01u8; 16], StringFormat::Hexadecimal),
        ],
    );
    to_bytes(doc)
}

/// Content streams of every page of a PDF, in page order.
pub fn page_contents(bytes: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(bytes).expect("Output is not a readable PDF");
    doc.get_pages()
        .values()
        .map(|&id| doc.get_page_content(id).expect("Page has no content"))
        .collect()
}

/// Backend that counts calls and paints a blank page.
#[derive(Default)]
pub struct CountingRasterizer {
    calls: AtomicUsize,
}

impl CountingRasterizer {
    /// Number of renders so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Rasterizer for CountingRasterizer {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn render_fitted(&self, _pdf: &[u8], _page: u32, fit: FitBox) -> Result<RgbImage, RasterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = fit.fitted_size(200.0, 300.0);
        Ok(RgbImage::new(w, h))
    }
}

/// A workspace wired to a counting backend and an in-memory sink.
pub struct Harness {
    /// The workspace under test.
    pub workspace: Workspace,
    /// Where downloads land.
    pub sink: Arc<MemorySink>,
    /// Render counter.
    pub backend: Arc<CountingRasterizer>,
}

/// Build a [`Harness`] from a configuration.
pub fn harness(config: Config) -> Harness {
    let backend = Arc::new(CountingRasterizer::default());
    let sink = Arc::new(MemorySink::new());
    let renderer = ThumbnailRenderer::with_rasterizer(&config, backend.clone());
    let workspace =
        Workspace::with_renderer(config, renderer, sink.clone()).expect("Invalid test config");
    Harness {
        workspace,
        sink,
        backend,
    }
}

/// Mark every page of a document visible and render the queue.
pub async fn render_document(workspace: &mut Workspace, id: DocumentId) {
    let events: Vec<VisibilityEvent> = workspace
        .pages(id)
        .iter()
        .map(|entry| VisibilityEvent::from(entry.key()))
        .collect();
    workspace.on_visible(events);
    workspace.render_queued().await;
}

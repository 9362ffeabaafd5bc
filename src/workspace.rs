//! The working document list and everything hanging off it.
//!
//! A [`Workspace`] is what a UI drives: it owns the documents, the page
//! board, the render queue, the thumbnail renderer and the notice log.
//! Long-running steps are split into a task, which owns its inputs and can
//! be awaited anywhere, and an `apply_*` call that folds the outcome back in.
//! Outcomes for documents removed in the meantime are discarded.
//!
//! # Examples
//!
//! ```no_run
//! use pdfweave::config::Config;
//! use pdfweave::document::SourceFile;
//! use pdfweave::output::MemorySink;
//! use pdfweave::workspace::Workspace;
//! use std::sync::Arc;
//!
//! # async fn example(files: Vec<SourceFile>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut workspace = Workspace::new(Config::default(), Arc::new(MemorySink::new()))?;
//! workspace.add_files(files);
//! workspace.inspect_pending().await;
//!
//! let viewport = workspace.viewport(0.0, 800.0);
//! let slots = workspace.placeholders(280.0, 16.0);
//! workspace.update_viewport(&viewport, &slots);
//! workspace.render_queued().await;
//!
//! let delivery = workspace.merge_all(None, |_selected| true).await?;
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::document::{DocumentId, DocumentStatus, PageKey, SourceDocument, SourceFile};
use crate::error::{Error, ErrorKind, Result};
use crate::inspect::{DocumentInfo, Inspector};
use crate::merge::{MergeOptions, MergeReport, MergeRequest, Merger, ProgressCallback};
use crate::output::{
    Download, DownloadSink, DownloadTicket, Notice, NoticeLog, deliver_with_release,
    report_inspection, report_merge,
};
use crate::scheduler::RenderScheduler;
use crate::selection::{PageBoard, PageEntry, RenderFailure, RenderState, SelectionEntry};
use crate::thumbnail::{CacheKey, RenderJob, Thumbnail, ThumbnailRenderer};
use crate::viewport::{Placeholder, Viewport, VisibilityEvent, VisibilityTracker};

/// Inspection of one document, detached from the workspace.
pub struct InspectionTask {
    document: DocumentId,
    name: String,
    bytes: Arc<[u8]>,
    inspector: Inspector,
}

impl InspectionTask {
    /// Document being inspected.
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Run the inspection.
    pub async fn run(self) -> InspectionOutcome {
        let result = self.inspector.inspect(&self.name, self.bytes).await;
        InspectionOutcome {
            document: self.document,
            result,
        }
    }
}

/// Result of an [`InspectionTask`].
#[derive(Debug)]
pub struct InspectionOutcome {
    /// Document inspected.
    pub document: DocumentId,
    /// Inspection result.
    pub result: Result<DocumentInfo>,
}

/// Render of one page, detached from the workspace.
pub struct RenderTask {
    key: PageKey,
    job: RenderJob,
}

impl RenderTask {
    /// Page being rendered.
    pub fn key(&self) -> PageKey {
        self.key
    }

    /// Run the render.
    pub async fn run(self) -> RenderOutcome {
        let cache_key = self.job.key().clone();
        let result = self.job.run().await;
        RenderOutcome {
            key: self.key,
            cache_key,
            result,
        }
    }
}

/// Result of a [`RenderTask`].
#[derive(Debug)]
pub struct RenderOutcome {
    /// Page rendered.
    pub key: PageKey,
    /// Where the thumbnail is cached.
    pub cache_key: CacheKey,
    /// Render result.
    pub result: Result<Thumbnail>,
}

/// A merge handed to the download sink.
#[derive(Debug)]
pub struct MergeDelivery {
    /// Sink ticket.
    pub ticket: DownloadTicket,
    /// What was merged.
    pub report: MergeReport,
    /// Timer that releases the download.
    pub release: JoinHandle<()>,
}

/// Result of [`Workspace::merge_all`].
#[derive(Debug)]
pub enum MergeOutcome {
    /// Merged and delivered.
    Delivered(MergeDelivery),
    /// The user declined to discard the active selection.
    Declined,
}

/// Documents, pages, selection and thumbnails of one session.
pub struct Workspace {
    config: Config,
    inspector: Inspector,
    renderer: ThumbnailRenderer,
    merger: Merger,
    sink: Arc<dyn DownloadSink>,
    documents: Vec<SourceDocument>,
    board: PageBoard,
    scheduler: RenderScheduler,
    tracker: VisibilityTracker,
    notices: NoticeLog,
    error_previews: HashMap<DocumentId, Arc<Thumbnail>>,
}

impl Workspace {
    /// Create a workspace with the built-in wireframe renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: Config, sink: Arc<dyn DownloadSink>) -> Result<Self> {
        let renderer = ThumbnailRenderer::from_config(&config);
        Self::with_renderer(config, renderer, sink)
    }

    /// Create a workspace around an existing renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn with_renderer(
        config: Config,
        renderer: ThumbnailRenderer,
        sink: Arc<dyn DownloadSink>,
    ) -> Result<Self> {
        config.validate()?;
        info!(backend = renderer.backend(), "workspace ready");
        Ok(Self {
            inspector: Inspector::new(config.parse_timeout()),
            merger: Merger::from_config(&config),
            config,
            renderer,
            sink,
            documents: Vec::new(),
            board: PageBoard::new(),
            scheduler: RenderScheduler::new(),
            tracker: VisibilityTracker::new(),
            notices: NoticeLog::new(),
            error_previews: HashMap::new(),
        })
    }

    /// Report merge progress to `callback`.
    pub fn set_merge_progress(&mut self, callback: ProgressCallback) {
        self.merger = self.merger.clone().with_progress(callback);
    }

    /// Configuration in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The thumbnail renderer.
    pub fn renderer(&self) -> &ThumbnailRenderer {
        &self.renderer
    }

    // Documents

    /// Append files to the list. Returns their ids in order.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = SourceFile>) -> Vec<DocumentId> {
        let prefix_len = self.config.fingerprint_prefix_len;
        files
            .into_iter()
            .map(|file| {
                let doc = SourceDocument::new(file, prefix_len);
                let id = doc.id();
                debug!(document = doc.name(), %id, size = doc.size(), "document added");
                self.documents.push(doc);
                id
            })
            .collect()
    }

    /// Documents in list order.
    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    /// One document.
    pub fn document(&self, id: DocumentId) -> Option<&SourceDocument> {
        self.documents.iter().find(|d| d.id() == id)
    }

    /// Error placeholder of a document that failed inspection.
    pub fn error_preview(&self, id: DocumentId) -> Option<&Arc<Thumbnail>> {
        self.error_previews.get(&id)
    }

    fn position(&self, id: DocumentId) -> Result<usize> {
        self.documents
            .iter()
            .position(|d| d.id() == id)
            .ok_or(Error::UnknownDocument { id })
    }

    /// Remove a document with its pages, queued renders and cached thumbnails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDocument`] if the id is not in the list.
    pub fn remove(&mut self, id: DocumentId) -> Result<()> {
        let index = self.position(id)?;
        let doc = self.documents.remove(index);
        self.board.remove_document(id);
        self.scheduler.forget_document(id);
        self.tracker.forget_document(id);
        self.error_previews.remove(&id);
        let purged = self.renderer.purge(doc.fingerprint());
        debug!(document = doc.name(), %id, purged, "document removed");
        Ok(())
    }

    /// Remove every document and empty the cache.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.board.clear();
        self.scheduler.clear();
        self.tracker.reset();
        self.error_previews.clear();
        self.renderer.clear_cache();
        debug!("workspace cleared");
    }

    /// Move a document to `to` in the list, clamped to the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDocument`] if the id is not in the list.
    pub fn move_document(&mut self, id: DocumentId, to: usize) -> Result<()> {
        let from = self.position(id)?;
        let doc = self.documents.remove(from);
        let to = to.min(self.documents.len());
        self.documents.insert(to, doc);
        Ok(())
    }

    // Inspection

    /// Issue inspections for every pending document.
    pub fn inspection_tasks(&mut self) -> Vec<InspectionTask> {
        self.documents
            .iter_mut()
            .filter(|d| *d.status() == DocumentStatus::Pending)
            .map(|doc| {
                doc.set_status(DocumentStatus::Inspecting);
                InspectionTask {
                    document: doc.id(),
                    name: doc.name().to_string(),
                    bytes: doc.bytes(),
                    inspector: self.inspector.clone(),
                }
            })
            .collect()
    }

    /// Fold an inspection result in. Returns `false` if the document is gone.
    ///
    /// A ready document gets one `not-started` page entry per page.
    pub fn apply_inspection(&mut self, outcome: InspectionOutcome) -> bool {
        let Some(doc) = self
            .documents
            .iter_mut()
            .find(|d| d.id() == outcome.document)
        else {
            debug!(id = %outcome.document, "inspection result for removed document dropped");
            return false;
        };

        match outcome.result {
            Ok(info) => {
                report_inspection(&mut self.notices, doc.name(), info.page_count, &info.format_size());
                self.board.materialize(doc.id(), info.page_count);
                doc.set_status(DocumentStatus::Ready(info));
            }
            Err(e) => {
                let kind = e.kind().unwrap_or(ErrorKind::CorruptedOrInvalid);
                self.notices.push(Notice::error(&e));
                if let Some(preview) = self.renderer.placeholder(kind) {
                    self.error_previews.insert(doc.id(), preview);
                }
                doc.set_status(DocumentStatus::Failed(kind));
            }
        }
        true
    }

    /// Inspect every pending document. Returns how many results were applied.
    pub async fn inspect_pending(&mut self) -> usize {
        let tasks = self.inspection_tasks();
        let outcomes: Vec<InspectionOutcome> = stream::iter(tasks)
            .map(InspectionTask::run)
            .buffer_unordered(self.config.render_concurrency.max(1))
            .collect()
            .await;

        outcomes
            .into_iter()
            .map(|outcome| self.apply_inspection(outcome))
            .filter(|applied| *applied)
            .count()
    }

    // Pages and rendering

    /// Entries of one document in page order.
    pub fn pages(&self, id: DocumentId) -> Vec<&PageEntry> {
        self.board.pages_of(id).collect()
    }

    /// One page entry.
    pub fn page(&self, key: PageKey) -> Option<&PageEntry> {
        self.board.entry(key)
    }

    /// A viewport using the configured look-ahead margin.
    pub fn viewport(&self, scroll_top: f32, height: f32) -> Viewport {
        Viewport::new(scroll_top, height, self.config.look_ahead_margin)
    }

    /// Lay out every page entry in one column, documents in list order.
    pub fn placeholders(&self, slot_height: f32, gap: f32) -> Vec<Placeholder> {
        let keys = self
            .documents
            .iter()
            .flat_map(|doc| self.board.pages_of(doc.id()).map(PageEntry::key));
        Placeholder::column(keys, slot_height, gap)
    }

    /// Queue renders for pages that became visible. Returns how many were queued.
    pub fn on_visible(&mut self, events: impl IntoIterator<Item = VisibilityEvent>) -> usize {
        self.scheduler.extend(events, &self.board)
    }

    /// Compute visibility from a viewport and queue the newly visible pages.
    pub fn update_viewport(&mut self, viewport: &Viewport, placeholders: &[Placeholder]) -> usize {
        let events = self.tracker.update(viewport, placeholders);
        self.on_visible(events)
    }

    /// Renders waiting in the queue.
    pub fn pending_renders(&self) -> usize {
        self.scheduler.pending()
    }

    /// Take the next queued page that needs rendering.
    ///
    /// Cache hits are applied on the spot and skipped. The returned page is
    /// marked `loading`.
    pub fn next_render_task(&mut self) -> Option<RenderTask> {
        while let Some(key) = self.scheduler.next() {
            let not_started = self
                .board
                .entry(key)
                .is_some_and(|e| *e.state() == RenderState::NotStarted);
            let Some(doc) = self.documents.iter().find(|d| d.id() == key.document) else {
                continue;
            };
            if !not_started {
                continue;
            }

            if let Some(hit) = self.renderer.lookup(doc.fingerprint(), key.page) {
                debug!(page = %key, "thumbnail served from cache");
                self.board.complete(key, Ok(hit));
                continue;
            }

            let job = self
                .renderer
                .job(doc.name(), doc.bytes(), doc.fingerprint(), key.page);
            self.board.mark_loading(key);
            return Some(RenderTask { key, job });
        }
        None
    }

    /// Fold a render result in. Returns `false` if the page is gone or
    /// already settled; such results are not cached.
    pub fn apply_render(&mut self, outcome: RenderOutcome) -> bool {
        let RenderOutcome {
            key,
            cache_key,
            result,
        } = outcome;

        let pending = self
            .board
            .entry(key)
            .is_some_and(|e| matches!(e.state(), RenderState::NotStarted | RenderState::Loading));
        if !pending {
            debug!(page = %key, "render result for removed page dropped");
            return false;
        }

        match result {
            Ok(thumbnail) => {
                let thumbnail = Arc::new(thumbnail);
                self.renderer.store(cache_key, Arc::clone(&thumbnail));
                self.board.complete(key, Ok(thumbnail))
            }
            Err(e) => {
                let kind = e.kind().unwrap_or(ErrorKind::RenderFailed);
                let failure =
                    RenderFailure::from(&e).with_placeholder(self.renderer.placeholder(kind));
                self.board.complete(key, Err(failure))
            }
        }
    }

    /// Render everything queued, up to `render_concurrency` at a time.
    /// Returns how many results were applied, cache hits excluded.
    pub async fn render_queued(&mut self) -> usize {
        let mut tasks = Vec::new();
        while let Some(task) = self.next_render_task() {
            tasks.push(task);
        }

        let outcomes: Vec<RenderOutcome> = stream::iter(tasks)
            .map(RenderTask::run)
            .buffer_unordered(self.config.render_concurrency.max(1))
            .collect()
            .await;

        outcomes
            .into_iter()
            .map(|outcome| self.apply_render(outcome))
            .filter(|applied| *applied)
            .count()
    }

    // Selection

    /// Flip the selection of a ready page.
    pub fn toggle(&mut self, key: PageKey) -> Option<bool> {
        self.board.toggle(key)
    }

    /// Select every page of a document.
    pub fn select_all(&mut self, id: DocumentId) {
        self.board.select_all(id);
    }

    /// Deselect every page of a document.
    pub fn select_none(&mut self, id: DocumentId) {
        self.board.select_none(id);
    }

    /// Selected, ready pages in selection order.
    pub fn selection(&self) -> Vec<SelectionEntry> {
        self.board.selection()
    }

    // Merging

    /// Merge options with the configured compression.
    pub fn merge_options(&self, filename: Option<&str>) -> MergeOptions {
        MergeOptions {
            filename: filename.map(str::to_string),
            title: None,
            compress: self.config.compress_output,
        }
    }

    /// Merge the selection and deliver it.
    ///
    /// # Errors
    ///
    /// Returns `empty-result` if nothing is selected or nothing survives,
    /// or the sink's error.
    pub async fn merge_selected(&mut self, filename: Option<&str>) -> Result<MergeDelivery> {
        let options = self.merge_options(filename);
        self.merge_selected_with(options).await
    }

    /// [`Workspace::merge_selected`] with explicit options.
    ///
    /// # Errors
    ///
    /// See [`Workspace::merge_selected`].
    pub async fn merge_selected_with(&mut self, options: MergeOptions) -> Result<MergeDelivery> {
        let selection = self.board.selected_keys();
        let request = MergeRequest::from_selection(&self.documents, &selection, options);
        if request.is_empty() {
            let err = Error::empty_result("no pages selected");
            self.notices.push(Notice::error(&err));
            return Err(err);
        }
        self.run_merge(request).await
    }

    /// Merge every page of every ready document and deliver it.
    ///
    /// With an active selection, `confirm` is asked once with the number of
    /// selected pages; declining returns [`MergeOutcome::Declined`].
    ///
    /// # Errors
    ///
    /// Returns `empty-result` if no document contributes a page, or the
    /// sink's error.
    pub async fn merge_all<F>(&mut self, filename: Option<&str>, confirm: F) -> Result<MergeOutcome>
    where
        F: FnOnce(usize) -> bool,
    {
        let options = self.merge_options(filename);
        self.merge_all_with(options, confirm).await
    }

    /// [`Workspace::merge_all`] with explicit options.
    ///
    /// # Errors
    ///
    /// See [`Workspace::merge_all`].
    pub async fn merge_all_with<F>(&mut self, options: MergeOptions, confirm: F) -> Result<MergeOutcome>
    where
        F: FnOnce(usize) -> bool,
    {
        let selected = self.board.selection().len();
        if selected > 0 && !confirm(selected) {
            info!(selected, "merge of all pages declined");
            return Ok(MergeOutcome::Declined);
        }

        let request = MergeRequest::all_pages(&self.documents, options);
        if request.is_empty() {
            let err = Error::empty_result("no ready documents");
            self.notices.push(Notice::error(&err));
            return Err(err);
        }
        self.run_merge(request).await.map(MergeOutcome::Delivered)
    }

    async fn run_merge(&mut self, request: MergeRequest) -> Result<MergeDelivery> {
        let merged = match self.merger.merge(request).await {
            Ok(merged) => merged,
            Err(e) => {
                self.notices.push(Notice::error(&e));
                return Err(e);
            }
        };

        let download = Download::pdf(merged.report.filename.clone(), merged.bytes);
        let delivered = deliver_with_release(
            Arc::clone(&self.sink),
            download,
            self.config.download_release_delay(),
        )
        .await;

        match delivered {
            Ok((ticket, release)) => {
                report_merge(&mut self.notices, &merged.report);
                Ok(MergeDelivery {
                    ticket,
                    report: merged.report,
                    release,
                })
            }
            Err(e) => {
                self.notices.push(Notice::error(&e));
                Err(e)
            }
        }
    }

    // Notices

    /// Notices not yet drained.
    pub fn notices(&self) -> &[Notice] {
        self.notices.notices()
    }

    /// Take all notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }
}

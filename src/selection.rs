//! Per-page render status and ordered page selection.
//!
//! A [`PageBoard`] holds one [`PageEntry`] per page of every inspected
//! document. Render status only moves forward
//! (`not-started -> loading -> ready | failed`) and failures are terminal.
//! Selection is tracked in insertion order, which is the order pages are
//! merged in.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::document::{DocumentId, PageKey};
use crate::error::{Error, ErrorKind};
use crate::thumbnail::Thumbnail;

/// Why a page could not be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFailure {
    /// Classification.
    pub kind: ErrorKind,
    /// User-visible message.
    pub message: String,
    /// Error placeholder shown instead of the thumbnail.
    #[serde(skip)]
    pub placeholder: Option<Arc<Thumbnail>>,
}

impl RenderFailure {
    /// Attach an error placeholder.
    pub fn with_placeholder(mut self, placeholder: Option<Arc<Thumbnail>>) -> Self {
        self.placeholder = placeholder;
        self
    }
}

impl From<&Error> for RenderFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().unwrap_or(ErrorKind::RenderFailed),
            message: err.to_string(),
            placeholder: None,
        }
    }
}

/// Render status of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    /// No render issued yet.
    NotStarted,
    /// Render in flight.
    Loading,
    /// Thumbnail available.
    Ready(Arc<Thumbnail>),
    /// Render failed; terminal.
    Failed(RenderFailure),
}

impl RenderState {
    /// Short status tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// One page of one document.
#[derive(Debug, Clone)]
pub struct PageEntry {
    key: PageKey,
    state: RenderState,
    selected: bool,
}

impl PageEntry {
    fn new(key: PageKey) -> Self {
        Self {
            key,
            state: RenderState::NotStarted,
            selected: false,
        }
    }

    /// Page identity.
    pub fn key(&self) -> PageKey {
        self.key
    }

    /// Render status.
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Selection flag.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Thumbnail, present only when ready.
    pub fn thumbnail(&self) -> Option<&Arc<Thumbnail>> {
        match &self.state {
            RenderState::Ready(thumb) => Some(thumb),
            _ => None,
        }
    }

    /// Failure detail, present only when failed.
    pub fn failure(&self) -> Option<&RenderFailure> {
        match &self.state {
            RenderState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Image to show for the page: the thumbnail when ready, the error
    /// placeholder when failed.
    pub fn preview(&self) -> Option<&Arc<Thumbnail>> {
        match &self.state {
            RenderState::Ready(thumb) => Some(thumb),
            RenderState::Failed(failure) => failure.placeholder.as_ref(),
            _ => None,
        }
    }

    /// Check if the page has a thumbnail.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, RenderState::Ready(_))
    }
}

/// A selected, ready page with its position in the selection.
#[derive(Debug, Clone)]
pub struct SelectionEntry {
    /// 0-based position in selection order.
    pub position: usize,
    /// Page identity.
    pub key: PageKey,
    /// The page's thumbnail.
    pub thumbnail: Arc<Thumbnail>,
}

/// Page entries and selection order for a workspace.
#[derive(Debug, Default)]
pub struct PageBoard {
    entries: HashMap<PageKey, PageEntry>,
    pages: HashMap<DocumentId, Vec<PageKey>>,
    order: Vec<PageKey>,
}

impl PageBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `not-started` entries for pages `1..=page_count` of a document.
    ///
    /// Does nothing if the document already has entries.
    pub fn materialize(&mut self, document: DocumentId, page_count: u32) {
        if self.pages.contains_key(&document) {
            return;
        }
        let keys: Vec<PageKey> = (1..=page_count)
            .map(|page| PageKey::new(document, page))
            .collect();
        for key in &keys {
            self.entries.insert(*key, PageEntry::new(*key));
        }
        self.pages.insert(document, keys);
    }

    /// Drop every entry of a document, including its selection.
    pub fn remove_document(&mut self, document: DocumentId) {
        if let Some(keys) = self.pages.remove(&document) {
            for key in keys {
                self.entries.remove(&key);
            }
        }
        self.order.retain(|k| k.document != document);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pages.clear();
        self.order.clear();
    }

    /// Look up one page.
    pub fn entry(&self, key: PageKey) -> Option<&PageEntry> {
        self.entries.get(&key)
    }

    /// Entries of one document in page order.
    pub fn pages_of(&self, document: DocumentId) -> impl Iterator<Item = &PageEntry> {
        self.pages
            .get(&document)
            .into_iter()
            .flatten()
            .filter_map(|key| self.entries.get(key))
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the board holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `not-started -> loading`. Returns `false` for any other state.
    pub fn mark_loading(&mut self, key: PageKey) -> bool {
        match self.entries.get_mut(&key) {
            Some(entry) if entry.state == RenderState::NotStarted => {
                entry.state = RenderState::Loading;
                true
            }
            _ => false,
        }
    }

    /// Apply a render result. Only `not-started` and `loading` entries
    /// accept one; returns `false` if the entry is gone or already settled.
    pub fn complete(&mut self, key: PageKey, result: Result<Arc<Thumbnail>, RenderFailure>) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        if !matches!(entry.state, RenderState::NotStarted | RenderState::Loading) {
            return false;
        }
        entry.state = match result {
            Ok(thumb) => RenderState::Ready(thumb),
            Err(failure) => RenderState::Failed(failure),
        };
        true
    }

    /// Flip the selection of a ready page.
    ///
    /// Returns the new flag, or `None` if the page is unknown or not ready.
    pub fn toggle(&mut self, key: PageKey) -> Option<bool> {
        let entry = self.entries.get_mut(&key)?;
        if !entry.is_ready() {
            return None;
        }
        entry.selected = !entry.selected;
        if entry.selected {
            self.order.push(key);
        } else {
            self.order.retain(|k| *k != key);
        }
        Some(entry.selected)
    }

    /// Select every page of a document, appending newly selected pages in
    /// page order.
    pub fn select_all(&mut self, document: DocumentId) {
        let Some(keys) = self.pages.get(&document) else {
            return;
        };
        for key in keys {
            if let Some(entry) = self.entries.get_mut(key)
                && !entry.selected
            {
                entry.selected = true;
                self.order.push(*key);
            }
        }
    }

    /// Deselect every page of a document.
    pub fn select_none(&mut self, document: DocumentId) {
        if let Some(keys) = self.pages.get(&document) {
            for key in keys {
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.selected = false;
                }
            }
        }
        self.order.retain(|k| k.document != document);
    }

    /// Selected, ready pages in selection order.
    pub fn selection(&self) -> Vec<SelectionEntry> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .filter_map(|entry| entry.thumbnail().map(|t| (entry.key, Arc::clone(t))))
            .enumerate()
            .map(|(position, (key, thumbnail))| SelectionEntry {
                position,
                key,
                thumbnail,
            })
            .collect()
    }

    /// Keys of [`PageBoard::selection`].
    pub fn selected_keys(&self) -> Vec<PageKey> {
        self.selection().into_iter().map(|e| e.key).collect()
    }

    /// Check if any ready page is selected.
    pub fn has_selection(&self) -> bool {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .any(PageEntry::is_ready)
    }
}

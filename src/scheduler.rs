//! Render queue fed by visibility events.

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::document::{DocumentId, PageKey};
use crate::selection::{PageBoard, RenderState};
use crate::viewport::VisibilityEvent;

/// FIFO of pages waiting to be rendered.
///
/// A page is enqueued at most once over its lifetime, and only while its
/// entry is `not-started`.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    queue: VecDeque<PageKey>,
    enqueued: HashSet<PageKey>,
}

impl RenderScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue the page of one event. Returns `true` if it was queued.
    pub fn on_visible(&mut self, event: VisibilityEvent, board: &PageBoard) -> bool {
        let key = event.key;
        let eligible = board
            .entry(key)
            .is_some_and(|entry| *entry.state() == RenderState::NotStarted);

        if !eligible || !self.enqueued.insert(key) {
            return false;
        }
        trace!(page = %key, "render queued");
        self.queue.push_back(key);
        true
    }

    /// Enqueue a batch of events. Returns how many were queued.
    pub fn extend(&mut self, events: impl IntoIterator<Item = VisibilityEvent>, board: &PageBoard) -> usize {
        events
            .into_iter()
            .filter(|event| self.on_visible(*event, board))
            .count()
    }

    /// Next page to render.
    pub fn next(&mut self) -> Option<PageKey> {
        self.queue.pop_front()
    }

    /// Pages waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop queued and remembered pages of a removed document.
    pub fn forget_document(&mut self, document: DocumentId) {
        self.queue.retain(|k| k.document != document);
        self.enqueued.retain(|k| k.document != document);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.enqueued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(pages: u32) -> (PageBoard, DocumentId) {
        let mut board = PageBoard::new();
        let doc = DocumentId::new();
        board.materialize(doc, pages);
        (board, doc)
    }

    #[test]
    fn test_enqueue_once() {
        let (board, doc) = board(3);
        let mut scheduler = RenderScheduler::new();
        let key = PageKey::new(doc, 2);

        assert!(scheduler.on_visible(key.into(), &board));
        assert!(!scheduler.on_visible(key.into(), &board));
        assert_eq!(scheduler.next(), Some(key));

        // Still not re-queued after it was taken.
        assert!(!scheduler.on_visible(key.into(), &board));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_only_not_started_pages() {
        let (mut board, doc) = board(2);
        let mut scheduler = RenderScheduler::new();
        board.mark_loading(PageKey::new(doc, 1));

        assert!(!scheduler.on_visible(PageKey::new(doc, 1).into(), &board));
        assert!(!scheduler.on_visible(PageKey::new(doc, 9).into(), &board));
        assert!(scheduler.on_visible(PageKey::new(doc, 2).into(), &board));
    }

    #[test]
    fn test_fifo_and_forget() {
        let (board, doc) = board(4);
        let mut scheduler = RenderScheduler::new();
        let events = [3, 1, 4].map(|p| VisibilityEvent::from(PageKey::new(doc, p)));

        assert_eq!(scheduler.extend(events, &board), 3);
        assert_eq!(scheduler.next().map(|k| k.page), Some(3));
        assert_eq!(scheduler.pending(), 2);

        scheduler.forget_document(doc);
        assert!(scheduler.is_idle());
        assert!(scheduler.on_visible(PageKey::new(doc, 3).into(), &board));
    }
}

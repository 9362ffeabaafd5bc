//! Visibility events from a scrolling layout.
//!
//! Placeholders are laid out top to bottom. A placeholder is visible when it
//! intersects the viewport grown by the look-ahead margin on both sides.
//! [`VisibilityTracker`] reports each page the first time it becomes
//! visible and never again.

use std::collections::HashSet;

use crate::document::{DocumentId, PageKey};

/// A page came into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisibilityEvent {
    /// Page that became visible.
    pub key: PageKey,
}

impl From<PageKey> for VisibilityEvent {
    fn from(key: PageKey) -> Self {
        Self { key }
    }
}

/// Visible region of a scroll container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Scroll offset from the top of the content.
    pub scroll_top: f32,
    /// Visible height.
    pub height: f32,
    /// Look-ahead added above and below.
    pub margin: f32,
}

impl Viewport {
    /// Create a viewport.
    pub fn new(scroll_top: f32, height: f32, margin: f32) -> Self {
        Self {
            scroll_top,
            height,
            margin,
        }
    }

    /// Same viewport scrolled to `scroll_top`.
    pub fn scrolled_to(self, scroll_top: f32) -> Self {
        Self { scroll_top, ..self }
    }

    /// Check if the span `[top, top + height]` intersects the grown viewport.
    pub fn intersects(&self, top: f32, height: f32) -> bool {
        let start = self.scroll_top - self.margin;
        let end = self.scroll_top + self.height + self.margin;
        top + height >= start && top <= end
    }
}

/// Layout slot of one page entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placeholder {
    /// Page the slot belongs to.
    pub key: PageKey,
    /// Offset from the top of the content.
    pub top: f32,
    /// Slot height.
    pub height: f32,
}

impl Placeholder {
    /// Stack `keys` in one column of equal slots separated by `gap`.
    pub fn column(keys: impl IntoIterator<Item = PageKey>, height: f32, gap: f32) -> Vec<Self> {
        let mut top = gap;
        keys.into_iter()
            .map(|key| {
                let slot = Self { key, top, height };
                top += height + gap;
                slot
            })
            .collect()
    }
}

/// Turns viewport updates into one-shot visibility events.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    reported: HashSet<PageKey>,
}

impl VisibilityTracker {
    /// Create a tracker with nothing reported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report placeholders that are visible now and were never reported,
    /// in layout order.
    pub fn update(&mut self, viewport: &Viewport, placeholders: &[Placeholder]) -> Vec<VisibilityEvent> {
        placeholders
            .iter()
            .filter(|p| viewport.intersects(p.top, p.height))
            .filter(|p| self.reported.insert(p.key))
            .map(|p| VisibilityEvent::from(p.key))
            .collect()
    }

    /// Forget pages of a removed document.
    pub fn forget_document(&mut self, document: DocumentId) {
        self.reported.retain(|k| k.document != document);
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.reported.clear();
    }
}

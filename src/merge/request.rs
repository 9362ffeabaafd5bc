//! Merge requests: which pages of which documents, in what order.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::document::{DocumentId, PageKey, SourceDocument};

/// What a merge draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Selected pages only.
    SelectedPages,
    /// Every page of every ready document.
    AllPages,
}

impl MergeMode {
    /// Short tag for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectedPages => "selected-pages",
            Self::AllPages => "all-pages",
        }
    }
}

/// Output options of a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    /// Base name of the download; a default is generated when absent.
    pub filename: Option<String>,
    /// Title written to the output's Info dictionary.
    pub title: Option<String>,
    /// Compress content streams.
    pub compress: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            filename: None,
            title: None,
            compress: true,
        }
    }
}

impl MergeOptions {
    /// Options with a caller-supplied file name.
    pub fn named(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }
}

/// One document and the 1-based pages to take from it, in output order.
#[derive(Debug, Clone)]
pub struct MergeSource {
    /// Workspace id of the document.
    pub document: DocumentId,
    /// Display name, used in diagnostics.
    pub name: String,
    /// Raw bytes; reparsed by the merge job.
    pub bytes: Arc<[u8]>,
    /// Pages to copy.
    pub pages: Vec<u32>,
}

impl MergeSource {
    fn of(doc: &SourceDocument, pages: Vec<u32>) -> Self {
        Self {
            document: doc.id(),
            name: doc.name().to_string(),
            bytes: doc.bytes(),
            pages,
        }
    }
}

/// An ordered merge plan.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Where the pages come from.
    pub mode: MergeMode,
    /// Sources in visiting order.
    pub sources: Vec<MergeSource>,
    /// Output options.
    pub options: MergeOptions,
}

impl MergeRequest {
    /// Plan a merge of selected pages.
    ///
    /// The selection is partitioned by document; each document keeps the
    /// page order it has in `selection`. Documents are visited in the order
    /// of `documents`, not in selection order.
    pub fn from_selection(
        documents: &[SourceDocument],
        selection: &[PageKey],
        options: MergeOptions,
    ) -> Self {
        let sources = documents
            .iter()
            .filter_map(|doc| {
                let pages: Vec<u32> = selection
                    .iter()
                    .filter(|key| key.document == doc.id())
                    .map(|key| key.page)
                    .collect();
                (!pages.is_empty()).then(|| MergeSource::of(doc, pages))
            })
            .collect();

        Self {
            mode: MergeMode::SelectedPages,
            sources,
            options,
        }
    }

    /// Plan a merge of every page of every ready document, in list order.
    pub fn all_pages(documents: &[SourceDocument], options: MergeOptions) -> Self {
        let sources = documents
            .iter()
            .filter_map(|doc| {
                let page_count = doc.page_count()?;
                Some(MergeSource::of(doc, (1..=page_count).collect()))
            })
            .collect();

        Self {
            mode: MergeMode::AllPages,
            sources,
            options,
        }
    }

    /// Pages requested across all sources.
    pub fn page_total(&self) -> usize {
        self.sources.iter().map(|s| s.pages.len()).sum()
    }

    /// Check if the plan requests nothing.
    pub fn is_empty(&self) -> bool {
        self.page_total() == 0
    }
}

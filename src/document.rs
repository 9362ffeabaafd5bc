//! Source documents held by a workspace.
//!
//! A [`SourceFile`] is what the caller hands in: a display name and the raw
//! bytes. Once added to a workspace it becomes a [`SourceDocument`] with a
//! stable [`DocumentId`], a content fingerprint and an inspection status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};
use crate::inspect::DocumentInfo;
use crate::thumbnail::fingerprint;
use crate::utils::{collect_paths_for_patterns, format_file_size};

/// Stable identifier of a document within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of one page: its document and 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    /// Owning document.
    pub document: DocumentId,
    /// 1-based page number.
    pub page: u32,
}

impl PageKey {
    /// Create a page key.
    pub fn new(document: DocumentId, page: u32) -> Self {
        Self { document, page }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.page)
    }
}

/// A file handed in by the caller, not yet part of a workspace.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Display name, usually the original file name.
    pub name: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Wrap in-memory bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk. The display name is the file name component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { name, bytes })
    }

    /// Read every file matched by the given glob patterns, in match order.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is malformed or a matched file cannot
    /// be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfweave::document::SourceFile;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let files = SourceFile::from_patterns(["scans/*.pdf", "extra.pdf"]).await?;
    /// println!("Loaded {} file(s)", files.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn from_patterns<T>(patterns: T) -> Result<Vec<Self>>
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let paths = collect_paths_for_patterns(patterns)?;
        let mut files = Vec::with_capacity(paths.len());
        for path in paths.into_iter().filter(|p| p.is_file()) {
            files.push(Self::from_path(&path).await?);
        }
        Ok(files)
    }
}

/// Inspection state of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentStatus {
    /// Added, inspection not yet issued.
    Pending,
    /// Inspection in flight.
    Inspecting,
    /// Inspection succeeded.
    Ready(DocumentInfo),
    /// Inspection failed with this classification.
    Failed(ErrorKind),
}

impl DocumentStatus {
    /// Whether inspection succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// A document in the working list.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    id: DocumentId,
    name: String,
    bytes: Arc<[u8]>,
    fingerprint: String,
    status: DocumentStatus,
}

impl SourceDocument {
    /// Create a pending document from a source file.
    pub(crate) fn new(file: SourceFile, prefix_len: usize) -> Self {
        let fingerprint = fingerprint::compute(&file.bytes, prefix_len);
        Self {
            id: DocumentId::new(),
            name: file.name,
            bytes: Arc::from(file.bytes),
            fingerprint,
            status: DocumentStatus::Pending,
        }
    }

    /// Stable id.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Human-readable size.
    pub fn format_size(&self) -> String {
        format_file_size(self.size())
    }

    /// Shared handle to the raw payload.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Content fingerprint used as the thumbnail cache key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Inspection status.
    pub fn status(&self) -> &DocumentStatus {
        &self.status
    }

    /// Inspection result, if ready.
    pub fn info(&self) -> Option<&DocumentInfo> {
        match &self.status {
            DocumentStatus::Ready(info) => Some(info),
            _ => None,
        }
    }

    /// Page count, known only after a successful inspection.
    pub fn page_count(&self) -> Option<u32> {
        self.info().map(|info| info.page_count)
    }

    pub(crate) fn set_status(&mut self, status: DocumentStatus) {
        self.status = status;
    }

    /// Error for a page number outside this document, if it is one.
    pub(crate) fn check_page(&self, page: u32) -> Result<()> {
        let page_count = self.page_count().unwrap_or(0);
        if page == 0 || page > page_count {
            return Err(Error::PageOutOfRange {
                name: self.name.clone(),
                page,
                page_count,
            });
        }
        Ok(())
    }
}

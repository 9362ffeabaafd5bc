//! Document inspection.
//!
//! The inspector is the gate every added file passes through. It performs:
//! - `%PDF` signature check (no parse on failure)
//! - Bounded structural parse on the blocking pool
//! - Password and corruption classification
//! - Page count, version, first-page size and Info metadata extraction
//!
//! # Examples
//!
//! ```no_run
//! use pdfweave::inspect::Inspector;
//! use std::sync::Arc;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let inspector = Inspector::default();
//! let info = inspector.inspect("scan.pdf", Arc::from(bytes)).await?;
//! println!("PDF has {} pages", info.page_count);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::io::{PdfReader, page_geometry};
use crate::merge::metadata::MetadataManager;
use crate::utils::format_file_size;

/// Result of inspecting a single PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Number of pages, from the parsed page tree.
    pub page_count: u32,

    /// Title from the Info dictionary.
    pub title: Option<String>,

    /// Author from the Info dictionary.
    pub author: Option<String>,

    /// PDF version from the header, e.g. `"1.7"`.
    pub version: String,

    /// Displayed size (width, height) of the first page, in points.
    pub first_page_size: Option<(f32, f32)>,

    /// Size of the file in bytes.
    pub size: u64,
}

impl DocumentInfo {
    /// Summarize a parsed document.
    pub fn from_document(doc: &Document, size: u64) -> Self {
        let pages = doc.get_pages();
        let metadata = MetadataManager::new().get_metadata(doc);

        let first_page_size = pages
            .values()
            .next()
            .map(|&page_id| page_geometry(doc, page_id).display_size());

        Self {
            page_count: pages.len() as u32,
            title: metadata.title,
            author: metadata.author,
            version: doc.version.clone(),
            first_page_size,
            size,
        }
    }

    /// Format the file size as a human-readable string.
    pub fn format_size(&self) -> String {
        format_file_size(self.size)
    }
}

/// Inspector for PDF byte streams.
#[derive(Debug, Clone, Default)]
pub struct Inspector {
    reader: PdfReader,
}

impl Inspector {
    /// Create an inspector with the given parse limit.
    pub fn new(parse_timeout: Duration) -> Self {
        Self {
            reader: PdfReader::new(parse_timeout),
        }
    }

    /// Inspect one document.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name used in errors and logs
    /// * `bytes` - Raw document bytes
    ///
    /// # Errors
    ///
    /// Returns an error classified as exactly one of `not-a-pdf`,
    /// `password-protected`, `corrupted-or-invalid`, `timeout` or
    /// `unsupported-environment`.
    pub async fn inspect(&self, name: &str, bytes: Arc<[u8]>) -> Result<DocumentInfo> {
        debug!(document = name, size = bytes.len(), "inspecting");

        match self.reader.load(name, bytes).await {
            Ok(loaded) => {
                let info = DocumentInfo::from_document(&loaded.document, loaded.size);
                info!(
                    document = name,
                    pages = info.page_count,
                    version = %info.version,
                    load_ms = loaded.load_time.as_millis() as u64,
                    "inspected"
                );
                Ok(info)
            }
            Err(e) => {
                warn!(document = name, kind = ?e.kind(), "inspection failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{encrypted_pdf, sample_pdf};
    use rstest::rstest;

    #[tokio::test]
    async fn test_inspect_reports_page_count_and_metadata() {
        let bytes = sample_pdf(4);
        let size = bytes.len() as u64;
        let info = Inspector::default()
            .inspect("four.pdf", Arc::from(bytes))
            .await
            .unwrap();

        assert_eq!(info.page_count, 4);
        assert_eq!(info.title.as_deref(), Some("Sample 1"));
        assert_eq!(info.author.as_deref(), Some("Fixture"));
        assert_eq!(info.version, "1.5");
        assert_eq!(info.first_page_size, Some((200.0, 300.0)));
        assert_eq!(info.size, size);
    }

    #[rstest]
    #[case::plain_text(b"just some text".to_vec(), ErrorKind::NotAPdf)]
    #[case::empty(Vec::new(), ErrorKind::NotAPdf)]
    #[case::garbage_after_header(b"%PDF-1.4\ngarbage".to_vec(), ErrorKind::CorruptedOrInvalid)]
    #[case::encrypted(encrypted_pdf(), ErrorKind::PasswordProtected)]
    #[tokio::test]
    async fn test_inspect_classifies_failures(#[case] bytes: Vec<u8>, #[case] expected: ErrorKind) {
        let err = Inspector::default()
            .inspect("input", Arc::from(bytes))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(expected));
    }

    #[tokio::test]
    async fn test_error_message_names_file() {
        let err = Inspector::default()
            .inspect("holiday.jpg", Arc::from(b"\xFF\xD8\xFF".to_vec()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("holiday.jpg"));
    }

    #[test]
    fn test_from_document_counts_pages() {
        let doc = crate::testing::sample_document(7);
        let info = DocumentInfo::from_document(&doc, 1234);
        assert_eq!(info.page_count, 7);
        assert_eq!(info.format_size(), "1.21 KB");
    }
}

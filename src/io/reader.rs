//! PDF parsing with failure classification.
//!
//! Every parse goes through [`PdfReader`], which:
//! - Rejects input without the `%PDF` signature before touching the parser
//! - Runs the structural parse on tokio's blocking pool under a time limit
//! - Classifies failures as password protected or corrupted
//! - Rejects documents without pages
//!
//! # Examples
//!
//! ```no_run
//! use pdfweave::io::PdfReader;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new(Duration::from_secs(30));
//! let loaded = reader.load("report.pdf", Arc::from(bytes)).await?;
//! println!("{} has {} pages", loaded.name, loaded.page_count);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::debug;

use crate::environment::ensure_runtime;
use crate::error::{Error, Result};

/// ASCII signature every PDF byte stream starts with.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// A parsed PDF document.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The parsed document.
    pub document: Document,

    /// Display name of the source.
    pub name: String,

    /// Number of pages.
    pub page_count: u32,

    /// Time spent in the structural parse.
    pub load_time: Duration,

    /// Size of the source in bytes.
    pub size: u64,
}

/// Check the `%PDF` signature.
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_SIGNATURE)
}

/// Whether the raw bytes declare an encryption dictionary.
fn declares_encryption(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

/// Parse a PDF synchronously and classify any failure.
///
/// This is the blocking half of [`PdfReader::load`]; call it from a blocking
/// context only.
///
/// # Errors
///
/// Returns exactly one of:
/// - [`Error::NotAPdf`] when the signature is missing
/// - [`Error::PasswordProtected`] when the document needs a password
/// - [`Error::CorruptedPdf`] for any other parse failure, or zero pages
pub fn parse(name: &str, bytes: &[u8]) -> Result<Document> {
    if !has_pdf_signature(bytes) {
        return Err(Error::not_a_pdf(name));
    }

    let document = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            let message = e.to_string();
            let lowered = message.to_lowercase();
            debug!(document = name, error = %message, "structural parse failed");

            if lowered.contains("encrypt")
                || lowered.contains("password")
                || lowered.contains("decrypt")
                || declares_encryption(bytes)
            {
                return Err(Error::password_protected(name));
            }
            return Err(Error::corrupted_pdf(name, message));
        }
    };

    if document.is_encrypted() || document.trailer.has(b"Encrypt") {
        return Err(Error::password_protected(name));
    }

    if document.get_pages().is_empty() {
        return Err(Error::corrupted_pdf(name, "PDF has no pages"));
    }

    Ok(document)
}

/// PDF reader with a bounded parse duration.
#[derive(Debug, Clone)]
pub struct PdfReader {
    parse_timeout: Duration,
}

impl PdfReader {
    /// Create a reader that gives up on a parse after `parse_timeout`.
    pub fn new(parse_timeout: Duration) -> Self {
        Self { parse_timeout }
    }

    /// The configured parse limit.
    pub fn parse_timeout(&self) -> Duration {
        self.parse_timeout
    }

    /// Load one PDF from memory.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name used in errors
    /// * `bytes` - Raw document bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The bytes are not a PDF (no parse is attempted)
    /// - The PDF is password protected or corrupted
    /// - The parse exceeds the time limit
    /// - No tokio runtime is available
    pub async fn load(&self, name: &str, bytes: Arc<[u8]>) -> Result<LoadedPdf> {
        if !has_pdf_signature(&bytes) {
            return Err(Error::not_a_pdf(name));
        }
        ensure_runtime()?;

        let size = bytes.len() as u64;
        let owned_name = name.to_string();
        let start = Instant::now();

        let job = task::spawn_blocking(move || parse(&owned_name, &bytes));
        let document = match tokio::time::timeout(self.parse_timeout, job).await {
            Ok(Ok(parsed)) => parsed?,
            Ok(Err(join_err)) => {
                debug!(document = name, error = %join_err, "parse job aborted");
                return Err(Error::corrupted_pdf(name, join_err.to_string()));
            }
            Err(_) => {
                return Err(Error::timeout(name, "structural parse", self.parse_timeout));
            }
        };

        let page_count = document.get_pages().len() as u32;

        Ok(LoadedPdf {
            document,
            name: name.to_string(),
            page_count,
            load_time: start.elapsed(),
            size,
        })
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or
/// PDFDocEncoding).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }

    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }

    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

fn pdf_doc_char(byte: u8) -> char {
    const HIGH: [char; 33] = [
        '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}',
        '\u{2044}', '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}',
        '\u{201D}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}',
        '\u{0141}', '\u{0152}', '\u{0160}', '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}',
        '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}', '\u{20AC}',
    ];

    match byte {
        0x80..=0xA0 => HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

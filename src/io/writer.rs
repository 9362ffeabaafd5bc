//! PDF serialization.
//!
//! Merged documents never touch the filesystem here; they are serialized to
//! an in-memory byte stream and handed to a download sink.

use lopdf::Document;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::utils::format_file_size;

/// Options for serializing PDF documents.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Compress content streams before writing.
    pub compress: bool,

    /// Drop unreachable objects and renumber the rest.
    pub optimize: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compress: true,
            optimize: true,
        }
    }
}

/// Statistics about a serialization.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to serialize.
    pub write_time: Duration,

    /// Size of the output in bytes.
    pub size: u64,

    /// Whether compression was applied.
    pub compressed: bool,
}

impl WriteStatistics {
    /// Format output size as human-readable string.
    pub fn format_size(&self) -> String {
        format_file_size(self.size)
    }
}

/// PDF writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer without compression.
    pub fn without_compression() -> Self {
        Self {
            options: WriteOptions {
                compress: false,
                ..Default::default()
            },
        }
    }

    /// Serialize a document into memory.
    ///
    /// Blocking; run inside the merge job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if lopdf cannot serialize the document.
    pub fn to_bytes(&self, doc: &mut Document) -> Result<(Vec<u8>, WriteStatistics)> {
        let start = Instant::now();

        if self.options.optimize {
            doc.prune_objects();
            doc.renumber_objects();
        }

        if self.options.compress {
            doc.compress();
        }

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| Error::WriteFailed {
            reason: e.to_string(),
        })?;

        let stats = WriteStatistics {
            write_time: start.elapsed(),
            size: buffer.len() as u64,
            compressed: self.options.compress,
        };

        Ok((buffer, stats))
    }
}

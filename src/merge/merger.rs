//! Merge engine.
//!
//! Executes a [`MergeRequest`]: every source is reparsed from its bytes,
//! out-of-range pages are dropped, the remaining pages are copied in order
//! and the output is stamped and serialized. A source that fails to parse is
//! skipped with a diagnostic and the merge continues; only an output without
//! pages fails the whole merge.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::environment::ensure_runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::io::{PdfReader, PdfWriter, WriteOptions};
use crate::merge::metadata::{Metadata, MetadataManager};
use crate::merge::naming::output_filename;
use crate::merge::pages::{PageBatch, PageCopier};
use crate::merge::request::{MergeMode, MergeRequest};
use crate::utils::format_file_size;

/// Progress of a running merge, one event per source step.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeProgress {
    /// A source is about to be parsed.
    Started {
        /// Source name.
        name: String,
        /// 0-based index in visiting order.
        index: usize,
        /// Number of sources.
        total: usize,
    },
    /// Pages of a source were copied.
    PagesAdded {
        /// Source name.
        name: String,
        /// Pages copied from this source.
        pages: usize,
    },
    /// A source contributed nothing.
    Skipped {
        /// Source name.
        name: String,
        /// Why.
        kind: ErrorKind,
    },
}

/// Receiver of [`MergeProgress`] events.
pub type ProgressCallback = Arc<dyn Fn(&MergeProgress) + Send + Sync>;

/// Something the merge dropped, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDiagnostic {
    /// Source it concerns.
    pub name: String,
    /// Classification.
    pub kind: ErrorKind,
    /// User-visible message.
    pub message: String,
}

impl MergeDiagnostic {
    fn from_error(name: &str, err: &Error) -> Self {
        Self {
            name: name.to_string(),
            kind: err.kind().unwrap_or(ErrorKind::CorruptedOrInvalid),
            message: err.to_string(),
        }
    }
}

/// Statistics about a merge operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Sources that contributed pages.
    pub files_merged: usize,
    /// Sources skipped entirely.
    pub files_skipped: usize,
    /// Pages in the output.
    pub total_pages: usize,
    /// Requested pages dropped as out of range.
    pub pages_dropped: usize,
    /// Total time taken.
    pub merge_time: Duration,
    /// Time spent parsing sources.
    pub load_time: Duration,
    /// Bytes of all sources that were parsed.
    pub input_size: u64,
    /// Bytes of the output.
    pub output_size: u64,
    /// Whether compression was applied.
    pub compressed: bool,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }

    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// Outcome of a merge, without the bytes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Mode of the request.
    pub mode: MergeMode,
    /// Download name.
    pub filename: String,
    /// Counters and timings.
    pub statistics: MergeStatistics,
    /// Skipped sources and dropped pages.
    pub diagnostics: Vec<MergeDiagnostic>,
}

/// A serialized merge result.
#[derive(Debug, Clone)]
pub struct MergedPdf {
    /// The output PDF.
    pub bytes: Vec<u8>,
    /// What happened.
    pub report: MergeReport,
}

/// PDF merger.
#[derive(Clone, Default)]
pub struct Merger {
    reader: PdfReader,
    progress: Option<ProgressCallback>,
}

impl Merger {
    /// Create a merger with the given parse limit per source.
    pub fn new(parse_timeout: Duration) -> Self {
        Self {
            reader: PdfReader::new(parse_timeout),
            progress: None,
        }
    }

    /// Create a merger from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.parse_timeout())
    }

    /// Report progress to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn emit(&self, event: MergeProgress) {
        if let Some(callback) = &self.progress {
            callback(&event);
        }
    }

    /// Merge according to a request.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `empty-result` if no page survives
    /// - `unsupported-environment` without a tokio runtime
    /// - [`Error::WriteFailed`] if serialization fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfweave::merge::{Merger, MergeRequest};
    /// # async fn example(request: MergeRequest) -> Result<(), Box<dyn std::error::Error>> {
    /// let merged = Merger::default().merge(request).await?;
    /// println!("{}: {} pages", merged.report.filename, merged.report.statistics.total_pages);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge(&self, request: MergeRequest) -> Result<MergedPdf> {
        self.merge_at(request, Utc::now()).await
    }

    /// [`Merger::merge`] with an explicit clock for naming and dates.
    pub async fn merge_at(&self, request: MergeRequest, now: DateTime<Utc>) -> Result<MergedPdf> {
        ensure_runtime()?;
        let merge_start = Instant::now();
        let MergeRequest {
            mode,
            sources,
            options,
        } = request;

        info!(mode = mode.as_str(), sources = sources.len(), "merge started");

        let total = sources.len();
        let mut copier = PageCopier::new();
        let mut diagnostics = Vec::new();
        let mut files_merged = 0;
        let mut files_skipped = 0;
        let mut pages_dropped = 0;
        let mut load_time = Duration::ZERO;
        let mut input_size = 0;

        for (index, source) in sources.into_iter().enumerate() {
            let name = source.name;
            self.emit(MergeProgress::Started {
                name: name.clone(),
                index,
                total,
            });

            let loaded = match self.reader.load(&name, source.bytes).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(document = %name, kind = ?e.kind(), "skipping source: {e}");
                    let diagnostic = MergeDiagnostic::from_error(&name, &e);
                    self.emit(MergeProgress::Skipped {
                        name: name.clone(),
                        kind: diagnostic.kind,
                    });
                    diagnostics.push(diagnostic);
                    files_skipped += 1;
                    continue;
                }
            };
            load_time += loaded.load_time;
            input_size += loaded.size;

            let page_count = loaded.page_count;
            let (pages, dropped): (Vec<u32>, Vec<u32>) = source
                .pages
                .into_iter()
                .partition(|&page| (1..=page_count).contains(&page));

            for page in dropped {
                let err = Error::PageOutOfRange {
                    name: name.clone(),
                    page,
                    page_count,
                };
                warn!(document = %name, page, page_count, "dropping out-of-range page");
                diagnostics.push(MergeDiagnostic::from_error(&name, &err));
                pages_dropped += 1;
            }

            if pages.is_empty() {
                self.emit(MergeProgress::Skipped {
                    name,
                    kind: ErrorKind::PageOutOfRange,
                });
                files_skipped += 1;
                continue;
            }

            let job_name = name.clone();
            let document = loaded.document;
            let first_id = copier.next_id();
            let extracted = run_copy_job(&name, move || {
                PageCopier::extract(&job_name, document, &pages, first_id)
            })
            .await;

            match extracted.map(|batch| copier.absorb(batch)) {
                Ok(count) => {
                    debug!(document = %name, pages = count, "pages copied");
                    self.emit(MergeProgress::PagesAdded { name, pages: count });
                    files_merged += 1;
                }
                Err(e) => {
                    warn!(document = %name, kind = ?e.kind(), "skipping source: {e}");
                    let diagnostic = MergeDiagnostic::from_error(&name, &e);
                    self.emit(MergeProgress::Skipped {
                        name,
                        kind: diagnostic.kind,
                    });
                    diagnostics.push(diagnostic);
                    files_skipped += 1;
                }
            }
        }

        let total_pages = copier.page_count();
        if total_pages == 0 {
            let reason = match mode {
                MergeMode::SelectedPages => "no selected page could be copied",
                MergeMode::AllPages => "no document could be copied",
            };
            warn!(mode = mode.as_str(), "merge produced no pages");
            return Err(Error::empty_result(reason));
        }

        let metadata = Metadata {
            title: options.title.clone(),
            author: None,
        };
        let writer = PdfWriter::with_options(WriteOptions {
            compress: options.compress,
            optimize: true,
        });

        let (bytes, write_stats) = task::spawn_blocking(move || {
            let mut document = copier.finish();
            MetadataManager::new().set_metadata(&mut document, &metadata, now)?;
            writer.to_bytes(&mut document)
        })
        .await
        .map_err(|e| Error::WriteFailed {
            reason: e.to_string(),
        })??;

        let filename = output_filename(options.filename.as_deref(), mode, now);
        let statistics = MergeStatistics {
            files_merged,
            files_skipped,
            total_pages,
            pages_dropped,
            merge_time: merge_start.elapsed(),
            load_time,
            input_size,
            output_size: write_stats.size,
            compressed: write_stats.compressed,
        };

        info!(
            filename = %filename,
            pages = total_pages,
            size = %statistics.format_output_size(),
            "merge finished"
        );

        Ok(MergedPdf {
            bytes,
            report: MergeReport {
                mode,
                filename,
                statistics,
                diagnostics,
            },
        })
    }
}

/// Run one source's page extraction on the blocking pool.
///
/// A job that dies is reported against its source like any other per-source
/// failure.
async fn run_copy_job<F>(name: &str, job: F) -> Result<PageBatch>
where
    F: FnOnce() -> Result<PageBatch> + Send + 'static,
{
    task::spawn_blocking(job).await.unwrap_or_else(|join_err| {
        debug!(document = name, error = %join_err, "page copy job aborted");
        Err(Error::corrupted_pdf(name, join_err.to_string()))
    })
}

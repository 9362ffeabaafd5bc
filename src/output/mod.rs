//! User-facing messages and download delivery.
//!
//! The pipeline never prints. Messages meant for the user are collected as
//! [`Notice`]s in a [`NoticeLog`] that a UI drains and displays; the
//! `report_*` functions turn inspection and merge outcomes into notices.

pub mod download;

pub use download::{
    DirectorySink, Download, DownloadSink, DownloadTicket, MemorySink, PDF_MIME_TYPE,
    deliver_with_release,
};

use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::merge::MergeReport;

/// Level of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageLevel {
    /// Informational message.
    Info,
    /// Success message.
    Success,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Severity.
    pub level: MessageLevel,
    /// Failure classification, for errors and warnings about a failure.
    pub kind: Option<ErrorKind>,
    /// Text.
    pub message: String,
}

impl Notice {
    fn new(level: MessageLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            kind: None,
            message: message.into(),
        }
    }

    /// Informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(MessageLevel::Info, message)
    }

    /// Success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(MessageLevel::Success, message)
    }

    /// Warning notice.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(MessageLevel::Warning, message)
    }

    /// Error notice carrying the error's kind and display text.
    pub fn error(err: &Error) -> Self {
        Self {
            level: MessageLevel::Error,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Attach a kind.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Append-only list of notices, drained by the UI.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Vec<Notice>,
}

impl NoticeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notice.
    pub fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Notices not yet drained.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Take all notices.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Number of pending notices.
    pub fn len(&self) -> usize {
        self.notices.len()
    }

    /// Check if no notice is pending.
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Pending notices at one level.
    pub fn at_level(&self, level: MessageLevel) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.level == level)
    }
}

/// Record a successful inspection.
pub fn report_inspection(log: &mut NoticeLog, name: &str, page_count: u32, size: &str) {
    log.push(Notice::info(format!(
        "{name}: {page_count} page(s), {size}"
    )));
}

/// Record a merge: one warning per diagnostic, then a summary.
pub fn report_merge(log: &mut NoticeLog, report: &MergeReport) {
    for diagnostic in &report.diagnostics {
        log.push(Notice::warning(diagnostic.message.clone()).with_kind(diagnostic.kind));
    }

    let stats = &report.statistics;
    log.push(Notice::success(format!(
        "Merged {} page(s) from {} file(s) into {} ({})",
        stats.total_pages,
        stats.files_merged,
        report.filename,
        stats.format_output_size()
    )));
}

//! Output file names.

use chrono::{DateTime, Utc};

use super::request::MergeMode;

/// Extension every output name ends with.
pub const PDF_EXTENSION: &str = ".pdf";

/// Timestamp used in default names: UTC, to the second, no `:` or `.`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Default base name for a merge mode.
pub fn default_base(mode: MergeMode, now: DateTime<Utc>) -> String {
    let prefix = match mode {
        MergeMode::AllPages => "merged-document",
        MergeMode::SelectedPages => "merged-selected-pages",
    };
    format!("{prefix}-{}", timestamp(now))
}

/// Final download name.
///
/// `base` is trimmed; a missing or blank base falls back to
/// [`default_base`]. `.pdf` is appended unless the name already ends with it
/// in any letter case.
pub fn output_filename(base: Option<&str>, mode: MergeMode, now: DateTime<Utc>) -> String {
    let name = match base.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => default_base(mode, now),
    };

    if name.to_ascii_lowercase().ends_with(PDF_EXTENSION) {
        name
    } else {
        format!("{name}{PDF_EXTENSION}")
    }
}

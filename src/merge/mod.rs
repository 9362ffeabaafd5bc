//! Merging selected or all pages into one PDF.
//!
//! - [`request`]: which pages of which documents, in what order
//! - [`pages`]: copying pages into a fresh document
//! - [`merger`]: running a request end to end
//! - [`metadata`]: stamping the output's Info dictionary
//! - [`naming`]: the download file name

pub mod merger;
pub mod metadata;
pub mod naming;
pub mod pages;
pub mod request;

pub use merger::{
    MergeDiagnostic, MergeProgress, MergeReport, MergeStatistics, MergedPdf, Merger,
    ProgressCallback,
};
pub use metadata::{Metadata, MetadataManager};
pub use naming::output_filename;
pub use pages::{PageBatch, PageCopier};
pub use request::{MergeMode, MergeOptions, MergeRequest, MergeSource};

//! pdfweave - Inspect, preview and recombine PDF pages in memory.
//!
//! This library is the engine behind a page-level PDF merge tool. It
//! provides:
//!
//! - Document inspection with classified failures
//! - Lazily scheduled page thumbnails with a bounded FIFO cache
//! - Ordered page selection
//! - Merging of selected pages or whole documents
//! - Download delivery with delayed release
//!
//! Everything runs on tokio; parsing, rendering and page copying happen on
//! the blocking pool.
//!
//! # Examples
//!
//! ## Workspace
//!
//! ```no_run
//! use pdfweave::{Config, Workspace};
//! use pdfweave::document::SourceFile;
//! use pdfweave::output::DirectorySink;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = Arc::new(DirectorySink::new("out"));
//! let mut workspace = Workspace::new(Config::default(), sink)?;
//!
//! let ids = workspace.add_files(SourceFile::from_patterns(["scans/*.pdf"]).await?);
//! workspace.inspect_pending().await;
//!
//! let viewport = workspace.viewport(0.0, 900.0);
//! let slots = workspace.placeholders(280.0, 12.0);
//! workspace.update_viewport(&viewport, &slots);
//! workspace.render_queued().await;
//!
//! for entry in workspace.pages(ids[0]) {
//!     println!("{} is {}", entry.key(), entry.state().as_str());
//! }
//! workspace.select_all(ids[0]);
//! let delivery = workspace.merge_selected(Some("first-scan")).await?;
//! println!("{}", delivery.report.filename);
//! # Ok(())
//! # }
//! ```
//!
//! ## Using Individual Components
//!
//! ```no_run
//! use pdfweave::Config;
//! use pdfweave::inspect::Inspector;
//! use pdfweave::thumbnail::{ThumbnailRenderer, fingerprint};
//! use std::sync::Arc;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let bytes: Arc<[u8]> = Arc::from(bytes);
//! let info = Inspector::default().inspect("input.pdf", bytes.clone()).await?;
//! println!("PDF has {} pages", info.page_count);
//!
//! let mut renderer = ThumbnailRenderer::from_config(&Config::default());
//! let fp = fingerprint::compute(&bytes, 1024);
//! let thumb = renderer.render("input.pdf", bytes, &fp, 1).await?;
//! println!("{}x{}", thumb.width, thumb.height);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod environment;
pub mod error;
pub mod inspect;
pub mod io;
pub mod merge;
pub mod output;
pub mod scheduler;
pub mod selection;
pub mod thumbnail;
pub mod utils;
pub mod viewport;
pub mod workspace;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use document::{DocumentId, PageKey, SourceFile};
pub use error::{Error, ErrorKind, Result};
pub use workspace::{MergeOutcome, Workspace};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Download delivery.
//!
//! A [`DownloadSink`] receives a finished PDF and stages it for the user,
//! returning a [`DownloadTicket`]. The staged resource is released on a
//! background timer some time after delivery, never immediately.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info};

use crate::environment::ensure_runtime;
use crate::error::{Error, Result};

/// MIME type of every merged download.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A file handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    /// File name offered to the user.
    pub filename: String,
    /// MIME type.
    pub mime_type: &'static str,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Download {
    /// A PDF download.
    pub fn pdf(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: PDF_MIME_TYPE,
            bytes,
        }
    }
}

/// Handle to a staged download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadTicket(u64);

impl DownloadTicket {
    /// Numeric id, unique per sink.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Destination for finished downloads.
///
/// Called from tokio's blocking pool; implementations may block.
pub trait DownloadSink: Send + Sync {
    /// Stage a download.
    ///
    /// # Errors
    ///
    /// Returns an error if the download cannot be staged.
    fn deliver(&self, download: Download) -> Result<DownloadTicket>;

    /// Release a staged download. Unknown tickets are ignored.
    fn release(&self, ticket: DownloadTicket);
}

/// Sink that keeps staged downloads in memory until released.
#[derive(Debug, Default)]
pub struct MemorySink {
    next: AtomicU64,
    staged: Mutex<HashMap<DownloadTicket, Download>>,
    released: AtomicU64,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A staged download, if not yet released.
    pub fn get(&self, ticket: DownloadTicket) -> Option<Download> {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket)
            .cloned()
    }

    /// Check if a ticket is still staged.
    pub fn is_staged(&self, ticket: DownloadTicket) -> bool {
        self.get(ticket).is_some()
    }

    /// Number of staged downloads.
    pub fn staged_count(&self) -> usize {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of releases so far.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, download: Download) -> Result<DownloadTicket> {
        let ticket = DownloadTicket(self.next.fetch_add(1, Ordering::SeqCst));
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket, download);
        Ok(ticket)
    }

    fn release(&self, ticket: DownloadTicket) {
        let removed = self
            .staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ticket);
        if removed.is_some() {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Sink that writes each download into a directory.
///
/// Files are written to a temporary name and renamed into place, so a
/// reader never sees a partial PDF. Releasing forgets the ticket; the file
/// stays.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    next: AtomicU64,
    staged: Mutex<HashMap<DownloadTicket, PathBuf>>,
}

impl DirectorySink {
    /// Write into `dir`, which must exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: AtomicU64::new(0),
            staged: Mutex::new(HashMap::new()),
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path written for a staged ticket.
    pub fn path_of(&self, ticket: DownloadTicket) -> Option<PathBuf> {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket)
            .cloned()
    }

    fn write_atomic(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|n| n.len() == filename.len())
            .ok_or_else(|| Error::other(format!("Invalid download name: {filename}")))?;

        let path = self.dir.join(name);
        let temp = self.dir.join(format!(".{filename}.tmp"));

        let written = fs::File::create(&temp)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, &path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(path)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: Download) -> Result<DownloadTicket> {
        let path = self.write_atomic(&download.filename, &download.bytes)?;
        let ticket = DownloadTicket(self.next.fetch_add(1, Ordering::SeqCst));
        debug!(path = %path.display(), "download written");
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket, path);
        Ok(ticket)
    }

    fn release(&self, ticket: DownloadTicket) {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ticket);
    }
}

/// Deliver on the blocking pool and schedule the release after `delay`.
///
/// Returns the ticket and the handle of the release timer.
///
/// # Errors
///
/// Returns `unsupported-environment` without a tokio runtime, or whatever
/// the sink reports.
pub async fn deliver_with_release(
    sink: Arc<dyn DownloadSink>,
    download: Download,
    delay: Duration,
) -> Result<(DownloadTicket, JoinHandle<()>)> {
    let handle = ensure_runtime()?;
    let filename = download.filename.clone();
    let size = download.bytes.len();

    let worker = Arc::clone(&sink);
    let ticket = task::spawn_blocking(move || worker.deliver(download))
        .await
        .map_err(|e| Error::other(format!("Download task failed: {e}")))??;

    info!(filename = %filename, size, ticket = ticket.id(), "download delivered");

    let release = handle.spawn(async move {
        tokio::time::sleep(delay).await;
        sink.release(ticket);
        debug!(ticket = ticket.id(), "download released");
    });

    Ok((ticket, release))
}

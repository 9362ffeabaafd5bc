//! Page thumbnails: rendering, fingerprints and caching.
//!
//! [`ThumbnailRenderer`] owns the cache and the rasterizer backend. Rendering
//! is split in two halves so the cache never crosses a task boundary:
//! - [`ThumbnailRenderer::job`] snapshots what a render needs into a [`RenderJob`]
//! - [`RenderJob::run`] renders on the blocking pool and can run concurrently
//! - [`ThumbnailRenderer::store`] puts the finished thumbnail into the cache
//!
//! [`ThumbnailRenderer::render`] chains the three for callers that do not
//! need the split.
//!
//! # Examples
//!
//! ```no_run
//! use pdfweave::config::Config;
//! use pdfweave::thumbnail::{ThumbnailRenderer, fingerprint};
//! use std::sync::Arc;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut renderer = ThumbnailRenderer::from_config(&Config::default());
//! let fp = fingerprint::compute(&bytes, 1024);
//! let thumb = renderer.render("a.pdf", Arc::from(bytes), &fp, 1).await?;
//! println!("{}x{} JPEG, {} bytes", thumb.width, thumb.height, thumb.jpeg.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod fingerprint;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod placeholder;
pub mod raster;
pub mod wireframe;

pub use cache::{CacheKey, ThumbnailCache};
pub use placeholder::PlaceholderIcon;
pub use raster::{FitBox, RasterError, Rasterizer, Thumbnail};
pub use wireframe::WireframeRasterizer;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, warn};

use crate::config::{Config, ThumbnailOptions};
use crate::environment::ensure_runtime;
use crate::error::{Error, ErrorKind, Result};

/// Renders page thumbnails and memoizes them.
pub struct ThumbnailRenderer {
    rasterizer: Arc<dyn Rasterizer>,
    cache: ThumbnailCache,
    options: ThumbnailOptions,
    render_timeout: Duration,
    placeholders: HashMap<PlaceholderIcon, Arc<Thumbnail>>,
}

impl ThumbnailRenderer {
    /// Create a renderer from its parts.
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        cache: ThumbnailCache,
        options: ThumbnailOptions,
        render_timeout: Duration,
    ) -> Self {
        Self {
            rasterizer,
            cache,
            options,
            render_timeout,
            placeholders: HashMap::new(),
        }
    }

    /// Create a renderer with the built-in wireframe backend.
    pub fn from_config(config: &Config) -> Self {
        Self::with_rasterizer(config, Arc::new(WireframeRasterizer::new()))
    }

    /// Create a renderer with a custom backend and a cache sized from `config`.
    pub fn with_rasterizer(config: &Config, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self::new(
            rasterizer,
            ThumbnailCache::new(config.cache_capacity),
            config.thumbnail,
            config.render_timeout(),
        )
    }

    /// Create a renderer backed by PDFium.
    ///
    /// # Errors
    ///
    /// Returns `unsupported-environment` if the PDFium library cannot be bound.
    #[cfg(feature = "pdfium")]
    pub fn with_pdfium(config: &Config) -> Result<Self> {
        let rasterizer = pdfium::PdfiumRasterizer::bind()
            .map_err(|e| e.into_error("pdfium", 0))?;
        Ok(Self::with_rasterizer(config, Arc::new(rasterizer)))
    }

    /// Thumbnail options in effect.
    pub fn options(&self) -> &ThumbnailOptions {
        &self.options
    }

    /// Name of the active backend.
    pub fn backend(&self) -> &'static str {
        self.rasterizer.name()
    }

    /// The cache.
    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    /// Cache key of a page at the configured scale.
    pub fn key_for(&self, fingerprint: &str, page: u32) -> CacheKey {
        CacheKey::new(fingerprint, page, self.options.scale)
    }

    /// Cached thumbnail of a page, if any.
    pub fn lookup(&self, fingerprint: &str, page: u32) -> Option<Arc<Thumbnail>> {
        self.cache.get(&self.key_for(fingerprint, page))
    }

    /// Snapshot everything needed to render one page.
    pub fn job(&self, name: &str, bytes: Arc<[u8]>, fingerprint: &str, page: u32) -> RenderJob {
        let (width, height) = self.options.target_box();
        RenderJob {
            key: self.key_for(fingerprint, page),
            name: name.to_string(),
            bytes,
            page,
            fit: FitBox::new(width, height),
            scale: self.options.scale,
            quality: self.options.jpeg_quality,
            timeout: self.render_timeout,
            rasterizer: Arc::clone(&self.rasterizer),
        }
    }

    /// Cache a finished thumbnail.
    pub fn store(&mut self, key: CacheKey, thumbnail: Arc<Thumbnail>) {
        self.cache.insert(key, thumbnail);
    }

    /// Return the cached thumbnail or render and cache it.
    ///
    /// # Errors
    ///
    /// Returns `page-out-of-range`, `password-protected`,
    /// `corrupted-or-invalid`, `render-failed`, `timeout` or
    /// `unsupported-environment`. Failures are not cached.
    pub async fn render(
        &mut self,
        name: &str,
        bytes: Arc<[u8]>,
        fingerprint: &str,
        page: u32,
    ) -> Result<Arc<Thumbnail>> {
        if let Some(hit) = self.lookup(fingerprint, page) {
            debug!(document = name, page, "thumbnail cache hit");
            return Ok(hit);
        }

        let job = self.job(name, bytes, fingerprint, page);
        let key = job.key().clone();
        let thumbnail = Arc::new(job.run().await?);
        self.store(key, Arc::clone(&thumbnail));
        Ok(thumbnail)
    }

    /// Error placeholder for a failure of `kind`, sized to the thumbnail box.
    ///
    /// Placeholders are shared per icon and kept outside the page cache.
    /// Returns `None` if the placeholder cannot be encoded.
    pub fn placeholder(&mut self, kind: ErrorKind) -> Option<Arc<Thumbnail>> {
        let icon = PlaceholderIcon::for_kind(kind);
        if let Some(hit) = self.placeholders.get(&icon) {
            return Some(Arc::clone(hit));
        }

        let (width, height) = self.options.target_box();
        match Thumbnail::error_placeholder(kind, FitBox::new(width, height)) {
            Ok(mut thumbnail) => {
                thumbnail.scale = self.options.scale;
                let thumbnail = Arc::new(thumbnail);
                self.placeholders.insert(icon, Arc::clone(&thumbnail));
                Some(thumbnail)
            }
            Err(e) => {
                warn!(?kind, "error placeholder failed: {e}");
                None
            }
        }
    }

    /// Drop every cached page of one document.
    pub fn purge(&mut self, fingerprint: &str) -> usize {
        self.cache.purge_fingerprint(fingerprint)
    }

    /// Drop every cached page.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// A self-contained page render, detached from the renderer.
pub struct RenderJob {
    key: CacheKey,
    name: String,
    bytes: Arc<[u8]>,
    page: u32,
    fit: FitBox,
    scale: f32,
    quality: u8,
    timeout: Duration,
    rasterizer: Arc<dyn Rasterizer>,
}

impl RenderJob {
    /// Cache key the result belongs under.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// 1-based page being rendered.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Render and encode on the blocking pool, bounded by the render timeout.
    ///
    /// # Errors
    ///
    /// See [`ThumbnailRenderer::render`].
    pub async fn run(self) -> Result<Thumbnail> {
        ensure_runtime()?;

        let Self {
            name,
            bytes,
            page,
            fit,
            scale,
            quality,
            timeout,
            rasterizer,
            ..
        } = self;

        debug!(document = %name, page, backend = rasterizer.name(), "rendering page");

        let job = task::spawn_blocking(move || {
            let image = rasterizer.render_fitted(&bytes, page, fit)?;
            Thumbnail::encode(&image, scale, quality)
        });

        let result = match tokio::time::timeout(timeout, job).await {
            Ok(Ok(Ok(thumbnail))) => Ok(thumbnail),
            Ok(Ok(Err(raster))) => Err(raster.into_error(&name, page)),
            Ok(Err(join_err)) => Err(Error::render_failed(&name, page, join_err.to_string())),
            Err(_) => Err(Error::timeout(&name, format!("render of page {page}"), timeout)),
        };

        if let Err(e) = &result {
            warn!(document = %name, page, kind = ?e.kind(), "render failed: {e}");
        }
        result
    }
}

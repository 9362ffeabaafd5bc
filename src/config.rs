//! Configuration for pdfweave.
//!
//! A [`Config`] gathers every tunable of the pipeline: thumbnail box and
//! encoding, cache capacity, fingerprint prefix length, timeouts and the
//! download release delay. It can be built in code or deserialized from JSON,
//! where every missing field falls back to its default.
//!
//! ```
//! use pdfweave::config::Config;
//!
//! let config = Config::from_json_str(r#"{ "cacheCapacity": 20 }"#).unwrap();
//! assert_eq!(config.cache_capacity, 20);
//! assert_eq!(config.thumbnail.width, 200);
//! ```

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Error;

/// Target box and encoding for page thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbnailOptions {
    /// Bounding box width in pixels at scale 1.0.
    pub width: u32,
    /// Bounding box height in pixels at scale 1.0.
    pub height: u32,
    /// Multiplier applied to the box (1.0 = as configured, 1.5 = 150%).
    pub scale: f32,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 280,
            scale: 1.0,
            jpeg_quality: 80,
        }
    }
}

impl ThumbnailOptions {
    /// The effective bounding box `(width, height)` after applying `scale`.
    pub fn target_box(&self) -> (f32, f32) {
        (
            self.width as f32 * self.scale,
            self.height as f32 * self.scale,
        )
    }
}

/// Complete configuration for a pdfweave workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Thumbnail box and encoding.
    pub thumbnail: ThumbnailOptions,

    /// Maximum number of cached thumbnails.
    pub cache_capacity: usize,

    /// Number of leading bytes hashed into a document fingerprint.
    pub fingerprint_prefix_len: usize,

    /// Upper bound for one structural parse, in milliseconds.
    pub parse_timeout_ms: u64,

    /// Upper bound for one page render, in milliseconds.
    pub render_timeout_ms: u64,

    /// Delay before a delivered download is released, in milliseconds.
    pub download_release_delay_ms: u64,

    /// Maximum renders driven at once by [`crate::workspace::Workspace::render_queued`].
    pub render_concurrency: usize,

    /// Look-ahead margin, in pixels, around the viewport.
    pub look_ahead_margin: f32,

    /// Compress the merged output.
    pub compress_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thumbnail: ThumbnailOptions::default(),
            cache_capacity: 100,
            fingerprint_prefix_len: 1024,
            parse_timeout_ms: 30_000,
            render_timeout_ms: 30_000,
            download_release_delay_ms: 5_000,
            render_concurrency: 1,
            look_ahead_margin: 50.0,
            compress_output: true,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the JSON is malformed or the
    /// resulting configuration fails [`Config::validate`].
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_config(format!("malformed JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The thumbnail box or scale is empty
    /// - JPEG quality is outside 1..=100
    /// - The cache capacity, fingerprint prefix or render concurrency is zero
    /// - A timeout or the download release delay is zero
    pub fn validate(&self) -> Result<()> {
        let thumb = &self.thumbnail;
        if thumb.width == 0 || thumb.height == 0 {
            bail!(
                "Thumbnail box must be non-empty, got {}x{}",
                thumb.width,
                thumb.height
            );
        }

        if !thumb.scale.is_finite() || thumb.scale <= 0.0 {
            bail!("Thumbnail scale must be positive, got {}", thumb.scale);
        }

        if !(1..=100).contains(&thumb.jpeg_quality) {
            bail!(
                "JPEG quality must be between 1 and 100, got {}",
                thumb.jpeg_quality
            );
        }

        if self.cache_capacity == 0 {
            bail!("Cache capacity must be at least 1");
        }

        if self.fingerprint_prefix_len == 0 {
            bail!("Fingerprint prefix length must be at least 1 byte");
        }

        if self.parse_timeout_ms == 0 || self.render_timeout_ms == 0 {
            bail!("Timeouts must be greater than zero");
        }

        if self.download_release_delay_ms == 0 {
            bail!("Download release delay must be greater than zero");
        }

        if self.render_concurrency == 0 {
            bail!("Render concurrency must be at least 1");
        }

        if !self.look_ahead_margin.is_finite() || self.look_ahead_margin < 0.0 {
            bail!("Look-ahead margin cannot be negative");
        }

        Ok(())
    }

    /// Structural parse limit.
    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }

    /// Page render limit.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Delay before a delivered download is released.
    pub fn download_release_delay(&self) -> Duration {
        Duration::from_millis(self.download_release_delay_ms)
    }
}

//! Rasterizer backends and thumbnail bitmaps.
//!
//! A [`Rasterizer`] turns one page of a PDF into an RGB bitmap that fits a
//! bounding box. Every backend renders in two passes: it first measures the
//! page, then renders at `min(box_w / page_w, box_h / page_h)`.

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// Target box a thumbnail must fit into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitBox {
    /// Box width.
    pub width: f32,
    /// Box height.
    pub height: f32,
}

impl FitBox {
    /// Create a box.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Largest scale at which a `page_w` x `page_h` page fits the box.
    pub fn scale_for(&self, page_w: f32, page_h: f32) -> f32 {
        if page_w <= 0.0 || page_h <= 0.0 {
            return 1.0;
        }
        (self.width / page_w).min(self.height / page_h)
    }

    /// Pixel size of a page rendered at [`FitBox::scale_for`], at least 1x1.
    pub fn fitted_size(&self, page_w: f32, page_h: f32) -> (u32, u32) {
        let scale = self.scale_for(page_w, page_h);
        (
            ((page_w * scale).round() as u32).max(1),
            ((page_h * scale).round() as u32).max(1),
        )
    }
}

/// Failure reported by a rasterizer backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// The page does not exist.
    #[error("page {page} is out of range (document has {page_count} page(s))")]
    PageOutOfRange {
        /// Requested 1-based page.
        page: u32,
        /// Pages in the document.
        page_count: u32,
    },

    /// The document needs a password.
    #[error("document is password protected")]
    PasswordProtected,

    /// The document cannot be parsed.
    #[error("document is corrupted: {0}")]
    Corrupted(String),

    /// The backend cannot run here.
    #[error("{0} is not available")]
    Unavailable(String),

    /// Rendering itself failed.
    #[error("render failed: {0}")]
    Failed(String),
}

impl From<Error> for RasterError {
    fn from(err: Error) -> Self {
        match err {
            Error::PageOutOfRange {
                page, page_count, ..
            } => Self::PageOutOfRange { page, page_count },
            Error::PasswordProtected { .. } => Self::PasswordProtected,
            Error::UnsupportedEnvironment { capability } => Self::Unavailable(capability),
            Error::NotAPdf { .. } => Self::Corrupted("missing %PDF signature".to_string()),
            Error::CorruptedPdf { details, .. } => Self::Corrupted(details),
            other => Self::Failed(other.to_string()),
        }
    }
}

impl RasterError {
    /// Attach a file name and page, producing the crate error.
    pub fn into_error(self, name: &str, page: u32) -> Error {
        match self {
            Self::PageOutOfRange { page, page_count } => Error::PageOutOfRange {
                name: name.to_string(),
                page,
                page_count,
            },
            Self::PasswordProtected => Error::password_protected(name),
            Self::Corrupted(details) => Error::corrupted_pdf(name, details),
            Self::Unavailable(capability) => Error::unsupported(capability),
            Self::Failed(reason) => Error::render_failed(name, page, reason),
        }
    }

    /// Classification of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            Self::PasswordProtected => ErrorKind::PasswordProtected,
            Self::Corrupted(_) => ErrorKind::CorruptedOrInvalid,
            Self::Unavailable(_) => ErrorKind::UnsupportedEnvironment,
            Self::Failed(_) => ErrorKind::RenderFailed,
        }
    }
}

/// A page rasterizer.
///
/// Implementations are called from tokio's blocking pool and must not
/// assume any particular thread.
pub trait Rasterizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Render 1-based `page` of `pdf` so it fits `fit`, preserving aspect ratio.
    fn render_fitted(&self, pdf: &[u8], page: u32, fit: FitBox) -> Result<RgbImage, RasterError>;
}

/// An encoded page thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Requested scale multiplier the thumbnail was rendered for.
    pub scale: f32,
    /// JPEG bytes.
    pub jpeg: Vec<u8>,
}

impl Thumbnail {
    /// Encode a bitmap as JPEG.
    pub fn encode(image: &RgbImage, scale: f32, quality: u8) -> Result<Self, RasterError> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode_image(image)
            .map_err(|e| RasterError::Failed(format!("JPEG encoding failed: {e}")))?;

        Ok(Self {
            width: image.width(),
            height: image.height(),
            scale,
            jpeg,
        })
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_scale_picks_tighter_side() {
        let fit = FitBox::new(200.0, 280.0);
        // Letter portrait: width limits.
        let scale = fit.scale_for(612.0, 792.0);
        assert!((scale - 200.0 / 612.0).abs() < 1e-6);
        assert_eq!(fit.fitted_size(612.0, 792.0), (200, 259));

        // Landscape: width still limits, height shrinks.
        assert_eq!(fit.fitted_size(792.0, 612.0), (200, 155));

        // Tall strip: height limits.
        assert_eq!(fit.fitted_size(100.0, 1000.0), (28, 280));
    }

    #[test]
    fn test_degenerate_page_scale() {
        assert_eq!(FitBox::new(10.0, 10.0).scale_for(0.0, 5.0), 1.0);
    }

    #[test]
    fn test_encode_jpeg() {
        let image = RgbImage::from_pixel(20, 30, Rgb([255, 0, 0]));
        let thumb = Thumbnail::encode(&image, 1.0, 80).unwrap();
        assert_eq!((thumb.width, thumb.height), (20, 30));
        assert_eq!(&thumb.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(thumb.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_raster_error_into_error() {
        let err = RasterError::PageOutOfRange {
            page: 9,
            page_count: 2,
        }
        .into_error("a.pdf", 9);
        assert_eq!(err.kind(), Some(ErrorKind::PageOutOfRange));
        assert!(err.to_string().contains("a.pdf"));

        let err = RasterError::Failed("boom".into()).into_error("a.pdf", 3);
        assert_eq!(err.kind(), Some(ErrorKind::RenderFailed));
    }

    #[test]
    fn test_from_crate_error() {
        let raster: RasterError = Error::password_protected("x").into();
        assert_eq!(raster, RasterError::PasswordProtected);
        assert_eq!(raster.kind(), ErrorKind::PasswordProtected);
    }
}

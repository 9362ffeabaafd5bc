//! Full-fidelity rendering through PDFium (feature `pdfium`).
//!
//! PDFium is linked dynamically. [`PdfiumRasterizer::bind`] looks for the
//! library in:
//! 1. The current directory
//! 2. `./vendor/pdfium/lib/`
//! 3. System library paths

use image::RgbImage;
use pdfium_render::prelude::*;

use super::raster::{FitBox, RasterError, Rasterizer};

/// Rasterizer backed by a PDFium binding.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to the PDFium shared library.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Unavailable`] if no library can be loaded.
    pub fn bind() -> Result<Self, RasterError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "./vendor/pdfium/lib/",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| RasterError::Unavailable(format!("PDFium library ({e:?})")))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

fn classify(err: PdfiumError) -> RasterError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            RasterError::PasswordProtected
        }
        PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError | PdfiumInternalError::FileError,
        ) => RasterError::Corrupted(format!("{err:?}")),
        other => RasterError::Failed(format!("{other:?}")),
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn render_fitted(&self, pdf: &[u8], page: u32, fit: FitBox) -> Result<RgbImage, RasterError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(classify)?;

        let pages = document.pages();
        let page_count = pages.len() as u32;
        if page == 0 || page > page_count {
            return Err(RasterError::PageOutOfRange { page, page_count });
        }

        let pdf_page = pages
            .get((page - 1) as PdfPageIndex)
            .map_err(classify)?;

        // Pass one: the displayed size already accounts for /Rotate.
        let (width, height) = fit.fitted_size(pdf_page.width().value, pdf_page.height().value);

        // Pass two: render at the fitted size.
        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = pdf_page.render_with_config(&config).map_err(classify)?;
        Ok(bitmap.as_image().to_rgb8())
    }
}

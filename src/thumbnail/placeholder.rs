//! Error placeholders shown in place of pages that cannot be rendered.
//!
//! Each failure kind maps to a [`PlaceholderIcon`] painted on a grey card
//! that fills the thumbnail box. Shapes are laid out in a 160x220 reference
//! card and scaled to the bitmap; labels are drawn as bars, like text runs in
//! the wireframe renderer.

use image::{Rgb, RgbImage};

use super::raster::{FitBox, RasterError, Thumbnail};
use crate::error::ErrorKind;

const BACKGROUND: Rgb<u8> = Rgb([0xF3, 0xF4, 0xF6]);
const BORDER: Rgb<u8> = Rgb([0xD1, 0xD5, 0xDB]);
const MUTED: Rgb<u8> = Rgb([0x6B, 0x72, 0x80]);
const RED: Rgb<u8> = Rgb([0xEF, 0x44, 0x44]);
const AMBER: Rgb<u8> = Rgb([0xF5, 0x9E, 0x0B]);
const WHITE: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

const REFERENCE_WIDTH: f32 = 160.0;
const REFERENCE_HEIGHT: f32 = 220.0;
const PLACEHOLDER_QUALITY: u8 = 80;

/// Icon drawn on an error placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderIcon {
    /// Padlock, for password-protected documents.
    Lock,
    /// Warning triangle, for documents that cannot be read.
    Warning,
    /// Cross, for pages the backend could not render.
    Cross,
    /// Question mark, for missing pages and everything else.
    Unknown,
}

impl PlaceholderIcon {
    /// Icon for a failure kind.
    pub fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::PasswordProtected => Self::Lock,
            ErrorKind::CorruptedOrInvalid | ErrorKind::NotAPdf => Self::Warning,
            ErrorKind::RenderFailed | ErrorKind::UnsupportedEnvironment => Self::Cross,
            ErrorKind::PageOutOfRange | ErrorKind::Timeout | ErrorKind::EmptyResult => {
                Self::Unknown
            }
        }
    }
}

fn near_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32), half_width: f32) -> bool {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (qx, qy) = (a.0 + t * dx - p.0, a.1 + t * dy - p.1);
    qx * qx + qy * qy <= half_width * half_width
}

fn on_ring(p: (f32, f32), center: (f32, f32), radius: f32, half_width: f32) -> bool {
    let d = ((p.0 - center.0).powi(2) + (p.1 - center.1).powi(2)).sqrt();
    (d - radius).abs() <= half_width
}

fn in_rect(p: (f32, f32), x0: f32, y0: f32, x1: f32, y1: f32) -> bool {
    p.0 >= x0 && p.0 < x1 && p.1 >= y0 && p.1 < y1
}

fn in_triangle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let edge = |u: (f32, f32), v: (f32, f32)| (v.0 - u.0) * (p.1 - u.1) - (v.1 - u.1) * (p.0 - u.0);
    let (e1, e2, e3) = (edge(a, b), edge(b, c), edge(c, a));
    (e1 >= 0.0 && e2 >= 0.0 && e3 >= 0.0) || (e1 <= 0.0 && e2 <= 0.0 && e3 <= 0.0)
}

/// Bitmap addressed in reference units relative to its centre, y down.
struct Card {
    image: RgbImage,
    scale: f32,
}

impl Card {
    fn new(width: u32, height: u32) -> Self {
        let scale = (width as f32 / REFERENCE_WIDTH).min(height as f32 / REFERENCE_HEIGHT);
        Self {
            image: RgbImage::from_pixel(width, height, BACKGROUND),
            scale,
        }
    }

    fn fill(&mut self, color: Rgb<u8>, inside: impl Fn((f32, f32)) -> bool) {
        let (cx, cy) = (
            self.image.width() as f32 / 2.0,
            self.image.height() as f32 / 2.0,
        );
        let scale = self.scale;
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let p = ((x as f32 + 0.5 - cx) / scale, (y as f32 + 0.5 - cy) / scale);
            if inside(p) {
                *pixel = color;
            }
        }
    }

    fn border(&mut self) {
        let (w, h) = self.image.dimensions();
        let t = ((2.0 * self.scale).round() as u32).max(1);
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            if x < t || y < t || x + t >= w || y + t >= h {
                *pixel = BORDER;
            }
        }
    }

    /// A label line of `chars` characters with its baseline at `baseline`.
    fn label(&mut self, baseline: f32, chars: usize) {
        let half = chars as f32 * 3.5;
        self.fill(MUTED, |p| in_rect(p, -half, baseline - 9.0, half, baseline - 2.0));
    }
}

/// Paint a `width` x `height` placeholder card.
pub fn paint(icon: PlaceholderIcon, width: u32, height: u32) -> RgbImage {
    let mut card = Card::new(width.max(1), height.max(1));
    card.border();

    match icon {
        PlaceholderIcon::Lock => {
            card.fill(RED, |p| in_rect(p, -15.0, -20.0, 15.0, 5.0));
            card.fill(BACKGROUND, |p| in_rect(p, -10.0, -15.0, 10.0, 0.0));
            card.fill(RED, |p| p.1 <= -20.0 && on_ring(p, (0.0, -20.0), 8.0, 1.5));
            card.label(20.0, 8);
            card.label(35.0, 9);
        }
        PlaceholderIcon::Warning => {
            card.fill(AMBER, |p| {
                in_triangle(p, (0.0, -20.0), (-20.0, 15.0), (20.0, 15.0))
            });
            card.fill(WHITE, |p| {
                in_rect(p, -1.5, -8.0, 1.5, 2.0) || in_rect(p, -1.5, 5.0, 1.5, 8.0)
            });
            card.label(35.0, 9);
            card.label(50.0, 3);
        }
        PlaceholderIcon::Cross => {
            card.fill(RED, |p| {
                near_segment(p, (-15.0, -15.0), (15.0, 15.0), 2.0)
                    || near_segment(p, (15.0, -15.0), (-15.0, 15.0), 2.0)
            });
            card.label(25.0, 11);
            card.label(40.0, 6);
        }
        PlaceholderIcon::Unknown => {
            card.fill(MUTED, |p| {
                let hook = (p.1 <= -14.0 || (p.0 >= 0.0 && p.1 <= -5.0))
                    && on_ring(p, (0.0, -14.0), 9.0, 2.0);
                hook || in_rect(p, -2.0, -5.0, 2.0, 4.0) || in_rect(p, -2.0, 8.0, 2.0, 12.0)
            });
            card.label(35.0, 7);
            card.label(50.0, 5);
        }
    }

    card.image
}

impl Thumbnail {
    /// Placeholder for a failure of `kind`, filling the whole of `fit`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Failed`] if JPEG encoding fails.
    pub fn error_placeholder(kind: ErrorKind, fit: FitBox) -> Result<Self, RasterError> {
        let width = (fit.width.round() as u32).max(1);
        let height = (fit.height.round() as u32).max(1);
        let image = paint(PlaceholderIcon::for_kind(kind), width, height);
        Self::encode(&image, 1.0, PLACEHOLDER_QUALITY)
    }
}

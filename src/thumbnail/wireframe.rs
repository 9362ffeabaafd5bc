//! Pure-Rust page preview renderer.
//!
//! Paints the page sheet, then walks the page content stream and fills what
//! it can place without a full graphics engine: rectangles and the bounding
//! boxes of filled paths in their fill colour, image placements as grey
//! blocks and text runs as faded bars. Good enough to tell pages apart in a
//! thumbnail strip; build with the `pdfium` feature for real rendering.

use image::{Rgb, RgbImage, imageops};
use lopdf::content::Content;
use lopdf::{Document, Object};

use super::raster::{FitBox, RasterError, Rasterizer};
use crate::io::geometry::page_geometry;
use crate::io::reader;

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const IMAGE_FILL: Rgb<u8> = Rgb([200, 200, 200]);

/// Affine matrix `[a b c d e f]` as used by PDF.
type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgb<u8>,
}

/// Axis-aligned box in user space.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl Bounds {
    fn point(x: f32, y: f32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        }
    }

    fn include(&mut self, x: f32, y: f32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn operand_floats(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(|o| o.as_float().ok()).collect()
}

fn color_from(operands: &[Object]) -> Option<Rgb<u8>> {
    match operand_floats(operands).as_slice() {
        [g] => Some(Rgb([to_u8(*g); 3])),
        [r, g, b] => Some(Rgb([to_u8(*r), to_u8(*g), to_u8(*b)])),
        [c, m, y, k] => Some(Rgb([
            to_u8((1.0 - c) * (1.0 - k)),
            to_u8((1.0 - m) * (1.0 - k)),
            to_u8((1.0 - y) * (1.0 - k)),
        ])),
        _ => None,
    }
}

/// Blend a colour towards white, for text bars.
fn faded(color: Rgb<u8>) -> Rgb<u8> {
    let Rgb([r, g, b]) = color;
    let fade = |c: u8| ((c as u16 + 2 * 255) / 3) as u8;
    Rgb([fade(r), fade(g), fade(b)])
}

/// Drawing surface in page space, before rotation.
struct Canvas {
    image: RgbImage,
    scale: f32,
    origin: (f32, f32),
}

impl Canvas {
    fn fill_device_box(&mut self, corners: [(f32, f32); 4], color: Rgb<u8>) {
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let xs = corners.map(|(x, _)| (x - self.origin.0) * self.scale);
        let ys = corners.map(|(_, y)| h - (y - self.origin.1) * self.scale);

        let left = xs.iter().copied().fold(f32::INFINITY, f32::min).max(0.0);
        let right = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).min(w);
        let top = ys.iter().copied().fold(f32::INFINITY, f32::min).max(0.0);
        let bottom = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).min(h);
        if left >= right || top >= bottom {
            return;
        }

        for y in top.floor() as u32..(bottom.ceil() as u32).min(self.image.height()) {
            for x in left.floor() as u32..(right.ceil() as u32).min(self.image.width()) {
                self.image.put_pixel(x, y, color);
            }
        }
    }

    fn fill_bounds(&mut self, ctm: &Matrix, b: Bounds, color: Rgb<u8>) {
        let corners = [
            apply(ctm, b.x0, b.y0),
            apply(ctm, b.x1, b.y0),
            apply(ctm, b.x1, b.y1),
            apply(ctm, b.x0, b.y1),
        ];
        self.fill_device_box(corners, color);
    }
}

/// Text positioning state between `BT` and `ET`.
#[derive(Debug, Clone, Copy)]
struct TextState {
    matrix: Matrix,
    line: Matrix,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            line: IDENTITY,
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line);
        self.matrix = self.line;
    }

    fn advance(&mut self, width: f32) {
        self.matrix = multiply(&[1.0, 0.0, 0.0, 1.0, width, 0.0], &self.matrix);
    }
}

fn shown_glyphs(operands: &[Object]) -> usize {
    operands
        .iter()
        .map(|o| match o {
            Object::String(bytes, _) => bytes.len(),
            Object::Array(items) => shown_glyphs(items),
            _ => 0,
        })
        .sum()
}

/// Renderer that needs nothing beyond lopdf and image.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireframeRasterizer;

impl WireframeRasterizer {
    /// Create the renderer.
    pub fn new() -> Self {
        Self
    }

    fn paint(canvas: &mut Canvas, content: &Content) {
        let mut state = GraphicsState {
            ctm: IDENTITY,
            fill: Rgb([0, 0, 0]),
        };
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut path: Vec<Bounds> = Vec::new();
        let mut text = TextState::default();

        for op in &content.operations {
            let nums = || operand_floats(&op.operands);
            match op.operator.as_str() {
                "q" => stack.push(state),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let [a, b, c, d, e, f] = nums()[..] {
                        state.ctm = multiply(&[a, b, c, d, e, f], &state.ctm);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(color) = color_from(&op.operands) {
                        state.fill = color;
                    }
                }
                "re" => {
                    if let [x, y, w, h] = nums()[..] {
                        let mut b = Bounds::point(x, y);
                        b.include(x + w, y + h);
                        path.push(b);
                    }
                }
                "m" => {
                    if let [x, y] = nums()[..] {
                        path.push(Bounds::point(x, y));
                    }
                }
                "l" | "c" | "v" | "y" => {
                    let coords = nums();
                    if let Some(current) = path.last_mut() {
                        for pair in coords.chunks_exact(2) {
                            current.include(pair[0], pair[1]);
                        }
                    }
                }
                "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                    for b in path.drain(..) {
                        canvas.fill_bounds(&state.ctm, b, state.fill);
                    }
                }
                "n" | "S" | "s" => path.clear(),
                "Do" => {
                    let unit = Bounds {
                        x0: 0.0,
                        y0: 0.0,
                        x1: 1.0,
                        y1: 1.0,
                    };
                    canvas.fill_bounds(&state.ctm, unit, IMAGE_FILL);
                }
                "BT" => text = TextState::default(),
                "Tf" => {
                    if let Some(size) = nums().last() {
                        text.font_size = *size;
                    }
                }
                "TL" => {
                    if let [leading] = nums()[..] {
                        text.leading = leading;
                    }
                }
                "Td" => {
                    if let [tx, ty] = nums()[..] {
                        text.next_line(tx, ty);
                    }
                }
                "TD" => {
                    if let [tx, ty] = nums()[..] {
                        text.leading = -ty;
                        text.next_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let [a, b, c, d, e, f] = nums()[..] {
                        text.line = [a, b, c, d, e, f];
                        text.matrix = text.line;
                    }
                }
                "T*" | "'" | "\"" => {
                    text.next_line(0.0, -text.leading);
                    if op.operator != "T*" {
                        Self::text_bar(canvas, &state, &mut text, &op.operands);
                    }
                }
                "Tj" | "TJ" => Self::text_bar(canvas, &state, &mut text, &op.operands),
                _ => {}
            }
        }
    }

    fn text_bar(
        canvas: &mut Canvas,
        state: &GraphicsState,
        text: &mut TextState,
        operands: &[Object],
    ) {
        let glyphs = shown_glyphs(operands);
        if glyphs == 0 {
            return;
        }
        let width = glyphs as f32 * text.font_size * 0.5;
        let bar = Bounds {
            x0: 0.0,
            y0: 0.0,
            x1: width,
            y1: text.font_size * 0.7,
        };
        let m = multiply(&text.matrix, &state.ctm);
        canvas.fill_bounds(&m, bar, faded(state.fill));
        text.advance(width);
    }
}

impl Rasterizer for WireframeRasterizer {
    fn name(&self) -> &'static str {
        "wireframe"
    }

    fn render_fitted(&self, pdf: &[u8], page: u32, fit: FitBox) -> Result<RgbImage, RasterError> {
        let doc: Document = reader::parse("document", pdf)?;

        let pages = doc.get_pages();
        let page_count = pages.len() as u32;
        let &page_id = pages
            .get(&page)
            .ok_or(RasterError::PageOutOfRange { page, page_count })?;

        // Pass one: measure.
        let geometry = page_geometry(&doc, page_id);
        let (display_w, display_h) = geometry.display_size();
        let scale = fit.scale_for(display_w, display_h);

        // Pass two: paint the unrotated page at that scale, then rotate.
        let width = ((geometry.width * scale).round() as u32).max(1);
        let height = ((geometry.height * scale).round() as u32).max(1);
        let mut canvas = Canvas {
            image: RgbImage::from_pixel(width, height, PAPER),
            scale,
            origin: (geometry.x0, geometry.y0),
        };

        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| RasterError::Failed(format!("cannot read page content: {e}")))?;
        let content = Content::decode(&raw)
            .map_err(|e| RasterError::Failed(format!("cannot decode page content: {e}")))?;
        Self::paint(&mut canvas, &content);

        Ok(match geometry.rotation {
            90 => imageops::rotate90(&canvas.image),
            180 => imageops::rotate180(&canvas.image),
            270 => imageops::rotate270(&canvas.image),
            _ => canvas.image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encrypted_pdf, sample_pdf, to_bytes};
    use lopdf::{Stream, dictionary};

    fn fit() -> FitBox {
        FitBox::new(200.0, 280.0)
    }

    #[test]
    fn test_renders_within_box_preserving_aspect() {
        // Sample pages are 200x300 points.
        let image = WireframeRasterizer.render_fitted(&sample_pdf(1), 1, fit()).unwrap();
        assert_eq!(image.dimensions(), (187, 280));
    }

    #[test]
    fn test_paints_marker_block() {
        // Page 1 marker: fill 0.1 0.01 0.5 at (21, 41) size 120x160.
        let image = WireframeRasterizer.render_fitted(&sample_pdf(1), 1, fit()).unwrap();
        let scale = 280.0 / 300.0;
        let x = ((21.0 + 60.0) * scale) as u32;
        let y = 280 - ((41.0 + 80.0) * scale) as u32;
        assert_eq!(image.get_pixel(x, y), &Rgb([26, 3, 128]));
        assert_eq!(image.get_pixel(1, 1), &PAPER);
    }

    #[test]
    fn test_page_out_of_range() {
        let err = WireframeRasterizer
            .render_fitted(&sample_pdf(2), 3, fit())
            .unwrap_err();
        assert_eq!(
            err,
            RasterError::PageOutOfRange {
                page: 3,
                page_count: 2
            }
        );
    }

    #[test]
    fn test_password_protected() {
        let err = WireframeRasterizer
            .render_fitted(&encrypted_pdf(), 1, fit())
            .unwrap_err();
        assert_eq!(err, RasterError::PasswordProtected);
    }

    #[test]
    fn test_corrupted() {
        let err = WireframeRasterizer
            .render_fitted(b"%PDF-1.4 nothing here", 1, fit())
            .unwrap_err();
        assert!(matches!(err, RasterError::Corrupted(_)));
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let mut doc = crate::testing::sample_document(1);
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Rotate", 90i64);

        let image = WireframeRasterizer.render_fitted(&to_bytes(doc), 1, fit()).unwrap();
        // Displayed as 300x200 points: width limits.
        assert_eq!(image.dimensions(), (200, 133));
    }

    #[test]
    fn test_image_placement_and_text() {
        let mut doc = crate::testing::sample_document(1);
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content =
            b"q 50 0 0 50 100 200 cm /Im0 Do Q BT /F1 10 Tf 10 10 Td (Hello) Tj ET".to_vec();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Contents", content_id);

        let image = WireframeRasterizer.render_fitted(&to_bytes(doc), 1, fit()).unwrap();
        let scale = 280.0 / 300.0;
        let img_x = (125.0 * scale) as u32;
        let img_y = 280 - (225.0 * scale) as u32;
        assert_eq!(image.get_pixel(img_x, img_y), &IMAGE_FILL);

        let text_x = (15.0 * scale) as u32;
        let text_y = 280 - (13.0 * scale) as u32;
        assert_ne!(image.get_pixel(text_x, text_y), &PAPER);
    }
}

//! Page geometry: boxes, rotation and inherited page attributes.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// US Letter, used when a page declares no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Visible area and orientation of one page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Lower-left x of the visible box.
    pub x0: f32,
    /// Lower-left y of the visible box.
    pub y0: f32,
    /// Unrotated width.
    pub width: f32,
    /// Unrotated height.
    pub height: f32,
    /// Clockwise rotation: 0, 90, 180 or 270.
    pub rotation: u16,
}

impl PageGeometry {
    /// Size as displayed, with width and height swapped for quarter turns.
    pub fn display_size(&self) -> (f32, f32) {
        if self.rotation % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Resolve a possibly indirect object.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on a page, walking up `Parent` links until found.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    lookup(doc, page_id, key).and_then(|value| resolve(doc, value))
}

/// Like [`inherited`], but returns indirect values as references.
fn lookup<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Guard against cyclic Parent chains in broken files.
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn rect(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let arr = obj.as_array().ok()?;
    if arr.len() < 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(arr.iter()) {
        *slot = resolve(doc, item)?.as_float().ok()?;
    }
    let [a, b, c, d] = values;
    let r = [a.min(c), b.min(d), a.max(c), b.max(d)];
    (r[2] - r[0] > 0.0 && r[3] - r[1] > 0.0).then_some(r)
}

/// Normalize a `/Rotate` value to 0, 90, 180 or 270.
pub fn normalize_rotation(value: i64) -> u16 {
    let quarter = (value as f64 / 90.0).round() as i64;
    (quarter.rem_euclid(4) * 90) as u16
}

/// Measure a page: CropBox if present, else MediaBox, plus rotation.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> PageGeometry {
    let media = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| rect(doc, obj))
        .unwrap_or(DEFAULT_MEDIA_BOX);
    let visible = inherited(doc, page_id, b"CropBox")
        .and_then(|obj| rect(doc, obj))
        .unwrap_or(media);
    let rotation = inherited(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(normalize_rotation)
        .unwrap_or(0);

    PageGeometry {
        x0: visible[0],
        y0: visible[1],
        width: visible[2] - visible[0],
        height: visible[3] - visible[1],
        rotation,
    }
}

/// Copy inheritable attributes onto a standalone page dictionary.
///
/// Used when a page leaves its original tree, so it keeps the box and
/// resources it used to inherit.
pub fn flatten_inherited(doc: &Document, page_id: ObjectId, page: &mut Dictionary) {
    for key in INHERITABLE_KEYS {
        if page.has(key) {
            continue;
        }
        if let Some(value) = lookup(doc, page_id, key) {
            page.set(key.to_vec(), value.clone());
        }
    }
}

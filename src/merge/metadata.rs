//! PDF metadata management.
//!
//! This module handles the document Info dictionary:
//! - Reading Title and Author for inspection
//! - Writing Title, Producer, Creator and dates on merged output

use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Document, Object, StringFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::decode_pdf_string;

/// Producer and Creator string written on merged output.
pub const PRODUCER: &str = concat!("pdfweave ", env!("CARGO_PKG_VERSION"));

/// Descriptive metadata of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,

    /// Document author.
    pub author: Option<String>,
}

impl Metadata {
    /// Metadata with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            author: None,
        }
    }

    /// Check if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none()
    }
}

/// Manager for the Info dictionary.
#[derive(Debug, Default)]
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Stamp a document's Info dictionary.
    ///
    /// Always writes Producer, Creator, CreationDate and ModDate; Title and
    /// Author only when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the Info dictionary cannot be created.
    pub fn set_metadata(
        &self,
        doc: &mut Document,
        metadata: &Metadata,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) if doc.get_dictionary(id).is_ok() => id,
            _ => {
                let id = doc.add_object(Dictionary::new());
                doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        let info = doc
            .get_object_mut(info_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::other(format!("Failed to open Info dictionary: {e}")))?;

        if let Some(title) = &metadata.title {
            info.set("Title", text_string(title));
        }
        if let Some(author) = &metadata.author {
            info.set("Author", text_string(author));
        }

        info.set("Producer", text_string(PRODUCER));
        info.set("Creator", text_string(PRODUCER));

        let date = format_pdf_date(now);
        info.set("CreationDate", Object::string_literal(date.clone()));
        info.set("ModDate", Object::string_literal(date));

        Ok(())
    }

    /// Read Title and Author from a document.
    pub fn get_metadata(&self, doc: &Document) -> Metadata {
        let Some(info) = info_dictionary(doc) else {
            return Metadata::default();
        };

        Metadata {
            title: get_string_field(info, b"Title"),
            author: get_string_field(info, b"Author"),
        }
    }
}

/// The Info dictionary, whether stored inline in the trailer or indirectly.
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Extract a non-blank text field from a dictionary.
fn get_string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_pdf_string(bytes).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// Encode text as a PDF string: literal when ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn format_pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}

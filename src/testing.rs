//! PDF fixtures for unit tests, built in memory with lopdf.

use lopdf::{Document, Object, Stream, StringFormat, dictionary};

/// Content stream that paints one coloured block unique to `(tag, page)`.
pub fn page_marker(tag: u8, page: u32) -> Vec<u8> {
    format!(
        "q 0.{} 0.{:02} 0.5 rg {} {} 120 160 re f Q",
        tag % 10,
        page % 100,
        20 + page % 40,
        40 + page % 60
    )
    .into_bytes()
}

/// A document with `pages` pages, each carrying [`page_marker`] content.
pub fn tagged_document(tag: u8, pages: u32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page in 1..=pages {
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            page_marker(tag, page),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 300.into()],
            "Resources" => lopdf::Dictionary::new(),
        }
        .into(),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut title = vec![0xFE, 0xFF];
    for unit in format!("Sample {tag}").encode_utf16() {
        title.extend_from_slice(&unit.to_be_bytes());
    }
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(title, StringFormat::Hexadecimal),
        "Author" => Object::string_literal("Fixture"),
    });
    doc.trailer.set("Info", info_id);

    doc
}

/// Same as [`tagged_document`] with tag 1.
pub fn sample_document(pages: u32) -> Document {
    tagged_document(1, pages)
}

/// Serialize a document.
pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Bytes of a [`sample_document`].
pub fn sample_pdf(pages: u32) -> Vec<u8> {
    to_bytes(sample_document(pages))
}

/// Bytes of a [`tagged_document`].
pub fn tagged_pdf(tag: u8, pages: u32) -> Vec<u8> {
    to_bytes(tagged_document(tag, pages))
}

/// A one-page document whose trailer declares AES-256 encryption that no
/// empty password opens.
pub fn encrypted_pdf() -> Vec<u8> {
    let mut doc = sample_document(1);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 5,
        "R" => 6,
        "Length" => 256,
        "P" => -1028,
        "O" => Object::string_literal(vec![0x11u8; 48]),
        "U" => Object::string_literal(vec![0x22u8; 48]),
        "OE" => Object::string_literal(vec![0x33u8; 32]),
        "UE" => Object::string_literal(vec![0x44u8; 32]),
        "Perms" => Object::string_literal(vec![0x55u8; 16]),
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(vec![0x01u8; 16]),
            Object::string_literal(vec![0x01u8; 16]),
        ],
    );
    to_bytes(doc)
}

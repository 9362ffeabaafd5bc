//! PDF input and output operations.
//!
//! - [`reader`]: signature check, bounded structural parse, failure classification
//! - [`writer`]: in-memory serialization of merged documents
//! - [`geometry`]: page boxes, rotation and inherited attributes

pub mod geometry;
pub mod reader;
pub mod writer;

pub use geometry::{PageGeometry, page_geometry};
pub use reader::{LoadedPdf, PdfReader, decode_pdf_string, has_pdf_signature};
pub use writer::{PdfWriter, WriteOptions, WriteStatistics};

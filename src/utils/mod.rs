//! Utilities for path collection, page copying and formatting.

use lopdf::{Dictionary, Document, Object};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Expand multiple glob patterns into filesystem paths.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`.
///
/// Errors:
/// - Propagates `glob` parse errors.
/// - Propagates filesystem errors from glob iterator.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        resolved_paths.extend(collect_paths_for_pattern(pattern)?);
    }

    Ok(resolved_paths)
}

fn collect_paths_for_pattern<P: AsRef<str>>(pattern: P) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern.as_ref()).map_err(|err| Error::other(err.to_string()))?;

    paths
        .map(|entry| entry.map_err(|err| Error::other(err.to_string())))
        .collect()
}

/// Copy every object reachable from `obj` out of `source` into `target`.
///
/// Objects already present in `target` are left alone, so shared resources
/// are copied once even when several pages point at them. Page and page tree
/// objects are never followed: a copied page gets its parent from the output
/// tree, and following `Parent`, `Dest` or `/P` links would drag unselected
/// pages along. Such links inside copied objects are replaced with null.
pub fn copy_references(target: &mut Document, source: &Document, obj: &Object) {
    match obj {
        Object::Reference(ref_id) => {
            if target.objects.contains_key(ref_id) {
                return;
            }
            if let Ok(referenced) = source.get_object(*ref_id) {
                if is_page_node(referenced) {
                    return;
                }
                let mut copy = referenced.clone();
                detach_pages(source, &mut copy);
                target.objects.insert(*ref_id, copy);
                copy_references(target, source, referenced);
            }
        }
        Object::Dictionary(dict) => {
            for (key, value) in dict.iter() {
                if key.as_slice() != b"Parent" {
                    copy_references(target, source, value);
                }
            }
        }
        Object::Array(arr) => {
            for item in arr {
                copy_references(target, source, item);
            }
        }
        Object::Stream(stream) => {
            for (key, value) in stream.dict.iter() {
                if key.as_slice() != b"Parent" {
                    copy_references(target, source, value);
                }
            }
        }
        _ => {}
    }
}

fn detach_pages(source: &Document, obj: &mut Object) {
    match obj {
        Object::Reference(id) => {
            let id = *id;
            if source.get_object(id).is_ok_and(is_page_node) {
                *obj = Object::Null;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                detach_pages(source, item);
            }
        }
        Object::Dictionary(dict) => detach_dict(source, dict),
        Object::Stream(stream) => detach_dict(source, &mut stream.dict),
        _ => {}
    }
}

fn detach_dict(source: &Document, dict: &mut Dictionary) {
    for (key, value) in dict.iter_mut() {
        if key.as_slice() != b"Parent" {
            detach_pages(source, value);
        }
    }
}

fn is_page_node(obj: &Object) -> bool {
    obj.as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|ty| ty.as_name().ok())
        .is_some_and(|name| name == b"Pages" || name == b"Page")
}

/// Format a byte count as a human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

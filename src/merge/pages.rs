//! Page copying into a fresh output document.
//!
//! Copying is split in two so the output never enters a blocking job:
//! - [`PageCopier::extract`] renumbers a source past the output's highest id,
//!   flattens inheritable attributes onto the requested pages and collects
//!   every object they reach into a [`PageBatch`]
//! - [`PageCopier::absorb`] folds a batch into the output and re-parents its
//!   pages under the single page tree node

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::BTreeMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::io::geometry::flatten_inherited;
use crate::utils::copy_references;

/// Version written when no source declares a higher one.
const BASE_VERSION: &str = "1.5";

/// Pages of one source, detached from it and numbered for one output.
#[derive(Debug)]
pub struct PageBatch {
    objects: BTreeMap<ObjectId, Object>,
    pages: Vec<(u32, ObjectId, Dictionary)>,
    max_id: u32,
    version: String,
}

impl PageBatch {
    /// Number of pages in the batch.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page survived extraction.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Builds an output document page by page.
pub struct PageCopier {
    output: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PageCopier {
    /// Start an empty output document.
    pub fn new() -> Self {
        let mut output = Document::with_version(BASE_VERSION);
        let pages_id = output.new_object_id();
        Self {
            output,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Pages copied so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// First object id a new batch may use.
    pub fn next_id(&self) -> u32 {
        self.output.max_id + 1
    }

    /// Copy `pages` (1-based) of `source` in the given order.
    ///
    /// Shorthand for [`extract`](Self::extract) then [`absorb`](Self::absorb).
    ///
    /// # Errors
    ///
    /// Returns `corrupted-or-invalid` if a page object is not a dictionary.
    pub fn append(&mut self, name: &str, source: Document, pages: &[u32]) -> Result<usize> {
        let batch = Self::extract(name, source, pages, self.next_id())?;
        Ok(self.absorb(batch))
    }

    /// Detach `pages` (1-based) of `source`, numbering objects from `first_id`.
    ///
    /// Blocking. Pages the source does not have are skipped; callers drop
    /// them with a diagnostic beforehand. The same page may be requested more
    /// than once.
    ///
    /// # Errors
    ///
    /// Returns `corrupted-or-invalid` if a page object is not a dictionary.
    pub fn extract(
        name: &str,
        mut source: Document,
        pages: &[u32],
        first_id: u32,
    ) -> Result<PageBatch> {
        source.renumber_objects_with(first_id);
        let page_ids = source.get_pages();

        let mut prepared = Vec::with_capacity(pages.len());
        for page in pages {
            let Some(&page_id) = page_ids.get(page) else {
                continue;
            };
            let mut dict = source
                .get_dictionary(page_id)
                .map_err(|e| Error::corrupted_pdf(name, format!("page {page}: {e}")))?
                .clone();
            flatten_inherited(&source, page_id, &mut dict);
            dict.remove(b"Parent");
            prepared.push((*page, page_id, dict));
        }

        let mut scratch = Document::with_version(BASE_VERSION);
        for (_, _, dict) in &prepared {
            copy_references(&mut scratch, &source, &Object::Dictionary(dict.clone()));
        }

        Ok(PageBatch {
            objects: scratch.objects,
            pages: prepared,
            max_id: source.max_id,
            version: source.version,
        })
    }

    /// Fold a batch into the output. Returns the number of pages added.
    ///
    /// The batch must come from [`extract`](Self::extract) with a
    /// `first_id` no lower than [`next_id`](Self::next_id).
    pub fn absorb(&mut self, batch: PageBatch) -> usize {
        self.output.max_id = self.output.max_id.max(batch.max_id);
        if batch.version > self.output.version {
            self.output.version = batch.version;
        }
        self.output.objects.extend(batch.objects);

        let copied = batch.pages.len();
        for (page, page_id, mut dict) in batch.pages {
            let target_id = if self.output.objects.contains_key(&page_id) {
                self.output.new_object_id()
            } else {
                page_id
            };

            dict.set("Parent", self.pages_id);
            self.output.objects.insert(target_id, Object::Dictionary(dict));
            self.kids.push(Object::Reference(target_id));

            trace!(page, ?target_id, "page copied");
        }

        copied
    }

    /// Close the page tree and return the document.
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.output.objects.insert(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }
            .into(),
        );

        let catalog_id = self.output.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.output.trailer.set("Root", catalog_id);
        self.output
    }
}

impl Default for PageCopier {
    fn default() -> Self {
        Self::new()
    }
}

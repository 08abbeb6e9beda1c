use log::{info, warn};
use lopdf::ObjectId;

use folio_core::outline::offset_pages;
use folio_core::{OutlineEntry, PdfDocument};

use crate::document::{catalog_id, set_page_kids, LopdfDocument};
use crate::outline::read_outline;
use crate::PdfError;

/// Pages appended to a document by a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedPages {
    /// Page count before the merge, which is also the index of the first
    /// appended page.
    pub prior_count: usize,
    pub added: usize,
    /// The appended document's outline, already shifted past `prior_count`.
    pub outline: Vec<OutlineEntry>,
}

impl LopdfDocument {
    /// Append every page of `other` after the pages of this document.
    ///
    /// The outline of `other` is returned rather than written, so the caller
    /// can fold it into its own bookmark list.
    pub fn append_document(&mut self, other: LopdfDocument) -> Result<AppendedPages, PdfError> {
        let prior_count = self.page_count();
        let outline = match read_outline(other.raw_doc()) {
            Ok(outline) => offset_pages(outline, prior_count as u32),
            Err(e) => {
                warn!("ignoring unreadable outline of appended document: {}", e);
                Vec::new()
            }
        };

        let mut other = other.into_raw();

        // The outline travels as data; drop its objects from the copy.
        let other_catalog = catalog_id(&other)?;
        other
            .get_object_mut(other_catalog)?
            .as_dict_mut()?
            .remove(b"Outlines");
        other.prune_objects();

        let target = self.raw_doc_mut();
        other.renumber_objects_with(target.max_id + 1);
        target.max_id = other.max_id;

        let new_pages: Vec<ObjectId> = other.get_pages().into_values().collect();
        for (id, object) in other.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Outlines" => {}
                _ => {
                    target.objects.insert(id, object);
                }
            }
        }

        let mut kids = self.page_ids();
        kids.extend(&new_pages);
        set_page_kids(self.raw_doc_mut(), &kids)?;

        info!(
            "appended {} pages after page {}",
            new_pages.len(),
            prior_count
        );
        Ok(AppendedPages {
            prior_count,
            added: new_pages.len(),
            outline,
        })
    }
}

/// Merge every document into `base`, one after the other.
///
/// Returns the appended page ranges in order.
pub fn append_all(
    base: &mut LopdfDocument,
    others: impl IntoIterator<Item = LopdfDocument>,
) -> Result<Vec<AppendedPages>, PdfError> {
    others
        .into_iter()
        .map(|other| base.append_document(other))
        .collect()
}

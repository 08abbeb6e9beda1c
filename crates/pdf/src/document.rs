use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use image::RgbImage;
use log::{debug, info};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use folio_core::{DocumentError, OutlineEntry, PageRect, PageSize, PdfDocument};

use crate::raster::Rasterizer;
use crate::{decode_text_simple, images, outline, PdfError};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// An open PDF document backed by [`lopdf::Document`].
///
/// Inherited page attributes are copied onto every page when the document
/// is loaded, so pages can be moved between page tree nodes (or between
/// documents) without losing their size, resources or rotation.
pub struct LopdfDocument {
    doc: Document,
    rasterizer: Option<Rasterizer>,
}

impl LopdfDocument {
    /// An empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        LopdfDocument {
            doc,
            rasterizer: None,
        }
    }

    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(data)?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        let mut document = LopdfDocument {
            doc,
            rasterizer: None,
        };
        document.materialize_inherited()?;
        Ok(document)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let document = Self::load_bytes(&bytes)?;
        debug!(
            "loaded {} ({} pages)",
            path.display(),
            document.page_count()
        );
        Ok(document)
    }

    /// Use `rasterizer` for [`PdfDocument::render_page`].
    pub fn with_rasterizer(mut self, rasterizer: Rasterizer) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn set_rasterizer(&mut self, rasterizer: Option<Rasterizer>) {
        self.rasterizer = rasterizer;
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn raw_doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn into_raw(self) -> Document {
        self.doc
    }

    /// Serialize the document, dropping unreachable objects first.
    pub fn save_to<W: Write>(&mut self, target: &mut W) -> Result<(), PdfError> {
        self.doc.prune_objects();
        self.doc.compress();
        self.doc.save_to(target)?;
        Ok(())
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), PdfError> {
        let path = path.as_ref();
        let mut file = std::fs::File::create(path)?;
        self.save_to(&mut file)?;
        info!("wrote {}", path.display());
        Ok(())
    }

    /// Extract metadata from the PDF trailer's Info dictionary.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();

        let Ok(info_ref) = self.doc.trailer.get(b"Info") else {
            return meta;
        };
        let Ok((_, Object::Dictionary(info_dict))) = self.doc.dereference(info_ref) else {
            return meta;
        };

        let keys: &[&[u8]] = &[b"Title", b"Author", b"Creator", b"Producer", b"Subject"];
        for key in keys {
            if let Ok(obj) = info_dict.get(key) {
                let value = match obj {
                    Object::String(bytes, _) => decode_text_simple(bytes),
                    Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    _ => continue,
                };
                meta.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }

        meta
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    pub(crate) fn page_id(&self, page: usize) -> Result<ObjectId, DocumentError> {
        let ids = self.page_ids();
        ids.get(page)
            .copied()
            .ok_or(DocumentError::PageOutOfRange {
                page,
                count: ids.len(),
            })
    }

    fn page_dict(&self, page: usize) -> Result<&Dictionary, DocumentError> {
        let id = self.page_id(page)?;
        self.doc
            .get_dictionary(id)
            .map_err(|e| PdfError::from(e).into())
    }

    /// Copy inherited attributes from the page tree onto every page.
    fn materialize_inherited(&mut self) -> Result<(), PdfError> {
        for page_id in self.page_ids() {
            let page = self.doc.get_dictionary(page_id)?;
            let missing: Vec<(&[u8], Object)> = INHERITABLE
                .iter()
                .filter(|key| !page.has(key))
                .filter_map(|key| inherited_attribute(&self.doc, page, key).map(|v| (*key, v)))
                .collect();
            if missing.is_empty() {
                continue;
            }
            let page = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
            for (key, value) in missing {
                page.set(key, value);
            }
        }
        Ok(())
    }
}

impl Default for LopdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Id of the document catalog.
pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId, PdfError> {
    Ok(doc.trailer.get(b"Root")?.as_reference()?)
}

/// Id of the root node of the page tree.
pub(crate) fn pages_root_id(doc: &Document) -> Result<ObjectId, PdfError> {
    let catalog = doc.get_dictionary(catalog_id(doc)?)?;
    Ok(catalog.get(b"Pages")?.as_reference()?)
}

/// Point the root page tree node at `kids`, in order, and re-parent them.
pub(crate) fn set_page_kids(doc: &mut Document, kids: &[ObjectId]) -> Result<(), PdfError> {
    let root = pages_root_id(doc)?;
    for &kid in kids {
        doc.get_object_mut(kid)?.as_dict_mut()?.set("Parent", root);
    }
    let root_dict = doc.get_object_mut(root)?.as_dict_mut()?;
    root_dict.set(
        "Kids",
        kids.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
    );
    root_dict.set("Count", kids.len() as i64);
    Ok(())
}

/// Walk up the page tree looking for `key`.
fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    if let Ok(obj) = page.get(key) {
        return Some(obj.clone());
    }
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(parent?).ok()?;
        if let Ok(obj) = dict.get(key) {
            return Some(obj.clone());
        }
        parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Extract an `f32` from a numeric object, accepting both integers and reals.
fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match doc.dereference(obj).ok()?.1 {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Width and height of a `[llx lly urx ury]` box.
fn box_size(doc: &Document, obj: &Object) -> Option<PageSize> {
    let arr = doc.dereference(obj).ok()?.1.as_array().ok()?;
    let nums: Vec<f32> = arr.iter().filter_map(|o| number(doc, o)).collect();
    if nums.len() < 4 {
        return None;
    }
    Some(PageSize::new(
        (nums[2] - nums[0]).abs(),
        (nums[3] - nums[1]).abs(),
    ))
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn rotation(&self, page: usize) -> Result<u16, DocumentError> {
        let dict = self.page_dict(page)?;
        let degrees = inherited_attribute(&self.doc, dict, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        Ok(degrees.rem_euclid(360) as u16)
    }

    fn set_rotation(&mut self, page: usize, degrees: u16) -> Result<(), DocumentError> {
        let id = self.page_id(page)?;
        let dict = self
            .doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(PdfError::from)?;
        dict.set("Rotate", i64::from(degrees % 360));
        Ok(())
    }

    fn page_size(&self, page: usize) -> Result<PageSize, DocumentError> {
        let dict = self.page_dict(page)?;
        let size = [b"CropBox".as_slice(), b"MediaBox".as_slice()]
            .iter()
            .filter_map(|key| inherited_attribute(&self.doc, dict, key))
            .find_map(|obj| box_size(&self.doc, &obj))
            .ok_or_else(|| PdfError::Parse(format!("page {} has no MediaBox", page + 1)))?;
        if self.rotation(page)? % 180 == 90 {
            Ok(PageSize::new(size.height, size.width))
        } else {
            Ok(size)
        }
    }

    fn render_page(&self, page: usize, zoom: f32) -> Result<RgbImage, DocumentError> {
        let rasterizer = self
            .rasterizer
            .as_ref()
            .ok_or_else(|| DocumentError::Render("no rasterizer configured".into()))?;
        self.page_id(page)?;
        Ok(rasterizer.render(&self.doc, page, zoom)?)
    }

    fn select_pages(&mut self, order: &[usize]) -> Result<(), DocumentError> {
        let ids = self.page_ids();
        let mut seen = vec![false; ids.len()];
        for &i in order {
            if i >= ids.len() || std::mem::replace(&mut seen[i], true) {
                return Err(DocumentError::Backend(format!(
                    "page order {:?} is not a permutation of {} pages",
                    order,
                    ids.len()
                )));
            }
        }
        if order.len() != ids.len() {
            return Err(DocumentError::Backend(format!(
                "page order has {} pages, document has {}",
                order.len(),
                ids.len()
            )));
        }

        let kids: Vec<ObjectId> = order.iter().map(|&i| ids[i]).collect();
        set_page_kids(&mut self.doc, &kids)?;
        Ok(())
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>, DocumentError> {
        Ok(outline::read_outline(&self.doc)?)
    }

    fn set_outline(&mut self, entries: &[OutlineEntry]) -> Result<(), DocumentError> {
        Ok(outline::write_outline(&mut self.doc, entries)?)
    }

    fn replace_with_image(
        &mut self,
        page: usize,
        canvas: PageSize,
        content: PageRect,
        image: &RgbImage,
    ) -> Result<(), DocumentError> {
        let id = self.page_id(page)?;
        Ok(images::replace_with_image(
            &mut self.doc,
            id,
            canvas,
            content,
            image,
        )?)
    }
}

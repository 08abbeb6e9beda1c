//! Outline (bookmark) reading and writing
//!
//! The document outline is a linked tree of dictionaries (`First`, `Next`,
//! `Parent`, ...). It is read into, and written from, the flat level-tagged
//! list used by the editor.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use folio_core::outline::validate_levels;
use folio_core::OutlineEntry;

use crate::document::catalog_id;
use crate::{decode_text_simple, encode_text, PdfError};

/// Maximum depth followed in a name tree.
const MAX_NAME_TREE_DEPTH: usize = 32;

/// Read the document outline as a flat, depth-first list.
///
/// Entries whose destination cannot be resolved to a page of this document
/// get page `0`.
pub fn read_outline(doc: &Document) -> Result<Vec<OutlineEntry>, PdfError> {
    let catalog = doc.get_dictionary(catalog_id(doc)?)?;
    let Some(root) = resolve_dict(doc, catalog.get(b"Outlines").ok()) else {
        return Ok(Vec::new());
    };
    let Ok(first) = root.get(b"First").and_then(Object::as_reference) else {
        return Ok(Vec::new());
    };

    let reader = OutlineReader {
        doc,
        catalog,
        pages: doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number))
            .collect(),
    };

    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    // Stack of (next item, level) still to visit.
    let mut stack = vec![(first, 1)];
    while let Some((id, level)) = stack.pop() {
        if !visited.insert(id) {
            warn!("outline item {:?} visited twice, stopping this branch", id);
            continue;
        }
        let item = doc.get_dictionary(id)?;
        entries.push(reader.entry(item, level));

        // Siblings resume after this item's children.
        if let Ok(next) = item.get(b"Next").and_then(Object::as_reference) {
            stack.push((next, level));
        }
        if let Ok(child) = item.get(b"First").and_then(Object::as_reference) {
            stack.push((child, level + 1));
        }
    }

    debug!("read {} outline entries", entries.len());
    Ok(entries)
}

struct OutlineReader<'a> {
    doc: &'a Document,
    catalog: &'a Dictionary,
    pages: HashMap<ObjectId, u32>,
}

impl OutlineReader<'_> {
    fn entry(&self, item: &Dictionary, level: i32) -> OutlineEntry {
        let title = item
            .get(b"Title")
            .ok()
            .and_then(|o| self.doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_str().ok())
            .map(decode_text_simple)
            .unwrap_or_default();
        let page = self.item_page(item).unwrap_or_else(|| {
            debug!("outline entry {:?} has no resolvable destination", title);
            0
        });
        OutlineEntry::new(level, title, page)
    }

    fn item_page(&self, item: &Dictionary) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.dest_page(dest, 0);
        }
        let action = resolve_dict(self.doc, item.get(b"A").ok())?;
        match action.get(b"S").and_then(Object::as_name) {
            Ok(b"GoTo") => self.dest_page(action.get(b"D").ok()?, 0),
            _ => None,
        }
    }

    /// Resolve an explicit or named destination to a 1-based page number.
    fn dest_page(&self, dest: &Object, depth: usize) -> Option<u32> {
        if depth > 2 {
            return None;
        }
        let (_, dest) = self.doc.dereference(dest).ok()?;
        match dest {
            Object::Array(parts) => match parts.first()? {
                Object::Reference(page_id) => self.pages.get(page_id).copied(),
                // Remote-style destinations carry a 0-based page index.
                Object::Integer(index) => u32::try_from(*index).ok().map(|i| i + 1),
                _ => None,
            },
            Object::Dictionary(dict) => self.dest_page(dict.get(b"D").ok()?, depth + 1),
            Object::Name(name) | Object::String(name, _) => {
                let target = self.named_dest(name)?;
                self.dest_page(&target, depth + 1)
            }
            _ => None,
        }
    }

    /// Look a named destination up in `/Dests` or the `/Names` name tree.
    fn named_dest(&self, name: &[u8]) -> Option<Object> {
        if let Some(dests) = resolve_dict(self.doc, self.catalog.get(b"Dests").ok()) {
            if let Ok(found) = dests.get(name) {
                return Some(found.clone());
            }
        }
        let names = resolve_dict(self.doc, self.catalog.get(b"Names").ok())?;
        let tree = resolve_dict(self.doc, names.get(b"Dests").ok())?;
        self.search_name_tree(tree, name, 0)
    }

    fn search_name_tree(&self, node: &Dictionary, name: &[u8], depth: usize) -> Option<Object> {
        if depth > MAX_NAME_TREE_DEPTH {
            return None;
        }
        if let Ok(pairs) = node.get(b"Names").and_then(Object::as_array) {
            for pair in pairs.chunks_exact(2) {
                if pair[0].as_str().is_ok_and(|key| key == name) {
                    return Some(pair[1].clone());
                }
            }
        }
        let kids = node.get(b"Kids").and_then(Object::as_array).ok()?;
        kids.iter()
            .filter_map(|kid| resolve_dict(self.doc, Some(kid)))
            .find_map(|kid| self.search_name_tree(kid, name, depth + 1))
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    doc.dereference(obj?).ok()?.1.as_dict().ok()
}

/// Replace the document outline with `entries`.
///
/// Fails with [`PdfError::Outline`] when the level sequence skips levels.
/// An empty list removes the outline. Entries whose page is outside the
/// document are written without a destination.
pub fn write_outline(doc: &mut Document, entries: &[OutlineEntry]) -> Result<(), PdfError> {
    validate_levels(entries)?;

    let catalog = catalog_id(doc)?;
    doc.get_object_mut(catalog)?
        .as_dict_mut()?
        .remove(b"Outlines");
    if entries.is_empty() {
        debug!("removed document outline");
        return Ok(());
    }

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let root_id = doc.new_object_id();
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    // Parent index per entry, `None` for top-level items.
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(entries.len());
    let mut open: Vec<usize> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        while open.last().is_some_and(|&top| entries[top].level >= entry.level) {
            open.pop();
        }
        parents.push(open.last().copied());
        open.push(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut top_level: Vec<usize> = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => top_level.push(i),
        }
    }

    // Entries come in document order, so every descendant follows its
    // ancestor and a reverse pass sees children first.
    let mut descendants = vec![0i64; entries.len()];
    for i in (0..entries.len()).rev() {
        descendants[i] = children[i].iter().map(|&c| 1 + descendants[c]).sum();
    }

    for (i, entry) in entries.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::String(encode_text(&entry.title), StringFormat::Literal),
            "Parent" => parents[i].map_or(root_id, |p| ids[p]),
        };
        match (entry.page as usize).checked_sub(1).and_then(|p| page_ids.get(p)) {
            Some(&page_id) => item.set("Dest", vec![Object::Reference(page_id), "Fit".into()]),
            None => debug!(
                "outline entry {:?} points at page {}, writing it without a destination",
                entry.title, entry.page
            ),
        }
        let siblings = parents[i].map_or(&top_level, |p| &children[p]);
        link_siblings(&mut item, siblings, i, &ids);
        link_children(&mut item, &children[i], &ids);
        if descendants[i] > 0 {
            item.set("Count", descendants[i]);
        }
        doc.objects.insert(ids[i], Object::Dictionary(item));
    }

    let mut root = dictionary! {
        "Type" => "Outlines",
        "Count" => entries.len() as i64,
    };
    link_children(&mut root, &top_level, &ids);
    doc.objects.insert(root_id, Object::Dictionary(root));

    doc.get_object_mut(catalog)?
        .as_dict_mut()?
        .set("Outlines", root_id);
    debug!("wrote {} outline entries", entries.len());
    Ok(())
}

fn link_siblings(item: &mut Dictionary, siblings: &[usize], index: usize, ids: &[ObjectId]) {
    let Some(pos) = siblings.iter().position(|&s| s == index) else {
        return;
    };
    if pos > 0 {
        item.set("Prev", ids[siblings[pos - 1]]);
    }
    if let Some(&next) = siblings.get(pos + 1) {
        item.set("Next", ids[next]);
    }
}

fn link_children(item: &mut Dictionary, children: &[usize], ids: &[ObjectId]) {
    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        item.set("First", ids[first]);
        item.set("Last", ids[last]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample_document;
    use folio_core::{HierarchyError, PdfDocument};

    fn entry(level: i32, title: &str, page: u32) -> OutlineEntry {
        OutlineEntry::new(level, title, page)
    }

    #[test]
    fn write_then_read_nested_outline() {
        let mut doc = sample_document(3);
        let outline = vec![
            entry(1, "Part I", 1),
            entry(2, "Chapter 1", 1),
            entry(3, "Section 1.1", 2),
            entry(2, "Chapter 2", 2),
            entry(1, "Part II", 3),
        ];
        doc.set_outline(&outline).unwrap();
        assert_eq!(doc.outline().unwrap(), outline);
    }

    #[test]
    fn write_sets_counts_and_links() {
        let mut doc = sample_document(2);
        doc.set_outline(&[entry(1, "a", 1), entry(2, "b", 1), entry(1, "c", 2)])
            .unwrap();

        let raw = doc.raw_doc();
        let catalog = raw.get_dictionary(catalog_id(raw).unwrap()).unwrap();
        let root_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let root = raw.get_dictionary(root_id).unwrap();
        assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 3);

        let first = raw
            .get_dictionary(root.get(b"First").unwrap().as_reference().unwrap())
            .unwrap();
        assert_eq!(first.get(b"Count").unwrap().as_i64().unwrap(), 1);
        assert!(first.has(b"Next"));
        assert!(!first.has(b"Prev"));
    }

    #[test]
    fn write_rejects_level_skips() {
        let mut doc = sample_document(2);
        let err = write_outline(doc.raw_doc_mut(), &[entry(1, "a", 1), entry(3, "b", 2)])
            .unwrap_err();
        assert!(matches!(
            err,
            PdfError::Outline(HierarchyError::LevelSkip { index: 1, .. })
        ));
    }

    #[test]
    fn empty_outline_removes_it() {
        let mut doc = sample_document(1);
        doc.set_outline(&[entry(1, "a", 1)]).unwrap();
        doc.set_outline(&[]).unwrap();
        assert!(doc.outline().unwrap().is_empty());
    }

    #[test]
    fn unresolved_pages_read_back_as_zero() {
        let mut doc = sample_document(1);
        doc.set_outline(&[entry(1, "dangling", 9)]).unwrap();
        assert_eq!(doc.outline().unwrap(), vec![entry(1, "dangling", 0)]);
    }

    #[test]
    fn non_ascii_titles_round_trip() {
        let mut doc = sample_document(1);
        doc.set_outline(&[entry(1, "Cap\u{00ED}tulo \u{00DA}nico", 1)])
            .unwrap();
        assert_eq!(doc.outline().unwrap()[0].title, "Cap\u{00ED}tulo \u{00DA}nico");
    }

    #[test]
    fn outline_follows_page_reorder() {
        let mut doc = sample_document(2);
        doc.set_outline(&[entry(1, "first", 1), entry(1, "second", 2)])
            .unwrap();
        doc.select_pages(&[1, 0]).unwrap();
        // Destinations point at page objects, so they move with the pages.
        assert_eq!(
            doc.outline().unwrap(),
            vec![entry(1, "first", 2), entry(1, "second", 1)]
        );
    }

    #[test]
    fn reads_named_and_action_destinations() {
        let mut doc = sample_document(2);
        let raw = doc.raw_doc_mut();
        let pages: Vec<ObjectId> = raw.get_pages().into_values().collect();

        let root_id = raw.new_object_id();
        let named_id = raw.new_object_id();
        let action_id = raw.new_object_id();
        raw.objects.insert(
            named_id,
            Object::Dictionary(dictionary! {
                "Title" => Object::string_literal("named"),
                "Parent" => root_id,
                "Dest" => Object::Name(b"chapter-two".to_vec()),
                "Next" => action_id,
            }),
        );
        raw.objects.insert(
            action_id,
            Object::Dictionary(dictionary! {
                "Title" => Object::string_literal("action"),
                "Parent" => root_id,
                "Prev" => named_id,
                "A" => dictionary! {
                    "S" => "GoTo",
                    "D" => vec![Object::Reference(pages[0]), "Fit".into()],
                },
            }),
        );
        raw.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => named_id,
                "Last" => action_id,
                "Count" => 2,
            }),
        );
        let dests_id = raw.add_object(dictionary! {
            "chapter-two" => vec![Object::Reference(pages[1]), "Fit".into()],
        });
        let catalog = catalog_id(raw).unwrap();
        let catalog = raw.get_object_mut(catalog).unwrap().as_dict_mut().unwrap();
        catalog.set("Outlines", root_id);
        catalog.set("Dests", dests_id);

        assert_eq!(
            doc.outline().unwrap(),
            vec![entry(1, "named", 2), entry(1, "action", 1)]
        );
    }
}

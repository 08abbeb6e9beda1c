//! Nested view of the outline, built from its flat display projection.

use serde::Serialize;

use crate::outline::DisplayEntry;

/// A bookmark with its nested children, as shown in a tree view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    pub level: i32,
    pub title: String,
    pub page: u32,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn leaf(entry: &DisplayEntry) -> Self {
        OutlineNode {
            level: entry.level,
            title: entry.title.clone(),
            page: entry.display_page,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, this one included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::size).sum::<usize>()
    }
}

/// Nest a display-normalized outline using a stack of open parents.
///
/// Each entry closes every open node at its level or deeper, then opens
/// itself under whatever is left on top of the stack. Input that still skips
/// levels is tolerated: the entry simply nests under the nearest shallower
/// node.
pub fn build_tree(entries: &[DisplayEntry]) -> Vec<OutlineNode> {
    let mut stack: Vec<OutlineNode> = Vec::new();
    let mut roots: Vec<OutlineNode> = Vec::new();

    for entry in entries {
        while stack.last().is_some_and(|top| top.level >= entry.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(OutlineNode::leaf(entry));
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

/// Pop the top node and attach it to its parent, or to the roots.
fn close_top(stack: &mut Vec<OutlineNode>, roots: &mut Vec<OutlineNode>) {
    if let Some(finished) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(finished),
            None => roots.push(finished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(level: i32, title: &str, page: u32) -> DisplayEntry {
        DisplayEntry {
            level,
            title: title.to_string(),
            display_page: page,
        }
    }

    #[test]
    fn test_build_tree_empty() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn test_build_tree_flat() {
        let tree = build_tree(&[display(1, "a", 1), display(1, "b", 2)]);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_build_tree_nested() {
        let entries = vec![
            display(1, "Part I", 1),
            display(2, "Chapter 1", 1),
            display(3, "Section 1.1", 2),
            display(2, "Chapter 2", 4),
            display(1, "Part II", 7),
        ];
        let tree = build_tree(&entries);

        assert_eq!(tree.len(), 2);
        let part_one = &tree[0];
        assert_eq!(part_one.title, "Part I");
        assert_eq!(part_one.children.len(), 2);
        assert_eq!(part_one.children[0].children[0].title, "Section 1.1");
        assert_eq!(part_one.children[1].page, 4);
        assert_eq!(part_one.size(), 4);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_build_tree_tolerates_skips() {
        let tree = build_tree(&[display(1, "a", 1), display(3, "deep", 1)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].title, "deep");
    }

    #[test]
    fn test_build_tree_keeps_order_of_siblings() {
        let entries = vec![
            display(1, "root", 1),
            display(2, "x", 1),
            display(2, "y", 2),
            display(2, "z", 3),
        ];
        let tree = build_tree(&entries);
        let titles: Vec<&str> = tree[0]
            .children
            .iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, vec!["x", "y", "z"]);
    }
}

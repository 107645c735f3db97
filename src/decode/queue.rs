//! Queue-position bookkeeping shared by training and inference.
//!
//! Queue positions form an arena: entries are appended in breadth-first
//! discovery order and refer to their parent by index, so an entry's
//! parent index is always strictly smaller than its own. Sibling lookup
//! and final tree assembly both work on that arena.

use crate::data::tree::{Tree, TreeNode};

/// Nearest earlier sibling of the entry at `pos` (0-based index into
/// the queue), if any.
///
/// Scans every earlier entry sharing the same parent with a smaller
/// child index and keeps the last match — the highest child index, not
/// the first or an average. Returns that entry's 0-based queue index.
pub fn nearest_left_sibling(entries: &[(usize, usize)], pos: usize) -> Option<usize> {
    let (parent, child_index) = entries[pos];
    let mut found = None;
    for (q, &(other_parent, other_child)) in entries.iter().enumerate().take(pos) {
        if other_parent == parent && other_child < child_index {
            found = Some(q);
        }
    }
    found
}

/// Attach every queue entry's subtree into its parent's recorded child
/// slot, walking from the last-discovered entry back to the root.
///
/// `entries[i]` is `(parent, child_index, node)` with 1-based parent
/// queue position and child index; entry 0 is the root. The parent's
/// slot must hold the placeholder recorded at discovery time.
pub fn assemble(mut entries: Vec<(usize, usize, Tree)>) -> Tree {
    for i in (1..entries.len()).rev() {
        let tree = std::mem::take(&mut entries[i].2);
        let (parent, child_index, _) = entries[i];
        entries[parent - 1]
            .2
            .set_child(child_index - 1, TreeNode::Subtree(tree));
    }
    match entries.into_iter().next() {
        Some((_, _, root)) => root,
        None => Tree::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vocab::NON_TERMINAL;

    #[test]
    fn sibling_lookup_picks_nearest_not_first() {
        // Root at 0, then three siblings under it (child indices 1..3).
        let entries = vec![(0, 1), (1, 1), (1, 2), (1, 3)];
        assert_eq!(nearest_left_sibling(&entries, 3), Some(2));
        assert_eq!(nearest_left_sibling(&entries, 2), Some(1));
        assert_eq!(nearest_left_sibling(&entries, 1), None);
        assert_eq!(nearest_left_sibling(&entries, 0), None);
    }

    #[test]
    fn sibling_lookup_ignores_other_parents() {
        let entries = vec![(0, 1), (1, 1), (1, 2), (2, 1), (2, 3)];
        // Entry 4's only earlier same-parent sibling is entry 3.
        assert_eq!(nearest_left_sibling(&entries, 4), Some(3));
        // Entry 3 has no earlier sibling under parent 2.
        assert_eq!(nearest_left_sibling(&entries, 3), None);
    }

    #[test]
    fn assemble_replaces_placeholders_back_to_front() {
        let mut root = Tree::new();
        root.add_child(TreeNode::Terminal(NON_TERMINAL));
        root.add_child(TreeNode::Terminal(7));

        let mut mid = Tree::new();
        mid.add_child(TreeNode::Terminal(NON_TERMINAL));

        let mut leaf = Tree::new();
        leaf.add_child(TreeNode::Terminal(9));

        let tree = assemble(vec![(0, 1, root), (1, 1, mid), (2, 1, leaf)]);
        let expected = Tree::with_children(vec![
            TreeNode::Subtree(Tree::with_children(vec![TreeNode::Subtree(
                Tree::with_children(vec![TreeNode::Terminal(9)]),
            )])),
            TreeNode::Terminal(7),
        ]);
        assert_eq!(tree, expected);
    }

    #[test]
    fn assemble_tolerates_unexpanded_entries() {
        // The last entry was discovered but never processed (depth cap):
        // its empty tree still lands in the parent's placeholder slot.
        let mut root = Tree::new();
        root.add_child(TreeNode::Terminal(NON_TERMINAL));

        let tree = assemble(vec![(0, 1, root), (1, 1, Tree::new())]);
        assert_eq!(
            tree,
            Tree::with_children(vec![TreeNode::Subtree(Tree::new())])
        );
    }
}

//! Variable-arity ordered tree.
//!
//! Each child slot holds either a terminal token id or a nested subtree.
//! Inference builds trees by appending children and later replacing
//! non-terminal placeholders with the subtrees they expanded into.

/// One child slot of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// A leaf token id (base or extended vocabulary).
    Terminal(u32),
    /// A nested subtree.
    Subtree(Tree),
}

/// An ordered tree of token ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub children: Vec<TreeNode>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Build a tree from child slots, for literals in tests and callers.
    pub fn with_children(children: Vec<TreeNode>) -> Self {
        Tree { children }
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn add_child(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    /// Replace the child at `index`. The slot must already exist; the
    /// drivers only ever replace placeholders they appended earlier.
    pub fn set_child(&mut self, index: usize, child: TreeNode) {
        self.children[index] = child;
    }

    /// 1 for a childless node, plus the deepest subtree below.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| match c {
                TreeNode::Terminal(_) => 0,
                TreeNode::Subtree(t) => t.depth(),
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_child_replaces_placeholder() {
        let mut t = Tree::new();
        t.add_child(TreeNode::Terminal(4));
        t.add_child(TreeNode::Terminal(7));
        t.set_child(0, TreeNode::Subtree(Tree::with_children(vec![TreeNode::Terminal(9)])));

        assert_eq!(t.num_children(), 2);
        match &t.children[0] {
            TreeNode::Subtree(sub) => assert_eq!(sub.children, vec![TreeNode::Terminal(9)]),
            other => panic!("expected subtree, got {other:?}"),
        }
    }

    #[test]
    fn depth_counts_nesting() {
        let leafy = Tree::with_children(vec![TreeNode::Terminal(5)]);
        assert_eq!(leafy.depth(), 1);

        let nested = Tree::with_children(vec![
            TreeNode::Terminal(5),
            TreeNode::Subtree(Tree::with_children(vec![TreeNode::Subtree(leafy)])),
        ]);
        assert_eq!(nested.depth(), 3);
    }
}

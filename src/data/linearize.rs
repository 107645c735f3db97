//! Ground-truth tree linearization for teacher-forced training.
//!
//! Flattens every tree in a batch breadth-first: each node's children
//! become one decoding position (queue position), subtree children are
//! replaced by the non-terminal placeholder and appended to that tree's
//! queue for later expansion. Per-level token rows are padded to the
//! batch-wide maximum width.

use crate::data::tree::{Tree, TreeNode};
use crate::decode::queue::assemble;
use crate::model::vocab::{END, NON_TERMINAL, PAD, START};

/// One discovered queue position of one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    /// Queue position (1-based) of the parent; 0 for the root.
    pub parent: usize,
    /// This node's 1-based index within its parent's children.
    pub child_index: usize,
}

/// Token rows for one level, `rows[i].len() == width` for every tree.
///
/// Layout per row: opener at 0 (START for level 1, NON_TERMINAL below),
/// the node's child tokens, END, then PAD. Trees with no entry at this
/// level keep an all-PAD row.
#[derive(Debug, Clone)]
pub struct LevelTokens {
    pub width: usize,
    pub rows: Vec<Vec<i32>>,
}

/// A batch of linearized trees: per-level token matrices plus the
/// per-tree queues that record parent/child-index structure.
#[derive(Debug, Clone)]
pub struct TargetBatch {
    pub levels: Vec<LevelTokens>,
    pub queues: Vec<Vec<TargetEntry>>,
}

impl TargetBatch {
    /// Number of levels any tree in the batch still has work at.
    pub fn max_level(&self) -> usize {
        self.levels.len()
    }

    /// Rebuild one tree from its queue and token rows. Inverse of
    /// [`linearize`] for well-formed input; used to check the
    /// round-trip law.
    pub fn reconstruct(&self, batch_index: usize) -> Tree {
        let queue = &self.queues[batch_index];
        let mut nodes = Vec::with_capacity(queue.len());
        for (q, entry) in queue.iter().enumerate() {
            let row = &self.levels[q].rows[batch_index];
            let mut node = Tree::new();
            for &tok in &row[1..] {
                if tok == END as i32 {
                    break;
                }
                node.add_child(TreeNode::Terminal(tok as u32));
            }
            nodes.push((entry.parent, entry.child_index, node));
        }
        assemble(nodes)
    }
}

/// Linearize a batch of ground-truth trees into per-level token rows.
pub fn linearize(trees: &[Tree]) -> TargetBatch {
    let batch = trees.len();
    let mut queues: Vec<Vec<TargetEntry>> = (0..batch)
        .map(|_| {
            vec![TargetEntry {
                parent: 0,
                child_index: 1,
            }]
        })
        .collect();
    let mut node_refs: Vec<Vec<&Tree>> = trees.iter().map(|t| vec![t]).collect();

    let mut levels = Vec::new();
    let mut cur = 1usize;
    let mut max_index = if batch == 0 { 0 } else { 1 };

    while cur <= max_index {
        let mut child_tokens: Vec<Vec<i32>> = Vec::with_capacity(batch);
        let mut max_children = 0usize;

        for i in 0..batch {
            let mut tokens = Vec::new();
            if queues[i].len() >= cur {
                let node = node_refs[i][cur - 1];
                for (ic, child) in node.children.iter().enumerate() {
                    match child {
                        TreeNode::Terminal(id) => tokens.push(*id as i32),
                        TreeNode::Subtree(sub) => {
                            tokens.push(NON_TERMINAL as i32);
                            queues[i].push(TargetEntry {
                                parent: cur,
                                child_index: ic + 1,
                            });
                            node_refs[i].push(sub);
                        }
                    }
                }
                if queues[i].len() > max_index {
                    max_index = queues[i].len();
                }
            }
            max_children = max_children.max(tokens.len());
            child_tokens.push(tokens);
        }

        let width = max_children + 2;
        let opener = if cur == 1 { START } else { NON_TERMINAL } as i32;
        let mut rows = Vec::with_capacity(batch);
        for (i, tokens) in child_tokens.iter().enumerate() {
            let mut row = vec![PAD as i32; width];
            if queues[i].len() >= cur {
                row[0] = opener;
                for (j, &tok) in tokens.iter().enumerate() {
                    row[j + 1] = tok;
                }
                row[tokens.len() + 1] = END as i32;
            }
            rows.push(row);
        }

        levels.push(LevelTokens { width, rows });
        cur += 1;
    }

    TargetBatch { levels, queues }
}

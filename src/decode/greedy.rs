//! Greedy inference driver.
//!
//! Starts from a single root queue entry and grows the queue as
//! non-terminal tokens are produced, feeding each step its own argmax
//! prediction. The depth and length caps are the only termination
//! guarantee; hitting either truncates that branch silently and raises
//! the outcome's `truncated` flag.

use burn::prelude::*;

use crate::data::tree::{Tree, TreeNode};
use crate::decode::queue::{assemble, nearest_left_sibling};
use crate::model::decoder::TreeDecoder;
use crate::model::vocab::Vocab;
use crate::model::{EncoderOutputs, RnnState};

/// Result of a greedy decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    pub tree: Tree,
    /// True when any branch hit the depth or length cap.
    pub truncated: bool,
}

struct DecodeEntry<B: Backend> {
    /// State cloned at discovery time; seeds this entry's sequence.
    seed: RnnState<B>,
    /// State after this entry's full sequence; what later siblings feed on.
    terminal: Option<RnnState<B>>,
    parent: usize,
    child_index: usize,
    node: Tree,
}

/// Decode a single tree greedily.
///
/// The encoder outputs must describe exactly one tree (batch size 1).
pub fn greedy_decode<B: Backend>(
    decoder: &TreeDecoder<B>,
    enc: &EncoderOutputs<B>,
    vocab: &Vocab,
    device: &B::Device,
) -> Result<DecodeOutcome, String> {
    if enc.node_embedding.dims()[0] != 1 {
        return Err(format!(
            "greedy decoding expects batch size 1, got {}",
            enc.node_embedding.dims()[0]
        ));
    }

    let hidden = decoder.hidden_size();
    let mut queue: Vec<DecodeEntry<B>> = vec![DecodeEntry {
        seed: decoder.root_state(enc),
        terminal: None,
        parent: 0,
        child_index: 1,
        node: Tree::new(),
    }];
    let mut truncated = false;

    let mut head = 1usize;
    while head <= queue.len() {
        if head > decoder.max_tree_depth() {
            truncated = true;
            break;
        }

        let mut state = queue[head - 1].seed.clone();
        let parent_hidden = state.hidden.clone();

        let meta: Vec<(usize, usize)> = queue.iter().map(|e| (e.parent, e.child_index)).collect();
        let sibling = nearest_left_sibling(&meta, head - 1)
            .and_then(|q| queue[q].terminal.as_ref())
            .map(|s| s.hidden.clone())
            .unwrap_or_else(|| Tensor::zeros([1, hidden], device));

        let opener = if head == 1 {
            vocab.start_id()
        } else {
            vocab.non_terminal_id()
        };
        let mut prev = token_tensor::<B>(opener, device);
        let mut node = Tree::new();
        let mut child_index = 1usize;

        loop {
            let out = decoder.decode_step(
                prev,
                &state,
                enc,
                parent_hidden.clone(),
                Some(sibling.clone()),
            )?;
            state = out.state;
            let word = argmax_id(&out.dist);

            if word == vocab.end_id() {
                break;
            }
            if node.num_children() >= decoder.max_seq_len() {
                truncated = true;
                break;
            }
            if word == vocab.non_terminal_id() {
                queue.push(DecodeEntry {
                    seed: state.clone(),
                    terminal: None,
                    parent: head,
                    child_index,
                    node: Tree::new(),
                });
            }
            node.add_child(TreeNode::Terminal(word));
            child_index += 1;
            prev = token_tensor::<B>(word, device);
        }

        queue[head - 1].node = node;
        queue[head - 1].terminal = Some(state);
        head += 1;
    }

    let entries: Vec<(usize, usize, Tree)> = queue
        .into_iter()
        .map(|e| (e.parent, e.child_index, e.node))
        .collect();
    Ok(DecodeOutcome {
        tree: assemble(entries),
        truncated,
    })
}

fn token_tensor<B: Backend>(id: u32, device: &B::Device) -> Tensor<B, 1, Int> {
    Tensor::from_data(TensorData::new(vec![id as i32], [1]), device)
}

fn argmax_id<B: Backend>(dist: &Tensor<B, 2>) -> u32 {
    let data = dist.clone().argmax(1).into_data().convert::<i64>();
    data.to_vec::<i64>().unwrap()[0] as u32
}

//! Batched teacher-forced training driver.
//!
//! Advances every tree in the batch through the same queue position at
//! once. Each position's sequence is seeded from the parent's state at
//! the child's slot (the root from the pooled graph state), fed the
//! nearest-left-sibling terminal hidden, and scored token-by-token with
//! negative log-likelihood. Positions a tree does not have are masked
//! out of the loss.

use burn::prelude::*;

use crate::data::linearize::{linearize, LevelTokens, TargetBatch};
use crate::data::tree::Tree;
use crate::decode::queue::nearest_left_sibling;
use crate::model::decoder::TreeDecoder;
use crate::model::vocab::PAD;
use crate::model::{EncoderOutputs, RnnState};
use crate::training::teacher::ForcingPolicy;

/// Floor added before the log so padded or collapsed probabilities
/// never produce -inf.
const LOG_EPS: f64 = 1e-31;

/// One teacher-forced pass over a batch of ground-truth trees.
///
/// Returns the summed negative log-likelihood divided by batch size as
/// a scalar tensor, so an autodiff backend can backprop through it.
/// Levels beyond the decoder's depth cap are silently skipped.
pub fn train_step<B: Backend>(
    decoder: &TreeDecoder<B>,
    enc: &EncoderOutputs<B>,
    trees: &[Tree],
    policy: &mut dyn ForcingPolicy,
    device: &B::Device,
) -> Result<Tensor<B, 1>, String> {
    let batch = trees.len();
    if batch == 0 {
        return Err("train_step: empty batch".to_string());
    }
    if enc.node_embedding.dims()[0] != batch {
        return Err(format!(
            "train_step: {} trees but encoder batch is {}",
            batch,
            enc.node_embedding.dims()[0]
        ));
    }

    let target = linearize(trees);
    let hidden = decoder.hidden_size();
    let root = decoder.root_state(enc);

    // State arena: arena[level-1][step], owned by this invocation.
    let mut arena: Vec<Vec<RnnState<B>>> = Vec::new();
    let mut total = Tensor::<B, 1>::zeros([1], device);

    for cur in 1..=target.max_level() {
        if cur > decoder.max_tree_depth() {
            break;
        }
        let level = &target.levels[cur - 1];

        let init = if cur == 1 {
            root.clone()
        } else {
            seed_states(&target, &arena, cur, batch, hidden, device)
        };
        let sibling = sibling_states(&target, &arena, cur, batch, hidden, device);
        let parent_hidden = init.hidden.clone();

        let mut states = vec![init];
        let mut prev_dist: Option<Tensor<B, 2>> = None;

        for t in 0..level.width - 1 {
            let forced = policy.use_ground_truth(t) || t == 0;
            let input: Tensor<B, 1, Int> = match (&prev_dist, forced) {
                (Some(dist), false) => dist.clone().argmax(1).squeeze_dim::<1>(1),
                _ => column_tensor::<B>(level, t, batch, device),
            };

            let out = decoder.decode_step(
                input,
                &states[t],
                enc,
                parent_hidden.clone(),
                Some(sibling.clone()),
            )?;

            let mut target_ids = Vec::with_capacity(batch);
            let mut mask = Vec::with_capacity(batch);
            for row in &level.rows {
                let tok = row[t + 1];
                target_ids.push(tok);
                mask.push(if tok == PAD as i32 { 0.0f32 } else { 1.0 });
            }
            let targets =
                Tensor::<B, 2, Int>::from_data(TensorData::new(target_ids, [batch, 1]), device);
            let picked = out.dist.clone().gather(1, targets); // [batch, 1]
            let logp = picked.add_scalar(LOG_EPS).log().squeeze_dim::<1>(1);
            let mask_t = Tensor::<B, 1>::from_data(TensorData::new(mask, [batch]), device);
            total = total + (logp * mask_t).sum().neg();

            prev_dist = Some(out.dist);
            states.push(out.state);
        }

        arena.push(states);
    }

    Ok(total.div_scalar(batch as f32))
}

/// Seed every tree's state at level `cur` from its parent's state at
/// the child's slot; trees without an entry here get zeros.
fn seed_states<B: Backend>(
    target: &TargetBatch,
    arena: &[Vec<RnnState<B>>],
    cur: usize,
    batch: usize,
    hidden: usize,
    device: &B::Device,
) -> RnnState<B> {
    let mut cells = Vec::with_capacity(batch);
    let mut hiddens = Vec::with_capacity(batch);
    for i in 0..batch {
        if target.queues[i].len() >= cur {
            let entry = &target.queues[i][cur - 1];
            let source = &arena[entry.parent - 1][entry.child_index];
            cells.push(source.cell.clone().slice([i..i + 1, 0..hidden]));
            hiddens.push(source.hidden.clone().slice([i..i + 1, 0..hidden]));
        } else {
            cells.push(Tensor::zeros([1, hidden], device));
            hiddens.push(Tensor::zeros([1, hidden], device));
        }
    }
    RnnState {
        cell: Tensor::cat(cells, 0),
        hidden: Tensor::cat(hiddens, 0),
    }
}

/// Per-tree nearest-left-sibling terminal hidden at level `cur`; zeros
/// where no earlier sibling exists.
fn sibling_states<B: Backend>(
    target: &TargetBatch,
    arena: &[Vec<RnnState<B>>],
    cur: usize,
    batch: usize,
    hidden: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut rows = Vec::with_capacity(batch);
    for i in 0..batch {
        let queue = &target.queues[i];
        let row = if queue.len() >= cur {
            let meta: Vec<(usize, usize)> =
                queue.iter().map(|e| (e.parent, e.child_index)).collect();
            nearest_left_sibling(&meta, cur - 1).map(|q| {
                // Queue position q+1 was fully decoded at arena[q]; its
                // last state is the sibling's terminal state.
                let states = &arena[q];
                states[states.len() - 1]
                    .hidden
                    .clone()
                    .slice([i..i + 1, 0..hidden])
            })
        } else {
            None
        };
        rows.push(row.unwrap_or_else(|| Tensor::zeros([1, hidden], device)));
    }
    Tensor::cat(rows, 0)
}

fn column_tensor<B: Backend>(
    level: &LevelTokens,
    t: usize,
    batch: usize,
    device: &B::Device,
) -> Tensor<B, 1, Int> {
    let col: Vec<i32> = level.rows.iter().map(|row| row[t]).collect();
    Tensor::from_data(TensorData::new(col, [batch]), device)
}

//! Composite tree decoder: step cell + attention/copy mixer.
//!
//! `decode_step` is the single-step primitive both drivers are built
//! on; it is also the operation a beam-search strategy consumes, one
//! queue position at a time, under the same seeding and sibling rules.

use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::attention::{AttentionMode, AttnMixer, AttnMixerConfig};
use super::cell::{TreeLstmCell, TreeLstmCellConfig};
use super::{EncoderOutputs, RnnState};

/// Pooling of node embeddings into the root seed when the encoder does
/// not supply an explicit graph-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphPooling {
    Max,
    Min,
    Mean,
}

/// Tree decoder configuration.
#[derive(Config, Debug)]
pub struct TreeDecoderConfig {
    /// Base output-vocabulary size.
    pub vocab_size: usize,
    /// Word embedding size.
    #[config(default = 300)]
    pub emb_size: usize,
    /// Recurrent hidden size; must match the encoder embedding size.
    #[config(default = 300)]
    pub hidden_size: usize,
    /// Dropout for the embedded input and the attention projection.
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Feed the nearest earlier sibling's hidden state at each step.
    #[config(default = true)]
    pub use_sibling: bool,
    /// Mix in the pointer/copy distribution over source positions.
    #[config(default = false)]
    pub use_copy: bool,
    /// Attention mode, fixed at construction.
    #[config(default = "AttentionMode::Uniform")]
    pub attention: AttentionMode,
    /// Root-seed pooling strategy.
    #[config(default = "GraphPooling::Max")]
    pub pooling: GraphPooling,
    /// Per-node token cap during inference; longer branches truncate.
    #[config(default = 512)]
    pub max_seq_len: usize,
    /// Queue-position cap; deeper levels are never entered.
    #[config(default = 256)]
    pub max_tree_depth: usize,
}

/// Output of one decoding step.
#[derive(Debug, Clone)]
pub struct StepOutput<B: Backend> {
    /// Probability distribution over the (possibly extended) output
    /// vocabulary, `[batch, vocab]`.
    pub dist: Tensor<B, 2>,
    /// New recurrent state; the seed for the next step at this level.
    pub state: RnnState<B>,
    /// Attention weights over the structural memory, `[batch, n]`.
    pub attention: Tensor<B, 2>,
}

/// The tree decoder.
#[derive(Module, Debug)]
pub struct TreeDecoder<B: Backend> {
    cell: TreeLstmCell<B>,
    mixer: AttnMixer<B>,
    pooling: Ignored<GraphPooling>,
    max_seq_len: usize,
    max_tree_depth: usize,
}

impl TreeDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TreeDecoder<B> {
        let cell = TreeLstmCellConfig::new(self.vocab_size, self.emb_size, self.hidden_size)
            .with_dropout(self.dropout)
            .with_use_sibling(self.use_sibling)
            .init(device);

        let mixer = AttnMixerConfig::new(self.hidden_size, self.vocab_size, cell.input_size())
            .with_dropout(self.dropout)
            .with_mode(self.attention)
            .with_use_copy(self.use_copy)
            .init(device);

        TreeDecoder {
            cell,
            mixer,
            pooling: Ignored(self.pooling),
            max_seq_len: self.max_seq_len,
            max_tree_depth: self.max_tree_depth,
        }
    }
}

impl<B: Backend> TreeDecoder<B> {
    /// One token-production step.
    ///
    /// - `input`: `[batch]` previous token ids
    /// - `state`: recurrent state entering this step
    /// - `parent_hidden`: terminal hidden of the parent queue position
    ///   (the level's seed hidden), fed at every step
    /// - `sibling_hidden`: nearest-left-sibling terminal hidden, zeros
    ///   when the node has no earlier sibling
    ///
    /// Fails fast when copy mode is on but `enc.copy` is absent, or when
    /// separate attention was configured without `enc.rnn_embedding`.
    pub fn decode_step(
        &self,
        input: Tensor<B, 1, Int>,
        state: &RnnState<B>,
        enc: &EncoderOutputs<B>,
        parent_hidden: Tensor<B, 2>,
        sibling_hidden: Option<Tensor<B, 2>>,
    ) -> Result<StepOutput<B>, String> {
        let (next, raw) = self.cell.forward(input, state, parent_hidden, sibling_hidden);
        let (dist, attention) = self.mixer.mix(
            &next.hidden,
            &next.cell,
            &raw,
            &enc.node_embedding,
            enc.rnn_embedding.as_ref(),
            enc.copy.as_ref(),
        )?;
        Ok(StepOutput {
            dist,
            state: next,
            attention,
        })
    }

    /// Root seed: the encoder's explicit graph-level state, or the
    /// pooled node embeddings used for both cell and hidden.
    pub fn root_state(&self, enc: &EncoderOutputs<B>) -> RnnState<B> {
        if let Some(seed) = &enc.graph_embedding {
            return seed.clone();
        }
        let pooled = match self.pooling.0 {
            GraphPooling::Max => enc.node_embedding.clone().max_dim(1).squeeze_dim::<2>(1),
            GraphPooling::Min => enc.node_embedding.clone().min_dim(1).squeeze_dim::<2>(1),
            GraphPooling::Mean => enc.node_embedding.clone().mean_dim(1).squeeze_dim::<2>(1),
        };
        RnnState {
            cell: pooled.clone(),
            hidden: pooled,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.cell.hidden_size()
    }

    pub fn use_sibling(&self) -> bool {
        self.cell.use_sibling()
    }

    pub fn use_copy(&self) -> bool {
        self.mixer.is_copy()
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn max_tree_depth(&self) -> usize {
        self.max_tree_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CopySource;
    use burn::backend::NdArray;

    type B = NdArray;

    fn encoder_outputs(batch: usize, n: usize, hidden: usize) -> EncoderOutputs<B> {
        let device = Default::default();
        EncoderOutputs {
            node_embedding: Tensor::ones([batch, n, hidden], &device),
            rnn_embedding: None,
            graph_embedding: None,
            copy: None,
        }
    }

    #[test]
    fn decode_step_shapes() {
        let device = Default::default();
        let decoder = TreeDecoderConfig::new(10)
            .with_emb_size(8)
            .with_hidden_size(16)
            .with_dropout(0.0)
            .init::<B>(&device);

        let enc = encoder_outputs(2, 5, 16);
        let state = decoder.root_state(&enc);
        let parent = state.hidden.clone();
        let input = Tensor::<B, 1, Int>::from_ints([1, 1], &device);

        let out = decoder
            .decode_step(input, &state, &enc, parent, None)
            .unwrap();
        assert_eq!(out.dist.dims(), [2, 10]);
        assert_eq!(out.state.hidden.dims(), [2, 16]);
        assert_eq!(out.attention.dims(), [2, 5]);
    }

    #[test]
    fn copy_decode_step_extends_vocab() {
        let device = Default::default();
        let decoder = TreeDecoderConfig::new(10)
            .with_emb_size(8)
            .with_hidden_size(16)
            .with_dropout(0.0)
            .with_use_copy(true)
            .init::<B>(&device);

        let mut enc = encoder_outputs(1, 4, 16);
        enc.copy = Some(CopySource {
            src_ids: Tensor::<B, 2, Int>::from_ints([[5, 10, 11, 5]], &device),
            extended_size: 12,
        });

        let state = decoder.root_state(&enc);
        let parent = state.hidden.clone();
        let input = Tensor::<B, 1, Int>::from_ints([1], &device);

        let out = decoder
            .decode_step(input, &state, &enc, parent, None)
            .unwrap();
        assert_eq!(out.dist.dims(), [1, 12]);

        let sum: f32 = out.dist.sum().into_data().to_vec::<f32>().unwrap()[0];
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn copy_without_source_is_an_error() {
        let device = Default::default();
        let decoder = TreeDecoderConfig::new(10)
            .with_emb_size(8)
            .with_hidden_size(16)
            .with_dropout(0.0)
            .with_use_copy(true)
            .init::<B>(&device);

        let enc = encoder_outputs(1, 4, 16);
        let state = decoder.root_state(&enc);
        let parent = state.hidden.clone();
        let input = Tensor::<B, 1, Int>::from_ints([1], &device);

        assert!(decoder.decode_step(input, &state, &enc, parent, None).is_err());
    }

    #[test]
    fn pooling_strategies_differ() {
        let device = Default::default();
        let node_embedding = Tensor::<B, 3>::from_floats([[[1.0, -2.0], [3.0, 0.0]]], &device);
        let enc = EncoderOutputs {
            node_embedding,
            rnn_embedding: None,
            graph_embedding: None,
            copy: None,
        };

        let max_dec = TreeDecoderConfig::new(10)
            .with_emb_size(4)
            .with_hidden_size(2)
            .with_dropout(0.0)
            .init::<B>(&device);
        let mean_dec = TreeDecoderConfig::new(10)
            .with_emb_size(4)
            .with_hidden_size(2)
            .with_dropout(0.0)
            .with_pooling(GraphPooling::Mean)
            .init::<B>(&device);

        let max_seed = max_dec.root_state(&enc).hidden.into_data().to_vec::<f32>().unwrap();
        let mean_seed = mean_dec.root_state(&enc).hidden.into_data().to_vec::<f32>().unwrap();
        assert_eq!(max_seed, vec![3.0, 0.0]);
        assert_eq!(mean_seed, vec![2.0, -1.0]);
    }
}

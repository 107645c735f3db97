//! Attention scoring and the attention/copy mixer.
//!
//! Dot-product attention over encoder memory, a tanh projection to
//! output-vocabulary logits, and the optional pointer-generation mix
//! that scatters attention mass onto extended-vocabulary slots.

use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softmax};
use burn::tensor::IndexingUpdateOp;
use serde::{Deserialize, Serialize};

use super::CopySource;

/// How attention context is computed, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttentionMode {
    /// One attention pass over the structural node embeddings.
    Uniform,
    /// Separate passes over the structural and auxiliary memories,
    /// fused before the output projection.
    Separate { fuse: FuseStrategy },
}

/// Fusion of the two context vectors in separate-attention mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuseStrategy {
    /// Average the contexts; projection input stays `2*hidden`.
    Average,
    /// Concatenate the contexts; projection input grows to `3*hidden`.
    Concatenate,
}

impl AttentionMode {
    /// Input width of the pre-output projection, in hidden-size units.
    pub fn proj_width(&self) -> usize {
        match self {
            AttentionMode::Uniform => 2,
            AttentionMode::Separate {
                fuse: FuseStrategy::Average,
            } => 2,
            AttentionMode::Separate {
                fuse: FuseStrategy::Concatenate,
            } => 3,
        }
    }
}

/// Dot-product attention.
///
/// - `query`: `[batch, hidden]`
/// - `memory`: `[batch, n, hidden]`
///
/// Returns `(context [batch, hidden], weights [batch, n])`; weights are
/// softmax-normalized over the memory positions.
pub fn dot_attention<B: Backend>(
    query: Tensor<B, 2>,
    memory: Tensor<B, 3>,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let scores = memory.clone().matmul(query.unsqueeze_dim::<3>(2)); // [B, n, 1]
    let weights = softmax(scores.squeeze_dim::<2>(2), 1); // [B, n]
    let context = weights
        .clone()
        .unsqueeze_dim::<3>(1)
        .matmul(memory)
        .squeeze_dim::<2>(1); // [B, hidden]
    (context, weights)
}

/// Mixer configuration.
#[derive(Config, Debug)]
pub struct AttnMixerConfig {
    pub hidden_size: usize,
    pub output_size: usize,
    /// Raw step-input width; needed to size the copy gate.
    pub step_input_size: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = "AttentionMode::Uniform")]
    pub mode: AttentionMode,
    #[config(default = false)]
    pub use_copy: bool,
}

/// Attention/copy mixer: hidden state in, output distribution out.
#[derive(Module, Debug)]
pub struct AttnMixer<B: Backend> {
    /// `(context .. hidden) -> hidden`, followed by tanh.
    linear_att: Linear<B>,
    /// `hidden -> output vocabulary` logits.
    linear_out: Linear<B>,
    dropout: Dropout,
    /// Copy gate over `(raw_input, cell, hidden, context)`; present only
    /// in copy mode.
    ptr: Option<Linear<B>>,
    mode: Ignored<AttentionMode>,
}

impl AttnMixerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttnMixer<B> {
        let h = self.hidden_size;
        let ptr = self.use_copy.then(|| {
            // raw step input + cell + hidden + context
            LinearConfig::new(self.step_input_size + 3 * h, 1).init(device)
        });
        AttnMixer {
            linear_att: LinearConfig::new(self.mode.proj_width() * h, h).init(device),
            linear_out: LinearConfig::new(h, self.output_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            ptr,
            mode: Ignored(self.mode),
        }
    }
}

impl<B: Backend> AttnMixer<B> {
    /// Mix recurrent output with encoder memory into a probability
    /// distribution over the output vocabulary.
    ///
    /// In copy mode the distribution covers the extended vocabulary
    /// (`copy.extended_size` columns); otherwise the base vocabulary.
    /// Also returns the attention weights over the structural memory.
    pub fn mix(
        &self,
        hidden: &Tensor<B, 2>,
        cell: &Tensor<B, 2>,
        raw_step_input: &Tensor<B, 2>,
        memory: &Tensor<B, 3>,
        aux_memory: Option<&Tensor<B, 3>>,
        copy: Option<&CopySource<B>>,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>), String> {
        let (context, weights) = dot_attention(hidden.clone(), memory.clone());

        let proj_in = match self.mode.0 {
            AttentionMode::Uniform => Tensor::cat(vec![context.clone(), hidden.clone()], 1),
            AttentionMode::Separate { fuse } => {
                let aux = aux_memory
                    .ok_or_else(|| "separate attention requires an auxiliary memory".to_string())?;
                let (aux_context, _) = dot_attention(hidden.clone(), aux.clone());
                match fuse {
                    FuseStrategy::Average => {
                        let fused = (context.clone() + aux_context) / 2.0;
                        Tensor::cat(vec![fused, hidden.clone()], 1)
                    }
                    FuseStrategy::Concatenate => {
                        Tensor::cat(vec![context.clone(), aux_context, hidden.clone()], 1)
                    }
                }
            }
        };

        let proj = self.linear_att.forward(proj_in).tanh();
        let logits = self.linear_out.forward(self.dropout.forward(proj));

        let dist = match (&self.ptr, copy) {
            (Some(ptr), Some(src)) => {
                let [batch, vocab] = logits.dims();
                let gate_in = Tensor::cat(
                    vec![
                        raw_step_input.clone(),
                        cell.clone(),
                        hidden.clone(),
                        context,
                    ],
                    1,
                );
                let prob_ptr = sigmoid(ptr.forward(gate_in)); // [B, 1]
                let prob_gen = prob_ptr.clone().neg() + 1.0;

                let gen = softmax(logits, 1) * prob_gen.expand([batch, vocab]);
                let extra = src.extended_size.saturating_sub(vocab);
                let padded = if extra > 0 {
                    let zeros = Tensor::zeros([batch, extra], &gen.device());
                    Tensor::cat(vec![gen, zeros], 1)
                } else {
                    gen
                };

                let n = weights.dims()[1];
                let pointed = weights.clone() * prob_ptr.expand([batch, n]);
                padded.scatter(1, src.src_ids.clone(), pointed, IndexingUpdateOp::Add)
            }
            (Some(_), None) => {
                return Err("copy mode enabled but no source token ids were provided".to_string())
            }
            (None, _) => softmax(logits, 1),
        };

        Ok((dist, weights))
    }

    pub fn is_copy(&self) -> bool {
        self.ptr.is_some()
    }
}

//! Model components: recurrent step cell, attention/copy mixer, and the
//! composite tree decoder, plus the data contracts shared with the
//! encoder collaborator.

pub mod attention;
pub mod cell;
pub mod decoder;
pub mod vocab;

use burn::prelude::*;

/// One recurrent state pair, `[batch, hidden]` each.
#[derive(Debug, Clone)]
pub struct RnnState<B: Backend> {
    pub cell: Tensor<B, 2>,
    pub hidden: Tensor<B, 2>,
}

/// Source-side inputs required by the copy mechanism.
#[derive(Debug, Clone)]
pub struct CopySource<B: Backend> {
    /// Source token ids remapped into the extended vocabulary, `[batch, n]`.
    /// In-vocab words keep their id; out-of-vocabulary words carry the id
    /// assigned by [`vocab::OovDict`].
    pub src_ids: Tensor<B, 2, Int>,
    /// Base vocabulary size plus the number of OOV words in this batch.
    pub extended_size: usize,
}

/// Everything the decoder consumes from the upstream graph encoder.
#[derive(Debug, Clone)]
pub struct EncoderOutputs<B: Backend> {
    /// Per-node embeddings, `[batch, n, hidden]`. Attention memory.
    pub node_embedding: Tensor<B, 3>,
    /// Auxiliary (RNN-encoded) node embeddings for separate attention.
    pub rnn_embedding: Option<Tensor<B, 3>>,
    /// Explicit root seed. When absent the decoder pools `node_embedding`
    /// and uses the pooled vector for both cell and hidden.
    pub graph_embedding: Option<RnnState<B>>,
    /// Copy-mechanism inputs; required when the decoder was built with
    /// `use_copy`.
    pub copy: Option<CopySource<B>>,
}

//! Recurrent step cell: one gated update per produced token.
//!
//! Input is the embedded previous token concatenated with the parent's
//! hidden state and, when sibling feeding is on, the nearest earlier
//! sibling's hidden state. The pre-update concatenation is returned
//! alongside the new state because the copy gate consumes it.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use super::vocab::UNK;
use super::RnnState;

/// Step cell configuration.
#[derive(Config, Debug)]
pub struct TreeLstmCellConfig {
    /// Base vocabulary size (embedding rows).
    pub vocab_size: usize,
    /// Word embedding size.
    pub emb_size: usize,
    /// Recurrent hidden size.
    pub hidden_size: usize,
    /// Dropout on the embedded input.
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Whether the sibling hidden state joins the step input.
    #[config(default = true)]
    pub use_sibling: bool,
}

/// LSTM step cell with parent (and optional sibling) feeding.
#[derive(Module, Debug)]
pub struct TreeLstmCell<B: Backend> {
    embedding: Embedding<B>,
    dropout: Dropout,
    /// Input projection to the four gates: `input_size -> 4*hidden`.
    w_ih: Linear<B>,
    /// Hidden projection to the four gates: `hidden -> 4*hidden`.
    w_hh: Linear<B>,
    vocab_size: usize,
    hidden_size: usize,
    use_sibling: bool,
}

impl TreeLstmCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TreeLstmCell<B> {
        let feed = if self.use_sibling { 2 } else { 1 };
        let input_size = self.emb_size + feed * self.hidden_size;
        TreeLstmCell {
            embedding: EmbeddingConfig::new(self.vocab_size, self.emb_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            w_ih: LinearConfig::new(input_size, 4 * self.hidden_size).init(device),
            w_hh: LinearConfig::new(self.hidden_size, 4 * self.hidden_size).init(device),
            vocab_size: self.vocab_size,
            hidden_size: self.hidden_size,
            use_sibling: self.use_sibling,
        }
    }
}

impl<B: Backend> TreeLstmCell<B> {
    /// One recurrent update. Pure function of its inputs.
    ///
    /// - `input`: `[batch]` previous token ids (extended ids allowed)
    /// - `prev`: previous cell/hidden, `[batch, hidden]`
    /// - `parent_hidden`: parent feeding input, `[batch, hidden]`
    /// - `sibling_hidden`: nearest-left-sibling hidden, zeros when absent
    ///
    /// Returns the new state and the raw (pre-update) step input.
    pub fn forward(
        &self,
        input: Tensor<B, 1, Int>,
        prev: &RnnState<B>,
        parent_hidden: Tensor<B, 2>,
        sibling_hidden: Option<Tensor<B, 2>>,
    ) -> (RnnState<B>, Tensor<B, 2>) {
        let ids = self.filter_oov(input);
        let emb_3d = self.embedding.forward(ids.unsqueeze_dim::<2>(1));
        let emb = self.dropout.forward(emb_3d.squeeze_dim::<2>(1));

        let raw = if self.use_sibling {
            let sibling = sibling_hidden.unwrap_or_else(|| parent_hidden.zeros_like());
            Tensor::cat(vec![emb, parent_hidden, sibling], 1)
        } else {
            Tensor::cat(vec![emb, parent_hidden], 1)
        };

        let [batch, _] = raw.dims();
        let h = self.hidden_size;
        let gates = self.w_ih.forward(raw.clone()) + self.w_hh.forward(prev.hidden.clone());

        let input_gate = sigmoid(gates.clone().slice([0..batch, 0..h]));
        let forget_gate = sigmoid(gates.clone().slice([0..batch, h..2 * h]));
        let cell_update = gates.clone().slice([0..batch, 2 * h..3 * h]).tanh();
        let output_gate = sigmoid(gates.slice([0..batch, 3 * h..4 * h]));

        let cell = forget_gate * prev.cell.clone() + input_gate * cell_update;
        let hidden = output_gate * cell.clone().tanh();

        (RnnState { cell, hidden }, raw)
    }

    /// Remap ids outside the base vocabulary (extended-vocab copies) to
    /// UNK before embedding lookup.
    fn filter_oov(&self, input: Tensor<B, 1, Int>) -> Tensor<B, 1, Int> {
        let over = input.clone().greater_equal_elem(self.vocab_size as i32);
        input.mask_fill(over, UNK as i32)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Width of the raw step input (copy-gate sizing).
    pub fn input_size(&self) -> usize {
        self.w_ih.weight.dims()[0]
    }

    pub fn use_sibling(&self) -> bool {
        self.use_sibling
    }
}

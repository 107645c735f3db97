//! graph2tree — level-order neural tree decoding.
//!
//! Decodes a variable-arity tree token-by-token from encoder output,
//! one breadth-first queue position at a time. Parent and sibling
//! recurrent states feed each node's sub-sequence; an attention/copy
//! mixer turns hidden states into output distributions.
//!
//! # Public API
//!
//! ```ignore
//! use graph2tree::{TreeDecoderConfig, train_step, greedy_decode};
//! let decoder = TreeDecoderConfig::new(vocab.size()).init::<B>(&device);
//! let loss = train_step(&decoder, &enc, &trees, &mut policy, &device)?;
//! let outcome = greedy_decode(&decoder, &enc, &vocab, &device)?;
//! ```
//!
//! The graph encoder that produces [`model::EncoderOutputs`] and the
//! beam-search strategy built on [`model::decoder::TreeDecoder::decode_step`]
//! are external collaborators.

pub mod data;
pub mod decode;
pub mod model;
pub mod training;

pub use data::linearize::{linearize, TargetBatch};
pub use data::tree::{Tree, TreeNode};
pub use decode::greedy::{greedy_decode, DecodeOutcome};
pub use model::decoder::{StepOutput, TreeDecoder, TreeDecoderConfig};
pub use model::vocab::{OovDict, Vocab};
pub use model::{CopySource, EncoderOutputs, RnnState};
pub use training::supervised::train_step;
pub use training::teacher::{AlwaysForce, ForcingPolicy, NeverForce, TeacherForcing};

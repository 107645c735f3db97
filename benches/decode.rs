//! Latency benchmark for the tree decoding pipeline.
//!
//! Measures each stage on a small CPU model:
//! 1. Batch linearization (BFS queue + token rows)
//! 2. Greedy level-order decoding (single graph)
//! 3. Teacher-forced training step (batch of 4)

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use graph2tree::data::linearize::linearize;
use graph2tree::data::tree::{Tree, TreeNode};
use graph2tree::decode::greedy::greedy_decode;
use graph2tree::model::decoder::TreeDecoderConfig;
use graph2tree::model::vocab::Vocab;
use graph2tree::model::EncoderOutputs;
use graph2tree::training::supervised::train_step;
use graph2tree::training::teacher::AlwaysForce;

use burn::prelude::*;
use burn::backend::NdArray;

type B = NdArray;

const HIDDEN: usize = 64;
const NODES: usize = 12;

/// A full binary tree of terminals with the given depth.
fn synthetic_tree(depth: usize, vocab_size: usize) -> Tree {
    fn grow(depth: usize, next: &mut u32, vocab_size: u32) -> TreeNode {
        if depth == 0 {
            let id = 5 + (*next % (vocab_size - 5));
            *next += 1;
            TreeNode::Terminal(id)
        } else {
            TreeNode::Subtree(Tree::with_children(vec![
                grow(depth - 1, next, vocab_size),
                grow(depth - 1, next, vocab_size),
            ]))
        }
    }
    let mut next = 0;
    let node = grow(depth, &mut next, vocab_size as u32);
    Tree::with_children(vec![node])
}

fn encoder_outputs(batch: usize, device: &<B as Backend>::Device) -> EncoderOutputs<B> {
    let data: Vec<f32> = (0..batch * NODES * HIDDEN)
        .map(|k| (k as f32 * 0.017).sin())
        .collect();
    EncoderOutputs {
        node_embedding: Tensor::from_data(TensorData::new(data, [batch, NODES, HIDDEN]), device),
        rnn_embedding: None,
        graph_embedding: None,
        copy: None,
    }
}

fn small_vocab() -> Vocab {
    let words: Vec<String> = (0..27).map(|i| format!("w{i}")).collect();
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    Vocab::new(&refs)
}

fn bench_linearize(c: &mut Criterion) {
    let shallow: Vec<Tree> = (0..8).map(|_| synthetic_tree(2, 32)).collect();
    let deep: Vec<Tree> = (0..8).map(|_| synthetic_tree(4, 32)).collect();

    let mut group = c.benchmark_group("linearize");
    group.bench_function("depth_2_x8", |b| b.iter(|| linearize(black_box(&shallow))));
    group.bench_function("depth_4_x8", |b| b.iter(|| linearize(black_box(&deep))));
    group.finish();
}

fn bench_greedy(c: &mut Criterion) {
    let device = Default::default();
    let vocab = small_vocab();
    let decoder = TreeDecoderConfig::new(vocab.size())
        .with_emb_size(32)
        .with_hidden_size(HIDDEN)
        .with_dropout(0.0)
        .with_max_seq_len(16)
        .with_max_tree_depth(8)
        .init::<B>(&device);
    let enc = encoder_outputs(1, &device);

    c.bench_function("greedy_decode", |b| {
        b.iter(|| greedy_decode(black_box(&decoder), black_box(&enc), &vocab, &device).unwrap())
    });
}

fn bench_train_step(c: &mut Criterion) {
    let device = Default::default();
    let decoder = TreeDecoderConfig::new(32)
        .with_emb_size(32)
        .with_hidden_size(HIDDEN)
        .with_dropout(0.0)
        .init::<B>(&device);
    let trees: Vec<Tree> = (0..4).map(|_| synthetic_tree(2, 32)).collect();
    let enc = encoder_outputs(4, &device);

    c.bench_function("train_step_batch4", |b| {
        b.iter(|| {
            train_step(
                black_box(&decoder),
                black_box(&enc),
                &trees,
                &mut AlwaysForce,
                &device,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_linearize, bench_greedy, bench_train_step);
criterion_main!(benches);

//! Tree data model and ground-truth linearization.

pub mod linearize;
pub mod tree;

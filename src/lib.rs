//! A multilayer perceptron classifier trained with full-batch gradient
//! descent and a softmax cross-entropy loss.
//!
//! The interesting logic lives in [`feed_forward`]: forward and backward
//! propagation through a stack of fully connected layers with ReLU
//! activations, the numerically stable softmax loss, and the per-iteration
//! weight update. Progress reporting is decoupled behind the [`monitor`]
//! module.

pub mod error;
pub mod feed_forward;
pub mod layer;
pub mod matrix;
pub mod monitor;

mod utils;

pub use crate::error::{Error, Result};

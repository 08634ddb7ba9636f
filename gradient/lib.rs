/*!
This crate trains three gradient based models, a linear [`Svm`](struct.Svm.html), a two layer neural network [`Ann`](struct.Ann.html), and [`MatrixFactorization`](struct.MatrixFactorization.html) for collaborative filtering. Each can be trained with a sequential baseline or with a concurrent trainer.

The concurrent trainers share one epoch loop, [`train_chunked`](fn.train_chunked.html). The rows are split into contiguous chunks and each chunk runs on its own scoped thread. A chunk takes a snapshot of the parameters, accumulates a delta against that snapshot, and then adds the delta to the shared parameters under the write side of a single `RwLock`. Chunks that start later may see the merged updates of chunks that finished earlier, so concurrent training is nondeterministic in the same way Hogwild style training is. In practice the outcome varies little from run to run.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod ann;
mod chunked;
mod matrix_factorization;
mod svm;

pub use self::ann::{Ann, AnnOptions, AnnParameters};
pub use self::chunked::{
	chunk_ranges, train_chunked, ChunkedModel, ChunkedTrainOptions, SharedParameters,
};
pub use self::matrix_factorization::{
	MatrixFactorization, MatrixFactorizationOptions, MatrixFactorizationParameters,
};
pub use self::svm::{Svm, SvmOptions, SvmParameters};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
	#[error("invalid options: {0}")]
	InvalidOptions(&'static str),
	#[error("expected {expected} entries along axis {axis} but got {actual}")]
	ShapeMismatch {
		axis: usize,
		expected: usize,
		actual: usize,
	},
	#[error("a chunk panicked during training")]
	WorkerPanicked,
	#[error("the shared parameters were poisoned by a panicking chunk")]
	PoisonedParameters,
}

/// Check that `data` has `expected` entries along `axis`.
fn check_len(axis: usize, expected: usize, actual: usize) -> Result<(), Error> {
	if expected != actual {
		return Err(Error::ShapeMismatch {
			axis,
			expected,
			actual,
		});
	}
	Ok(())
}

fn sigmoid(value: f32) -> f32 {
	1.0 / (1.0 + (-value).exp())
}

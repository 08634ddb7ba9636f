/*!
This crate prepares the numeric matrices consumed by the training crates.

A dataset is an `Array2<f32>` with one row per example. Every column but the last is a feature, and the last column is the label, `0.0` or `1.0`. The ratings matrices used by matrix factorization have one row per user and one column per item, where `0.0` means "not rated".
*/

#![allow(clippy::tabs_in_doc_comments)]

mod load;
mod reviews;
mod split;
pub mod synthetic;

pub use self::load::{from_csv_path, parse_records, FromCsvOptions, LabelEncoding};
pub use self::reviews::{ratings_matrix_from_reviews, reviews_from_csv_path, RatingsMatrix, Review};
pub use self::split::train_test_split;

use ndarray::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("the dataset has no label column")]
	NoLabelColumn,
	#[error("the train fraction must be in [0, 1], got {0}")]
	InvalidTrainFraction(f32),
	#[error(transparent)]
	Csv(#[from] csv::Error),
}

/// Split a dataset into its feature columns and its trailing label column.
pub fn split_features_and_labels(
	data: ArrayView2<f32>,
) -> Result<(ArrayView2<f32>, ArrayView1<f32>), Error> {
	if data.ncols() == 0 {
		return Err(Error::NoLabelColumn);
	}
	let (features, labels) = data.split_at(Axis(1), data.ncols() - 1);
	Ok((features, labels.index_axis_move(Axis(1), 0)))
}

/// The fraction of labels equal to `1.0`, or `None` for an empty dataset.
pub fn positive_fraction(labels: ArrayView1<f32>) -> Option<f32> {
	if labels.is_empty() {
		return None;
	}
	let n_positive = labels.iter().filter(|label| **label >= 0.5).count();
	Some(n_positive as f32 / labels.len() as f32)
}

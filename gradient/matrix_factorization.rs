use crate::{
	chunked::{train_chunked, ChunkedModel, ChunkedTrainOptions, SharedParameters},
	check_len, Error,
};
use ndarray::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use speedup_metrics::{RootMeanSquaredError, StreamingMetric};
use speedup_util::Execution;

/// These are the options passed to `MatrixFactorization::new`.
#[derive(Clone, Debug)]
pub struct MatrixFactorizationOptions {
	pub n_users: usize,
	pub n_items: usize,
	/// The number of latent factors for each user and item.
	pub n_factors: usize,
	pub learning_rate: f32,
	/// The L2 regularization strength applied to the factors.
	pub regularization: f32,
	pub epochs: usize,
	/// The seed for the generator that draws the initial factors.
	pub seed: u64,
	pub n_chunks: usize,
	pub execution: Execution,
	/// If true, the RMSE on the observed training ratings is recorded after every epoch.
	pub compute_loss: bool,
}

impl Default for MatrixFactorizationOptions {
	fn default() -> Self {
		Self {
			n_users: 0,
			n_items: 0,
			n_factors: 10,
			learning_rate: 0.01,
			regularization: 0.02,
			epochs: 20,
			seed: 42,
			n_chunks: 4,
			execution: Execution::Concurrent,
			compute_loss: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatrixFactorizationParameters {
	/// The user factors with shape `(n_users, n_factors)`.
	pub user_factors: Array2<f32>,
	/// The item factors with shape `(n_items, n_factors)`.
	pub item_factors: Array2<f32>,
}

impl MatrixFactorizationParameters {
	fn predict(&self, user_index: usize, item_index: usize) -> f32 {
		self.user_factors
			.row(user_index)
			.dot(&self.item_factors.row(item_index))
	}
}

/// The update accumulated by one chunk. Chunks cover a contiguous range of users starting at `user_start`, so only those users' rows are stored.
struct MatrixFactorizationDelta {
	user_start: usize,
	user_factors: Array2<f32>,
	item_factors: Array2<f32>,
}

/**
Matrix factorization for collaborative filtering. A ratings matrix with one row per user and one column per item is approximated by the product of user factors and item factors, fit by stochastic gradient descent on the observed ratings. A rating of `0.0` means the user has not rated the item.
*/
#[derive(Clone, Debug)]
pub struct MatrixFactorization {
	pub options: MatrixFactorizationOptions,
	pub parameters: MatrixFactorizationParameters,
	/// The RMSE on the observed training ratings after each epoch, if `compute_loss` was set.
	pub losses: Vec<f32>,
}

struct MatrixFactorizationTrainer {
	n_items: usize,
	n_factors: usize,
	learning_rate: f32,
	regularization: f32,
}

impl ChunkedModel for MatrixFactorizationTrainer {
	type Parameters = MatrixFactorizationParameters;
	type Delta = MatrixFactorizationDelta;

	fn accumulate_chunk(
		&self,
		snapshot: &MatrixFactorizationParameters,
		_live: &SharedParameters<MatrixFactorizationParameters>,
		chunk: ArrayView2<f32>,
		chunk_start: usize,
	) -> Result<MatrixFactorizationDelta, Error> {
		let mut delta = MatrixFactorizationDelta {
			user_start: chunk_start,
			user_factors: Array2::zeros((chunk.nrows(), self.n_factors)),
			item_factors: Array2::zeros((self.n_items, self.n_factors)),
		};
		for (chunk_row_index, user_ratings) in chunk.axis_iter(Axis(0)).enumerate() {
			// Factors are looked up by the user's index in the whole matrix, not in the chunk.
			let user_index = chunk_start + chunk_row_index;
			let user_factors = snapshot.user_factors.row(user_index);
			for (item_index, rating) in user_ratings.iter().enumerate() {
				if *rating <= 0.0 {
					continue;
				}
				let item_factors = snapshot.item_factors.row(item_index);
				let error = rating - user_factors.dot(&item_factors);
				let mut user_delta = delta.user_factors.row_mut(chunk_row_index);
				user_delta.scaled_add(self.learning_rate * error, &item_factors);
				user_delta.scaled_add(-self.learning_rate * self.regularization, &user_factors);
				let mut item_delta = delta.item_factors.row_mut(item_index);
				item_delta.scaled_add(self.learning_rate * error, &user_factors);
				item_delta.scaled_add(-self.learning_rate * self.regularization, &item_factors);
			}
		}
		Ok(delta)
	}

	fn merge(parameters: &mut MatrixFactorizationParameters, delta: MatrixFactorizationDelta) {
		let user_end = delta.user_start + delta.user_factors.nrows();
		let mut user_factors = parameters
			.user_factors
			.slice_mut(s![delta.user_start..user_end, ..]);
		user_factors += &delta.user_factors;
		parameters.item_factors += &delta.item_factors;
	}

	fn train_example(
		&self,
		parameters: &mut MatrixFactorizationParameters,
		user_ratings: ArrayView1<f32>,
		user_index: usize,
	) {
		for (item_index, rating) in user_ratings.iter().enumerate() {
			if *rating <= 0.0 {
				continue;
			}
			let user_factors = parameters.user_factors.row(user_index).to_owned();
			let item_factors = parameters.item_factors.row(item_index).to_owned();
			let error = rating - user_factors.dot(&item_factors);
			let mut user_row = parameters.user_factors.row_mut(user_index);
			user_row.scaled_add(self.learning_rate * error, &item_factors);
			user_row.scaled_add(-self.learning_rate * self.regularization, &user_factors);
			let mut item_row = parameters.item_factors.row_mut(item_index);
			item_row.scaled_add(self.learning_rate * error, &user_factors);
			item_row.scaled_add(-self.learning_rate * self.regularization, &item_factors);
		}
	}
}

impl MatrixFactorization {
	/// Create an untrained model. Every factor is drawn uniformly from `[0, 0.1)` with a generator seeded by `options.seed`.
	pub fn new(options: MatrixFactorizationOptions) -> MatrixFactorization {
		let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
		let user_factors = Array2::from_shape_fn((options.n_users, options.n_factors), |_| {
			rng.gen_range(0.0f32, 0.1f32)
		});
		let item_factors = Array2::from_shape_fn((options.n_items, options.n_factors), |_| {
			rng.gen_range(0.0f32, 0.1f32)
		});
		MatrixFactorization {
			options,
			parameters: MatrixFactorizationParameters {
				user_factors,
				item_factors,
			},
			losses: Vec::new(),
		}
	}

	/// Train on a `(n_users, n_items)` ratings matrix. Training continues from the current factors.
	pub fn train(&mut self, ratings: ArrayView2<f32>) -> Result<(), Error> {
		check_len(0, self.options.n_users, ratings.nrows())?;
		check_len(1, self.options.n_items, ratings.ncols())?;
		let trainer = MatrixFactorizationTrainer {
			n_items: self.options.n_items,
			n_factors: self.options.n_factors,
			learning_rate: self.options.learning_rate,
			regularization: self.options.regularization,
		};
		let train_options = ChunkedTrainOptions {
			epochs: self.options.epochs,
			n_chunks: self.options.n_chunks,
			execution: self.options.execution,
		};
		let compute_loss = self.options.compute_loss;
		let losses = &mut self.losses;
		let mut shared = SharedParameters::new(self.parameters.clone());
		train_chunked(&trainer, &mut shared, ratings, &train_options, &mut |parameters| {
			if compute_loss {
				if let Some(loss) = rmse(parameters, ratings) {
					losses.push(loss);
				}
			}
		})?;
		self.parameters = shared.into_inner()?;
		Ok(())
	}

	/// Predict the rating `user_index` would give `item_index`. Both must be in range.
	pub fn predict(&self, user_index: usize, item_index: usize) -> f32 {
		self.parameters.predict(user_index, item_index)
	}

	/// The root mean squared error over the observed entries of `ratings`, or `None` if no entry is observed.
	pub fn rmse(&self, ratings: ArrayView2<f32>) -> Option<f32> {
		rmse(&self.parameters, ratings)
	}
}

fn rmse(parameters: &MatrixFactorizationParameters, ratings: ArrayView2<f32>) -> Option<f32> {
	let mut metric = RootMeanSquaredError::default();
	for ((user_index, item_index), rating) in ratings.indexed_iter() {
		if *rating > 0.0 {
			metric.update((parameters.predict(user_index, item_index), *rating));
		}
	}
	metric.finalize()
}

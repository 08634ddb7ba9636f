use crate::Error;
use ndarray::prelude::*;
use speedup_util::Execution;
use std::{ops::Range, sync::RwLock, time::Instant};

/// The parameters of a model behind a single lock. Chunks read a snapshot at their start and merge their delta once at their end. Reads share the lock and only merges take it exclusively.
#[derive(Debug)]
pub struct SharedParameters<P>(RwLock<P>);

impl<P: Clone> SharedParameters<P> {
	pub fn new(parameters: P) -> Self {
		Self(RwLock::new(parameters))
	}

	/// Clone the current parameters.
	pub fn snapshot(&self) -> Result<P, Error> {
		self.with(P::clone)
	}

	/// Run `f` with the current parameters while holding a read lock. Any number of readers may hold it at once.
	pub fn with<T>(&self, f: impl FnOnce(&P) -> T) -> Result<T, Error> {
		let parameters = self.0.read().map_err(|_| Error::PoisonedParameters)?;
		Ok(f(&*parameters))
	}

	/// Run `f` with mutable access to the current parameters while holding the write lock.
	pub fn update(&self, f: impl FnOnce(&mut P)) -> Result<(), Error> {
		let mut parameters = self.0.write().map_err(|_| Error::PoisonedParameters)?;
		f(&mut *parameters);
		Ok(())
	}

	pub fn get_mut(&mut self) -> Result<&mut P, Error> {
		self.0.get_mut().map_err(|_| Error::PoisonedParameters)
	}

	pub fn into_inner(self) -> Result<P, Error> {
		self.0.into_inner().map_err(|_| Error::PoisonedParameters)
	}
}

/**
A model that can be trained by [`train_chunked`](fn.train_chunked.html). The implementor holds the hyperparameters and `Parameters` holds the state that training updates.
*/
pub trait ChunkedModel: Sync {
	type Parameters: Clone + Send + Sync;
	type Delta: Send;

	/// Compute the update for the rows in `chunk` against `snapshot`. `chunk_start` is the index of the first row of `chunk` in the dataset. `live` may be read for terms that use the current shared parameters rather than the snapshot.
	fn accumulate_chunk(
		&self,
		snapshot: &Self::Parameters,
		live: &SharedParameters<Self::Parameters>,
		chunk: ArrayView2<f32>,
		chunk_start: usize,
	) -> Result<Self::Delta, Error>;

	/// Add `delta` to `parameters`.
	fn merge(parameters: &mut Self::Parameters, delta: Self::Delta);

	/// Apply the update for a single row directly to `parameters`. This is the sequential baseline.
	fn train_example(&self, parameters: &mut Self::Parameters, example: ArrayView1<f32>, row_index: usize);
}

/// These are the options passed to `train_chunked`.
#[derive(Clone, Debug)]
pub struct ChunkedTrainOptions {
	/// The number of passes over the dataset.
	pub epochs: usize,
	/// With `Execution::Concurrent`, the rows are split into this many contiguous chunks, each trained on its own thread.
	pub n_chunks: usize,
	pub execution: Execution,
}

impl Default for ChunkedTrainOptions {
	fn default() -> Self {
		Self {
			epochs: 10,
			n_chunks: 4,
			execution: Execution::Concurrent,
		}
	}
}

/// Split `0..n_rows` into `n_chunks` contiguous ranges of `n_rows / n_chunks` rows. The remainder goes to the last range.
pub fn chunk_ranges(n_rows: usize, n_chunks: usize) -> Vec<Range<usize>> {
	if n_chunks == 0 {
		return Vec::new();
	}
	let chunk_size = n_rows / n_chunks;
	(0..n_chunks)
		.map(|chunk_index| {
			let start = chunk_index * chunk_size;
			let end = if chunk_index == n_chunks - 1 {
				n_rows
			} else {
				start + chunk_size
			};
			start..end
		})
		.collect()
}

/**
Train `model` for `options.epochs` epochs, updating `shared` in place. `on_epoch_end` is called with the parameters after every epoch.

With `Execution::Sequential`, every row is passed to `ChunkedModel::train_example` in order. With `Execution::Concurrent`, each chunk runs on a scoped thread that snapshots the parameters, calls `ChunkedModel::accumulate_chunk`, and merges the delta under the write lock. An epoch ends when every chunk has merged. If a chunk panics or the lock is poisoned, training stops with an error.
*/
pub fn train_chunked<M: ChunkedModel>(
	model: &M,
	shared: &mut SharedParameters<M::Parameters>,
	data: ArrayView2<f32>,
	options: &ChunkedTrainOptions,
	on_epoch_end: &mut dyn FnMut(&M::Parameters),
) -> Result<(), Error> {
	if options.execution.is_concurrent() && options.n_chunks == 0 {
		return Err(Error::InvalidOptions("n_chunks must be at least 1"));
	}
	let start = Instant::now();
	let chunk_ranges = chunk_ranges(data.nrows(), options.n_chunks);
	for epoch in 0..options.epochs {
		match options.execution {
			Execution::Sequential => {
				let parameters = shared.get_mut()?;
				for (row_index, example) in data.axis_iter(Axis(0)).enumerate() {
					model.train_example(parameters, example, row_index);
				}
			}
			Execution::Concurrent => {
				train_epoch_concurrent(model, shared, data, &chunk_ranges)?;
			}
		}
		on_epoch_end(shared.get_mut()?);
		log::debug!("finished epoch {} of {}", epoch + 1, options.epochs);
	}
	log::info!(
		"trained {} epochs on {} rows in {:?} with {:?} execution",
		options.epochs,
		data.nrows(),
		start.elapsed(),
		options.execution,
	);
	Ok(())
}

fn train_epoch_concurrent<M: ChunkedModel>(
	model: &M,
	shared: &SharedParameters<M::Parameters>,
	data: ArrayView2<f32>,
	chunk_ranges: &[Range<usize>],
) -> Result<(), Error> {
	crossbeam::thread::scope(|scope| {
		let handles: Vec<_> = chunk_ranges
			.iter()
			.filter(|chunk_range| !chunk_range.is_empty())
			.cloned()
			.map(|chunk_range| {
				scope.spawn(move |_| -> Result<(), Error> {
					let snapshot = shared.snapshot()?;
					let chunk = data.slice(s![chunk_range.clone(), ..]);
					let delta = model.accumulate_chunk(&snapshot, shared, chunk, chunk_range.start)?;
					shared.update(|parameters| M::merge(parameters, delta))
				})
			})
			.collect();
		handles
			.into_iter()
			.map(|handle| {
				handle
					.join()
					.map_err(|_| Error::WorkerPanicked)
					.and_then(|result| result)
			})
			.collect::<Result<(), Error>>()
	})
	.map_err(|_| Error::WorkerPanicked)?
}

#[cfg(test)]
mod test {
	use super::*;

	/// Counts how many times each row is visited.
	struct VisitCounter;

	impl ChunkedModel for VisitCounter {
		type Parameters = Vec<u32>;
		type Delta = Vec<(usize, u32)>;

		fn accumulate_chunk(
			&self,
			_snapshot: &Vec<u32>,
			_live: &SharedParameters<Vec<u32>>,
			chunk: ArrayView2<f32>,
			chunk_start: usize,
		) -> Result<Self::Delta, Error> {
			Ok((chunk_start..chunk_start + chunk.nrows())
				.map(|row_index| (row_index, 1))
				.collect())
		}

		fn merge(parameters: &mut Vec<u32>, delta: Self::Delta) {
			for (row_index, count) in delta {
				parameters[row_index] += count;
			}
		}

		fn train_example(&self, parameters: &mut Vec<u32>, _example: ArrayView1<f32>, row_index: usize) {
			parameters[row_index] += 1;
		}
	}

	/// Sums the first column.
	struct ColumnSum;

	impl ChunkedModel for ColumnSum {
		type Parameters = f64;
		type Delta = f64;

		fn accumulate_chunk(
			&self,
			_snapshot: &f64,
			_live: &SharedParameters<f64>,
			chunk: ArrayView2<f32>,
			chunk_start: usize,
		) -> Result<f64, Error> {
			if chunk_start > 0 && chunk[[0, 0]] < 0.0 {
				panic!("negative value");
			}
			Ok(chunk.column(0).iter().map(|value| f64::from(*value)).sum())
		}

		fn merge(parameters: &mut f64, delta: f64) {
			*parameters += delta;
		}

		fn train_example(&self, parameters: &mut f64, example: ArrayView1<f32>, _row_index: usize) {
			*parameters += f64::from(example[0]);
		}
	}

	#[test]
	fn test_chunk_ranges() {
		assert_eq!(chunk_ranges(10, 4), vec![0..2, 2..4, 4..6, 6..10]);
		assert_eq!(chunk_ranges(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
		assert_eq!(chunk_ranges(3, 4), vec![0..0, 0..0, 0..0, 0..3]);
		assert_eq!(chunk_ranges(5, 1), vec![0..5]);
		assert!(chunk_ranges(5, 0).is_empty());
	}

	#[test]
	fn test_every_row_is_visited_once_per_epoch() {
		let data = Array2::<f32>::zeros((23, 2));
		for execution in &[Execution::Sequential, Execution::Concurrent] {
			let mut shared = SharedParameters::new(vec![0; 23]);
			let mut n_epochs_ended = 0;
			let options = ChunkedTrainOptions {
				epochs: 3,
				n_chunks: 4,
				execution: *execution,
			};
			train_chunked(&VisitCounter, &mut shared, data.view(), &options, &mut |_| {
				n_epochs_ended += 1
			})
			.unwrap();
			assert_eq!(n_epochs_ended, 3);
			assert_eq!(shared.into_inner().unwrap(), vec![3; 23]);
		}
	}

	#[test]
	fn test_additive_model_matches_sequential() {
		let data = Array2::from_shape_fn((101, 1), |(row, _)| row as f32);
		let train = |execution: Execution| {
			let mut shared = SharedParameters::new(0.0);
			let options = ChunkedTrainOptions {
				epochs: 2,
				n_chunks: 4,
				execution,
			};
			train_chunked(&ColumnSum, &mut shared, data.view(), &options, &mut |_| {}).unwrap();
			shared.into_inner().unwrap()
		};
		assert_eq!(train(Execution::Sequential), 10100.0);
		assert_eq!(train(Execution::Concurrent), 10100.0);
	}

	#[test]
	fn test_panicking_chunk_is_an_error() {
		let data = Array2::from_elem((8, 1), -1.0);
		let mut shared = SharedParameters::new(0.0);
		let result = train_chunked(
			&ColumnSum,
			&mut shared,
			data.view(),
			&ChunkedTrainOptions::default(),
			&mut |_| {},
		);
		assert_eq!(result, Err(Error::WorkerPanicked));
	}

	#[test]
	fn test_poisoned_parameters_are_an_error() {
		let mut shared = SharedParameters::new(0.0);
		crossbeam::thread::scope(|scope| {
			scope.spawn(|_| {
				shared
					.update(|_| panic!("poison the lock"))
					.ok();
			});
		})
		.ok();
		let data = Array2::<f32>::zeros((4, 1));
		for execution in &[Execution::Sequential, Execution::Concurrent] {
			let options = ChunkedTrainOptions {
				execution: *execution,
				..Default::default()
			};
			let result = train_chunked(&ColumnSum, &mut shared, data.view(), &options, &mut |_| {});
			assert_eq!(result, Err(Error::PoisonedParameters));
		}
	}

	#[test]
	fn test_readers_do_not_block_each_other() {
		let shared = SharedParameters::new(vec![1.0, 2.0]);
		// A second thread can snapshot while this thread holds a read.
		let snapshot = shared
			.with(|_| {
				crossbeam::thread::scope(|scope| {
					scope.spawn(|_| shared.snapshot()).join().unwrap()
				})
				.unwrap()
			})
			.unwrap()
			.unwrap();
		assert_eq!(snapshot, vec![1.0, 2.0]);
		shared.update(|parameters| parameters[0] = 3.0).unwrap();
		assert_eq!(shared.snapshot().unwrap(), vec![3.0, 2.0]);
	}

	#[test]
	fn test_zero_chunks_is_invalid() {
		let data = Array2::<f32>::zeros((4, 1));
		let mut shared = SharedParameters::new(0.0);
		let options = ChunkedTrainOptions {
			n_chunks: 0,
			..Default::default()
		};
		assert!(matches!(
			train_chunked(&ColumnSum, &mut shared, data.view(), &options, &mut |_| {}),
			Err(Error::InvalidOptions(_))
		));
	}
}

use crate::{
	bootstrap::bootstrap_sample, feature_importances::compute_feature_importances, Error, Tree,
	TreeTrainOptions,
};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use speedup_util::{progress_counter::ProgressCounter, worker_pool::drain_job_queue, Execution};
use std::time::Instant;

/// These are the options passed to `Forest::train`.
#[derive(Clone, Debug)]
pub struct ForestTrainOptions {
	/// The number of trees in the forest.
	pub n_trees: usize,
	/// Each tree is trained on a bootstrap sample of `round(n_rows * subset_ratio)` rows. It must be in `(0, 1]`.
	pub subset_ratio: f32,
	/// The number of workers that drain the queue of trees with `Execution::Concurrent`.
	pub n_workers: usize,
	/// Tree `i` draws its bootstrap sample from a generator seeded with `seed + i`.
	pub seed: u64,
	pub tree_options: TreeTrainOptions,
	/// With `Execution::Sequential`, the trees are trained one after another on the calling thread.
	pub execution: Execution,
}

impl Default for ForestTrainOptions {
	fn default() -> Self {
		Self {
			n_trees: 10,
			subset_ratio: 0.8,
			n_workers: rayon::current_num_threads(),
			seed: 42,
			tree_options: TreeTrainOptions::default(),
			execution: Execution::Concurrent,
		}
	}
}

/// This is passed to the `update_progress` callback of `Forest::train`. The counter is incremented once for each finished tree.
#[derive(Clone, Debug)]
pub struct TrainProgress(pub ProgressCounter);

/// A `Forest` is a collection of trees trained on bootstrap samples of the same dataset. Its prediction is the mean of the trees' predictions.
#[derive(Clone, Debug, PartialEq)]
pub struct Forest {
	/// The trees in the order of their indexes, which is independent of the order in which they finished training.
	pub trees: Vec<Tree>,
	/// The number of features the forest was trained on, not counting the label.
	pub n_features: usize,
}

impl Forest {
	/**
	Train a forest on `data`, whose last column is the label.

	With `Execution::Concurrent`, the tree indexes `0..n_trees` are loaded into a closed queue that `n_workers` threads drain. Each tree is stored in the slot for its index, so the forest does not depend on which worker trained which tree. Since the bootstrap sample for tree `i` only depends on `seed + i`, the trained forest is the same for every number of workers and for both executions.
	*/
	pub fn train(
		data: ArrayView2<f32>,
		options: &ForestTrainOptions,
		update_progress: &mut dyn FnMut(TrainProgress),
	) -> Result<Forest, Error> {
		validate_options(options)?;
		if data.ncols() == 0 {
			return Err(Error::NoLabelColumn);
		}
		let n_features = data.ncols() - 1;
		let progress_counter = ProgressCounter::new(options.n_trees.to_u64().unwrap());
		update_progress(TrainProgress(progress_counter.clone()));
		log::debug!(
			"training {} trees on {} rows with {:?} execution",
			options.n_trees,
			data.nrows(),
			options.execution,
		);
		let start = Instant::now();
		let train_and_count = |tree_index: usize| {
			let tree = train_tree(data, options, tree_index);
			progress_counter.inc(1);
			log::debug!(
				"finished tree {}, {:.0}% of the forest is trained",
				tree_index,
				progress_counter.fraction() * 100.0,
			);
			tree
		};
		let trees = match options.execution {
			Execution::Sequential => (0..options.n_trees).map(train_and_count).collect(),
			Execution::Concurrent => {
				drain_job_queue(options.n_trees, options.n_workers, train_and_count)?
			}
		};
		log::info!(
			"trained {} trees in {:?} with {:?} execution",
			options.n_trees,
			start.elapsed(),
			options.execution,
		);
		Ok(Forest { trees, n_features })
	}

	/// Make a prediction for a given example. Every tree is queried in its own task and the mean of their predictions is returned. Threshold the prediction at 0.5 to get a class.
	pub fn predict(&self, example: ArrayView1<f32>) -> f32 {
		if self.trees.is_empty() {
			return 0.0;
		}
		let predictions: Vec<f32> = self
			.trees
			.par_iter()
			.map(|tree| tree.predict(example))
			.collect();
		let sum = predictions.iter().sum::<f32>();
		sum / predictions.len().to_f32().unwrap()
	}

	/// Make a prediction for each row of `data`.
	pub fn predict_many(&self, data: ArrayView2<f32>) -> Array1<f32> {
		data.axis_iter(Axis(0))
			.map(|example| self.predict(example))
			.collect()
	}

	/// Split count feature importances, normalized to sum to 1.
	pub fn feature_importances(&self) -> Vec<f32> {
		compute_feature_importances(&self.trees, self.n_features)
	}
}

fn validate_options(options: &ForestTrainOptions) -> Result<(), Error> {
	if options.n_trees == 0 {
		return Err(Error::InvalidOptions("n_trees must be at least 1"));
	}
	if !(options.subset_ratio > 0.0 && options.subset_ratio <= 1.0) {
		return Err(Error::InvalidOptions("subset_ratio must be in (0, 1]"));
	}
	if options.n_workers == 0 {
		return Err(Error::InvalidOptions("n_workers must be at least 1"));
	}
	Ok(())
}

fn train_tree(data: ArrayView2<f32>, options: &ForestTrainOptions, tree_index: usize) -> Tree {
	let seed = options.seed.wrapping_add(tree_index.to_u64().unwrap());
	let mut rng = Xoshiro256Plus::seed_from_u64(seed);
	let sample = bootstrap_sample(data, options.subset_ratio, &mut rng);
	Tree::train(sample.view(), &options.tree_options)
}

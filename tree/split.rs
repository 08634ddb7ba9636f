use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rayon::prelude::*;
use speedup_util::Execution;

/// The best split found for a node. Examples with `example[feature_index] <= split_value` go to the left child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Split {
	pub feature_index: usize,
	pub split_value: f32,
	/// The weighted Gini impurity of the two children, `|L|/|D| * gini(L) + |R|/|D| * gini(R)`.
	pub gini: f64,
}

/// The best threshold for a single feature.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FeatureSplit {
	split_value: f32,
	gini: f64,
}

/// The Gini impurity `1 - p^2 - (1 - p)^2` of a set of `n` examples of which `n_positive` have the label 1. An empty set has an impurity of 0.
pub fn gini(n_positive: usize, n: usize) -> f64 {
	if n == 0 {
		return 0.0;
	}
	let p = n_positive.to_f64().unwrap() / n.to_f64().unwrap();
	1.0 - p * p - (1.0 - p) * (1.0 - p)
}

fn weighted_gini(left_n_positive: usize, left_n: usize, n_positive: usize, n: usize) -> f64 {
	let right_n_positive = n_positive - left_n_positive;
	let right_n = n - left_n;
	let n_f64 = n.to_f64().unwrap();
	(left_n.to_f64().unwrap() / n_f64) * gini(left_n_positive, left_n)
		+ (right_n.to_f64().unwrap() / n_f64) * gini(right_n_positive, right_n)
}

fn is_positive(label: f32) -> bool {
	label >= 0.5
}

/**
Choose the split for the examples at `examples_index` that minimizes the weighted Gini impurity of the two children. The label is the last column of `data` and every other column is a candidate feature.

With `Execution::Concurrent`, the best threshold for each feature is computed in its own task. The per feature results are collected in feature order and reduced left to right, replacing the running best only when a feature is strictly better, exactly as the sequential scan does. The result is therefore the same for both executions and ties go to the lowest feature index.

Any candidate is accepted, even one that does not lower the impurity of the node, because a split with no gain at this node can still separate the labels further down, as with an XOR of two features. Returns `None` when there are fewer than two examples, when the node is already pure, or when every feature is constant over the examples. Thresholds that would send every example to the left are not candidates, so both children of a split are non-empty.
*/
pub fn choose_best_split(
	data: ArrayView2<f32>,
	examples_index: &[usize],
	execution: Execution,
) -> Option<Split> {
	if examples_index.len() < 2 || data.ncols() < 2 {
		return None;
	}
	let label_index = data.ncols() - 1;
	let n_examples = examples_index.len();
	let n_positive = examples_index
		.iter()
		.filter(|example_index| is_positive(data[[**example_index, label_index]]))
		.count();
	if n_positive == 0 || n_positive == n_examples {
		return None;
	}
	let feature_splits: Vec<Option<FeatureSplit>> = match execution {
		Execution::Sequential => (0..label_index)
			.map(|feature_index| {
				choose_best_split_for_feature(data, examples_index, feature_index, n_positive)
			})
			.collect(),
		Execution::Concurrent => (0..label_index)
			.into_par_iter()
			.map(|feature_index| {
				choose_best_split_for_feature(data, examples_index, feature_index, n_positive)
			})
			.collect(),
	};
	let mut best: Option<Split> = None;
	for (feature_index, feature_split) in feature_splits.into_iter().enumerate() {
		let feature_split = match feature_split {
			Some(feature_split) => feature_split,
			None => continue,
		};
		let is_better = match &best {
			Some(best) => feature_split.gini < best.gini,
			None => true,
		};
		if is_better {
			best = Some(Split {
				feature_index,
				split_value: feature_split.split_value,
				gini: feature_split.gini,
			});
		}
	}
	best
}

/**
Find the threshold for a single feature that minimizes the weighted Gini impurity. The candidate thresholds are the distinct values of the feature except the largest. The `(value, label)` pairs are sorted once and swept left to right, and at the last occurrence of each distinct value the examples seen so far are exactly the ones with `value <= threshold`. The running best is only replaced by a strictly lower impurity, so ties go to the lowest threshold. Returns `None` if the feature is constant.
*/
fn choose_best_split_for_feature(
	data: ArrayView2<f32>,
	examples_index: &[usize],
	feature_index: usize,
	n_positive: usize,
) -> Option<FeatureSplit> {
	let label_index = data.ncols() - 1;
	let mut values: Vec<(f32, bool)> = examples_index
		.iter()
		.map(|example_index| {
			(
				data[[*example_index, feature_index]],
				is_positive(data[[*example_index, label_index]]),
			)
		})
		.collect();
	values.sort_by(|a, b| a.0.total_cmp(&b.0));
	let n_examples = values.len();
	let mut best: Option<FeatureSplit> = None;
	let mut left_n_positive = 0;
	for (position, (value, positive)) in values.iter().enumerate() {
		if *positive {
			left_n_positive += 1;
		}
		// The largest value would leave the right child empty.
		let is_last_of_value = match values.get(position + 1) {
			Some((next_value, _)) => next_value != value,
			None => break,
		};
		if !is_last_of_value {
			continue;
		}
		let gini = weighted_gini(left_n_positive, position + 1, n_positive, n_examples);
		let is_better = match &best {
			Some(best) => gini < best.gini,
			None => true,
		};
		if is_better {
			best = Some(FeatureSplit {
				split_value: *value,
				gini,
			});
		}
	}
	best
}

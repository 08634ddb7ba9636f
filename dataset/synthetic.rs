/*!
Seeded generators for datasets with a known structure. They are used by the tests of the training crates and by the benchmarks.
*/

use ndarray::prelude::*;
use rand::Rng;

/**
Generate a binary classification dataset with `n_features` features drawn uniformly from `[-1, 1)` and a trailing label. The label is `1.0` when `x0 + x1 > 0` (or `x0 > 0` with a single feature), so the classes are linearly separable. Each label is then flipped with probability `label_noise`.
*/
pub fn binary_classification<R: Rng>(
	n_rows: usize,
	n_features: usize,
	label_noise: f32,
	rng: &mut R,
) -> Array2<f32> {
	assert!(n_features > 0);
	let mut data = Array2::zeros((n_rows, n_features + 1));
	for mut row in data.rows_mut() {
		for feature_index in 0..n_features {
			row[feature_index] = rng.gen_range(-1.0f32, 1.0f32);
		}
		let score = if n_features > 1 {
			row[0] + row[1]
		} else {
			row[0]
		};
		let mut label = if score > 0.0 { 1.0 } else { 0.0 };
		if rng.gen::<f32>() < label_noise {
			label = 1.0 - label;
		}
		row[n_features] = label;
	}
	data
}

/**
Generate a `(n_users, n_items)` ratings matrix from a hidden low rank model. Each user and item gets `n_factors` factors drawn uniformly from `[0, 1)`, and the rating is `1 + 4 * dot / n_factors`, which lies in `[1, 5]`. Each entry is observed with probability `density`; unobserved entries are `0.0`.
*/
pub fn ratings<R: Rng>(
	n_users: usize,
	n_items: usize,
	n_factors: usize,
	density: f32,
	rng: &mut R,
) -> Array2<f32> {
	assert!(n_factors > 0);
	let user_factors = Array2::from_shape_fn((n_users, n_factors), |_| rng.gen::<f32>());
	let item_factors = Array2::from_shape_fn((n_items, n_factors), |_| rng.gen::<f32>());
	let mut ratings = Array2::zeros((n_users, n_items));
	for ((user_index, item_index), rating) in ratings.indexed_iter_mut() {
		if rng.gen::<f32>() >= density {
			continue;
		}
		let dot = user_factors.row(user_index).dot(&item_factors.row(item_index));
		*rating = 1.0 + 4.0 * dot / n_factors as f32;
	}
	ratings
}

#[cfg(test)]
mod test {
	use super::*;
	use rand::SeedableRng;
	use rand_xoshiro::Xoshiro256Plus;

	#[test]
	fn test_binary_classification() {
		let mut rng = Xoshiro256Plus::seed_from_u64(1);
		let data = binary_classification(200, 3, 0.0, &mut rng);
		assert_eq!(data.dim(), (200, 4));
		for row in data.rows() {
			let expected = if row[0] + row[1] > 0.0 { 1.0 } else { 0.0 };
			assert_eq!(row[3], expected);
		}
	}

	#[test]
	fn test_ratings() {
		let mut rng = Xoshiro256Plus::seed_from_u64(2);
		let ratings = ratings(20, 30, 3, 0.5, &mut rng);
		assert_eq!(ratings.dim(), (20, 30));
		let n_rated = ratings.iter().filter(|rating| **rating > 0.0).count();
		assert!(n_rated > 0 && n_rated < 600);
		assert!(ratings
			.iter()
			.all(|rating| *rating == 0.0 || (1.0..=5.0).contains(rating)));
	}
}

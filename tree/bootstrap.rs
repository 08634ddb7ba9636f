use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::Rng;

/// The number of rows in a bootstrap sample of `n_rows` rows, `round(n_rows * subset_ratio)`.
pub fn bootstrap_sample_size(n_rows: usize, subset_ratio: f32) -> usize {
	(n_rows.to_f64().unwrap() * subset_ratio.to_f64().unwrap())
		.round()
		.to_usize()
		.unwrap_or(0)
}

/**
Draw `round(n_rows * subset_ratio)` rows from `data` uniformly at random with replacement. The rows are copied into a new array, so the sample owns its data and `data` is left untouched.
*/
pub fn bootstrap_sample<R: Rng>(data: ArrayView2<f32>, subset_ratio: f32, rng: &mut R) -> Array2<f32> {
	let n_rows = data.nrows();
	if n_rows == 0 {
		return Array2::zeros((0, data.ncols()));
	}
	let sample_size = bootstrap_sample_size(n_rows, subset_ratio);
	let rows_index: Vec<usize> = (0..sample_size)
		.map(|_| rng.gen_range(0, n_rows))
		.collect();
	data.select(Axis(0), &rows_index)
}

#[cfg(test)]
mod test {
	use super::*;
	use rand::SeedableRng;
	use rand_xoshiro::Xoshiro256Plus;

	#[test]
	fn test_sample_size() {
		assert_eq!(bootstrap_sample_size(10, 0.8), 8);
		assert_eq!(bootstrap_sample_size(10, 1.0), 10);
		assert_eq!(bootstrap_sample_size(7, 0.5), 4);
		assert_eq!(bootstrap_sample_size(3, 0.1), 0);
		assert_eq!(bootstrap_sample_size(0, 0.8), 0);
	}

	#[test]
	fn test_sample_rows_come_from_the_dataset() {
		let data = Array2::from_shape_fn((50, 3), |(row, column)| (row * 3 + column) as f32);
		let mut rng = Xoshiro256Plus::seed_from_u64(42);
		for subset_ratio in &[0.1, 0.25, 0.8, 1.0] {
			let sample = bootstrap_sample(data.view(), *subset_ratio, &mut rng);
			assert_eq!(sample.nrows(), bootstrap_sample_size(50, *subset_ratio));
			assert_eq!(sample.ncols(), 3);
			for row in sample.axis_iter(Axis(0)) {
				assert!(data.axis_iter(Axis(0)).any(|data_row| data_row == row));
			}
		}
		// The source is left untouched.
		assert_eq!(data[[49, 2]], 149.0);
	}

	#[test]
	fn test_sample_is_reproducible() {
		let data = Array2::from_shape_fn((20, 2), |(row, _)| row as f32);
		let a = bootstrap_sample(data.view(), 0.8, &mut Xoshiro256Plus::seed_from_u64(3));
		let b = bootstrap_sample(data.view(), 0.8, &mut Xoshiro256Plus::seed_from_u64(3));
		assert_eq!(a, b);
	}

	#[test]
	fn test_empty_dataset() {
		let data = Array2::<f32>::zeros((0, 4));
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let sample = bootstrap_sample(data.view(), 0.8, &mut rng);
		assert_eq!(sample.dim(), (0, 4));
	}
}

use super::Error;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::{seq::SliceRandom, Rng};

/// Shuffle the rows of `data` with `rng` and split them into a train set holding `train_fraction` of the rows (rounded down) and a test set holding the rest.
pub fn train_test_split<R: Rng>(
	data: ArrayView2<f32>,
	train_fraction: f32,
	rng: &mut R,
) -> Result<(Array2<f32>, Array2<f32>), Error> {
	if !(0.0..=1.0).contains(&train_fraction) {
		return Err(Error::InvalidTrainFraction(train_fraction));
	}
	let mut row_indexes: Vec<usize> = (0..data.nrows()).collect();
	row_indexes.shuffle(rng);
	let split_index = (data.nrows().to_f32().unwrap() * train_fraction)
		.to_usize()
		.unwrap()
		.min(data.nrows());
	let (train_indexes, test_indexes) = row_indexes.split_at(split_index);
	Ok((
		data.select(Axis(0), train_indexes),
		data.select(Axis(0), test_indexes),
	))
}

#[cfg(test)]
mod test {
	use super::*;
	use rand::SeedableRng;
	use rand_xoshiro::Xoshiro256Plus;

	#[test]
	fn test_train_test_split() {
		let data = Array2::from_shape_fn((10, 2), |(row, column)| (row * 2 + column) as f32);
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let (train, test) = train_test_split(data.view(), 0.8, &mut rng).unwrap();
		assert_eq!(train.nrows(), 8);
		assert_eq!(test.nrows(), 2);
		let mut firsts: Vec<f32> = train.column(0).iter().chain(test.column(0).iter()).copied().collect();
		firsts.sort_by(|a, b| a.partial_cmp(b).unwrap());
		assert_eq!(firsts, (0..10).map(|row| (row * 2) as f32).collect::<Vec<_>>());
	}

	#[test]
	fn test_invalid_train_fraction() {
		let data = Array2::<f32>::zeros((4, 2));
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		assert!(train_test_split(data.view(), 1.5, &mut rng).is_err());
	}
}

use super::{mean::Mean, StreamingMetric};

/// The mean squared error is the mean of the squared differences between the predicted value and the label. The input is `(prediction, label)`.
#[derive(Debug, Default)]
pub struct MeanSquaredError(Mean);

impl StreamingMetric<'_> for MeanSquaredError {
	type Input = (f32, f32);
	type Output = Option<f32>;

	fn update(&mut self, value: Self::Input) {
		self.0.update((value.1 - value.0).powi(2))
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Self::Output {
		self.0.finalize()
	}
}

/// The square root of the [MeanSquaredError](struct.MeanSquaredError.html). This is the metric reported for matrix factorization.
#[derive(Debug, Default)]
pub struct RootMeanSquaredError(MeanSquaredError);

impl StreamingMetric<'_> for RootMeanSquaredError {
	type Input = (f32, f32);
	type Output = Option<f32>;

	fn update(&mut self, value: Self::Input) {
		self.0.update(value)
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Self::Output {
		self.0.finalize().map(f32::sqrt)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_root_mean_squared_error() {
		let mut metric = RootMeanSquaredError::default();
		metric.update((1.0, 4.0));
		let mut other = RootMeanSquaredError::default();
		other.update((2.0, 5.0));
		metric.merge(other);
		assert_eq!(metric.finalize(), Some(3.0));
	}
}

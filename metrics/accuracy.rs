use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of examples where the thresholded score matches the label. Scores at or above `0.5` count as the positive class.
#[derive(Debug, Default)]
pub struct Accuracy(Mean);

/// The input to [Accuracy](struct.Accuracy.html). `score` is a model output in `[0, 1]`, `label` is `0.0` or `1.0`.
pub struct AccuracyInput {
	pub score: f32,
	pub label: f32,
}

impl Accuracy {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Accuracy {
	type Input = AccuracyInput;
	type Output = Option<f32>;

	fn update(&mut self, input: AccuracyInput) {
		let predicted_positive = input.score >= 0.5;
		let positive = input.label >= 0.5;
		self.0
			.update(if predicted_positive == positive { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f32> {
		self.0.finalize()
	}
}

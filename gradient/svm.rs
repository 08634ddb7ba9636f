use crate::{
	chunked::{train_chunked, ChunkedModel, ChunkedTrainOptions, SharedParameters},
	check_len, Error,
};
use ndarray::prelude::*;
use speedup_metrics::{HingeLoss, HingeLossInput, StreamingMetric};
use speedup_util::Execution;

/// These are the options passed to `Svm::new`.
#[derive(Clone, Debug)]
pub struct SvmOptions {
	/// The number of features, not counting the label.
	pub n_features: usize,
	pub learning_rate: f32,
	/// The L2 regularization strength.
	pub lambda: f32,
	pub epochs: usize,
	pub n_chunks: usize,
	pub execution: Execution,
	/// If true, the mean hinge loss on the training data is recorded after every epoch.
	pub compute_loss: bool,
}

impl Default for SvmOptions {
	fn default() -> Self {
		Self {
			n_features: 0,
			learning_rate: 0.001,
			lambda: 0.01,
			epochs: 100,
			n_chunks: 4,
			execution: Execution::Concurrent,
			compute_loss: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SvmParameters {
	pub weights: Array1<f32>,
	pub bias: f32,
}

impl SvmParameters {
	fn zeros(n_features: usize) -> Self {
		Self {
			weights: Array1::zeros(n_features),
			bias: 0.0,
		}
	}

	fn decision_value(&self, features: ArrayView1<f32>) -> f32 {
		features.dot(&self.weights) + self.bias
	}
}

/**
A linear support vector machine for binary classification, trained by subgradient descent on the L2 regularized hinge loss. The labels `0.0` and `1.0` are mapped to `-1` and `+1`.
*/
#[derive(Clone, Debug)]
pub struct Svm {
	pub options: SvmOptions,
	pub parameters: SvmParameters,
	/// The mean hinge loss after each epoch, if `compute_loss` was set.
	pub losses: Vec<f32>,
}

struct SvmTrainer {
	learning_rate: f32,
	lambda: f32,
	n_features: usize,
}

fn signed_label(label: f32) -> f32 {
	if label >= 0.5 {
		1.0
	} else {
		-1.0
	}
}

impl ChunkedModel for SvmTrainer {
	type Parameters = SvmParameters;
	type Delta = SvmParameters;

	fn accumulate_chunk(
		&self,
		snapshot: &SvmParameters,
		live: &SharedParameters<SvmParameters>,
		chunk: ArrayView2<f32>,
		_chunk_start: usize,
	) -> Result<SvmParameters, Error> {
		let mut delta = SvmParameters::zeros(self.n_features);
		for example in chunk.axis_iter(Axis(0)) {
			let features = example.slice(s![..self.n_features]);
			let y = signed_label(example[self.n_features]);
			if y * snapshot.decision_value(features) < 1.0 {
				delta.weights.scaled_add(self.learning_rate * y, &features);
				delta.bias += self.learning_rate * y;
			}
			// The shrinkage uses the weights as they are now, including merges from other chunks.
			live.with(|live| {
				delta
					.weights
					.scaled_add(-self.learning_rate * self.lambda, &live.weights)
			})?;
		}
		Ok(delta)
	}

	fn merge(parameters: &mut SvmParameters, delta: SvmParameters) {
		parameters.weights += &delta.weights;
		parameters.bias += delta.bias;
	}

	fn train_example(&self, parameters: &mut SvmParameters, example: ArrayView1<f32>, _row_index: usize) {
		let features = example.slice(s![..self.n_features]);
		let y = signed_label(example[self.n_features]);
		if y * parameters.decision_value(features) < 1.0 {
			parameters.weights.scaled_add(self.learning_rate * y, &features);
			parameters.bias += self.learning_rate * y;
		}
		let shrinkage = 1.0 - self.learning_rate * self.lambda;
		parameters.weights *= shrinkage;
	}
}

impl Svm {
	/// Create an untrained SVM whose weights and bias are zero.
	pub fn new(options: SvmOptions) -> Svm {
		let parameters = SvmParameters::zeros(options.n_features);
		Svm {
			options,
			parameters,
			losses: Vec::new(),
		}
	}

	/// Train on `data`, whose last column is the label. Training continues from the current parameters.
	pub fn train(&mut self, data: ArrayView2<f32>) -> Result<(), Error> {
		check_len(1, self.options.n_features + 1, data.ncols())?;
		let trainer = SvmTrainer {
			learning_rate: self.options.learning_rate,
			lambda: self.options.lambda,
			n_features: self.options.n_features,
		};
		let train_options = ChunkedTrainOptions {
			epochs: self.options.epochs,
			n_chunks: self.options.n_chunks,
			execution: self.options.execution,
		};
		let compute_loss = self.options.compute_loss;
		let losses = &mut self.losses;
		let mut shared = SharedParameters::new(self.parameters.clone());
		train_chunked(&trainer, &mut shared, data, &train_options, &mut |parameters| {
			if compute_loss {
				if let Some(loss) = hinge_loss(parameters, data) {
					losses.push(loss);
				}
			}
		})?;
		self.parameters = shared.into_inner()?;
		Ok(())
	}

	/// The signed distance `<w, x> + b` of an example from the separating hyperplane, up to scale. A trailing label column is ignored.
	pub fn decision_value(&self, example: ArrayView1<f32>) -> f32 {
		let features = example.slice(s![..self.options.n_features]);
		self.parameters.decision_value(features)
	}

	/// Returns `1.0` if the decision value is non-negative and `0.0` otherwise.
	pub fn predict(&self, example: ArrayView1<f32>) -> f32 {
		if self.decision_value(example) >= 0.0 {
			1.0
		} else {
			0.0
		}
	}
}

fn hinge_loss(parameters: &SvmParameters, data: ArrayView2<f32>) -> Option<f32> {
	let n_features = parameters.weights.len();
	let mut metric = HingeLoss::default();
	for example in data.axis_iter(Axis(0)) {
		metric.update(HingeLossInput {
			decision_value: parameters.decision_value(example.slice(s![..n_features])),
			label: example[n_features],
		});
	}
	metric.finalize()
}

#[cfg(test)]
mod test {
	use super::*;
	use rand::SeedableRng;
	use rand_xoshiro::Xoshiro256Plus;

	fn accuracy(svm: &Svm, data: ArrayView2<f32>) -> f32 {
		let label_index = data.ncols() - 1;
		let n_correct = data
			.axis_iter(Axis(0))
			.filter(|example| svm.predict(*example) == example[label_index])
			.count();
		n_correct as f32 / data.nrows() as f32
	}

	fn options(execution: Execution) -> SvmOptions {
		SvmOptions {
			n_features: 2,
			learning_rate: 0.001,
			lambda: 0.01,
			epochs: 50,
			execution,
			compute_loss: true,
			..Default::default()
		}
	}

	#[test]
	fn test_sequential_and_concurrent_separate_the_classes() {
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let data = speedup_dataset::synthetic::binary_classification(400, 2, 0.0, &mut rng);
		for execution in &[Execution::Sequential, Execution::Concurrent] {
			let mut svm = Svm::new(options(*execution));
			svm.train(data.view()).unwrap();
			assert!(accuracy(&svm, data.view()) > 0.9);
			// The label is 1 when x0 + x1 > 0, so both weights must be positive.
			assert!(svm.parameters.weights[0] > 0.0);
			assert!(svm.parameters.weights[1] > 0.0);
			assert_eq!(svm.losses.len(), 50);
			assert!(svm.losses.last().unwrap() < svm.losses.first().unwrap());
		}
	}

	#[test]
	fn test_shrinkage_reads_the_live_weights() {
		let trainer = SvmTrainer {
			learning_rate: 0.1,
			lambda: 0.5,
			n_features: 2,
		};
		let snapshot = SvmParameters {
			weights: arr1(&[1.0, 0.0]),
			bias: 0.0,
		};
		// Another chunk has merged since the snapshot was taken.
		let live = SharedParameters::new(SvmParameters {
			weights: arr1(&[2.0, -4.0]),
			bias: 0.5,
		});
		// The margin against the snapshot is 5, so the hinge term is zero and only the shrinkage remains.
		let chunk = arr2(&[[5.0, 0.0, 1.0]]);
		let delta = trainer
			.accumulate_chunk(&snapshot, &live, chunk.view(), 0)
			.unwrap();
		assert_eq!(delta.weights, arr1(&[-0.1f32 * 0.5 * 2.0, -0.1f32 * 0.5 * -4.0]));
		assert_eq!(delta.bias, 0.0);
	}

	#[test]
	fn test_untrained_svm_predicts_positive() {
		let svm = Svm::new(options(Execution::Concurrent));
		assert_eq!(svm.decision_value(arr1(&[0.3, -0.7]).view()), 0.0);
		assert_eq!(svm.predict(arr1(&[0.3, -0.7]).view()), 1.0);
	}

	#[test]
	fn test_predict_is_idempotent() {
		let mut rng = Xoshiro256Plus::seed_from_u64(1);
		let data = speedup_dataset::synthetic::binary_classification(100, 2, 0.1, &mut rng);
		let mut svm = Svm::new(options(Execution::Concurrent));
		svm.train(data.view()).unwrap();
		let example = data.row(3);
		let first = svm.decision_value(example);
		for _ in 0..10 {
			assert_eq!(svm.decision_value(example), first);
		}
	}

	#[test]
	fn test_shape_mismatch() {
		let data = Array2::<f32>::zeros((10, 5));
		let mut svm = Svm::new(options(Execution::Concurrent));
		assert_eq!(
			svm.train(data.view()),
			Err(Error::ShapeMismatch {
				axis: 1,
				expected: 3,
				actual: 5,
			})
		);
	}
}

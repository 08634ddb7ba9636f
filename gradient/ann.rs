use crate::{
	chunked::{train_chunked, ChunkedModel, ChunkedTrainOptions, SharedParameters},
	check_len, sigmoid, Error,
};
use itertools::izip;
use ndarray::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use speedup_metrics::{BinaryCrossEntropy, BinaryCrossEntropyInput, StreamingMetric};
use speedup_util::Execution;

/// These are the options passed to `Ann::new`.
#[derive(Clone, Debug)]
pub struct AnnOptions {
	/// The number of input features, not counting the label.
	pub input_size: usize,
	/// The number of units in the hidden layer.
	pub hidden_size: usize,
	pub learning_rate: f32,
	pub epochs: usize,
	/// The seed for the generator that draws the initial weights.
	pub seed: u64,
	pub n_chunks: usize,
	pub execution: Execution,
	/// If true, the binary cross entropy on the training data is recorded after every epoch.
	pub compute_loss: bool,
}

impl Default for AnnOptions {
	fn default() -> Self {
		Self {
			input_size: 0,
			hidden_size: 8,
			learning_rate: 0.1,
			epochs: 100,
			seed: 42,
			n_chunks: 4,
			execution: Execution::Concurrent,
			compute_loss: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnParameters {
	/// The hidden layer weights with shape `(hidden_size, input_size + 1)`. Column 0 holds the biases.
	pub hidden_weights: Array2<f32>,
	/// The output unit weights, one per hidden unit.
	pub output_weights: Array1<f32>,
	pub output_bias: f32,
}

impl AnnParameters {
	fn zeros(input_size: usize, hidden_size: usize) -> Self {
		Self {
			hidden_weights: Array2::zeros((hidden_size, input_size + 1)),
			output_weights: Array1::zeros(hidden_size),
			output_bias: 0.0,
		}
	}

	/// Return the hidden layer activations and the output probability.
	fn forward(&self, features: ArrayView1<f32>) -> (Array1<f32>, f32) {
		let biases = self.hidden_weights.column(0);
		let weights = self.hidden_weights.slice(s![.., 1..]);
		let hidden = (weights.dot(&features) + biases).mapv_into(sigmoid);
		let output = sigmoid(hidden.dot(&self.output_weights) + self.output_bias);
		(hidden, output)
	}

	/// Add the backpropagation update for one example, scaled by `learning_rate`, to `delta`. The gradients are computed with `self`.
	fn add_update(
		&self,
		delta: &mut AnnParameters,
		features: ArrayView1<f32>,
		label: f32,
		learning_rate: f32,
	) {
		let (hidden, output) = self.forward(features);
		let output_delta = (label - output) * output * (1.0 - output);
		for (mut hidden_row, hidden_value, output_weight) in izip!(
			delta.hidden_weights.axis_iter_mut(Axis(0)),
			hidden.iter(),
			self.output_weights.iter(),
		) {
			let hidden_delta =
				learning_rate * output_delta * output_weight * hidden_value * (1.0 - hidden_value);
			hidden_row[0] += hidden_delta;
			hidden_row
				.slice_mut(s![1..])
				.scaled_add(hidden_delta, &features);
		}
		delta
			.output_weights
			.scaled_add(learning_rate * output_delta, &hidden);
		delta.output_bias += learning_rate * output_delta;
	}
}

/**
A neural network with one sigmoid hidden layer and a single sigmoid output unit for binary classification. It is trained by backpropagation of the squared error.
*/
#[derive(Clone, Debug)]
pub struct Ann {
	pub options: AnnOptions,
	pub parameters: AnnParameters,
	/// The binary cross entropy after each epoch, if `compute_loss` was set.
	pub losses: Vec<f32>,
}

struct AnnTrainer {
	input_size: usize,
	hidden_size: usize,
	learning_rate: f32,
}

impl ChunkedModel for AnnTrainer {
	type Parameters = AnnParameters;
	type Delta = AnnParameters;

	fn accumulate_chunk(
		&self,
		snapshot: &AnnParameters,
		_live: &SharedParameters<AnnParameters>,
		chunk: ArrayView2<f32>,
		_chunk_start: usize,
	) -> Result<AnnParameters, Error> {
		let mut delta = AnnParameters::zeros(self.input_size, self.hidden_size);
		for example in chunk.axis_iter(Axis(0)) {
			let features = example.slice(s![..self.input_size]);
			let label = example[self.input_size];
			snapshot.add_update(&mut delta, features, label, self.learning_rate);
		}
		Ok(delta)
	}

	fn merge(parameters: &mut AnnParameters, delta: AnnParameters) {
		parameters.hidden_weights += &delta.hidden_weights;
		parameters.output_weights += &delta.output_weights;
		parameters.output_bias += delta.output_bias;
	}

	fn train_example(&self, parameters: &mut AnnParameters, example: ArrayView1<f32>, _row_index: usize) {
		let features = example.slice(s![..self.input_size]);
		let label = example[self.input_size];
		let mut delta = AnnParameters::zeros(self.input_size, self.hidden_size);
		parameters.add_update(&mut delta, features, label, self.learning_rate);
		Self::merge(parameters, delta);
	}
}

impl Ann {
	/// Create an untrained network. Every weight and bias is drawn uniformly from `[-0.1, 0.1)` with a generator seeded by `options.seed`.
	pub fn new(options: AnnOptions) -> Ann {
		let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
		let hidden_weights =
			Array2::from_shape_fn((options.hidden_size, options.input_size + 1), |_| {
				rng.gen_range(-0.1f32, 0.1f32)
			});
		let output_weights =
			Array1::from_shape_fn(options.hidden_size, |_| rng.gen_range(-0.1f32, 0.1f32));
		let output_bias = rng.gen_range(-0.1f32, 0.1f32);
		Ann {
			options,
			parameters: AnnParameters {
				hidden_weights,
				output_weights,
				output_bias,
			},
			losses: Vec::new(),
		}
	}

	/// Train on `data`, whose last column is the label. Training continues from the current parameters.
	pub fn train(&mut self, data: ArrayView2<f32>) -> Result<(), Error> {
		check_len(1, self.options.input_size + 1, data.ncols())?;
		let trainer = AnnTrainer {
			input_size: self.options.input_size,
			hidden_size: self.options.hidden_size,
			learning_rate: self.options.learning_rate,
		};
		let train_options = ChunkedTrainOptions {
			epochs: self.options.epochs,
			n_chunks: self.options.n_chunks,
			execution: self.options.execution,
		};
		let compute_loss = self.options.compute_loss;
		let input_size = self.options.input_size;
		let losses = &mut self.losses;
		let mut shared = SharedParameters::new(self.parameters.clone());
		train_chunked(&trainer, &mut shared, data, &train_options, &mut |parameters| {
			if compute_loss {
				if let Some(loss) = binary_cross_entropy(parameters, data, input_size) {
					losses.push(loss);
				}
			}
		})?;
		self.parameters = shared.into_inner()?;
		Ok(())
	}

	/// The probability that the example belongs to the positive class. A trailing label column is ignored.
	pub fn predict_probability(&self, example: ArrayView1<f32>) -> f32 {
		let features = example.slice(s![..self.options.input_size]);
		self.parameters.forward(features).1
	}

	/// Returns `1.0` if the probability is at least 0.5 and `0.0` otherwise.
	pub fn predict(&self, example: ArrayView1<f32>) -> f32 {
		if self.predict_probability(example) >= 0.5 {
			1.0
		} else {
			0.0
		}
	}
}

fn binary_cross_entropy(
	parameters: &AnnParameters,
	data: ArrayView2<f32>,
	input_size: usize,
) -> Option<f32> {
	let mut metric = BinaryCrossEntropy::default();
	for example in data.axis_iter(Axis(0)) {
		let (_, probability) = parameters.forward(example.slice(s![..input_size]));
		metric.update(BinaryCrossEntropyInput {
			probability,
			label: example[input_size],
		});
	}
	metric.finalize()
}

#[cfg(test)]
mod test {
	use super::*;

	fn accuracy(ann: &Ann, data: ArrayView2<f32>) -> f32 {
		let label_index = data.ncols() - 1;
		let n_correct = data
			.axis_iter(Axis(0))
			.filter(|example| ann.predict(*example) == example[label_index])
			.count();
		n_correct as f32 / data.nrows() as f32
	}

	fn options(execution: Execution) -> AnnOptions {
		AnnOptions {
			input_size: 2,
			hidden_size: 4,
			learning_rate: 0.05,
			epochs: 200,
			execution,
			compute_loss: true,
			..Default::default()
		}
	}

	#[test]
	fn test_initial_weights() {
		let ann = Ann::new(options(Execution::Concurrent));
		assert_eq!(ann.parameters.hidden_weights.dim(), (4, 3));
		assert_eq!(ann.parameters.output_weights.len(), 4);
		for weight in ann.parameters.hidden_weights.iter() {
			assert!((-0.1..0.1).contains(weight));
		}
		// The same seed gives the same network.
		assert_eq!(
			Ann::new(options(Execution::Concurrent)).parameters,
			ann.parameters
		);
	}

	#[test]
	fn test_sequential_and_concurrent_learn_the_classes() {
		let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0);
		let data = speedup_dataset::synthetic::binary_classification(400, 2, 0.0, &mut rng);
		for execution in &[Execution::Sequential, Execution::Concurrent] {
			let mut ann = Ann::new(options(*execution));
			ann.train(data.view()).unwrap();
			assert!(accuracy(&ann, data.view()) > 0.8);
			assert_eq!(ann.losses.len(), 200);
			assert!(ann.losses.last().unwrap() < ann.losses.first().unwrap());
		}
	}

	#[test]
	fn test_predict_is_idempotent() {
		let ann = Ann::new(options(Execution::Concurrent));
		let example = arr1(&[0.5, -0.25]);
		let first = ann.predict_probability(example.view());
		assert!(first > 0.0 && first < 1.0);
		for _ in 0..10 {
			assert_eq!(ann.predict_probability(example.view()), first);
		}
	}

	#[test]
	fn test_shape_mismatch() {
		let data = Array2::<f32>::zeros((10, 2));
		let mut ann = Ann::new(options(Execution::Sequential));
		assert_eq!(
			ann.train(data.view()),
			Err(Error::ShapeMismatch {
				axis: 1,
				expected: 3,
				actual: 2,
			})
		);
	}
}

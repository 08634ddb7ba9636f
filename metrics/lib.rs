/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and the metrics used to compare sequential and concurrent training runs: [`Accuracy`](struct.Accuracy.html) for the classifiers, [`BinaryCrossEntropy`](struct.BinaryCrossEntropy.html) and [`HingeLoss`](struct.HingeLoss.html) for per-epoch training losses, and [`MeanSquaredError`](struct.MeanSquaredError.html) / [`RootMeanSquaredError`](struct.RootMeanSquaredError.html) for matrix factorization.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod binary_cross_entropy;
mod hinge_loss;
mod mean;
mod mean_squared_error;

pub use self::accuracy::{Accuracy, AccuracyInput};
pub use self::binary_cross_entropy::{BinaryCrossEntropy, BinaryCrossEntropyInput};
pub use self::hinge_loss::{HingeLoss, HingeLossInput};
pub use self::mean::Mean;
pub use self::mean_squared_error::{MeanSquaredError, RootMeanSquaredError};

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input arrives one example at a time, such as accuracy and mean squared error.

After being initialized, a metric can have `update()` called on it with values of the associated type `Input`. Metrics computed independently, for example one per thread, can be combined with `merge()`. When finished aggregating, call `finalize()` to produce the associated type `Output`.

# Examples

```
use speedup_metrics::StreamingMetric;

struct Max(f32);

impl StreamingMetric<'_> for Max {
	type Input = f32;
	type Output = f32;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.max(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.max(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}
```

The generic lifetime `'a` allows `Input`s to borrow from their enclosing scope.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}

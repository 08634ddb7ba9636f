use super::{mean::Mean, StreamingMetric};

/// The hinge loss `max(0, 1 - y * f(x))` is the loss minimized by the linear SVM. The label is given as `0.0` or `1.0` and is mapped to `-1` / `+1`.
#[derive(Debug, Default)]
pub struct HingeLoss(Mean);

pub struct HingeLossInput {
	pub decision_value: f32,
	pub label: f32,
}

impl StreamingMetric<'_> for HingeLoss {
	type Input = HingeLossInput;
	type Output = Option<f32>;

	fn update(&mut self, input: HingeLossInput) {
		let y = if input.label >= 0.5 { 1.0 } else { -1.0 };
		self.0.update((1.0 - y * input.decision_value).max(0.0))
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f32> {
		self.0.finalize()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_hinge_loss() {
		let mut metric = HingeLoss::default();
		let inputs = [(2.0, 1.0), (0.5, 1.0), (0.5, 0.0), (-3.0, 0.0)];
		for (decision_value, label) in inputs.iter() {
			metric.update(HingeLossInput {
				decision_value: *decision_value,
				label: *label,
			});
		}
		insta::assert_debug_snapshot!(metric.finalize(), @r###"
  Some(
      0.5,
  )
  "###);
	}
}

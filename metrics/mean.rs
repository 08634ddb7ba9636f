use super::StreamingMetric;
use num_traits::ToPrimitive;

/// The arithmetic mean of the inputs. The running mean is kept in `f64` so that long streams of `f32` values do not lose precision.
#[derive(Clone, Debug, Default)]
pub struct Mean {
	n: u64,
	mean: f64,
}

impl Mean {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Mean {
	type Input = f32;
	type Output = Option<f32>;

	fn update(&mut self, value: f32) {
		self.n += 1;
		let n = self.n.to_f64().unwrap();
		self.mean += (value.to_f64().unwrap() - self.mean) / n;
	}

	fn merge(&mut self, other: Self) {
		let n = self.n + other.n;
		if n == 0 {
			return;
		}
		let n_self = self.n.to_f64().unwrap();
		let n_other = other.n.to_f64().unwrap();
		self.mean = (n_self * self.mean + n_other * other.mean) / (n_self + n_other);
		self.n = n;
	}

	fn finalize(self) -> Option<f32> {
		if self.n == 0 {
			None
		} else {
			self.mean.to_f32()
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_mean() {
		let mut a = Mean::new();
		a.update(1.0);
		a.update(2.0);
		let mut b = Mean::new();
		b.update(6.0);
		a.merge(b);
		a.merge(Mean::new());
		assert_eq!(a.finalize(), Some(3.0));
	}

	#[test]
	fn test_empty_mean() {
		assert_eq!(Mean::new().finalize(), None);
	}
}

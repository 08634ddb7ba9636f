use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc,
};

/// A `ProgressCounter` counts units of finished work, such as trained trees or epochs. Clones share the same count, so a clone can be handed to each worker thread.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
	current: Arc<AtomicU64>,
	total: u64,
}

impl ProgressCounter {
	pub fn new(total: u64) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			total,
		}
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn get(&self) -> u64 {
		self.current.load(Ordering::Relaxed)
	}

	pub fn inc(&self, amount: u64) {
		self.current.fetch_add(amount, Ordering::Relaxed);
	}

	/// The fraction of the work that has been completed, in `[0, 1]`. A counter with a total of zero is always complete.
	pub fn fraction(&self) -> f32 {
		if self.total == 0 {
			return 1.0;
		}
		(self.get().min(self.total) as f64 / self.total as f64) as f32
	}
}

/*!
This crate contains the pieces shared by the training crates: the [`Execution`](enum.Execution.html) switch that selects between the sequential baseline and the concurrent implementation of a trainer, a [`ProgressCounter`](progress_counter/struct.ProgressCounter.html) that workers can bump from any thread, and the job queue worker pool used to train ensembles.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod progress_counter;
pub mod worker_pool;

/// Every trainer in this workspace has a sequential and a concurrent implementation. The sequential one is the numerical baseline that the concurrent one is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
	/// Run all the work on the calling thread.
	Sequential,
	/// Fan the work out across threads.
	Concurrent,
}

impl Default for Execution {
	fn default() -> Self {
		Execution::Concurrent
	}
}

impl Execution {
	pub fn is_concurrent(self) -> bool {
		self == Execution::Concurrent
	}
}

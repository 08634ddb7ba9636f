use crossbeam::channel::bounded;
use once_cell::sync::OnceCell;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WorkerPoolError {
	#[error("a worker panicked before the job queue was drained")]
	WorkerPanicked,
	#[error("the output slot for job {0} was written more than once")]
	SlotWrittenTwice(usize),
	#[error("the output slot for job {0} was never written")]
	EmptySlot(usize),
}

/**
Run the jobs `0..n_jobs` on `n_workers` scoped threads and return their outputs in job order.

The job indexes are loaded into a bounded channel sized to hold all of them, and the sending half is dropped before any worker starts, so the channel is closed and each worker simply receives until the queue is drained. The channel is the only synchronized resource: the output of job `i` is written to slot `i` of a pre-sized array of `OnceCell`s, and since every index is received by exactly one worker, no two workers ever write the same slot.

If a worker panics, if a slot is written twice, or if a slot is left empty, the whole call fails rather than returning a partial result.
*/
pub fn drain_job_queue<T, F>(n_jobs: usize, n_workers: usize, job: F) -> Result<Vec<T>, WorkerPoolError>
where
	T: Send + Sync,
	F: Fn(usize) -> T + Sync,
{
	let (job_sender, job_receiver) = bounded::<usize>(n_jobs.max(1));
	for job_index in 0..n_jobs {
		// The channel has room for every job and the receiver is alive, so this only fails if that stops being true, in which case the unsent slots are reported as empty below.
		if job_sender.send(job_index).is_err() {
			break;
		}
	}
	drop(job_sender);

	let slots: Vec<OnceCell<T>> = (0..n_jobs).map(|_| OnceCell::new()).collect();
	let collision: OnceCell<usize> = OnceCell::new();
	crossbeam::thread::scope(|scope| {
		for worker_index in 0..n_workers {
			let job_receiver = job_receiver.clone();
			let slots = &slots;
			let collision = &collision;
			let job = &job;
			scope.spawn(move |_| {
				let mut n_jobs_done = 0;
				for job_index in job_receiver.iter() {
					let output = job(job_index);
					if slots[job_index].set(output).is_err() {
						collision.set(job_index).ok();
					}
					n_jobs_done += 1;
				}
				log::debug!("worker {} drained the queue after {} jobs", worker_index, n_jobs_done);
			});
		}
	})
	.map_err(|_| WorkerPoolError::WorkerPanicked)?;

	if let Some(job_index) = collision.into_inner() {
		return Err(WorkerPoolError::SlotWrittenTwice(job_index));
	}
	slots
		.into_iter()
		.enumerate()
		.map(|(job_index, slot)| {
			slot.into_inner()
				.ok_or(WorkerPoolError::EmptySlot(job_index))
		})
		.collect()
}

#[cfg(test)]
mod test {
	use super::{drain_job_queue, WorkerPoolError};
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn test_every_job_runs_exactly_once() {
		for n_workers in &[1, 2, 8] {
			let n_jobs = 37;
			let writes: Vec<AtomicUsize> = (0..n_jobs).map(|_| AtomicUsize::new(0)).collect();
			let outputs = drain_job_queue(n_jobs, *n_workers, |job_index| {
				writes[job_index].fetch_add(1, Ordering::SeqCst);
				job_index * 2
			})
			.unwrap();
			assert_eq!(outputs, (0..n_jobs).map(|i| i * 2).collect::<Vec<_>>());
			for count in writes.iter() {
				assert_eq!(count.load(Ordering::SeqCst), 1);
			}
		}
	}

	#[test]
	fn test_more_workers_than_jobs() {
		let outputs = drain_job_queue(2, 16, |job_index| job_index).unwrap();
		assert_eq!(outputs, vec![0, 1]);
	}

	#[test]
	fn test_no_jobs() {
		let outputs: Vec<usize> = drain_job_queue(0, 4, |job_index| job_index).unwrap();
		assert!(outputs.is_empty());
	}

	#[test]
	fn test_panicking_worker_fails_the_call() {
		let result = drain_job_queue(8, 2, |job_index| {
			if job_index == 5 {
				panic!("job failed");
			}
			job_index
		});
		assert_eq!(result, Err(WorkerPoolError::WorkerPanicked));
	}

	#[test]
	fn test_no_workers_leaves_slots_empty() {
		let result = drain_job_queue(3, 0, |job_index| job_index);
		assert_eq!(result, Err(WorkerPoolError::EmptySlot(0)));
	}
}

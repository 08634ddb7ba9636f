/*!
This binary measures how much faster the concurrent trainers are than their sequential baselines. For every algorithm and dataset size it trains both versions on the same data and prints one JSON object with the training and evaluation durations of each, the speedup, and the metric each model reaches on held out data.
*/

use anyhow::{bail, Result};
use clap::{ArgEnum, Parser};
use ndarray::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use speedup_dataset::{FromCsvOptions, LabelEncoding};
use speedup_gradient::{
	Ann, AnnOptions, MatrixFactorization, MatrixFactorizationOptions, Svm, SvmOptions,
};
use speedup_metrics::{Accuracy, AccuracyInput, StreamingMetric};
use speedup_tree::{Forest, ForestTrainOptions, Tree, TreeTrainOptions};
use speedup_util::Execution;
use std::{
	path::PathBuf,
	time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[clap(about = "Compare the sequential and concurrent trainers on datasets of increasing size.")]
struct Options {
	#[clap(long, arg_enum, default_value = "all", help = "the algorithm to benchmark")]
	algorithm: Algorithm,
	#[clap(
		long = "rows",
		default_values = &["1000", "10000", "100000"],
		help = "the number of rows to generate or read, may be repeated"
	)]
	rows: Vec<usize>,
	#[clap(long, default_value = "4", help = "the number of features of generated datasets")]
	n_features: usize,
	#[clap(long, default_value = "10")]
	n_trees: usize,
	#[clap(long, default_value = "0.8")]
	subset_ratio: f32,
	#[clap(long, help = "the maximum depth of each tree")]
	max_depth: Option<usize>,
	#[clap(long, help = "override the number of epochs of the gradient trainers")]
	epochs: Option<usize>,
	#[clap(long, default_value = "0.8", help = "the fraction of rows used for training")]
	train_ratio: f32,
	#[clap(long, default_value = "42")]
	seed: u64,
	#[clap(long, help = "read the classification dataset from this csv file")]
	csv: Option<PathBuf>,
	#[clap(long, default_value = ",", help = "the delimiter of the csv file")]
	delimiter: char,
	#[clap(long, help = "the labels in the csv file are spelled SI and NO")]
	si_no_labels: bool,
	#[clap(long, help = "read the ratings for matrix factorization from this reviews csv file")]
	reviews: Option<PathBuf>,
}

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq)]
enum Algorithm {
	Tree,
	Forest,
	Svm,
	Ann,
	Mf,
	All,
}

impl Algorithm {
	fn name(self) -> &'static str {
		match self {
			Algorithm::Tree => "tree",
			Algorithm::Forest => "forest",
			Algorithm::Svm => "svm",
			Algorithm::Ann => "ann",
			Algorithm::Mf => "mf",
			Algorithm::All => "all",
		}
	}
}

#[derive(serde::Serialize, Debug)]
struct BenchmarkOutput {
	algorithm: &'static str,
	n_rows: usize,
	sequential_duration_ms: f64,
	concurrent_duration_ms: f64,
	speedup: f64,
	sequential_evaluation_duration_ms: f64,
	concurrent_evaluation_duration_ms: f64,
	metric: &'static str,
	sequential_metric: Option<f32>,
	concurrent_metric: Option<f32>,
}

/// The metric a single run reached, how long training took, and how long computing the metric took.
struct Run {
	duration: Duration,
	evaluation_duration: Duration,
	metric: Option<f32>,
}

fn main() -> Result<()> {
	let env = env_logger::Env::default().default_filter_or("info");
	env_logger::Builder::from_env(env)
		.format_module_path(false)
		.format_timestamp(None)
		.init();
	let options = Options::parse();
	let algorithms = match options.algorithm {
		Algorithm::All => vec![
			Algorithm::Tree,
			Algorithm::Forest,
			Algorithm::Svm,
			Algorithm::Ann,
			Algorithm::Mf,
		],
		algorithm => vec![algorithm],
	};
	for n_rows in options.rows.iter() {
		for algorithm in algorithms.iter() {
			log::info!("benchmarking {} on {} rows", algorithm.name(), n_rows);
			let output = run_benchmark(*algorithm, *n_rows, &options)?;
			println!("{}", serde_json::to_string(&output)?);
		}
	}
	Ok(())
}

fn run_benchmark(algorithm: Algorithm, n_rows: usize, options: &Options) -> Result<BenchmarkOutput> {
	let (metric, sequential, concurrent) = if algorithm == Algorithm::Mf {
		let ratings = load_ratings(n_rows, options)?;
		let sequential = run_matrix_factorization(ratings.view(), Execution::Sequential, options)?;
		let concurrent = run_matrix_factorization(ratings.view(), Execution::Concurrent, options)?;
		("rmse", sequential, concurrent)
	} else {
		let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
		let data = load_classification_dataset(n_rows, options, &mut rng)?;
		let (train, test) =
			speedup_dataset::train_test_split(data.view(), options.train_ratio, &mut rng)?;
		let sequential = run_classifier(
			algorithm,
			train.view(),
			test.view(),
			Execution::Sequential,
			options,
		)?;
		let concurrent = run_classifier(
			algorithm,
			train.view(),
			test.view(),
			Execution::Concurrent,
			options,
		)?;
		("accuracy", sequential, concurrent)
	};
	let sequential_duration_ms = sequential.duration.as_secs_f64() * 1000.0;
	let concurrent_duration_ms = concurrent.duration.as_secs_f64() * 1000.0;
	Ok(BenchmarkOutput {
		algorithm: algorithm.name(),
		n_rows,
		sequential_duration_ms,
		concurrent_duration_ms,
		speedup: sequential_duration_ms / concurrent_duration_ms,
		sequential_evaluation_duration_ms: sequential.evaluation_duration.as_secs_f64() * 1000.0,
		concurrent_evaluation_duration_ms: concurrent.evaluation_duration.as_secs_f64() * 1000.0,
		metric,
		sequential_metric: sequential.metric,
		concurrent_metric: concurrent.metric,
	})
}

fn load_classification_dataset(
	n_rows: usize,
	options: &Options,
	rng: &mut Xoshiro256Plus,
) -> Result<Array2<f32>> {
	match &options.csv {
		Some(path) => {
			let label_encoding = if options.si_no_labels {
				LabelEncoding::SiNo
			} else {
				LabelEncoding::Numeric
			};
			let csv_options = FromCsvOptions {
				delimiter: csv_delimiter(options.delimiter)?,
				label_encoding,
				limit: Some(n_rows),
				..Default::default()
			};
			Ok(speedup_dataset::from_csv_path(path, &csv_options)?)
		}
		None => Ok(speedup_dataset::synthetic::binary_classification(
			n_rows,
			options.n_features,
			0.05,
			rng,
		)),
	}
}

fn load_ratings(n_rows: usize, options: &Options) -> Result<Array2<f32>> {
	match &options.reviews {
		Some(path) => {
			let reviews = speedup_dataset::reviews_from_csv_path(path, Some(n_rows))?;
			Ok(speedup_dataset::ratings_matrix_from_reviews(&reviews).ratings)
		}
		None => {
			// Each generated user rates about 10 of 100 items, so `n_rows` ratings need `n_rows / 10` users.
			let n_users = (n_rows / 10).max(10);
			let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
			Ok(speedup_dataset::synthetic::ratings(
				n_users, 100, 5, 0.1, &mut rng,
			))
		}
	}
}

fn run_classifier(
	algorithm: Algorithm,
	train: ArrayView2<f32>,
	test: ArrayView2<f32>,
	execution: Execution,
	options: &Options,
) -> Result<Run> {
	let n_features = train.ncols().saturating_sub(1);
	let tree_options = TreeTrainOptions {
		max_depth: options
			.max_depth
			.unwrap_or_else(|| TreeTrainOptions::default().max_depth),
		execution,
	};
	let start = Instant::now();
	let (duration, predict): (Duration, Box<dyn Fn(ArrayView1<f32>) -> f32>) = match algorithm {
		Algorithm::Tree => {
			let tree = Tree::train(train, &tree_options);
			(start.elapsed(), Box::new(move |example: ArrayView1<f32>| tree.predict(example)))
		}
		Algorithm::Forest => {
			let forest_options = ForestTrainOptions {
				n_trees: options.n_trees,
				subset_ratio: options.subset_ratio,
				seed: options.seed,
				tree_options,
				execution,
				..Default::default()
			};
			let forest = Forest::train(train, &forest_options, &mut |_| {})?;
			(start.elapsed(), Box::new(move |example: ArrayView1<f32>| forest.predict(example)))
		}
		Algorithm::Svm => {
			let defaults = SvmOptions::default();
			let mut svm = Svm::new(SvmOptions {
				n_features,
				epochs: options.epochs.unwrap_or(defaults.epochs),
				execution,
				..defaults
			});
			svm.train(train)?;
			(start.elapsed(), Box::new(move |example: ArrayView1<f32>| svm.predict(example)))
		}
		Algorithm::Ann => {
			let defaults = AnnOptions::default();
			let mut ann = Ann::new(AnnOptions {
				input_size: n_features,
				epochs: options.epochs.unwrap_or(defaults.epochs),
				seed: options.seed,
				execution,
				..defaults
			});
			ann.train(train)?;
			(start.elapsed(), Box::new(move |example: ArrayView1<f32>| ann.predict(example)))
		}
		Algorithm::Mf | Algorithm::All => bail!("{} is not a classifier", algorithm.name()),
	};
	let start = Instant::now();
	let metric = accuracy(test, predict)?;
	Ok(Run {
		duration,
		evaluation_duration: start.elapsed(),
		metric,
	})
}

fn run_matrix_factorization(
	ratings: ArrayView2<f32>,
	execution: Execution,
	options: &Options,
) -> Result<Run> {
	let defaults = MatrixFactorizationOptions::default();
	let mut model = MatrixFactorization::new(MatrixFactorizationOptions {
		n_users: ratings.nrows(),
		n_items: ratings.ncols(),
		epochs: options.epochs.unwrap_or(defaults.epochs),
		seed: options.seed,
		execution,
		..defaults
	});
	let start = Instant::now();
	model.train(ratings)?;
	let duration = start.elapsed();
	let start = Instant::now();
	let metric = model.rmse(ratings);
	Ok(Run {
		duration,
		evaluation_duration: start.elapsed(),
		metric,
	})
}

/// The csv reader takes a single byte delimiter.
fn csv_delimiter(delimiter: char) -> Result<u8> {
	if !delimiter.is_ascii() {
		bail!("the delimiter must be an ascii character, got {:?}", delimiter);
	}
	Ok(delimiter as u8)
}

fn accuracy(data: ArrayView2<f32>, predict: impl Fn(ArrayView1<f32>) -> f32) -> Result<Option<f32>> {
	let (features, labels) = speedup_dataset::split_features_and_labels(data)?;
	let mut metric = Accuracy::new();
	for (example, label) in features.axis_iter(Axis(0)).zip(labels.iter()) {
		metric.update(AccuracyInput {
			score: predict(example),
			label: *label,
		});
	}
	Ok(metric.finalize())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_csv_delimiter() {
		assert_eq!(csv_delimiter(';').unwrap(), b';');
		assert_eq!(csv_delimiter('\t').unwrap(), b'\t');
		assert!(csv_delimiter('§').is_err());
	}

	#[test]
	fn test_benchmark_reports_training_and_evaluation() {
		let options = Options::parse_from(&["speedup_benchmarks", "--rows", "60", "--n-trees", "2"]);
		for algorithm in &[Algorithm::Tree, Algorithm::Forest, Algorithm::Mf] {
			let output = run_benchmark(*algorithm, 60, &options).unwrap();
			assert_eq!(output.algorithm, algorithm.name());
			assert!(output.sequential_evaluation_duration_ms >= 0.0);
			assert!(output.concurrent_evaluation_duration_ms >= 0.0);
			assert!(output.sequential_metric.is_some());
			assert!(output.concurrent_metric.is_some());
		}
	}

	#[test]
	fn test_non_classifier_is_an_error() {
		let data = Array2::<f32>::zeros((4, 3));
		let options = Options::parse_from(&["speedup_benchmarks"]);
		let result = run_classifier(
			Algorithm::Mf,
			data.view(),
			data.view(),
			Execution::Sequential,
			&options,
		);
		assert!(result.is_err());
	}
}

use super::Error;
use ndarray::prelude::*;
use std::path::Path;

/// How the values in the label column are spelled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LabelEncoding {
	/// The label is a number, `0` or `1`.
	Numeric,
	/// The label is `"SI"` for the positive class or `"NO"` for the negative class.
	SiNo,
}

impl LabelEncoding {
	fn parse(self, value: &str) -> Option<f32> {
		let value = value.trim();
		match self {
			LabelEncoding::Numeric => match lexical::parse::<f32, _>(value) {
				Ok(label) if label == 0.0 || label == 1.0 => Some(label),
				_ => None,
			},
			LabelEncoding::SiNo => match value {
				"SI" => Some(1.0),
				"NO" => Some(0.0),
				_ => None,
			},
		}
	}
}

#[derive(Clone, Debug)]
pub struct FromCsvOptions {
	pub delimiter: u8,
	pub has_headers: bool,
	pub label_encoding: LabelEncoding,
	/// Stop after reading this many records.
	pub limit: Option<usize>,
}

impl Default for FromCsvOptions {
	fn default() -> Self {
		Self {
			delimiter: b',',
			has_headers: true,
			label_encoding: LabelEncoding::Numeric,
			limit: None,
		}
	}
}

/**
Convert text records into a dataset whose last column is the label.

The width of the dataset is the width of the first record. Parsing is tolerant: a feature value that is not a number is replaced with `0.0`, and a record with the wrong number of fields or a label that cannot be decoded is skipped. Both conditions are logged rather than returned as errors.
*/
pub fn parse_records<R, S>(records: &[R], label_encoding: LabelEncoding) -> Array2<f32>
where
	R: AsRef<[S]>,
	S: AsRef<str>,
{
	let n_columns = match records.first() {
		Some(record) => record.as_ref().len(),
		None => return Array2::zeros((0, 0)),
	};
	if n_columns == 0 {
		return Array2::zeros((0, 0));
	}
	let mut values: Vec<f32> = Vec::with_capacity(records.len() * n_columns);
	let mut n_rows = 0;
	let mut n_defaulted_values = 0;
	for (record_index, record) in records.iter().enumerate() {
		let record = record.as_ref();
		if record.len() != n_columns {
			log::warn!(
				"skipping record {}: expected {} fields, found {}",
				record_index,
				n_columns,
				record.len(),
			);
			continue;
		}
		let (features, label) = record.split_at(n_columns - 1);
		let label = match label_encoding.parse(label[0].as_ref()) {
			Some(label) => label,
			None => {
				log::warn!(
					"skipping record {}: invalid label {:?}",
					record_index,
					label[0].as_ref(),
				);
				continue;
			}
		};
		for value in features {
			let value = value.as_ref().trim();
			match lexical::parse::<f32, _>(value) {
				Ok(value) if value.is_finite() => values.push(value),
				_ => {
					log::debug!("record {}: defaulting {:?} to 0", record_index, value);
					n_defaulted_values += 1;
					values.push(0.0);
				}
			}
		}
		values.push(label);
		n_rows += 1;
	}
	if n_defaulted_values > 0 {
		log::warn!(
			"replaced {} unparseable feature values with 0",
			n_defaulted_values
		);
	}
	Array2::from_shape_vec((n_rows, n_columns), values).unwrap()
}

/// Read a delimited text file and convert its records with [`parse_records`](fn.parse_records.html).
pub fn from_csv_path(path: &Path, options: &FromCsvOptions) -> Result<Array2<f32>, Error> {
	let mut reader = csv::ReaderBuilder::new()
		.delimiter(options.delimiter)
		.has_headers(options.has_headers)
		.flexible(true)
		.from_path(path)?;
	let mut records: Vec<Vec<String>> = Vec::new();
	for record in reader.records() {
		if options.limit.map(|limit| records.len() >= limit) == Some(true) {
			break;
		}
		let record = record?;
		records.push(record.iter().map(ToOwned::to_owned).collect());
	}
	log::info!("read {} records from {}", records.len(), path.display());
	Ok(parse_records(&records, options.label_encoding))
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_malformed_values_default_to_zero() {
		let records = vec![
			vec!["1.5", "abc", "1"],
			vec!["2", "3", "0"],
			vec!["", "4", "1"],
		];
		let data = parse_records(&records, LabelEncoding::Numeric);
		assert_eq!(
			data,
			arr2(&[[1.5, 0.0, 1.0], [2.0, 3.0, 0.0], [0.0, 4.0, 1.0]])
		);
	}

	#[test]
	fn test_bad_records_are_skipped() {
		let records = vec![
			vec!["1", "SI"],
			vec!["2", "NO", "extra"],
			vec!["3", "MAYBE"],
			vec!["4", "NO"],
		];
		let data = parse_records(&records, LabelEncoding::SiNo);
		assert_eq!(data, arr2(&[[1.0, 1.0], [4.0, 0.0]]));
	}

	#[test]
	fn test_no_records() {
		let records: Vec<Vec<&str>> = Vec::new();
		let data = parse_records(&records, LabelEncoding::Numeric);
		assert_eq!(data.dim(), (0, 0));
	}

	#[test]
	fn test_from_csv_path() {
		let path = std::env::temp_dir().join(format!(
			"speedup_dataset_test_{}.csv",
			std::process::id()
		));
		let mut file = std::fs::File::create(&path).unwrap();
		writeln!(file, "a|b|exporta").unwrap();
		writeln!(file, "1|2|SI").unwrap();
		writeln!(file, "3|x|NO").unwrap();
		writeln!(file, "5|6|SI").unwrap();
		drop(file);
		let options = FromCsvOptions {
			delimiter: b'|',
			label_encoding: LabelEncoding::SiNo,
			limit: Some(2),
			..Default::default()
		};
		let data = from_csv_path(&path, &options).unwrap();
		std::fs::remove_file(&path).unwrap();
		assert_eq!(data, arr2(&[[1.0, 2.0, 1.0], [3.0, 0.0, 0.0]]));
	}
}

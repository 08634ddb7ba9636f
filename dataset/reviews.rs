use super::Error;
use ndarray::prelude::*;
use std::{collections::HashMap, path::Path};

const PRODUCT_ID_COLUMN_INDEX: usize = 0;
const USER_ID_COLUMN_INDEX: usize = 1;
const SCORE_COLUMN_INDEX: usize = 6;

/// A single product review.
#[derive(Clone, Debug)]
pub struct Review {
	pub user_id: String,
	pub product_id: String,
	pub score: f32,
}

/// A dense user by item ratings matrix along with the mapping from the original ids to row and column indexes.
#[derive(Debug)]
pub struct RatingsMatrix {
	/// One row per user and one column per product. Unrated entries are `0.0`.
	pub ratings: Array2<f32>,
	pub user_indexes: HashMap<String, usize>,
	pub product_indexes: HashMap<String, usize>,
}

/**
Read reviews from a comma separated file with a header row, where the product id is in column 0, the user id in column 1, and the score in column 6. Records whose score is missing or is not a number are skipped. Reading stops after `limit` reviews.
*/
pub fn reviews_from_csv_path(path: &Path, limit: Option<usize>) -> Result<Vec<Review>, Error> {
	let mut reader = csv::ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.from_path(path)?;
	let mut reviews = Vec::new();
	let mut n_skipped = 0;
	for record in reader.records() {
		if limit.map(|limit| reviews.len() >= limit) == Some(true) {
			break;
		}
		let record = record?;
		let score = record
			.get(SCORE_COLUMN_INDEX)
			.and_then(|score| lexical::parse::<f32, _>(score.trim()).ok());
		let (product_id, user_id, score) = match (
			record.get(PRODUCT_ID_COLUMN_INDEX),
			record.get(USER_ID_COLUMN_INDEX),
			score,
		) {
			(Some(product_id), Some(user_id), Some(score)) => (product_id, user_id, score),
			_ => {
				n_skipped += 1;
				continue;
			}
		};
		reviews.push(Review {
			user_id: user_id.to_owned(),
			product_id: product_id.to_owned(),
			score,
		});
	}
	if n_skipped > 0 {
		log::warn!("skipped {} reviews without a numeric score", n_skipped);
	}
	log::info!("read {} reviews from {}", reviews.len(), path.display());
	Ok(reviews)
}

/// Build a ratings matrix from reviews. Users and products are numbered in the order they first appear. If a user reviewed the same product more than once, the last score wins.
pub fn ratings_matrix_from_reviews(reviews: &[Review]) -> RatingsMatrix {
	let mut user_indexes: HashMap<String, usize> = HashMap::new();
	let mut product_indexes: HashMap<String, usize> = HashMap::new();
	for review in reviews {
		let n_users = user_indexes.len();
		user_indexes
			.entry(review.user_id.clone())
			.or_insert(n_users);
		let n_products = product_indexes.len();
		product_indexes
			.entry(review.product_id.clone())
			.or_insert(n_products);
	}
	let mut ratings = Array2::zeros((user_indexes.len(), product_indexes.len()));
	for review in reviews {
		let user_index = user_indexes[&review.user_id];
		let product_index = product_indexes[&review.product_id];
		ratings[[user_index, product_index]] = review.score;
	}
	RatingsMatrix {
		ratings,
		user_indexes,
		product_indexes,
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	fn review(user_id: &str, product_id: &str, score: f32) -> Review {
		Review {
			user_id: user_id.to_owned(),
			product_id: product_id.to_owned(),
			score,
		}
	}

	#[test]
	fn test_ratings_matrix_from_reviews() {
		let reviews = vec![
			review("alice", "book", 5.0),
			review("bob", "lamp", 2.0),
			review("alice", "lamp", 3.0),
			review("bob", "lamp", 4.0),
		];
		let matrix = ratings_matrix_from_reviews(&reviews);
		assert_eq!(matrix.user_indexes["alice"], 0);
		assert_eq!(matrix.user_indexes["bob"], 1);
		assert_eq!(matrix.product_indexes["lamp"], 1);
		assert_eq!(matrix.ratings, arr2(&[[5.0, 3.0], [0.0, 4.0]]));
	}

	#[test]
	fn test_reviews_from_csv_path() {
		let path = std::env::temp_dir().join("speedup_dataset_reviews.csv");
		let mut file = std::fs::File::create(&path).unwrap();
		writeln!(file, "ProductId,UserId,ProfileName,Helpful,Total,Time,Score").unwrap();
		writeln!(file, "p1,u1,a,0,0,0,5").unwrap();
		writeln!(file, "p2,u1,a,0,0,0,not a score").unwrap();
		writeln!(file, "p2,u2,b,0,0,0,3").unwrap();
		writeln!(file, "p3,u3,c,0,0,0,1").unwrap();
		drop(file);
		let reviews = reviews_from_csv_path(&path, Some(2)).unwrap();
		std::fs::remove_file(&path).ok();
		assert_eq!(reviews.len(), 2);
		assert_eq!(reviews[0].product_id, "p1");
		assert_eq!(reviews[1].user_id, "u2");
		assert_eq!(reviews[1].score, 3.0);
	}
}

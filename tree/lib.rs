/*!
This crate trains binary decision trees and random forests, each in a sequential and a concurrent flavor.

A [`Tree`](struct.Tree.html) is grown by recursively choosing the split that minimizes the weighted Gini impurity of its children. In the concurrent flavor, the best threshold for each feature is searched for in parallel, one task per feature. A [`Forest`](struct.Forest.html) trains `n_trees` trees on bootstrap samples of the dataset. In the concurrent flavor, a fixed number of workers drain a queue of tree indexes, and every finished tree is stored in its own slot.

Datasets are `ArrayView2<f32>`s whose last column is the label, `0.0` or `1.0`.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod bootstrap;
mod feature_importances;
mod forest;
mod split;
mod train;

pub use self::bootstrap::{bootstrap_sample, bootstrap_sample_size};
pub use self::forest::{Forest, ForestTrainOptions, TrainProgress};
pub use self::split::{choose_best_split, gini, Split};

use ndarray::prelude::*;
use speedup_util::{worker_pool::WorkerPoolError, Execution};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid options: {0}")]
	InvalidOptions(&'static str),
	#[error("the dataset has no label column")]
	NoLabelColumn,
	#[error(transparent)]
	WorkerPool(#[from] WorkerPoolError),
}

/// These are the options passed to `Tree::train`.
#[derive(Clone, Debug)]
pub struct TreeTrainOptions {
	/// The depth of a tree will never exceed this value. Nodes at this depth are always leaves.
	pub max_depth: usize,
	/// With `Execution::Concurrent`, the best threshold for each feature is searched for in its own task.
	pub execution: Execution,
}

impl Default for TreeTrainOptions {
	fn default() -> Self {
		Self {
			max_depth: 5,
			execution: Execution::Concurrent,
		}
	}
}

/// Trees are stored as a `Vec` of `Node`s with the root at index 0. Each branch holds the indexes of its two children.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for a given example. The example holds the feature values and may also hold the trailing label, which is ignored.
	pub fn predict(&self, example: ArrayView1<f32>) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					feature_index,
					split_value,
					left_child_index,
					right_child_index,
					..
				}) => {
					node_index = if example[*feature_index] <= *split_value {
						*left_child_index
					} else {
						*right_child_index
					};
				}
				Node::Leaf(LeafNode { value, .. }) => return *value,
			}
		}
	}

	/// The number of edges on the longest path from the root to a leaf.
	pub fn depth(&self) -> usize {
		fn depth(nodes: &[Node], node_index: usize) -> usize {
			match &nodes[node_index] {
				Node::Branch(branch) => {
					1 + depth(nodes, branch.left_child_index)
						.max(depth(nodes, branch.right_child_index))
				}
				Node::Leaf(_) => 0,
			}
		}
		depth(&self.nodes, 0)
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

/// A `BranchNode` sends an example to its left child if the value of feature `feature_index` is <= `split_value`, and to its right child otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	pub feature_index: usize,
	pub split_value: f32,
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// The fraction of the tree's training examples that passed through this node.
	pub examples_fraction: f32,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	/// The mean label of the training examples that reached this leaf, or 0 if none did.
	pub value: f32,
	/// The fraction of the tree's training examples that reached this leaf.
	pub examples_fraction: f32,
}

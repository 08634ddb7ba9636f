use crate::{
	split::{choose_best_split, Split},
	BranchNode, LeafNode, Node, Tree, TreeTrainOptions,
};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::ops::Range;

impl Tree {
	/**
	Train a tree on `data`, whose last column is the label.

	Nodes are added to the tree in pre-order. A branch's left child is always the node that immediately follows it, and its right child index is filled in once the whole left subtree has been added. A node becomes a leaf when it is at `max_depth`, when it has fewer than two examples, when it is pure, or when every feature is constant over its examples.

	An empty dataset produces a tree with a single leaf whose value is 0.
	*/
	pub fn train(data: ArrayView2<f32>, options: &TreeTrainOptions) -> Tree {
		let mut builder = TreeBuilder {
			data,
			options,
			// The examples index is rearranged in place so that the examples in each node occupy a contiguous range.
			examples_index: (0..data.nrows()).collect(),
			nodes: Vec::new(),
		};
		builder.build(0..data.nrows(), 0);
		log::trace!(
			"trained a tree with {} nodes on {} examples",
			builder.nodes.len(),
			data.nrows()
		);
		Tree {
			nodes: builder.nodes,
		}
	}
}

struct TreeBuilder<'a, 'b> {
	data: ArrayView2<'a, f32>,
	options: &'b TreeTrainOptions,
	examples_index: Vec<usize>,
	nodes: Vec<Node>,
}

impl<'a, 'b> TreeBuilder<'a, 'b> {
	/// Add the node for the examples in `examples_index_range` and all of its descendants, returning its index.
	fn build(&mut self, examples_index_range: Range<usize>, depth: usize) -> usize {
		let node_index = self.nodes.len();
		let examples_fraction = self.examples_fraction(examples_index_range.len());
		let split = if depth < self.options.max_depth {
			choose_best_split(
				self.data,
				&self.examples_index[examples_index_range.clone()],
				self.options.execution,
			)
		} else {
			None
		};
		let split = match split {
			Some(split) => split,
			None => {
				let value = self.leaf_value(examples_index_range);
				self.nodes.push(Node::Leaf(LeafNode {
					value,
					examples_fraction,
				}));
				return node_index;
			}
		};
		self.nodes.push(Node::Branch(BranchNode {
			feature_index: split.feature_index,
			split_value: split.split_value,
			left_child_index: node_index + 1,
			// This is filled in after the left subtree is built.
			right_child_index: 0,
			examples_fraction,
		}));
		let (left_range, right_range) = self.rearrange_examples_index(&split, examples_index_range);
		self.build(left_range, depth + 1);
		let right_child_index = self.build(right_range, depth + 1);
		if let Node::Branch(branch) = &mut self.nodes[node_index] {
			branch.right_child_index = right_child_index;
		}
		node_index
	}

	/// Rearrange the examples in `examples_index_range` so that the examples the split sends left come first, and return the left and right ranges.
	fn rearrange_examples_index(
		&mut self,
		split: &Split,
		examples_index_range: Range<usize>,
	) -> (Range<usize>, Range<usize>) {
		let data = self.data;
		let examples_index = &mut self.examples_index[examples_index_range.clone()];
		let mut left = 0;
		let mut right = examples_index.len();
		while left < right {
			if data[[examples_index[left], split.feature_index]] <= split.split_value {
				left += 1;
			} else {
				right -= 1;
				examples_index.swap(left, right);
			}
		}
		let start = examples_index_range.start;
		(start..start + left, start + left..examples_index_range.end)
	}

	/// The mean label of the examples in the node, or 0 for an empty node.
	fn leaf_value(&self, examples_index_range: Range<usize>) -> f32 {
		let n_examples = examples_index_range.len();
		if n_examples == 0 {
			return 0.0;
		}
		let label_index = match self.data.ncols().checked_sub(1) {
			Some(label_index) => label_index,
			None => return 0.0,
		};
		let sum: f64 = self.examples_index[examples_index_range]
			.iter()
			.map(|example_index| self.data[[*example_index, label_index]].to_f64().unwrap())
			.sum();
		(sum / n_examples.to_f64().unwrap()).to_f32().unwrap()
	}

	fn examples_fraction(&self, n_examples: usize) -> f32 {
		let n_root_examples = self.data.nrows();
		if n_root_examples == 0 {
			return 0.0;
		}
		n_examples.to_f32().unwrap() / n_root_examples.to_f32().unwrap()
	}
}

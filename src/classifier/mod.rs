//! Shallow decision-tree classifier for the weekly laying flag.
//!
//! A single CART tree: axis-aligned `feature <= threshold` splits chosen by
//! weighted Gini impurity, with optional class balancing so the rare laying
//! weeks are not drowned out by the common ones.

mod tree;

pub use tree::{ClassWeight, DecisionTree, DecisionTreeConfig, NodeKind, TreeNode};

//! Overlapping-patterns Wave Function Collapse over tile-id matrices.
//!
//! Learn pattern frequencies and adjacency rules from example tilemaps with
//! [`Model::learn`], then synthesize new tilemaps of arbitrary size with
//! [`Model::generate`]/[`Model::generate_with_rng`].

pub mod bitmask;
mod direction;
mod error;
mod learner;
mod model;
mod queue;
mod solver;
mod wave;

pub use bitmask::Bitmask;
pub use error::Error;
pub use model::{Model, PresetSpec};

/// A 2D matrix of tile ids, row-major (`images[y][x]`).
pub type TileMatrix = Vec<Vec<u64>>;

/// A synthesized tilemap, same shape as [`TileMatrix`].
pub type Tilemap = Vec<Vec<u64>>;

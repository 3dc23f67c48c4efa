//! The public façade binding a learned pattern set to the solver.
//!
//! `Model::learn` binds a learned pattern/weight/adjacency set to a reusable,
//! stateful value that can carry pre-sets across repeated `generate` calls.

use rand::Rng;

use crate::bitmask::Bitmask;
use crate::error::Error;
use crate::learner::{self, PatternData};
use crate::solver;
use crate::wave::PresetInstruction;
use crate::Tilemap;
use crate::TileMatrix;

/// A pre-set constraint value: either a single forced pattern index or an
/// arbitrary allowed-pattern mask.
pub enum PresetSpec {
    Single(usize),
    Mask(Bitmask),
}

impl From<usize> for PresetSpec {
    fn from(pattern_index: usize) -> Self {
        PresetSpec::Single(pattern_index)
    }
}

impl From<Bitmask> for PresetSpec {
    fn from(mask: Bitmask) -> Self {
        PresetSpec::Mask(mask)
    }
}

pub struct Model {
    patterns: Vec<PatternData>,
    weights: Vec<u32>,
    adjacency: Vec<[Bitmask; 4]>,
    presets: Vec<PresetInstruction>,
}

impl Model {
    /// Learns patterns, weights, and adjacency from `images` using an
    /// `n`×`n` sliding window. See [`crate::learner::learn`].
    pub fn learn(images: &[TileMatrix], n: usize) -> Result<Model, Error> {
        let learned = learner::learn(images, n)?;
        Ok(Model {
            patterns: learned.patterns,
            weights: learned.weights,
            adjacency: learned.adjacency,
            presets: Vec::new(),
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Forces cell `(x, y)` to initialize with `spec` instead of the full
    /// pattern set. Replaces any existing pre-set at the same cell.
    pub fn set_preset(&mut self, x: usize, y: usize, spec: impl Into<PresetSpec>) {
        let mask = match spec.into() {
            PresetSpec::Single(idx) => {
                let mut m = Bitmask::new_empty(self.patterns.len());
                m.set(idx);
                m
            }
            PresetSpec::Mask(mask) => mask,
        };

        self.presets.retain(|p| !(p.x == x && p.y == y));
        self.presets.push(PresetInstruction { x, y, mask });
    }

    pub fn clear_presets(&mut self) {
        self.presets.clear();
    }

    /// Generates a `width`×`height` tilemap using the thread-local RNG.
    pub fn generate(
        &self,
        width: usize,
        height: usize,
        max_attempts: u32,
    ) -> Result<Option<Tilemap>, Error> {
        self.generate_with_rng(width, height, max_attempts, &mut rand::thread_rng())
    }

    /// Generates a `width`×`height` tilemap using the supplied RNG, for
    /// reproducible (seeded) generation.
    pub fn generate_with_rng(
        &self,
        width: usize,
        height: usize,
        max_attempts: u32,
        rng: &mut impl Rng,
    ) -> Result<Option<Tilemap>, Error> {
        solver::solve(
            &self.patterns,
            &self.weights,
            &self.adjacency,
            &self.presets,
            width,
            height,
            max_attempts,
            rng,
        )
    }
}

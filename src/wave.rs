//! The H×W grid of per-cell possibility bitmasks.
//!
//! A flat row-major `Vec<Bitmask>` plus `width`/`height`/neighbor
//! bookkeeping, with support for pre-set cell application at
//! initialization.

use crate::bitmask::Bitmask;
use crate::direction::Direction;

/// A pre-set constraint: cell `(y, x)` must initialize to `mask` instead of
/// the full pattern set.
#[derive(Clone)]
pub struct PresetInstruction {
    pub x: usize,
    pub y: usize,
    pub mask: Bitmask,
}

pub struct WaveMatrix {
    cells: Vec<Bitmask>,
    width: usize,
    height: usize,
}

impl WaveMatrix {
    /// Every cell initialized to the full set `[0, pattern_count)`.
    pub fn new(pattern_count: usize, width: usize, height: usize) -> Self {
        WaveMatrix {
            cells: vec![Bitmask::new_full(pattern_count); width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, y: usize, x: usize) -> usize {
        y * self.width + x
    }

    pub fn at(&self, y: usize, x: usize) -> &Bitmask {
        &self.cells[self.index(y, x)]
    }

    pub fn at_mut(&mut self, y: usize, x: usize) -> &mut Bitmask {
        let idx = self.index(y, x);
        &mut self.cells[idx]
    }

    pub fn apply_presets(&mut self, presets: &[PresetInstruction]) {
        for preset in presets {
            let idx = self.index(preset.y, preset.x);
            self.cells[idx] = preset.mask.clone();
        }
    }

    /// The neighbor of `(y, x)` in `direction`, if in bounds.
    pub fn neighbor(&self, y: usize, x: usize, direction: Direction) -> Option<(usize, usize)> {
        let (dy, dx) = direction.offset();
        let ny = y as i64 + dy;
        let nx = x as i64 + dx;
        if ny < 0 || nx < 0 || ny as usize >= self.height || nx as usize >= self.width {
            None
        } else {
            Some((ny as usize, nx as usize))
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (y, x)))
    }
}

//! Pattern extraction, deduplication, weighting, and adjacency computation.
//!
//! Window extraction and the overlap-compatibility test work over tile ids
//! rather than pixels; patterns are counted with explicit frequency weights
//! instead of an implicit uniform weighting, and adjacency is a proper
//! `Bitmask` table rather than a sparse pair map.

use itertools::{iproduct, Itertools};
use rustc_hash::FxHashMap;

use crate::bitmask::Bitmask;
use crate::direction::Direction;
use crate::error::Error;
use crate::TileMatrix;

/// A flattened, row-major N×N window of tile ids.
pub type PatternData = Vec<u64>;

pub struct Learned {
    pub patterns: Vec<PatternData>,
    pub weights: Vec<u32>,
    pub adjacency: Vec<[Bitmask; 4]>,
}

pub fn learn(images: &[TileMatrix], n: usize) -> Result<Learned, Error> {
    let (patterns, weights) = extract_patterns(images, n)?;
    let adjacency = build_adjacency(&patterns, n);
    Ok(Learned {
        patterns,
        weights,
        adjacency,
    })
}

fn extract_patterns(
    images: &[TileMatrix],
    n: usize,
) -> Result<(Vec<PatternData>, Vec<u32>), Error> {
    if n < 1 {
        return Err(Error::InvalidInput(format!(
            "pattern size must be at least 1, got {n}"
        )));
    }
    if images.is_empty() {
        return Err(Error::InvalidInput(
            "at least one example image is required".to_string(),
        ));
    }

    for (idx, image) in images.iter().enumerate() {
        let height = image.len();
        if height == 0 {
            return Err(Error::InvalidInput(format!("image {idx} has zero rows")));
        }
        let width = image[0].len();
        if image.iter().any(|row| row.len() != width) {
            return Err(Error::InvalidInput(format!("image {idx} has ragged rows")));
        }
        if height < n || width < n {
            return Err(Error::InvalidInput(format!(
                "image {idx} ({width}x{height}) is smaller than pattern size {n}"
            )));
        }
    }

    let mut index_of: FxHashMap<PatternData, usize> = FxHashMap::default();
    let mut patterns: Vec<PatternData> = Vec::new();
    let mut weights: Vec<u32> = Vec::new();

    for image in images {
        let height = image.len();
        let width = image[0].len();
        for y in 0..=(height - n) {
            for x in 0..=(width - n) {
                let mut window = Vec::with_capacity(n * n);
                for dy in 0..n {
                    for dx in 0..n {
                        window.push(image[y + dy][x + dx]);
                    }
                }

                match index_of.get(&window) {
                    Some(&idx) => weights[idx] += 1,
                    None => {
                        let idx = patterns.len();
                        index_of.insert(window.clone(), idx);
                        patterns.push(window);
                        weights.push(1);
                    }
                }
            }
        }
    }

    log::debug!(
        "extracted {} distinct pattern(s) from {} image(s) with n={n}",
        patterns.len(),
        images.len()
    );

    Ok((patterns, weights))
}

/// The cells on the `direction` side of an N×N pattern, in row-major order.
///
/// For `Up`/`Down` this is the top/bottom `N-1` rows; for `Left`/`Right`
/// the left/right `N-1` columns, walked row-major so that comparing a
/// side to the opposite side of another pattern lines up element-wise.
fn side(pattern: &[u64], n: usize, direction: Direction) -> Vec<u64> {
    let mut out = Vec::with_capacity(n * (n - 1));
    match direction {
        Direction::Up => {
            for row in 0..n - 1 {
                for col in 0..n {
                    out.push(pattern[row * n + col]);
                }
            }
        }
        Direction::Down => {
            for row in 1..n {
                for col in 0..n {
                    out.push(pattern[row * n + col]);
                }
            }
        }
        Direction::Left => {
            for row in 0..n {
                for col in 0..n - 1 {
                    out.push(pattern[row * n + col]);
                }
            }
        }
        Direction::Right => {
            for row in 0..n {
                for col in 1..n {
                    out.push(pattern[row * n + col]);
                }
            }
        }
    }
    out
}

/// Whether `b` may legally sit at `direction` of `a`.
fn compatible(a: &[u64], b: &[u64], n: usize, direction: Direction) -> bool {
    if n == 1 {
        return a[0] == b[0];
    }
    side(a, n, direction) == side(b, n, direction.opposite())
}

fn build_adjacency(patterns: &[PatternData], n: usize) -> Vec<[Bitmask; 4]> {
    let p = patterns.len();
    let mut adjacency: Vec<[Bitmask; 4]> = (0..p)
        .map(|_| {
            [
                Bitmask::new_empty(p),
                Bitmask::new_empty(p),
                Bitmask::new_empty(p),
                Bitmask::new_empty(p),
            ]
        })
        .collect();

    // Self-adjacency, enumerated explicitly rather than relying on a `j > i`
    // loop (which would skip the `i == j` case).
    for (i, direction) in iproduct!(0..p, Direction::ALL) {
        if compatible(&patterns[i], &patterns[i], n, direction) {
            adjacency[i][direction.index()].set(i);
        }
    }

    for ((i, j), direction) in iproduct!((0..p).tuple_combinations::<(usize, usize)>(), Direction::ALL) {
        if compatible(&patterns[i], &patterns[j], n, direction) {
            adjacency[i][direction.index()].set(j);
            adjacency[j][direction.opposite().index()].set(i);
        }
    }

    adjacency
}

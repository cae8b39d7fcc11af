//! Coarse aggregation grid. One value covers a `block_size` x `block_size`
//! square of world tiles; the periodic passes read and write these instead of
//! per-tile state.

use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMap {
    values: Vec<i16>,
    pub width: usize,
    pub height: usize,
    pub block_size: usize,
}

impl BlockMap {
    /// A map covering the world grid at the given resolution. `block_size`
    /// is 1, 2, 4, or 8 depending on how coarse the signal is.
    pub fn new(block_size: usize) -> Self {
        let width = GRID_WIDTH.div_ceil(block_size);
        let height = GRID_HEIGHT.div_ceil(block_size);
        Self {
            values: vec![0; width * height],
            width,
            height,
            block_size,
        }
    }

    #[inline]
    pub fn in_bounds(&self, bx: usize, by: usize) -> bool {
        bx < self.width && by < self.height
    }

    #[inline]
    fn index(&self, bx: usize, by: usize) -> usize {
        assert!(
            self.in_bounds(bx, by),
            "block coordinates ({bx}, {by}) out of bounds"
        );
        by * self.width + bx
    }

    #[inline]
    pub fn get(&self, bx: usize, by: usize) -> i16 {
        self.values[self.index(bx, by)]
    }

    #[inline]
    pub fn set(&mut self, bx: usize, by: usize, value: i16) {
        let idx = self.index(bx, by);
        self.values[idx] = value;
    }

    /// Reads the block covering world tile `(x, y)`.
    #[inline]
    pub fn world_get(&self, x: usize, y: usize) -> i16 {
        self.get(x / self.block_size, y / self.block_size)
    }

    /// Writes the block covering world tile `(x, y)`.
    #[inline]
    pub fn world_set(&mut self, x: usize, y: usize, value: i16) {
        self.set(x / self.block_size, y / self.block_size, value);
    }

    pub fn clear(&mut self) {
        self.values.fill(0);
    }

    /// Sum of every block value; the census averages are built from this.
    pub fn total(&self) -> i64 {
        self.values.iter().map(|&v| v as i64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), i16)> + '_ {
        let width = self.width;
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| ((i % width, i / width), v))
    }
}

/// Box-blur step shared by every aggregation pass: each destination block
/// becomes `(src + sum_of_cardinal_neighbors / 4) / 2`. Out-of-bounds
/// neighbors contribute zero and the divisor stays 4, so edges bleed off the
/// map slightly.
pub fn smooth(src: &BlockMap) -> BlockMap {
    let mut dest = BlockMap::new(src.block_size);
    for by in 0..src.height {
        for bx in 0..src.width {
            let mut edges: i32 = 0;
            if bx > 0 {
                edges += src.get(bx - 1, by) as i32;
            }
            if bx + 1 < src.width {
                edges += src.get(bx + 1, by) as i32;
            }
            if by > 0 {
                edges += src.get(bx, by - 1) as i32;
            }
            if by + 1 < src.height {
                edges += src.get(bx, by + 1) as i32;
            }
            let value = (src.get(bx, by) as i32 + edges / 4) / 2;
            dest.set(bx, by, value as i16);
        }
    }
    dest
}

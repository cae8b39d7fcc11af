use bevy::prelude::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH};
use crate::tiles::DIRT;

bitflags! {
    /// Per-cell state bits, packed into the high half of a u16 so the low
    /// half stays free for save-format growth.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct TileFlags: u16 {
        /// Reached by the power network during the last power scan.
        const POWERED = 1 << 15;
        /// Carries electricity (wires, zone centers, building centers).
        const CONDUCTIVE = 1 << 14;
        /// Fire can spread to this cell.
        const COMBUSTIBLE = 1 << 13;
        /// A bulldozer (or a disaster) can clear this cell.
        const BULLDOZABLE = 1 << 12;
        /// Cycles through display frames; the repair pass leaves it alone.
        const ANIMATED = 1 << 11;
        /// The single center cell of a multi-cell zone or building.
        const ZONE_CENTER = 1 << 10;
        /// Reached by the irrigation network during the last water scan.
        const IRRIGATED = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub tile_type: u16,
    pub flags: TileFlags,
}

impl Cell {
    pub fn new(tile_type: u16, flags: TileFlags) -> Self {
        Self { tile_type, flags }
    }

    #[inline]
    pub fn is_powered(&self) -> bool {
        self.flags.contains(TileFlags::POWERED)
    }

    #[inline]
    pub fn is_conductive(&self) -> bool {
        self.flags.contains(TileFlags::CONDUCTIVE)
    }

    #[inline]
    pub fn is_combustible(&self) -> bool {
        self.flags.contains(TileFlags::COMBUSTIBLE)
    }

    #[inline]
    pub fn is_bulldozable(&self) -> bool {
        self.flags.contains(TileFlags::BULLDOZABLE)
    }

    #[inline]
    pub fn is_animated(&self) -> bool {
        self.flags.contains(TileFlags::ANIMATED)
    }

    #[inline]
    pub fn is_zone_center(&self) -> bool {
        self.flags.contains(TileFlags::ZONE_CENTER)
    }

    #[inline]
    pub fn is_irrigated(&self) -> bool {
        self.flags.contains(TileFlags::IRRIGATED)
    }

    #[inline]
    pub fn set_powered(&mut self, on: bool) {
        self.flags.set(TileFlags::POWERED, on);
    }

    #[inline]
    pub fn set_irrigated(&mut self, on: bool) {
        self.flags.set(TileFlags::IRRIGATED, on);
    }
}

#[derive(Resource, Serialize, Deserialize)]
pub struct TileGrid {
    pub cells: Vec<Cell>,
    pub width: usize,
    pub height: usize,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![Cell::default(); width * height],
            width,
            height,
        }
    }

    /// Out-of-bounds coordinates are a programmer error; callers gate on
    /// `in_bounds` or `offset` first.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            self.in_bounds(x, y),
            "tile coordinates ({x}, {y}) out of bounds"
        );
        y * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &Cell {
        &self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        let idx = self.index(x, y);
        &mut self.cells[idx]
    }

    #[inline]
    pub fn value(&self, x: usize, y: usize) -> u16 {
        self.get(x, y).tile_type
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, tile_type: u16, flags: TileFlags) {
        *self.get_mut(x, y) = Cell::new(tile_type, flags);
    }

    /// Clears a cell back to bare dirt.
    pub fn clear(&mut self, x: usize, y: usize) {
        self.set(x, y, DIRT, TileFlags::empty());
    }

    /// Applies a signed offset, returning `None` if it leaves the grid.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, dx: i32, dy: i32) -> Option<(usize, usize)> {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    }

    /// Returns up to 4 cardinal neighbors and the count of valid entries.
    /// Use `&result[..count]` to iterate over valid neighbors.
    pub fn neighbors4(&self, x: usize, y: usize) -> ([(usize, usize); 4], usize) {
        let mut result = [(0, 0); 4];
        let mut count = 0;
        if x > 0 {
            result[count] = (x - 1, y);
            count += 1;
        }
        if x + 1 < self.width {
            result[count] = (x + 1, y);
            count += 1;
        }
        if y > 0 {
            result[count] = (x, y - 1);
            count += 1;
        }
        if y + 1 < self.height {
            result[count] = (x, y + 1);
            count += 1;
        }
        (result, count)
    }
}

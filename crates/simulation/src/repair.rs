//! Building self-repair.
//!
//! Service buildings slowly rebuild footprint cells that disasters turned
//! into rubble, flood, or radiation. Each registered building type carries a
//! period mask; the zone-center scan consults the registry and a repair
//! fires only on cycles where `city_time & period == 0`. Cells outside the
//! damage band (bare dirt, anything built) and animated cells (burning
//! fire) are left alone, and the center cell is never rewritten.

use bevy::prelude::*;

use crate::grid::{TileFlags, TileGrid};
use crate::tiles::{
    AIRPORT, COAL_PLANT, FIRE_STATION, NUCLEAR_PLANT, POLICE_STATION, ROAD_BASE, RUBBLE, SEAPORT,
    STADIUM,
};

#[derive(Debug, Clone, Copy)]
pub struct RepairEntry {
    /// Exact zone-center code this entry applies to.
    pub center: u16,
    /// Period mask: repairs run when `city_time & period == 0`.
    pub period: u64,
    /// Footprint edge length; the footprint spans `(x-1, y-1)` to
    /// `(x+size-2, y+size-2)` around the center.
    pub size: i32,
}

#[derive(Resource, Debug)]
pub struct RepairRegistry {
    entries: Vec<RepairEntry>,
}

impl Default for RepairRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl RepairRegistry {
    /// The stock registry: the large service buildings. Zones rebuild
    /// themselves through tier transitions and are not listed here.
    pub fn standard() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.register(COAL_PLANT, 15, 4);
        registry.register(NUCLEAR_PLANT, 7, 4);
        registry.register(SEAPORT, 15, 4);
        registry.register(STADIUM, 15, 4);
        registry.register(AIRPORT, 7, 6);
        registry.register(FIRE_STATION, 7, 3);
        registry.register(POLICE_STATION, 7, 3);
        registry
    }

    pub fn register(&mut self, center: u16, period: u64, size: i32) {
        self.entries.push(RepairEntry {
            center,
            period,
            size,
        });
    }

    /// Called for every zone-center cell during the scan. Looks up the
    /// center code and repairs the footprint when the period lines up.
    pub fn check_tile(&self, grid: &mut TileGrid, x: usize, y: usize, city_time: u64) {
        let value = grid.value(x, y);
        for entry in &self.entries {
            if entry.center != value {
                continue;
            }
            if city_time & entry.period == 0 {
                repair_zone(grid, x, y, entry);
            }
            return;
        }
    }
}

fn repair_zone(grid: &mut TileGrid, x: usize, y: usize, entry: &RepairEntry) {
    // Walk the footprint in sequence order; the counter tracks the tile
    // code each cell should hold.
    let mut code = entry.center as i32 - 2 - entry.size;
    for dy in -1..entry.size - 1 {
        for dx in -1..entry.size - 1 {
            code += 1;
            let Some((cx, cy)) = grid.offset(x, y, dx, dy) else {
                continue;
            };
            let cell = grid.get(cx, cy);
            if cell.is_zone_center() || cell.is_animated() {
                continue;
            }
            let current = cell.tile_type;
            if (RUBBLE..ROAD_BASE).contains(&current) {
                grid.set(
                    cx,
                    cy,
                    code as u16,
                    TileFlags::CONDUCTIVE | TileFlags::COMBUSTIBLE,
                );
            }
        }
    }
}

//! Electrical coverage.
//!
//! Generators found during the map scan queue their positions here; the
//! power phase then walks the conductive network outward from each root,
//! marking the per-tile coverage map. Coverage is a reachability bitmap with
//! a total visit budget, not a load-flow model: every visit burns one unit
//! of generated capacity and the whole pass aborts once capacity runs out.

use bevy::prelude::*;

use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::grid::TileGrid;
use crate::messages::{Message, MessageLog};

/// Cells a coal plant can feed per scan.
pub const COAL_PLANT_CAPACITY: i32 = 700;
/// Cells a nuclear plant can feed per scan.
pub const NUCLEAR_PLANT_CAPACITY: i32 = 2000;

const DX: [i32; 4] = [0, 1, 0, -1];
const DY: [i32; 4] = [-1, 0, 1, 0];

/// Pending generator roots, pushed by the plant handlers during the scan
/// phases and drained by `do_power_scan`.
#[derive(Resource, Debug, Default)]
pub struct PowerScan {
    stack: Vec<(usize, usize)>,
}

impl PowerScan {
    pub fn push_root(&mut self, x: usize, y: usize) {
        self.stack.push((x, y));
    }

    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

/// Depth-first walk over conductive cells from every queued generator.
///
/// At each position: spend one capacity unit (aborting the whole pass with a
/// `NotEnoughPower` message if the plants are out), mark the coverage map,
/// then look clockwise from north for unmarked conductive neighbors. One
/// neighbor: follow it. Two or more: remember this position on the stack and
/// follow the last one found. None: pop the next branch point or root.
///
/// Two plants wired directly together share one network: the walk from the
/// first marks the second, so the second's own walk ends immediately and it
/// is effectively billed as a consumer. Long-standing behavior; fixing it
/// would change every two-plant city.
pub fn do_power_scan(
    scan: &mut PowerScan,
    grid: &TileGrid,
    maps: &mut BlockMaps,
    census: &Census,
    messages: &mut MessageLog,
    city_time: u64,
) {
    maps.power_grid.clear();

    let max_power = census.coal_plant_count * COAL_PLANT_CAPACITY
        + census.nuclear_plant_count * NUCLEAR_PLANT_CAPACITY;
    let mut consumption: i32 = 0;

    while let Some((root_x, root_y)) = scan.stack.pop() {
        let mut x = root_x;
        let mut y = root_y;
        let mut any_dir: Option<usize> = None;
        loop {
            consumption += 1;
            if consumption > max_power {
                messages.push(Message::NotEnoughPower, city_time);
                scan.stack.clear();
                return;
            }

            if let Some(dir) = any_dir {
                // Direction came from testing this neighbor, so it is in
                // bounds.
                let (nx, ny) = grid
                    .offset(x, y, DX[dir], DY[dir])
                    .unwrap_or((x, y));
                x = nx;
                y = ny;
            }
            maps.power_grid.world_set(x, y, 1);

            let mut con_num = 0;
            let mut dir = 0;
            while dir < 4 && con_num < 2 {
                if test_for_conductive(grid, maps, x, y, dir) {
                    con_num += 1;
                    any_dir = Some(dir);
                }
                dir += 1;
            }
            if con_num > 1 {
                scan.stack.push((x, y));
            }
            if con_num == 0 {
                break;
            }
        }
    }
}

fn test_for_conductive(
    grid: &TileGrid,
    maps: &BlockMaps,
    x: usize,
    y: usize,
    dir: usize,
) -> bool {
    match grid.offset(x, y, DX[dir], DY[dir]) {
        Some((nx, ny)) => {
            grid.get(nx, ny).is_conductive() && maps.power_grid.world_get(nx, ny) == 0
        }
        None => false,
    }
}

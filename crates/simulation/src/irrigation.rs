//! Irrigation coverage.
//!
//! Structured exactly like the power scan: pump stations found during the
//! map scan queue their positions, then the water phase walks the hydraulic
//! network (aqueducts, pumps, farm centers) outward, marking the water
//! coverage map under a total visit budget. Farm centers carry water the way
//! zone centers carry power, so adjacent fields irrigate each other.

use bevy::prelude::*;

use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::grid::TileGrid;
use crate::messages::{Message, MessageLog};
use crate::tiles::is_hydraulic;

/// Cells a pump station can irrigate per scan.
pub const PUMP_CAPACITY: i32 = 300;

const DX: [i32; 4] = [0, 1, 0, -1];
const DY: [i32; 4] = [-1, 0, 1, 0];

/// Pending pump roots, pushed by the pump handler during the scan phases.
#[derive(Resource, Debug, Default)]
pub struct WaterScan {
    stack: Vec<(usize, usize)>,
}

impl WaterScan {
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

/// Depth-first walk over hydraulic cells from every queued pump. Emits
/// `NotEnoughWater` and abandons the pass when the pumps run dry.
pub fn do_water_scan(
    scan: &mut WaterScan,
    grid: &TileGrid,
    maps: &mut BlockMaps,
    census: &Census,
    messages: &mut MessageLog,
    city_time: u64,
) {
    maps.water_grid.clear();

    let max_water = census.pump_count * PUMP_CAPACITY;
    let mut consumption: i32 = 0;

    while let Some((root_x, root_y)) = scan.stack.pop() {
        let mut x = root_x;
        let mut y = root_y;
        let mut any_dir: Option<usize> = None;
        loop {
            consumption += 1;
            if consumption > max_water {
                messages.push(Message::NotEnoughWater, city_time);
                scan.stack.clear();
                return;
            }

            if let Some(dir) = any_dir {
                let (nx, ny) = grid.offset(x, y, DX[dir], DY[dir]).unwrap_or((x, y));
                x = nx;
                y = ny;
            }
            maps.water_grid.world_set(x, y, 1);

            let mut con_num = 0;
            let mut dir = 0;
            while dir < 4 && con_num < 2 {
                if test_for_hydraulic(grid, maps, x, y, dir) {
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

fn test_for_hydraulic(grid: &TileGrid, maps: &BlockMaps, x: usize, y: usize, dir: usize) -> bool {
    match grid.offset(x, y, DX[dir], DY[dir]) {
        Some((nx, ny)) => {
            is_hydraulic(grid.value(nx, ny)) && maps.water_grid.world_get(nx, ny) == 0
        }
        None => false,
    }
}

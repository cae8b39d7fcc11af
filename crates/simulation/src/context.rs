//! Shared state threaded through the tile scan.
//!
//! Tile handlers need most of the simulation state at once: census
//! counters, valves, aggregation maps, the RNG stream, and the traversal
//! scans. Bundling the borrows into one context keeps every handler at the
//! same four-argument signature and lets the dispatch table hold plain
//! function pointers.

use rand::RngCore;

use crate::block_maps::BlockMaps;
use crate::budget::CityBudget;
use crate::census::Census;
use crate::config::GameLevel;
use crate::disasters::DisasterState;
use crate::grid::TileGrid;
use crate::irrigation::WaterScan;
use crate::messages::MessageLog;
use crate::power::PowerScan;
use crate::repair::RepairRegistry;
use crate::valves::Valves;

/// Everything a tile handler may touch besides the grid itself.
pub struct SimContext<'a> {
    pub census: &'a mut Census,
    pub valves: &'a Valves,
    pub maps: &'a mut BlockMaps,
    pub budget: &'a CityBudget,
    pub rng: &'a mut dyn RngCore,
    pub messages: &'a mut MessageLog,
    pub power: &'a mut PowerScan,
    pub water: &'a mut WaterScan,
    pub repair: &'a RepairRegistry,
    pub disasters: &'a mut DisasterState,
    pub city_time: u64,
    pub level: GameLevel,
}

/// A tile handler processes one cell during the map scan.
pub type TileHandler = fn(&mut TileGrid, usize, usize, &mut SimContext<'_>);

//! The save payload and its gather/apply passes over the world.
//!
//! `SaveData` carries the complete simulation state: the raw cell array, the
//! census with its histories, the demand valves, the budget, the difficulty
//! level, and an extension map of registry-serialized resources (RNG
//! snapshot, scheduler counters, message log, disasters, evaluation).
//! Aggregation overlays are deliberately absent; the periodic passes rebuild
//! them within a few cycles of loading.

use std::collections::BTreeMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use simulation::block_maps::BlockMaps;
use simulation::budget::CityBudget;
use simulation::census::Census;
use simulation::config::{GameLevel, GRID_HEIGHT, GRID_WIDTH};
use simulation::grid::{Cell, TileFlags, TileGrid};
use simulation::irrigation::WaterScan;
use simulation::power::PowerScan;
use simulation::valves::Valves;
use simulation::SaveableRegistry;

use crate::save_error::SaveError;

/// Current save data schema version.
/// v1 = cells, census, valves, budget, level, extension map
pub const SAVE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Encode, Decode)]
pub struct SaveData {
    /// Schema version; files from newer builds are rejected on load.
    pub version: u32,
    pub width: u32,
    pub height: u32,
    /// One packed word per cell: the tile code in the low half, the flag
    /// bits in the high half.
    pub cells: Vec<u32>,
    pub census: Census,
    pub valves: Valves,
    pub budget: CityBudget,
    pub level: GameLevel,
    /// Registry-serialized resources, keyed by their stable `SAVE_KEY`.
    pub extensions: BTreeMap<String, Vec<u8>>,
}

#[inline]
fn pack_cell(cell: &Cell) -> u32 {
    cell.tile_type as u32 | (cell.flags.bits() as u32) << 16
}

#[inline]
fn unpack_cell(word: u32) -> Cell {
    Cell::new(
        word as u16,
        TileFlags::from_bits_truncate((word >> 16) as u16),
    )
}

/// Captures the full simulation state from the world.
pub fn gather_save_data(world: &World) -> SaveData {
    let grid = world.resource::<TileGrid>();
    let registry = world.resource::<SaveableRegistry>();
    SaveData {
        version: SAVE_FORMAT_VERSION,
        width: grid.width as u32,
        height: grid.height as u32,
        cells: grid.cells.iter().map(pack_cell).collect(),
        census: world.resource::<Census>().clone(),
        valves: *world.resource::<Valves>(),
        budget: world.resource::<CityBudget>().clone(),
        level: *world.resource::<GameLevel>(),
        extensions: registry.save_all(world),
    }
}

/// Replaces the world's simulation state with the contents of `save`.
///
/// Aggregation overlays and the scan scratch restart from empty rather than
/// being restored. Extension-registered resources are reset before loading,
/// so a key absent from the file lands on its default instead of whatever
/// the previous city left behind.
pub fn apply_save_data(world: &mut World, save: SaveData) -> Result<(), SaveError> {
    let SaveData {
        version,
        width,
        height,
        cells,
        census,
        valves,
        budget,
        level,
        extensions,
    } = save;

    if version > SAVE_FORMAT_VERSION {
        return Err(SaveError::UnsupportedVersion { found: version });
    }
    let (width, height) = (width as usize, height as usize);
    if width != GRID_WIDTH || height != GRID_HEIGHT {
        return Err(SaveError::corrupt(format!(
            "grid is {width}x{height}, this build runs {GRID_WIDTH}x{GRID_HEIGHT}"
        )));
    }
    if cells.len() != width * height {
        return Err(SaveError::corrupt(format!(
            "cell array holds {} entries for a {width}x{height} grid",
            cells.len()
        )));
    }

    world.insert_resource(TileGrid {
        cells: cells.into_iter().map(unpack_cell).collect(),
        width,
        height,
    });
    world.insert_resource(census);
    world.insert_resource(valves);
    world.insert_resource(budget);
    world.insert_resource(level);

    world.insert_resource(BlockMaps::default());
    world.insert_resource(PowerScan::default());
    world.insert_resource(WaterScan::default());

    world.resource_scope(|world, registry: Mut<SaveableRegistry>| {
        registry.reset_all(world);
        registry.load_all(world, &extensions);
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::messages::MessageLog;
    use simulation::random::SimRng;
    use simulation::scheduler::Simulation;
    use simulation::tiles::{DIRT, RES_BASE, ROADS, WIRE_H};

    fn test_world() -> World {
        let mut world = World::new();
        world.insert_resource(TileGrid::default());
        world.insert_resource(Census::default());
        world.insert_resource(Valves::default());
        world.insert_resource(CityBudget::default());
        world.insert_resource(GameLevel::Medium);
        world.insert_resource(BlockMaps::default());
        world.insert_resource(PowerScan::default());
        world.insert_resource(WaterScan::default());
        world.insert_resource(SimRng::default());
        world.insert_resource(Simulation::default());
        world.insert_resource(MessageLog::default());

        let mut registry = SaveableRegistry::default();
        registry.register::<SimRng>();
        registry.register::<Simulation>();
        registry.register::<MessageLog>();
        world.insert_resource(registry);
        world
    }

    #[test]
    fn test_cell_packing_roundtrip() {
        let cells = [
            Cell::default(),
            Cell::new(ROADS, TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE),
            Cell::new(WIRE_H, TileFlags::CONDUCTIVE | TileFlags::POWERED),
            Cell::new(
                RES_BASE + 4,
                TileFlags::ZONE_CENTER | TileFlags::CONDUCTIVE | TileFlags::IRRIGATED,
            ),
        ];
        for cell in cells {
            assert_eq!(unpack_cell(pack_cell(&cell)), cell);
        }
    }

    #[test]
    fn test_gather_captures_grid_and_scalars() {
        let mut world = test_world();
        world.resource_mut::<TileGrid>().set(
            10,
            20,
            ROADS,
            TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE,
        );
        world.resource_mut::<Census>().res_pop = 314;
        world.resource_mut::<CityBudget>().total_funds = 12_345;

        let save = gather_save_data(&world);
        assert_eq!(save.version, SAVE_FORMAT_VERSION);
        assert_eq!(save.width as usize, GRID_WIDTH);
        assert_eq!(save.height as usize, GRID_HEIGHT);
        assert_eq!(save.cells.len(), GRID_WIDTH * GRID_HEIGHT);
        assert_eq!(unpack_cell(save.cells[20 * GRID_WIDTH + 10]).tile_type, ROADS);
        assert_eq!(save.census.res_pop, 314);
        assert_eq!(save.budget.total_funds, 12_345);
        // Registered resources always land in the extension map.
        assert!(save.extensions.contains_key("sim_rng"));
        assert!(save.extensions.contains_key("scheduler"));
    }

    #[test]
    fn test_world_roundtrip_survives_encode_decode() {
        let mut source = test_world();
        {
            let mut grid = source.resource_mut::<TileGrid>();
            grid.set(5, 5, ROADS, TileFlags::BULLDOZABLE);
            grid.set(60, 50, WIRE_H, TileFlags::CONDUCTIVE | TileFlags::POWERED);
        }
        source.resource_mut::<Census>().res_pop = 880;
        source.resource_mut::<Census>().city_centre = (60, 50);
        source.resource_mut::<Valves>().res_valve = 600;
        source.resource_mut::<CityBudget>().total_funds = 7777;
        source.resource_mut::<CityBudget>().city_tax = 12;
        {
            let mut sim = source.resource_mut::<Simulation>();
            sim.city_time = 250;
            sim.sim_cycle = 300;
            sim.phase = 7;
        }

        let encoded = bitcode::encode(&gather_save_data(&source));
        let decoded: SaveData = bitcode::decode(&encoded).expect("decode should succeed");

        let mut target = test_world();
        apply_save_data(&mut target, decoded).expect("apply should succeed");

        let grid = target.resource::<TileGrid>();
        assert_eq!(grid.value(5, 5), ROADS);
        assert_eq!(grid.value(60, 50), WIRE_H);
        assert!(grid.get(60, 50).is_powered());
        assert_eq!(grid.value(0, 0), DIRT);

        assert_eq!(target.resource::<Census>().res_pop, 880);
        assert_eq!(target.resource::<Census>().city_centre, (60, 50));
        assert_eq!(target.resource::<Valves>().res_valve, 600);
        assert_eq!(target.resource::<CityBudget>().total_funds, 7777);
        assert_eq!(target.resource::<CityBudget>().city_tax, 12);

        let sim = target.resource::<Simulation>();
        assert_eq!(sim.city_time, 250);
        assert_eq!(sim.sim_cycle, 300);
        assert_eq!(sim.phase, 7);
    }

    #[test]
    fn test_rng_stream_resumes_after_roundtrip() {
        use simulation::random::SimRandom;

        let mut source = test_world();
        for _ in 0..137 {
            source.resource_mut::<SimRng>().0.get_random16();
        }
        let save = gather_save_data(&source);

        let mut target = test_world();
        apply_save_data(&mut target, save).expect("apply should succeed");

        let expected = source.resource_mut::<SimRng>().0.get_random16();
        let restored = target.resource_mut::<SimRng>().0.get_random16();
        assert_eq!(expected, restored);
    }

    #[test]
    fn test_apply_rejects_future_version() {
        let mut world = test_world();
        let mut save = gather_save_data(&world);
        save.version = SAVE_FORMAT_VERSION + 1;

        let err = apply_save_data(&mut world, save).unwrap_err();
        assert!(matches!(err, SaveError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_apply_rejects_wrong_dimensions() {
        let mut world = test_world();
        let mut save = gather_save_data(&world);
        save.width = 60;
        save.height = 50;
        save.cells.truncate(60 * 50);

        let err = apply_save_data(&mut world, save).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt { .. }));
        assert!(format!("{err}").contains("grid"), "got: {err}");
    }

    #[test]
    fn test_apply_rejects_truncated_cell_array() {
        let mut world = test_world();
        let mut save = gather_save_data(&world);
        save.cells.truncate(100);

        let err = apply_save_data(&mut world, save).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt { .. }));
        assert!(format!("{err}").contains("cell array"), "got: {err}");
    }

    #[test]
    fn test_apply_resets_overlays() {
        let source = test_world();
        let save = gather_save_data(&source);

        let mut target = test_world();
        target
            .resource_mut::<BlockMaps>()
            .traffic_density
            .world_set(30, 30, 200);

        apply_save_data(&mut target, save).expect("apply should succeed");
        assert_eq!(target.resource::<BlockMaps>().traffic_density.total(), 0);
    }

    #[test]
    fn test_missing_extension_key_resets_resource() {
        let source = test_world();
        let mut save = gather_save_data(&source);
        save.extensions.clear();

        let mut target = test_world();
        target.resource_mut::<Simulation>().city_time = 999;

        apply_save_data(&mut target, save).expect("apply should succeed");
        assert_eq!(target.resource::<Simulation>().city_time, 0);
    }
}

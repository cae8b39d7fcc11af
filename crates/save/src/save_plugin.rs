//! Save/load entry points and the event-driven plugin layer.
//!
//! `save_game`/`load_game`/`new_game` do the actual work against a `World`;
//! the plugin wires them to events so frontends can request them from
//! ordinary systems. All three run with exclusive world access, between
//! scheduler phases, so a save never observes a half-advanced cycle.

use std::path::{Path, PathBuf};

use bevy::prelude::*;

use simulation::block_maps::BlockMaps;
use simulation::budget::CityBudget;
use simulation::census::Census;
use simulation::grid::TileGrid;
use simulation::irrigation::WaterScan;
use simulation::power::PowerScan;
use simulation::valves::Valves;
use simulation::SaveableRegistry;

use crate::atomic_write::atomic_write;
use crate::file_header::{unpack_payload, unwrap_header, wrap_with_header};
use crate::save_data::{apply_save_data, gather_save_data, SaveData};
use crate::save_error::SaveError;

/// Save file location used when an event does not carry one.
pub fn default_save_path() -> PathBuf {
    PathBuf::from("gridpolis_save.bin")
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Event, Debug, Clone)]
pub struct SaveGameEvent {
    pub path: PathBuf,
}

impl Default for SaveGameEvent {
    fn default() -> Self {
        Self {
            path: default_save_path(),
        }
    }
}

#[derive(Event, Debug, Clone)]
pub struct LoadGameEvent {
    pub path: PathBuf,
}

impl Default for LoadGameEvent {
    fn default() -> Self {
        Self {
            path: default_save_path(),
        }
    }
}

#[derive(Event, Debug, Clone, Default)]
pub struct NewGameEvent;

// ---------------------------------------------------------------------------
// Core operations
// ---------------------------------------------------------------------------

/// Captures the world and writes it to `path` behind a checksummed header.
pub fn save_game(world: &World, path: &Path) -> Result<(), SaveError> {
    let save = gather_save_data(world);
    let encoded = bitcode::encode(&save);
    let bytes = wrap_with_header(&encoded);
    atomic_write(path, &bytes)?;
    info!("saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Reads `path` and replaces the world's simulation state with its contents.
///
/// The world is left untouched when the file is missing, corrupted, or from
/// a newer build.
pub fn load_game(world: &mut World, path: &Path) -> Result<(), SaveError> {
    let bytes = std::fs::read(path)?;
    let (header, payload) = unwrap_header(&bytes)?;
    let encoded = unpack_payload(&header, payload)?;
    let save: SaveData = bitcode::decode(&encoded)?;
    apply_save_data(world, save)?;
    info!("loaded city from {}", path.display());
    Ok(())
}

/// Resets the world to a fresh city. The difficulty level carries over.
pub fn new_game(world: &mut World) {
    world.insert_resource(TileGrid::default());
    world.insert_resource(Census::default());
    world.insert_resource(Valves::default());
    world.insert_resource(CityBudget::default());
    world.insert_resource(BlockMaps::default());
    world.insert_resource(PowerScan::default());
    world.insert_resource(WaterScan::default());
    world.resource_scope(|world, registry: Mut<SaveableRegistry>| {
        registry.reset_all(world);
    });
    info!("started a new city");
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveGameEvent>()
            .add_event::<LoadGameEvent>()
            .add_event::<NewGameEvent>()
            .add_systems(Update, process_requests);
    }
}

/// Drains the request queues and performs the work with exclusive world
/// access. Failures are logged and leave the world as it was.
fn process_requests(world: &mut World) {
    let saves: Vec<SaveGameEvent> = world
        .resource_mut::<Events<SaveGameEvent>>()
        .drain()
        .collect();
    let loads: Vec<LoadGameEvent> = world
        .resource_mut::<Events<LoadGameEvent>>()
        .drain()
        .collect();
    let new_games = world.resource_mut::<Events<NewGameEvent>>().drain().count();

    for event in saves {
        if let Err(e) = save_game(world, &event.path) {
            error!("save to {} failed: {e}", event.path.display());
        }
    }
    // When several load requests land in one frame only the last one wins.
    if let Some(event) = loads.into_iter().last() {
        if let Err(e) = load_game(world, &event.path) {
            error!("load from {} failed: {e}", event.path.display());
        }
    }
    if new_games > 0 {
        new_game(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::grid::TileFlags;
    use simulation::scheduler::Simulation;
    use simulation::tiles::{DIRT, ROADS};
    use simulation::SimulationPlugin;
    use std::fs;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridpolis_save_plugin_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins((SimulationPlugin, SavePlugin));
        app
    }

    #[test]
    fn test_save_event_writes_gpol_file() {
        let dir = test_dir("save_event");
        let path = dir.join("city.bin");

        let mut app = test_app();
        app.world_mut().resource_mut::<TileGrid>().set(
            10,
            10,
            ROADS,
            TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE,
        );
        app.world_mut().send_event(SaveGameEvent { path: path.clone() });
        app.update();

        let bytes = fs::read(&path).expect("save file should exist");
        assert_eq!(&bytes[..4], b"GPOL");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_then_load_roundtrip_via_events() {
        let dir = test_dir("event_roundtrip");
        let path = dir.join("city.bin");

        let mut source = test_app();
        source.world_mut().resource_mut::<TileGrid>().set(
            33,
            44,
            ROADS,
            TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE,
        );
        source.world_mut().resource_mut::<CityBudget>().total_funds = 4242;
        source.world_mut().resource_mut::<Simulation>().city_time = 96;
        source
            .world_mut()
            .send_event(SaveGameEvent { path: path.clone() });
        source.update();

        let mut target = test_app();
        target.world_mut().send_event(LoadGameEvent { path: path.clone() });
        target.update();

        assert_eq!(target.world().resource::<TileGrid>().value(33, 44), ROADS);
        assert_eq!(target.world().resource::<CityBudget>().total_funds, 4242);
        assert_eq!(target.world().resource::<Simulation>().city_time, 96);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_of_missing_file_keeps_state() {
        let dir = test_dir("missing_file");

        let mut app = test_app();
        app.world_mut().resource_mut::<CityBudget>().total_funds = 555;
        app.world_mut().send_event(LoadGameEvent {
            path: dir.join("does_not_exist.bin"),
        });
        app.update();

        assert_eq!(app.world().resource::<CityBudget>().total_funds, 555);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_new_game_event_resets_world() {
        let mut app = test_app();
        app.world_mut().resource_mut::<TileGrid>().set(
            5,
            5,
            ROADS,
            TileFlags::BULLDOZABLE,
        );
        app.world_mut().resource_mut::<CityBudget>().total_funds = 1;
        app.world_mut().resource_mut::<Simulation>().city_time = 777;

        app.world_mut().send_event(NewGameEvent);
        app.update();

        assert_eq!(app.world().resource::<TileGrid>().value(5, 5), DIRT);
        assert_eq!(app.world().resource::<CityBudget>().total_funds, 20_000);
        assert_eq!(app.world().resource::<Simulation>().city_time, 0);
        assert!(app.world().resource::<Simulation>().needs_initial_eval);
    }

    #[test]
    fn test_corrupted_file_rejected_and_state_kept() {
        let dir = test_dir("corrupted");
        let path = dir.join("city.bin");

        let mut app = test_app();
        save_game(app.world(), &path).expect("save should succeed");

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        app.world_mut().resource_mut::<CityBudget>().total_funds = 999;
        let err = load_game(app.world_mut(), &path).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt { .. }));
        assert_eq!(app.world().resource::<CityBudget>().total_funds, 999);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = test_dir("truncated");
        let path = dir.join("city.bin");

        let mut app = test_app();
        save_game(app.world(), &path).expect("save should succeed");

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..10]).unwrap();

        let err = load_game(app.world_mut(), &path).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_foreign_file_rejected() {
        let dir = test_dir("foreign");
        let path = dir.join("notes.txt");
        fs::write(&path, b"definitely not a city").unwrap();

        let mut app = test_app();
        let err = load_game(app.world_mut(), &path).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt { .. }));

        let _ = fs::remove_dir_all(&dir);
    }
}

//! Headless city-simulation core.
//!
//! The world is a tile grid plus a census, three demand valves, a budget,
//! and a set of coarse overlay maps. A 16-phase scheduler advances it:
//! phases 1-8 sweep the grid in vertical slices dispatching per-tile
//! handlers through the [`map_scanner::ScanRegistry`], and the remaining
//! phases run the aggregate passes (census, taxes, power, pollution, crime,
//! density, coverage, disasters) on per-speed cadences. Everything is a
//! plain Bevy resource driven from `FixedUpdate`; rendering and input live
//! in other crates.

use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod agriculture;
pub mod block_map;
pub mod block_maps;
pub mod budget;
pub mod census;
pub mod commercial;
pub mod config;
pub mod context;
pub mod coverage;
pub mod crime;
pub mod disasters;
pub mod evaluation;
pub mod grid;
pub mod industrial;
pub mod irrigation;
pub mod land_value;
pub mod map_scanner;
pub mod messages;
pub mod population_density;
pub mod power;
pub mod random;
pub mod repair;
pub mod residential;
pub mod roads;
pub mod scheduler;
pub mod services;
pub mod tiles;
pub mod traffic;
pub mod valves;
pub mod zones;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

// ---------------------------------------------------------------------------
// Saveable trait + registry for the extension map save pattern
// ---------------------------------------------------------------------------

/// Trait for resources persisted through the save file's extension map.
///
/// Each implementor carries its own serialization, so adding a saveable
/// resource never touches the save crate: the plugin registers it here and
/// the save system round-trips the registry blindly.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Key for this resource in the extension map. Must stay stable across
    /// versions; old saves look their data up by it.
    const SAVE_KEY: &'static str;

    /// Serialize to bytes, or `None` to skip the entry (e.g. default state).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Deserialize from bytes, returning the restored resource.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode via `bitcode::decode`, logging a warning and falling back to
/// `Default` on failure. The usual body of `Saveable::load_from_bytes`.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

/// Type alias for the save function stored in a `SaveableEntry`.
pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
/// Type alias for the load function stored in a `SaveableEntry`.
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;
/// Type alias for the reset function stored in a `SaveableEntry`.
pub type ResetFn = Box<dyn Fn(&mut World) + Send + Sync>;

/// Type-erased save/load/reset operations for one registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
    pub reset_fn: ResetFn,
}

/// Registry of all saveable resources, populated during plugin setup.
///
/// The save system iterates this to persist and restore extension entries
/// without knowing the individual resource types.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type that implements `Saveable`.
    ///
    /// Panics in debug builds if the `SAVE_KEY` is already taken; a silent
    /// duplicate would shadow another resource's data in the save file.
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!(
                "SaveableRegistry: duplicate key '{}', ignoring second registration",
                key
            );
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", key);
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                let value = T::load_from_bytes(bytes);
                world.insert_resource(value);
            }),
            reset_fn: Box::new(|world: &mut World| {
                world.insert_resource(T::default());
            }),
        });
    }

    /// Save all registered resources into an extension map.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut extensions = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                extensions.insert(entry.key.clone(), bytes);
            }
        }
        extensions
    }

    /// Load registered resources from an extension map. Resources whose key
    /// is absent keep their current state.
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = extensions.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }

    /// Reset all registered resources to their defaults (used by new-game).
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.reset_fn)(world);
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let mut saveables = SaveableRegistry::default();
        saveables.register::<random::SimRng>();
        saveables.register::<messages::MessageLog>();
        saveables.register::<disasters::DisasterState>();
        saveables.register::<scheduler::Simulation>();
        saveables.register::<evaluation::CityEvaluation>();

        app.insert_resource(saveables)
            .init_resource::<config::GameLevel>()
            .init_resource::<grid::TileGrid>()
            .init_resource::<random::SimRng>()
            .init_resource::<block_maps::BlockMaps>()
            .init_resource::<census::Census>()
            .init_resource::<valves::Valves>()
            .init_resource::<budget::CityBudget>()
            .init_resource::<messages::MessageLog>()
            .init_resource::<power::PowerScan>()
            .init_resource::<irrigation::WaterScan>()
            .init_resource::<repair::RepairRegistry>()
            .init_resource::<map_scanner::ScanRegistry>()
            .init_resource::<disasters::DisasterState>()
            .init_resource::<evaluation::CityEvaluation>()
            .init_resource::<scheduler::Simulation>()
            .add_systems(FixedUpdate, scheduler::tick_simulation);
    }
}

#[cfg(test)]
mod saveable_tests {
    use super::*;

    #[derive(Resource, Default, Debug, PartialEq)]
    struct TestCounter {
        value: u32,
    }

    impl Saveable for TestCounter {
        const SAVE_KEY: &'static str = "test_counter";

        fn save_to_bytes(&self) -> Option<Vec<u8>> {
            if self.value == 0 {
                None
            } else {
                Some(self.value.to_le_bytes().to_vec())
            }
        }

        fn load_from_bytes(bytes: &[u8]) -> Self {
            let value = u32::from_le_bytes(bytes.try_into().unwrap_or([0; 4]));
            TestCounter { value }
        }
    }

    #[test]
    fn test_registry_register_and_save() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 42 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let extensions = registry.save_all(&world);
        assert_eq!(extensions.len(), 1);
        assert!(extensions.contains_key("test_counter"));
        assert_eq!(extensions["test_counter"], 42u32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_registry_save_skips_default() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 0 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let extensions = registry.save_all(&world);
        assert!(extensions.is_empty(), "default state should be skipped");
    }

    #[test]
    fn test_registry_load_all() {
        let mut world = World::new();
        world.insert_resource(TestCounter::default());

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let mut extensions = BTreeMap::new();
        extensions.insert("test_counter".to_string(), 99u32.to_le_bytes().to_vec());

        registry.load_all(&mut world, &extensions);

        let counter = world.resource::<TestCounter>();
        assert_eq!(counter.value, 99);
    }

    #[test]
    fn test_registry_reset_all() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 999 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        registry.reset_all(&mut world);

        let counter = world.resource::<TestCounter>();
        assert_eq!(counter.value, 0);
    }

    #[test]
    fn test_registry_load_ignores_unknown_keys() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 5 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let mut extensions = BTreeMap::new();
        extensions.insert("unknown_feature".to_string(), vec![0xFF, 0xFF]);

        registry.load_all(&mut world, &extensions);

        // TestCounter's key was absent, so it keeps its current state.
        let counter = world.resource::<TestCounter>();
        assert_eq!(counter.value, 5);
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn test_registry_duplicate_key_panics_in_debug() {
        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();
        registry.register::<TestCounter>();
    }
}

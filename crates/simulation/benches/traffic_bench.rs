//! Criterion benchmarks for trip routing.
//!
//! Benchmarks:
//!   - one routing attempt from a zone at several road densities
//!   - the no-road fast path
//!   - the perimeter probe on its own
//!   - the raw drive walk and the per-cycle congestion decay
//!
//! Routing runs once per populated zone per cycle, so the attempt cost
//! scales directly with city size.
//!
//! Run with: cargo bench -p simulation --bench traffic_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use simulation::block_maps::{decay_traffic, BlockMaps};
use simulation::budget::CityBudget;
use simulation::census::Census;
use simulation::config::{GameLevel, GRID_HEIGHT, GRID_WIDTH};
use simulation::context::SimContext;
use simulation::disasters::DisasterState;
use simulation::grid::{TileFlags, TileGrid};
use simulation::irrigation::WaterScan;
use simulation::messages::MessageLog;
use simulation::power::PowerScan;
use simulation::repair::RepairRegistry;
use simulation::residential::Residential;
use simulation::tiles::{footprint_base, zone_center, DIRT, IND_BASE, RES_BASE, ROADS};
use simulation::traffic::{find_perimeter_road, make_traffic, try_drive};
use simulation::valves::Valves;
use simulation::zones::{zone_plop, ZoneFamily};

// ---------------------------------------------------------------------------
// Helpers: routing state and commuter maps
// ---------------------------------------------------------------------------

/// Owns everything a `SimContext` borrows.
struct RouteState {
    census: Census,
    valves: Valves,
    maps: BlockMaps,
    budget: CityBudget,
    messages: MessageLog,
    power: PowerScan,
    water: WaterScan,
    repair: RepairRegistry,
    disasters: DisasterState,
    rng: ChaCha8Rng,
}

impl RouteState {
    fn new() -> Self {
        Self {
            census: Census::default(),
            valves: Valves::default(),
            maps: BlockMaps::default(),
            budget: CityBudget::default(),
            messages: MessageLog::default(),
            power: PowerScan::default(),
            water: WaterScan::default(),
            repair: RepairRegistry::standard(),
            disasters: DisasterState::default(),
            rng: ChaCha8Rng::seed_from_u64(42),
        }
    }

    fn ctx(&mut self) -> SimContext<'_> {
        SimContext {
            census: &mut self.census,
            valves: &self.valves,
            maps: &mut self.maps,
            budget: &self.budget,
            rng: &mut self.rng,
            messages: &mut self.messages,
            power: &mut self.power,
            water: &mut self.water,
            repair: &self.repair,
            disasters: &mut self.disasters,
            city_time: 1,
            level: GameLevel::Medium,
        }
    }
}

/// A road grid at the given spacing, workplaces one block out from the
/// centre in each direction, and the probe home at `(60, 50)`.
fn build_commuter_map(spacing: usize) -> TileGrid {
    let mut grid = TileGrid::default();

    for y in (0..GRID_HEIGHT).step_by(spacing) {
        for x in 0..GRID_WIDTH {
            grid.set(x, y, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
        }
    }
    for x in (0..GRID_WIDTH).step_by(spacing) {
        for y in 0..GRID_HEIGHT {
            if grid.value(x, y) == DIRT {
                grid.set(x, y, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
            }
        }
    }

    for (zx, zy) in [(54, 46), (66, 46), (54, 54), (66, 54)] {
        zone_plop(
            &mut grid,
            zx,
            zy,
            footprint_base(zone_center(IND_BASE, 0, 0)),
        );
    }
    zone_plop(
        &mut grid,
        60,
        50,
        footprint_base(zone_center(RES_BASE, 0, 0)),
    );

    grid
}

// ---------------------------------------------------------------------------
// Benchmark: make_traffic
// ---------------------------------------------------------------------------

fn bench_route_attempts(c: &mut Criterion) {
    let mut group = c.benchmark_group("traffic_route");
    group.sample_size(100);

    for spacing in [4usize, 6, 8] {
        let grid = build_commuter_map(spacing);
        let mut state = RouteState::new();

        group.bench_with_input(
            BenchmarkId::new("commute_attempt", format!("spacing{spacing}")),
            &grid,
            |b, grid| {
                b.iter(|| {
                    let mut ctx = state.ctx();
                    black_box(make_traffic(
                        grid,
                        &mut ctx,
                        60,
                        50,
                        Residential::is_destination,
                    ));
                });
            },
        );
    }

    // A lone zone on bare dirt exits at the perimeter probe.
    let mut grid = TileGrid::default();
    zone_plop(
        &mut grid,
        60,
        50,
        footprint_base(zone_center(RES_BASE, 0, 0)),
    );
    let mut state = RouteState::new();
    group.bench_function("no_road_fast_path", |b| {
        b.iter(|| {
            let mut ctx = state.ctx();
            black_box(make_traffic(
                &grid,
                &mut ctx,
                60,
                50,
                Residential::is_destination,
            ));
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: probe and walk pieces
// ---------------------------------------------------------------------------

fn bench_route_pieces(c: &mut Criterion) {
    let mut group = c.benchmark_group("traffic_pieces");
    group.sample_size(200);

    let grid = build_commuter_map(4);
    let bare = TileGrid::default();

    group.bench_function("perimeter_probe_hit", |b| {
        b.iter(|| black_box(find_perimeter_road(&grid, black_box(60), black_box(50))));
    });

    group.bench_function("perimeter_probe_miss", |b| {
        b.iter(|| black_box(find_perimeter_road(&bare, black_box(60), black_box(50))));
    });

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut positions = Vec::new();
    group.bench_function("drive_walk", |b| {
        b.iter(|| {
            positions.clear();
            black_box(try_drive(
                &grid,
                &mut rng,
                60,
                48,
                Residential::is_destination,
                &mut positions,
            ));
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: congestion decay
// ---------------------------------------------------------------------------

fn bench_congestion_decay(c: &mut Criterion) {
    let mut group = c.benchmark_group("traffic_decay");
    group.sample_size(200);

    let mut maps = BlockMaps::default();
    for by in 0..maps.traffic_density.height {
        for bx in 0..maps.traffic_density.width {
            maps.traffic_density.set(bx, by, 240);
        }
    }

    group.bench_function("decay_saturated_map", |b| {
        b.iter(|| {
            decay_traffic(&mut maps.traffic_density);
            black_box(maps.traffic_density.get(0, 0));
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_route_attempts,
    bench_route_pieces,
    bench_congestion_decay
);
criterion_main!(benches);

//! Headless demo driver: a blocking synchronous loop around the simulation
//! and save plugins, no rendering or UI.
//!
//! Founds a starter town (or resumes one with `--load`), runs it at Fast
//! speed for a number of in-game years printing a yearly report card to
//! stdout, then writes a save file on the way out.

use std::path::PathBuf;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use save::{default_save_path, load_game, save_game, SavePlugin};
use simulation::budget::CityBudget;
use simulation::census::Census;
use simulation::config::{PHASE_COUNT, TIME_UNITS_PER_YEAR};
use simulation::disasters::DisasterState;
use simulation::evaluation::CityEvaluation;
use simulation::grid::{TileFlags, TileGrid};
use simulation::messages::MessageLog;
use simulation::random::SimRng;
use simulation::scheduler::{SimSpeed, Simulation};
use simulation::tiles::{
    AQUEDUCT_H, AQUEDUCT_V, COAL_PLANT, COM_BASE, FARM_BASE, FIRE_STATION, IND_BASE,
    POLICE_STATION, RES_BASE, ROADS, WATER_PUMP, WIRE_H, WIRE_V,
};
use simulation::zones::zone_plop;
use simulation::SimulationPlugin;

struct RunOptions {
    years: u64,
    seed: u64,
    load: Option<PathBuf>,
    save: PathBuf,
    disasters: bool,
}

fn main() {
    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            std::process::exit(2);
        }
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins((SimulationPlugin, SavePlugin));

    // One fixed tick per update, independent of wall-clock time.
    let step = app.world().resource::<Time<Fixed>>().timestep();
    app.insert_resource(TimeUpdateStrategy::ManualDuration(step));

    match &opts.load {
        Some(path) => {
            if let Err(e) = load_game(app.world_mut(), path) {
                eprintln!("cannot load {}: {e}", path.display());
                std::process::exit(1);
            }
            println!("resumed city from {}", path.display());
        }
        None => {
            app.insert_resource(SimRng::from_seed_u64(opts.seed));
            found_city(app.world_mut());
            println!("founded a new town (seed {})", opts.seed);
        }
    }
    app.world_mut().resource_mut::<Simulation>().speed = SimSpeed::Fast;
    app.world_mut().resource_mut::<DisasterState>().enabled = opts.disasters;

    // The first update starts the clock without firing a fixed tick.
    app.update();

    run_years(&mut app, opts.years);
    print_advisories(app.world());

    if let Err(e) = save_game(app.world(), &opts.save) {
        eprintln!("cannot save {}: {e}", opts.save.display());
        std::process::exit(1);
    }
    println!("saved city to {}", opts.save.display());
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

fn parse_args() -> Result<RunOptions, String> {
    let mut opts = RunOptions {
        years: 10,
        seed: 42,
        load: None,
        save: default_save_path(),
        disasters: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--years" => {
                opts.years = value(&mut args, "--years")?
                    .parse()
                    .map_err(|e| format!("--years: {e}"))?;
            }
            "--seed" => {
                opts.seed = value(&mut args, "--seed")?
                    .parse()
                    .map_err(|e| format!("--seed: {e}"))?;
            }
            "--load" => opts.load = Some(PathBuf::from(value(&mut args, "--load")?)),
            "--save" => opts.save = PathBuf::from(value(&mut args, "--save")?),
            "--disasters" => opts.disasters = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(opts)
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} needs a value"))
}

fn print_usage() {
    eprintln!(
        "usage: gridpolis [--years N] [--seed N] [--load PATH] [--save PATH] [--disasters]\n\
         \n\
         Runs the headless city simulation for N in-game years (default 10),\n\
         printing a yearly report card, then writes a save file on exit.\n\
         --load resumes from an existing save instead of founding a new town."
    );
}

// ---------------------------------------------------------------------------
// Starter town
// ---------------------------------------------------------------------------

/// Lays out a starter town around the map centre: a coal plant on a wire
/// ring feeding two rows of zones along a road spine, protection stations,
/// and a pair of farms on a pump-fed aqueduct run.
fn found_city(world: &mut World) {
    let mut grid = world.resource_mut::<TileGrid>();

    // Road spine with a southern spur down to the farm lane.
    for x in 40..=80 {
        grid.set(x, 50, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
    }
    for y in 50..=56 {
        grid.set(58, y, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
    }
    for x in 44..=58 {
        grid.set(x, 56, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);
    }

    // Wire ring main: both zone rows stay fed even where the spur cuts a run.
    for x in 38..=82 {
        grid.set(x, 46, WIRE_H, TileFlags::CONDUCTIVE | TileFlags::BULLDOZABLE);
        grid.set(x, 54, WIRE_H, TileFlags::CONDUCTIVE | TileFlags::BULLDOZABLE);
    }
    for y in 46..=54 {
        grid.set(38, y, WIRE_V, TileFlags::CONDUCTIVE | TileFlags::BULLDOZABLE);
        grid.set(82, y, WIRE_V, TileFlags::CONDUCTIVE | TileFlags::BULLDOZABLE);
    }
    // The spur crosses the southern run at (58, 54).
    grid.set(58, 54, ROADS, TileFlags::BULLDOZABLE | TileFlags::COMBUSTIBLE);

    stamp_building(&mut grid, 35, 44, COAL_PLANT, 4);
    stamp_building(&mut grid, 68, 44, FIRE_STATION, 3);
    stamp_building(&mut grid, 74, 44, POLICE_STATION, 3);

    for (x, base) in [
        (44, RES_BASE),
        (48, RES_BASE),
        (52, RES_BASE),
        (56, COM_BASE),
        (60, COM_BASE),
        (64, IND_BASE),
        (68, IND_BASE),
        (72, RES_BASE),
    ] {
        assert!(zone_plop(&mut grid, x, 48, base), "blocked footprint at ({x}, 48)");
    }
    for (x, base) in [
        (44, RES_BASE),
        (48, RES_BASE),
        (52, COM_BASE),
        (56, IND_BASE),
        (60, RES_BASE),
        (64, RES_BASE),
    ] {
        assert!(zone_plop(&mut grid, x, 52, base), "blocked footprint at ({x}, 52)");
    }

    // Farms south of the lane, spliced into the pump's aqueduct run through
    // one field cell each so the water walk can reach their centers.
    for x in [46, 52] {
        assert!(zone_plop(&mut grid, x, 58, FARM_BASE), "blocked footprint at ({x}, 58)");
        grid.set(x, 59, AQUEDUCT_V, TileFlags::BULLDOZABLE);
    }
    grid.set(46, 60, WATER_PUMP, TileFlags::BULLDOZABLE);
    for x in 47..=52 {
        grid.set(x, 60, AQUEDUCT_H, TileFlags::BULLDOZABLE);
    }
}

/// Writes a square building footprint row-major from its base code,
/// flagging the center cell.
fn stamp_building(grid: &mut TileGrid, x: usize, y: usize, center: u16, size: i32) {
    let mut code = center as i32 - 2 - size;
    for dy in -1..size - 1 {
        for dx in -1..size - 1 {
            code += 1;
            let Some((cx, cy)) = grid.offset(x, y, dx, dy) else {
                continue;
            };
            let mut flags =
                TileFlags::CONDUCTIVE | TileFlags::COMBUSTIBLE | TileFlags::BULLDOZABLE;
            if cx == x && cy == y {
                flags |= TileFlags::ZONE_CENTER;
            }
            grid.set(cx, cy, code as u16, flags);
        }
    }
}

// ---------------------------------------------------------------------------
// Run loop and reporting
// ---------------------------------------------------------------------------

/// Advances the simulation until `years` in-game years have passed, printing
/// the report card at every year boundary. At Fast speed one update is one
/// scheduler phase, so the tick bound below cannot be hit early.
fn run_years(app: &mut App, years: u64) {
    let start = app.world().resource::<Simulation>().year();
    let target = start + years;
    let mut last_report = start;
    let max_ticks = (years + 1) * TIME_UNITS_PER_YEAR * u64::from(PHASE_COUNT);
    for _ in 0..max_ticks {
        app.update();
        let year = app.world().resource::<Simulation>().year();
        if year > last_report {
            last_report = year;
            print_report(app.world());
        }
        if year >= target {
            break;
        }
    }
}

fn print_report(world: &World) {
    let sim = world.resource::<Simulation>();
    let census = world.resource::<Census>();
    let budget = world.resource::<CityBudget>();
    let eval = world.resource::<CityEvaluation>();
    println!(
        "year {:>3} | {:<11} pop {:>7} | res {:>5} com {:>4} ind {:>4} farm {:>3} | score {:>4} approval {:>3}% | funds {}",
        sim.year(),
        eval.city_class.name(),
        eval.city_population,
        census.res_pop,
        census.com_pop,
        census.ind_pop,
        census.farm_pop,
        eval.city_score,
        eval.approval,
        budget.total_funds,
    );
}

fn print_advisories(world: &World) {
    let log = world.resource::<MessageLog>();
    let entries = log.entries();
    let tail = &entries[entries.len().saturating_sub(5)..];
    if !tail.is_empty() {
        println!("latest advisories:");
    }
    for entry in tail {
        println!("  t={:<5} {:?}", entry.time, entry.message);
    }
}

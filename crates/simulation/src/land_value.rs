//! Pollution, terrain, and land-value survey.
//!
//! One pass recomputes three coupled overlays. Raw per-block pollution is
//! summed from tile emissions, double-smoothed, and published together with
//! its city-wide average and hotspot. Natural terrain is tallied into the
//! coarser terrain map. Land value is scored per developed block from
//! centrality, terrain, and the previous pollution and crime readings, so
//! the surveys deliberately feed each other across cycles rather than
//! within one.

use rand::RngCore;

use crate::block_map::{smooth, BlockMap};
use crate::block_maps::BlockMaps;
use crate::census::Census;
use crate::grid::TileGrid;
use crate::random::SimRandom;
use crate::tiles::{is_natural, pollution_value, DIRT, ROAD_BASE};

// Land value of a developed block stays inside this band; zero is reserved
// for undeveloped blocks.
const LAND_VALUE_MIN: i16 = 1;
const LAND_VALUE_MAX: i16 = 250;

/// Terrain credit per natural tile.
const TERRAIN_UNIT: i16 = 15;

/// Per-block pollution sums saturate here before smoothing.
const POLLUTION_RAW_CAP: i32 = 255;

/// Manhattan distance to the city centre, capped the way every centrality
/// score expects.
pub fn city_centre_distance(census: &Census, x: usize, y: usize) -> i16 {
    let (cx, cy) = census.city_centre;
    (x.abs_diff(cx) + y.abs_diff(cy)).min(64) as i16
}

/// Full pollution/terrain/land-value recompute.
pub fn pollution_terrain_land_value_scan(
    grid: &TileGrid,
    maps: &mut BlockMaps,
    census: &mut Census,
    rng: &mut dyn RngCore,
) {
    let mut raw_pollution = BlockMap::new(maps.pollution_density.block_size);
    let mut raw_terrain = BlockMap::new(maps.terrain_density.block_size);

    let mut land_value_total: i64 = 0;
    let mut developed_blocks: i64 = 0;

    for by in 0..maps.land_value.height {
        for bx in 0..maps.land_value.width {
            let world_x = bx * 2;
            let world_y = by * 2;
            let mut pollution: i32 = 0;
            let mut developed = false;

            for y in world_y..world_y + 2 {
                for x in world_x..world_x + 2 {
                    if !grid.in_bounds(x, y) {
                        continue;
                    }
                    let value = grid.value(x, y);
                    if value == DIRT {
                        continue;
                    }
                    if is_natural(value) {
                        let credit = raw_terrain.world_get(x, y) + TERRAIN_UNIT;
                        raw_terrain.world_set(x, y, credit);
                        continue;
                    }
                    pollution += pollution_value(value) as i32;
                    if value >= ROAD_BASE {
                        developed = true;
                    }
                }
            }
            raw_pollution.set(bx, by, pollution.min(POLLUTION_RAW_CAP) as i16);

            if developed {
                let mut score = (34 - city_centre_distance(census, world_x, world_y) / 2) * 4;
                score += maps.terrain_density.get(bx / 2, by / 2);
                score -= maps.pollution_density.get(bx, by);
                if maps.crime_rate.get(bx, by) > 190 {
                    score -= 20;
                }
                let score = score.clamp(LAND_VALUE_MIN, LAND_VALUE_MAX);
                maps.land_value.set(bx, by, score);
                land_value_total += score as i64;
                developed_blocks += 1;
            } else {
                maps.land_value.set(bx, by, 0);
            }
        }
    }

    census.land_value_average = if developed_blocks > 0 {
        (land_value_total / developed_blocks) as i16
    } else {
        0
    };

    publish_pollution(maps, census, rng, &raw_pollution);
    maps.terrain_density = smooth(&raw_terrain);
}

/// Double-smooths the raw emissions into the published density map and
/// records the average and the hotspot the monster roll targets. Ties for
/// the hotspot move with a one-in-four chance so it wanders between equally
/// dirty districts.
fn publish_pollution(
    maps: &mut BlockMaps,
    census: &mut Census,
    rng: &mut dyn RngCore,
    raw: &BlockMap,
) {
    let smoothed = smooth(&smooth(raw));

    let mut total: i64 = 0;
    let mut polluted_blocks: i64 = 0;
    let mut max_level: i16 = 0;
    for by in 0..smoothed.height {
        for bx in 0..smoothed.width {
            let level = smoothed.get(bx, by);
            maps.pollution_density.set(bx, by, level);
            if level == 0 {
                continue;
            }
            total += level as i64;
            polluted_blocks += 1;
            if level > max_level || (level == max_level && rng.get_chance(3)) {
                max_level = level;
                census.pollution_max = (bx * smoothed.block_size, by * smoothed.block_size);
            }
        }
    }
    census.pollution_average = if polluted_blocks > 0 {
        (total / polluted_blocks) as i16
    } else {
        0
    };
}

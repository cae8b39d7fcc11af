//! Crime survey.
//!
//! Crime rises where land value is low and people are packed in, and falls
//! under police coverage. Undeveloped blocks carry no crime at all. The
//! pass also records the city-wide average and the worst block.

use crate::block_maps::BlockMaps;
use crate::census::Census;

/// Crime gathered from land value and crowding saturates here before
/// coverage is subtracted.
const CRIME_PRESSURE_CAP: i32 = 300;

const CRIME_MAX: i16 = 250;

pub fn crime_scan(maps: &mut BlockMaps, census: &mut Census) {
    let mut total: i64 = 0;
    let mut scored_blocks: i64 = 0;
    let mut worst: i16 = 0;

    for by in 0..maps.crime_rate.height {
        for bx in 0..maps.crime_rate.width {
            let land = maps.land_value.get(bx, by);
            if land == 0 {
                maps.crime_rate.set(bx, by, 0);
                continue;
            }
            let world_x = bx * maps.crime_rate.block_size;
            let world_y = by * maps.crime_rate.block_size;

            let mut pressure = 128 - land as i32;
            pressure += maps.population_density.get(bx, by) as i32;
            pressure = pressure.min(CRIME_PRESSURE_CAP);
            pressure -= maps.police_station_effect.world_get(world_x, world_y) as i32;
            let rate = pressure.clamp(0, CRIME_MAX as i32) as i16;

            maps.crime_rate.set(bx, by, rate);
            total += rate as i64;
            scored_blocks += 1;
            if rate > worst {
                worst = rate;
                census.crime_max = (world_x, world_y);
            }
        }
    }

    census.crime_average = if scored_blocks > 0 {
        (total / scored_blocks) as i16
    } else {
        0
    };
}

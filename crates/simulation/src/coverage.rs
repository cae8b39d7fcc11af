//! Protection-coverage smoothing.
//!
//! Station handlers accumulate budget-scaled strength into the raw station
//! maps during the scan; this pass triple-smooths those accumulations into
//! the effect maps that fire burn-out and the crime survey read. The raw
//! maps are cleared with the census at the top of each cycle, so coverage
//! always reflects the latest scan's stations.

use crate::block_map::smooth;
use crate::block_maps::BlockMaps;

pub fn service_coverage_scan(maps: &mut BlockMaps) {
    maps.fire_station_effect = smooth(&smooth(&smooth(&maps.fire_station)));
    maps.police_station_effect = smooth(&smooth(&smooth(&maps.police_station)));
}

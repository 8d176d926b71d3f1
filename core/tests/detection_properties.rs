//! End-to-end behavior of the detection pass and the intercept planner on
//! hand-built scans.

use chrono::{TimeZone, Utc};
use stormcore::math::geo::bearing_difference;
use stormcore::math::GeoMath;
use stormcore::processing::{
    plan_intercept, CellSegmenter, CellTracker, FixedEstimator, SeededEstimator, StormDetector,
    TrackerConfig,
};
use stormcore::radar_interface::{
    Grid, GridGeometry, HazardAttributes, ObserverState, ProductKind, ScanMetadata, StormCell,
};
use stormcore::DetectionConfig;

fn scan(cells: Vec<Vec<Option<f32>>>, minute: u32) -> Grid {
    let metadata = ScanMetadata {
        station_id: "KTLX".into(),
        product_kind: ProductKind::Reflectivity,
        captured_at: Utc.with_ymd_and_hms(2024, 5, 20, 21, minute, 0).unwrap(),
        origin_lat: 35.3331,
        origin_lon: -97.2778,
    };
    Grid::new(metadata, cells, GridGeometry::default()).unwrap()
}

fn block(cells: &mut [Vec<Option<f32>>], top: usize, left: usize, side: usize, value: f32) {
    for row in cells.iter_mut().skip(top).take(side) {
        for cell in row.iter_mut().skip(left).take(side) {
            *cell = Some(value);
        }
    }
}

fn fixed_detector() -> StormDetector {
    StormDetector::new(
        DetectionConfig::default(),
        Box::new(FixedEstimator::default()),
    )
    .unwrap()
}

#[test]
fn sub_threshold_scan_yields_nothing() {
    let grid = scan(vec![vec![Some(35.0); 40]; 40], 0);
    let segmenter = CellSegmenter::new(DetectionConfig::default());
    assert!(segmenter.segment(&grid).is_empty());
    assert!(fixed_detector().detect(&grid).is_empty());
}

#[test]
fn all_no_data_scan_yields_nothing() {
    let grid = scan(vec![vec![None; 64]; 48], 0);
    assert!(fixed_detector().detect(&grid).is_empty());
}

#[test]
fn single_block_is_one_cell_at_its_center() {
    for side in 4..=8 {
        let mut cells = vec![vec![None; 40]; 40];
        block(&mut cells, 12, 17, side, 54.0);
        let grid = scan(cells, 0);
        let detected = fixed_detector().detect(&grid);
        assert_eq!(detected.len(), 1, "side {}", side);
        assert_eq!(detected[0].intensity, 54);

        let center_row = 12.0 + (side as f64 - 1.0) / 2.0;
        let center_col = 17.0 + (side as f64 - 1.0) / 2.0;
        let expected = grid.cell_to_geo(center_row, center_col);
        let unit = GridGeometry::default();
        assert!((detected[0].latitude - expected.latitude).abs() <= unit.unit_lat);
        assert!((detected[0].longitude - expected.longitude).abs() <= unit.unit_lon);
    }
}

#[test]
fn gap_keeps_blocks_apart_and_corner_contact_merges_them() {
    let mut apart = vec![vec![None; 30]; 30];
    block(&mut apart, 5, 5, 4, 50.0);
    block(&mut apart, 10, 10, 4, 50.0);
    assert_eq!(fixed_detector().detect(&scan(apart, 0)).len(), 2);

    let mut touching = vec![vec![None; 30]; 30];
    block(&mut touching, 5, 5, 4, 50.0);
    block(&mut touching, 9, 9, 4, 50.0);
    let merged = fixed_detector().detect(&scan(touching, 0));
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].pixel_count, 32);
}

#[test]
fn seeded_passes_respect_attribute_invariants() {
    let mut cells = vec![vec![None; 60]; 60];
    block(&mut cells, 3, 3, 6, 72.0);
    block(&mut cells, 20, 30, 5, 41.0);
    block(&mut cells, 45, 10, 7, 58.0);
    let grid = scan(cells, 0);
    let detector =
        StormDetector::new(DetectionConfig::default(), Box::new(SeededEstimator::new(42))).unwrap();

    let first = detector.detect(&grid);
    let second = detector.detect(&grid);
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|cell| cell.id.as_str()).collect::<Vec<_>>(),
        vec!["CELL-1", "CELL-2", "CELL-3"]
    );
    for cell in &first {
        assert!(cell.hail_probability <= 100);
        assert!(cell.movement_bearing >= 0.0 && cell.movement_bearing < 360.0);
    }
    assert_eq!(first[0].hail_probability, 80);
    assert_eq!(first[1].hail_probability, 3);
}

#[test]
fn detected_cells_serialize_as_plain_records() {
    let mut cells = vec![vec![None; 20]; 20];
    block(&mut cells, 4, 4, 5, 60.0);
    let detected = fixed_detector().detect(&scan(cells, 0));
    let value = serde_json::to_value(&detected).unwrap();
    assert_eq!(value[0]["id"], "CELL-1");
    assert_eq!(value[0]["intensity"], 60);
    assert_eq!(value[0]["hail_probability"], 50);
    assert!(value[0]["detected_at"].is_string());
}

#[test]
fn projection_round_trips_for_short_hops() {
    for bearing in [0.0, 15.0, 89.0, 180.0, 271.0, 300.5] {
        for distance in [0.5, 5.0, 40.0] {
            let (lat, lon) = GeoMath::project(35.0, -97.5, bearing, distance);
            let recovered = GeoMath::bearing(35.0, -97.5, lat, lon);
            assert!(bearing_difference(recovered, bearing) < 1e-6);
        }
    }
}

fn storm(lat: f64, lon: f64, speed: f64, bearing: f64) -> StormCell {
    StormCell::new(
        "CELL-1".into(),
        stormcore::math::GeoPoint::new(lat, lon),
        60,
        30,
        HazardAttributes {
            movement_speed: speed,
            movement_bearing: bearing,
            ..Default::default()
        },
        Utc.with_ymd_and_hms(2024, 5, 20, 21, 0, 0).unwrap(),
    )
}

#[test]
fn approaching_storm_is_reachable_within_a_few_steps() {
    let observer = ObserverState::new(35.0, -97.5, 60.0);
    let result = plan_intercept(&observer, &storm(35.1, -97.5, 30.0, 180.0), 120.0, 5.0)
        .expect("approaching storm should be interceptable");
    assert!(result.time_to_intercept <= 20.0);
    assert!(result.travel_time <= result.time_to_intercept);
}

#[test]
fn receding_storm_faster_than_observer_is_unreachable() {
    let observer = ObserverState::new(35.0, -97.5, 60.0);
    let cell = storm(35.1, -97.5, 75.0, 0.0);
    for horizon in [60.0, 120.0, 480.0] {
        assert!(plan_intercept(&observer, &cell, horizon, 5.0).is_none());
    }
}

#[test]
fn tracker_links_consecutive_passes() {
    let mut tracker = CellTracker::new(TrackerConfig::default());
    let detector = fixed_detector();

    let mut first = vec![vec![None; 40]; 40];
    block(&mut first, 10, 10, 5, 55.0);
    let mut second = vec![vec![None; 40]; 40];
    block(&mut second, 10, 13, 5, 56.0);

    let a = tracker.update(&detector.detect(&scan(first, 0)));
    let b = tracker.update(&detector.detect(&scan(second, 5)));
    assert_eq!(a[0].id, b[0].id);
    // Three columns east at 0.01 deg per column is roughly 1.7 miles in 5 minutes.
    assert!(b[0].movement_speed > 15.0 && b[0].movement_speed < 25.0);
    assert!(bearing_difference(b[0].movement_bearing, 90.0) < 1.0);
}

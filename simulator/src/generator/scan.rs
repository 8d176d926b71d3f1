use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use stormcore::radar_interface::{Grid, GridGeometry, ProductKind, ScanMetadata};

const STORM_RADIUS: f64 = 15.0;
const COUPLET_RADIUS: f64 = 10.0;
const COUPLET_PEAK: f64 = 30.0;
const DISPLAY_FLOOR: i32 = 15;
const MAX_DBZ: i32 = 75;

const MAX_SCAN_CELLS: usize = 1_000_000;
const MAX_STORMS: usize = 50;
const MAX_NOISE: i32 = 20;
const MAX_DRIFT: f64 = 10.0;
const MAX_SCAN_INTERVAL_MINUTES: i64 = 24 * 60;

/// Configuration for generating synthetic radar scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub station_id: String,
    pub origin_lat: f64,
    pub origin_lon: f64,
    /// Rows and columns of the square scan.
    pub size: usize,
    pub geometry: GridGeometry,
    pub seed: u64,
    /// Storms to place; drawn from 2..=5 when unset.
    pub storm_count: Option<usize>,
    /// Storms carrying a velocity couplet; drawn from 1..=3 when unset.
    pub couplet_count: Option<usize>,
    /// Largest drift of a storm centre, in cells per scan along each axis.
    pub max_drift: f64,
    pub noise: i32,
    pub scan_interval_minutes: i64,
    /// Capture time of the first scan; the current time when unset.
    pub start: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub scenario: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            station_id: "KTLX".into(),
            origin_lat: 35.3331,
            origin_lon: -97.2778,
            size: 100,
            geometry: GridGeometry::default(),
            seed: 0,
            storm_count: None,
            couplet_count: None,
            max_drift: 1.0,
            noise: 5,
            scan_interval_minutes: 5,
            start: None,
            description: None,
            scenario: None,
        }
    }
}

impl GeneratorConfig {
    /// Rejects settings the generator cannot turn into a bounded scan.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.size > 0, "generator size must be positive");
        let cell_count = self
            .size
            .checked_mul(self.size)
            .context("overflow computing cell count for generator")?;
        anyhow::ensure!(
            cell_count <= MAX_SCAN_CELLS,
            "generator size {} exceeds {} cells",
            self.size,
            MAX_SCAN_CELLS
        );
        for (name, count) in [
            ("storm_count", self.storm_count),
            ("couplet_count", self.couplet_count),
        ] {
            if let Some(count) = count {
                anyhow::ensure!(count <= MAX_STORMS, "{} {} exceeds {}", name, count, MAX_STORMS);
            }
        }
        anyhow::ensure!(
            (0..=MAX_NOISE).contains(&self.noise),
            "noise must be within 0..={}, got {}",
            MAX_NOISE,
            self.noise
        );
        anyhow::ensure!(
            self.max_drift.is_finite() && self.max_drift.abs() <= MAX_DRIFT,
            "max_drift must be finite and at most {}, got {}",
            MAX_DRIFT,
            self.max_drift
        );
        anyhow::ensure!(
            (1..=MAX_SCAN_INTERVAL_MINUTES).contains(&self.scan_interval_minutes),
            "scan interval must be within 1..={} minutes, got {}",
            MAX_SCAN_INTERVAL_MINUTES,
            self.scan_interval_minutes
        );
        Ok(())
    }

    fn normalized_size(&self) -> usize {
        self.size.max(1)
    }
}

#[derive(Debug, Clone)]
struct SimulatedStorm {
    row: f64,
    col: f64,
    peak: f64,
    drift_rows: f64,
    drift_cols: f64,
    rotating: bool,
}

impl SimulatedStorm {
    fn center_at(&self, scan_index: usize) -> (f64, f64) {
        let steps = scan_index as f64;
        (
            self.row + self.drift_rows * steps,
            self.col + self.drift_cols * steps,
        )
    }
}

/// A reflectivity scan and the velocity scan captured alongside it.
#[derive(Debug, Clone)]
pub struct ScanPair {
    pub reflectivity: Grid,
    pub velocity: Grid,
}

/// Seeded source of drifting storm scans.
pub struct ScanGenerator {
    config: GeneratorConfig,
    storms: Vec<SimulatedStorm>,
    rng: StdRng,
    start: DateTime<Utc>,
    next_index: usize,
}

impl ScanGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let size = config.normalized_size() as f64;
        let storm_count = config.storm_count.unwrap_or_else(|| rng.gen_range(2..=5));
        let couplet_count = config
            .couplet_count
            .unwrap_or_else(|| rng.gen_range(1..=3))
            .min(storm_count);
        let drift = config.max_drift.abs();

        let storms = (0..storm_count)
            .map(|index| SimulatedStorm {
                row: rng.gen_range(size * 0.2..=size * 0.8).round(),
                col: rng.gen_range(size * 0.2..=size * 0.8).round(),
                peak: f64::from(rng.gen_range(35..=70)),
                drift_rows: if drift > 0.0 { rng.gen_range(-drift..=drift) } else { 0.0 },
                drift_cols: if drift > 0.0 { rng.gen_range(-drift..=drift) } else { 0.0 },
                rotating: index < couplet_count,
            })
            .collect();

        let start = config.start.unwrap_or_else(Utc::now);
        Self {
            config,
            storms,
            rng,
            start,
            next_index: 0,
        }
    }

    pub fn storm_count(&self) -> usize {
        self.storms.len()
    }

    /// Produces the next scan pair, advancing every storm along its drift.
    pub fn next_scan(&mut self) -> anyhow::Result<ScanPair> {
        let index = self.next_index;
        self.next_index += 1;
        let captured_at = self.start + Duration::minutes(self.config.scan_interval_minutes * index as i64);

        let reflectivity = self.reflectivity_cells(index);
        let velocity = self.velocity_cells(index);

        Ok(ScanPair {
            reflectivity: self
                .grid(ProductKind::Reflectivity, captured_at, reflectivity)
                .with_context(|| format!("building reflectivity scan {}", index))?,
            velocity: self
                .grid(ProductKind::Velocity, captured_at, velocity)
                .with_context(|| format!("building velocity scan {}", index))?,
        })
    }

    fn grid(
        &self,
        product_kind: ProductKind,
        captured_at: DateTime<Utc>,
        cells: Vec<Vec<Option<f32>>>,
    ) -> anyhow::Result<Grid> {
        let metadata = ScanMetadata {
            station_id: self.config.station_id.clone(),
            product_kind,
            captured_at,
            origin_lat: self.config.origin_lat,
            origin_lon: self.config.origin_lon,
        };
        Ok(Grid::new(metadata, cells, self.config.geometry)?)
    }

    fn reflectivity_cells(&mut self, scan_index: usize) -> Vec<Vec<Option<f32>>> {
        let size = self.config.normalized_size();
        let noise = self.config.noise.abs();
        let mut cells = vec![vec![None; size]; size];

        for storm in &self.storms {
            let (cy, cx) = storm.center_at(scan_index);
            for_each_within(size, cy, cx, STORM_RADIUS, |row, col, dist| {
                let jitter = self.rng.gen_range(-noise..=noise);
                let value = (storm.peak * (1.0 - dist / STORM_RADIUS)) as i32 + jitter;
                if value > DISPLAY_FLOOR {
                    let value = value.clamp(0, MAX_DBZ) as f32;
                    let cell = &mut cells[row][col];
                    *cell = Some(cell.map_or(value, |existing: f32| existing.max(value)));
                }
            });
        }
        cells
    }

    fn velocity_cells(&self, scan_index: usize) -> Vec<Vec<Option<f32>>> {
        let size = self.config.normalized_size();
        let mut cells = vec![vec![None; size]; size];

        for storm in self.storms.iter().filter(|storm| storm.rotating) {
            let (cy, cx) = storm.center_at(scan_index);
            let center_col = cx.round();
            for_each_within(size, cy, cx, COUPLET_RADIUS, |row, col, dist| {
                // Inbound west of the centre, outbound at and east of it.
                let sign = if (col as f64) < center_col { -1.0 } else { 1.0 };
                let velocity = (sign * COUPLET_PEAK * (1.0 - dist / COUPLET_RADIUS)) as i32;
                cells[row][col] = Some(velocity as f32);
            });
        }
        cells
    }
}

/// Visits every in-bounds cell strictly closer than `radius` to the centre.
fn for_each_within<F>(size: usize, cy: f64, cx: f64, radius: f64, mut visit: F)
where
    F: FnMut(usize, usize, f64),
{
    let (cy, cx) = (cy.round(), cx.round());
    let row_start = (cy - radius).max(0.0) as usize;
    let row_end = (cy + radius).min(size as f64).max(0.0) as usize;
    let col_start = (cx - radius).max(0.0) as usize;
    let col_end = (cx + radius).min(size as f64).max(0.0) as usize;

    for row in row_start..row_end {
        for col in col_start..col_end {
            let dist = (row as f64 - cy).hypot(col as f64 - cx);
            if dist < radius {
                visit(row, col, dist);
            }
        }
    }
}

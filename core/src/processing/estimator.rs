//! Attribute estimators fill in the motion and hazard fields of a storm cell
//! that a reflectivity scan alone cannot provide.
//!
//! The classifier never draws random numbers itself; whichever estimator is
//! configured is the single source of those attributes for a pass.

use crate::math::geo::METERS_PER_MILE;
use crate::math::GeoMath;
use crate::processing::segmenter::Region;
use crate::radar_interface::{Grid, HazardAttributes, ProductKind};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Everything an estimator may consult about one region.
pub struct CellContext<'a> {
    /// Zero-based position of the region in discovery order.
    pub index: usize,
    pub region: &'a Region,
    pub grid: &'a Grid,
}

/// Strategy producing the motion and hazard attributes of a cell.
pub trait AttributeEstimator: Send + Sync {
    fn name(&self) -> &'static str;
    fn estimate(&self, context: &CellContext<'_>) -> HazardAttributes;
}

/// Returns the same attributes for every cell.
#[derive(Debug, Clone, Default)]
pub struct FixedEstimator {
    attributes: HazardAttributes,
}

impl FixedEstimator {
    pub fn new(attributes: HazardAttributes) -> Self {
        Self { attributes }
    }
}

impl AttributeEstimator for FixedEstimator {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn estimate(&self, _context: &CellContext<'_>) -> HazardAttributes {
        self.attributes.clone()
    }
}

/// Placeholder attributes drawn from intensity-gated distributions.
///
/// Each cell gets its own generator derived from the seed and the cell
/// index, so a given seed reproduces the same attributes for the same grid.
#[derive(Debug, Clone)]
pub struct SeededEstimator {
    seed: u64,
}

impl SeededEstimator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, index: usize) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

impl AttributeEstimator for SeededEstimator {
    fn name(&self) -> &'static str {
        "seeded"
    }

    fn estimate(&self, context: &CellContext<'_>) -> HazardAttributes {
        let mut rng = self.rng_for(context.index);
        let peak = context.region.peak_intensity();

        let movement_speed = rng.gen_range(20.0..=45.0);
        let movement_bearing = f64::from(rng.gen_range(0_u16..=359));

        // Rotation is not gated on intensity; echo tops and hail size are.
        let has_rotation = rng.gen_bool(0.2);
        let tvs = has_rotation && rng.gen_bool(0.3);
        let meso = has_rotation && rng.gen_bool(0.5);
        let top_height = (peak > 50.0).then(|| rng.gen_range(35_000..=55_000));
        let rotation_strength = has_rotation.then(|| rng.gen_range(0.005..=0.015));
        let max_hail_size =
            (peak > 55.0).then(|| (rng.gen_range(0.5_f64..=2.5) * 10.0).round() / 10.0);

        HazardAttributes {
            movement_speed,
            movement_bearing,
            top_height,
            has_rotation,
            rotation_strength,
            max_hail_size,
            tvs,
            meso,
        }
    }
}

/// Thresholds for couplet detection in a velocity scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CoupletThresholds {
    /// Minimum outbound-minus-inbound differential, m/s.
    pub rotation_delta: f32,
    /// Differential for a tornado vortex signature, m/s.
    pub tvs_delta: f32,
    /// Maximum cell separation of the couplet extremes for a TVS.
    pub tvs_max_gates: usize,
    /// Azimuthal shear for a mesocyclone, s^-1.
    pub meso_shear: f64,
}

impl Default for CoupletThresholds {
    fn default() -> Self {
        Self {
            rotation_delta: 30.0,
            tvs_delta: 45.0,
            tvs_max_gates: 2,
            meso_shear: 0.01,
        }
    }
}

/// Derives rotation from a velocity scan paired with the reflectivity scan.
///
/// Motion, echo tops and hail size come from the wrapped fallback.
pub struct VelocityEstimator {
    velocity: Grid,
    thresholds: CoupletThresholds,
    fallback: Box<dyn AttributeEstimator>,
}

impl VelocityEstimator {
    pub fn new(
        velocity: Grid,
        thresholds: CoupletThresholds,
        fallback: Box<dyn AttributeEstimator>,
    ) -> Self {
        Self {
            velocity,
            thresholds,
            fallback,
        }
    }

    /// Strongest outbound and inbound gates within the region.
    fn extremes(&self, region: &Region) -> Option<((usize, usize, f32), (usize, usize, f32))> {
        let mut outbound: Option<(usize, usize, f32)> = None;
        let mut inbound: Option<(usize, usize, f32)> = None;

        for &(row, col) in region.pixels() {
            let Some(value) = self.velocity.intensity(row, col) else {
                continue;
            };
            if value > 0.0 && outbound.map_or(true, |(_, _, best)| value > best) {
                outbound = Some((row, col, value));
            }
            if value < 0.0 && inbound.map_or(true, |(_, _, best)| value < best) {
                inbound = Some((row, col, value));
            }
        }
        outbound.zip(inbound)
    }

    fn cell_size_meters(&self) -> f64 {
        let a = self.velocity.cell_to_geo(0.0, 0.0);
        let b = self.velocity.cell_to_geo(1.0, 0.0);
        GeoMath::distance_between(a, b) * METERS_PER_MILE
    }
}

impl AttributeEstimator for VelocityEstimator {
    fn name(&self) -> &'static str {
        "velocity"
    }

    fn estimate(&self, context: &CellContext<'_>) -> HazardAttributes {
        if self.velocity.product_kind() != ProductKind::Velocity
            || !self.velocity.same_shape(context.grid)
        {
            log::warn!(
                "velocity scan for {} does not pair with {}x{} reflectivity grid, using {} attributes",
                context.grid.station_id(),
                context.grid.rows(),
                context.grid.cols(),
                self.fallback.name()
            );
            return self.fallback.estimate(context);
        }

        let mut attributes = self.fallback.estimate(context);
        attributes.has_rotation = false;
        attributes.rotation_strength = None;
        attributes.tvs = false;
        attributes.meso = false;

        let Some(((out_row, out_col, out_v), (in_row, in_col, in_v))) =
            self.extremes(context.region)
        else {
            return attributes;
        };

        let delta = out_v - in_v;
        if delta < self.thresholds.rotation_delta {
            return attributes;
        }

        let separation = GeoMath::distance_between(
            self.velocity.cell_to_geo(out_row as f64, out_col as f64),
            self.velocity.cell_to_geo(in_row as f64, in_col as f64),
        ) * METERS_PER_MILE;
        let strength = f64::from(delta) / separation.max(self.cell_size_meters());
        let gates = out_row.abs_diff(in_row).max(out_col.abs_diff(in_col));

        attributes.has_rotation = true;
        attributes.rotation_strength = Some(strength);
        attributes.meso = strength >= self.thresholds.meso_shear;
        attributes.tvs =
            delta >= self.thresholds.tvs_delta && gates <= self.thresholds.tvs_max_gates;
        attributes
    }
}

/// Estimator selection as it appears in configuration files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    Fixed,
    Seeded { seed: u64 },
    Velocity { seed: Option<u64> },
}

/// Builds the configured estimator. A velocity estimator without a paired
/// velocity scan degrades to its fallback.
pub fn build_estimator(
    kind: &EstimatorKind,
    velocity: Option<Grid>,
    thresholds: CoupletThresholds,
) -> Box<dyn AttributeEstimator> {
    match kind {
        EstimatorKind::Fixed => Box::new(FixedEstimator::default()),
        EstimatorKind::Seeded { seed } => Box::new(SeededEstimator::new(*seed)),
        EstimatorKind::Velocity { seed } => {
            let fallback: Box<dyn AttributeEstimator> = match seed {
                Some(seed) => Box::new(SeededEstimator::new(*seed)),
                None => Box::new(FixedEstimator::default()),
            };
            match velocity {
                Some(grid) => Box::new(VelocityEstimator::new(grid, thresholds, fallback)),
                None => {
                    log::warn!("no velocity scan available, using {} attributes", fallback.name());
                    fallback
                }
            }
        }
    }
}

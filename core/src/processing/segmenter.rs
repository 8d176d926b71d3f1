use crate::math::stats::StatsHelper;
use crate::prelude::DetectionConfig;
use crate::radar_interface::Grid;
use ndarray::Array2;

const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A maximal 8-connected set of grid cells at or above the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pixels: Vec<(usize, usize)>,
    peak_intensity: f32,
    centroid: (f64, f64),
}

impl Region {
    /// Member coordinates as `(row, col)`, seed first.
    pub fn pixels(&self) -> &[(usize, usize)] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn peak_intensity(&self) -> f32 {
        self.peak_intensity
    }

    /// Unweighted mean `(row, col)` of the member cells.
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }
}

/// Thresholds a grid and extracts its connected high-intensity regions.
pub struct CellSegmenter {
    config: DetectionConfig,
}

impl CellSegmenter {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Regions in row-major order of their first discovered cell.
    pub fn segment(&self, grid: &Grid) -> Vec<Region> {
        let (rows, cols) = (grid.rows(), grid.cols());
        let mut visited = Array2::from_elem((rows, cols), false);
        let mut regions = Vec::new();
        let mut dropped = 0usize;

        for row in 0..rows {
            for col in 0..cols {
                if visited[(row, col)] || self.qualifying(grid, row, col).is_none() {
                    continue;
                }
                let region = self.fill(grid, &mut visited, (row, col));
                if region.pixel_count() >= self.config.min_region_size {
                    regions.push(region);
                } else {
                    dropped += 1;
                }
            }
        }

        log::debug!(
            "{} segmented {} regions ({} below {} pixels)",
            grid.station_id(),
            regions.len(),
            dropped,
            self.config.min_region_size
        );
        regions
    }

    fn qualifying(&self, grid: &Grid, row: usize, col: usize) -> Option<f32> {
        grid.intensity(row, col).filter(|&value| {
            value >= self.config.threshold && value <= self.config.max_valid_intensity
        })
    }

    /// Iterative flood fill from `seed`, marking every reached cell visited.
    fn fill(&self, grid: &Grid, visited: &mut Array2<bool>, seed: (usize, usize)) -> Region {
        let (rows, cols) = (grid.rows() as isize, grid.cols() as isize);
        let mut stack = vec![seed];
        let mut pixels = Vec::new();
        let mut peak = f32::NEG_INFINITY;
        visited[seed] = true;

        while let Some((row, col)) = stack.pop() {
            if let Some(value) = self.qualifying(grid, row, col) {
                peak = peak.max(value);
            }
            pixels.push((row, col));

            for (dr, dc) in NEIGHBOR_OFFSETS {
                let nr = row as isize + dr;
                let nc = col as isize + dc;
                if nr < 0 || nr >= rows || nc < 0 || nc >= cols {
                    continue;
                }
                let next = (nr as usize, nc as usize);
                if !visited[next] && self.qualifying(grid, next.0, next.1).is_some() {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }

        let row_coords: Vec<f64> = pixels.iter().map(|&(r, _)| r as f64).collect();
        let col_coords: Vec<f64> = pixels.iter().map(|&(_, c)| c as f64).collect();
        Region {
            centroid: (
                StatsHelper::mean(&row_coords),
                StatsHelper::mean(&col_coords),
            ),
            peak_intensity: peak,
            pixels,
        }
    }
}

use crate::math::GeoPoint;
use crate::prelude::{DetectionError, DetectionResult};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Radar product carried by a scan grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Reflectivity,
    Velocity,
}

/// Degrees of latitude/longitude spanned by one grid cell.
///
/// Cartesian only: polar (azimuth/range) products must be resampled upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridGeometry {
    pub unit_lat: f64,
    pub unit_lon: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            unit_lat: 0.01,
            unit_lon: 0.01,
        }
    }
}

/// Provenance of a single scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanMetadata {
    pub station_id: String,
    pub product_kind: ProductKind,
    pub captured_at: DateTime<Utc>,
    pub origin_lat: f64,
    pub origin_lon: f64,
}

/// Plain wire shape of a grid, validated into a [`Grid`] on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPayload {
    #[serde(flatten)]
    pub metadata: ScanMetadata,
    #[serde(default)]
    pub geometry: GridGeometry,
    pub cells: Vec<Vec<Option<f32>>>,
}

/// One validated scan: an immutable 2-D field of optional intensities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridPayload", into = "GridPayload")]
pub struct Grid {
    metadata: ScanMetadata,
    geometry: GridGeometry,
    cells: Array2<Option<f32>>,
}

impl Grid {
    pub fn new(
        metadata: ScanMetadata,
        cells: Vec<Vec<Option<f32>>>,
        geometry: GridGeometry,
    ) -> DetectionResult<Self> {
        let rows = cells.len();
        if rows == 0 {
            return Err(DetectionError::InvalidGrid("grid has no rows".into()));
        }
        let cols = cells[0].len();
        if cols == 0 {
            return Err(DetectionError::InvalidGrid("grid has no columns".into()));
        }
        if let Some((index, row)) = cells.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(DetectionError::InvalidGrid(format!(
                "row {} has {} columns, expected {}",
                index,
                row.len(),
                cols
            )));
        }

        let flat: Vec<Option<f32>> = cells.into_iter().flatten().collect();
        let cells = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|err| DetectionError::InvalidGrid(err.to_string()))?;
        Self::from_array(metadata, cells, geometry)
    }

    pub fn from_array(
        metadata: ScanMetadata,
        cells: Array2<Option<f32>>,
        geometry: GridGeometry,
    ) -> DetectionResult<Self> {
        let (rows, cols) = cells.dim();
        if rows == 0 || cols == 0 {
            return Err(DetectionError::InvalidGrid(format!(
                "grid must be non-empty, got {}x{}",
                rows, cols
            )));
        }
        if !(geometry.unit_lat.is_finite() && geometry.unit_lon.is_finite())
            || geometry.unit_lat == 0.0
            || geometry.unit_lon == 0.0
        {
            return Err(DetectionError::InvalidGrid(format!(
                "cell resolution must be finite and non-zero, got {:?}",
                geometry
            )));
        }
        Ok(Self {
            metadata,
            geometry,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    pub fn metadata(&self) -> &ScanMetadata {
        &self.metadata
    }

    pub fn station_id(&self) -> &str {
        &self.metadata.station_id
    }

    pub fn product_kind(&self) -> ProductKind {
        self.metadata.product_kind
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.metadata.captured_at
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.metadata.origin_lat, self.metadata.origin_lon)
    }

    /// Usable intensity at `(row, col)`; absent, non-finite and out-of-range
    /// cells all read as `None`.
    pub fn intensity(&self, row: usize, col: usize) -> Option<f32> {
        self.cells
            .get((row, col))
            .copied()
            .flatten()
            .filter(|value| value.is_finite())
    }

    /// Linear mapping centered on the grid origin. Fractional indices are
    /// accepted so region centroids map directly.
    pub fn cell_to_geo(&self, row: f64, col: f64) -> GeoPoint {
        let half_rows = self.rows() as f64 / 2.0;
        let half_cols = self.cols() as f64 / 2.0;
        GeoPoint::new(
            self.metadata.origin_lat + (row - half_rows) * self.geometry.unit_lat,
            self.metadata.origin_lon + (col - half_cols) * self.geometry.unit_lon,
        )
    }

    pub fn same_shape(&self, other: &Grid) -> bool {
        self.cells.dim() == other.cells.dim()
    }
}

impl TryFrom<GridPayload> for Grid {
    type Error = DetectionError;

    fn try_from(payload: GridPayload) -> Result<Self, Self::Error> {
        Grid::new(payload.metadata, payload.cells, payload.geometry)
    }
}

impl From<Grid> for GridPayload {
    fn from(grid: Grid) -> Self {
        let cells = grid
            .cells
            .outer_iter()
            .map(|row| row.to_vec())
            .collect();
        GridPayload {
            metadata: grid.metadata,
            geometry: grid.geometry,
            cells,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn metadata(kind: ProductKind) -> ScanMetadata {
        ScanMetadata {
            station_id: "KTLX".into(),
            product_kind: kind,
            captured_at: Utc.with_ymd_and_hms(2024, 5, 20, 21, 0, 0).unwrap(),
            origin_lat: 35.0,
            origin_lon: -97.5,
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let cells = vec![vec![Some(1.0), None], vec![Some(2.0)]];
        let err = Grid::new(
            metadata(ProductKind::Reflectivity),
            cells,
            GridGeometry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DetectionError::InvalidGrid(_)));
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        let meta = metadata(ProductKind::Reflectivity);
        assert!(Grid::new(meta.clone(), vec![], GridGeometry::default()).is_err());
        assert!(Grid::new(meta, vec![vec![], vec![]], GridGeometry::default()).is_err());
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let geometry = GridGeometry {
            unit_lat: 0.0,
            unit_lon: 0.01,
        };
        let result = Grid::new(
            metadata(ProductKind::Reflectivity),
            vec![vec![None; 2]; 2],
            geometry,
        );
        assert!(result.is_err());
    }

    #[test]
    fn center_cell_maps_to_origin() {
        let grid = Grid::new(
            metadata(ProductKind::Reflectivity),
            vec![vec![None; 10]; 8],
            GridGeometry::default(),
        )
        .unwrap();
        let center = grid.cell_to_geo(4.0, 5.0);
        assert!((center.latitude - 35.0).abs() < 1e-12);
        assert!((center.longitude + 97.5).abs() < 1e-12);

        let corner = grid.cell_to_geo(0.0, 0.0);
        assert!((corner.latitude - 34.96).abs() < 1e-9);
        assert!((corner.longitude + 97.55).abs() < 1e-9);
    }

    #[test]
    fn mapping_is_monotonic_in_both_axes() {
        let grid = Grid::new(
            metadata(ProductKind::Reflectivity),
            vec![vec![None; 5]; 5],
            GridGeometry::default(),
        )
        .unwrap();
        let a = grid.cell_to_geo(1.0, 1.0);
        let b = grid.cell_to_geo(2.0, 3.0);
        assert!(b.latitude > a.latitude);
        assert!(b.longitude > a.longitude);
    }

    #[test]
    fn non_finite_values_read_as_no_data() {
        let cells = vec![vec![Some(f32::NAN), Some(f32::INFINITY), Some(45.0), None]];
        let grid = Grid::new(
            metadata(ProductKind::Reflectivity),
            cells,
            GridGeometry::default(),
        )
        .unwrap();
        assert_eq!(grid.intensity(0, 0), None);
        assert_eq!(grid.intensity(0, 1), None);
        assert_eq!(grid.intensity(0, 2), Some(45.0));
        assert_eq!(grid.intensity(0, 3), None);
        assert_eq!(grid.intensity(5, 5), None);
    }

    #[test]
    fn json_payload_is_validated() {
        let valid = serde_json::json!({
            "station_id": "KTLX",
            "product_kind": "reflectivity",
            "captured_at": "2024-05-20T21:00:00Z",
            "origin_lat": 35.0,
            "origin_lon": -97.5,
            "cells": [[null, 42.0], [50.5, null]]
        });
        let grid: Grid = serde_json::from_value(valid).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (2, 2));
        assert_eq!(grid.intensity(1, 0), Some(50.5));
        assert_eq!(grid.geometry(), GridGeometry::default());

        let ragged = serde_json::json!({
            "station_id": "KTLX",
            "product_kind": "velocity",
            "captured_at": "2024-05-20T21:00:00Z",
            "origin_lat": 35.0,
            "origin_lon": -97.5,
            "cells": [[1.0, 2.0], [3.0]]
        });
        assert!(serde_json::from_value::<Grid>(ragged).is_err());
    }
}

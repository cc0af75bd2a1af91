//! Cell-based spatial index for restricted zone lookup.
//!
//! By default zones are bucketed under the H3 cells of their vertices and
//! their centroid. That cover is an over-approximation for small zones and
//! misses the interior of zones much larger than a cell: at resolution 6 the
//! built-in SFO Class B box (about 11 x 17 km) is only found at roughly a
//! quarter of its interior points. [`CoverMode::Fill`] samples the whole
//! polygon instead. Either way `query` only returns candidates and callers
//! must still run exact containment.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ZoneCatalog;
use crate::geometry::{centroid, point_in_polygon};
use crate::models::RestrictedZone;

/// Resolution 6 cells average ~36 km² (a few kilometers across).
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Six;

const KM_PER_DEGREE: f64 = 111.32;

/// Fill sampling grids larger than this fall back to the vertex cover.
const MAX_FILL_POINTS: usize = 250_000;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid coordinate ({lat}, {lon}): {source}")]
    InvalidCoordinate {
        lat: f64,
        lon: f64,
        #[source]
        source: h3o::error::InvalidLatLng,
    },
}

/// How a zone polygon is mapped onto cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverMode {
    /// Cells of the vertices and the centroid only.
    #[default]
    Vertices,
    /// Every cell the polygon can reach: edges and interior are sampled at
    /// half the cell edge length and each hit is padded by one ring.
    Fill,
}

impl FromStr for CoverMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "vertices" | "vertex" => Ok(Self::Vertices),
            "fill" | "polygon" => Ok(Self::Fill),
            other => Err(format!("unknown zone cover: {other}")),
        }
    }
}

/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    resolution: Resolution,
    cover: CoverMode,
    zones: Vec<Arc<RestrictedZone>>,
    zone_ids: HashSet<String>,
    cells: HashMap<CellIndex, Vec<usize>>,
}

impl SpatialIndex {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            cover: CoverMode::default(),
            zones: Vec::new(),
            zone_ids: HashSet::new(),
            cells: HashMap::new(),
        }
    }

    /// Set the cover used by later `index_zone` calls.
    pub fn with_cover(mut self, cover: CoverMode) -> Self {
        self.cover = cover;
        self
    }

    /// Build a vertex-cover index from the catalog's active zones.
    pub fn from_catalog(catalog: &ZoneCatalog, resolution: Resolution) -> Self {
        let mut index = Self::new(resolution);
        index.index_catalog(catalog);
        index
    }

    /// Register every active zone in the catalog, in catalog order.
    pub fn index_catalog(&mut self, catalog: &ZoneCatalog) {
        for zone in catalog.active_zones() {
            self.index_zone(zone.clone());
        }
        tracing::info!(
            "Indexed {} zone(s) into {} cell(s) at resolution {} ({:?} cover)",
            self.zone_count(),
            self.cell_count(),
            self.resolution,
            self.cover
        );
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn cover(&self) -> CoverMode {
        self.cover
    }

    /// Number of registered zones.
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Number of non-empty cell buckets.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Register a zone under the cells of its cover.
    ///
    /// Inactive zones and ids that are already registered are ignored. A zone
    /// with an empty polygon is registered but lands in no cell.
    pub fn index_zone(&mut self, zone: RestrictedZone) {
        if !zone.active {
            tracing::debug!("Skipping inactive zone {}", zone.id);
            return;
        }
        if self.zone_ids.contains(&zone.id) {
            tracing::warn!("Zone {} already indexed, ignoring duplicate", zone.id);
            return;
        }

        let mut points: Vec<(f64, f64)> = zone.polygon.iter().map(|p| (p[0], p[1])).collect();
        if let Some(center) = centroid(&zone.polygon) {
            points.push(center);
        }

        let fill = match self.cover {
            CoverMode::Fill if zone.is_valid() => {
                let step_km = self.resolution.edge_length_km() / 2.0;
                let sampled = fill_points(&zone.polygon, step_km);
                if sampled.is_none() {
                    tracing::warn!(
                        "Zone {} too large to fill at resolution {}, using vertex cover",
                        zone.id,
                        self.resolution
                    );
                }
                sampled
            }
            _ => None,
        };
        let padded = fill.is_some();
        points.extend(fill.unwrap_or_default());

        let mut cells = HashSet::new();
        for (lat, lon) in points {
            match self.cell_for(lat, lon) {
                Ok(cell) => {
                    cells.insert(cell);
                }
                Err(err) => tracing::warn!("Zone {}: skipping vertex: {}", zone.id, err),
            }
        }
        if padded {
            let ring: Vec<CellIndex> = cells
                .iter()
                .flat_map(|cell| cell.grid_disk::<Vec<_>>(1))
                .collect();
            cells.extend(ring);
        }

        let slot = self.zones.len();
        for cell in cells {
            let bucket = self.cells.entry(cell).or_default();
            if !bucket.contains(&slot) {
                bucket.push(slot);
            }
        }

        self.zone_ids.insert(zone.id.clone());
        self.zones.push(Arc::new(zone));
    }

    /// Candidate zones for a point, in registration order.
    pub fn query(&self, lat: f64, lon: f64) -> Result<Vec<Arc<RestrictedZone>>, IndexError> {
        let cell = self.cell_for(lat, lon)?;
        Ok(self
            .cells
            .get(&cell)
            .map(|slots| slots.iter().map(|&slot| self.zones[slot].clone()).collect())
            .unwrap_or_default())
    }

    fn cell_for(&self, lat: f64, lon: f64) -> Result<CellIndex, IndexError> {
        LatLng::new(lat, lon)
            .map(|coord| coord.to_cell(self.resolution))
            .map_err(|source| IndexError::InvalidCoordinate { lat, lon, source })
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

/// Points along every edge and on an interior grid, no more than `step_km`
/// apart. `None` when the grid would exceed [`MAX_FILL_POINTS`].
fn fill_points(polygon: &[[f64; 2]], step_km: f64) -> Option<Vec<(f64, f64)>> {
    if polygon.len() < 3 || step_km <= 0.0 {
        return Some(Vec::new());
    }

    let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
    let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
    for [lat, lon] in polygon {
        min_lat = min_lat.min(*lat);
        max_lat = max_lat.max(*lat);
        min_lon = min_lon.min(*lon);
        max_lon = max_lon.max(*lon);
    }

    // Longitude degrees are widest nearest the equator; size the step there.
    let nearest_equator = if min_lat <= 0.0 && max_lat >= 0.0 {
        0.0
    } else {
        min_lat.abs().min(max_lat.abs())
    };
    let lat_step = step_km / KM_PER_DEGREE;
    let lon_step = step_km / (KM_PER_DEGREE * nearest_equator.to_radians().cos().max(0.01));

    let rows = ((max_lat - min_lat) / lat_step).ceil() as usize + 1;
    let cols = ((max_lon - min_lon) / lon_step).ceil() as usize + 1;
    if rows.saturating_mul(cols) > MAX_FILL_POINTS {
        return None;
    }

    let mut points = Vec::new();
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let span = ((b[0] - a[0]).abs() / lat_step).max((b[1] - a[1]).abs() / lon_step);
        let steps = span.ceil().max(1.0) as usize;
        for step in 0..steps {
            let t = step as f64 / steps as f64;
            points.push((a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t));
        }
    }

    for row in 0..rows {
        let lat = min_lat + row as f64 * lat_step;
        for col in 0..cols {
            let lon = min_lon + col as f64 * lon_step;
            if point_in_polygon(lon, lat, polygon) {
                points.push((lat, lon));
            }
        }
    }

    Some(points)
}

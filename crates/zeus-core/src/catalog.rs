//! Restricted zone catalog.
//!
//! The catalog is a plain value handed to [`crate::SpatialIndex::from_catalog`]
//! at startup; there is no process-wide zone list.

use std::path::Path;

use thiserror::Error;

use crate::models::{AlertLevel, RestrictedZone};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read zone catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse zone catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ZoneCatalog {
    zones: Vec<RestrictedZone>,
}

impl ZoneCatalog {
    pub fn new(zones: Vec<RestrictedZone>) -> Self {
        let catalog = Self { zones };
        catalog.log_problems();
        catalog
    }

    /// Bay Area zones monitored when no catalog file is configured.
    pub fn builtin() -> Self {
        Self::new(vec![
            RestrictedZone {
                id: "sfo-class-b".to_string(),
                name: "SFO Class B".to_string(),
                severity: AlertLevel::Warning,
                polygon: vec![
                    [37.65, -122.50],
                    [37.65, -122.30],
                    [37.55, -122.30],
                    [37.55, -122.50],
                ],
                altitude_min: 0.0,
                altitude_max: 10000.0,
                active: true,
            },
            RestrictedZone {
                id: "travis-afb".to_string(),
                name: "Travis AFB".to_string(),
                severity: AlertLevel::Critical,
                polygon: vec![
                    [38.30, -121.98],
                    [38.30, -121.88],
                    [38.22, -121.88],
                    [38.22, -121.98],
                ],
                altitude_min: 0.0,
                altitude_max: 50000.0,
                active: true,
            },
        ])
    }

    /// Parse a JSON array of zone records.
    pub fn from_json(input: &str) -> Result<Self, CatalogError> {
        let zones: Vec<RestrictedZone> = serde_json::from_str(input)?;
        Ok(Self::new(zones))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&input)
    }

    /// All zones in definition order, including inactive ones.
    pub fn zones(&self) -> &[RestrictedZone] {
        &self.zones
    }

    pub fn active_zones(&self) -> impl Iterator<Item = &RestrictedZone> {
        self.zones.iter().filter(|zone| zone.active)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    // Invalid zones are kept: they index harmlessly and never match.
    fn log_problems(&self) {
        for zone in &self.zones {
            for problem in zone.validate() {
                tracing::warn!("Zone {}: {}", zone.id, problem);
            }
        }
    }
}

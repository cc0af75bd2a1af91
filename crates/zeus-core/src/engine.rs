//! Violation detection for a single aircraft.
//!
//! Candidates come from the [`SpatialIndex`]; each active candidate is checked
//! against its altitude band (feet) and then its polygon. Which match gets
//! reported is decided by [`MatchPolicy`] and nowhere else.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{meters_to_feet, point_in_polygon};
use crate::index::{IndexError, SpatialIndex};
use crate::models::{AircraftState, Evaluation, RestrictedZone};

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("aircraft {icao24} has unusable coordinates ({lat}, {lon})")]
    MalformedRecord { icao24: String, lat: f64, lon: f64 },
    #[error("aircraft {icao24}: spatial lookup failed: {source}")]
    Index {
        icao24: String,
        #[source]
        source: IndexError,
    },
}

/// How to pick the reported zone when several zones contain the aircraft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Report the first matching zone in registration order and stop.
    ///
    /// A WARNING zone registered ahead of an overlapping CRITICAL zone wins.
    #[default]
    FirstMatch,
    /// Scan every candidate and report the most severe match; ties keep the
    /// earlier zone.
    HighestSeverity,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "first" | "first_match" => Ok(Self::FirstMatch),
            "highest" | "highest_severity" | "max" => Ok(Self::HighestSeverity),
            other => Err(format!("unknown match policy: {other}")),
        }
    }
}

impl MatchPolicy {
    /// Fold a new match into the current best.
    ///
    /// Returns the zone to keep and whether scanning can stop.
    fn select<'a>(
        self,
        best: Option<&'a RestrictedZone>,
        candidate: &'a RestrictedZone,
    ) -> (&'a RestrictedZone, bool) {
        match (self, best) {
            (MatchPolicy::FirstMatch, _) => (candidate, true),
            (MatchPolicy::HighestSeverity, Some(current))
                if current.severity >= candidate.severity =>
            {
                (current, false)
            }
            (MatchPolicy::HighestSeverity, _) => (candidate, false),
        }
    }
}

/// Stateless evaluator over a shared, read-only index.
#[derive(Debug, Clone)]
pub struct ViolationEngine {
    index: Arc<SpatialIndex>,
    policy: MatchPolicy,
}

impl ViolationEngine {
    pub fn new(index: Arc<SpatialIndex>) -> Self {
        Self::with_policy(index, MatchPolicy::default())
    }

    pub fn with_policy(index: Arc<SpatialIndex>, policy: MatchPolicy) -> Self {
        Self { index, policy }
    }

    /// Classify one aircraft against the indexed zones.
    pub fn evaluate(&self, aircraft: &AircraftState) -> Result<Evaluation, EvaluationError> {
        let lat = aircraft.latitude;
        let lon = aircraft.longitude;
        if !valid_coordinate(lat, lon) {
            return Err(EvaluationError::MalformedRecord {
                icao24: aircraft.icao24.clone(),
                lat,
                lon,
            });
        }

        let candidates = self
            .index
            .query(lat, lon)
            .map_err(|source| EvaluationError::Index {
                icao24: aircraft.icao24.clone(),
                source,
            })?;
        if candidates.is_empty() {
            return Ok(Evaluation::clear());
        }

        let altitude_ft = meters_to_feet(aircraft.altitude_or_zero());

        let mut best: Option<&RestrictedZone> = None;
        for zone in &candidates {
            if !zone.active || !zone.contains_altitude_ft(altitude_ft) {
                continue;
            }
            if !point_in_polygon(lon, lat, &zone.polygon) {
                continue;
            }

            let (keep, stop) = self.policy.select(best, zone);
            best = Some(keep);
            if stop {
                break;
            }
        }

        Ok(best.map(Evaluation::violation).unwrap_or_default())
    }
}

fn valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

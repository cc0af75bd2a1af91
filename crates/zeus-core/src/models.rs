//! Core data models for the Zeus airspace monitor.

use serde::{Deserialize, Serialize};

/// Alert classification attached to an aircraft after evaluation.
///
/// Ordered from least to most severe so policies can compare levels directly.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// No restricted zone violated
    #[default]
    None,
    /// Advisory zone
    Watch,
    Warning,
    Critical,
}

/// One aircraft's position report for a single polling cycle.
///
/// The enrichment fields (`alert_level`, `violated_zone`) are private: they are
/// only ever written by [`crate::StreamProcessor`] from a violation evaluation.
/// Whatever a producer puts in them on the wire is overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    /// ICAO 24-bit transponder address, stable per airframe
    pub icao24: String,
    #[serde(default)]
    pub callsign: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Barometric altitude in meters
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Ground speed in m/s
    #[serde(default)]
    pub velocity: Option<f64>,
    /// True track in degrees clockwise from north
    #[serde(default)]
    pub heading: Option<f64>,
    /// Climb rate in m/s
    #[serde(default)]
    pub vertical_rate: Option<f64>,
    #[serde(default)]
    pub on_ground: bool,
    /// Seconds since epoch
    pub last_contact: f64,
    #[serde(default)]
    alert_level: AlertLevel,
    #[serde(default)]
    violated_zone: Option<String>,
}

impl AircraftState {
    /// Create an airborne aircraft state with only required fields.
    pub fn new(icao24: impl Into<String>, latitude: f64, longitude: f64, last_contact: f64) -> Self {
        Self {
            icao24: icao24.into(),
            callsign: None,
            latitude,
            longitude,
            altitude: None,
            velocity: None,
            heading: None,
            vertical_rate: None,
            on_ground: false,
            last_contact,
            alert_level: AlertLevel::None,
            violated_zone: None,
        }
    }

    /// Set altitude in meters.
    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude = Some(altitude_m);
        self
    }

    pub fn alert_level(&self) -> AlertLevel {
        self.alert_level
    }

    pub fn violated_zone(&self) -> Option<&str> {
        self.violated_zone.as_deref()
    }

    /// Altitude used for band checks; a missing report counts as ground level.
    pub fn altitude_or_zero(&self) -> f64 {
        self.altitude.unwrap_or(0.0)
    }

    pub(crate) fn apply(&mut self, evaluation: Evaluation) {
        self.alert_level = evaluation.alert_level;
        self.violated_zone = evaluation.violated_zone;
    }
}

/// One polling cycle's worth of aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightBatch {
    /// Source-provided seconds since epoch
    pub timestamp: f64,
    pub aircraft: Vec<AircraftState>,
}

impl FlightBatch {
    pub fn new(timestamp: f64, aircraft: Vec<AircraftState>) -> Self {
        Self {
            timestamp,
            aircraft,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A static geofence with an altitude band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedZone {
    pub id: String,
    pub name: String,
    pub severity: AlertLevel,
    /// Vertices as [lat, lon] pairs; the ring is closed implicitly
    pub polygon: Vec<[f64; 2]>,
    /// Band floor in feet (inclusive)
    pub altitude_min: f64,
    /// Band ceiling in feet (inclusive)
    pub altitude_max: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RestrictedZone {
    /// Whether an altitude in feet lies inside this zone's band.
    pub fn contains_altitude_ft(&self, altitude_ft: f64) -> bool {
        altitude_ft >= self.altitude_min && altitude_ft <= self.altitude_max
    }

    /// Validate zone configuration.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("Zone id must not be empty".to_string());
        }

        if self.polygon.len() < 3 {
            errors.push(format!(
                "Polygon must have at least 3 vertices (has {})",
                self.polygon.len()
            ));
        }

        for (i, [lat, lon]) in self.polygon.iter().enumerate() {
            if !(-90.0..=90.0).contains(lat) || !(-180.0..=180.0).contains(lon) {
                errors.push(format!("Vertex {} out of range: [{}, {}]", i, lat, lon));
            }
        }

        if self.altitude_min > self.altitude_max {
            errors.push(format!(
                "Altitude floor ({}) must not exceed ceiling ({})",
                self.altitude_min, self.altitude_max
            ));
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Result of evaluating one aircraft against the restricted zones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub alert_level: AlertLevel,
    pub violated_zone: Option<String>,
}

impl Evaluation {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn violation(zone: &RestrictedZone) -> Self {
        Self {
            alert_level: zone.severity,
            violated_zone: Some(zone.name.clone()),
        }
    }

    pub fn is_violation(&self) -> bool {
        self.violated_zone.is_some()
    }
}

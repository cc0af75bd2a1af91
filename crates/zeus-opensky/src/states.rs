//! OpenSky state vector decoding.
//!
//! The API returns each aircraft as a positional JSON array rather than an
//! object. Indices used here (see the OpenSky REST docs):
//! 0 icao24, 1 callsign, 3 time_position, 4 last_contact, 5 longitude,
//! 6 latitude, 7 baro_altitude, 8 on_ground, 9 velocity, 10 true_track,
//! 11 vertical_rate.

use serde::Deserialize;
use serde_json::Value;
use zeus_core::{AircraftState, FlightBatch};

const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const TIME_POSITION: usize = 3;
const LAST_CONTACT: usize = 4;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;
const VERTICAL_RATE: usize = 11;

/// Body of `GET /api/states/all`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatesResponse {
    /// UNIX seconds the states are valid for
    pub time: f64,
    #[serde(default)]
    pub states: Option<Vec<Vec<Value>>>,
}

impl StatesResponse {
    /// Convert into a batch, skipping unusable rows.
    ///
    /// Returns `None` when the response carries no states at all.
    pub fn into_batch(self, now: f64) -> Option<FlightBatch> {
        let states = self.states.filter(|states| !states.is_empty())?;
        let total = states.len();

        let aircraft: Vec<AircraftState> = states
            .iter()
            .filter_map(|row| parse_state_vector(row, now))
            .collect();

        if aircraft.len() < total {
            tracing::debug!(
                "Skipped {} of {} state vectors without position",
                total - aircraft.len(),
                total
            );
        }

        Some(FlightBatch::new(self.time, aircraft))
    }
}

/// Parse one positional state vector.
///
/// Rows without an ICAO address, latitude or longitude are rejected. The
/// callsign is trimmed and dropped when blank. `now` stands in for a missing
/// contact time.
pub fn parse_state_vector(row: &[Value], now: f64) -> Option<AircraftState> {
    let icao24 = row.get(ICAO24)?.as_str()?.trim();
    if icao24.is_empty() {
        return None;
    }
    let latitude = number(row, LATITUDE)?;
    let longitude = number(row, LONGITUDE)?;

    let last_contact = number(row, LAST_CONTACT)
        .or_else(|| number(row, TIME_POSITION))
        .unwrap_or(now);

    let mut aircraft = AircraftState::new(icao24, latitude, longitude, last_contact);
    aircraft.callsign = row
        .get(CALLSIGN)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|callsign| !callsign.is_empty())
        .map(str::to_string);
    aircraft.altitude = number(row, BARO_ALTITUDE);
    aircraft.on_ground = row.get(ON_GROUND).and_then(Value::as_bool).unwrap_or(false);
    aircraft.velocity = number(row, VELOCITY);
    aircraft.heading = number(row, TRUE_TRACK);
    aircraft.vertical_rate = number(row, VERTICAL_RATE);

    Some(aircraft)
}

fn number(row: &[Value], index: usize) -> Option<f64> {
    row.get(index).and_then(Value::as_f64)
}

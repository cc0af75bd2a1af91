//! Zeus OpenSky - OpenSky Network API client
//!
//! Polls live state vectors for a bounding box and turns them into
//! [`zeus_core::FlightBatch`] values for the processing stage.

pub mod client;
pub mod states;

pub use client::{BoundingBox, OpenSkyClient, OpenSkyError, DEFAULT_OPENSKY_URL};
pub use states::{parse_state_vector, StatesResponse};

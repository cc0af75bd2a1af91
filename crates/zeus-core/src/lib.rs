pub mod catalog;
pub mod engine;
pub mod geometry;
pub mod index;
pub mod models;
pub mod processor;

pub use catalog::{CatalogError, ZoneCatalog};
pub use engine::{EvaluationError, MatchPolicy, ViolationEngine};
pub use geometry::{centroid, feet_to_meters, meters_to_feet, point_in_polygon};
pub use index::{CoverMode, IndexError, SpatialIndex, DEFAULT_RESOLUTION};
pub use models::{AircraftState, AlertLevel, Evaluation, FlightBatch, RestrictedZone};
pub use processor::{BatchSummary, ProcessError, StreamProcessor};

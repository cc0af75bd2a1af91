//! Background loops for continuous processing.

pub mod ingestion_loop;
pub mod processing_loop;

//! Shared library surface for the Zeus server binary and its tests.

pub mod api;
pub mod backoff;
pub mod channel;
pub mod config;
pub mod loops;
pub mod state;

//! Acquisition and staging core for solar-flare event analysis.
//!
//! Remote HamSci Grape files are mirrored through an authenticated session,
//! loaded into per-node Doppler series, reduced to flare-response parameters,
//! and staged with companion flare and radar data into one bundle per event.

pub mod credentials;
pub mod hamsci;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod remote;
pub mod sources;
pub mod staging;
pub mod telemetry;

pub use prelude::{Event, PipelineError, PipelineResult, TimeWindow};

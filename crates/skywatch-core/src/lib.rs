//! Skywatch Core - Pure logic for airspace track assessment
//!
//! This crate contains the domain models and assessment logic
//! with NO networking dependencies.

pub mod classifier;
pub mod geometry;
pub mod models;
pub mod sensor;
pub mod threat;
pub mod trajectory;

pub use classifier::classify;
pub use geometry::{GeometryError, ZoneGeometry};
pub use models::{
    Alert, Classification, Event, Flight, Operator, RestrictedRegion, Role, TelemetryError,
    TelemetryReport, ThreatLevel, TrajectoryPoint,
};
pub use threat::{ThreatAssessment, ThreatInputs, ThreatWeights};
pub use trajectory::TrajectoryConfig;

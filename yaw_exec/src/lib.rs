//! # Yaw swing control library.
//!
//! This library exposes the modules of the yaw swing control executable so
//! that integration tests can drive them directly.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control cycle body and fixed-period sleep
pub mod cycle;

/// Per-cycle data file written for offline analysis
pub mod cycle_log;

/// Owned mutable state of the executable
pub mod data_store;

/// Interactive keyboard command capture
pub mod input;

/// Executable parameters
pub mod params;

/// Latest telemetry snapshot and the link monitor thread
pub mod tm_store;

/// Yaw control module - reference generation, control law and PWM limiting
pub mod yaw_ctrl;

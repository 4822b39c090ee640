//! # Yaw Swing Executable Parameters
//!
//! This module provides parameters for the control executable itself. Module
//! specific parameters live with their modules (see `yaw_ctrl::Params`).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct YawExecParams {
    /// URI of the vehicle's radio link
    pub link_uri: String,

    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Delivery period requested for telemetry subscriptions.
    ///
    /// Units: milliseconds
    pub tm_period_ms: u32,

    /// Duration the estimator reset parameter is held high.
    ///
    /// Units: seconds
    pub estimator_reset_pulse_s: f64,

    /// Wait after the estimator reset before control is allowed to start.
    /// This is a heuristic settle time, not a verified convergence check.
    ///
    /// Units: seconds
    pub estimator_settle_s: f64,
}

//! # Yaw control module
//!
//! This module produces the four motor PWM demands that drive the vehicle's
//! yaw angle towards a square wave reference. Each cycle it:
//!
//! 1. Advances the reference generator, a time-gated square wave which flips
//!    the sign of the reference every half swing period.
//! 2. Computes the circular tracking error between reference and measurement.
//! 3. Invokes the control law (a pluggable strategy, see [`law::ControlLaw`])
//!    to turn reference and measurement into raw motor demands.
//! 4. Limits each demand into the valid PWM range.
//!
//! Reference and error are computed every cycle regardless of whether the
//! motors are enabled, so the tracking behaviour is always observable.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod law;
mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of motors on the vehicle.
pub const NUM_MOTORS: usize = 4;

/// Maximum PWM demand a motor accepts.
pub const PWM_MAX: u16 = 0xFFFF;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during YawCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum YawCtrlError {
    #[error("The swing period must be greater than zero")]
    InvalidSwingPeriod,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit a raw motor demand into the valid PWM range `[0, PWM_MAX]`.
///
/// Values below zero map to `0`, values above `PWM_MAX` map to `PWM_MAX`,
/// in-range values are truncated to an integer. The returned flag is true if
/// the demand had to be clamped.
pub fn limit_pwm(demand: f64) -> (u16, bool) {
    if demand < 0.0 {
        (0, true)
    } else if demand > PWM_MAX as f64 {
        (PWM_MAX, true)
    } else {
        (demand as u16, false)
    }
}

//! # Control law strategy
//!
//! The mapping from (reference, measurement) to raw motor demands is the part
//! of the system a user supplies. It is kept behind a trait so the rest of
//! the module never needs to change when the law does.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::NUM_MOTORS;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A yaw control law.
///
/// Implementations must be deterministic and free of observable side effects,
/// so that the control loop's timing does not depend on the law in use.
/// Inputs are raw degree values, unconstrained numerically; outputs are raw
/// motor demands which will be limited into the PWM range by the caller.
pub trait ControlLaw: Send {
    /// Compute the four raw motor demands for this cycle.
    fn compute(&mut self, yaw_ref_deg: f64, yaw_meas_deg: f64) -> [f64; NUM_MOTORS];
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Inert placeholder control law.
///
/// Outputs a constant demand on all four motors and performs no feedback at
/// all. **This law is non-functional**: it exists so the loop has something
/// to run before a real law is plugged in via [`YawCtrl::set_law`], and must
/// be replaced before the vehicle can track the reference.
///
/// [`YawCtrl::set_law`]: super::YawCtrl::set_law
pub struct PlaceholderLaw;

/// Constant demand output by the placeholder law on every motor.
pub const PLACEHOLDER_DEMAND: f64 = 10_000.0;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlLaw for PlaceholderLaw {
    fn compute(&mut self, _yaw_ref_deg: f64, _yaw_meas_deg: f64) -> [f64; NUM_MOTORS] {
        [PLACEHOLDER_DEMAND; NUM_MOTORS]
    }
}

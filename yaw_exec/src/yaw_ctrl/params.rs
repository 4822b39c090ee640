//! Parameters structure for YawCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for yaw control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Magnitude of the yaw reference. The reference switches between plus
    /// and minus this value, the magnitude itself never changes.
    ///
    /// Units: degrees
    pub yaw_ref_deg: f64,

    /// Period of the full reference square wave.
    ///
    /// Units: milliseconds
    pub swing_period_ms: u64,

    /// Maximum tracking error allowed before the reference may switch.
    ///
    /// Declared for an error-gated switching policy; the time-gated policy
    /// implemented in this module does not consult it.
    ///
    /// Units: degrees
    pub yaw_err_max_deg: f64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            yaw_ref_deg: 45.0,
            swing_period_ms: 10_000,
            yaw_err_max_deg: 5.0,
        }
    }
}

//! # Data Store
//!
//! Owned mutable state of the control executable. Everything here is written
//! only by the control thread; telemetry arrives through `tm_store` and is
//! copied in at the start of each cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;

// Internal
use crate::tm_store::TmSnapshot;
use crate::yaw_ctrl::{self, YawCtrl};
use link_if::{Gateway, LinkError, ParamValue};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Vehicle parameter gating motor power.
pub const MOTOR_ENABLE_PARAM: &str = "motorPowerSet.enable";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    // Motor state
    /// True while the motors are enabled. Transitions only through
    /// [`DataStore::enable`] and [`DataStore::disable`], which pair the flag
    /// with the corresponding vehicle parameter write.
    pub enabled: bool,

    // Telemetry
    /// Copy of the telemetry snapshot taken at the start of this cycle
    pub tm: TmSnapshot,

    // YawCtrl
    pub yaw_ctrl: YawCtrl,
    pub yaw_ctrl_input: yaw_ctrl::InputData,
    pub yaw_ctrl_output: yaw_ctrl::OutputData,
    pub yaw_ctrl_status_rpt: yaw_ctrl::StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Enable the motors.
    ///
    /// The vehicle-side motor power gate is written first, so that a true
    /// flag always implies the gate was set.
    pub fn enable(&mut self, link: &mut dyn Gateway) -> Result<(), LinkError> {
        info!("Enabling motors");
        link.set_param(MOTOR_ENABLE_PARAM, ParamValue::Uint(1))?;
        self.enabled = true;
        Ok(())
    }

    /// Disable the motors.
    ///
    /// The flag is dropped before the parameter write, so the loop stops
    /// commanding the motors even if the write fails (e.g. link lost).
    pub fn disable(&mut self, link: &mut dyn Gateway) -> Result<(), LinkError> {
        info!("Disabling motors");
        self.enabled = false;
        link.set_param(MOTOR_ENABLE_PARAM, ParamValue::Uint(0))
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the per-cycle module data and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        // Sub-hertz cycle rates truncate to a zero divisor, in which case
        // every cycle is a 1Hz cycle
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128).max(1) == 0;

        self.yaw_ctrl_input = yaw_ctrl::InputData::default();
        self.yaw_ctrl_output = yaw_ctrl::OutputData::default();
        self.yaw_ctrl_status_rpt = yaw_ctrl::StatusReport::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cycle_start_sub_hertz_frequency() {
        let mut ds = DataStore::default();

        // A cycle period above one second gives a frequency below 1 Hz, so
        // the status flag falls back to every cycle
        ds.cycle_start(0.5);
        assert!(ds.is_1_hz_cycle);

        ds.num_cycles = 3;
        ds.cycle_start(0.5);
        assert!(ds.is_1_hz_cycle);
    }

    #[test]
    fn test_cycle_start_50_hz() {
        let mut ds = DataStore::default();

        ds.cycle_start(50.0);
        assert!(ds.is_1_hz_cycle);

        ds.num_cycles = 1;
        ds.cycle_start(50.0);
        assert!(!ds.is_1_hz_cycle);

        ds.num_cycles = 50;
        ds.cycle_start(50.0);
        assert!(ds.is_1_hz_cycle);
    }
}

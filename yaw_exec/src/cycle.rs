//! # Control cycle
//!
//! One control cycle: copy the telemetry snapshot, advance yaw control,
//! issue the motor demands (when enabled and the link is up), and append the
//! cycle record. The fixed-period sleep with deadline accounting also lives
//! here so it can be tested without the full executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

// Internal
use crate::cycle_log::{CycleLogError, CycleLogger, CycleRecord};
use crate::data_store::DataStore;
use crate::input::KeyCommand;
use crate::tm_store::TmStore;
use crate::yaw_ctrl::{self, YawCtrlError};
use link_if::{Gateway, ParamValue};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Vehicle parameters carrying the individual motor PWM demands, in motor
/// order.
pub const MOTOR_PWM_PARAMS: [&str; yaw_ctrl::NUM_MOTORS] = [
    "motorPowerSet.m1",
    "motorPowerSet.m2",
    "motorPowerSet.m3",
    "motorPowerSet.m4",
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which end the control loop.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Yaw control processing failed: {0}")]
    YawCtrlError(#[from] YawCtrlError),

    #[error("Cycle log failure: {0}")]
    CycleLogError(#[from] CycleLogError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute the body of one control cycle.
///
/// `elapsed_s` is the time since the control loop started. Link trouble is
/// handled inside (demands are skipped, the motors defensively disabled);
/// only errors which make continuing pointless are returned.
pub fn exec_cycle(
    ds: &mut DataStore,
    link: &mut dyn Gateway,
    tm_store: &TmStore,
    cycle_logger: &mut CycleLogger,
    elapsed_s: f64,
) -> Result<(), CycleError> {
    // ---- DATA INPUT ----

    ds.tm = tm_store.read();

    // ---- CONTROL ALGORITHM PROCESSING ----

    // YawCtrl runs every cycle, enabled or not, so tracking stays observable
    ds.yaw_ctrl_input = yaw_ctrl::InputData {
        elapsed_s,
        yaw_deg: ds.tm.yaw_deg,
    };

    let (output, report) = ds.yaw_ctrl.proc(&ds.yaw_ctrl_input)?;
    ds.yaw_ctrl_output = output;
    ds.yaw_ctrl_status_rpt = report;

    // ---- ACTUATION ----

    // If the link has gone down since the last cycle drop the enable flag,
    // the vehicle-side gate will have cut motor power already
    if ds.enabled && !tm_store.link_up() {
        warn!("Link is down, disabling motors");
        // The gate write cannot reach a dead link, dropping the flag is what
        // matters here
        ds.disable(link).ok();
    }

    if ds.enabled {
        let motor_pwm = ds.yaw_ctrl_output.motor_pwm;
        let mut write_failed = false;

        // All four channels are attempted even when one write fails, so a
        // transient single-write failure cannot leave a mixed demand on the
        // vehicle
        for (name, pwm) in MOTOR_PWM_PARAMS.iter().zip(motor_pwm.iter()) {
            if let Err(e) = link.set_param(name, ParamValue::Uint(*pwm as u32)) {
                warn!("Could not send demand {}: {}", name, e);
                write_failed = true;
            }
        }

        if write_failed {
            ds.disable(link).ok();
        }
    }

    // ---- CYCLE LOG ----

    if ds.enabled {
        cycle_logger.append(&CycleRecord {
            elapsed_s,
            yaw_deg: ds.tm.yaw_deg,
            yaw_ref_deg: ds.yaw_ctrl_output.yaw_ref_deg,
            enabled: ds.enabled,
            motor_pwm1: ds.yaw_ctrl_output.motor_pwm[0],
            motor_pwm2: ds.yaw_ctrl_output.motor_pwm[1],
            motor_pwm3: ds.yaw_ctrl_output.motor_pwm[2],
            motor_pwm4: ds.yaw_ctrl_output.motor_pwm[3],
            battery_volt: ds.tm.battery_volt,
        })?;
    }

    // ---- STATUS ----

    if ds.is_1_hz_cycle {
        info!(
            "yaw: (curr={:.2}, ref={:.2}, err={:.2}), battery: {:.3} V, control: ({}, {}, {}, {}, {})",
            ds.tm.yaw_deg,
            ds.yaw_ctrl_output.yaw_ref_deg,
            ds.yaw_ctrl_output.yaw_err_deg,
            ds.tm.battery_volt,
            ds.enabled,
            ds.yaw_ctrl_output.motor_pwm[0],
            ds.yaw_ctrl_output.motor_pwm[1],
            ds.yaw_ctrl_output.motor_pwm[2],
            ds.yaw_ctrl_output.motor_pwm[3],
        );
    }

    Ok(())
}

/// Apply one keyboard command to the loop state.
///
/// Returns true if the command asks the loop to stop. Enable and disable
/// failures are reported but never end the loop.
pub fn process_key_command(cmd: KeyCommand, ds: &mut DataStore, link: &mut dyn Gateway) -> bool {
    match cmd {
        KeyCommand::Enable => {
            if let Err(e) = ds.enable(link) {
                warn!("Could not enable motors: {}", e);
            }
            false
        }
        KeyCommand::Disable => {
            if ds.enabled {
                if let Err(e) = ds.disable(link) {
                    warn!("Could not disable motors: {}", e);
                }
            } else {
                info!("Motors are already disabled, uppercase Q quits the program");
            }
            false
        }
        KeyCommand::Quit => true,
    }
}

/// Sleep out the remainder of the cycle period.
///
/// Returns `None` if the deadline was met, or the overrun magnitude if the
/// cycle body took longer than the period. Overruns are reported but never
/// skip cycles: the next cycle starts immediately.
pub fn loop_sleep(cycle_start: Instant, period: Duration) -> Option<Duration> {
    let cycle_dur = cycle_start.elapsed();

    match period.checked_sub(cycle_dur) {
        Some(remaining) => {
            thread::sleep(remaining);
            None
        }
        None => {
            let overrun = cycle_dur - period;
            warn!(
                "Deadline missed by {:.6} s, too slow control cycle",
                overrun.as_secs_f64()
            );
            Some(overrun)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    #[test]
    fn test_loop_sleep_pads_to_period() {
        let start = Instant::now();
        thread::sleep(Duration::from_millis(5));

        let overrun = loop_sleep(start, PERIOD);

        assert!(overrun.is_none());
        // The full cycle must last at least the period; allow generous slack
        // above it since sleep can oversleep on a loaded machine
        let total = start.elapsed();
        assert!(total >= PERIOD, "cycle finished early: {:?}", total);
        assert!(total < PERIOD * 5, "cycle overslept: {:?}", total);
    }

    #[test]
    fn test_loop_sleep_reports_overrun() {
        let start = Instant::now();
        thread::sleep(Duration::from_millis(35));

        let overrun = loop_sleep(start, PERIOD).expect("expected a deadline miss");

        // Body took ~35 ms against a 20 ms period
        assert!(overrun >= Duration::from_millis(15));
        assert!(overrun < Duration::from_millis(100));
    }
}

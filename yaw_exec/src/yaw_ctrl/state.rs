//! Implementations for the YawCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::law::{ControlLaw, PlaceholderLaw};
use super::{limit_pwm, Params, YawCtrlError, NUM_MOTORS};
use util::{maths, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Yaw control module state.
pub struct YawCtrl {
    pub(crate) params: Params,

    /// The control law in use. Starts as the inert placeholder law.
    law: Box<dyn ControlLaw>,

    /// Current value of the reference. Only the sign of this value ever
    /// changes, the magnitude is fixed by `params.yaw_ref_deg`.
    yaw_ref_deg: f64,

    report: StatusReport,
}

/// Input data to yaw control.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputData {
    /// Time since the control loop started.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// The current yaw angle reported by the vehicle.
    ///
    /// Units: degrees, wrapped to the vehicle's convention
    pub yaw_deg: f64,
}

/// Output demands from yaw control.
#[derive(Clone, Copy, Serialize, Debug, Default)]
pub struct OutputData {
    /// The reference the controller is currently tracking.
    ///
    /// Units: degrees
    pub yaw_ref_deg: f64,

    /// Circular tracking error between reference and measurement, in
    /// `(-180, 180]`.
    ///
    /// Units: degrees
    pub yaw_err_deg: f64,

    /// Limited PWM demand for each motor.
    pub motor_pwm: [u16; NUM_MOTORS],
}

/// Status report for YawCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True for each motor whose raw demand had to be clamped.
    pub pwm_clamped: [bool; NUM_MOTORS],

    /// True if the reference sign flipped this cycle.
    pub ref_switched: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl YawCtrl {
    /// Build a YawCtrl directly from a parameter struct.
    ///
    /// The reference starts at `+yaw_ref_deg` (the rising phase).
    pub fn with_params(params: Params) -> Self {
        let yaw_ref_deg = params.yaw_ref_deg;

        YawCtrl {
            params,
            law: Box::new(PlaceholderLaw),
            yaw_ref_deg,
            report: StatusReport::default(),
        }
    }

    /// Replace the control law.
    pub fn set_law(&mut self, law: Box<dyn ControlLaw>) {
        self.law = law;
    }
}

impl Default for YawCtrl {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl State for YawCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = YawCtrlError;

    /// Initialise the YawCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        self.params = params::load(init_data)?;

        // Restart the reference at the rising phase
        self.yaw_ref_deg = self.params.yaw_ref_deg;

        Ok(())
    }

    /// Perform cyclic processing of yaw control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        if self.params.swing_period_ms == 0 {
            return Err(YawCtrlError::InvalidSwingPeriod);
        }

        // See if it is time to switch the reference sign. The wave is
        // time-gated only: in the first half of each swing period the
        // reference is positive, in the second half negative.
        let half_period_ms = self.params.swing_period_ms / 2;
        let phase_ms = (input_data.elapsed_s * 1000.0) as u64 % self.params.swing_period_ms;

        if self.yaw_ref_deg > 0.0 {
            if phase_ms > half_period_ms {
                self.yaw_ref_deg = -self.yaw_ref_deg;
                self.report.ref_switched = true;
            }
        } else if phase_ms <= half_period_ms {
            self.yaw_ref_deg = -self.yaw_ref_deg;
            self.report.ref_switched = true;
        }

        // Circular tracking error
        let yaw_err_deg = maths::angle_diff_deg(self.yaw_ref_deg, input_data.yaw_deg);

        // Run the control law and limit its demands into the PWM range
        let demands = self.law.compute(self.yaw_ref_deg, input_data.yaw_deg);

        let mut motor_pwm = [0u16; NUM_MOTORS];
        for (i, demand) in demands.iter().enumerate() {
            let (pwm, clamped) = limit_pwm(*demand);
            motor_pwm[i] = pwm;
            self.report.pwm_clamped[i] = clamped;
        }

        Ok((
            OutputData {
                yaw_ref_deg: self.yaw_ref_deg,
                yaw_err_deg,
                motor_pwm,
            },
            self.report,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::super::law::{ControlLaw, PLACEHOLDER_DEMAND};
    use super::super::PWM_MAX;
    use super::*;

    fn proc_at(ctrl: &mut YawCtrl, elapsed_s: f64, yaw_deg: f64) -> (OutputData, StatusReport) {
        ctrl.proc(&InputData { elapsed_s, yaw_deg })
            .expect("proc failed")
    }

    #[test]
    fn test_reference_square_wave() {
        let mut ctrl = YawCtrl::default();

        // First half of the swing period: rising phase
        let (out, rpt) = proc_at(&mut ctrl, 0.0, 0.0);
        assert_eq!(out.yaw_ref_deg, 45.0);
        assert!(!rpt.ref_switched);

        let (out, _) = proc_at(&mut ctrl, 4.999, 0.0);
        assert_eq!(out.yaw_ref_deg, 45.0);

        // Just past the half period the sign flips
        let (out, rpt) = proc_at(&mut ctrl, 5.001, 0.0);
        assert_eq!(out.yaw_ref_deg, -45.0);
        assert!(rpt.ref_switched);

        // And flips back at the start of the next period
        let (out, rpt) = proc_at(&mut ctrl, 10.0, 0.0);
        assert_eq!(out.yaw_ref_deg, 45.0);
        assert!(rpt.ref_switched);
    }

    #[test]
    fn test_reference_flips_twice_per_period() {
        let mut ctrl = YawCtrl::default();

        // Step two full swing periods at the control period and count flips
        let mut num_switches = 0;
        for i in 0..=1000 {
            let t_s = i as f64 * 0.02;
            let (_, rpt) = proc_at(&mut ctrl, t_s, 0.0);
            if rpt.ref_switched {
                num_switches += 1;
            }
        }

        assert_eq!(num_switches, 4);
    }

    #[test]
    fn test_reference_magnitude_constant() {
        let mut ctrl = YawCtrl::default();

        let mut t_s = 0.0;
        while t_s <= 20.0 {
            let (out, _) = proc_at(&mut ctrl, t_s, 17.0);
            assert_eq!(out.yaw_ref_deg.abs(), 45.0);
            t_s += 0.1;
        }
    }

    #[test]
    fn test_tracking_error() {
        let mut ctrl = YawCtrl::default();

        // Reference +45, measurement 44 -> error of exactly 1 degree
        let (out, _) = proc_at(&mut ctrl, 0.1, 44.0);
        assert_eq!(out.yaw_ref_deg, 45.0);
        assert_eq!(out.yaw_err_deg, 1.0);
    }

    #[test]
    fn test_placeholder_law_output() {
        let mut ctrl = YawCtrl::default();

        let (out, rpt) = proc_at(&mut ctrl, 0.0, 0.0);
        assert_eq!(out.motor_pwm, [PLACEHOLDER_DEMAND as u16; NUM_MOTORS]);
        assert_eq!(rpt.pwm_clamped, [false; NUM_MOTORS]);
    }

    #[test]
    fn test_demands_are_limited() {
        struct SaturatingLaw;
        impl ControlLaw for SaturatingLaw {
            fn compute(&mut self, _: f64, _: f64) -> [f64; NUM_MOTORS] {
                [70_000.0, -5.0, 10_000.7, 65_535.0]
            }
        }

        let mut ctrl = YawCtrl::default();
        ctrl.set_law(Box::new(SaturatingLaw));

        let (out, rpt) = proc_at(&mut ctrl, 0.0, 0.0);
        assert_eq!(out.motor_pwm, [PWM_MAX, 0, 10_000, PWM_MAX]);
        assert_eq!(rpt.pwm_clamped, [true, true, false, false]);
    }

    #[test]
    fn test_limit_pwm_idempotent() {
        for raw in [-1.0e9, -5.0, 0.0, 1.5, 10_000.7, 65_535.0, 70_000.0, 1.0e12].iter() {
            let (once, _) = limit_pwm(*raw);
            let (twice, clamped) = limit_pwm(once as f64);
            assert_eq!(once, twice);
            assert!(!clamped);
        }
    }

    #[test]
    fn test_zero_swing_period_rejected() {
        let mut ctrl = YawCtrl::with_params(Params {
            swing_period_ms: 0,
            ..Params::default()
        });

        assert!(ctrl
            .proc(&InputData {
                elapsed_s: 0.0,
                yaw_deg: 0.0
            })
            .is_err());
    }
}

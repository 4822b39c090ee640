//! End-to-end tests of the control cycle against the simulated vehicle link.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use link_if::{sim::SimGateway, Gateway, LinkEvent, ParamValue, TmConfig, TmHandle, TmVarType};
use yaw_lib::{
    cycle::{exec_cycle, process_key_command},
    cycle_log::CycleLogger,
    data_store::{DataStore, MOTOR_ENABLE_PARAM},
    input::KeyCommand,
    tm_store::{self, TmStore},
    yaw_ctrl::{law::ControlLaw, NUM_MOTORS},
};

const CYCLE_FREQUENCY_HZ: f64 = 50.0;

/// Everything one control cycle needs, wired up the way the executable does
/// it, but driven synchronously.
struct Harness {
    link: SimGateway,
    events: Receiver<LinkEvent>,
    store: TmStore,
    ds: DataStore,
    logger: Option<CycleLogger>,
    log_path: PathBuf,
    yaw_handle: TmHandle,
    dir: PathBuf,
}

impl Harness {
    fn new(name: &str) -> Self {
        let mut link = SimGateway::new(&[tm_store::YAW_VAR, tm_store::BATT_VAR]);
        link.connect("radio://0/83/2M").unwrap();

        let yaw_handle = link
            .subscribe(TmConfig {
                variable: tm_store::YAW_VAR.into(),
                var_type: TmVarType::Float,
                period_ms: 20,
            })
            .unwrap();
        link.subscribe(TmConfig {
            variable: tm_store::BATT_VAR.into(),
            var_type: TmVarType::Float,
            period_ms: 20,
        })
        .unwrap();

        let events = link.take_event_receiver().unwrap();

        let dir = std::env::temp_dir().join(format!("yaw_swing_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let logger = CycleLogger::create(&dir).unwrap();
        let log_path = logger.path.clone();
        let logger = Some(logger);

        let mut harness = Harness {
            link,
            events,
            store: TmStore::new(),
            ds: DataStore::default(),
            logger,
            log_path,
            yaw_handle,
            dir,
        };

        // Apply the Connected event so the store knows the link is up
        harness.drain_events();
        harness
    }

    /// Apply pending link events to the telemetry store, as the link monitor
    /// thread would.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            tm_store::handle_event(event, &self.store);
        }
    }

    fn inject_yaw(&mut self, timestamp_ms: u32, yaw_deg: f64, battery_volt: f64) {
        self.link.inject_tm(
            self.yaw_handle,
            timestamp_ms,
            &[
                (tm_store::YAW_VAR, yaw_deg),
                (tm_store::BATT_VAR, battery_volt),
            ],
        );
        self.drain_events();
    }

    fn run_cycle(&mut self, elapsed_s: f64) {
        self.ds.cycle_start(CYCLE_FREQUENCY_HZ);
        exec_cycle(
            &mut self.ds,
            &mut self.link,
            &self.store,
            self.logger.as_mut().unwrap(),
            elapsed_s,
        )
        .unwrap();
        self.ds.num_cycles += 1;
    }

    fn num_motor_writes(&self) -> usize {
        self.link
            .param_writes()
            .iter()
            .filter(|(name, _)| name.starts_with("motorPowerSet.m"))
            .count()
    }

    fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.log_path)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.dir).ok();
    }
}

#[test]
fn disabled_cycle_writes_nothing() {
    let mut h = Harness::new("disabled");

    h.inject_yaw(100, 44.0, 3.7);
    h.run_cycle(0.1);

    // Tracking is still computed for observability
    assert_eq!(h.ds.yaw_ctrl_output.yaw_ref_deg, 45.0);
    assert_eq!(h.ds.yaw_ctrl_output.yaw_err_deg, 1.0);

    // But nothing reaches the motors or the log while disabled
    assert_eq!(h.num_motor_writes(), 0);
    assert!(h.log_lines().is_empty());
}

#[test]
fn enabled_cycle_writes_demands_and_log() {
    let mut h = Harness::new("enabled");

    h.inject_yaw(100, 44.0, 3.7);

    h.ds.enable(&mut h.link).unwrap();
    assert_eq!(
        h.link.last_param(MOTOR_ENABLE_PARAM),
        Some(&ParamValue::Uint(1))
    );

    h.run_cycle(0.1);

    // Exactly one demand per motor, all from the placeholder law
    assert_eq!(h.num_motor_writes(), NUM_MOTORS);
    for name in ["m1", "m2", "m3", "m4"].iter() {
        assert_eq!(
            h.link.last_param(&format!("motorPowerSet.{}", name)),
            Some(&ParamValue::Uint(10_000))
        );
    }

    // Exactly one log record, fields in documented order
    let lines = h.log_lines();
    assert_eq!(lines.len(), 1);

    let fields: Vec<&str> = lines[0].split(';').collect();
    assert_eq!(fields.len(), 9);
    assert_eq!(fields[0].parse::<f64>().unwrap(), 0.1);
    assert_eq!(fields[1].parse::<f64>().unwrap(), 44.0);
    assert_eq!(fields[2].parse::<f64>().unwrap(), 45.0);
    assert_eq!(fields[3], "true");
    assert_eq!(fields[4].parse::<u16>().unwrap(), 10_000);
    assert_eq!(fields[8].parse::<f64>().unwrap(), 3.7);

    // Disabling stops both demand writes and logging
    h.ds.disable(&mut h.link).unwrap();
    assert_eq!(
        h.link.last_param(MOTOR_ENABLE_PARAM),
        Some(&ParamValue::Uint(0))
    );

    h.run_cycle(0.12);
    assert_eq!(h.num_motor_writes(), NUM_MOTORS);
    assert_eq!(h.log_lines().len(), 1);
}

#[test]
fn saturated_demand_is_clamped() {
    struct HotLaw;
    impl ControlLaw for HotLaw {
        fn compute(&mut self, _: f64, _: f64) -> [f64; NUM_MOTORS] {
            [70_000.0; NUM_MOTORS]
        }
    }

    let mut h = Harness::new("clamp");
    h.ds.yaw_ctrl.set_law(Box::new(HotLaw));

    h.inject_yaw(100, 44.0, 3.7);
    h.ds.enable(&mut h.link).unwrap();
    h.run_cycle(0.1);

    assert_eq!(
        h.link.last_param("motorPowerSet.m1"),
        Some(&ParamValue::Uint(65_535))
    );
    assert_eq!(h.ds.yaw_ctrl_status_rpt.pwm_clamped, [true; NUM_MOTORS]);
}

#[test]
fn link_loss_defensively_disables() {
    let mut h = Harness::new("linkloss");

    h.inject_yaw(100, 10.0, 3.7);
    h.ds.enable(&mut h.link).unwrap();
    h.run_cycle(0.1);
    let writes_before = h.num_motor_writes();

    h.link.drop_link("out of range");
    h.drain_events();
    assert!(!h.store.link_up());

    // The next cycle must drop the enable flag and skip demand writes
    h.run_cycle(0.12);
    assert!(!h.ds.enabled);
    assert_eq!(h.num_motor_writes(), writes_before);
}

#[test]
fn failed_demand_write_still_sends_remaining_channels() {
    let mut h = Harness::new("writefail");

    h.inject_yaw(100, 44.0, 3.7);
    h.ds.enable(&mut h.link).unwrap();
    h.link.fail_param_writes("motorPowerSet.m2");

    h.run_cycle(0.1);

    // The other three channels still receive their demand this cycle, so no
    // mixed old/new command is left on the vehicle
    assert_eq!(
        h.link.last_param("motorPowerSet.m1"),
        Some(&ParamValue::Uint(10_000))
    );
    assert_eq!(h.link.last_param("motorPowerSet.m2"), None);
    assert_eq!(
        h.link.last_param("motorPowerSet.m3"),
        Some(&ParamValue::Uint(10_000))
    );
    assert_eq!(
        h.link.last_param("motorPowerSet.m4"),
        Some(&ParamValue::Uint(10_000))
    );

    // And the failure disables the motors
    assert!(!h.ds.enabled);
    assert_eq!(
        h.link.last_param(MOTOR_ENABLE_PARAM),
        Some(&ParamValue::Uint(0))
    );
}

#[test]
fn disable_when_already_disabled_writes_nothing() {
    let mut h = Harness::new("redisable");

    let writes_before = h.link.param_writes().len();
    let quit = process_key_command(KeyCommand::Disable, &mut h.ds, &mut h.link);

    // No quit, no parameter traffic, just the reminder on the console
    assert!(!quit);
    assert_eq!(h.link.param_writes().len(), writes_before);
    assert_eq!(h.link.last_param(MOTOR_ENABLE_PARAM), None);

    // A disable while enabled still writes the gate as before
    h.ds.enable(&mut h.link).unwrap();
    assert!(!process_key_command(
        KeyCommand::Disable,
        &mut h.ds,
        &mut h.link
    ));
    assert!(!h.ds.enabled);
    assert_eq!(
        h.link.last_param(MOTOR_ENABLE_PARAM),
        Some(&ParamValue::Uint(0))
    );

    // And quit is just a request to stop
    assert!(process_key_command(KeyCommand::Quit, &mut h.ds, &mut h.link));
}

#[test]
fn quit_sequence_closes_link_once() {
    let mut h = Harness::new("quit");

    h.inject_yaw(100, 44.0, 3.7);
    h.ds.enable(&mut h.link).unwrap();
    h.run_cycle(0.1);

    // The shutdown sequence the executable runs on a quit command
    h.ds.disable(&mut h.link).unwrap();
    assert!(!h.ds.enabled);

    h.logger.take().unwrap().close().unwrap();

    h.link.close();
    assert!(!h.link.is_connected());
    assert_eq!(h.link.num_closes(), 1);

    // Closing again must not close twice
    h.link.close();
    assert_eq!(h.link.num_closes(), 1);
}

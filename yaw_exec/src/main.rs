//! Yaw swing control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and all modules
//!     - Wait for the vehicle link and subscribe telemetry
//!     - Reset the vehicle's state estimator
//!     - Main loop at a fixed period:
//!         - Telemetry snapshot acquisition
//!         - Yaw control processing (reference, error, control law, limits)
//!         - Motor demand and cycle log output (while enabled)
//!         - Keyboard command handling
//!         - Sleep for the remaining cycle budget, reporting overruns
//!
//! Telemetry ingestion and keyboard capture run on their own threads and
//! communicate with the loop through the telemetry store and an mpsc channel
//! respectively; the loop itself is the only writer of the control state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::sync::mpsc::{channel, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use link_if::{Gateway, ParamValue, TmConfig, TmVarType};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};
use yaw_lib::{
    cycle::{exec_cycle, loop_sleep, process_key_command},
    cycle_log::CycleLogger,
    data_store::DataStore,
    input,
    params::YawExecParams,
    tm_store::{self, TmStore},
};

#[cfg(feature = "sim")]
use link_if::sim::SimGateway;

#[cfg(not(feature = "sim"))]
compile_error!(
    "no vehicle link gateway selected: build with the `sim` feature or supply a radio-backed \
     gateway"
);

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Vehicle parameter triggering a state estimator reset.
const ESTIMATOR_RESET_PARAM: &str = "kalman.resetEstimation";

/// Poll period while waiting for the link to come up.
const CONNECT_POLL_PERIOD: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("yaw_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution
    info!("Yaw Swing Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: YawExecParams =
        util::params::load("yaw_exec.toml").wrap_err("Could not load exec params")?;

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let cycle_frequency_hz = 1.0 / exec_params.cycle_period_s;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE AND MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.yaw_ctrl
        .init("yaw_ctrl.toml", &session)
        .wrap_err("Failed to initialise YawCtrl")?;
    info!("YawCtrl init complete");

    // ---- INITIALISE LINK ----

    #[cfg(feature = "sim")]
    let mut link = {
        let l = SimGateway::new(&[tm_store::YAW_VAR, tm_store::BATT_VAR]);
        info!("SimGateway initialised");
        l
    };

    info!("Connecting to {}", exec_params.link_uri);
    link.connect(&exec_params.link_uri)
        .wrap_err("Failed to open the link")?;

    info!("Waiting for a connection");
    while !link.is_connected() {
        thread::sleep(CONNECT_POLL_PERIOD);
    }

    // Subscribe telemetry. An invalid subscription means the vehicle does not
    // expose what the controller needs, so this is fatal.
    link.subscribe(TmConfig {
        variable: tm_store::YAW_VAR.into(),
        var_type: TmVarType::Float,
        period_ms: exec_params.tm_period_ms,
    })
    .wrap_err("Failed to subscribe to attitude telemetry")?;

    link.subscribe(TmConfig {
        variable: tm_store::BATT_VAR.into(),
        var_type: TmVarType::Float,
        period_ms: exec_params.tm_period_ms,
    })
    .wrap_err("Failed to subscribe to battery telemetry")?;

    // Start the link monitor thread which feeds the telemetry store
    let link_events = link
        .take_event_receiver()
        .ok_or_else(|| eyre!("Link event receiver already taken"))?;

    let tm_store = TmStore::new();
    {
        let store = tm_store.clone();
        thread::Builder::new()
            .name("link_monitor".into())
            .spawn(move || tm_store::monitor(link_events, store))
            .wrap_err("Failed to start the link monitor thread")?;
    }

    info!("Link initialisation complete");

    // ---- PREPARE THE VEHICLE ----

    // Make sure the motors are off before anything else
    ds.disable(&mut link)
        .wrap_err("Failed to force the motors off")?;

    reset_estimator(&mut link, &exec_params).wrap_err("Failed to reset the estimator")?;

    // ---- START CYCLE LOG AND KEYBOARD CAPTURE ----

    let mut cycle_logger =
        CycleLogger::create(&session.session_root).wrap_err("Failed to create the cycle log")?;

    // The raw mode guard is held here, not in the capture thread, so the
    // terminal is restored on every exit path of main, fatal errors included
    let (key_sender, key_receiver) = channel();
    let (_raw_mode_guard, key_thread) =
        input::spawn(key_sender).wrap_err("Failed to start keyboard capture")?;

    // ---- MAIN LOOP ----

    info!("Ready! Press e to enable motors, d to disable and Q to quit\n");

    let loop_epoch = Instant::now();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let elapsed_s = loop_epoch.elapsed().as_secs_f64();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // Execute the cycle body. Errors here are fatal, but the motors must
        // not be left running on the way out.
        if let Err(e) = exec_cycle(&mut ds, &mut link, &tm_store, &mut cycle_logger, elapsed_s) {
            ds.disable(&mut link).ok();
            link.close();
            return Err(e).wrap_err("Control cycle failed");
        }

        // ---- KEYBOARD COMMAND PROCESSING ----

        // Drain all commands pending this cycle
        let mut quit = false;

        loop {
            match key_receiver.try_recv() {
                Ok(cmd) => {
                    if process_key_command(cmd, &mut ds, &mut link) {
                        quit = true;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Keyboard capture stopped, quitting");
                    quit = true;
                    break;
                }
            }
        }

        if quit {
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        match loop_sleep(cycle_start_instant, cycle_period) {
            None => ds.num_consec_cycle_overruns = 0,
            Some(_) => ds.num_consec_cycle_overruns += 1,
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("Quit requested, shutting down");

    if let Err(e) = ds.disable(&mut link) {
        warn!("Could not disable motors during shutdown: {}", e);
    }

    cycle_logger
        .close()
        .wrap_err("Failed to finalise the cycle log")?;

    link.close();

    key_thread.join().ok();

    info!("Bye!");

    Ok(())
}

/// Reset the vehicle's state estimator and give it time to settle.
///
/// The settle wait is a heuristic delay, not a verified convergence check.
fn reset_estimator(link: &mut dyn Gateway, params: &YawExecParams) -> Result<(), Report> {
    info!("Resetting the state estimator");

    link.set_param(ESTIMATOR_RESET_PARAM, ParamValue::Uint(1))
        .wrap_err("Failed to raise the estimator reset")?;
    thread::sleep(Duration::from_secs_f64(params.estimator_reset_pulse_s));
    link.set_param(ESTIMATOR_RESET_PARAM, ParamValue::Uint(0))
        .wrap_err("Failed to clear the estimator reset")?;

    info!(
        "Waiting {:.1} s for the estimator to settle",
        params.estimator_settle_s
    );
    thread::sleep(Duration::from_secs_f64(params.estimator_settle_s));

    Ok(())
}

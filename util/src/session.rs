//! Session management
//!
//! A session is a single run of one of the executables. Each session gets its
//! own directory under `sessions/`, named with the executable name and the
//! session start timestamp, into which the log file and any per-cycle data
//! files are written.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

// Internal imports
use crate::host;
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Chrono format string used for session timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Information about the current session.
#[derive(Clone)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot determine the software root directory: {0}")]
    SwRootNotFound(std::io::Error),

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, has a session already been \
         created? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named
    /// `{exec_name}_{timestamp}` under `{sw_root}/{sessions_dir}`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let timestamp = get_epoch().format(TIMESTAMP_FORMAT);

        // Build the session path under the software root
        let mut path = host::get_sw_root().map_err(SessionError::SwRootNotFound)?;
        path.push(sessions_dir);
        path.push(format!("{}_{}", exec_name, timestamp));

        fs::create_dir_all(&path).map_err(SessionError::CannotCreateDir)?;

        // Create the log file path
        let mut log_file_path = path.clone();
        log_file_path.push(format!("{}.log", exec_name));

        Ok(Session {
            session_root: path,
            log_file_path,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// If no session has been created yet this returns `0.0`, so that log
/// statements issued before session creation do not panic.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => {
            let elapsed = Utc::now() - *e;
            time::duration_to_seconds(elapsed).unwrap_or(std::f64::NAN)
        }
        None => 0.0,
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been initialised,
///   which is performed on creating a new `Session` instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

//! # Cycle logger
//!
//! Appends one record per enabled control cycle to a CSV file in the session
//! directory, for offline analysis of the tracking behaviour. Every append is
//! flushed before returning, so a crash can lose at most the in-flight
//! record. Any I/O failure here is fatal for the control loop: a session
//! whose data cannot be trusted is not worth continuing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use csv::{Writer, WriterBuilder};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use util::session;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Field delimiter of the cycle log file.
pub const DELIMITER: u8 = b';';

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One record of the cycle log. Field order here is the field order in the
/// file.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CycleRecord {
    /// Time since the control loop started, seconds.
    pub elapsed_s: f64,

    /// Measured yaw angle, degrees.
    pub yaw_deg: f64,

    /// Reference yaw angle, degrees.
    pub yaw_ref_deg: f64,

    /// Whether the motors were enabled this cycle.
    pub enabled: bool,

    /// Limited PWM demand sent to motor 1.
    pub motor_pwm1: u16,

    /// Limited PWM demand sent to motor 2.
    pub motor_pwm2: u16,

    /// Limited PWM demand sent to motor 3.
    pub motor_pwm3: u16,

    /// Limited PWM demand sent to motor 4.
    pub motor_pwm4: u16,

    /// Battery voltage, volts.
    pub battery_volt: f64,
}

/// Writer for the per-session cycle log file.
pub struct CycleLogger {
    writer: Writer<File>,

    /// Path of the log file being written.
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the cycle logger. All of these are fatal for the control
/// loop.
#[derive(Debug, Error)]
pub enum CycleLogError {
    #[error("Cannot create the cycle log file: {0}")]
    CreateError(csv::Error),

    #[error("Cannot write a cycle record: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the cycle log: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleLogger {
    /// Create a new cycle log file in the given directory.
    ///
    /// The file is named `log_{timestamp}.csv` from the creation time.
    pub fn create(dir: &Path) -> Result<Self, CycleLogError> {
        let timestamp = Utc::now().format(session::TIMESTAMP_FORMAT);
        let path = dir.join(format!("log_{}.csv", timestamp));

        let writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_path(&path)
            .map_err(CycleLogError::CreateError)?;

        info!("Cycle log file: {:?}", path);

        Ok(CycleLogger { writer, path })
    }

    /// Append one record and flush it to disk.
    pub fn append(&mut self, record: &CycleRecord) -> Result<(), CycleLogError> {
        self.writer
            .serialize(record)
            .map_err(CycleLogError::WriteError)?;
        self.writer.flush().map_err(CycleLogError::FlushError)
    }

    /// Finalise the log file.
    ///
    /// Consumes the logger, so appends after closing are rejected at compile
    /// time.
    pub fn close(mut self) -> Result<(), CycleLogError> {
        self.writer.flush().map_err(CycleLogError::FlushError)
    }
}

//! # Telemetry store
//!
//! Holds the latest telemetry values received from the vehicle. The store is
//! written by the link monitor thread, which drains the gateway's event
//! channel, and read once per cycle by the control thread. Neither side ever
//! blocks the other beyond the uncontended snapshot mutex.
//!
//! The monitor thread also maintains the link-up flag, so the control thread
//! can cheaply check whether actuation writes are worth attempting.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

// Internal
use link_if::LinkEvent;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Vehicle variable carrying the current yaw angle in degrees.
pub const YAW_VAR: &str = "stabilizer.yaw";

/// Vehicle variable carrying the battery voltage in volts.
pub const BATT_VAR: &str = "pm.vbat";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The latest telemetry values received from the vehicle.
///
/// Values may be arbitrarily stale relative to the physical vehicle state,
/// staleness is bounded only by the link's own delivery latency.
#[derive(Clone, Copy, Debug, Default)]
pub struct TmSnapshot {
    /// Current yaw angle in degrees.
    pub yaw_deg: f64,

    /// Current battery voltage in volts.
    pub battery_volt: f64,
}

/// Shared handle to the telemetry snapshot and the link-up flag.
#[derive(Clone)]
pub struct TmStore {
    snapshot: Arc<Mutex<TmSnapshot>>,
    link_up: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TmStore {
    pub fn new() -> Self {
        TmStore {
            snapshot: Arc::new(Mutex::new(TmSnapshot::default())),
            link_up: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read the current snapshot. Called once per cycle by the control
    /// thread.
    pub fn read(&self) -> TmSnapshot {
        *self.lock()
    }

    /// True if the link is currently believed to be up.
    pub fn link_up(&self) -> bool {
        self.link_up.load(Ordering::Relaxed)
    }

    fn set_link_up(&self, up: bool) {
        self.link_up.store(up, Ordering::Relaxed);
    }

    fn lock(&self) -> std::sync::MutexGuard<TmSnapshot> {
        // A poisoned snapshot mutex only means a panicking thread died while
        // holding a copy-write, the data itself is still a valid snapshot
        match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TmStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply a single link event to the store.
///
/// Split out of the monitor thread so that tests can drive event handling
/// synchronously.
pub fn handle_event(event: LinkEvent, store: &TmStore) {
    match event {
        LinkEvent::Connected { uri } => {
            info!("Connected to {}", uri);
            store.set_link_up(true);
        }
        LinkEvent::Disconnected { uri } => {
            info!("Disconnected from {}", uri);
            store.set_link_up(false);
        }
        LinkEvent::ConnectionFailed { uri, reason } => {
            error!("Connection to {} failed: {}", uri, reason);
            store.set_link_up(false);
        }
        LinkEvent::ConnectionLost { uri, reason } => {
            warn!("Connection to {} lost: {}", uri, reason);
            store.set_link_up(false);
        }
        LinkEvent::TmData { values, .. } => {
            let mut snapshot = store.lock();
            for (name, value) in values {
                match name.as_str() {
                    YAW_VAR => snapshot.yaw_deg = value,
                    BATT_VAR => snapshot.battery_volt = value,
                    _ => debug!("Ignoring unknown telemetry variable {}", name),
                }
            }
        }
        LinkEvent::TmError { handle, message } => {
            // Non-fatal: the last known snapshot values are retained
            warn!("Telemetry error on subscription {}: {}", handle.0, message);
        }
    }
}

/// Link monitor thread body.
///
/// Drains link events into the store until the gateway side of the event
/// channel is dropped.
pub fn monitor(events: Receiver<LinkEvent>, store: TmStore) {
    while let Ok(event) = events.recv() {
        handle_event(event, &store);
    }

    // Gateway gone, the link can no longer be up
    store.set_link_up(false);
    debug!("Link event channel closed, monitor stopping");
}

#[cfg(test)]
mod test {
    use super::*;
    use link_if::TmHandle;
    use std::collections::HashMap;

    fn tm_event(values: &[(&str, f64)]) -> LinkEvent {
        let values: HashMap<String, f64> =
            values.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        LinkEvent::TmData {
            handle: TmHandle(0),
            timestamp_ms: 100,
            values,
        }
    }

    #[test]
    fn test_snapshot_updates_per_field() {
        let store = TmStore::new();

        handle_event(tm_event(&[(YAW_VAR, 44.0)]), &store);
        let snapshot = store.read();
        assert_eq!(snapshot.yaw_deg, 44.0);
        assert_eq!(snapshot.battery_volt, 0.0);

        // A battery frame must not disturb the yaw value
        handle_event(tm_event(&[(BATT_VAR, 3.7)]), &store);
        let snapshot = store.read();
        assert_eq!(snapshot.yaw_deg, 44.0);
        assert_eq!(snapshot.battery_volt, 3.7);
    }

    #[test]
    fn test_tm_error_retains_snapshot() {
        let store = TmStore::new();

        handle_event(tm_event(&[(YAW_VAR, 12.5)]), &store);
        handle_event(
            LinkEvent::TmError {
                handle: TmHandle(0),
                message: "variable dropped".into(),
            },
            &store,
        );

        assert_eq!(store.read().yaw_deg, 12.5);
    }

    #[test]
    fn test_link_up_tracking() {
        let store = TmStore::new();
        assert!(!store.link_up());

        handle_event(
            LinkEvent::Connected {
                uri: "radio://0/83/2M".into(),
            },
            &store,
        );
        assert!(store.link_up());

        handle_event(
            LinkEvent::ConnectionLost {
                uri: "radio://0/83/2M".into(),
                reason: "out of range".into(),
            },
            &store,
        );
        assert!(!store.link_up());
    }
}

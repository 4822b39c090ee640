//! # Link gateway interface
//!
//! The gateway is the control software's view of the vehicle link. Commands
//! (connect, subscribe, parameter writes) are issued through the [`Gateway`]
//! trait, while the link's asynchronous callbacks (connection state changes,
//! telemetry frames, telemetry errors) are delivered as [`LinkEvent`]s on an
//! mpsc channel owned by the gateway. This keeps the link's callback context
//! decoupled from the control thread: the gateway side must never block
//! waiting on the consumer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration for a single telemetry subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmConfig {
    /// Fully qualified name of the vehicle variable, e.g. `stabilizer.yaw`.
    pub variable: String,

    /// The type the vehicle reports the variable as.
    pub var_type: TmVarType,

    /// Delivery period of the subscription in milliseconds.
    pub period_ms: u32,
}

/// Handle identifying an accepted telemetry subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TmHandle(pub usize);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The type of a telemetry variable in the vehicle's variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TmVarType {
    Float,
    U16,
    U8,
}

/// An asynchronous event raised by the link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The link to the vehicle has been established.
    Connected { uri: String },

    /// The link has been closed in an orderly fashion.
    Disconnected { uri: String },

    /// The initial connection attempt failed.
    ConnectionFailed { uri: String, reason: String },

    /// An established link was lost unexpectedly.
    ConnectionLost { uri: String, reason: String },

    /// A telemetry frame for one subscription.
    TmData {
        handle: TmHandle,
        /// Vehicle-side timestamp of the frame in milliseconds.
        timestamp_ms: u32,
        /// Variable name to value map for this frame.
        values: HashMap<String, f64>,
    },

    /// The vehicle reported an error for one subscription. The subscription
    /// itself remains active.
    TmError { handle: TmHandle, message: String },
}

/// A value written to a vehicle parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Uint(u32),
    Float(f64),
}

/// Possible errors raised by a link gateway.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Telemetry variable `{0}` is not in the vehicle's variable table")]
    ConfigInvalid(String),

    #[error("The link is not connected")]
    NotConnected,

    #[error("The link event channel has been closed")]
    ChannelClosed,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Interface to the vehicle link.
///
/// Command-side operations are synchronous and cheap; everything the vehicle
/// pushes back arrives as [`LinkEvent`]s on the receiver obtained from
/// [`Gateway::take_event_receiver`].
pub trait Gateway {
    /// Open the link to the vehicle at the given URI.
    ///
    /// Connection is asynchronous: success or failure is reported by a
    /// [`LinkEvent::Connected`] or [`LinkEvent::ConnectionFailed`] event, and
    /// [`Gateway::is_connected`] can be polled.
    fn connect(&mut self, uri: &str) -> Result<(), LinkError>;

    /// Close the link. Closing an already closed link is a no-op.
    fn close(&mut self);

    /// True if the link is currently established.
    fn is_connected(&self) -> bool;

    /// Subscribe to a telemetry variable.
    ///
    /// Returns `LinkError::ConfigInvalid` if the variable is not present in
    /// the vehicle's variable table.
    fn subscribe(&mut self, config: TmConfig) -> Result<TmHandle, LinkError>;

    /// Write a vehicle parameter.
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), LinkError>;

    /// Take the receiving end of the link event channel.
    ///
    /// The channel has a single consumer: the first call returns the
    /// receiver, subsequent calls return `None`.
    fn take_event_receiver(&mut self) -> Option<Receiver<LinkEvent>>;
}

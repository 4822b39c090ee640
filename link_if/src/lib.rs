//! # Vehicle link interface
//!
//! This library defines the interface between the control executable and the
//! vehicle's radio link. The actual link transport (radio driver, wire
//! protocol, parameter table caching) lives outside this workspace; any
//! transport implements the [`gateway::Gateway`] trait and delivers its
//! asynchronous events over the gateway's event channel.
//!
//! A channel-backed simulation gateway is provided in [`sim`] for development
//! and testing.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod gateway;
pub mod sim;

// ---------------------------------------------------------------------------
// RE-EXPORTS
// ---------------------------------------------------------------------------

pub use gateway::{Gateway, LinkError, LinkEvent, ParamValue, TmConfig, TmHandle, TmVarType};

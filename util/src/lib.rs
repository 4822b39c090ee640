//! Utility library for the yaw swing control software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;

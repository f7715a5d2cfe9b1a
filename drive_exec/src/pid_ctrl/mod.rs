//! # PID control module
//!
//! Provides the PID controller used for both steering and throttle, and the gain set shared with
//! the tuner.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controller;
mod gains;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controller::*;
pub use gains::*;

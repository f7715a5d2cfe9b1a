//! # Communications interface crate.
//!
//! Provides the network abstractions and the simulator message definitions shared between the
//! drive executable and the test tools.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network module
pub mod net;

/// Simulator messages: telemetry in, drive demands out
pub mod sim;

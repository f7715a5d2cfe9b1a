//! # Drive library.
//!
//! This library allows the binaries in the drive crate, and the benchmarks, to access the
//! controllers and the simulator link.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cross track error logs - loads recorded samples for offline replay
pub mod cte_log;

/// Drive control module - converts telemetry into steering and throttle demands
pub mod drive_ctrl;

/// PID controller with rejection based integral anti-windup
pub mod pid_ctrl;

/// Simulator server - recieves telemetry from and sends demands to the simulator link
pub mod sim_server;

/// Gain tuner - adjusts controller gains between trials by coordinate ascent
pub mod tuner;

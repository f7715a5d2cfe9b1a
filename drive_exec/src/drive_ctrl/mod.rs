//! Drive control module
//!
//! Turns each telemetry sample into steering and throttle demands using one PID controller for
//! each. In tuning mode the steering gains are adjusted between trials by the gain tuner.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Recieved a non-finite telemetry sample (cte: {cte}, speed: {speed})")]
    NonFiniteSample { cte: f64, speed: f64 },
}

/// Possible errors that can occur while initialising DriveCtrl.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlInitError {
    #[error("Could not load the parameters: {0}")]
    Params(LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Could not create the trial archive: {0}")]
    Archive(ArchiveError),
}

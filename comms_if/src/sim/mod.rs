//! # Simulator Interface
//!
//! This module defines the data exchanged with the driving simulator. Every tick the simulator
//! sends a [`Telemetry`] sample and expects a [`DriveDems`] in reply.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod framing;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de, Deserialize, Deserializer, Serialize};

pub use framing::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single telemetry sample from the simulator.
///
/// The simulator sends numbers as strings (`"cte": "0.7598"`), plain JSON numbers are accepted
/// too.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Cross track error, the signed distance of the vehicle from the reference line.
    #[serde(deserialize_with = "de_wire_num")]
    pub cte: f64,

    /// Vehicle speed.
    ///
    /// Units: miles per hour
    #[serde(deserialize_with = "de_wire_num")]
    pub speed: f64,

    /// The steering angle currently applied by the vehicle, if reported.
    ///
    /// Units: degrees
    #[serde(default, deserialize_with = "de_opt_wire_num")]
    pub steering_angle: Option<f64>,
}

/// Demands sent back to the simulator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveDems {
    /// Normalised steering demand in `[-1, 1]`.
    #[serde(rename = "steering_angle")]
    pub steering: f64,

    /// Throttle demand, negative values brake.
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Numbers as they appear on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireNum {
    Num(f64),
    Str(String),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn de_wire_num<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match WireNum::deserialize(deserializer)? {
        WireNum::Num(n) => Ok(n),
        WireNum::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("\"{}\" is not a number", s))),
    }
}

fn de_opt_wire_num<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    de_wire_num(deserializer).map(Some)
}

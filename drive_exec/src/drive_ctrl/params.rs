//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::pid_ctrl::{Gains, DEFAULT_INTEGRAL_BOUND};
use crate::tuner;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Params {
    pub mode: DriveMode,

    // ---- TARGETS ----

    /// The speed the throttle controller drives towards.
    ///
    /// Units: miles per hour
    pub speed_limit: f64,

    /// Weight of the cross track error in the throttle error, so the vehicle slows down when it
    /// is off the line.
    #[serde(default)]
    pub throttle_cte_gain: f64,

    // ---- CONTROLLERS ----

    pub steer_gains: Gains,

    pub throttle_gains: Gains,

    /// Bound on the integral of both controllers
    #[serde(default = "default_integral_bound")]
    pub integral_bound: f64,

    // ---- LIMITS ----

    /// Maximum magnitude of the steering demand
    #[serde(default = "default_limit")]
    pub steer_limit: f64,

    /// Maximum throttle demand. There is no lower limit so the controller can brake.
    #[serde(default = "default_limit")]
    pub throttle_max: f64,

    /// If set the throttle is held while the vehicle is fast and off the line
    #[serde(default)]
    pub throttle_hold: Option<ThrottleHold>,

    // ---- TUNING ----

    /// Used only in `DriveMode::Tune`
    #[serde(default)]
    pub tuner: tuner::Params,
}

/// Conditions under which the throttle demand is frozen at its previous value.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ThrottleHold {
    /// Hold only at or above this speed.
    ///
    /// Units: miles per hour
    pub speed: f64,

    /// Hold only when the magnitude of the cross track error is above this value.
    pub cte: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the drive controllers are run.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Fixed gains, for driving as fast as possible.
    Race,

    /// Steering gains are tuned while driving at a lower speed.
    Tune,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Parameters for racing with the known good gains.
    pub fn race() -> Self {
        let speed_limit = 60.0;

        Self {
            mode: DriveMode::Race,
            speed_limit,
            throttle_cte_gain: 15.0,
            steer_gains: Gains::new(0.19, 0.0016, 2.8 + speed_limit / 100.0),
            throttle_gains: Gains::new(0.09, 0.0005, 2.1),
            integral_bound: DEFAULT_INTEGRAL_BOUND,
            steer_limit: default_limit(),
            throttle_max: default_limit(),
            throttle_hold: None,
            tuner: tuner::Params::default(),
        }
    }

    /// Parameters for tuning the steering gains.
    pub fn tune() -> Self {
        Self {
            mode: DriveMode::Tune,
            speed_limit: 50.0,
            throttle_cte_gain: 0.0,
            steer_gains: Gains::new(0.18, 0.00000005, 3.5 + 0.5),
            throttle_gains: Gains::new(0.09, 0.000001, 1.1),
            integral_bound: DEFAULT_INTEGRAL_BOUND,
            steer_limit: default_limit(),
            // Plain cap at full throttle. Earlier tuning runs instead dropped demands of
            // `speed_limit / 10` or more to `speed_limit / 100`, which let demands between the
            // two through unchanged.
            throttle_max: default_limit(),
            throttle_hold: Some(ThrottleHold {
                speed: 25.0,
                cte: 1.0,
            }),
            tuner: tuner::Params::default(),
        }
    }

    /// Check the parameters make sense, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !self.steer_gains.is_finite() {
            return Err(format!("steer_gains must be finite, found {:?}", self.steer_gains));
        }
        if !self.throttle_gains.is_finite() {
            return Err(format!(
                "throttle_gains must be finite, found {:?}",
                self.throttle_gains
            ));
        }
        if !(self.integral_bound.is_finite() && self.integral_bound >= 0.0) {
            return Err(format!(
                "integral_bound must not be negative, found {}",
                self.integral_bound
            ));
        }
        if !(self.steer_limit > 0.0 && self.steer_limit <= 1.0) {
            return Err(format!(
                "steer_limit must be in (0, 1], found {}",
                self.steer_limit
            ));
        }
        if !util::maths::all_finite(&[self.speed_limit, self.throttle_cte_gain, self.throttle_max])
        {
            return Err("speed_limit, throttle_cte_gain and throttle_max must be finite".into());
        }

        if self.mode == DriveMode::Tune {
            self.tuner.validate()?;
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::race()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_integral_bound() -> f64 {
    DEFAULT_INTEGRAL_BOUND
}

fn default_limit() -> f64 {
    1.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_presets() {
        let race = Params::race();
        assert!(race.validate().is_ok());
        assert!((race.steer_gains.k_d - 3.4).abs() < 1e-12);

        let tune = Params::tune();
        assert!(tune.validate().is_ok());
        assert_eq!(tune.steer_gains.k_d, 4.0);
    }

    #[test]
    fn test_deserialise_defaults() {
        let params: Params = toml::from_str(
            r#"
            mode = "tune"
            speed_limit = 50.0
            steer_gains = { k_p = 0.18, k_i = 0.00000005, k_d = 4.0 }
            throttle_gains = { k_p = 0.09, k_i = 0.000001, k_d = 1.1 }

            [tuner]
            tolerance = 0.01
            "#,
        )
        .unwrap();

        assert_eq!(params.mode, DriveMode::Tune);
        assert_eq!(params.integral_bound, 200.0);
        assert_eq!(params.steer_limit, 1.0);
        assert_eq!(params.throttle_cte_gain, 0.0);
        assert_eq!(params.throttle_hold, None);
        assert_eq!(params.tuner.trial_duration_s, 10.6);
        assert_eq!(params.tuner.tolerance, Some(0.01));
    }

    #[test]
    fn test_shipped_params() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../params");

        let race: Params = util::params::load_path(root.join("drive_ctrl.toml")).unwrap();
        assert!(race.validate().is_ok());
        assert_eq!(race.mode, DriveMode::Race);
        assert_eq!(race.steer_gains.k_p, 0.19);
        assert!((race.steer_gains.k_d - Params::race().steer_gains.k_d).abs() < 1e-12);

        let tune: Params = util::params::load_path(root.join("drive_ctrl_tune.toml")).unwrap();
        assert!(tune.validate().is_ok());
        assert_eq!(tune.throttle_hold, Params::tune().throttle_hold);
        assert_eq!(tune.tuner.tolerance, Some(0.001));
    }

    #[test]
    fn test_validate() {
        let mut p = Params::race();
        p.steer_limit = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::race();
        p.steer_gains.k_i = std::f64::INFINITY;
        assert!(p.validate().is_err());

        // Tuner parameters only matter when tuning
        let mut p = Params::race();
        p.tuner.step_shrink = 2.0;
        assert!(p.validate().is_ok());
        p.mode = DriveMode::Tune;
        assert!(p.validate().is_err());
    }
}

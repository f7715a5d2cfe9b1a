//! Gain tuning parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for gain tuning
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Length of one trial.
    ///
    /// Units: seconds
    #[serde(default = "default_trial_duration_s")]
    pub trial_duration_s: f64,

    /// The step size each gain starts with
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// Factor applied to a gain's step size when changing that gain improved the error
    #[serde(default = "default_step_grow")]
    pub step_grow: f64,

    /// Factor applied to a gain's step size when neither direction improved the error
    #[serde(default = "default_step_shrink")]
    pub step_shrink: f64,

    /// Tuning stops once the sum of the step sizes drops below this value. If not set tuning
    /// never stops.
    #[serde(default)]
    pub tolerance: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters make sense, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.trial_duration_s.is_finite() && self.trial_duration_s > 0.0) {
            return Err(format!(
                "trial_duration_s must be positive, found {}",
                self.trial_duration_s
            ));
        }
        if !(self.initial_step.is_finite() && self.initial_step >= 0.0) {
            return Err(format!(
                "initial_step must not be negative, found {}",
                self.initial_step
            ));
        }
        if !(self.step_grow.is_finite() && self.step_grow >= 1.0) {
            return Err(format!("step_grow must be at least 1, found {}", self.step_grow));
        }
        if !(self.step_shrink > 0.0 && self.step_shrink < 1.0) {
            return Err(format!(
                "step_shrink must be between 0 and 1, found {}",
                self.step_shrink
            ));
        }
        if let Some(t) = self.tolerance {
            if !(t.is_finite() && t > 0.0) {
                return Err(format!("tolerance must be positive, found {}", t));
            }
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            trial_duration_s: default_trial_duration_s(),
            initial_step: default_initial_step(),
            step_grow: default_step_grow(),
            step_shrink: default_step_shrink(),
            tolerance: None,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_trial_duration_s() -> f64 {
    10.6
}

fn default_initial_step() -> f64 {
    0.1
}

fn default_step_grow() -> f64 {
    1.1
}

fn default_step_shrink() -> f64 {
    0.9
}

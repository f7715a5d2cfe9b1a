//! # PID controller
//!
//! A sample-based PID controller. Each call to `update_error` consumes one error sample and the
//! output is read with `total_error`. The controller does not know about time, the integral is
//! the plain sum of samples and the derivative the difference between consecutive samples, so it
//! must be fed at a steady rate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::Gains;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default limit on the magnitude of the integral term.
pub const DEFAULT_INTEGRAL_BOUND: f64 = 200.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// The controller gains
    gains: Gains,

    /// The integral is never allowed to leave `[-integral_bound, integral_bound]`
    integral_bound: f64,

    /// Previous error, `None` before the first sample or after a reset
    prev_error: Option<f64>,

    /// The integral accumulation
    integral_error: f64,

    /// Difference between the last two samples
    deriv_error: f64,
}

/// The individual contributions of each term to the controller output.
///
/// The sum of the three terms is the output of [`PidController::total_error`].
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Default)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains and integral bound.
    pub fn new(gains: Gains, integral_bound: f64) -> Self {
        Self {
            gains,
            integral_bound,
            prev_error: None,
            integral_error: 0.0,
            deriv_error: 0.0,
        }
    }

    /// Set the controller gains.
    ///
    /// The error state is kept, use [`reset`](Self::reset) to clear it.
    pub fn init(&mut self, gains: Gains) {
        self.gains = gains;
    }

    /// Clear the previous and integral errors.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral_error = 0.0;
        self.deriv_error = 0.0;
    }

    /// Consume one error sample.
    ///
    /// A sample which would take the integral outside its bound is not added to the integral at
    /// all, the integral keeps its previous value rather than being clamped to the bound.
    pub fn update_error(&mut self, error: f64) {
        self.deriv_error = match self.prev_error {
            Some(e) => error - e,
            None => 0.0,
        };
        self.prev_error = Some(error);

        let integral = self.integral_error + error;
        if integral >= -self.integral_bound && integral <= self.integral_bound {
            self.integral_error = integral;
        }
    }

    /// Get the controller output for the current state.
    ///
    /// The output is not limited, callers must saturate it to suit their actuator.
    pub fn total_error(&self) -> f64 {
        let terms = self.terms();
        terms.p + terms.i + terms.d
    }

    /// Get the contribution of each term to the output.
    pub fn terms(&self) -> PidTerms {
        PidTerms {
            p: -self.gains.k_p * self.prev_error(),
            i: -self.gains.k_i * self.integral_error,
            d: -self.gains.k_d * self.deriv_error,
        }
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn integral_bound(&self) -> f64 {
        self.integral_bound
    }

    /// The last error sample, or zero if there hasn't been one since the last reset.
    pub fn prev_error(&self) -> f64 {
        self.prev_error.unwrap_or(0.0)
    }

    pub fn integral_error(&self) -> f64 {
        self.integral_error
    }

    pub fn deriv_error(&self) -> f64 {
        self.deriv_error
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(Gains::default(), DEFAULT_INTEGRAL_BOUND)
    }
}

//! Coordinate ascent gain tuner

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use super::Params;
use crate::pid_ctrl::{GainId, Gains, PidController};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The gain tuner state.
#[derive(Debug, Clone)]
pub struct Tuner {
    params: Params,

    /// Gains in use for the current trial
    gains: Gains,

    /// Step size of each gain, indexed by `GainId::index`
    steps: [f64; 3],

    /// The gain currently being probed
    active: GainId,

    phase: TunerPhase,

    /// Lowest trial error seen so far
    best_error: f64,

    /// Gains which produced `best_error`
    best_gains: Gains,

    /// Sum of squared errors since the current trial began
    trial_error: f64,

    /// Number of completed trials
    num_trials: u64,
}

/// Summary of a completed trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialReport {
    /// Number of the trial, starting at 1
    pub trial: u64,

    /// Sum of squared errors over the trial
    pub trial_error: f64,

    /// Best trial error after this trial
    pub best_error: f64,

    /// Gains which produced `best_error`
    pub best_gains: Gains,

    /// The gain whose change this trial measured
    pub tested_gain: GainId,

    pub outcome: TrialOutcome,

    /// Gains for the next trial
    pub next_gains: Gains,

    /// Step sizes for the next trial, indexed by `GainId::index`
    pub next_steps: [f64; 3],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which leg of the search the current trial is measuring.
///
/// The three state description of twiddle (`AWAITING_BASELINE`, `PROBING_INCREASE`,
/// `PROBING_DECREASE`) stays in `AWAITING_BASELINE` both for the very first trial and for every
/// trial measuring an increased gain, and never enters `PROBING_INCREASE`. Here those two legs are
/// told apart. The transitions are the same:
///
/// | Variant            | Three state name                      |
/// |--------------------|---------------------------------------|
/// | `AwaitingBaseline` | `AWAITING_BASELINE`, first trial only |
/// | `ProbingIncrease`  | `AWAITING_BASELINE`, later trials     |
/// | `ProbingDecrease`  | `PROBING_DECREASE`                    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TunerPhase {
    /// The first trial, which measures the starting gains.
    AwaitingBaseline,

    /// The active gain has been increased by its step.
    ProbingIncrease,

    /// The active gain has been decreased by its step.
    ProbingDecrease,
}

/// What the tuner did at the end of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrialOutcome {
    /// The starting gains were measured and the first probe started.
    Baseline,

    /// The change improved the error and was kept, the next gain is now being probed.
    Improved,

    /// Increasing the gain didn't help, the opposite direction is now being probed.
    Reversed,

    /// Neither direction helped, the gain was restored and the next gain is now being probed.
    Reverted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tuner {
    /// Create a new tuner starting from the given gains.
    ///
    /// The first trial is run with these gains unchanged.
    pub fn new(gains: Gains, params: &Params) -> Self {
        Self {
            params: params.clone(),
            gains,
            steps: [params.initial_step; 3],
            active: GainId::P,
            phase: TunerPhase::AwaitingBaseline,
            best_error: 0.0,
            best_gains: gains,
            trial_error: 0.0,
            num_trials: 0,
        }
    }

    /// Add one error sample to the current trial.
    pub fn record_sample(&mut self, error: f64) {
        self.trial_error += error * error;
    }

    /// Throw away the samples recorded so far in the current trial, keeping its gains.
    ///
    /// The caller must restart its trial clock at the same time so every trial covers the same
    /// length of driving.
    pub fn restart_trial(&mut self) {
        self.trial_error = 0.0;
    }

    /// End the current trial.
    ///
    /// The gains for the next trial are written into `ctrl`, and the controller's error state is
    /// reset so the next trial starts clean.
    pub fn end_trial(&mut self, ctrl: &mut PidController) -> TrialReport {
        let error = self.trial_error;
        let tested_gain = self.active;
        let step = self.step(tested_gain);
        self.num_trials += 1;

        let outcome = match self.phase {
            TunerPhase::AwaitingBaseline => {
                self.best_error = error;
                self.best_gains = self.gains;
                self.gains[tested_gain] += step;
                self.phase = TunerPhase::ProbingIncrease;
                TrialOutcome::Baseline
            }
            TunerPhase::ProbingIncrease | TunerPhase::ProbingDecrease
                if error < self.best_error =>
            {
                self.best_error = error;
                self.best_gains = self.gains;
                self.steps[tested_gain.index()] *= self.params.step_grow;
                self.advance();
                TrialOutcome::Improved
            }
            TunerPhase::ProbingIncrease => {
                self.gains[tested_gain] -= 2.0 * step;
                self.phase = TunerPhase::ProbingDecrease;
                TrialOutcome::Reversed
            }
            TunerPhase::ProbingDecrease => {
                self.gains[tested_gain] += step;
                self.steps[tested_gain.index()] *= self.params.step_shrink;
                self.advance();
                TrialOutcome::Reverted
            }
        };

        self.trial_error = 0.0;

        ctrl.init(self.gains);
        ctrl.reset();

        debug!(
            "Trial {} ({:?} {:?}): error {:.4}, best {:.4}, next gains {:?}",
            self.num_trials, tested_gain, outcome, error, self.best_error, self.gains
        );

        TrialReport {
            trial: self.num_trials,
            trial_error: error,
            best_error: self.best_error,
            best_gains: self.best_gains,
            tested_gain,
            outcome,
            next_gains: self.gains,
            next_steps: self.steps,
        }
    }

    /// Returns true once the step sizes have shrunk below the tolerance.
    ///
    /// Always false if no tolerance is set.
    pub fn is_converged(&self) -> bool {
        match self.params.tolerance {
            Some(t) => self.step_sum() < t,
            None => false,
        }
    }

    /// Sum of the step sizes of all gains.
    pub fn step_sum(&self) -> f64 {
        self.steps.iter().sum()
    }

    pub fn step(&self, id: GainId) -> f64 {
        self.steps[id.index()]
    }

    pub fn steps(&self) -> [f64; 3] {
        self.steps
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// The gains of the best trial so far, or the starting gains before the first trial ends.
    pub fn best_gains(&self) -> Gains {
        self.best_gains
    }

    /// The best trial error so far, `None` before the first trial ends.
    pub fn best_error(&self) -> Option<f64> {
        match self.num_trials {
            0 => None,
            _ => Some(self.best_error),
        }
    }

    pub fn trial_error(&self) -> f64 {
        self.trial_error
    }

    pub fn active_gain(&self) -> GainId {
        self.active
    }

    pub fn phase(&self) -> TunerPhase {
        self.phase
    }

    pub fn num_trials(&self) -> u64 {
        self.num_trials
    }

    /// Move on to the next gain and start probing it upwards.
    fn advance(&mut self) {
        self.active = self.active.next();
        let step = self.step(self.active);
        self.gains[self.active] += step;
        self.phase = TunerPhase::ProbingIncrease;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pid_ctrl::DEFAULT_INTEGRAL_BOUND;

    fn start_gains() -> Gains {
        Gains::new(0.18, 0.00000005, 3.5 + 0.5)
    }

    /// Run one trial with the given per-sample errors
    fn run_trial(tuner: &mut Tuner, ctrl: &mut PidController, samples: &[f64]) -> TrialReport {
        for s in samples {
            ctrl.update_error(*s);
            tuner.record_sample(*s);
        }
        tuner.end_trial(ctrl)
    }

    #[test]
    fn test_accumulates_squared_error() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        tuner.record_sample(2.0);
        tuner.record_sample(-3.0);
        assert_eq!(tuner.trial_error(), 13.0);
    }

    #[test]
    fn test_restart_trial() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        run_trial(&mut tuner, &mut ctrl, &[2.0]);
        let gains = tuner.gains();

        // Samples before an interruption are dropped, the probe gains stay
        tuner.record_sample(5.0);
        tuner.restart_trial();
        assert_eq!(tuner.trial_error(), 0.0);
        assert_eq!(tuner.gains(), gains);
        assert_eq!(tuner.num_trials(), 1);

        // So the resumed trial is only judged on its own samples
        let report = run_trial(&mut tuner, &mut ctrl, &[1.0]);
        assert_eq!(report.trial_error, 1.0);
        assert_eq!(report.outcome, TrialOutcome::Improved);
    }

    #[test]
    fn test_baseline_then_improvement() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        assert_eq!(tuner.phase(), TunerPhase::AwaitingBaseline);
        assert_eq!(tuner.best_error(), None);

        // Baseline trial
        let report = run_trial(&mut tuner, &mut ctrl, &[2.0, 2.0]);
        assert_eq!(report.outcome, TrialOutcome::Baseline);
        assert_eq!(report.trial_error, 8.0);
        assert_eq!(tuner.best_error(), Some(8.0));
        assert_eq!(tuner.active_gain(), GainId::P);
        assert_eq!(tuner.gains().k_p, 0.18 + 0.1);
        assert_eq!(tuner.trial_error(), 0.0);

        // Controller picks up the probe gains with a clean state
        assert_eq!(ctrl.gains(), tuner.gains());
        assert_eq!(ctrl.integral_error(), 0.0);
        assert_eq!(ctrl.prev_error(), 0.0);

        // Strictly better trial
        let report = run_trial(&mut tuner, &mut ctrl, &[1.0, 1.0]);
        assert_eq!(report.outcome, TrialOutcome::Improved);
        assert_eq!(report.tested_gain, GainId::P);
        assert_eq!(tuner.step(GainId::P), 0.1 * 1.1);
        assert_eq!(tuner.active_gain(), GainId::I);
        assert_eq!(tuner.phase(), TunerPhase::ProbingIncrease);
        assert_eq!(tuner.best_error(), Some(2.0));
        assert_eq!(tuner.best_gains(), Gains::new(0.18 + 0.1, 0.00000005, 4.0));
        assert_eq!(
            tuner.gains(),
            Gains::new(0.18 + 0.1, 0.00000005 + 0.1, 4.0)
        );
        assert_eq!(ctrl.gains(), tuner.gains());
    }

    #[test]
    fn test_reverse_then_revert() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        run_trial(&mut tuner, &mut ctrl, &[1.0]);
        let k_p_up = tuner.gains().k_p;

        // Equal error is not an improvement, so the probe goes the other way
        let report = run_trial(&mut tuner, &mut ctrl, &[1.0]);
        assert_eq!(report.outcome, TrialOutcome::Reversed);
        assert_eq!(tuner.phase(), TunerPhase::ProbingDecrease);
        assert_eq!(tuner.active_gain(), GainId::P);
        assert_eq!(tuner.gains().k_p, k_p_up - 2.0 * 0.1);

        // Worse again, the gain goes back to where it started and the step shrinks
        let report = run_trial(&mut tuner, &mut ctrl, &[3.0]);
        assert_eq!(report.outcome, TrialOutcome::Reverted);
        assert_eq!(tuner.gains().k_p, k_p_up - 2.0 * 0.1 + 0.1);
        assert!((tuner.gains().k_p - 0.18).abs() < 1e-12);
        assert_eq!(tuner.step(GainId::P), 0.1 * 0.9);
        assert_eq!(tuner.active_gain(), GainId::I);
        assert_eq!(tuner.gains().k_i, 0.00000005 + 0.1);
        assert_eq!(tuner.phase(), TunerPhase::ProbingIncrease);
        assert_eq!(tuner.best_error(), Some(1.0));
        assert_eq!(tuner.best_gains(), start_gains());
    }

    #[test]
    fn test_improvement_while_decreasing() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        run_trial(&mut tuner, &mut ctrl, &[2.0]);
        run_trial(&mut tuner, &mut ctrl, &[3.0]);
        let k_p_down = tuner.gains().k_p;

        let report = run_trial(&mut tuner, &mut ctrl, &[1.0]);
        assert_eq!(report.outcome, TrialOutcome::Improved);
        assert_eq!(tuner.gains().k_p, k_p_down);
        assert_eq!(tuner.step(GainId::P), 0.1 * 1.1);
        assert_eq!(tuner.active_gain(), GainId::I);
        assert_eq!(tuner.phase(), TunerPhase::ProbingIncrease);
        assert_eq!(tuner.best_error(), Some(1.0));
    }

    #[test]
    fn test_gains_cycle_round_robin() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        // Every trial better than the last, so every trial advances the gain
        let mut visited = vec![];
        for i in 0..7 {
            let report = run_trial(&mut tuner, &mut ctrl, &[10.0 - i as f64]);
            visited.push(report.tested_gain);
        }

        assert_eq!(
            visited,
            vec![
                GainId::P,
                GainId::P,
                GainId::I,
                GainId::D,
                GainId::P,
                GainId::I,
                GainId::D
            ]
        );
        assert_eq!(tuner.num_trials(), 7);
    }

    #[test]
    fn test_one_gain_changed_per_probe_trial() {
        let mut tuner = Tuner::new(start_gains(), &Params::default());
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        run_trial(&mut tuner, &mut ctrl, &[5.0]);

        // Increase probes that fail only touch the active gain
        let before = tuner.gains();
        run_trial(&mut tuner, &mut ctrl, &[6.0]);
        let after = tuner.gains();
        assert_ne!(before.k_p, after.k_p);
        assert_eq!(before.k_i, after.k_i);
        assert_eq!(before.k_d, after.k_d);
    }

    #[test]
    fn test_convergence() {
        let params = Params {
            tolerance: Some(0.25),
            ..Default::default()
        };
        let mut tuner = Tuner::new(start_gains(), &params);
        let mut ctrl = PidController::new(start_gains(), DEFAULT_INTEGRAL_BOUND);

        assert!((tuner.step_sum() - 0.3).abs() < 1e-12);
        assert!(!tuner.is_converged());

        // Baseline, then nothing ever improves: each gain reverses then reverts
        run_trial(&mut tuner, &mut ctrl, &[1.0]);
        let mut trials = 0;
        while !tuner.is_converged() {
            run_trial(&mut tuner, &mut ctrl, &[2.0]);
            trials += 1;
            assert!(trials < 1000, "Tuner did not converge");
        }

        assert!(tuner.step_sum() < 0.25);
        assert_eq!(tuner.best_gains(), start_gains());

        let no_tolerance = Tuner::new(start_gains(), &Params::default());
        assert!(!no_tolerance.is_converged());
    }
}

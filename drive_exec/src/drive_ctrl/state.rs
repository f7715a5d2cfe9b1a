//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::sim::{DriveDems, Telemetry};
use log::{info, trace};
use serde::Serialize;

// Internal
use super::{DriveCtrlError, DriveCtrlInitError, DriveMode, Params};
use crate::pid_ctrl::{GainId, Gains, PidController};
use crate::tuner::{TrialOutcome, TrialReport, Tuner};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths, params,
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
#[derive(Default)]
pub struct DriveCtrl {
    params: Params,

    steer_ctrl: PidController,

    throttle_ctrl: PidController,

    /// The gain tuner, only present while tuning
    tuner: Option<Tuner>,

    /// Throttle demand of the previous cycle, repeated while the throttle is held
    prev_throttle: f64,

    report: StatusReport,

    /// The last completed trial, waiting to be archived
    last_trial: Option<TrialRecord>,
    arch_trials: Archiver,
}

/// Input data to drive control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub telemetry: Telemetry,

    /// True if the current tuning trial ends with this sample. Ignored when not tuning.
    pub end_of_trial: bool,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub steering_limited: bool,
    pub throttle_limited: bool,

    /// The throttle demand was repeated from the previous cycle
    pub throttle_held: bool,

    /// Set if a tuning trial ended on this cycle
    pub trial: Option<TrialReport>,
}

/// Flattened trial report, one row of the trial archive.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrialRecord {
    pub trial: u64,
    pub trial_error: f64,
    pub best_error: f64,
    pub tested_gain: GainId,
    pub outcome: TrialOutcome,
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
    pub step_p: f64,
    pub step_i: f64,
    pub step_d: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    /// Build the module directly from a set of parameters, without archiving.
    pub fn from_params(params: Params) -> Result<Self, DriveCtrlInitError> {
        params
            .validate()
            .map_err(DriveCtrlInitError::InvalidParams)?;

        let tuner = match params.mode {
            DriveMode::Tune => Some(Tuner::new(params.steer_gains, &params.tuner)),
            DriveMode::Race => None,
        };

        Ok(Self {
            steer_ctrl: PidController::new(params.steer_gains, params.integral_bound),
            throttle_ctrl: PidController::new(params.throttle_gains, params.integral_bound),
            tuner,
            params,
            ..Default::default()
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn steer_ctrl(&self) -> &PidController {
        &self.steer_ctrl
    }

    pub fn throttle_ctrl(&self) -> &PidController {
        &self.throttle_ctrl
    }

    /// The status report of the last call to `proc`, including one which failed.
    pub fn status_report(&self) -> StatusReport {
        self.report
    }

    pub fn tuner(&self) -> Option<&Tuner> {
        self.tuner.as_ref()
    }

    /// Returns true while the steering gains are being tuned.
    pub fn is_tuning(&self) -> bool {
        self.tuner.is_some()
    }

    /// The best steering gains found so far, or the gains in use if not tuning.
    pub fn best_steer_gains(&self) -> Gains {
        match self.tuner {
            Some(ref t) => t.best_gains(),
            None => self.steer_ctrl.gains(),
        }
    }

    /// Discard the samples of the current trial and start it again.
    ///
    /// Used when the sample stream is interrupted, the steering controller is reset as its
    /// history is stale.
    pub fn restart_trial(&mut self) {
        if let Some(tuner) = self.tuner.as_mut() {
            tuner.restart_trial();
            self.steer_ctrl.reset();
        }
    }

    /// End the current tuning trial, if tuning.
    fn end_trial(&mut self) {
        let tuner = match self.tuner.as_mut() {
            Some(t) => t,
            None => return,
        };

        let report = tuner.end_trial(&mut self.steer_ctrl);

        info!(
            "Trial {} {:?} {:?}: error {:.4} (best {:.4}), next gains {:?}",
            report.trial,
            report.tested_gain,
            report.outcome,
            report.trial_error,
            report.best_error,
            report.next_gains
        );

        self.last_trial = Some(TrialRecord::from(&report));
        self.report.trial = Some(report);

        if !tuner.is_converged() {
            return;
        }

        let best = tuner.best_gains();
        info!(
            "Tuning converged after {} trials, best gains {:?} (error {:.4})",
            tuner.num_trials(),
            best,
            tuner.best_error().unwrap_or(0.0)
        );

        self.tuner = None;
        self.steer_ctrl.init(best);
        self.steer_ctrl.reset();
    }

    fn calc_throttle(&mut self, telem: &Telemetry) -> f64 {
        let held = match self.params.throttle_hold {
            Some(h) => telem.speed >= h.speed && telem.cte.abs() > h.cte,
            None => false,
        };

        if held {
            self.report.throttle_held = true;
            return self.prev_throttle;
        }

        self.throttle_ctrl.update_error(
            telem.speed - self.params.speed_limit + self.params.throttle_cte_gain * telem.cte,
        );

        let (throttle, limited) =
            maths::clamp_max(self.throttle_ctrl.total_error(), self.params.throttle_max);
        self.report.throttle_limited = limited;

        throttle
    }
}

impl State for DriveCtrl {
    type InitData = String;
    type InitError = DriveCtrlInitError;

    type InputData = InputData;
    type OutputData = DriveDems;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(&init_data).map_err(DriveCtrlInitError::Params)?;

        *self = Self::from_params(params)?;

        if self.is_tuning() {
            self.arch_trials = Archiver::from_path(session, "tuner/trials.csv")
                .map_err(DriveCtrlInitError::Archive)?;
        }

        info!(
            "DriveCtrl initialised in {:?} mode with steering gains {:?}",
            self.params.mode, self.params.steer_gains
        );

        Ok(())
    }

    /// Perform cyclic processing of drive control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        let telem = input_data.telemetry;

        // A NaN would poison the integrals for the rest of the run. The trial boundary still
        // has to be honoured, otherwise the trial runs on into the next one.
        if !maths::all_finite(&[telem.cte, telem.speed]) {
            if input_data.end_of_trial {
                self.end_trial();
            }

            return Err(DriveCtrlError::NonFiniteSample {
                cte: telem.cte,
                speed: telem.speed,
            });
        }

        // Steering
        self.steer_ctrl.update_error(telem.cte);
        let (steering, steering_limited) = maths::clamp(
            self.steer_ctrl.total_error(),
            -self.params.steer_limit,
            self.params.steer_limit,
        );
        self.report.steering_limited = steering_limited;

        // Throttle
        let throttle = self.calc_throttle(&telem);
        self.prev_throttle = throttle;

        // Tuning
        if let Some(tuner) = self.tuner.as_mut() {
            tuner.record_sample(telem.cte);
        }
        if input_data.end_of_trial {
            self.end_trial();
        }

        let dems = DriveDems { steering, throttle };

        trace!("DriveCtrl output: {:?}, report: {:?}", dems, self.report);

        Ok((dems, self.report))
    }
}

impl Archived for DriveCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.last_trial.take() {
            Some(r) if self.arch_trials.is_init() => self.arch_trials.serialise(r),
            _ => Ok(()),
        }
    }
}

impl From<&TrialReport> for TrialRecord {
    fn from(report: &TrialReport) -> Self {
        Self {
            trial: report.trial,
            trial_error: report.trial_error,
            best_error: report.best_error,
            tested_gain: report.tested_gain,
            outcome: report.outcome,
            k_p: report.next_gains.k_p,
            k_i: report.next_gains.k_i,
            k_d: report.next_gains.k_d,
            step_p: report.next_steps[GainId::P.index()],
            step_i: report.next_steps[GainId::I.index()],
            step_d: report.next_steps[GainId::D.index()],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tuner::{SampleClock, TrialClock};

    fn input(cte: f64, speed: f64, end_of_trial: bool) -> InputData {
        InputData {
            telemetry: Telemetry {
                cte,
                speed,
                steering_angle: None,
            },
            end_of_trial,
        }
    }

    #[test]
    fn test_race_steering() {
        let mut ctrl = DriveCtrl::from_params(Params::race()).unwrap();
        assert!(!ctrl.is_tuning());

        let (dems, report) = ctrl.proc(&input(0.5, 60.0, false)).unwrap();
        assert!((dems.steering - -(0.19 * 0.5 + 0.0016 * 0.5)).abs() < 1e-12);
        assert!(!report.steering_limited);

        // Far off the line the steering saturates
        let (dems, report) = ctrl.proc(&input(20.0, 60.0, false)).unwrap();
        assert_eq!(dems.steering, -1.0);
        assert!(report.steering_limited);

        let (dems, _) = ctrl.proc(&input(-20.0, 60.0, false)).unwrap();
        assert_eq!(dems.steering, 1.0);
    }

    #[test]
    fn test_race_throttle() {
        let mut ctrl = DriveCtrl::from_params(Params::race()).unwrap();

        // Stationary, so full throttle
        let (dems, report) = ctrl.proc(&input(0.0, 0.0, false)).unwrap();
        assert_eq!(dems.throttle, 1.0);
        assert!(report.throttle_limited);

        // Over the limit the throttle can go negative to brake
        let mut ctrl = DriveCtrl::from_params(Params::race()).unwrap();
        let (dems, report) = ctrl.proc(&input(0.0, 70.0, false)).unwrap();
        assert!((dems.throttle - -(0.09 * 10.0 + 0.0005 * 10.0)).abs() < 1e-12);
        assert!(!report.throttle_limited);

        // Cross track error adds to the throttle error
        let mut ctrl = DriveCtrl::from_params(Params::race()).unwrap();
        ctrl.proc(&input(0.2, 60.0, false)).unwrap();
        assert!((ctrl.throttle_ctrl().prev_error() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_race_ignores_trial_end() {
        let mut ctrl = DriveCtrl::from_params(Params::race()).unwrap();
        let gains = ctrl.steer_ctrl().gains();

        let (_, report) = ctrl.proc(&input(0.3, 60.0, true)).unwrap();
        assert!(report.trial.is_none());
        assert_eq!(ctrl.steer_ctrl().gains(), gains);
        assert_eq!(ctrl.best_steer_gains(), gains);
    }

    #[test]
    fn test_throttle_hold() {
        let mut ctrl = DriveCtrl::from_params(Params::tune()).unwrap();

        let (first, report) = ctrl.proc(&input(0.5, 30.0, false)).unwrap();
        assert!(!report.throttle_held);
        let throttle_error = ctrl.throttle_ctrl().prev_error();
        assert_eq!(throttle_error, 30.0 - 50.0);

        // Fast and off the line, throttle repeats and its controller is left alone
        let (held, report) = ctrl.proc(&input(1.5, 35.0, false)).unwrap();
        assert!(report.throttle_held);
        assert_eq!(held.throttle, first.throttle);
        assert_eq!(ctrl.throttle_ctrl().prev_error(), throttle_error);

        // Too slow to hold
        let (_, report) = ctrl.proc(&input(1.5, 20.0, false)).unwrap();
        assert!(!report.throttle_held);
        assert_eq!(ctrl.throttle_ctrl().prev_error(), 20.0 - 50.0);
    }

    #[test]
    fn test_non_finite_sample() {
        let mut ctrl = DriveCtrl::from_params(Params::tune()).unwrap();
        ctrl.proc(&input(0.5, 30.0, false)).unwrap();

        match ctrl.proc(&input(std::f64::NAN, 30.0, false)) {
            Err(DriveCtrlError::NonFiniteSample { .. }) => (),
            r => panic!("Expected NonFiniteSample, got {:?}", r),
        }
        assert!(ctrl.proc(&input(0.5, std::f64::INFINITY, false)).is_err());

        // Nothing was touched
        assert_eq!(ctrl.steer_ctrl().prev_error(), 0.5);
        assert_eq!(ctrl.steer_ctrl().integral_error(), 0.5);
        assert_eq!(ctrl.tuner().unwrap().trial_error(), 0.25);
        assert_eq!(ctrl.tuner().unwrap().num_trials(), 0);
    }

    #[test]
    fn test_non_finite_sample_on_trial_boundary() {
        let mut ctrl = DriveCtrl::from_params(Params::tune()).unwrap();
        let mut clock = SampleClock::new(3);

        let samples = [1.0, 1.0, std::f64::NAN, 1.0, 1.0, 1.0];
        let mut trial_ends = vec![];

        for (i, cte) in samples.iter().enumerate() {
            let end_of_trial = ctrl.is_tuning() && clock.poll();

            let report = match ctrl.proc(&input(*cte, 10.0, end_of_trial)) {
                Ok((_, r)) => r,
                Err(_) => ctrl.status_report(),
            };

            if let Some(trial) = report.trial {
                trial_ends.push((i, trial.trial_error));
            }
        }

        // The rejected sample still closes the first trial, so the second is a full length
        assert_eq!(trial_ends, vec![(2, 2.0), (5, 3.0)]);
        assert_eq!(ctrl.tuner().unwrap().num_trials(), 2);
    }

    #[test]
    fn test_restart_trial() {
        let mut ctrl = DriveCtrl::from_params(Params::tune()).unwrap();

        ctrl.proc(&input(3.0, 10.0, false)).unwrap();
        ctrl.restart_trial();

        assert_eq!(ctrl.tuner().unwrap().trial_error(), 0.0);
        assert_eq!(ctrl.steer_ctrl().prev_error(), 0.0);
        assert_eq!(ctrl.steer_ctrl().integral_error(), 0.0);

        // Only the samples after the restart count
        let (_, report) = ctrl.proc(&input(1.0, 10.0, true)).unwrap();
        assert_eq!(report.trial.unwrap().trial_error, 1.0);

        // Nothing to restart when racing
        let mut race = DriveCtrl::from_params(Params::race()).unwrap();
        race.proc(&input(3.0, 60.0, false)).unwrap();
        race.restart_trial();
        assert_eq!(race.steer_ctrl().prev_error(), 3.0);
    }

    #[test]
    fn test_tuning_trials() {
        let mut ctrl = DriveCtrl::from_params(Params::tune()).unwrap();
        assert!(ctrl.is_tuning());

        let (dems, _) = ctrl.proc(&input(1.0, 10.0, false)).unwrap();
        assert!((dems.steering - -(0.18 + 0.00000005)).abs() < 1e-12);

        // The trial ends after this sample's demands are calculated
        let (_, report) = ctrl.proc(&input(1.0, 10.0, true)).unwrap();
        let trial = report.trial.unwrap();
        assert_eq!(trial.trial, 1);
        assert_eq!(trial.outcome, TrialOutcome::Baseline);
        assert_eq!(trial.trial_error, 2.0);

        // The next trial runs with the probe gains from a clean state
        assert!((ctrl.steer_ctrl().gains().k_p - 0.28).abs() < 1e-12);
        assert_eq!(ctrl.steer_ctrl().integral_error(), 0.0);
        assert_eq!(ctrl.steer_ctrl().prev_error(), 0.0);
        assert_eq!(ctrl.tuner().unwrap().trial_error(), 0.0);
        assert_eq!(ctrl.best_steer_gains(), Params::tune().steer_gains);

        // No archive, so writing is a no-op
        assert!(ctrl.write().is_ok());
        assert!(ctrl.last_trial.is_none());

        let (_, report) = ctrl.proc(&input(0.5, 10.0, false)).unwrap();
        assert!(report.trial.is_none());
    }

    #[test]
    fn test_tuning_convergence() {
        let mut params = Params::tune();
        params.tuner.tolerance = Some(0.31);
        let start = params.steer_gains;

        let mut ctrl = DriveCtrl::from_params(params).unwrap();

        // Step sum is 0.3 so tuning stops as soon as the first trial ends
        let (_, report) = ctrl.proc(&input(1.0, 10.0, true)).unwrap();
        assert!(report.trial.is_some());
        assert!(!ctrl.is_tuning());
        assert_eq!(ctrl.steer_ctrl().gains(), start);
        assert_eq!(ctrl.steer_ctrl().integral_error(), 0.0);
        assert_eq!(ctrl.best_steer_gains(), start);
    }

    #[test]
    fn test_trial_record() {
        let record = TrialRecord::from(&TrialReport {
            trial: 3,
            trial_error: 4.0,
            best_error: 2.0,
            best_gains: Gains::new(1.0, 1.9, 3.0),
            tested_gain: GainId::I,
            outcome: TrialOutcome::Reversed,
            next_gains: Gains::new(1.0, 2.0, 3.0),
            next_steps: [0.1, 0.2, 0.3],
        });

        assert_eq!(record.k_i, 2.0);
        assert_eq!(record.step_d, 0.3);
        assert_eq!(record.tested_gain, GainId::I);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::race();
        params.integral_bound = -1.0;

        match DriveCtrl::from_params(params) {
            Err(DriveCtrlInitError::InvalidParams(_)) => (),
            _ => panic!("Expected InvalidParams"),
        }
    }
}

//! # Drive Executable
//!
//! This executable drives the simulated vehicle. It serves the simulator link, running the
//! steering and throttle controllers on every telemetry sample and replying with the demands. In
//! tuning mode the steering gains are tuned while driving, with trials timed on the wall clock.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use color_eyre::{eyre::WrapErr, Result};
use comms_if::{net::NetParams, sim::SimEvent};
use log::{debug, info, trace, warn};
use serde::Serialize;
use structopt::StructOpt;

// Internal
use drive_lib::{
    drive_ctrl::{DriveCtrl, InputData},
    pid_ctrl::Gains,
    sim_server::{SimServer, SimServerError},
    tuner::{TrialClock, TrialReport, WallClock},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Drive the simulated vehicle")]
struct Opt {
    /// Drive control parameter file, relative to the params directory
    #[structopt(default_value = "drive_ctrl.toml")]
    params_file: String,

    /// Log every cycle
    #[structopt(short, long)]
    verbose: bool,
}

/// The best gains found so far, saved into the session after every trial.
#[derive(Debug, Serialize)]
struct BestGains {
    gains: Gains,
    error: f64,
    trials: u64,
    converged: bool,
    timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if opt.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Failed to load the network parameters")?;

    info!("Parameters loaded");

    // ---- MODULE INITIALISATION ----

    let mut drive_ctrl = DriveCtrl::default();
    drive_ctrl
        .init(opt.params_file.clone(), &session)
        .wrap_err("Failed to initialise DriveCtrl")?;

    let mut trial_clock = WallClock::from_secs_f64(drive_ctrl.params().tuner.trial_duration_s);

    info!("DriveCtrl initialised");

    // ---- SERVER INITIALISATION ----

    let mut server = SimServer::new(&net_params).wrap_err("Failed to initialise server")?;

    info!("Server initialised on {}", net_params.sim_endpoint);

    // ---- MAIN LOOP ----

    info!("Initialisation complete, waiting for telemetry");

    // True while the simulator is sending telemetry
    let mut driving = false;

    loop {
        let event = match server.recieve_event() {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                reply_manual(&mut server);
                continue;
            }
        };

        let telemetry = match event {
            SimEvent::Telemetry(t) => t,
            other => {
                if driving {
                    info!("Telemetry stopped, handing control back to the simulator");
                    driving = false;
                }
                trace!("No telemetry in {:?}", other);
                reply_manual(&mut server);
                continue;
            }
        };

        if !driving {
            info!("Recieved telemetry, driving");
            driving = true;
            // Time spent in manual doesn't count towards a trial, and neither do the samples of
            // the interrupted trial
            trial_clock.restart();
            drive_ctrl.restart_trial();
        }

        let input = InputData {
            telemetry,
            end_of_trial: drive_ctrl.is_tuning() && trial_clock.poll(),
        };

        match drive_ctrl.proc(&input) {
            Ok((dems, report)) => {
                if let Err(e) = server.send_dems(&dems) {
                    warn!("Couldn't send demands to the simulator: {}", e);
                }

                debug!(
                    "CTE: {:+.4} Speed: {:5.2} -> Steering: {:+.4} Throttle: {:+.4}",
                    telemetry.cte, telemetry.speed, dems.steering, dems.throttle
                );

                if let Some(trial) = report.trial {
                    save_best_gains(&session, &trial, !drive_ctrl.is_tuning());
                }
            }
            Err(e) => {
                warn!("DriveCtrl processing failed: {}", e);
                reply_manual(&mut server);

                // A trial can still end on a rejected sample
                if let Some(trial) = drive_ctrl.status_report().trial {
                    save_best_gains(&session, &trial, !drive_ctrl.is_tuning());
                }
            }
        }

        if let Err(e) = drive_ctrl.write() {
            warn!("Could not archive DriveCtrl data: {}", e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Answer the pending request, if any, with a manual event.
fn reply_manual(server: &mut SimServer) {
    if !server.awaiting_reply() {
        return;
    }

    match server.send_manual() {
        Ok(_) | Err(SimServerError::NoRequest) => (),
        Err(e) => warn!("Couldn't send manual event to the simulator: {}", e),
    }
}

/// Save the best gains after a trial into the session.
fn save_best_gains(session: &Session, trial: &TrialReport, converged: bool) {
    let best = BestGains {
        gains: trial.best_gains,
        error: trial.best_error,
        trials: trial.trial,
        converged,
        timestamp: Utc::now(),
    };

    if converged {
        info!("Tuning complete, best gains {:?}", best.gains);
    }

    session.save("tuner/best_gains.json", best);
}

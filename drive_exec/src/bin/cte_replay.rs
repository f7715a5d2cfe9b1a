//! # CTE Replay
//!
//! Runs a PID controller over the cross track errors recorded in a drive log and writes the
//! contribution of each term per sample to a CSV file, for comparing gains offline.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Result};
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

use drive_lib::{
    cte_log::CteLog,
    pid_ctrl::{Gains, PidController},
};
use util::logger::{logger_init_console, LevelFilter};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "cte_replay", about = "Replay a cross track error log through a PID controller")]
struct Opt {
    /// Proportional gain
    #[structopt(long, default_value = "0.19")]
    kp: f64,

    /// Integral gain
    #[structopt(long, default_value = "0.0016")]
    ki: f64,

    /// Derivative gain
    #[structopt(long, default_value = "3.4")]
    kd: f64,

    /// Bound on the integral
    #[structopt(short, long, default_value = "200.0")]
    bound: f64,

    /// Drive log to replay
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// CSV file to write, one row per sample
    #[structopt(parse(from_os_str), default_value = "cte_replay.csv")]
    output: PathBuf,
}

/// One row of the replay output.
#[derive(Debug, Serialize)]
struct ReplayRecord {
    cte: f64,
    p: f64,
    i: f64,
    d: f64,
    steer: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    let opt = Opt::from_args();

    logger_init_console(LevelFilter::Info).wrap_err("Failed to initialise logging")?;

    let log = CteLog::from_path(&opt.input)
        .wrap_err_with(|| format!("Failed to load the log {:?}", opt.input))?;

    info!(
        "Loaded {} samples from {:?} ({} lines skipped)",
        log.samples().len(),
        opt.input,
        log.num_skipped()
    );

    let gains = Gains::new(opt.kp, opt.ki, opt.kd);
    let mut ctrl = PidController::new(gains, opt.bound);

    let mut writer =
        csv::Writer::from_path(&opt.output).wrap_err("Failed to create the output file")?;

    let mut sum_sq_error = 0.0;
    let mut num_rejected = 0;

    for &cte in log.samples() {
        let integral = ctrl.integral_error();
        ctrl.update_error(cte);

        // A non-zero sample which left the integral untouched was rejected
        if cte != 0.0 && ctrl.integral_error() == integral {
            num_rejected += 1;
        }

        let terms = ctrl.terms();
        writer
            .serialize(ReplayRecord {
                cte,
                p: terms.p,
                i: terms.i,
                d: terms.d,
                steer: ctrl.total_error(),
            })
            .wrap_err("Failed to write a record")?;

        sum_sq_error += cte * cte;
    }

    writer.flush().wrap_err("Failed to flush the output file")?;

    info!("Gains {:?}, integral bound {}", gains, opt.bound);
    info!("Sum of squared errors: {:.4}", sum_sq_error);
    info!("Integral updates rejected: {}", num_rejected);
    info!("Written to {:?}", opt.output);

    Ok(())
}

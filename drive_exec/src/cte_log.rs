//! # Cross track error logs
//!
//! Loads the cross track error samples from a recorded drive so the controller can be replayed
//! offline. Two line formats are understood:
//!
//! ```text
//! CTE: 0.7598 Steering Value: -0.14
//! 0.7598
//! ```
//!
//! Lines with a `CTE:` field use that field, otherwise the line must be a single number. All other
//! lines are skipped.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use regex::RegexBuilder;
use std::fs;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The samples read from a log.
#[derive(Debug, Clone, PartialEq)]
pub struct CteLog {
    samples: Vec<f64>,

    /// Number of non-empty lines which contained no sample
    num_skipped: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CteLogError {
    #[error("Could not read the log file: {0}")]
    LogLoadError(std::io::Error),

    #[error("Could not build the line pattern: {0}")]
    InvalidPattern(regex::Error),

    #[error("The log contains no cross track error samples")]
    LogEmpty,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CteLog {
    /// Load a log from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CteLogError> {
        let log = fs::read_to_string(path).map_err(CteLogError::LogLoadError)?;

        Self::parse(&log)
    }

    /// Parse the contents of a log.
    pub fn parse(log: &str) -> Result<Self, CteLogError> {
        let re = RegexBuilder::new(r"CTE:\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)")
            .case_insensitive(true)
            .build()
            .map_err(CteLogError::InvalidPattern)?;

        let mut samples = vec![];
        let mut num_skipped = 0;

        for line in log.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let field = match re.captures(line).and_then(|c| c.get(1)) {
                Some(m) => m.as_str(),
                None => line,
            };

            match field.parse::<f64>() {
                Ok(s) if s.is_finite() => samples.push(s),
                _ => {
                    debug!("Skipping log line \"{}\"", line);
                    num_skipped += 1;
                }
            }
        }

        if samples.is_empty() {
            return Err(CteLogError::LogEmpty);
        }

        Ok(Self {
            samples,
            num_skipped,
        })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn num_skipped(&self) -> usize {
        self.num_skipped
    }
}

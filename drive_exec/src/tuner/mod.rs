//! # Gain tuning module
//!
//! Tunes the gains of a PID controller while it runs using coordinate ascent ("twiddle").
//!
//! The control loop is run in trials of fixed length. During a trial the squared error of every
//! sample is summed. At the end of a trial one gain is nudged up or down by its step size,
//! depending on whether the last change improved on the best trial so far, and the next trial is
//! run with the new gains. Step sizes grow when a change helps and shrink when neither direction
//! does, so the search slows down as it nears a local optimum.
//!
//! Trial boundaries are decided by a [`TrialClock`] owned by the caller, the tuner itself has no
//! notion of time.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod clock;
mod params;
mod twiddle;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use clock::*;
pub use params::Params;
pub use twiddle::*;

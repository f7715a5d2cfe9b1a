//! PID gain sets

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The three gains of a PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies one of the three gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainId {
    P,
    I,
    D,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Gains {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }

    /// Returns true if all gains are finite numbers.
    pub fn is_finite(&self) -> bool {
        util::maths::all_finite(&[self.k_p, self.k_i, self.k_d])
    }
}

impl GainId {
    /// All gains, in the order the tuner visits them.
    pub const ALL: [GainId; 3] = [GainId::P, GainId::I, GainId::D];

    /// The gain visited after this one, wrapping from D back to P.
    pub fn next(self) -> Self {
        match self {
            GainId::P => GainId::I,
            GainId::I => GainId::D,
            GainId::D => GainId::P,
        }
    }

    /// Position of the gain in the (P, I, D) triple.
    pub fn index(self) -> usize {
        match self {
            GainId::P => 0,
            GainId::I => 1,
            GainId::D => 2,
        }
    }
}

impl Index<GainId> for Gains {
    type Output = f64;

    fn index(&self, id: GainId) -> &f64 {
        match id {
            GainId::P => &self.k_p,
            GainId::I => &self.k_i,
            GainId::D => &self.k_d,
        }
    }
}

impl IndexMut<GainId> for Gains {
    fn index_mut(&mut self, id: GainId) -> &mut f64 {
        match id {
            GainId::P => &mut self.k_p,
            GainId::I => &mut self.k_i,
            GainId::D => &mut self.k_d,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gain_cycle() {
        assert_eq!(GainId::P.next(), GainId::I);
        assert_eq!(GainId::I.next(), GainId::D);
        assert_eq!(GainId::D.next(), GainId::P);

        for (i, id) in GainId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_index() {
        let mut gains = Gains::new(0.19, 0.0016, 3.4);
        assert_eq!(gains[GainId::I], 0.0016);

        gains[GainId::D] += 0.1;
        assert_eq!(gains, Gains::new(0.19, 0.0016, 3.4 + 0.1));
        assert!(gains.is_finite());

        gains[GainId::P] = std::f64::NAN;
        assert!(!gains.is_finite());
    }
}

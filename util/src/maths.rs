//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the closed range `[min, max]`.
///
/// Returns the limited value and whether any limiting took place.
pub fn clamp<T>(value: T, min: T, max: T) -> (T, bool)
where
    T: Float,
{
    if value > max {
        (max, true)
    } else if value < min {
        (min, true)
    } else {
        (value, false)
    }
}

/// Limit a value from above only.
///
/// Returns the limited value and whether any limiting took place.
pub fn clamp_max<T>(value: T, max: T) -> (T, bool)
where
    T: Float,
{
    if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

/// Check that every value in the slice is finite.
pub fn all_finite<T>(values: &[T]) -> bool
where
    T: Float,
{
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0.5f64, -1.0, 1.0), (0.5, false));
        assert_eq!(clamp(1.0f64, -1.0, 1.0), (1.0, false));
        assert_eq!(clamp(1.7f64, -1.0, 1.0), (1.0, true));
        assert_eq!(clamp(-3.0f64, -1.0, 1.0), (-1.0, true));
    }

    #[test]
    fn test_clamp_max() {
        assert_eq!(clamp_max(2.0f64, 1.0), (1.0, true));
        assert_eq!(clamp_max(-20.0f64, 1.0), (-20.0, false));
    }

    #[test]
    fn test_all_finite() {
        assert!(all_finite(&[0.0f64, -4.5, 1e300]));
        assert!(!all_finite(&[0.0f64, std::f64::NAN]));
        assert!(!all_finite(&[std::f64::INFINITY]));
    }
}

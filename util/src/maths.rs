//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the signed difference between two angles in degrees, accounting for
/// wrapping.
///
/// This returns the shortest signed distance `a - b`, so that for example
/// `angle_diff_deg(359, 1) == -2` and not `358`. The result is always in the
/// half-open interval `(-180, 180]`, with ties (opposite angles) mapped to
/// `+180`. Total over all finite inputs.
pub fn angle_diff_deg<T>(a: T, b: T) -> T
where
    T: Float,
{
    let half_turn = T::from(180.0).unwrap();
    let full_turn = T::from(360.0).unwrap();

    // 180 - ((180 - diff) mod 360) maps the raw difference into (-180, 180],
    // with -180 wrapping to +180.
    half_turn - rem_euclid(half_turn - (a - b), full_turn)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Floating point equivalent of `i64::rem_euclid`, which num-traits does not
/// provide.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() {
        r + rhs.abs()
    } else {
        r
    }
}

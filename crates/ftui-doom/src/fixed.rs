//! 16.16 fixed-point arithmetic.
//!
//! Every coordinate, velocity and distance the simulation touches is a
//! [`Fixed`]. Multiplication and division widen to `i64` so intermediate
//! products never overflow; results that do not fit saturate instead of
//! wrapping.

/// Fixed-point value: upper 16 bits integer part, lower 16 bits fraction.
pub type Fixed = i32;

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;
pub const MAXINT: Fixed = i32::MAX;
pub const MININT: Fixed = i32::MIN;

/// Multiply two fixed-point values.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    fixed_clamp((i64::from(a) * i64::from(b)) >> FRACBITS)
}

/// Divide two fixed-point values.
///
/// Division by zero returns `MAXINT` for non-negative dividends and `MININT`
/// otherwise. When `|a| >> 14 >= |b|` the quotient would not fit in 16.16 and
/// saturates toward the sign of the result.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return if a >= 0 { MAXINT } else { MININT };
    }
    if (a.unsigned_abs() >> 14) >= b.unsigned_abs() {
        return if (a ^ b) < 0 { MININT } else { MAXINT };
    }
    fixed_clamp((i64::from(a) << FRACBITS) / i64::from(b))
}

/// Saturate a widened intermediate to the 32-bit signed range.
#[inline]
pub fn fixed_clamp(value: i64) -> Fixed {
    value.clamp(i64::from(MININT), i64::from(MAXINT)) as Fixed
}

#[inline]
pub const fn int_to_fixed(units: i32) -> Fixed {
    units << FRACBITS
}

/// Whole map units, rounding toward negative infinity.
#[inline]
pub const fn fixed_to_int(value: Fixed) -> i32 {
    value >> FRACBITS
}

/// For display and geometry import only.
#[inline]
pub fn fixed_to_float(value: Fixed) -> f64 {
    f64::from(value) / f64::from(FRACUNIT)
}

/// For display and geometry import only.
#[inline]
pub fn float_to_fixed(value: f64) -> Fixed {
    fixed_clamp((value * f64::from(FRACUNIT)) as i64)
}

/// Fast distance approximation used by the AI: `|dx| + |dy| - min/2`.
#[inline]
pub fn approx_distance(dx: Fixed, dy: Fixed) -> Fixed {
    let dx = i64::from(dx).abs();
    let dy = i64::from(dy).abs();
    fixed_clamp(dx + dy - dx.min(dy) / 2)
}

//! Binary angle measure.
//!
//! A full turn is the whole `u32` range, so angle arithmetic wraps for free
//! with `wrapping_add`/`wrapping_sub`. The top 13 bits index the fine
//! trigonometry tables in [`crate::tables`].

use crate::fixed::Fixed;

/// Unsigned 32-bit binary angle.
pub type Angle = u32;

pub const ANG45: Angle = 0x2000_0000;
pub const ANG90: Angle = 0x4000_0000;
pub const ANG180: Angle = 0x8000_0000;
pub const ANG270: Angle = 0xC000_0000;

/// Number of fine angles (2^13 = 8192) used for trig tables.
pub const FINEANGLES: usize = 8192;
/// Mask for fine angle wrapping.
pub const FINEMASK: usize = FINEANGLES - 1;
/// Shift converting a BAM angle to a fine angle index.
pub const ANGLETOFINESHIFT: u32 = 19;

const TURN: f64 = 4_294_967_296.0;

/// Fine table index for a BAM angle.
#[inline]
pub const fn fine_index(angle: Angle) -> usize {
    (angle >> ANGLETOFINESHIFT) as usize & FINEMASK
}

/// Convert radians to BAM, wrapping into one turn.
#[inline]
pub fn radians_to_angle(rad: f64) -> Angle {
    let turns = (rad / std::f64::consts::TAU).rem_euclid(1.0);
    ((turns * TURN) as u64 & 0xFFFF_FFFF) as Angle
}

/// Convert BAM to radians in `[0, TAU)`.
#[inline]
pub fn angle_to_radians(angle: Angle) -> f64 {
    f64::from(angle) / TURN * std::f64::consts::TAU
}

/// Angle of the vector from `(x1, y1)` to `(x2, y2)`.
///
/// Computed with `atan2` and converted back to BAM; a zero vector yields 0.
pub fn point_to_angle(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Angle {
    let dx = f64::from(x2) - f64::from(x1);
    let dy = f64::from(y2) - f64::from(y1);
    if dx == 0.0 && dy == 0.0 {
        return 0;
    }
    radians_to_angle(dy.atan2(dx))
}

/// Signed difference `a - b` interpreted in `(-ANG180, ANG180]`.
#[inline]
pub fn angle_delta(a: Angle, b: Angle) -> i32 {
    a.wrapping_sub(b) as i32
}

//! Precomputed fixed-point trigonometric tables.
//!
//! Doom uses 8192 fine angles for a full circle. The tables are built once
//! on first use and shared read-only afterwards. Sine samples sit at the
//! centre of each fine angle (`i + 0.5`), matching the original tables, so
//! no entry is exactly zero.

use std::sync::OnceLock;

use crate::angle::{FINEANGLES, FINEMASK};
use crate::fixed::{FRACUNIT, Fixed};

/// Sine table with an extra quarter turn so cosine is a plain offset.
static FINE_SINE: OnceLock<Box<[Fixed]>> = OnceLock::new();
/// Tangent table over the half circle `(-90°, 90°)`.
static FINE_TANGENT: OnceLock<Box<[Fixed]>> = OnceLock::new();

fn init_sine() -> Box<[Fixed]> {
    (0..5 * FINEANGLES / 4)
        .map(|i| {
            let a = (i as f64 + 0.5) * std::f64::consts::TAU / FINEANGLES as f64;
            (f64::from(FRACUNIT) * a.sin()) as Fixed
        })
        .collect()
}

fn init_tangent() -> Box<[Fixed]> {
    (0..FINEANGLES / 2)
        .map(|i| {
            let a = (i as f64 - (FINEANGLES / 4) as f64 + 0.5) * std::f64::consts::TAU
                / FINEANGLES as f64;
            let t = f64::from(FRACUNIT) * a.tan();
            t.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as Fixed
        })
        .collect()
}

/// Sine of a fine angle index, wrapped into one turn.
#[inline]
pub fn fine_sine(fine: usize) -> Fixed {
    FINE_SINE.get_or_init(init_sine)[fine & FINEMASK]
}

/// Cosine of a fine angle index, wrapped into one turn.
#[inline]
pub fn fine_cosine(fine: usize) -> Fixed {
    FINE_SINE.get_or_init(init_sine)[(fine & FINEMASK) + FINEANGLES / 4]
}

/// Tangent over the half-circle table; index 0 is just past -90 degrees and
/// `FINEANGLES / 4` is zero. Indices wrap at `FINEANGLES / 2`.
#[inline]
pub fn fine_tangent(fine: usize) -> Fixed {
    FINE_TANGENT.get_or_init(init_tangent)[fine % (FINEANGLES / 2)]
}

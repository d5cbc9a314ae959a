//! Visplanes: floor and ceiling areas collected while walls are drawn.
//!
//! Each visible floor or ceiling column is recorded into the plane keyed by
//! its height, flat and light level. After the walls, every plane is turned
//! into horizontal spans and drawn in one pass.

use crate::constants::MAXVISPLANES;
use crate::fixed::Fixed;

/// Top value of a column the plane does not cover.
pub const VP_UNUSED: u16 = u16::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visplane {
    pub height: Fixed,
    pub picnum: usize,
    pub light_level: i32,
    /// Covered column range; `minx > maxx` while empty.
    pub minx: i32,
    pub maxx: i32,
    pub top: Vec<u16>,
    pub bottom: Vec<u16>,
}

impl Visplane {
    fn new(height: Fixed, picnum: usize, light_level: i32, width: usize) -> Self {
        Self {
            height,
            picnum,
            light_level,
            minx: width as i32,
            maxx: -1,
            top: vec![VP_UNUSED; width],
            bottom: vec![0; width],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.minx > self.maxx
    }

    /// Rows covered at column `x`, `None` where unused.
    pub fn column(&self, x: i32) -> Option<(i32, i32)> {
        let x = usize::try_from(x).ok()?;
        let top = *self.top.get(x)?;
        let bottom = *self.bottom.get(x)?;
        (top != VP_UNUSED && top <= bottom).then_some((i32::from(top), i32::from(bottom)))
    }

    /// Whether any column in `start..=stop` is already taken.
    fn occupied(&self, start: i32, stop: i32) -> bool {
        (start.max(0)..=stop.min(self.top.len() as i32 - 1))
            .any(|x| self.top[x as usize] != VP_UNUSED)
    }

    /// Emit the plane as horizontal spans `(y, x1, x2)`, inclusive.
    ///
    /// Walks columns left to right, opening a span on each row a column
    /// starts covering and closing it where coverage ends.
    pub fn spans(&self, view_height: usize, mut emit: impl FnMut(i32, i32, i32)) {
        if self.is_empty() {
            return;
        }
        let mut span_start = vec![0i32; view_height];
        let edge = |x: i32| self.column(x).unwrap_or((i32::from(VP_UNUSED), 0));
        for x in self.minx..=self.maxx + 1 {
            let (mut t1, mut b1) = edge(x - 1);
            let (mut t2, mut b2) = edge(x);
            while t1 < t2 && t1 <= b1 {
                emit(t1, start_of(&span_start, t1), x - 1);
                t1 += 1;
            }
            while b1 > b2 && b1 >= t1 {
                emit(b1, start_of(&span_start, b1), x - 1);
                b1 -= 1;
            }
            while t2 < t1 && t2 <= b2 {
                if let Some(s) = span_start.get_mut(t2 as usize) {
                    *s = x;
                }
                t2 += 1;
            }
            while b2 > b1 && b2 >= t2 {
                if let Some(s) = span_start.get_mut(b2 as usize) {
                    *s = x;
                }
                b2 -= 1;
            }
        }
    }
}

#[inline]
fn start_of(span_start: &[i32], y: i32) -> i32 {
    span_start.get(y as usize).copied().unwrap_or(0)
}

/// All visplanes of one frame.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    planes: Vec<Visplane>,
    width: usize,
    sky_picnum: Option<usize>,
}

impl PlaneSet {
    pub fn new(width: usize, sky_picnum: Option<usize>) -> Self {
        Self {
            planes: Vec::with_capacity(MAXVISPLANES),
            width,
            sky_picnum,
        }
    }

    /// Drop every plane, for the next frame or a new width.
    pub fn clear(&mut self, width: usize) {
        self.planes.clear();
        self.width = width;
    }

    pub fn set_sky_picnum(&mut self, picnum: Option<usize>) {
        self.sky_picnum = picnum;
    }

    #[inline]
    pub fn is_sky(&self, picnum: usize) -> bool {
        self.sky_picnum == Some(picnum)
    }

    /// Plane for a `(height, picnum, light)` key, created empty on first use.
    /// Sky planes all share one key regardless of height and light.
    pub fn find_plane(&mut self, height: Fixed, picnum: usize, light_level: i32) -> usize {
        let (height, light_level) = if self.is_sky(picnum) {
            (0, 0)
        } else {
            (height, light_level)
        };
        if let Some(i) = self.planes.iter().position(|p| {
            p.height == height && p.picnum == picnum && p.light_level == light_level
        }) {
            return i;
        }
        self.planes
            .push(Visplane::new(height, picnum, light_level, self.width));
        self.planes.len() - 1
    }

    /// Make room for columns `start..=stop` in `plane`. Widens it in place
    /// when those columns are free, otherwise starts a sibling plane with
    /// the same key.
    pub fn check_plane(&mut self, plane: usize, start: i32, stop: i32) -> usize {
        let Some(pl) = self.planes.get_mut(plane) else {
            return plane;
        };
        let inter_lo = start.max(pl.minx);
        let inter_hi = stop.min(pl.maxx);
        if !pl.occupied(inter_lo, inter_hi) {
            pl.minx = pl.minx.min(start);
            pl.maxx = pl.maxx.max(stop);
            return plane;
        }
        let (height, picnum, light) = (pl.height, pl.picnum, pl.light_level);
        let mut fresh = Visplane::new(height, picnum, light, self.width);
        fresh.minx = start;
        fresh.maxx = stop;
        self.planes.push(fresh);
        self.planes.len() - 1
    }

    /// Record rows `top..=bottom` of column `x`, clipped to the top of the
    /// screen. Inverted ranges and columns off the plane are ignored.
    pub fn set_plane_column(&mut self, plane: usize, x: i32, top: i32, bottom: i32) {
        if top > bottom || bottom < 0 {
            return;
        }
        let top = top.max(0);
        let Some(pl) = self.planes.get_mut(plane) else {
            return;
        };
        let Some(col) = usize::try_from(x).ok().filter(|&c| c < pl.top.len()) else {
            return;
        };
        pl.top[col] = top.min(i32::from(VP_UNUSED) - 1) as u16;
        pl.bottom[col] = bottom.min(i32::from(VP_UNUSED) - 1) as u16;
        pl.minx = pl.minx.min(x);
        pl.maxx = pl.maxx.max(x);
    }

    #[inline]
    pub fn get(&self, plane: usize) -> Option<&Visplane> {
        self.planes.get(plane)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Visplane> {
        self.planes.iter()
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
}

//! Per-viewport projection and lighting tables.
//!
//! Rebuilt whenever the render size changes. [`RenderTables::update_flat_scales`]
//! is the only per-frame part.

use crate::angle::{ANG90, ANGLETOFINESHIFT, Angle, FINEANGLES, fine_index};
use crate::constants::{
    DISTMAP, FIELDOFVIEW, LIGHTLEVELS, LIGHTSCALESHIFT, LIGHTSEGSHIFT, LIGHTZSHIFT, MAXLIGHTSCALE,
    MAXLIGHTZ, NUMCOLORMAPS, SCREENHEIGHT, SCREENWIDTH,
};
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul};
use crate::tables::{fine_cosine, fine_sine, fine_tangent};

/// Largest wall scale; closer walls are clamped to it.
pub const MAX_WALL_SCALE: Fixed = 64 * FRACUNIT;
/// Smallest wall scale.
pub const MIN_WALL_SCALE: Fixed = 256;

#[derive(Debug, Clone)]
pub struct RenderTables {
    pub width: usize,
    pub height: usize,
    pub center_x: i32,
    pub center_y: i32,
    pub center_x_frac: Fixed,
    pub center_y_frac: Fixed,
    /// Screen columns per unit of `x / distance`.
    pub projection: Fixed,
    /// Fine angle (relative to the view, offset by 90°) to screen column.
    pub view_angle_to_x: Vec<i32>,
    /// Screen column to the smallest view-relative angle that maps to it.
    pub x_to_view_angle: Vec<Angle>,
    /// View-relative angle of column 0; wider angles are off screen.
    pub clip_angle: Angle,
    /// Per column `1 / cos(angle)`, for distance along the view ray.
    pub dist_scale: Vec<Fixed>,
    /// Per row, distance to a plane one unit away vertically.
    pub y_slope: Vec<Fixed>,
    /// Wall colormap by light row and scale bucket.
    pub scale_light: Vec<[u8; MAXLIGHTSCALE]>,
    /// Flat colormap by light row and distance bucket.
    pub z_light: Vec<[u8; MAXLIGHTZ]>,
    pub base_x_scale: Fixed,
    pub base_y_scale: Fixed,
    /// Weapon sprite scale against the 320×200 reference screen.
    pub psprite_scale: Fixed,
    pub psprite_iscale: Fixed,
    pub psprite_yscale: Fixed,
}

impl RenderTables {
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let center_x = (width / 2) as i32;
        let center_y = (height / 2) as i32;
        let center_x_frac = center_x << FRACBITS;
        let center_y_frac = center_y << FRACBITS;

        let view_angle_to_x = view_angle_to_x(width as i32, center_x_frac);
        let x_to_view_angle: Vec<Angle> = (0..=width as i32)
            .map(|x| {
                let i = view_angle_to_x
                    .iter()
                    .position(|&t| t <= x)
                    .unwrap_or(FINEANGLES / 2 - 1);
                ((i as u32) << ANGLETOFINESHIFT).wrapping_sub(ANG90)
            })
            .collect();
        // Resolve the off-screen sentinels now that the inverse is built.
        let view_angle_to_x = view_angle_to_x
            .into_iter()
            .map(|t| t.clamp(0, width as i32))
            .collect();

        let dist_scale = x_to_view_angle[..width]
            .iter()
            .map(|&a| fixed_div(FRACUNIT, fine_cosine(fine_index(a)).abs()))
            .collect();
        let y_slope = (0..height as i32)
            .map(|y| {
                let dy = (((y - center_y) << FRACBITS) + FRACUNIT / 2).abs();
                fixed_div(center_x_frac, dy)
            })
            .collect();

        let tables = Self {
            width,
            height,
            center_x,
            center_y,
            center_x_frac,
            center_y_frac,
            projection: center_x_frac,
            clip_angle: x_to_view_angle[0],
            view_angle_to_x,
            x_to_view_angle,
            dist_scale,
            y_slope,
            scale_light: scale_light(width),
            z_light: z_light(),
            base_x_scale: 0,
            base_y_scale: 0,
            psprite_scale: (FRACUNIT as i64 * width as i64 / SCREENWIDTH as i64) as Fixed,
            psprite_iscale: (FRACUNIT as i64 * SCREENWIDTH as i64 / width as i64) as Fixed,
            psprite_yscale: (FRACUNIT as i64 * height as i64 / SCREENHEIGHT as i64) as Fixed,
        };
        tracing::debug!(width, height, "render tables built");
        tables
    }

    /// Flat texture steps for the current view direction.
    pub fn update_flat_scales(&mut self, view_angle: Angle) {
        let fine = fine_index(view_angle.wrapping_sub(ANG90));
        self.base_x_scale = fixed_div(fine_cosine(fine), self.center_x_frac);
        self.base_y_scale = -fixed_div(fine_sine(fine), self.center_x_frac);
    }

    /// Screen column of a view-relative angle inside the field of view.
    #[inline]
    pub fn angle_to_x(&self, relative: Angle) -> i32 {
        let fine = (relative.wrapping_add(ANG90) >> ANGLETOFINESHIFT) as usize;
        self.view_angle_to_x
            .get(fine)
            .copied()
            .unwrap_or(self.width as i32)
    }

    /// Wall scale at `vis_angle` for a wall facing `normal_angle` whose
    /// perpendicular distance from the viewer is `distance`.
    pub fn scale_from_global_angle(
        &self,
        view_angle: Angle,
        vis_angle: Angle,
        normal_angle: Angle,
        distance: Fixed,
    ) -> Fixed {
        let angle_a = ANG90.wrapping_add(vis_angle.wrapping_sub(view_angle));
        let angle_b = ANG90.wrapping_add(vis_angle.wrapping_sub(normal_angle));
        let sine_a = fine_sine(fine_index(angle_a));
        let sine_b = fine_sine(fine_index(angle_b));
        let num = fixed_mul(self.projection, sine_b);
        let den = fixed_mul(distance, sine_a);
        if den > num >> FRACBITS {
            fixed_div(num, den).clamp(MIN_WALL_SCALE, MAX_WALL_SCALE)
        } else {
            MAX_WALL_SCALE
        }
    }

    /// Wall colormap for a sector light level at a given scale.
    pub fn wall_light(&self, light_level: i32, extra: i32, scale: Fixed) -> i32 {
        let row = light_row(light_level, extra);
        let bucket = ((scale >> LIGHTSCALESHIFT).max(0) as usize).min(MAXLIGHTSCALE - 1);
        i32::from(self.scale_light[row][bucket])
    }

    /// Flat colormap for a sector light level at a given distance.
    pub fn plane_light(&self, light_level: i32, extra: i32, distance: Fixed) -> i32 {
        let row = light_row(light_level, extra);
        let bucket = ((distance >> LIGHTZSHIFT).max(0) as usize).min(MAXLIGHTZ - 1);
        i32::from(self.z_light[row][bucket])
    }
}

/// Light table row for a sector light level (0..=255).
#[inline]
pub fn light_row(light_level: i32, extra: i32) -> usize {
    ((light_level >> LIGHTSEGSHIFT) + extra).clamp(0, LIGHTLEVELS as i32 - 1) as usize
}

/// Raw angle-to-column table; `-1` and `width + 1` mark angles off either
/// edge until the caller resolves them.
fn view_angle_to_x(width: i32, center_x_frac: Fixed) -> Vec<i32> {
    let focal_length = fixed_div(center_x_frac, fine_tangent(FINEANGLES / 4 + FIELDOFVIEW / 2));
    (0..FINEANGLES / 2)
        .map(|i| {
            let tan = fine_tangent(i);
            if tan > FRACUNIT * 2 {
                -1
            } else if tan < -FRACUNIT * 2 {
                width + 1
            } else {
                let t = fixed_mul(tan, focal_length);
                ((center_x_frac - t + FRACUNIT - 1) >> FRACBITS).clamp(-1, width + 1)
            }
        })
        .collect()
}

#[inline]
fn start_map(row: usize) -> i32 {
    (((LIGHTLEVELS - 1 - row) * 2 * NUMCOLORMAPS) / LIGHTLEVELS) as i32
}

fn scale_light(width: usize) -> Vec<[u8; MAXLIGHTSCALE]> {
    (0..LIGHTLEVELS)
        .map(|row| {
            let mut levels = [0u8; MAXLIGHTSCALE];
            for (j, level) in levels.iter_mut().enumerate() {
                let fade = (j * SCREENWIDTH / width) as i32 / DISTMAP;
                *level = (start_map(row) - fade).clamp(0, NUMCOLORMAPS as i32 - 1) as u8;
            }
            levels
        })
        .collect()
}

fn z_light() -> Vec<[u8; MAXLIGHTZ]> {
    (0..LIGHTLEVELS)
        .map(|row| {
            let mut levels = [0u8; MAXLIGHTZ];
            for (j, level) in levels.iter_mut().enumerate() {
                let scale = fixed_div(
                    (SCREENWIDTH as i32 / 2) * FRACUNIT,
                    ((j as i32) + 1) << LIGHTZSHIFT,
                ) >> LIGHTSCALESHIFT;
                *level = (start_map(row) - scale / DISTMAP).clamp(0, NUMCOLORMAPS as i32 - 1) as u8;
            }
            levels
        })
        .collect()
}

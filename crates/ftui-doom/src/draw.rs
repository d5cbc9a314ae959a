//! Low-level column and span writers.
//!
//! Everything the renderer puts on screen goes through these: a texture
//! column scaled vertically, a run of post pixels from a masked picture, or
//! a horizontal flat span. Palette indices are shaded through a colormap and
//! resolved to RGBA before they reach the [`PixelSink`].

use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::flats::Flat;
use crate::framebuffer::{PixelSink, Rgba};
use crate::palette::DoomPalette;
use crate::picture::Post;

/// One vertical texture run.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDraw<'a> {
    pub x: i32,
    /// First and last screen rows, inclusive.
    pub y_low: i32,
    pub y_high: i32,
    /// Texture row at the screen centre line.
    pub texture_mid: Fixed,
    /// Texture rows per screen row.
    pub iscale: Fixed,
    pub center_y: i32,
    /// Texels, indexed with wraparound.
    pub source: &'a [u8],
    /// Colormap level.
    pub light: i32,
}

/// Draw a texture column. Rows outside the sink are skipped; an empty
/// range (`y_high < y_low`) or empty source draws nothing.
pub fn draw_column<S: PixelSink + ?Sized>(sink: &mut S, palette: &DoomPalette, col: &ColumnDraw<'_>) {
    if col.y_high < col.y_low || col.source.is_empty() || !column_on_screen(sink, col.x) {
        return;
    }
    let (y_low, y_high) = clip_rows(sink, col.y_low, col.y_high);
    let len = col.source.len() as i32;
    let mut frac = col
        .texture_mid
        .wrapping_add(col.iscale.wrapping_mul(y_low - col.center_y));
    for y in y_low..=y_high {
        let texel = col.source[(frac >> FRACBITS).rem_euclid(len) as usize];
        sink.put_pixel(col.x as u32, y as u32, palette.rgba(col.light, texel));
        frac = frac.wrapping_add(col.iscale);
    }
}

/// Solid run of one colour.
pub fn fill_column<S: PixelSink + ?Sized>(sink: &mut S, x: i32, y_low: i32, y_high: i32, color: Rgba) {
    if y_high < y_low || !column_on_screen(sink, x) {
        return;
    }
    let (y_low, y_high) = clip_rows(sink, y_low, y_high);
    for y in y_low..=y_high {
        sink.put_pixel(x as u32, y as u32, color);
    }
}

/// One column of a post-encoded picture.
#[derive(Debug, Clone, Copy)]
pub struct MaskedColumn<'a> {
    pub x: i32,
    pub posts: &'a [Post],
    /// Texture row at the screen centre line for picture row 0.
    pub texture_mid: Fixed,
    /// Screen row of picture row 0, fixed point.
    pub sprite_top: Fixed,
    /// Screen rows per picture row.
    pub scale: Fixed,
    pub iscale: Fixed,
    pub center_y: i32,
    /// Visible rows, inclusive. Walls in front shrink this window.
    pub clip_top: i32,
    pub clip_bottom: i32,
    pub light: i32,
}

/// Draw every post of a masked column, leaving gaps transparent.
pub fn draw_masked_column<S: PixelSink + ?Sized>(
    sink: &mut S,
    palette: &DoomPalette,
    col: &MaskedColumn<'_>,
) {
    for post in col.posts {
        let top_delta = post.top_delta as i32;
        let length = post.pixels.len() as i32;
        let top_screen = col
            .sprite_top
            .saturating_add(fixed_mul(col.scale, top_delta << FRACBITS));
        let bottom_screen = top_screen.saturating_add(fixed_mul(col.scale, length << FRACBITS));
        let y_low = (top_screen.saturating_add(FRACUNIT - 1) >> FRACBITS).max(col.clip_top);
        let y_high = ((bottom_screen - 1) >> FRACBITS).min(col.clip_bottom);
        if y_low > y_high {
            continue;
        }
        draw_post(sink, palette, col, post, y_low, y_high);
    }
}

/// Post pixels are indexed without wraparound: texture rows past the end
/// of the post clamp to its last pixel.
fn draw_post<S: PixelSink + ?Sized>(
    sink: &mut S,
    palette: &DoomPalette,
    col: &MaskedColumn<'_>,
    post: &Post,
    y_low: i32,
    y_high: i32,
) {
    if post.pixels.is_empty() || !column_on_screen(sink, col.x) {
        return;
    }
    let (y_low, y_high) = clip_rows(sink, y_low, y_high);
    let mid = col
        .texture_mid
        .wrapping_sub((post.top_delta as i32) << FRACBITS);
    let last = post.pixels.len() as i32 - 1;
    let mut frac = mid.wrapping_add(col.iscale.wrapping_mul(y_low - col.center_y));
    for y in y_low..=y_high {
        let texel = post.pixels[(frac >> FRACBITS).clamp(0, last) as usize];
        sink.put_pixel(col.x as u32, y as u32, palette.rgba(col.light, texel));
        frac = frac.wrapping_add(col.iscale);
    }
}

/// One horizontal run of a flat.
#[derive(Debug, Clone, Copy)]
pub struct SpanDraw<'a> {
    pub y: i32,
    /// First and last columns, inclusive.
    pub x1: i32,
    pub x2: i32,
    /// Flat coordinates at `x1`, and their per-column steps.
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    pub flat: &'a Flat,
    pub light: i32,
}

pub fn draw_span<S: PixelSink + ?Sized>(sink: &mut S, palette: &DoomPalette, span: &SpanDraw<'_>) {
    if span.x2 < span.x1 || span.y < 0 || span.y >= sink.height() as i32 {
        return;
    }
    let mut xfrac = span.xfrac;
    let mut yfrac = span.yfrac;
    let width = sink.width() as i32;
    for x in span.x1..=span.x2 {
        if (0..width).contains(&x) {
            let texel = span.flat.texel(xfrac >> FRACBITS, yfrac >> FRACBITS);
            sink.put_pixel(x as u32, span.y as u32, palette.rgba(span.light, texel));
        }
        xfrac = xfrac.wrapping_add(span.xstep);
        yfrac = yfrac.wrapping_add(span.ystep);
    }
}

#[inline]
fn column_on_screen<S: PixelSink + ?Sized>(sink: &S, x: i32) -> bool {
    x >= 0 && (x as u32) < sink.width()
}

#[inline]
fn clip_rows<S: PixelSink + ?Sized>(sink: &S, y_low: i32, y_high: i32) -> (i32, i32) {
    (y_low.max(0), y_high.min(sink.height() as i32 - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flats::{FLAT_BYTES, FLAT_SIZE};
    use crate::framebuffer::DoomFramebuffer;

    const U: Fixed = FRACUNIT;

    fn gray(i: u8) -> Rgba {
        Rgba::rgb(i, i, i)
    }

    fn column(source: &[u8]) -> ColumnDraw<'_> {
        ColumnDraw {
            x: 2,
            y_low: 0,
            y_high: 7,
            texture_mid: 4 * U,
            iscale: U,
            center_y: 4,
            source,
            light: 0,
        }
    }

    #[test]
    fn unit_scale_maps_rows_to_texels() {
        let mut fb = DoomFramebuffer::new(4, 8);
        let pal = DoomPalette::default_palette();
        let source: Vec<u8> = (10..18).collect();
        draw_column(&mut fb, &pal, &column(&source));
        for y in 0..8 {
            assert_eq!(fb.get_pixel(2, y), gray(10 + y as u8));
        }
    }

    #[test]
    fn half_scale_repeats_texels() {
        let mut fb = DoomFramebuffer::new(4, 8);
        let pal = DoomPalette::default_palette();
        let source = [50u8, 60, 70, 80];
        let mut col = column(&source);
        col.iscale = U / 2;
        col.texture_mid = 2 * U;
        draw_column(&mut fb, &pal, &col);
        assert_eq!(fb.get_pixel(2, 0), gray(50));
        assert_eq!(fb.get_pixel(2, 1), gray(50));
        assert_eq!(fb.get_pixel(2, 2), gray(60));
        assert_eq!(fb.get_pixel(2, 7), gray(80));
    }

    #[test]
    fn texture_wraps_vertically() {
        let mut fb = DoomFramebuffer::new(4, 8);
        let pal = DoomPalette::default_palette();
        let source = [1u8, 2];
        draw_column(&mut fb, &pal, &column(&source));
        assert_eq!(fb.get_pixel(2, 0), gray(1));
        assert_eq!(fb.get_pixel(2, 5), gray(2));
    }

    #[test]
    fn colormap_darkens() {
        let mut fb = DoomFramebuffer::new(4, 8);
        let pal = DoomPalette::default_palette();
        let source = [200u8; 8];
        let mut col = column(&source);
        col.light = 16;
        draw_column(&mut fb, &pal, &col);
        let shaded = fb.get_pixel(2, 3);
        assert!(shaded.r() < 200);
        assert_eq!(shaded, pal.rgba(16, 200));
    }

    #[test]
    fn out_of_bounds_and_empty_columns_are_ignored() {
        let mut fb = DoomFramebuffer::new(4, 8);
        let pal = DoomPalette::default_palette();
        let source = [9u8; 4];
        let mut col = column(&source);
        col.x = 4;
        draw_column(&mut fb, &pal, &col);
        col.x = 1;
        col.y_low = 5;
        col.y_high = 4;
        draw_column(&mut fb, &pal, &col);
        col.y_low = -10;
        col.y_high = 100;
        col.source = &[];
        draw_column(&mut fb, &pal, &col);
        assert!(fb.pixels.iter().all(|&p| p == Rgba::BLACK));
    }

    #[test]
    fn fill_column_clips() {
        let mut fb = DoomFramebuffer::new(2, 4);
        fill_column(&mut fb, 1, -3, 1, Rgba::RED);
        assert_eq!(fb.get_pixel(1, 0), Rgba::RED);
        assert_eq!(fb.get_pixel(1, 1), Rgba::RED);
        assert_eq!(fb.get_pixel(1, 2), Rgba::BLACK);
    }

    fn masked(posts: &[Post]) -> MaskedColumn<'_> {
        MaskedColumn {
            x: 0,
            posts,
            texture_mid: 0,
            sprite_top: 0,
            scale: U,
            iscale: U,
            center_y: 0,
            clip_top: 0,
            clip_bottom: 9,
            light: 0,
        }
    }

    #[test]
    fn masked_column_leaves_gaps() {
        let mut fb = DoomFramebuffer::new(1, 10);
        let pal = DoomPalette::default_palette();
        let posts = [
            Post {
                top_delta: 1,
                pixels: vec![11, 12],
            },
            Post {
                top_delta: 6,
                pixels: vec![21],
            },
        ];
        draw_masked_column(&mut fb, &pal, &masked(&posts));
        assert_eq!(fb.get_pixel(0, 0), Rgba::BLACK);
        assert_eq!(fb.get_pixel(0, 1), gray(11));
        assert_eq!(fb.get_pixel(0, 2), gray(12));
        assert_eq!(fb.get_pixel(0, 3), Rgba::BLACK);
        assert_eq!(fb.get_pixel(0, 6), gray(21));
        assert_eq!(fb.get_pixel(0, 7), Rgba::BLACK);
    }

    #[test]
    fn masked_column_respects_clip_window() {
        let mut fb = DoomFramebuffer::new(1, 10);
        let pal = DoomPalette::default_palette();
        let posts = [Post {
            top_delta: 0,
            pixels: (1..=8).collect(),
        }];
        let mut col = masked(&posts);
        col.clip_top = 2;
        col.clip_bottom = 4;
        draw_masked_column(&mut fb, &pal, &col);
        assert_eq!(fb.get_pixel(0, 1), Rgba::BLACK);
        assert_eq!(fb.get_pixel(0, 2), gray(3));
        assert_eq!(fb.get_pixel(0, 4), gray(5));
        assert_eq!(fb.get_pixel(0, 5), Rgba::BLACK);
    }

    #[test]
    fn masked_column_scales() {
        let mut fb = DoomFramebuffer::new(1, 10);
        let pal = DoomPalette::default_palette();
        let posts = [Post {
            top_delta: 0,
            pixels: vec![40, 80],
        }];
        let mut col = masked(&posts);
        col.scale = 2 * U;
        col.iscale = U / 2;
        draw_masked_column(&mut fb, &pal, &col);
        assert_eq!(fb.get_pixel(0, 0), gray(40));
        assert_eq!(fb.get_pixel(0, 1), gray(40));
        assert_eq!(fb.get_pixel(0, 2), gray(80));
        assert_eq!(fb.get_pixel(0, 3), gray(80));
        assert_eq!(fb.get_pixel(0, 4), Rgba::BLACK);
    }

    #[test]
    fn span_steps_through_flat() {
        let mut fb = DoomFramebuffer::new(4, 2);
        let pal = DoomPalette::default_palette();
        let mut pixels = vec![0u8; FLAT_BYTES];
        for (u, p) in pixels.iter_mut().take(FLAT_SIZE).enumerate() {
            *p = u as u8 + 100;
        }
        let flat = Flat {
            name: "ROW".into(),
            pixels,
        };
        draw_span(
            &mut fb,
            &pal,
            &SpanDraw {
                y: 1,
                x1: -1,
                x2: 3,
                xfrac: 0,
                yfrac: 0,
                xstep: 2 * U,
                ystep: 0,
                flat: &flat,
                light: 0,
            },
        );
        // Column -1 consumed texel 0 off screen.
        assert_eq!(fb.get_pixel(0, 1), gray(102));
        assert_eq!(fb.get_pixel(3, 1), gray(108));
        assert_eq!(fb.get_pixel(0, 0), Rgba::BLACK);
    }
}

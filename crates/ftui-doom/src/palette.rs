//! Doom palette (PLAYPAL) and light mapping (COLORMAP).
//!
//! PLAYPAL holds 14 palettes of 256 RGB triples (the normal palette plus
//! damage/pickup tints). COLORMAP holds 34 remap tables: brightness levels
//! 0 (full) to 31 (darkest), then invulnerability and all-black.

use crate::constants::{COLORMAP_LEVELS, NUMCOLORMAPS, PLAYPAL_PALETTES};
use crate::error::AssetError;
use crate::framebuffer::Rgba;

pub const PALETTE_BYTES: usize = 256 * 3;
pub const PLAYPAL_SIZE: usize = PLAYPAL_PALETTES * PALETTE_BYTES;
pub const COLORMAP_SIZE: usize = COLORMAP_LEVELS * 256;

/// One 256-colour palette.
pub type Palette = [[u8; 3]; 256];

/// Parse the PLAYPAL lump into 14 palettes.
pub fn parse_playpal(bytes: &[u8]) -> Result<Vec<Palette>, AssetError> {
    if bytes.len() < PLAYPAL_SIZE {
        return Err(AssetError::PlaypalTooSmall {
            len: bytes.len(),
            need: PLAYPAL_SIZE,
        });
    }
    let palettes = bytes[..PLAYPAL_SIZE]
        .chunks_exact(PALETTE_BYTES)
        .map(|chunk| {
            let mut pal = [[0u8; 3]; 256];
            for (dst, rgb) in pal.iter_mut().zip(chunk.chunks_exact(3)) {
                *dst = [rgb[0], rgb[1], rgb[2]];
            }
            pal
        })
        .collect();
    Ok(palettes)
}

/// Parse the COLORMAP lump into 34 remap tables.
pub fn parse_colormap(bytes: &[u8]) -> Result<Vec<[u8; 256]>, AssetError> {
    if bytes.len() < COLORMAP_SIZE {
        return Err(AssetError::ColormapTooSmall {
            len: bytes.len(),
            need: COLORMAP_SIZE,
        });
    }
    let maps = bytes[..COLORMAP_SIZE]
        .chunks_exact(256)
        .map(|chunk| {
            let mut map = [0u8; 256];
            map.copy_from_slice(chunk);
            map
        })
        .collect();
    Ok(maps)
}

/// Remap a palette index through the colormap for `level`.
///
/// `level` is clamped to the brightness range `0..=31`. A missing table
/// leaves the index unchanged.
#[inline]
pub fn shade_color(colormaps: &[[u8; 256]], level: i32, index: u8) -> u8 {
    let level = level.clamp(0, NUMCOLORMAPS as i32 - 1) as usize;
    colormaps
        .get(level)
        .map_or(index, |map| map[usize::from(index)])
}

/// Palette index to opaque RGBA under a light level.
///
/// An out-of-range palette number yields opaque black.
#[inline]
pub fn palette_to_rgba(
    palettes: &[Palette],
    colormaps: &[[u8; 256]],
    palette: usize,
    level: i32,
    index: u8,
) -> Rgba {
    let shaded = shade_color(colormaps, level, index);
    palettes.get(palette).map_or(Rgba::BLACK, |pal| {
        let [r, g, b] = pal[usize::from(shaded)];
        Rgba::rgb(r, g, b)
    })
}

/// Palette and colormaps loaded for the current level.
#[derive(Debug, Clone)]
pub struct DoomPalette {
    /// 14 palettes from PLAYPAL.
    pub palettes: Vec<Palette>,
    /// 34 colormaps (0 = brightest, 31 = darkest, 32-33 = special).
    pub colormaps: Vec<[u8; 256]>,
    /// Palette currently shown (damage/pickup flashes select others).
    pub active: usize,
}

impl DoomPalette {
    /// Build from raw PLAYPAL and COLORMAP lumps.
    pub fn from_lumps(playpal: &[u8], colormap: &[u8]) -> Result<Self, AssetError> {
        Ok(Self {
            palettes: parse_playpal(playpal)?,
            colormaps: parse_colormap(colormap)?,
            active: 0,
        })
    }

    /// A grayscale palette with linear darkening, for running without a WAD.
    pub fn default_palette() -> Self {
        let mut pal = [[0u8; 3]; 256];
        for (i, rgb) in pal.iter_mut().enumerate() {
            *rgb = [i as u8; 3];
        }
        Self {
            palettes: vec![pal; PLAYPAL_PALETTES],
            colormaps: Self::generate_default_colormaps(),
            active: 0,
        }
    }

    /// Darken toward black as level increases; the two special maps are black.
    fn generate_default_colormaps() -> Vec<[u8; 256]> {
        (0..COLORMAP_LEVELS)
            .map(|level| {
                let mut map = [0u8; 256];
                if level < NUMCOLORMAPS {
                    let keep = (NUMCOLORMAPS - level) as u32;
                    for (i, slot) in map.iter_mut().enumerate() {
                        *slot = ((i as u32 * keep) / NUMCOLORMAPS as u32) as u8;
                    }
                }
                map
            })
            .collect()
    }

    /// Select the active palette, clamped to what was loaded.
    pub fn set_active(&mut self, palette: usize) {
        self.active = palette.min(self.palettes.len().saturating_sub(1));
    }

    #[inline]
    pub fn shade(&self, level: i32, index: u8) -> u8 {
        shade_color(&self.colormaps, level, index)
    }

    /// Shaded colour through the active palette.
    #[inline]
    pub fn rgba(&self, level: i32, index: u8) -> Rgba {
        palette_to_rgba(&self.palettes, &self.colormaps, self.active, level, index)
    }

    /// Unshaded colour through the active palette.
    #[inline]
    pub fn color(&self, index: u8) -> Rgba {
        self.rgba(0, index)
    }
}

impl Default for DoomPalette {
    fn default() -> Self {
        Self::default_palette()
    }
}

//! Floor and ceiling textures.
//!
//! Flats are raw 64×64 palette-index lumps between `F_START` and `F_END`.
//! Renderers refer to them by number (`picnum`), resolved once per sector.

use std::collections::HashMap;

use crate::constants::SKY_FLAT_NAME;
use crate::error::{AssetError, WadError};
use crate::wad::WadFile;

pub const FLAT_START: &str = "F_START";
pub const FLAT_END: &str = "F_END";
/// Edge length of a flat.
pub const FLAT_SIZE: usize = 64;
pub const FLAT_BYTES: usize = FLAT_SIZE * FLAT_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flat {
    pub name: String,
    /// Row-major palette indices, `FLAT_BYTES` long.
    pub pixels: Vec<u8>,
}

impl Flat {
    /// Texel at flat coordinates; both wrap at 64.
    #[inline]
    pub fn texel(&self, u: i32, v: i32) -> u8 {
        let u = (u & (FLAT_SIZE as i32 - 1)) as usize;
        let v = (v & (FLAT_SIZE as i32 - 1)) as usize;
        self.pixels[v * FLAT_SIZE + u]
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlatStore {
    flats: Vec<Flat>,
    by_name: HashMap<String, usize>,
}

impl FlatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every flat between the markers. Undersized lumps are skipped
    /// with a warning.
    pub fn load(wad: &WadFile) -> Result<Self, WadError> {
        let mut store = Self::new();
        for lump in wad.lumps_between(FLAT_START, FLAT_END)? {
            if let Err(err) = store.insert(lump.name, lump.data) {
                tracing::warn!(%err, "skipping flat");
            }
        }
        tracing::debug!(flats = store.len(), "flats indexed");
        Ok(store)
    }

    /// Checkerboard stand-ins for running without a WAD. Every name gets a
    /// distinct pair of palette indices.
    pub fn procedural(names: &[&str]) -> Self {
        let mut store = Self::new();
        for (i, name) in names.iter().enumerate() {
            let a = 96u8.wrapping_add((i as u8).wrapping_mul(24));
            let b = a.wrapping_add(12);
            let pixels: Vec<u8> = (0..FLAT_BYTES)
                .map(|p| {
                    let (x, y) = (p % FLAT_SIZE, p / FLAT_SIZE);
                    if (x / 8 + y / 8) % 2 == 0 { a } else { b }
                })
                .collect();
            // Generated at exactly FLAT_BYTES, so insertion cannot fail.
            let _ = store.insert(name, &pixels);
        }
        store
    }

    /// Add or replace a flat; returns its picnum.
    pub fn insert(&mut self, name: &str, data: &[u8]) -> Result<usize, AssetError> {
        if data.len() < FLAT_BYTES {
            return Err(AssetError::FlatTooSmall {
                name: name.to_string(),
                len: data.len(),
            });
        }
        let name = name.to_ascii_uppercase();
        let flat = Flat {
            name: name.clone(),
            pixels: data[..FLAT_BYTES].to_vec(),
        };
        if let Some(&picnum) = self.by_name.get(&name) {
            self.flats[picnum] = flat;
            return Ok(picnum);
        }
        self.flats.push(flat);
        let picnum = self.flats.len() - 1;
        self.by_name.insert(name, picnum);
        Ok(picnum)
    }

    #[inline]
    pub fn num_for_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }

    #[inline]
    pub fn get(&self, picnum: usize) -> Option<&Flat> {
        self.flats.get(picnum)
    }

    /// Picnum of the sky flat, if the WAD has one.
    pub fn sky_picnum(&self) -> Option<usize> {
        self.num_for_name(SKY_FLAT_NAME)
    }

    pub fn len(&self) -> usize {
        self.flats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flats.is_empty()
    }
}

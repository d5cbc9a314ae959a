//! Sprite lumps indexed by name, frame and rotation.
//!
//! A lump name is a 4-letter sprite, a frame letter and a rotation digit,
//! optionally followed by a second frame/rotation pair that reuses the same
//! picture mirrored (`TROOA2A8`). Rotation `0` is one picture for every
//! viewing angle; `1`..`8` fill the eight slots individually and may be
//! sparse.

use std::collections::HashMap;
use std::sync::Arc;

use crate::angle::{ANG45, Angle};
use crate::error::WadError;
use crate::picture::{Picture, parse_picture};
use crate::wad::WadFile;

pub const SPRITE_START: &str = "S_START";
pub const SPRITE_END: &str = "S_END";

/// One rotation slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteRotation {
    pub picture: Arc<Picture>,
    /// Draw mirrored left-to-right.
    pub flip: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteFrame {
    pub rotations: [Option<SpriteRotation>; 8],
    /// Slot 0 serves every angle.
    pub all_angles: bool,
}

impl SpriteFrame {
    /// The picture for rotation slot `index` (0..8). `None` if that slot
    /// was never filled.
    pub fn rotation(&self, index: usize) -> Option<&SpriteRotation> {
        if self.all_angles {
            return self.rotations[0].as_ref();
        }
        self.rotations.get(index)?.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteDef {
    pub frames: Vec<SpriteFrame>,
}

/// All sprites loaded from a WAD.
#[derive(Debug, Clone, Default)]
pub struct SpriteStore {
    sprites: HashMap<String, SpriteDef>,
}

impl SpriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every sprite lump between `S_START` and `S_END`. Lumps with
    /// short names are ignored; lumps that fail to decode are skipped with
    /// a warning.
    pub fn load(wad: &WadFile) -> Result<Self, WadError> {
        let mut store = Self::new();
        let mut skipped = 0usize;
        for lump in wad.lumps_between(SPRITE_START, SPRITE_END)? {
            if lump.name.len() < 6 {
                continue;
            }
            match parse_picture(lump.data) {
                Ok(picture) => {
                    if !store.insert(lump.name, picture) {
                        skipped += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(lump = lump.name, %err, "skipping sprite lump");
                    skipped += 1;
                }
            }
        }
        tracing::debug!(sprites = store.len(), skipped, "sprites indexed");
        Ok(store)
    }

    /// Register a picture under a sprite lump name. Returns `false` if the
    /// name does not follow the sprite naming scheme.
    pub fn insert(&mut self, lump_name: &str, picture: Picture) -> bool {
        let name = lump_name.as_bytes();
        if !lump_name.is_ascii() || name.len() < 6 {
            return false;
        }
        let Some((frame, rotation)) = decode_pair(name[4], name[5]) else {
            return false;
        };
        let second = match name.len() {
            6 => None,
            8 => match decode_pair(name[6], name[7]) {
                Some(pair) => Some(pair),
                None => return false,
            },
            _ => return false,
        };

        let picture = Arc::new(picture);
        let def = self
            .sprites
            .entry(lump_name[..4].to_ascii_uppercase())
            .or_default();
        def.install(frame, rotation, Arc::clone(&picture), false);
        if let Some((frame, rotation)) = second {
            def.install(frame, rotation, picture, true);
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&SpriteDef> {
        self.sprites.get(name)
    }

    /// A frame of a sprite, `None` for unknown names or frames.
    pub fn frame(&self, name: &str, frame: usize) -> Option<&SpriteFrame> {
        self.sprites.get(name)?.frames.get(frame)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl SpriteDef {
    fn install(&mut self, frame: usize, rotation: Option<usize>, picture: Arc<Picture>, flip: bool) {
        if self.frames.len() <= frame {
            self.frames.resize_with(frame + 1, SpriteFrame::default);
        }
        let slot = &mut self.frames[frame];
        let entry = Some(SpriteRotation { picture, flip });
        match rotation {
            None => {
                slot.all_angles = true;
                slot.rotations = Default::default();
                slot.rotations[0] = entry;
            }
            Some(r) => {
                // An all-angles picture in slot 0 is not rotation 1.
                if slot.all_angles {
                    slot.rotations = Default::default();
                    slot.all_angles = false;
                }
                slot.rotations[r] = entry;
            }
        }
    }
}

/// Frame index and rotation slot (`None` = all angles).
fn decode_pair(frame: u8, rotation: u8) -> Option<(usize, Option<usize>)> {
    let frame = frame.to_ascii_uppercase().checked_sub(b'A')?;
    if frame >= 29 {
        return None;
    }
    let rotation = match rotation {
        b'0' => None,
        b'1'..=b'8' => Some(usize::from(rotation - b'1')),
        _ => return None,
    };
    Some((usize::from(frame), rotation))
}

/// Rotation slot to draw for a thing facing `thing_angle`, seen along
/// `view_to_thing` (the angle from the viewer to the thing).
#[inline]
pub fn rotation_index(view_to_thing: Angle, thing_angle: Angle) -> usize {
    let rot = view_to_thing
        .wrapping_sub(thing_angle)
        .wrapping_add((ANG45 / 2).wrapping_mul(9));
    (rot >> 29) as usize
}

#![forbid(unsafe_code)]

//! Doom engine core for FrankenTUI.
//!
//! A fixed-point reimplementation of the parts of the Doom engine that give
//! the terminal demo its gameplay: monster AI, sight checks, hitscan and
//! projectile physics, and a column/span software renderer that writes into
//! a host-provided pixel sink.
//!
//! # Architecture
//! ```text
//! WAD lumps → MapData / Palette / SpriteStore
//!     tic:  input → player → mobj thinkers (AI) → weapon → projectiles → sweep
//!     frame: RenderTables → BSP walls → visplanes → vissprites → psprite → PixelSink
//! ```
//!
//! All gameplay math is 16.16 fixed point ([`fixed`]) with binary angle
//! measure ([`angle`]). Floating point appears only in cosmetic code (weapon
//! bob) and in `atan2` angle computation.

pub mod ai;
pub mod angle;
pub mod blockmap;
pub mod bsp;
pub mod builder;
pub mod config;
pub mod constants;
pub mod draw;
pub mod error;
pub mod fixed;
pub mod flats;
pub mod framebuffer;
pub mod game;
pub mod geometry;
pub mod hitscan;
pub mod info;
pub mod map;
pub mod menu;
pub mod mobj;
pub mod movement;
pub mod palette;
pub mod picture;
pub mod planes;
pub mod player;
pub mod projectiles;
pub mod projection;
pub mod psprite;
pub mod random;
pub mod render;
pub mod sight;
pub mod sprites;
pub mod tables;
pub mod wad;
pub mod wad_types;

pub use config::DoomConfig;
pub use error::{AssetError, ConfigError, DoomError, Result, WadError};
pub use fixed::{FRACBITS, FRACUNIT, Fixed};
pub use framebuffer::{DoomFramebuffer, PixelSink, Rgba};
pub use game::{DoomGame, TicInput};
pub use map::MapData;
pub use menu::{MenuAction, MenuInput, MenuMode, MenuState, Skill};
pub use mobj::{Mobj, MobjId, MobjList};
pub use player::PlayerState;
pub use psprite::{Weapon, WeaponKind};
pub use random::DoomRng;
pub use render::{FrameStats, Renderer, Scene, View};
pub use wad::WadFile;

//! Game constants matching the original Doom engine.
//!
//! Distances are stored as 16.16 fixed point (see [`crate::fixed`]); the
//! `*_UNITS` helpers keep the whole-map-unit values readable.

use crate::fixed::{FRACUNIT, Fixed};

/// Game tick rate (35 Hz like original Doom).
pub const TICRATE: u32 = 35;
pub const DOOM_TICK_SECS: f64 = 1.0 / TICRATE as f64;

/// Reference resolution the light tables and weapon sprites were authored for.
pub const SCREENWIDTH: usize = 320;
pub const SCREENHEIGHT: usize = 200;

/// Field of view in fine angles (90 degrees).
pub const FIELDOFVIEW: usize = 2048;

/// Player body.
pub const PLAYER_RADIUS: Fixed = 16 * FRACUNIT;
pub const PLAYER_HEIGHT: Fixed = 56 * FRACUNIT;
/// Eye level above floor (41 map units).
pub const VIEWHEIGHT: Fixed = 41 * FRACUNIT;
pub const MAXMOVE: Fixed = 30 * FRACUNIT;
/// Per-tic momentum multiplier (0xe800 / 0x10000).
pub const FRICTION: Fixed = 0xe800;
/// Momentum below this is zeroed when the player is not pushing.
pub const STOPSPEED: Fixed = 0x1000;
/// Downward acceleration per tic.
pub const GRAVITY: Fixed = FRACUNIT;
/// Maximum floor step a walker can climb.
pub const MAXSTEPHEIGHT: Fixed = 24 * FRACUNIT;
pub const MAXBOB: Fixed = 0x10_0000;

/// Movement thrust per tic command unit (forwardmove * 2048).
pub const FORWARDMOVE: [i32; 2] = [0x19, 0x32];
pub const SIDEMOVE: [i32; 2] = [0x18, 0x28];
pub const ANGLETURN: [u32; 2] = [640, 1280];

/// Combat ranges.
pub const MELEERANGE: Fixed = 64 * FRACUNIT;
pub const MISSILERANGE: Fixed = 32 * 64 * FRACUNIT;
/// A monster in range opens fire when `p_random()` falls below this.
pub const MISSILE_CHANCE: i32 = 13;
/// Hitscan trace limit.
pub const HITSCANRANGE: Fixed = 2048 * FRACUNIT;
/// Step used when marching a hitscan ray toward the nearest wall.
pub const TRACE_STEP: Fixed = 32 * FRACUNIT;
/// Half-height of the vertical band a hitscan ray can strike.
pub const AIM_SLACK: Fixed = 16 * FRACUNIT;
/// Height above a monster's feet where its missiles leave.
pub const MISSILE_SPAWN_HEIGHT: Fixed = 32 * FRACUNIT;

/// Tics a monster keeps a grudge after being hurt by another monster.
pub const BASETHRESHOLD: i32 = 100;

/// Sky flat name.
pub const SKY_FLAT_NAME: &str = "F_SKY1";

/// Light tables.
pub const LIGHTLEVELS: usize = 16;
pub const LIGHTSEGSHIFT: i32 = 4;
pub const MAXLIGHTSCALE: usize = 48;
pub const LIGHTSCALESHIFT: i32 = 12;
pub const MAXLIGHTZ: usize = 128;
pub const LIGHTZSHIFT: i32 = 20;
pub const NUMCOLORMAPS: usize = 32;
pub const DISTMAP: i32 = 2;

/// Number of light levels in COLORMAP (32 brightness + invulnerability + black).
pub const COLORMAP_LEVELS: usize = 34;
/// Number of palettes in PLAYPAL.
pub const PLAYPAL_PALETTES: usize = 14;

/// Initial visplane capacity per frame.
pub const MAXVISPLANES: usize = 128;

//! Weapon overlay: the player's gun, drawn over the 3D view.
//!
//! The weapon is a small state machine. It raises into view, waits ready,
//! runs a fixed fire sequence when the trigger is pulled and lowers out of
//! view to switch. Each fire sequence has one frame that actually shoots.
//! The vertical position follows the state, and a sinusoidal bob is added
//! while the player walks.

use crate::ai::World;
use crate::angle::Angle;
use crate::draw::{MaskedColumn, draw_masked_column, fill_column};
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul, fixed_to_float, float_to_fixed};
use crate::framebuffer::PixelSink;
use crate::hitscan::{HitscanResult, fire_hitscan, fire_melee};
use crate::palette::DoomPalette;
use crate::player::AmmoType;
use crate::projection::{MAX_WALL_SCALE, RenderTables};
use crate::sprites::SpriteStore;

/// Weapon rest height, in 320×200 screen units from the top.
pub const WEAPON_TOP: Fixed = 32 * FRACUNIT;
/// Fully lowered, out of view.
pub const WEAPON_BOTTOM: Fixed = 128 * FRACUNIT;
pub const RAISE_TICS: i32 = 16;
pub const LOWER_TICS: i32 = 16;
/// Lift of the weapon on the first fire frame; decays over the sequence.
pub const FIRE_KICK: Fixed = 6 * FRACUNIT;
/// Largest random error of a non-first bullet (about 5.6°).
pub const BULLET_SPREAD: Angle = 255 << 18;
pub const SHOTGUN_PELLETS: usize = 7;
/// Bob cycles per second at full walking speed.
const BOB_HZ: f64 = 1.25;
/// Screen row the weapon sprite offsets are measured against.
const BASE_Y_CENTER: Fixed = 100 * FRACUNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WeaponKind {
    Fist,
    #[default]
    Pistol,
    Shotgun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponState {
    Ready,
    Raise,
    Lower,
    Fire,
}

/// One step of a fire sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FireFrame {
    /// Sprite frame shown.
    frame: usize,
    tics: i32,
    shoot: bool,
    /// Muzzle flash sprite frame, if any.
    flash: Option<usize>,
}

const fn step(frame: usize, tics: i32) -> FireFrame {
    FireFrame {
        frame,
        tics,
        shoot: false,
        flash: None,
    }
}

const fn shot(frame: usize, tics: i32, flash: Option<usize>) -> FireFrame {
    FireFrame {
        frame,
        tics,
        shoot: true,
        flash,
    }
}

const FIST_FIRE: [FireFrame; 5] = [step(1, 4), shot(2, 4, None), step(3, 5), step(2, 4), step(1, 5)];
const PISTOL_FIRE: [FireFrame; 4] = [step(0, 4), shot(1, 6, Some(0)), step(2, 4), step(1, 5)];
const SHOTGUN_FIRE: [FireFrame; 9] = [
    step(0, 3),
    shot(0, 7, Some(0)),
    step(1, 5),
    step(2, 5),
    step(3, 4),
    step(2, 5),
    step(1, 5),
    step(0, 3),
    step(0, 7),
];

impl WeaponKind {
    /// Sprite prefix of the weapon itself.
    pub const fn sprite(self) -> &'static str {
        match self {
            Self::Fist => "PUNG",
            Self::Pistol => "PISG",
            Self::Shotgun => "SHTG",
        }
    }

    /// Sprite prefix of the muzzle flash.
    pub const fn flash_sprite(self) -> Option<&'static str> {
        match self {
            Self::Fist => None,
            Self::Pistol => Some("PISF"),
            Self::Shotgun => Some("SHTF"),
        }
    }

    /// Ammunition spent per shot.
    pub const fn ammo(self) -> Option<(AmmoType, i32)> {
        match self {
            Self::Fist => None,
            Self::Pistol => Some((AmmoType::Clip, 1)),
            Self::Shotgun => Some((AmmoType::Shell, 1)),
        }
    }

    const fn fire_sequence(self) -> &'static [FireFrame] {
        match self {
            Self::Fist => &FIST_FIRE,
            Self::Pistol => &PISTOL_FIRE,
            Self::Shotgun => &SHOTGUN_FIRE,
        }
    }
}

/// The player's weapon sprite state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub state: WeaponState,
    /// Tics left in the current state or fire frame.
    pub tics: i32,
    /// Position in the fire sequence while firing.
    pub fire_frame: usize,
    pending: Option<WeaponKind>,
    /// Shots fired without releasing the trigger; the first is accurate.
    refire: u32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new(WeaponKind::default())
    }
}

impl Weapon {
    /// A weapon on its way up.
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            state: WeaponState::Raise,
            tics: RAISE_TICS,
            fire_frame: 0,
            pending: None,
            refire: 0,
        }
    }

    /// Ask for a different weapon. The current one lowers first.
    pub fn select(&mut self, kind: WeaponKind) {
        if kind == self.kind && self.pending.is_none() {
            return;
        }
        self.pending = Some(kind);
    }

    /// The weapon that will be up once any switch completes.
    pub fn target_kind(&self) -> WeaponKind {
        self.pending.unwrap_or(self.kind)
    }

    /// Advance one tic. Returns the result of every bullet or swing fired.
    pub fn tick(&mut self, world: &mut World<'_>, fire: bool) -> Vec<HitscanResult> {
        if world.player.is_dead() {
            self.pending = None;
            if self.state != WeaponState::Lower {
                self.enter_lower();
            } else if self.tics > 0 {
                self.tics -= 1;
            }
            return Vec::new();
        }

        match self.state {
            WeaponState::Ready => {
                if self.pending.is_some() {
                    self.enter_lower();
                } else if fire {
                    return self.start_fire(world);
                } else {
                    self.refire = 0;
                }
            }
            WeaponState::Raise => {
                self.tics -= 1;
                if self.tics <= 0 {
                    self.state = WeaponState::Ready;
                    self.tics = 0;
                }
            }
            WeaponState::Lower => {
                self.tics -= 1;
                if self.tics <= 0 {
                    if let Some(next) = self.pending.take() {
                        tracing::debug!(from = ?self.kind, to = ?next, "weapon switched");
                        self.kind = next;
                    }
                    self.state = WeaponState::Raise;
                    self.tics = RAISE_TICS;
                }
            }
            WeaponState::Fire => {
                self.tics -= 1;
                if self.tics <= 0 {
                    return self.next_fire_frame(world, fire);
                }
            }
        }
        Vec::new()
    }

    fn enter_lower(&mut self) {
        self.state = WeaponState::Lower;
        self.tics = LOWER_TICS;
        self.fire_frame = 0;
    }

    fn has_ammo(&self, world: &World<'_>) -> bool {
        self.kind
            .ammo()
            .is_none_or(|(kind, count)| world.player.ammo(kind) >= count)
    }

    fn start_fire(&mut self, world: &mut World<'_>) -> Vec<HitscanResult> {
        if !self.has_ammo(world) {
            self.refire = 0;
            if self.kind != WeaponKind::Fist {
                self.pending = Some(WeaponKind::Fist);
                self.enter_lower();
            }
            return Vec::new();
        }
        self.state = WeaponState::Fire;
        self.fire_frame = 0;
        self.enter_fire_frame(world)
    }

    fn next_fire_frame(&mut self, world: &mut World<'_>, fire: bool) -> Vec<HitscanResult> {
        self.fire_frame += 1;
        if self.fire_frame < self.kind.fire_sequence().len() {
            return self.enter_fire_frame(world);
        }
        if fire && self.pending.is_none() {
            self.refire += 1;
            return self.start_fire(world);
        }
        self.state = WeaponState::Ready;
        self.fire_frame = 0;
        self.tics = 0;
        self.refire = 0;
        Vec::new()
    }

    fn enter_fire_frame(&mut self, world: &mut World<'_>) -> Vec<HitscanResult> {
        let Some(frame) = self.kind.fire_sequence().get(self.fire_frame).copied() else {
            return Vec::new();
        };
        self.tics = frame.tics;
        if frame.shoot { self.shoot(world) } else { Vec::new() }
    }

    fn shoot(&mut self, world: &mut World<'_>) -> Vec<HitscanResult> {
        if let Some((kind, count)) = self.kind.ammo()
            && !world.player.use_ammo(kind, count)
        {
            return Vec::new();
        }
        match self.kind {
            WeaponKind::Fist => {
                let damage = (world.rng.p_random() % 10 + 1) * 2;
                vec![fire_melee(world, damage)]
            }
            WeaponKind::Pistol => {
                let spread = if self.refire == 0 { 0 } else { BULLET_SPREAD };
                let damage = 5 * (world.rng.p_random() % 3 + 1);
                vec![fire_hitscan(world, damage, spread)]
            }
            WeaponKind::Shotgun => (0..SHOTGUN_PELLETS)
                .map(|_| {
                    let damage = 5 * (world.rng.p_random() % 3 + 1);
                    fire_hitscan(world, damage, BULLET_SPREAD)
                })
                .collect(),
        }
    }

    /// Vertical position in 320×200 screen units, before bob.
    pub fn y_offset(&self) -> Fixed {
        let travel = i64::from(WEAPON_BOTTOM - WEAPON_TOP);
        match self.state {
            WeaponState::Ready => WEAPON_TOP,
            WeaponState::Raise => {
                let done = i64::from((RAISE_TICS - self.tics).clamp(0, RAISE_TICS));
                WEAPON_BOTTOM - (travel * done / i64::from(RAISE_TICS)) as Fixed
            }
            WeaponState::Lower => {
                let done = i64::from((LOWER_TICS - self.tics).clamp(0, LOWER_TICS));
                WEAPON_TOP + (travel * done / i64::from(LOWER_TICS)) as Fixed
            }
            WeaponState::Fire => {
                let len = self.kind.fire_sequence().len().max(1) as i64;
                let left = len - (self.fire_frame as i64).min(len);
                WEAPON_TOP - (i64::from(FIRE_KICK) * left / len) as Fixed
            }
        }
    }

    /// Weapon sprite frame currently shown.
    pub fn sprite_frame(&self) -> usize {
        match self.state {
            WeaponState::Fire => self.current_fire_frame().map_or(0, |f| f.frame),
            _ => 0,
        }
    }

    /// Muzzle flash frame, while one is showing.
    pub fn flash_frame(&self) -> Option<usize> {
        match self.state {
            WeaponState::Fire => self.current_fire_frame().and_then(|f| f.flash),
            _ => None,
        }
    }

    #[inline]
    pub fn is_flashing(&self) -> bool {
        self.flash_frame().is_some()
    }

    fn current_fire_frame(&self) -> Option<FireFrame> {
        self.kind.fire_sequence().get(self.fire_frame).copied()
    }
}

/// Weapon bob `(x, y)` in screen units for the player's accumulated bob
/// and the time since the level started.
pub fn bob_offset(bob: Fixed, time_secs: f64, bob_scale: f32) -> (f32, f32) {
    let magnitude = fixed_to_float(bob) as f32 * bob_scale;
    if magnitude <= 0.0 {
        return (0.0, 0.0);
    }
    let phase = (time_secs * BOB_HZ * std::f64::consts::TAU) as f32;
    (magnitude * phase.cos(), magnitude * phase.sin().abs())
}

/// Draw the weapon and its flash. `light_level` is the player's sector
/// light; the weapon always uses the brightest scale bucket of it, and is
/// drawn fullbright while the muzzle flash shows.
pub fn draw_weapon<S: PixelSink + ?Sized>(
    sink: &mut S,
    palette: &DoomPalette,
    tables: &RenderTables,
    sprites: &SpriteStore,
    weapon: &Weapon,
    bob: (f32, f32),
    light_level: i32,
) {
    let sx = FRACUNIT.saturating_add(float_to_fixed(f64::from(bob.0)));
    let sy = weapon.y_offset().saturating_add(float_to_fixed(f64::from(bob.1)));
    let light = if weapon.is_flashing() {
        0
    } else {
        tables.wall_light(light_level, 0, MAX_WALL_SCALE)
    };

    let body = sprites
        .frame(weapon.kind.sprite(), weapon.sprite_frame())
        .and_then(|f| f.rotation(0));
    let Some(body) = body else {
        draw_placeholder(sink, palette, tables, weapon, sx, sy);
        return;
    };
    draw_psprite(sink, palette, tables, &body.picture, body.flip, sx, sy, light);

    if let (Some(name), Some(frame)) = (weapon.kind.flash_sprite(), weapon.flash_frame())
        && let Some(flash) = sprites.frame(name, frame).and_then(|f| f.rotation(0))
    {
        draw_psprite(sink, palette, tables, &flash.picture, flash.flip, sx, sy, 0);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_psprite<S: PixelSink + ?Sized>(
    sink: &mut S,
    palette: &DoomPalette,
    tables: &RenderTables,
    picture: &crate::picture::Picture,
    flip: bool,
    sx: Fixed,
    sy: Fixed,
    light: i32,
) {
    let width = (picture.width as i32) << FRACBITS;
    let mut tx = sx
        .saturating_sub(160 * FRACUNIT)
        .saturating_sub(i32::from(picture.left_offset) << FRACBITS);
    let x1 = tables.center_x_frac.saturating_add(fixed_mul(tx, tables.psprite_scale)) >> FRACBITS;
    if x1 >= tables.width as i32 {
        return;
    }
    tx = tx.saturating_add(width);
    let x2 = (tables.center_x_frac.saturating_add(fixed_mul(tx, tables.psprite_scale)) >> FRACBITS) - 1;
    if x2 < 0 {
        return;
    }

    let texture_mid = (BASE_Y_CENTER + FRACUNIT / 2)
        .saturating_sub(sy.saturating_sub(i32::from(picture.top_offset) << FRACBITS));
    let yscale = tables.psprite_yscale.max(1);
    let sprite_top = tables
        .center_y_frac
        .saturating_sub(fixed_mul(texture_mid, yscale));
    let (mut frac, xiscale) = if flip {
        (width - 1, -tables.psprite_iscale)
    } else {
        (0, tables.psprite_iscale)
    };
    let first = x1.max(0);
    if first > x1 {
        frac = frac.wrapping_add(xiscale.wrapping_mul(first - x1));
    }
    let last = x2.min(tables.width as i32 - 1);
    let iscale = fixed_div(FRACUNIT, yscale);

    for x in first..=last {
        if let Some(posts) = picture.columns.get((frac >> FRACBITS).max(0) as usize) {
            draw_masked_column(
                sink,
                palette,
                &MaskedColumn {
                    x,
                    posts,
                    texture_mid,
                    sprite_top,
                    scale: yscale,
                    iscale,
                    center_y: tables.center_y,
                    clip_top: 0,
                    clip_bottom: tables.height as i32 - 1,
                    light,
                },
            );
        }
        frac = frac.wrapping_add(xiscale);
    }
}

/// Palette indices of the placeholder gun.
const PLACEHOLDER_BODY: u8 = 96;
const PLACEHOLDER_BARREL: u8 = 64;
const PLACEHOLDER_FLASH: u8 = 250;

/// A block with a barrel on top, for running without weapon sprites.
fn draw_placeholder<S: PixelSink + ?Sized>(
    sink: &mut S,
    palette: &DoomPalette,
    tables: &RenderTables,
    weapon: &Weapon,
    sx: Fixed,
    sy: Fixed,
) {
    let (w, h) = (tables.width as i32, tables.height as i32);
    let drop = fixed_mul(sy - WEAPON_TOP, tables.psprite_yscale) >> FRACBITS;
    let shift = fixed_mul(sx - FRACUNIT, tables.psprite_scale) >> FRACBITS;
    let center = w / 2 + shift;

    let body_half = (w / 10).max(1);
    let body_top = h - h / 6 + drop;
    let barrel_half = (w / 40).max(1);
    let barrel_top = body_top - h / 8;

    let body = palette.color(if weapon.is_flashing() {
        PLACEHOLDER_FLASH
    } else {
        PLACEHOLDER_BODY
    });
    for x in center - body_half..center + body_half {
        fill_column(sink, x, body_top, h - 1, body);
    }
    let barrel = palette.color(PLACEHOLDER_BARREL);
    for x in center - barrel_half..center + barrel_half {
        fill_column(sink, x, barrel_top, body_top - 1, barrel);
    }
    if weapon.is_flashing() {
        let flash = palette.color(PLACEHOLDER_FLASH);
        for x in center - barrel_half * 2..center + barrel_half * 2 {
            fill_column(sink, x, barrel_top - h / 16, barrel_top - 1, flash);
        }
    }
}

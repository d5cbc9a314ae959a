//! Player state and movement.

use crate::angle::{ANG90, Angle, FINEANGLES, FINEMASK, fine_index};
use crate::constants::*;
use crate::fixed::{FRACUNIT, Fixed, fixed_mul};
use crate::map::MapData;
use crate::menu::Skill;
use crate::mobj::{MobjFlags, MobjList, TargetRef};
use crate::movement::check_position;
use crate::tables::{fine_cosine, fine_sine};

/// Ammunition pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmmoType {
    Clip,
    Shell,
}

impl AmmoType {
    #[inline]
    const fn slot(self) -> usize {
        self as usize
    }
}

/// The player's body and status.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub x: Fixed,
    pub y: Fixed,
    /// Feet height.
    pub z: Fixed,
    /// Eye height in world space, bob included.
    pub view_z: Fixed,
    /// Eye height above the feet.
    pub view_height: Fixed,
    delta_view_height: Fixed,
    pub angle: Angle,
    pub momx: Fixed,
    pub momy: Fixed,
    pub momz: Fixed,
    pub radius: Fixed,
    pub height: Fixed,
    pub floor_z: Fixed,
    pub ceiling_z: Fixed,
    /// Walking bob amplitude, capped at [`MAXBOB`].
    pub bob: Fixed,
    pub health: i32,
    pub armor: i32,
    /// 1 for green armour, 2 for blue, 0 for none.
    pub armor_type: i32,
    pub ammo: [i32; 2],
    pub god_mode: bool,
    pub noclip: bool,
    /// Red screen flash intensity; decays one per tic.
    pub damage_count: i32,
    /// Who last hurt the player.
    pub attacker: Option<TargetRef>,
    /// Movement was requested this tic.
    moving: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            view_z: VIEWHEIGHT,
            view_height: VIEWHEIGHT,
            delta_view_height: 0,
            angle: 0,
            momx: 0,
            momy: 0,
            momz: 0,
            radius: PLAYER_RADIUS,
            height: PLAYER_HEIGHT,
            floor_z: 0,
            ceiling_z: 0,
            bob: 0,
            health: 100,
            armor: 0,
            armor_type: 0,
            ammo: [50, 0],
            god_mode: false,
            noclip: false,
            damage_count: 0,
            attacker: None,
            moving: false,
        }
    }
}

impl PlayerState {
    /// Place the player on the floor at `(x, y)`, stopped.
    pub fn spawn(&mut self, map: &MapData, x: Fixed, y: Fixed, angle: Angle) {
        self.x = x;
        self.y = y;
        self.angle = angle;
        self.momx = 0;
        self.momy = 0;
        self.momz = 0;
        self.bob = 0;
        if let Some(sector) = map.sector_at(x, y) {
            self.floor_z = sector.floor_height;
            self.ceiling_z = sector.ceiling_height;
        }
        self.z = self.floor_z;
        self.view_height = VIEWHEIGHT;
        self.delta_view_height = 0;
        self.view_z = self.z + self.view_height;
        tracing::debug!(x = x >> 16, y = y >> 16, "player spawned");
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    #[inline]
    pub fn on_ground(&self) -> bool {
        self.z <= self.floor_z
    }

    /// Push momentum along `angle`.
    pub fn thrust(&mut self, angle: Angle, mv: Fixed) {
        let fine = fine_index(angle);
        self.momx = self.momx.saturating_add(fixed_mul(mv, fine_cosine(fine)));
        self.momy = self.momy.saturating_add(fixed_mul(mv, fine_sine(fine)));
    }

    /// Apply one tic of input: `turn` in angle-turn units, `forward` and
    /// `side` in move units. Thrust only applies on the ground.
    pub fn apply_movement(&mut self, forward: i32, side: i32, turn: i32) {
        self.moving = forward != 0 || side != 0;
        if self.is_dead() {
            return;
        }
        self.angle = self.angle.wrapping_add((turn as u32) << 16);
        if !self.on_ground() {
            return;
        }
        if forward != 0 {
            self.thrust(self.angle, forward * 2048);
        }
        if side != 0 {
            self.thrust(self.angle.wrapping_sub(ANG90), side * 2048);
        }
    }

    /// Whether the player's box fits at `(x, y)`.
    fn position_free(
        &self,
        map: &MapData,
        mobjs: &MobjList,
        x: Fixed,
        y: Fixed,
    ) -> Option<(Fixed, Fixed)> {
        if self.noclip {
            return Some((self.floor_z, self.ceiling_z));
        }
        let pos = check_position(map, x, y, self.radius, false)?;
        if pos.ceiling_z - pos.floor_z < self.height
            || pos.ceiling_z - self.z < self.height
            || pos.floor_z - self.z > MAXSTEPHEIGHT
        {
            return None;
        }
        let blocked = mobjs.iter().any(|(_, m)| {
            m.flags.contains(MobjFlags::SOLID)
                && boxes_touch(x, y, self.radius, m.x, m.y, m.radius)
                // Already overlapping: let the player walk out.
                && !boxes_touch(self.x, self.y, self.radius, m.x, m.y, m.radius)
        });
        (!blocked).then_some((pos.floor_z, pos.ceiling_z))
    }

    /// Horizontal movement with wall sliding along either axis.
    fn xy_movement(&mut self, map: &MapData, mobjs: &MobjList) {
        self.momx = self.momx.clamp(-MAXMOVE, MAXMOVE);
        self.momy = self.momy.clamp(-MAXMOVE, MAXMOVE);
        if self.momx == 0 && self.momy == 0 {
            return;
        }

        let (nx, ny) = (self.x + self.momx, self.y + self.momy);
        if let Some(fit) = self.position_free(map, mobjs, nx, ny) {
            self.commit(nx, ny, fit);
        } else if let Some(fit) = self.position_free(map, mobjs, nx, self.y) {
            self.commit(nx, self.y, fit);
            self.momy = 0;
        } else if let Some(fit) = self.position_free(map, mobjs, self.x, ny) {
            self.commit(self.x, ny, fit);
            self.momx = 0;
        } else {
            self.momx = 0;
            self.momy = 0;
        }

        if !self.on_ground() {
            return;
        }
        if !self.moving && self.momx.abs() < STOPSPEED && self.momy.abs() < STOPSPEED {
            self.momx = 0;
            self.momy = 0;
        } else {
            self.momx = fixed_mul(self.momx, FRICTION);
            self.momy = fixed_mul(self.momy, FRICTION);
        }
    }

    fn commit(&mut self, x: Fixed, y: Fixed, (floor_z, ceiling_z): (Fixed, Fixed)) {
        self.x = x;
        self.y = y;
        self.floor_z = floor_z;
        self.ceiling_z = ceiling_z;
    }

    /// Gravity and floor following. Stepping up squashes the view, which
    /// then recovers over a few tics.
    fn z_movement(&mut self) {
        if self.z < self.floor_z {
            self.view_height -= self.floor_z - self.z;
            self.delta_view_height = (VIEWHEIGHT - self.view_height) >> 3;
        }
        self.z += self.momz;
        if self.z <= self.floor_z {
            self.z = self.floor_z;
            self.momz = 0;
        } else {
            self.momz -= GRAVITY;
        }
        if self.z + self.height > self.ceiling_z {
            self.z = (self.ceiling_z - self.height).max(self.floor_z);
            self.momz = self.momz.min(0);
        }
    }

    /// Eye height with walking bob.
    fn calc_height(&mut self, leveltime: u32) {
        self.bob = fixed_mul(self.momx, self.momx)
            .saturating_add(fixed_mul(self.momy, self.momy))
            >> 2;
        self.bob = self.bob.min(MAXBOB);

        if self.is_dead() {
            self.view_height = (self.view_height - FRACUNIT).max(6 * FRACUNIT);
            self.view_z = self.z + self.view_height;
            return;
        }

        let phase = (FINEANGLES / 20 * leveltime as usize) & FINEMASK;
        let bob = fixed_mul(self.bob / 2, fine_sine(phase));

        self.view_height += self.delta_view_height;
        if self.view_height > VIEWHEIGHT {
            self.view_height = VIEWHEIGHT;
            self.delta_view_height = 0;
        }
        if self.view_height < VIEWHEIGHT / 2 {
            self.view_height = VIEWHEIGHT / 2;
            if self.delta_view_height <= 0 {
                self.delta_view_height = 1;
            }
        }
        if self.delta_view_height != 0 {
            self.delta_view_height += FRACUNIT / 4;
        }

        self.view_z = (self.z + self.view_height + bob).min(self.ceiling_z - 4 * FRACUNIT);
    }

    /// Advance one tic of physics.
    pub fn tick(&mut self, map: &MapData, mobjs: &MobjList, leveltime: u32) {
        self.xy_movement(map, mobjs);
        self.z_movement();
        self.calc_height(leveltime);
        if self.damage_count > 0 {
            self.damage_count -= 1;
        }
    }

    /// Take a hit. Returns the health actually lost.
    pub fn take_damage(&mut self, amount: i32, skill: Skill, source: Option<TargetRef>) -> i32 {
        if self.is_dead() || self.god_mode || amount <= 0 {
            return 0;
        }
        let mut amount = amount;
        if skill == Skill::Baby {
            amount >>= 1;
        }
        if self.armor_type != 0 {
            let mut saved = if self.armor_type == 1 {
                amount / 3
            } else {
                amount / 2
            };
            if self.armor <= saved {
                saved = self.armor;
                self.armor_type = 0;
            }
            self.armor -= saved;
            amount -= saved;
        }
        let lost = amount.min(self.health);
        self.health -= lost;
        self.attacker = source;
        self.damage_count = (self.damage_count + amount).min(100);
        if self.is_dead() {
            tracing::info!(?source, "player killed");
        }
        lost
    }

    #[inline]
    pub fn ammo(&self, kind: AmmoType) -> i32 {
        self.ammo[kind.slot()]
    }

    /// Spend ammunition. Returns `false` and spends nothing when short.
    pub fn use_ammo(&mut self, kind: AmmoType, count: i32) -> bool {
        let pool = &mut self.ammo[kind.slot()];
        if *pool < count {
            return false;
        }
        *pool -= count;
        true
    }
}

fn boxes_touch(x: Fixed, y: Fixed, r: Fixed, ox: Fixed, oy: Fixed, or: Fixed) -> bool {
    let reach = r.saturating_add(or).unsigned_abs();
    x.abs_diff(ox) < reach && y.abs_diff(oy) < reach
}

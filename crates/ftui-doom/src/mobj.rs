//! Map objects: monsters, missiles and effects.
//!
//! Mobjs live in a [`MobjList`] arena addressed by generational
//! [`MobjId`]s. Removal only sets a tombstone, so ids taken before a pass
//! stay valid while the pass mutates flags and spawns new entries; freed
//! slots are reclaimed by [`MobjList::sweep`] between tics.

use bitflags::bitflags;

use crate::ai::{self, World};
use crate::angle::Angle;
use crate::constants::BASETHRESHOLD;
use crate::fixed::{Fixed, MININT};
use crate::info::{MobjInfo, MobjType, SpriteNum, StateNum};
use crate::map::MapData;
use crate::menu::Skill;
use crate::movement::MoveDir;
use crate::random::DoomRng;
use crate::wad_types::ThingFlags;

bitflags! {
    /// Behaviour and collision flags carried by every mobj.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MobjFlags: u32 {
        const SPECIAL      = 0x0000_0001;
        /// Blocks movement.
        const SOLID        = 0x0000_0002;
        /// Can be hit by bullets and missiles.
        const SHOOTABLE    = 0x0000_0004;
        const NOSECTOR     = 0x0000_0008;
        const NOBLOCKMAP   = 0x0000_0010;
        /// Wakes only on sight.
        const AMBUSH       = 0x0000_0020;
        /// Took damage this tic; next missile check always fires.
        const JUSTHIT      = 0x0000_0040;
        /// Attacked last chase step; move before attacking again.
        const JUSTATTACKED = 0x0000_0080;
        const SPAWNCEILING = 0x0000_0100;
        const NOGRAVITY    = 0x0000_0200;
        /// May step off ledges.
        const DROPOFF      = 0x0000_0400;
        const PICKUP       = 0x0000_0800;
        const NOCLIP       = 0x0000_1000;
        const SLIDE        = 0x0000_2000;
        const FLOAT        = 0x0000_4000;
        const TELEPORT     = 0x0000_8000;
        /// Moves under its own momentum and explodes on contact.
        const MISSILE      = 0x0001_0000;
        const DROPPED      = 0x0002_0000;
        const SHADOW       = 0x0004_0000;
        const NOBLOOD      = 0x0008_0000;
        /// Dead body; still drawn.
        const CORPSE       = 0x0010_0000;
        const INFLOAT      = 0x0020_0000;
        const COUNTKILL    = 0x0040_0000;
        const COUNTITEM    = 0x0080_0000;
        const SKULLFLY     = 0x0100_0000;
    }
}

/// Spawn z meaning "on the floor of the containing sector".
pub const ONFLOORZ: Fixed = MININT;

/// Stable handle into a [`MobjList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MobjId {
    index: u32,
    generation: u32,
}

impl MobjId {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Something a monster can hunt or a missile can be credited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Player,
    Mobj(MobjId),
}

#[derive(Debug, Clone)]
pub struct Mobj {
    pub kind: MobjType,
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    pub momx: Fixed,
    pub momy: Fixed,
    pub momz: Fixed,
    pub floor_z: Fixed,
    pub ceiling_z: Fixed,
    pub radius: Fixed,
    pub height: Fixed,
    pub health: i32,
    pub flags: MobjFlags,
    pub state: StateNum,
    /// Tics left in `state`; -1 holds forever.
    pub tics: i32,
    pub sprite: SpriteNum,
    pub frame: u32,
    /// Hunted target for monsters, shooter for missiles.
    pub target: Option<TargetRef>,
    pub movedir: MoveDir,
    pub movecount: i32,
    pub reaction_time: i32,
    /// Tics left before an infighting grudge may switch targets.
    pub threshold: i32,
    removed: bool,
}

impl Mobj {
    /// A mobj in its spawn state. The spawn action does not run.
    pub fn new(kind: MobjType, x: Fixed, y: Fixed, z: Fixed) -> Self {
        let info = kind.info();
        let state = info.spawn_state.info();
        Self {
            kind,
            x,
            y,
            z,
            angle: 0,
            momx: 0,
            momy: 0,
            momz: 0,
            floor_z: 0,
            ceiling_z: 0,
            radius: info.radius,
            height: info.height,
            health: info.spawn_health,
            flags: info.flags,
            state: info.spawn_state,
            tics: state.tics,
            sprite: state.sprite,
            frame: state.frame,
            target: None,
            movedir: MoveDir::NoDir,
            movecount: 0,
            reaction_time: info.reaction_time,
            threshold: 0,
            removed: false,
        }
    }

    #[inline]
    pub fn info(&self) -> &'static MobjInfo {
        self.kind.info()
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Mark for reclamation at the next sweep.
    #[inline]
    pub fn remove(&mut self) {
        self.removed = true;
    }
}

/// Enter `state`. Returns `false` when the state is [`StateNum::Null`],
/// which removes the mobj. The new state's action is not run here.
pub fn set_mobj_state(mobj: &mut Mobj, state: StateNum) -> bool {
    if state == StateNum::Null {
        mobj.state = StateNum::Null;
        mobj.remove();
        return false;
    }
    let st = state.info();
    mobj.state = state;
    mobj.tics = st.tics;
    mobj.sprite = st.sprite;
    mobj.frame = st.frame;
    true
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    mobj: Option<Mobj>,
}

/// Generational arena of mobjs.
#[derive(Debug, Clone, Default)]
pub struct MobjList {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl MobjList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mobj: Mobj) -> MobjId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.mobj = Some(mobj);
            return MobjId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            mobj: Some(mobj),
        });
        MobjId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    /// Spawn a mobj and settle it into the sector under `(x, y)`.
    /// `z == ONFLOORZ` places it on the floor.
    pub fn spawn(&mut self, map: &MapData, kind: MobjType, x: Fixed, y: Fixed, z: Fixed) -> MobjId {
        let mut mobj = Mobj::new(kind, x, y, z);
        if let Some(sector) = map.sector_at(x, y) {
            mobj.floor_z = sector.floor_height;
            mobj.ceiling_z = sector.ceiling_height;
        }
        if z == ONFLOORZ {
            mobj.z = mobj.floor_z;
        }
        self.add(mobj)
    }

    /// A live mobj; `None` for stale ids and removed mobjs.
    pub fn get(&self, id: MobjId) -> Option<&Mobj> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.mobj.as_ref())
            .filter(|m| !m.removed)
    }

    pub fn get_mut(&mut self, id: MobjId) -> Option<&mut Mobj> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.mobj.as_mut())
            .filter(|m| !m.removed)
    }

    /// Snapshot of live ids, safe to walk while spawning or removing.
    pub fn ids(&self) -> Vec<MobjId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MobjId, &Mobj)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.mobj.as_ref().filter(|m| !m.removed).map(|m| {
                (
                    MobjId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    m,
                )
            })
        })
    }

    /// Live mobj count.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free the slots of removed mobjs. Returns how many were reclaimed.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.mobj.as_ref().is_some_and(|m| m.removed) {
                slot.mobj = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(i as u32);
                freed += 1;
            }
        }
        freed
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

/// Advance every mobj's state countdown by one tic, running the action of
/// each state entered.
pub fn tick_mobjs(world: &mut World<'_>) {
    for id in world.mobjs.ids() {
        let Some(mobj) = world.mobjs.get_mut(id) else {
            continue;
        };
        if mobj.tics == -1 {
            continue;
        }
        mobj.tics -= 1;
        if mobj.tics > 0 {
            continue;
        }
        let next = mobj.state.info().next;
        if set_mobj_state(mobj, next) {
            ai::run_action(world, id, next.info().action);
        }
    }
}

/// Turn a mobj into a corpse.
pub fn kill_mobj(mobj: &mut Mobj, rng: &mut DoomRng) {
    mobj.flags.remove(MobjFlags::SHOOTABLE | MobjFlags::FLOAT | MobjFlags::SKULLFLY);
    mobj.flags.insert(MobjFlags::CORPSE | MobjFlags::DROPOFF);
    mobj.height >>= 2;
    match mobj.info().death_state {
        Some(death) => {
            if set_mobj_state(mobj, death) {
                mobj.tics = (mobj.tics - (rng.p_random() & 3)).max(1);
            }
        }
        None => mobj.remove(),
    }
}

/// Apply damage to a mobj. Returns `true` if it died.
///
/// A monster hurt by someone other than itself switches to them unless a
/// grudge is still running.
pub fn damage_mobj(
    world: &mut World<'_>,
    target: MobjId,
    source: Option<TargetRef>,
    damage: i32,
) -> bool {
    let Some(mobj) = world.mobjs.get_mut(target) else {
        return false;
    };
    if !mobj.flags.contains(MobjFlags::SHOOTABLE) {
        return false;
    }

    mobj.health -= damage;
    if mobj.health <= 0 {
        kill_mobj(mobj, world.rng);
        tracing::debug!(kind = ?mobj.kind, ?source, "mobj killed");
        return true;
    }

    let info = mobj.info();
    if world.rng.p_random() < info.pain_chance && !mobj.flags.contains(MobjFlags::SKULLFLY) {
        mobj.flags.insert(MobjFlags::JUSTHIT);
        if let Some(pain) = info.pain_state {
            set_mobj_state(mobj, pain);
        }
    }
    mobj.reaction_time = 0;

    if mobj.threshold == 0 {
        if let Some(src) = source.filter(|s| *s != TargetRef::Mobj(target)) {
            mobj.target = Some(src);
            mobj.threshold = BASETHRESHOLD;
            if mobj.state == info.spawn_state && info.see_state != StateNum::Null {
                set_mobj_state(mobj, info.see_state);
            }
        }
    }
    false
}

/// Spawn the monsters a map places for `skill`. Player starts and unknown
/// editor numbers are skipped. Returns how many mobjs were spawned.
pub fn spawn_map_things(
    map: &MapData,
    mobjs: &mut MobjList,
    skill: Skill,
    rng: &mut DoomRng,
) -> usize {
    let skill_bit = skill.thing_flag();
    let mut spawned = 0;
    for thing in &map.things {
        if (1..=4).contains(&thing.kind) {
            continue;
        }
        if thing.flags.contains(ThingFlags::MULTI) || !thing.flags.intersects(skill_bit) {
            continue;
        }
        let Some(kind) = MobjType::from_doomednum(thing.kind) else {
            tracing::trace!(kind = thing.kind, "unsupported thing type");
            continue;
        };
        let id = mobjs.spawn(map, kind, thing.x, thing.y, ONFLOORZ);
        if let Some(mobj) = mobjs.get_mut(id) {
            mobj.angle = thing.angle;
            if thing.flags.contains(ThingFlags::AMBUSH) {
                mobj.flags.insert(MobjFlags::AMBUSH);
            }
            // Desynchronise idle animations.
            if mobj.tics > 0 {
                mobj.tics = 1 + rng.p_random() % mobj.tics;
            }
        }
        spawned += 1;
    }
    tracing::debug!(map = %map.name, spawned, "map things spawned");
    spawned
}

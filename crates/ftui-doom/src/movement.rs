//! Collision and monster walking.
//!
//! Position checks query the blockmap for linedefs overlapping a mobj's
//! bounding box. Unlike sight, a box reaching outside the blockmap is
//! blocked.

use crate::ai::World;
use crate::angle::ANG45;
use crate::constants::MAXSTEPHEIGHT;
use crate::fixed::{FRACUNIT, Fixed};
use crate::geometry::{BoundingBox, box_on_line_side};
use crate::map::{LineDef, LineFlags, MapData};
use crate::menu::Skill;
use crate::mobj::{MobjFlags, MobjId};

/// Eight compass directions plus "not moving".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MoveDir {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
    #[default]
    NoDir,
}

impl MoveDir {
    pub const ALL: [Self; 8] = [
        Self::East,
        Self::NorthEast,
        Self::North,
        Self::NorthWest,
        Self::West,
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
    ];

    /// Compass index 0..8, `None` for [`MoveDir::NoDir`].
    #[inline]
    pub fn index(self) -> Option<usize> {
        (self != Self::NoDir).then_some(self as usize)
    }

    pub fn opposite(self) -> Self {
        match self.index() {
            Some(i) => Self::ALL[(i + 4) % 8],
            None => Self::NoDir,
        }
    }

    /// Facing angle of this direction.
    #[inline]
    pub fn angle(self) -> Option<u32> {
        self.index().map(|i| i as u32 * ANG45)
    }
}

const DIAG_SPEED: Fixed = 47000;
const XSPEED: [Fixed; 8] = [FRACUNIT, DIAG_SPEED, 0, -DIAG_SPEED, -FRACUNIT, -DIAG_SPEED, 0, DIAG_SPEED];
const YSPEED: [Fixed; 8] = [0, DIAG_SPEED, FRACUNIT, DIAG_SPEED, 0, -DIAG_SPEED, -FRACUNIT, -DIAG_SPEED];

/// Diagonal toward a target, indexed by `(dy < 0) << 1 | (dx > 0)`.
const DIAGS: [MoveDir; 4] = [
    MoveDir::NorthWest,
    MoveDir::NorthEast,
    MoveDir::SouthWest,
    MoveDir::SouthEast,
];

/// Floor and ceiling a box would rest between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub floor_z: Fixed,
    pub ceiling_z: Fixed,
    /// Lowest floor touched; a large drop is a ledge.
    pub drop_off_z: Fixed,
}

/// Whether a line passes through a box. Touching an edge does not count.
pub fn line_crosses_box(bbox: &BoundingBox, line: &LineDef) -> bool {
    if bbox.right <= line.bbox.left
        || bbox.left >= line.bbox.right
        || bbox.top <= line.bbox.bottom
        || bbox.bottom >= line.bbox.top
    {
        return false;
    }
    box_on_line_side(bbox, line.x1, line.y1, line.x2, line.y2).is_none()
}

/// Check whether a box of `radius` fits at `(x, y)`, ignoring things.
///
/// Returns `None` when blocked by a one-sided or blocking line, or when the
/// box reaches outside the blockmap or the point lies in no sector.
pub fn check_position(
    map: &MapData,
    x: Fixed,
    y: Fixed,
    radius: Fixed,
    monster: bool,
) -> Option<Position> {
    let sector = map.sector_at(x, y)?;
    let mut pos = Position {
        floor_z: sector.floor_height,
        ceiling_z: sector.ceiling_height,
        drop_off_z: sector.floor_height,
    };
    let bbox = BoundingBox::around(x, y, radius);
    let (x0, x1, y0, y1) = map.blockmap.block_range(&bbox);
    for by in y0..=y1 {
        for bx in x0..=x1 {
            let cell = map.blockmap.cell(bx, by)?;
            for &index in cell {
                let line = &map.lines[index];
                if !line_crosses_box(&bbox, line) {
                    continue;
                }
                if !line.is_two_sided() || line.flags.contains(LineFlags::BLOCKING) {
                    return None;
                }
                if monster && line.flags.contains(LineFlags::BLOCK_MONSTERS) {
                    return None;
                }
                let opening = map.line_opening(line)?;
                pos.ceiling_z = pos.ceiling_z.min(opening.top);
                pos.floor_z = pos.floor_z.max(opening.bottom);
                pos.drop_off_z = pos.drop_off_z.min(opening.low_floor);
            }
        }
    }
    Some(pos)
}

/// Whether a missile box at `(x, y, z)` strikes a wall: any one-sided line,
/// a two-sided opening it does not fit through, or the map edge.
pub fn hits_wall(map: &MapData, x: Fixed, y: Fixed, z: Fixed, radius: Fixed, height: Fixed) -> bool {
    let bbox = BoundingBox::around(x, y, radius);
    let (x0, x1, y0, y1) = map.blockmap.block_range(&bbox);
    for by in y0..=y1 {
        for bx in x0..=x1 {
            let Some(cell) = map.blockmap.cell(bx, by) else {
                return true;
            };
            for &index in cell {
                let line = &map.lines[index];
                if !line_crosses_box(&bbox, line) {
                    continue;
                }
                let Some(opening) = map.line_opening(line) else {
                    return true;
                };
                if z < opening.bottom || z.saturating_add(height) > opening.top {
                    return true;
                }
            }
        }
    }
    false
}

/// Move a mobj to `(x, y)` if the spot is free. Solid mobjs are also
/// blocked by other solid mobjs and the player.
pub fn try_move(world: &mut World<'_>, id: MobjId, x: Fixed, y: Fixed) -> bool {
    let Some(mobj) = world.mobjs.get(id) else {
        return false;
    };
    let (radius, height, z, flags) = (mobj.radius, mobj.height, mobj.z, mobj.flags);

    let Some(pos) = check_position(world.map, x, y, radius, !flags.contains(MobjFlags::MISSILE))
    else {
        return false;
    };
    if pos.ceiling_z - pos.floor_z < height || pos.ceiling_z - z < height {
        return false;
    }
    if pos.floor_z - z > MAXSTEPHEIGHT {
        return false;
    }
    if !flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT)
        && pos.floor_z - pos.drop_off_z > MAXSTEPHEIGHT
    {
        return false;
    }

    if flags.contains(MobjFlags::SOLID) {
        let touches = |ox: Fixed, oy: Fixed, or: Fixed| {
            let block = radius.saturating_add(or);
            x.abs_diff(ox) < block.unsigned_abs() && y.abs_diff(oy) < block.unsigned_abs()
        };
        let blocked_by_mobj = world.mobjs.iter().any(|(other_id, other)| {
            other_id != id
                && other.flags.contains(MobjFlags::SOLID)
                && touches(other.x, other.y, other.radius)
        });
        let p = &world.player;
        if blocked_by_mobj || (p.health > 0 && touches(p.x, p.y, p.radius)) {
            return false;
        }
    }

    let Some(mobj) = world.mobjs.get_mut(id) else {
        return false;
    };
    mobj.x = x;
    mobj.y = y;
    mobj.floor_z = pos.floor_z;
    mobj.ceiling_z = pos.ceiling_z;
    if !flags.intersects(MobjFlags::FLOAT | MobjFlags::NOGRAVITY) {
        mobj.z = pos.floor_z;
    }
    true
}

/// Take one step along the mobj's `movedir`.
pub fn p_move(world: &mut World<'_>, id: MobjId) -> bool {
    let Some(mobj) = world.mobjs.get(id) else {
        return false;
    };
    let Some(dir) = mobj.movedir.index() else {
        return false;
    };
    let speed = mobj.info().speed;
    let x = mobj.x.saturating_add(speed.saturating_mul(XSPEED[dir]));
    let y = mobj.y.saturating_add(speed.saturating_mul(YSPEED[dir]));
    try_move(world, id, x, y)
}

/// Step along `movedir`; on success pick how many steps to keep it.
pub fn try_walk(world: &mut World<'_>, id: MobjId) -> bool {
    if !p_move(world, id) {
        return false;
    }
    let count = world.rng.p_random() & 15;
    if let Some(mobj) = world.mobjs.get_mut(id) {
        mobj.movecount = count;
    }
    true
}

fn walk_dir(world: &mut World<'_>, id: MobjId, dir: MoveDir) -> bool {
    match world.mobjs.get_mut(id) {
        Some(mobj) => mobj.movedir = dir,
        None => return false,
    }
    try_walk(world, id)
}

/// Pick a new walking direction toward the mobj's target.
///
/// Tries the diagonal first, then the two axes (in random priority), then
/// the old direction, then every direction, and only then turning around.
/// Gives up with [`MoveDir::NoDir`].
pub fn new_chase_dir(world: &mut World<'_>, id: MobjId) {
    let Some(mobj) = world.mobjs.get(id) else {
        return;
    };
    let old = mobj.movedir;
    let (mx, my) = (mobj.x, mobj.y);
    let Some(target) = mobj.target.and_then(|t| world.resolve(t)) else {
        if let Some(mobj) = world.mobjs.get_mut(id) {
            mobj.movedir = MoveDir::NoDir;
        }
        return;
    };
    let turnaround = old.opposite();

    let delta_x = target.x.saturating_sub(mx);
    let delta_y = target.y.saturating_sub(my);
    let threshold = 10 * FRACUNIT;
    let mut d1 = if delta_x > threshold {
        MoveDir::East
    } else if delta_x < -threshold {
        MoveDir::West
    } else {
        MoveDir::NoDir
    };
    let mut d2 = if delta_y < -threshold {
        MoveDir::South
    } else if delta_y > threshold {
        MoveDir::North
    } else {
        MoveDir::NoDir
    };

    if d1 != MoveDir::NoDir && d2 != MoveDir::NoDir {
        let diag = DIAGS[(usize::from(delta_y < 0) << 1) | usize::from(delta_x > 0)];
        if diag != turnaround && walk_dir(world, id, diag) {
            return;
        }
    }

    if world.rng.p_random() > 200 || delta_y.unsigned_abs() > delta_x.unsigned_abs() {
        std::mem::swap(&mut d1, &mut d2);
    }
    if d1 == turnaround {
        d1 = MoveDir::NoDir;
    }
    if d2 == turnaround {
        d2 = MoveDir::NoDir;
    }
    for d in [d1, d2] {
        if d != MoveDir::NoDir && walk_dir(world, id, d) {
            return;
        }
    }

    if old != MoveDir::NoDir && walk_dir(world, id, old) {
        return;
    }

    let forward = world.rng.p_random() & 1 != 0;
    let order: Vec<MoveDir> = if forward {
        MoveDir::ALL.to_vec()
    } else {
        MoveDir::ALL.iter().rev().copied().collect()
    };
    for d in order {
        if d != turnaround && walk_dir(world, id, d) {
            return;
        }
    }

    if turnaround != MoveDir::NoDir && walk_dir(world, id, turnaround) {
        return;
    }

    if let Some(mobj) = world.mobjs.get_mut(id) {
        mobj.movedir = MoveDir::NoDir;
    }
}

/// Whether skill lets monsters attack right after attacking.
#[inline]
pub fn fast_monsters(skill: Skill) -> bool {
    skill == Skill::Nightmare
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MapBuilder;
    use crate::info::MobjType;
    use crate::mobj::{Mobj, MobjList, TargetRef};
    use crate::player::PlayerState;
    use crate::random::DoomRng;

    const U: Fixed = FRACUNIT;

    #[test]
    fn opposite_directions() {
        assert_eq!(MoveDir::East.opposite(), MoveDir::West);
        assert_eq!(MoveDir::NorthEast.opposite(), MoveDir::SouthWest);
        assert_eq!(MoveDir::NoDir.opposite(), MoveDir::NoDir);
        assert_eq!(MoveDir::North.angle(), Some(2 * ANG45));
    }

    #[test]
    fn open_floor_fits() {
        let map = MapBuilder::demo();
        let pos = check_position(&map, 0, 0, 20 * U, true).unwrap();
        assert_eq!(pos.floor_z, 0);
        assert_eq!(pos.ceiling_z, 128 * U);
    }

    #[test]
    fn wall_blocks_box() {
        let map = MapBuilder::demo();
        assert!(check_position(&map, -245 * U, 0, 20 * U, true).is_none());
        // Touching the wall exactly is allowed.
        assert!(check_position(&map, -236 * U, 0, 20 * U, true).is_some());
    }

    #[test]
    fn portal_raises_floor_and_lowers_ceiling() {
        let map = MapBuilder::demo();
        let pos = check_position(&map, 0, 250 * U, 16 * U, false).unwrap();
        assert_eq!(pos.floor_z, 16 * U);
        assert_eq!(pos.ceiling_z, 128 * U);
        assert_eq!(pos.drop_off_z, 0);
    }

    #[test]
    fn missile_hits_walls_and_map_edge() {
        let map = MapBuilder::demo();
        assert!(!hits_wall(&map, 0, 0, 32 * U, 6 * U, 8 * U));
        assert!(hits_wall(&map, -254 * U, 0, 32 * U, 6 * U, 8 * U));
        assert!(hits_wall(&map, 5000 * U, 0, 32 * U, 6 * U, 8 * U));
        // Below the north room's raised floor at the portal.
        assert!(hits_wall(&map, 0, 256 * U, 4 * U, 6 * U, 8 * U));
    }

    fn world_with<R>(mobjs: &mut MobjList, player: &mut PlayerState, f: impl FnOnce(&mut World<'_>) -> R) -> R {
        let map = MapBuilder::demo();
        let mut rng = DoomRng::new(11);
        let mut world = World {
            map: &map,
            mobjs,
            player,
            rng: &mut rng,
            skill: Skill::Medium,
        };
        f(&mut world)
    }

    #[test]
    fn step_moves_by_speed() {
        let mut mobjs = MobjList::new();
        let mut player = PlayerState::default();
        player.x = 1000 * U;
        let mut m = Mobj::new(MobjType::Troop, 0, 0, 0);
        m.movedir = MoveDir::East;
        let id = mobjs.add(m);
        assert!(world_with(&mut mobjs, &mut player, |w| p_move(w, id)));
        assert_eq!(mobjs.get(id).unwrap().x, 8 * U);
    }

    #[test]
    fn solid_mobjs_block_each_other() {
        let mut mobjs = MobjList::new();
        let mut player = PlayerState::default();
        player.x = -200 * U;
        let id = mobjs.add(Mobj::new(MobjType::Troop, 0, 0, 0));
        mobjs.add(Mobj::new(MobjType::Troop, 45 * U, 0, 0));
        assert!(!world_with(&mut mobjs, &mut player, |w| try_move(w, id, 8 * U, 0)));
        assert!(world_with(&mut mobjs, &mut player, |w| try_move(w, id, -8 * U, 0)));
    }

    #[test]
    fn chase_dir_heads_toward_target() {
        let mut mobjs = MobjList::new();
        let mut player = PlayerState::default();
        player.x = 200 * U;
        player.y = 200 * U;
        let mut m = Mobj::new(MobjType::Troop, 0, 0, 0);
        m.target = Some(TargetRef::Player);
        let id = mobjs.add(m);
        world_with(&mut mobjs, &mut player, |w| new_chase_dir(w, id));
        let m = mobjs.get(id).unwrap();
        assert_eq!(m.movedir, MoveDir::NorthEast);
        assert!(m.x > 0 && m.y > 0);
        assert!((0..16).contains(&m.movecount));
    }

    #[test]
    fn boxed_in_monster_gives_up() {
        let mut mobjs = MobjList::new();
        let mut player = PlayerState::default();
        player.x = 100 * U;
        let mut b = MapBuilder::new();
        b.room(0, 0, 48, 48, 0, 128, 160);
        let map = b.build();
        let mut m = Mobj::new(MobjType::Troop, 24 * U, 24 * U, 0);
        m.target = Some(TargetRef::Player);
        let id = mobjs.add(m);
        let mut rng = DoomRng::new(1);
        let mut world = World {
            map: &map,
            mobjs: &mut mobjs,
            player: &mut player,
            rng: &mut rng,
            skill: Skill::Medium,
        };
        new_chase_dir(&mut world, id);
        assert_eq!(mobjs.get(id).unwrap().movedir, MoveDir::NoDir);
    }

    #[test]
    fn no_target_means_no_direction() {
        let mut mobjs = MobjList::new();
        let mut player = PlayerState::default();
        let id = mobjs.add(Mobj::new(MobjType::Troop, 0, 0, 0));
        world_with(&mut mobjs, &mut player, |w| new_chase_dir(w, id));
        assert_eq!(mobjs.get(id).unwrap().movedir, MoveDir::NoDir);
    }
}

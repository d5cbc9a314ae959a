//! Player line attacks.
//!
//! Every shootable mobj is projected onto the firing ray: the dot product
//! gives the distance along it, the cross product the sideways miss. The
//! nearest visible mobj whose radius covers the miss takes the hit.
//! Otherwise the ray is marched to the nearest wall.

use crate::ai::World;
use crate::angle::{Angle, fine_index};
use crate::constants::{AIM_SLACK, HITSCANRANGE, MELEERANGE, TRACE_STEP};
use crate::fixed::{FRACBITS, FRACUNIT, Fixed};
use crate::geometry::{cross, dot};
use crate::info::MobjType;
use crate::map::MapData;
use crate::mobj::{MobjFlags, MobjId, ONFLOORZ, TargetRef};
use crate::sight::line_of_sight;
use crate::tables::{fine_cosine, fine_sine};

/// Outcome of one line attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitscanResult {
    Mobj {
        id: MobjId,
        distance: Fixed,
        killed: bool,
    },
    Wall {
        distance: Fixed,
    },
    Miss,
}

impl HitscanResult {
    #[inline]
    pub fn hit_mobj(&self) -> Option<MobjId> {
        match *self {
            Self::Mobj { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Extra reach granted to melee swings.
const MELEE_RADIUS_BONUS: Fixed = 8 * FRACUNIT;

/// Fire a bullet from the player's eye with up to `spread` of random
/// angular error.
pub fn fire_hitscan(world: &mut World<'_>, damage: i32, spread: Angle) -> HitscanResult {
    let angle = world.player.angle.wrapping_add(world.rng.spread(spread));
    let result = line_attack(world, angle, HITSCANRANGE, 0, damage);
    if let HitscanResult::Wall { distance } = result {
        spawn_puff(world, angle, distance - 4 * FRACUNIT);
    }
    tracing::trace!(?result, damage, "hitscan");
    result
}

/// Punch: a short line attack with a wider target.
pub fn fire_melee(world: &mut World<'_>, damage: i32) -> HitscanResult {
    let angle = world.player.angle;
    let result = line_attack(world, angle, MELEERANGE, MELEE_RADIUS_BONUS, damage);
    tracing::trace!(?result, damage, "melee");
    match result {
        HitscanResult::Wall { .. } => HitscanResult::Miss,
        other => other,
    }
}

fn line_attack(
    world: &mut World<'_>,
    angle: Angle,
    range: Fixed,
    radius_bonus: Fixed,
    damage: i32,
) -> HitscanResult {
    let fine = fine_index(angle);
    let (cos, sin) = (fine_cosine(fine), fine_sine(fine));
    let p = &*world.player;
    let (px, py, eye) = (p.x, p.y, p.view_z);

    let target = world
        .mobjs
        .iter()
        .filter(|(_, m)| m.flags.contains(MobjFlags::SHOOTABLE))
        .filter_map(|(id, m)| {
            let dx = m.x.saturating_sub(px);
            let dy = m.y.saturating_sub(py);
            let along = dot(dx, dy, cos, sin) >> FRACBITS;
            let side = (cross(cos, sin, dx, dy) >> FRACBITS).abs();
            let reach = i64::from(m.radius) + i64::from(radius_bonus);
            let in_band =
                eye >= m.z - AIM_SLACK && eye <= m.z.saturating_add(m.height) + AIM_SLACK;
            (along > 0 && along <= i64::from(range) && side < reach && in_band)
                .then_some((id, along as Fixed, m.x, m.y))
        })
        .filter(|&(_, _, mx, my)| line_of_sight(world.map, px, py, mx, my))
        .min_by_key(|&(_, along, _, _)| along);

    if let Some((id, distance, _, _)) = target {
        let killed = world.damage_target(TargetRef::Mobj(id), Some(TargetRef::Player), damage);
        return HitscanResult::Mobj {
            id,
            distance,
            killed,
        };
    }
    match trace_to_wall(world.map, px, py, angle, range) {
        Some(distance) => HitscanResult::Wall { distance },
        None => HitscanResult::Miss,
    }
}

/// March from `(x, y)` along `angle` in [`TRACE_STEP`] strides. Returns the
/// distance of the first stride that crosses a one-sided line or leaves
/// the map, `None` if `max` is reached first.
pub fn trace_to_wall(map: &MapData, x: Fixed, y: Fixed, angle: Angle, max: Fixed) -> Option<Fixed> {
    let fine = fine_index(angle);
    let (cos, sin) = (i64::from(fine_cosine(fine)), i64::from(fine_sine(fine)));
    let point = |d: Fixed| {
        let d = i64::from(d);
        (
            (i64::from(x) + ((d * cos) >> FRACBITS)) as Fixed,
            (i64::from(y) + ((d * sin) >> FRACBITS)) as Fixed,
        )
    };
    let (mut lx, mut ly) = (x, y);
    let mut distance = 0;
    while distance < max {
        distance = (distance + TRACE_STEP).min(max);
        let (nx, ny) = point(distance);
        if map.sector_at(nx, ny).is_none() || !line_of_sight(map, lx, ly, nx, ny) {
            return Some(distance);
        }
        (lx, ly) = (nx, ny);
    }
    None
}

fn spawn_puff(world: &mut World<'_>, angle: Angle, distance: Fixed) {
    let fine = fine_index(angle);
    let d = i64::from(distance.max(0));
    let x = world.player.x + ((d * i64::from(fine_cosine(fine))) >> FRACBITS) as Fixed;
    let y = world.player.y + ((d * i64::from(fine_sine(fine))) >> FRACBITS) as Fixed;
    let id = world.mobjs.spawn(world.map, MobjType::Puff, x, y, ONFLOORZ);
    let z = world.player.view_z;
    if let Some(puff) = world.mobjs.get_mut(id) {
        puff.z = z;
    }
}

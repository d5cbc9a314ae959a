//! Missiles: spawning, flight and impact.

use crate::ai::World;
use crate::angle::{fine_index, point_to_angle};
use crate::constants::MISSILE_SPAWN_HEIGHT;
use crate::error::DoomError;
use crate::fixed::{FRACUNIT, Fixed, approx_distance, fixed_mul};
use crate::info::MobjType;
use crate::mobj::{self, Mobj, MobjFlags, MobjId, MobjList, TargetRef, set_mobj_state};
use crate::movement::hits_wall;
use crate::tables::{fine_cosine, fine_sine};

/// Launch a missile of `kind` from `source` toward `(tx, ty, tz)`.
///
/// `owner` is credited with any damage and is never hit by it.
pub fn spawn_missile(
    mobjs: &mut MobjList,
    source: &Mobj,
    owner: Option<TargetRef>,
    tx: Fixed,
    ty: Fixed,
    tz: Fixed,
    kind: MobjType,
) -> crate::Result<MobjId> {
    if !kind.is_missile() {
        return Err(DoomError::UnknownMissileType(kind));
    }
    let mut missile = Mobj::new(kind, source.x, source.y, source.z + MISSILE_SPAWN_HEIGHT);
    missile.floor_z = source.floor_z;
    missile.ceiling_z = source.ceiling_z;
    missile.target = owner;

    let angle = point_to_angle(source.x, source.y, tx, ty);
    let speed = missile.info().speed;
    let fine = fine_index(angle);
    missile.angle = angle;
    missile.momx = fixed_mul(speed, fine_cosine(fine));
    missile.momy = fixed_mul(speed, fine_sine(fine));

    // Tics of flight to cover the distance, at least one.
    let flight = (approx_distance(tx - source.x, ty - source.y) / speed.max(FRACUNIT)).max(1);
    missile.momz = (tz - missile.z) / flight;

    tracing::trace!(
        kind = ?kind,
        x = missile.x >> 16,
        y = missile.y >> 16,
        "missile spawned"
    );
    Ok(mobjs.add(missile))
}

/// Stop a missile and play its death animation.
pub fn explode_missile(missile: &mut Mobj) {
    missile.momx = 0;
    missile.momy = 0;
    missile.momz = 0;
    missile.flags.remove(MobjFlags::MISSILE);
    match missile.info().death_state {
        Some(death) => {
            set_mobj_state(missile, death);
        }
        None => missile.remove(),
    }
    tracing::trace!(kind = ?missile.kind, x = missile.x >> 16, y = missile.y >> 16, "missile exploded");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Impact {
    Wall,
    Target(TargetRef),
}

fn overlaps(a: &Mobj, x: Fixed, y: Fixed, z: Fixed, radius: Fixed, height: Fixed) -> bool {
    let reach = a.radius.saturating_add(radius).unsigned_abs();
    a.x.abs_diff(x) < reach
        && a.y.abs_diff(y) < reach
        && a.z < z.saturating_add(height)
        && a.z.saturating_add(a.height) > z
}

/// What a missile at its current position runs into, if anything.
fn find_impact(world: &World<'_>, id: MobjId, missile: &Mobj) -> Option<Impact> {
    if hits_wall(
        world.map,
        missile.x,
        missile.y,
        missile.z,
        missile.radius,
        missile.height,
    ) || missile.z < missile.floor_z
        || missile.z.saturating_add(missile.height) > missile.ceiling_z
    {
        return Some(Impact::Wall);
    }

    let owner = missile.target;
    let p = &*world.player;
    if owner != Some(TargetRef::Player)
        && p.health > 0
        && overlaps(missile, p.x, p.y, p.z, p.radius, p.height)
    {
        return Some(Impact::Target(TargetRef::Player));
    }

    let owner_kind = match owner {
        Some(TargetRef::Mobj(o)) => world.mobjs.get(o).map(|m| m.kind),
        _ => None,
    };
    world
        .mobjs
        .iter()
        .find(|(other_id, other)| {
            *other_id != id
                && Some(TargetRef::Mobj(*other_id)) != owner
                && Some(other.kind) != owner_kind
                && other.flags.contains(MobjFlags::SHOOTABLE)
                && !other.flags.contains(MobjFlags::MISSILE)
                && overlaps(missile, other.x, other.y, other.z, other.radius, other.height)
        })
        .map(|(other_id, _)| Impact::Target(TargetRef::Mobj(other_id)))
}

/// Fly every live missile one tic and resolve impacts.
pub fn tick_projectiles(world: &mut World<'_>) {
    for id in world.mobjs.ids() {
        let Some(missile) = world.mobjs.get_mut(id) else {
            continue;
        };
        if !missile.flags.contains(MobjFlags::MISSILE) {
            continue;
        }
        missile.x = missile.x.saturating_add(missile.momx);
        missile.y = missile.y.saturating_add(missile.momy);
        missile.z = missile.z.saturating_add(missile.momz);
        if let Some(sector) = world.map.sector_at(missile.x, missile.y) {
            missile.floor_z = sector.floor_height;
            missile.ceiling_z = sector.ceiling_height;
        }

        let snapshot = missile.clone();
        let Some(impact) = find_impact(world, id, &snapshot) else {
            continue;
        };
        if let Impact::Target(victim) = impact {
            let damage = (world.rng.p_random() % 8 + 1) * snapshot.info().damage;
            match victim {
                TargetRef::Player => {
                    world.damage_target(victim, snapshot.target, damage);
                }
                TargetRef::Mobj(victim) => {
                    mobj::damage_mobj(world, victim, snapshot.target, damage);
                }
            }
        }
        if let Some(missile) = world.mobjs.get_mut(id) {
            explode_missile(missile);
        }
    }
}

//! Monster behaviour.
//!
//! Each [`Action`] a state can carry maps to one function here. Monsters
//! idle in `Look`, hunt in `Chase` and hand off to their melee or missile
//! states when in range.
//!
//! The player and other monsters are both huntable; [`AiTarget`] is the
//! snapshot AI code sees of either.

use crate::angle::{ANG45, ANG90, ANG270, point_to_angle};
use crate::constants::{MELEERANGE, MISSILE_CHANCE, MISSILERANGE};
use crate::fixed::{Fixed, approx_distance};
use crate::info::{Action, MobjType};
use crate::map::MapData;
use crate::menu::Skill;
use crate::mobj::{self, Mobj, MobjFlags, MobjId, MobjList, TargetRef, set_mobj_state};
use crate::movement::{self, fast_monsters};
use crate::player::PlayerState;
use crate::projectiles::spawn_missile;
use crate::random::DoomRng;
use crate::sight::check_sight;

/// Mutable game state one tic of thinking runs against.
pub struct World<'a> {
    pub map: &'a MapData,
    pub mobjs: &'a mut MobjList,
    pub player: &'a mut PlayerState,
    pub rng: &'a mut DoomRng,
    pub skill: Skill,
}

/// What AI code needs to know about a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AiTarget {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub radius: Fixed,
    pub height: Fixed,
    pub health: i32,
    /// Can still be hurt.
    pub shootable: bool,
}

/// Anything monsters can see, chase and attack.
pub trait Targetable {
    fn ai_target(&self) -> AiTarget;
}

impl Targetable for Mobj {
    fn ai_target(&self) -> AiTarget {
        AiTarget {
            x: self.x,
            y: self.y,
            z: self.z,
            radius: self.radius,
            height: self.height,
            health: self.health,
            shootable: self.flags.contains(MobjFlags::SHOOTABLE),
        }
    }
}

impl Targetable for PlayerState {
    fn ai_target(&self) -> AiTarget {
        AiTarget {
            x: self.x,
            y: self.y,
            z: self.z,
            radius: self.radius,
            height: self.height,
            health: self.health,
            shootable: self.health > 0,
        }
    }
}

impl World<'_> {
    /// Current snapshot of a target, `None` once it is gone.
    pub fn resolve(&self, target: TargetRef) -> Option<AiTarget> {
        match target {
            TargetRef::Player => Some(self.player.ai_target()),
            TargetRef::Mobj(id) => self.mobjs.get(id).map(Targetable::ai_target),
        }
    }

    /// A mobj's target reference and its snapshot.
    pub fn target_of(&self, id: MobjId) -> Option<(TargetRef, AiTarget)> {
        let target = self.mobjs.get(id)?.target?;
        self.resolve(target).map(|t| (target, t))
    }

    /// Hurt a player or mobj. Returns `true` if the hit was lethal.
    pub fn damage_target(
        &mut self,
        target: TargetRef,
        source: Option<TargetRef>,
        damage: i32,
    ) -> bool {
        match target {
            TargetRef::Player => {
                let dealt = self.player.take_damage(damage, self.skill, source);
                tracing::trace!(damage, dealt, health = self.player.health, "player hit");
                dealt > 0 && self.player.health <= 0
            }
            TargetRef::Mobj(id) => mobj::damage_mobj(self, id, source, damage),
        }
    }
}

/// Run the code attached to a state.
pub fn run_action(world: &mut World<'_>, id: MobjId, action: Action) {
    match action {
        Action::None => {}
        Action::Look => a_look(world, id),
        Action::Chase => a_chase(world, id),
        Action::FaceTarget => a_face_target(world, id),
        Action::PosAttack => a_pos_attack(world, id),
        Action::SPosAttack => a_spos_attack(world, id),
        Action::TroopAttack => a_troop_attack(world, id),
        Action::SargAttack => a_sarg_attack(world, id),
        Action::Fall => a_fall(world, id),
    }
}

/// Acquire the player if visible. Without `all_around`, a player behind
/// the monster is only noticed within melee range.
fn look_for_player(world: &mut World<'_>, id: MobjId, all_around: bool) -> bool {
    if world.player.health <= 0 {
        return false;
    }
    let player = world.player.ai_target();
    let Some(mobj) = world.mobjs.get(id) else {
        return false;
    };
    if !check_sight(world.map, &mobj.ai_target(), &player) {
        return false;
    }
    if !all_around {
        let an = point_to_angle(mobj.x, mobj.y, player.x, player.y).wrapping_sub(mobj.angle);
        if an > ANG90
            && an < ANG270
            && approx_distance(player.x - mobj.x, player.y - mobj.y) > MELEERANGE
        {
            return false;
        }
    }
    if let Some(mobj) = world.mobjs.get_mut(id) {
        mobj.target = Some(TargetRef::Player);
    }
    true
}

/// Idle: wake up and start chasing once the player is seen.
pub fn a_look(world: &mut World<'_>, id: MobjId) {
    match world.mobjs.get_mut(id) {
        Some(mobj) => mobj.threshold = 0,
        None => return,
    }
    if !look_for_player(world, id, false) {
        return;
    }
    if let Some(mobj) = world.mobjs.get_mut(id) {
        tracing::debug!(kind = ?mobj.kind, "monster acquires target");
        let see = mobj.info().see_state;
        set_mobj_state(mobj, see);
    }
}

/// Within melee reach of its target and able to see it.
pub fn check_melee_range(world: &World<'_>, id: MobjId) -> bool {
    let (Some(mobj), Some((_, target))) = (world.mobjs.get(id), world.target_of(id)) else {
        return false;
    };
    approx_distance(target.x - mobj.x, target.y - mobj.y) < MELEERANGE
        && check_sight(world.map, &mobj.ai_target(), &target)
}

/// Whether to open fire this tic: target visible and in range, then a
/// small random chance. Being hurt forces a shot back.
pub fn check_missile_range(world: &mut World<'_>, id: MobjId) -> bool {
    let (Some(mobj), Some((_, target))) = (world.mobjs.get(id), world.target_of(id)) else {
        return false;
    };
    if !check_sight(world.map, &mobj.ai_target(), &target) {
        return false;
    }
    let just_hit = mobj.flags.contains(MobjFlags::JUSTHIT);
    let reacting = mobj.reaction_time > 0;
    let dist = approx_distance(target.x - mobj.x, target.y - mobj.y);
    if just_hit {
        if let Some(mobj) = world.mobjs.get_mut(id) {
            mobj.flags.remove(MobjFlags::JUSTHIT);
        }
        return true;
    }
    if reacting || dist > MISSILERANGE {
        return false;
    }
    world.rng.p_random() < MISSILE_CHANCE
}

/// Hunt: turn toward the walking direction, attack when possible,
/// otherwise keep walking.
pub fn a_chase(world: &mut World<'_>, id: MobjId) {
    let target = world.target_of(id).map(|(_, t)| t);
    let skill = world.skill;
    let Some(mobj) = world.mobjs.get_mut(id) else {
        return;
    };
    let info = mobj.info();

    if mobj.reaction_time > 0 {
        mobj.reaction_time -= 1;
    }
    if mobj.threshold > 0 {
        if target.is_none_or(|t| t.health <= 0) {
            mobj.threshold = 0;
        } else {
            mobj.threshold -= 1;
        }
    }

    // Turn toward the movement direction, 45 degrees per step.
    if let Some(dir_angle) = mobj.movedir.angle() {
        mobj.angle &= 7 << 29;
        let delta = mobj.angle.wrapping_sub(dir_angle) as i32;
        if delta > 0 {
            mobj.angle = mobj.angle.wrapping_sub(ANG45);
        } else if delta < 0 {
            mobj.angle = mobj.angle.wrapping_add(ANG45);
        }
    }

    if !target.is_some_and(|t| t.shootable) {
        if look_for_player(world, id, true) {
            return;
        }
        if let Some(mobj) = world.mobjs.get_mut(id) {
            mobj.target = None;
            set_mobj_state(mobj, info.spawn_state);
        }
        return;
    }

    if mobj.flags.contains(MobjFlags::JUSTATTACKED) {
        mobj.flags.remove(MobjFlags::JUSTATTACKED);
        if !fast_monsters(skill) {
            movement::new_chase_dir(world, id);
        }
        return;
    }

    if let Some(melee) = info.melee_state {
        if check_melee_range(world, id) {
            if let Some(mobj) = world.mobjs.get_mut(id) {
                set_mobj_state(mobj, melee);
            }
            return;
        }
    }

    if let Some(missile) = info.missile_state {
        if check_missile_range(world, id) {
            if let Some(mobj) = world.mobjs.get_mut(id) {
                set_mobj_state(mobj, missile);
                mobj.flags.insert(MobjFlags::JUSTATTACKED);
            }
            return;
        }
    }

    let keep_going = match world.mobjs.get_mut(id) {
        Some(mobj) => {
            mobj.movecount -= 1;
            mobj.movecount >= 0
        }
        None => return,
    };
    if !keep_going || !movement::p_move(world, id) {
        movement::new_chase_dir(world, id);
    }
}

/// Turn to face the current target.
pub fn a_face_target(world: &mut World<'_>, id: MobjId) {
    let Some((_, target)) = world.target_of(id) else {
        return;
    };
    if let Some(mobj) = world.mobjs.get_mut(id) {
        mobj.flags.remove(MobjFlags::AMBUSH);
        mobj.angle = point_to_angle(mobj.x, mobj.y, target.x, target.y);
    }
}

/// Face the target and report whether it can be hit by a hitscan attack.
fn aim(world: &mut World<'_>, id: MobjId) -> Option<TargetRef> {
    a_face_target(world, id);
    let (target_ref, target) = world.target_of(id)?;
    let mobj = world.mobjs.get(id)?;
    check_sight(world.map, &mobj.ai_target(), &target).then_some(target_ref)
}

/// Zombieman pistol shot.
pub fn a_pos_attack(world: &mut World<'_>, id: MobjId) {
    let Some(target) = aim(world, id) else {
        return;
    };
    let damage = (world.rng.p_random() % 5 + 1) * 3;
    world.damage_target(target, Some(TargetRef::Mobj(id)), damage);
}

/// Shotgun guy: three pellets.
pub fn a_spos_attack(world: &mut World<'_>, id: MobjId) {
    let Some(target) = aim(world, id) else {
        return;
    };
    for _ in 0..3 {
        let damage = (world.rng.p_random() % 5 + 1) * 3;
        world.damage_target(target, Some(TargetRef::Mobj(id)), damage);
    }
}

/// Imp: claw in melee range, fireball otherwise.
pub fn a_troop_attack(world: &mut World<'_>, id: MobjId) {
    let Some((target_ref, target)) = world.target_of(id) else {
        return;
    };
    a_face_target(world, id);
    if check_melee_range(world, id) {
        let damage = (world.rng.p_random() % 8 + 1) * 3;
        world.damage_target(target_ref, Some(TargetRef::Mobj(id)), damage);
        return;
    }
    let Some(source) = world.mobjs.get(id).cloned() else {
        return;
    };
    if let Err(err) = spawn_missile(
        world.mobjs,
        &source,
        Some(TargetRef::Mobj(id)),
        target.x,
        target.y,
        target.z,
        MobjType::TroopShot,
    ) {
        tracing::warn!(%err, "imp missile spawn failed");
    }
}

/// Demon bite.
pub fn a_sarg_attack(world: &mut World<'_>, id: MobjId) {
    let Some((target_ref, _)) = world.target_of(id) else {
        return;
    };
    a_face_target(world, id);
    if check_melee_range(world, id) {
        let damage = (world.rng.p_random() % 10 + 1) * 4;
        world.damage_target(target_ref, Some(TargetRef::Mobj(id)), damage);
    }
}

/// Corpses stop blocking.
pub fn a_fall(world: &mut World<'_>, id: MobjId) {
    if let Some(mobj) = world.mobjs.get_mut(id) {
        mobj.flags.remove(MobjFlags::SOLID);
    }
}

/// Whether a mobj is still in its idle loop.
pub fn is_idle(mobj: &Mobj) -> bool {
    mobj.state == mobj.info().spawn_state
        || mobj.state.info().next == mobj.info().spawn_state && mobj.state.info().action == Action::Look
}

/// Whether a mobj is in one of its attack sequences.
pub fn is_attacking(mobj: &Mobj) -> bool {
    let info = mobj.info();
    let Some(mut state) = info.melee_state.or(info.missile_state) else {
        return false;
    };
    // Attack sequences are short chains ending back in the run loop.
    for _ in 0..8 {
        if state == mobj.state {
            return true;
        }
        state = state.info().next;
        if state == info.see_state {
            break;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MapBuilder;
    use crate::angle::ANG180;
    use crate::fixed::FRACUNIT;
    use crate::info::StateNum;

    const U: Fixed = FRACUNIT;

    struct Fixture {
        map: MapData,
        mobjs: MobjList,
        player: PlayerState,
        rng: DoomRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                map: MapBuilder::demo(),
                mobjs: MobjList::new(),
                player: PlayerState::default(),
                rng: DoomRng::new(5),
            }
        }

        fn world(&mut self) -> World<'_> {
            World {
                map: &self.map,
                mobjs: &mut self.mobjs,
                player: &mut self.player,
                rng: &mut self.rng,
                skill: Skill::Medium,
            }
        }
    }

    #[test]
    fn look_wakes_on_sight() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Troop, 100 * U, 0, 0);
        m.angle = ANG180;
        let id = f.mobjs.add(m);
        a_look(&mut f.world(), id);
        let m = f.mobjs.get(id).unwrap();
        assert_eq!(m.target, Some(TargetRef::Player));
        assert_eq!(m.state, StateNum::TrooRun1);
    }

    #[test]
    fn look_ignores_player_behind_at_range() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Troop, 200 * U, 0, 0);
        m.angle = 0; // facing away from the player at the origin
        let id = f.mobjs.add(m);
        a_look(&mut f.world(), id);
        assert_eq!(f.mobjs.get(id).unwrap().state, StateNum::TrooStnd);
    }

    #[test]
    fn look_blocked_by_wall() {
        let mut f = Fixture::new();
        f.player.x = 400 * U;
        let id = f.mobjs.add(Mobj::new(MobjType::Troop, 0, 400 * U, 16 * U));
        a_look(&mut f.world(), id);
        assert!(f.mobjs.get(id).unwrap().target.is_none());
    }

    #[test]
    fn dead_player_is_not_seen() {
        let mut f = Fixture::new();
        f.player.health = 0;
        let id = f.mobjs.add(Mobj::new(MobjType::Troop, 30 * U, 0, 0));
        a_look(&mut f.world(), id);
        assert!(f.mobjs.get(id).unwrap().target.is_none());
    }

    #[test]
    fn chase_enters_melee_when_close() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Sergeant, 50 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        set_mobj_state(&mut m, StateNum::SargRun1);
        let id = f.mobjs.add(m);
        a_chase(&mut f.world(), id);
        assert_eq!(f.mobjs.get(id).unwrap().state, StateNum::SargAtk1);
    }

    #[test]
    fn just_attacked_moves_instead() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Sergeant, 50 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        m.flags.insert(MobjFlags::JUSTATTACKED);
        set_mobj_state(&mut m, StateNum::SargRun1);
        let id = f.mobjs.add(m);
        a_chase(&mut f.world(), id);
        let m = f.mobjs.get(id).unwrap();
        assert_eq!(m.state, StateNum::SargRun1);
        assert!(!m.flags.contains(MobjFlags::JUSTATTACKED));
    }

    #[test]
    fn lost_target_returns_to_idle() {
        let mut f = Fixture::new();
        f.player.health = 0;
        let mut m = Mobj::new(MobjType::Troop, 100 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        set_mobj_state(&mut m, StateNum::TrooRun1);
        let id = f.mobjs.add(m);
        a_chase(&mut f.world(), id);
        let m = f.mobjs.get(id).unwrap();
        assert_eq!(m.state, StateNum::TrooStnd);
        assert!(m.target.is_none());
    }

    #[test]
    fn hurt_monster_fires_back() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Possessed, 300 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        m.reaction_time = 0;
        m.flags.insert(MobjFlags::JUSTHIT);
        set_mobj_state(&mut m, StateNum::PossRun1);
        let id = f.mobjs.add(m);
        a_chase(&mut f.world(), id);
        let m = f.mobjs.get(id).unwrap();
        assert_eq!(m.state, StateNum::PossAtk1);
        assert!(m.flags.contains(MobjFlags::JUSTATTACKED));
    }

    #[test]
    fn chase_walks_toward_target() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Troop, -200 * U, -200 * U, 0);
        m.target = Some(TargetRef::Player);
        set_mobj_state(&mut m, StateNum::TrooRun1);
        let id = f.mobjs.add(m);
        // Reaction time keeps it from shooting while it closes in.
        for _ in 0..4 {
            a_chase(&mut f.world(), id);
        }
        let m = f.mobjs.get(id).unwrap();
        assert!(m.x > -200 * U || m.y > -200 * U);
    }

    #[test]
    fn face_target_points_at_it() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Troop, 0, 100 * U, 0);
        m.target = Some(TargetRef::Player);
        m.flags.insert(MobjFlags::AMBUSH);
        let id = f.mobjs.add(m);
        a_face_target(&mut f.world(), id);
        let m = f.mobjs.get(id).unwrap();
        assert_eq!(m.angle, ANG270);
        assert!(!m.flags.contains(MobjFlags::AMBUSH));
    }

    #[test]
    fn pistol_attack_hurts_visible_player() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Possessed, 100 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        let id = f.mobjs.add(m);
        a_pos_attack(&mut f.world(), id);
        assert!(f.player.health < 100);
        assert!(f.player.health >= 85);
    }

    #[test]
    fn shotgun_attack_blocked_by_wall() {
        let mut f = Fixture::new();
        f.player.x = 400 * U;
        let mut m = Mobj::new(MobjType::Shotguy, 0, 400 * U, 16 * U);
        m.target = Some(TargetRef::Player);
        let id = f.mobjs.add(m);
        a_spos_attack(&mut f.world(), id);
        assert_eq!(f.player.health, 100);
    }

    #[test]
    fn imp_throws_fireball_at_range() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Troop, 200 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        let id = f.mobjs.add(m);
        a_troop_attack(&mut f.world(), id);
        assert_eq!(f.mobjs.len(), 2);
        let ball = f
            .mobjs
            .iter()
            .find(|(_, m)| m.kind == MobjType::TroopShot)
            .map(|(_, m)| m.clone())
            .unwrap();
        assert!(ball.momx < 0);
        assert_eq!(ball.target, Some(TargetRef::Mobj(id)));
    }

    #[test]
    fn imp_claws_in_melee() {
        let mut f = Fixture::new();
        let mut m = Mobj::new(MobjType::Troop, 40 * U, 0, 0);
        m.target = Some(TargetRef::Player);
        let id = f.mobjs.add(m);
        a_troop_attack(&mut f.world(), id);
        assert_eq!(f.mobjs.len(), 1);
        assert!(f.player.health <= 97);
    }

    #[test]
    fn monsters_fight_back_at_monsters() {
        let mut f = Fixture::new();
        let victim = f.mobjs.add(Mobj::new(MobjType::Troop, 60 * U, 60 * U, 0));
        let mut m = Mobj::new(MobjType::Sergeant, 60 * U, 110 * U, 0);
        m.target = Some(TargetRef::Mobj(victim));
        let biter = f.mobjs.add(m);
        a_sarg_attack(&mut f.world(), biter);
        let v = f.mobjs.get(victim).unwrap();
        assert!(v.health < 60);
        assert_eq!(v.target, Some(TargetRef::Mobj(biter)));
        assert_eq!(f.player.health, 100);
    }

    #[test]
    fn fall_clears_solid() {
        let mut f = Fixture::new();
        let id = f.mobjs.add(Mobj::new(MobjType::Troop, 0, 0, 0));
        a_fall(&mut f.world(), id);
        assert!(!f.mobjs.get(id).unwrap().flags.contains(MobjFlags::SOLID));
    }

    #[test]
    fn idle_and_attack_classification() {
        let mut m = Mobj::new(MobjType::Troop, 0, 0, 0);
        assert!(is_idle(&m));
        assert!(!is_attacking(&m));
        set_mobj_state(&mut m, StateNum::TrooAtk2);
        assert!(is_attacking(&m));
        assert!(!is_idle(&m));
    }
}

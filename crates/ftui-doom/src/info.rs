//! Static state and thing tables.
//!
//! `STATES` is the animation graph every mobj walks through; `MOBJINFO`
//! carries per-type stats. Both are immutable and indexed by enum, so a
//! state or type can never be out of range.

use crate::fixed::{FRACUNIT, Fixed};
use crate::mobj::MobjFlags;

/// Frame bit marking a fullbright (unshaded) frame.
pub const FF_FULLBRIGHT: u32 = 0x8000;
pub const FF_FRAMEMASK: u32 = 0x7fff;

/// Four-letter sprite prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteNum {
    Poss,
    Spos,
    Troo,
    Sarg,
    Bal1,
    Puff,
}

impl SpriteNum {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Poss => "POSS",
            Self::Spos => "SPOS",
            Self::Troo => "TROO",
            Self::Sarg => "SARG",
            Self::Bal1 => "BAL1",
            Self::Puff => "PUFF",
        }
    }
}

/// Code run when a mobj enters a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    None,
    Look,
    Chase,
    FaceTarget,
    PosAttack,
    SPosAttack,
    TroopAttack,
    SargAttack,
    Fall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub sprite: SpriteNum,
    /// Frame index, possibly with [`FF_FULLBRIGHT`].
    pub frame: u32,
    /// Duration; -1 holds forever.
    pub tics: i32,
    pub action: Action,
    pub next: StateNum,
}

impl State {
    #[inline]
    pub const fn frame_index(&self) -> usize {
        (self.frame & FF_FRAMEMASK) as usize
    }

    #[inline]
    pub const fn is_bright(&self) -> bool {
        self.frame & FF_FULLBRIGHT != 0
    }
}

const BRIGHT: u32 = FF_FULLBRIGHT;

macro_rules! state_table {
    ($($name:ident = $sprite:ident, $frame:expr, $tics:expr, $action:ident, $next:ident;)*) => {
        /// Index into [`STATES`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum StateNum {
            $($name,)*
        }

        pub static STATES: &[State] = &[
            $(State {
                sprite: SpriteNum::$sprite,
                frame: $frame,
                tics: $tics,
                action: Action::$action,
                next: StateNum::$next,
            },)*
        ];
    };
}

state_table! {
    // Marks the mobj for removal.
    Null = Troo, 0, -1, None, Null;

    PossStnd = Poss, 0, 10, Look, PossStnd2;
    PossStnd2 = Poss, 1, 10, Look, PossStnd;
    PossRun1 = Poss, 0, 4, Chase, PossRun2;
    PossRun2 = Poss, 0, 4, Chase, PossRun3;
    PossRun3 = Poss, 1, 4, Chase, PossRun4;
    PossRun4 = Poss, 1, 4, Chase, PossRun5;
    PossRun5 = Poss, 2, 4, Chase, PossRun6;
    PossRun6 = Poss, 2, 4, Chase, PossRun7;
    PossRun7 = Poss, 3, 4, Chase, PossRun8;
    PossRun8 = Poss, 3, 4, Chase, PossRun1;
    PossAtk1 = Poss, 4, 10, FaceTarget, PossAtk2;
    PossAtk2 = Poss, 5 | BRIGHT, 8, PosAttack, PossAtk3;
    PossAtk3 = Poss, 4, 8, None, PossRun1;
    PossPain = Poss, 6, 3, None, PossPain2;
    PossPain2 = Poss, 6, 3, None, PossRun1;
    PossDie1 = Poss, 7, 5, None, PossDie2;
    PossDie2 = Poss, 8, 5, None, PossDie3;
    PossDie3 = Poss, 9, 5, Fall, PossDie4;
    PossDie4 = Poss, 10, 5, None, PossDie5;
    PossDie5 = Poss, 11, -1, None, Null;

    SposStnd = Spos, 0, 10, Look, SposStnd2;
    SposStnd2 = Spos, 1, 10, Look, SposStnd;
    SposRun1 = Spos, 0, 3, Chase, SposRun2;
    SposRun2 = Spos, 0, 3, Chase, SposRun3;
    SposRun3 = Spos, 1, 3, Chase, SposRun4;
    SposRun4 = Spos, 1, 3, Chase, SposRun5;
    SposRun5 = Spos, 2, 3, Chase, SposRun6;
    SposRun6 = Spos, 2, 3, Chase, SposRun7;
    SposRun7 = Spos, 3, 3, Chase, SposRun8;
    SposRun8 = Spos, 3, 3, Chase, SposRun1;
    SposAtk1 = Spos, 4, 10, FaceTarget, SposAtk2;
    SposAtk2 = Spos, 5 | BRIGHT, 10, SPosAttack, SposAtk3;
    SposAtk3 = Spos, 4, 10, None, SposRun1;
    SposPain = Spos, 6, 3, None, SposPain2;
    SposPain2 = Spos, 6, 3, None, SposRun1;
    SposDie1 = Spos, 7, 5, None, SposDie2;
    SposDie2 = Spos, 8, 5, None, SposDie3;
    SposDie3 = Spos, 9, 5, Fall, SposDie4;
    SposDie4 = Spos, 10, 5, None, SposDie5;
    SposDie5 = Spos, 11, -1, None, Null;

    TrooStnd = Troo, 0, 10, Look, TrooStnd2;
    TrooStnd2 = Troo, 1, 10, Look, TrooStnd;
    TrooRun1 = Troo, 0, 3, Chase, TrooRun2;
    TrooRun2 = Troo, 0, 3, Chase, TrooRun3;
    TrooRun3 = Troo, 1, 3, Chase, TrooRun4;
    TrooRun4 = Troo, 1, 3, Chase, TrooRun5;
    TrooRun5 = Troo, 2, 3, Chase, TrooRun6;
    TrooRun6 = Troo, 2, 3, Chase, TrooRun7;
    TrooRun7 = Troo, 3, 3, Chase, TrooRun8;
    TrooRun8 = Troo, 3, 3, Chase, TrooRun1;
    TrooAtk1 = Troo, 4, 8, FaceTarget, TrooAtk2;
    TrooAtk2 = Troo, 5, 8, FaceTarget, TrooAtk3;
    TrooAtk3 = Troo, 6, 6, TroopAttack, TrooRun1;
    TrooPain = Troo, 7, 2, None, TrooPain2;
    TrooPain2 = Troo, 7, 2, None, TrooRun1;
    TrooDie1 = Troo, 8, 8, None, TrooDie2;
    TrooDie2 = Troo, 9, 8, None, TrooDie3;
    TrooDie3 = Troo, 10, 6, None, TrooDie4;
    TrooDie4 = Troo, 11, 6, Fall, TrooDie5;
    TrooDie5 = Troo, 12, -1, None, Null;

    SargStnd = Sarg, 0, 10, Look, SargStnd2;
    SargStnd2 = Sarg, 1, 10, Look, SargStnd;
    SargRun1 = Sarg, 0, 2, Chase, SargRun2;
    SargRun2 = Sarg, 0, 2, Chase, SargRun3;
    SargRun3 = Sarg, 1, 2, Chase, SargRun4;
    SargRun4 = Sarg, 1, 2, Chase, SargRun5;
    SargRun5 = Sarg, 2, 2, Chase, SargRun6;
    SargRun6 = Sarg, 2, 2, Chase, SargRun7;
    SargRun7 = Sarg, 3, 2, Chase, SargRun8;
    SargRun8 = Sarg, 3, 2, Chase, SargRun1;
    SargAtk1 = Sarg, 4, 8, FaceTarget, SargAtk2;
    SargAtk2 = Sarg, 5, 8, FaceTarget, SargAtk3;
    SargAtk3 = Sarg, 6, 8, SargAttack, SargRun1;
    SargPain = Sarg, 7, 2, None, SargPain2;
    SargPain2 = Sarg, 7, 2, None, SargRun1;
    SargDie1 = Sarg, 8, 8, None, SargDie2;
    SargDie2 = Sarg, 9, 8, None, SargDie3;
    SargDie3 = Sarg, 10, 4, None, SargDie4;
    SargDie4 = Sarg, 11, 4, Fall, SargDie5;
    SargDie5 = Sarg, 12, 4, None, SargDie6;
    SargDie6 = Sarg, 13, -1, None, Null;

    Tball1 = Bal1, BRIGHT, 4, None, Tball2;
    Tball2 = Bal1, 1 | BRIGHT, 4, None, Tball1;
    TballX1 = Bal1, 2 | BRIGHT, 6, None, TballX2;
    TballX2 = Bal1, 3 | BRIGHT, 6, None, TballX3;
    TballX3 = Bal1, 4 | BRIGHT, 6, None, Null;

    Puff1 = Puff, BRIGHT, 4, None, Puff2;
    Puff2 = Puff, 1, 4, None, Puff3;
    Puff3 = Puff, 2, 4, None, Puff4;
    Puff4 = Puff, 3, 4, None, Null;
}

impl StateNum {
    #[inline]
    pub fn info(self) -> &'static State {
        &STATES[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MobjType {
    Possessed,
    Shotguy,
    Troop,
    Sergeant,
    TroopShot,
    Puff,
}

/// Per-type stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobjInfo {
    /// Editor number placed in THINGS lumps.
    pub doomednum: Option<u16>,
    pub spawn_state: StateNum,
    pub spawn_health: i32,
    pub see_state: StateNum,
    pub reaction_time: i32,
    pub pain_state: Option<StateNum>,
    /// Out of 256.
    pub pain_chance: i32,
    pub melee_state: Option<StateNum>,
    pub missile_state: Option<StateNum>,
    pub death_state: Option<StateNum>,
    /// Map units per step for walkers, fixed point per tic for missiles.
    pub speed: i32,
    pub radius: Fixed,
    pub height: Fixed,
    pub mass: i32,
    /// Missile impact multiplier.
    pub damage: i32,
    pub flags: MobjFlags,
}

const MONSTER: MobjFlags = MobjFlags::SOLID
    .union(MobjFlags::SHOOTABLE)
    .union(MobjFlags::COUNTKILL);

pub static MOBJINFO: [MobjInfo; 6] = [
    // Possessed
    MobjInfo {
        doomednum: Some(3004),
        spawn_state: StateNum::PossStnd,
        spawn_health: 20,
        see_state: StateNum::PossRun1,
        reaction_time: 8,
        pain_state: Some(StateNum::PossPain),
        pain_chance: 200,
        melee_state: None,
        missile_state: Some(StateNum::PossAtk1),
        death_state: Some(StateNum::PossDie1),
        speed: 8,
        radius: 20 * FRACUNIT,
        height: 56 * FRACUNIT,
        mass: 100,
        damage: 0,
        flags: MONSTER,
    },
    // Shotguy
    MobjInfo {
        doomednum: Some(9),
        spawn_state: StateNum::SposStnd,
        spawn_health: 30,
        see_state: StateNum::SposRun1,
        reaction_time: 8,
        pain_state: Some(StateNum::SposPain),
        pain_chance: 170,
        melee_state: None,
        missile_state: Some(StateNum::SposAtk1),
        death_state: Some(StateNum::SposDie1),
        speed: 8,
        radius: 20 * FRACUNIT,
        height: 56 * FRACUNIT,
        mass: 100,
        damage: 0,
        flags: MONSTER,
    },
    // Troop
    MobjInfo {
        doomednum: Some(3001),
        spawn_state: StateNum::TrooStnd,
        spawn_health: 60,
        see_state: StateNum::TrooRun1,
        reaction_time: 8,
        pain_state: Some(StateNum::TrooPain),
        pain_chance: 200,
        melee_state: Some(StateNum::TrooAtk1),
        missile_state: Some(StateNum::TrooAtk1),
        death_state: Some(StateNum::TrooDie1),
        speed: 8,
        radius: 20 * FRACUNIT,
        height: 56 * FRACUNIT,
        mass: 100,
        damage: 0,
        flags: MONSTER,
    },
    // Sergeant
    MobjInfo {
        doomednum: Some(3002),
        spawn_state: StateNum::SargStnd,
        spawn_health: 150,
        see_state: StateNum::SargRun1,
        reaction_time: 8,
        pain_state: Some(StateNum::SargPain),
        pain_chance: 180,
        melee_state: Some(StateNum::SargAtk1),
        missile_state: None,
        death_state: Some(StateNum::SargDie1),
        speed: 10,
        radius: 30 * FRACUNIT,
        height: 56 * FRACUNIT,
        mass: 400,
        damage: 0,
        flags: MONSTER,
    },
    // TroopShot
    MobjInfo {
        doomednum: None,
        spawn_state: StateNum::Tball1,
        spawn_health: 1000,
        see_state: StateNum::Null,
        reaction_time: 8,
        pain_state: None,
        pain_chance: 0,
        melee_state: None,
        missile_state: None,
        death_state: Some(StateNum::TballX1),
        speed: 10 * FRACUNIT,
        radius: 6 * FRACUNIT,
        height: 8 * FRACUNIT,
        mass: 100,
        damage: 3,
        flags: MobjFlags::NOBLOCKMAP
            .union(MobjFlags::MISSILE)
            .union(MobjFlags::DROPOFF)
            .union(MobjFlags::NOGRAVITY),
    },
    // Puff
    MobjInfo {
        doomednum: None,
        spawn_state: StateNum::Puff1,
        spawn_health: 1000,
        see_state: StateNum::Null,
        reaction_time: 8,
        pain_state: None,
        pain_chance: 0,
        melee_state: None,
        missile_state: None,
        death_state: None,
        speed: 0,
        radius: 20 * FRACUNIT,
        height: 16 * FRACUNIT,
        mass: 100,
        damage: 0,
        flags: MobjFlags::NOBLOCKMAP.union(MobjFlags::NOGRAVITY),
    },
];

impl MobjType {
    pub const ALL: [Self; 6] = [
        Self::Possessed,
        Self::Shotguy,
        Self::Troop,
        Self::Sergeant,
        Self::TroopShot,
        Self::Puff,
    ];

    #[inline]
    pub fn info(self) -> &'static MobjInfo {
        &MOBJINFO[self as usize]
    }

    /// Type placed by a THINGS editor number.
    pub fn from_doomednum(num: u16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.info().doomednum == Some(num))
    }

    #[inline]
    pub fn is_missile(self) -> bool {
        self.info().flags.contains(MobjFlags::MISSILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_state_is_first() {
        assert_eq!(StateNum::Null as usize, 0);
        assert_eq!(StateNum::Null.info().next, StateNum::Null);
    }

    #[test]
    fn run_cycles_loop() {
        let mut s = StateNum::TrooRun1;
        for _ in 0..8 {
            assert_eq!(s.info().action, Action::Chase);
            s = s.info().next;
        }
        assert_eq!(s, StateNum::TrooRun1);
    }

    #[test]
    fn death_sequences_end_in_held_corpse() {
        for t in [
            MobjType::Possessed,
            MobjType::Shotguy,
            MobjType::Troop,
            MobjType::Sergeant,
        ] {
            let mut s = t.info().death_state.unwrap();
            let mut saw_fall = false;
            while s.info().tics != -1 {
                saw_fall |= s.info().action == Action::Fall;
                s = s.info().next;
            }
            assert!(saw_fall, "{t:?} never clears SOLID");
        }
    }

    #[test]
    fn fireball_is_a_missile() {
        assert!(MobjType::TroopShot.is_missile());
        assert!(!MobjType::Troop.is_missile());
        assert_eq!(MobjType::TroopShot.info().speed, 10 * FRACUNIT);
    }

    #[test]
    fn editor_numbers_resolve() {
        assert_eq!(MobjType::from_doomednum(3004), Some(MobjType::Possessed));
        assert_eq!(MobjType::from_doomednum(9), Some(MobjType::Shotguy));
        assert_eq!(MobjType::from_doomednum(3001), Some(MobjType::Troop));
        assert_eq!(MobjType::from_doomednum(3002), Some(MobjType::Sergeant));
        assert_eq!(MobjType::from_doomednum(1), None);
    }

    #[test]
    fn bright_frames_are_flagged() {
        let s = StateNum::PossAtk2.info();
        assert!(s.is_bright());
        assert_eq!(s.frame_index(), 5);
        assert!(!StateNum::PossAtk1.info().is_bright());
    }

    #[test]
    fn table_matches_type_order() {
        for t in MobjType::ALL {
            // Every type's spawn state uses a sprite, so the lookup is live.
            assert!(t.info().spawn_state != StateNum::Null, "{t:?}");
        }
        assert_eq!(MOBJINFO[MobjType::Sergeant as usize].radius, 30 * FRACUNIT);
    }
}

//! Title and skill-select menu.

use serde::{Deserialize, Serialize};

use crate::wad_types::ThingFlags;

/// Difficulty.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Baby,
    Easy,
    #[default]
    Medium,
    Hard,
    Nightmare,
}

impl Skill {
    pub const ALL: [Self; 5] = [
        Self::Baby,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::Nightmare,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// THINGS flag that places a thing on this skill.
    pub fn thing_flag(self) -> ThingFlags {
        match self {
            Self::Baby | Self::Easy => ThingFlags::EASY,
            Self::Medium => ThingFlags::NORMAL,
            Self::Hard | Self::Nightmare => ThingFlags::HARD,
        }
    }

    /// Menu text for this skill.
    pub fn label(self) -> &'static str {
        match self {
            Self::Baby => "I'm too young to die",
            Self::Easy => "Hey, not too rough",
            Self::Medium => "Hurt me plenty",
            Self::Hard => "Ultra-Violence",
            Self::Nightmare => "Nightmare!",
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Skill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baby" | "1" => Ok(Self::Baby),
            "easy" | "2" => Ok(Self::Easy),
            "medium" | "3" => Ok(Self::Medium),
            "hard" | "4" => Ok(Self::Hard),
            "nightmare" | "5" => Ok(Self::Nightmare),
            other => Err(format!("unknown skill {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MenuMode {
    #[default]
    Title,
    SkillSelect,
    /// In game; the menu is idle.
    Playing,
}

/// One tic of menu input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MenuInput {
    #[default]
    None,
    Up,
    Down,
    Confirm,
    Back,
}

/// What the host should do after a menu update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    None,
    StartGame(Skill),
    Quit,
}

pub const TITLE_ITEMS: [&str; 2] = ["New Game", "Quit"];
const NEW_GAME: usize = 0;
const QUIT: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub mode: MenuMode,
    /// Highlighted row in the current list.
    pub item: usize,
    /// Last chosen skill.
    pub skill: Skill,
    /// Tics since creation; drives title animation.
    pub tic: u64,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            mode: MenuMode::Title,
            item: 0,
            skill: Skill::Medium,
            tic: 0,
        }
    }
}

impl MenuState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` only while playing.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.mode != MenuMode::Playing
    }

    /// Rows in the current list.
    pub fn item_count(&self) -> usize {
        match self.mode {
            MenuMode::Title => TITLE_ITEMS.len(),
            MenuMode::SkillSelect => Skill::ALL.len(),
            MenuMode::Playing => 0,
        }
    }

    /// Advance one tic.
    pub fn update(&mut self, input: MenuInput) -> MenuAction {
        self.tic = self.tic.wrapping_add(1);
        let count = self.item_count();
        match (self.mode, input) {
            (MenuMode::Playing, _) | (_, MenuInput::None) => MenuAction::None,
            (_, MenuInput::Up) => {
                self.item = (self.item + count - 1) % count;
                MenuAction::None
            }
            (_, MenuInput::Down) => {
                self.item = (self.item + 1) % count;
                MenuAction::None
            }
            (MenuMode::Title, MenuInput::Confirm) => match self.item {
                NEW_GAME => {
                    self.mode = MenuMode::SkillSelect;
                    self.item = Skill::Medium.index();
                    tracing::debug!("menu: skill select");
                    MenuAction::None
                }
                QUIT => {
                    tracing::debug!("menu: quit");
                    MenuAction::Quit
                }
                _ => MenuAction::None,
            },
            (MenuMode::Title, MenuInput::Back) => MenuAction::None,
            (MenuMode::SkillSelect, MenuInput::Confirm) => {
                self.skill = Skill::from_index(self.item).unwrap_or_default();
                self.mode = MenuMode::Playing;
                tracing::debug!(skill = %self.skill, "menu: start game");
                MenuAction::StartGame(self.skill)
            }
            (MenuMode::SkillSelect, MenuInput::Back) => {
                self.mode = MenuMode::Title;
                self.item = 0;
                tracing::debug!("menu: back to title");
                MenuAction::None
            }
        }
    }

    /// Re-open the title menu from the game.
    pub fn open(&mut self) {
        self.mode = MenuMode::Title;
        self.item = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_title() {
        let m = MenuState::new();
        assert_eq!(m.mode, MenuMode::Title);
        assert_eq!(m.item, 0);
        assert_eq!(m.skill, Skill::Medium);
        assert_eq!(m.tic, 0);
        assert!(m.is_active());
    }

    #[test]
    fn title_wraps_both_ways() {
        let mut m = MenuState::new();
        m.update(MenuInput::Up);
        assert_eq!(m.item, 1);
        m.update(MenuInput::Down);
        assert_eq!(m.item, 0);
        m.update(MenuInput::Down);
        m.update(MenuInput::Down);
        assert_eq!(m.item, 0);
    }

    #[test]
    fn new_game_defaults_to_medium() {
        let mut m = MenuState::new();
        assert_eq!(m.update(MenuInput::Confirm), MenuAction::None);
        assert_eq!(m.mode, MenuMode::SkillSelect);
        assert_eq!(m.item, Skill::Medium.index());
    }

    #[test]
    fn quit_signals() {
        let mut m = MenuState::new();
        m.update(MenuInput::Down);
        assert_eq!(m.update(MenuInput::Confirm), MenuAction::Quit);
    }

    #[test]
    fn skill_list_wraps() {
        let mut m = MenuState::new();
        m.update(MenuInput::Confirm);
        for _ in 0..3 {
            m.update(MenuInput::Down);
        }
        assert_eq!(m.item, 0);
        m.update(MenuInput::Up);
        assert_eq!(m.item, 4);
    }

    #[test]
    fn confirming_skill_starts_game() {
        let mut m = MenuState::new();
        m.update(MenuInput::Confirm);
        m.update(MenuInput::Down);
        assert_eq!(
            m.update(MenuInput::Confirm),
            MenuAction::StartGame(Skill::Hard)
        );
        assert_eq!(m.mode, MenuMode::Playing);
        assert_eq!(m.skill, Skill::Hard);
        assert!(!m.is_active());
    }

    #[test]
    fn back_resets_to_title() {
        let mut m = MenuState::new();
        m.update(MenuInput::Confirm);
        m.update(MenuInput::Down);
        m.update(MenuInput::Back);
        assert_eq!(m.mode, MenuMode::Title);
        assert_eq!(m.item, 0);
    }

    #[test]
    fn tic_counts_every_call() {
        let mut m = MenuState::new();
        m.update(MenuInput::None);
        m.update(MenuInput::Confirm);
        m.update(MenuInput::Confirm);
        assert_eq!(m.mode, MenuMode::Playing);
        m.update(MenuInput::Up);
        m.update(MenuInput::None);
        assert_eq!(m.tic, 5);
    }

    #[test]
    fn playing_ignores_input() {
        let mut m = MenuState::new();
        m.mode = MenuMode::Playing;
        assert_eq!(m.update(MenuInput::Confirm), MenuAction::None);
        assert_eq!(m.mode, MenuMode::Playing);
    }

    #[test]
    fn skill_flags_and_parsing() {
        assert_eq!(Skill::Baby.thing_flag(), ThingFlags::EASY);
        assert_eq!(Skill::Nightmare.thing_flag(), ThingFlags::HARD);
        assert_eq!("Nightmare".parse::<Skill>(), Ok(Skill::Nightmare));
        assert_eq!("3".parse::<Skill>(), Ok(Skill::Medium));
        assert!("impossible".parse::<Skill>().is_err());
        assert!(Skill::Hard > Skill::Easy);
    }

    #[test]
    fn skills_display_their_menu_text() {
        assert_eq!(Skill::Medium.to_string(), "Hurt me plenty");
        assert_eq!(format!("{}", Skill::Nightmare), Skill::Nightmare.label());
        let labels: std::collections::HashSet<_> = Skill::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), Skill::ALL.len());
    }
}

//! Game orchestration.
//!
//! [`DoomGame`] owns one running level and everything needed to step and
//! draw it. Hosts feed it wall-clock time and a [`TicInput`] per frame; it
//! runs as many fixed 35 Hz tics as the time covers, then renders into its
//! own [`DoomFramebuffer`].

use std::path::Path;

use web_time::Instant;

use crate::ai::World;
use crate::builder::{DEFAULT_CEILING_FLAT, DEFAULT_FLOOR_FLAT, MapBuilder};
use crate::config::DoomConfig;
use crate::constants::{ANGLETURN, DOOM_TICK_SECS, FORWARDMOVE, SIDEMOVE, SKY_FLAT_NAME};
use crate::error::Result;
use crate::flats::FlatStore;
use crate::framebuffer::{DoomFramebuffer, Rgba};
use crate::map::MapData;
use crate::menu::{MenuAction, MenuInput, MenuMode, MenuState, Skill, TITLE_ITEMS};
use crate::mobj::{MobjList, spawn_map_things, tick_mobjs};
use crate::palette::DoomPalette;
use crate::player::PlayerState;
use crate::projectiles::tick_projectiles;
use crate::psprite::{Weapon, WeaponKind, bob_offset, draw_weapon};
use crate::random::DoomRng;
use crate::render::{FrameStats, Renderer, Scene, View};
use crate::sprites::SpriteStore;
use crate::wad::WadFile;

/// Longest stretch of wall-clock time one update will simulate.
pub const MAX_FRAME_SECS: f64 = 0.25;
/// First of the red damage palettes in PLAYPAL.
const STARTREDPALS: usize = 1;
const NUMREDPALS: usize = 8;
/// Sector light assumed when the player is outside every sector.
const DEFAULT_LIGHT: i32 = 160;

/// One tic of player commands.
///
/// Directions are signs: `forward > 0` walks ahead, `strafe > 0` steps
/// right, `turn > 0` turns left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TicInput {
    pub forward: i8,
    pub strafe: i8,
    pub turn: i8,
    pub fire: bool,
    pub run: bool,
    /// Menu navigation. `Back` while playing opens the menu.
    pub menu: MenuInput,
    pub weapon: Option<WeaponKind>,
}

impl TicInput {
    /// The part of the command that repeats across tics of one frame.
    fn held(self) -> Self {
        Self {
            menu: MenuInput::None,
            weapon: None,
            ..self
        }
    }
}

/// A running game: level, actors, assets and output surface.
#[derive(Debug)]
pub struct DoomGame {
    config: DoomConfig,
    map: MapData,
    player: PlayerState,
    mobjs: MobjList,
    rng: DoomRng,
    palette: DoomPalette,
    sprites: SpriteStore,
    flats: FlatStore,
    renderer: Renderer,
    framebuffer: DoomFramebuffer,
    menu: MenuState,
    weapon: Weapon,
    skill: Skill,
    leveltime: u32,
    /// Simulated time not yet consumed by a tic.
    accumulator: f64,
    /// Wall-clock seconds since the level started.
    clock: f64,
    last_update: Option<Instant>,
    quit: bool,
}

impl DoomGame {
    /// A game on the built-in demo level with generated assets.
    pub fn new(config: DoomConfig) -> Self {
        let flats = FlatStore::procedural(&[DEFAULT_FLOOR_FLAT, DEFAULT_CEILING_FLAT, SKY_FLAT_NAME]);
        Self::with_assets(
            config,
            MapBuilder::demo(),
            DoomPalette::default_palette(),
            SpriteStore::new(),
            flats,
        )
    }

    /// A game on `config.start_map` from a parsed WAD.
    pub fn from_wad(config: DoomConfig, wad: &WadFile) -> Result<Self> {
        let map = MapData::from_wad(wad, &config.start_map)?;
        let palette = DoomPalette::from_lumps(wad.lump_by_name("PLAYPAL")?, wad.lump_by_name("COLORMAP")?)?;
        let sprites = SpriteStore::load(wad)?;
        let flats = FlatStore::load(wad)?;
        Ok(Self::with_assets(config, map, palette, sprites, flats))
    }

    /// Read a WAD from disk and start on `config.start_map`.
    pub fn from_wad_file(config: DoomConfig, path: impl AsRef<Path>) -> Result<Self> {
        let wad = WadFile::open(path)?;
        Self::from_wad(config, &wad)
    }

    /// Assemble a game from already-loaded parts. The menu is open and the
    /// player stands at the map's start.
    pub fn with_assets(
        config: DoomConfig,
        map: MapData,
        palette: DoomPalette,
        sprites: SpriteStore,
        flats: FlatStore,
    ) -> Self {
        let (w, h) = (config.screen_width.max(1), config.screen_height.max(1));
        let mut game = Self {
            rng: DoomRng::new(config.seed),
            skill: config.skill,
            map,
            player: PlayerState::default(),
            mobjs: MobjList::new(),
            palette,
            sprites,
            flats,
            renderer: Renderer::new(w as usize, h as usize),
            framebuffer: DoomFramebuffer::new(w, h),
            menu: MenuState::new(),
            weapon: Weapon::default(),
            leveltime: 0,
            accumulator: 0.0,
            clock: 0.0,
            last_update: None,
            quit: false,
            config,
        };
        game.spawn_player();
        tracing::debug!(map = %game.map.name, width = w, height = h, "game created");
        game
    }

    fn spawn_player(&mut self) {
        let (x, y, angle) = self
            .map
            .player_start()
            .map_or((0, 0, 0), |start| (start.x, start.y, start.angle));
        self.player = PlayerState::default();
        self.player.god_mode = self.config.god_mode;
        self.player.spawn(&self.map, x, y, angle);
    }

    /// Begin the level on `skill`, closing the menu.
    pub fn start(&mut self, skill: Skill) {
        self.skill = skill;
        self.menu.mode = MenuMode::Playing;
        self.menu.skill = skill;
        self.rng = DoomRng::new(self.config.seed);
        self.mobjs.clear();
        self.spawn_player();
        self.weapon = Weapon::default();
        self.leveltime = 0;
        self.clock = 0.0;
        self.palette.set_active(0);
        let monsters = spawn_map_things(&self.map, &mut self.mobjs, skill, &mut self.rng);
        tracing::debug!(map = %self.map.name, skill = %skill, monsters, "level started");
    }

    /// Simulate `dt` seconds. Menu and weapon-select input apply to the
    /// first tic only; movement and fire repeat. Returns the tics run.
    pub fn update(&mut self, dt: f64, input: &TicInput) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            let dt = dt.min(MAX_FRAME_SECS);
            self.accumulator += dt;
            if !self.menu.is_active() {
                self.clock += dt;
            }
        }
        let mut tics = 0;
        let mut command = *input;
        while self.accumulator >= DOOM_TICK_SECS {
            self.accumulator -= DOOM_TICK_SECS;
            self.tic(&command);
            command = command.held();
            tics += 1;
        }
        tics
    }

    /// [`Self::update`] with the time since the previous call.
    pub fn update_realtime(&mut self, input: &TicInput) -> u32 {
        let now = Instant::now();
        let dt = self
            .last_update
            .map_or(DOOM_TICK_SECS, |last| now.duration_since(last).as_secs_f64());
        self.last_update = Some(now);
        self.update(dt, input)
    }

    /// Run exactly one game tic.
    pub fn tic(&mut self, input: &TicInput) {
        if self.menu.is_active() {
            match self.menu.update(input.menu) {
                MenuAction::StartGame(skill) => self.start(skill),
                MenuAction::Quit => self.quit = true,
                MenuAction::None => {}
            }
            return;
        }
        self.menu.update(MenuInput::None);
        if input.menu == MenuInput::Back {
            self.menu.open();
            tracing::debug!("menu opened");
            return;
        }
        if let Some(kind) = input.weapon {
            self.weapon.select(kind);
        }

        let speed = usize::from(input.run);
        self.player.apply_movement(
            i32::from(input.forward.signum()) * FORWARDMOVE[speed],
            i32::from(input.strafe.signum()) * SIDEMOVE[speed],
            i32::from(input.turn.signum()) * ANGLETURN[speed] as i32,
        );
        self.player.tick(&self.map, &self.mobjs, self.leveltime);

        let mut world = World {
            map: &self.map,
            mobjs: &mut self.mobjs,
            player: &mut self.player,
            rng: &mut self.rng,
            skill: self.skill,
        };
        tick_mobjs(&mut world);
        for shot in self.weapon.tick(&mut world, input.fire) {
            tracing::trace!(?shot, "player shot");
        }
        tick_projectiles(&mut world);
        self.mobjs.sweep();

        self.update_palette();
        self.leveltime = self.leveltime.wrapping_add(1);
    }

    /// Red flash while hurt, fading with the damage count.
    fn update_palette(&mut self) {
        let count = self.player.damage_count.max(0) as usize;
        let palette = if count == 0 {
            0
        } else {
            STARTREDPALS + ((count + 7) >> 3).min(NUMREDPALS - 1)
        };
        self.palette.set_active(palette);
    }

    /// Draw the current view, weapon and any open menu.
    pub fn render(&mut self) -> FrameStats {
        self.framebuffer.clear();
        let light_level = self
            .map
            .sector_at(self.player.x, self.player.y)
            .map_or(DEFAULT_LIGHT, |s| s.light_level);
        let mut view = View::from_player(&self.player);
        if self.weapon.is_flashing() {
            view.extra_light = 1;
        }
        let scene = Scene {
            map: &self.map,
            mobjs: &self.mobjs,
            sprites: &self.sprites,
            flats: &self.flats,
            palette: &self.palette,
        };
        let stats = self.renderer.render(&mut self.framebuffer, &scene, &view);

        if !self.menu.is_active() {
            let bob = bob_offset(self.player.bob, self.clock, self.config.bob_scale);
            draw_weapon(
                &mut self.framebuffer,
                &self.palette,
                self.renderer.tables(),
                &self.sprites,
                &self.weapon,
                bob,
                light_level,
            );
        } else {
            self.draw_menu();
        }
        stats
    }

    /// Item bars, highlighted row brightest, plus a blinking cursor.
    fn draw_menu(&mut self) {
        let count = match self.menu.mode {
            MenuMode::Title => TITLE_ITEMS.len(),
            MenuMode::SkillSelect => Skill::ALL.len(),
            MenuMode::Playing => return,
        } as i32;
        let (w, h) = (self.framebuffer.width as i32, self.framebuffer.height as i32);
        let row = (h / 12).max(2);
        let top = (h - row * count) / 2;
        let (bar_x, bar_w) = (w / 4, w / 2);
        for i in 0..count {
            let selected = i as usize == self.menu.item;
            let color = if selected {
                Rgba::WHITE
            } else {
                self.palette.color(96)
            };
            let y = top + i * row;
            self.framebuffer.fill_rect(bar_x, y, bar_w, row - 1, color);
            if selected && (self.menu.tic / 8) % 2 == 0 {
                self.framebuffer
                    .fill_rect(bar_x - row, y, row - 1, row - 1, Rgba::RED);
            }
        }
    }

    /// Change the render resolution, e.g. after the host surface resized.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.framebuffer.width, self.framebuffer.height) {
            return;
        }
        self.framebuffer.resize(width, height);
        self.renderer.resize(width as usize, height as usize);
        self.config.screen_width = width;
        self.config.screen_height = height;
        tracing::debug!(width, height, "render surface resized");
    }

    pub fn config(&self) -> &DoomConfig {
        &self.config
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    pub fn mobjs(&self) -> &MobjList {
        &self.mobjs
    }

    pub fn menu(&self) -> &MenuState {
        &self.menu
    }

    pub fn weapon(&self) -> &Weapon {
        &self.weapon
    }

    pub fn palette(&self) -> &DoomPalette {
        &self.palette
    }

    pub fn skill(&self) -> Skill {
        self.skill
    }

    pub fn framebuffer(&self) -> &DoomFramebuffer {
        &self.framebuffer
    }

    /// Tics since the level started.
    pub fn leveltime(&self) -> u32 {
        self.leveltime
    }

    /// The player chose Quit from the menu.
    pub fn wants_quit(&self) -> bool {
        self.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;

    fn playing() -> DoomGame {
        let mut game = DoomGame::new(DoomConfig::default());
        game.start(Skill::Medium);
        game
    }

    fn confirm() -> TicInput {
        TicInput {
            menu: MenuInput::Confirm,
            ..TicInput::default()
        }
    }

    #[test]
    fn starts_on_title_menu() {
        let game = DoomGame::new(DoomConfig::default());
        assert_eq!(game.menu().mode, MenuMode::Title);
        assert!(game.mobjs().is_empty());
        assert_eq!(game.player().x, 0);
    }

    #[test]
    fn menu_confirms_into_level() {
        let mut game = DoomGame::new(DoomConfig::default());
        game.tic(&confirm());
        assert_eq!(game.menu().mode, MenuMode::SkillSelect);
        game.tic(&confirm());
        assert_eq!(game.menu().mode, MenuMode::Playing);
        assert_eq!(game.skill(), Skill::Medium);
        assert_eq!(game.mobjs().len(), 3);
    }

    #[test]
    fn one_frame_confirms_once() {
        let mut game = DoomGame::new(DoomConfig::default());
        let tics = game.update(DOOM_TICK_SECS * 3.5, &confirm());
        assert_eq!(tics, 3);
        assert_eq!(game.menu().mode, MenuMode::SkillSelect);
    }

    #[test]
    fn quit_from_title() {
        let mut game = DoomGame::new(DoomConfig::default());
        game.tic(&TicInput {
            menu: MenuInput::Down,
            ..TicInput::default()
        });
        game.tic(&confirm());
        assert!(game.wants_quit());
    }

    #[test]
    fn partial_tics_accumulate() {
        let mut game = playing();
        assert_eq!(game.update(DOOM_TICK_SECS * 0.6, &TicInput::default()), 0);
        assert_eq!(game.update(DOOM_TICK_SECS * 0.6, &TicInput::default()), 1);
        assert_eq!(game.leveltime(), 1);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut game = playing();
        let tics = game.update(10.0, &TicInput::default());
        assert!(tics <= (MAX_FRAME_SECS / DOOM_TICK_SECS).ceil() as u32);
        assert_eq!(game.update(f64::NAN, &TicInput::default()), 0);
    }

    #[test]
    fn forward_walks_east_from_start() {
        let mut game = playing();
        let walk = TicInput {
            forward: 1,
            ..TicInput::default()
        };
        for _ in 0..10 {
            game.tic(&walk);
        }
        assert!(game.player().x > 8 * FRACUNIT);
        assert!(game.player().y.abs() < FRACUNIT);
    }

    #[test]
    fn back_opens_menu_and_pauses() {
        let mut game = playing();
        game.tic(&TicInput {
            menu: MenuInput::Back,
            ..TicInput::default()
        });
        assert!(game.menu().is_active());
        let before = game.leveltime();
        game.tic(&TicInput::default());
        assert_eq!(game.leveltime(), before);
    }

    #[test]
    fn firing_spends_ammo() {
        let mut game = playing();
        for _ in 0..20 {
            game.tic(&TicInput::default());
        }
        for _ in 0..10 {
            game.tic(&TicInput {
                fire: true,
                ..TicInput::default()
            });
        }
        assert!(game.player().ammo[0] < 50);
    }

    #[test]
    fn damage_turns_palette_red() {
        let mut game = playing();
        game.player_mut().damage_count = 20;
        game.tic(&TicInput::default());
        assert!(game.palette().active >= STARTREDPALS);
        game.player_mut().damage_count = 0;
        game.tic(&TicInput::default());
        assert_eq!(game.palette().active, 0);
    }

    #[test]
    fn render_fills_view_and_weapon() {
        let mut game = playing();
        let stats = game.render();
        assert!(stats.subsectors > 0);
        let fb = game.framebuffer();
        let lit = fb.pixels.iter().filter(|&&p| p != Rgba::BLACK).count();
        assert!(lit > fb.pixels.len() / 2);
        assert_ne!(fb.get_pixel(160, 199), Rgba::BLACK);
    }

    #[test]
    fn menu_overlay_highlights_item() {
        let mut game = DoomGame::new(DoomConfig::default());
        game.render();
        let h = game.framebuffer().height as i32;
        let row = h / 12;
        let top = (h - row * 2) / 2;
        assert_eq!(game.framebuffer().get_pixel(160, (top + 1) as u32), Rgba::WHITE);
    }

    #[test]
    fn config_controls_resolution_and_god_mode() {
        let config = DoomConfig {
            screen_width: 160,
            screen_height: 100,
            god_mode: true,
            ..DoomConfig::default()
        };
        let mut game = DoomGame::new(config);
        game.start(Skill::Hard);
        assert!(game.player().god_mode);
        game.render();
        assert_eq!(game.framebuffer().pixels.len(), 160 * 100);
    }

    #[test]
    fn resize_changes_output() {
        let mut game = playing();
        game.resize(200, 120);
        game.render();
        assert_eq!(game.framebuffer().pixels.len(), 200 * 120);
        assert_eq!(game.config().screen_width, 200);
        assert_ne!(game.framebuffer().get_pixel(100, 119), Rgba::BLACK);
    }

    #[test]
    fn start_respawns_player_at_map_start() {
        let config = DoomConfig {
            god_mode: true,
            ..DoomConfig::default()
        };
        let mut game = DoomGame::new(config);
        game.start(Skill::Medium);
        game.player_mut().x = 100 * FRACUNIT;
        game.player_mut().health = 10;

        game.start(Skill::Easy);
        let (x, y, angle) = game
            .map()
            .player_start()
            .map(|s| (s.x, s.y, s.angle))
            .unwrap();
        let player = game.player();
        assert_eq!((player.x, player.y, player.angle), (x, y, angle));
        assert_eq!(player.z, 0);
        assert_eq!(player.health, 100);
        assert!(player.god_mode);
        assert_eq!(game.skill(), Skill::Easy);
    }

    #[test]
    fn realtime_update_runs_elapsed_tics() {
        let mut game = playing();
        assert_eq!(game.update_realtime(&TicInput::default()), 1);
        std::thread::sleep(web_time::Duration::from_millis(60));
        let tics = game.update_realtime(&TicInput::default());
        assert!(tics >= 2, "{tics} tics after 60ms");
        assert_eq!(game.leveltime(), 1 + tics);
    }

    #[test]
    fn realtime_stall_is_capped() {
        let mut game = playing();
        game.last_update = Instant::now().checked_sub(web_time::Duration::from_secs(2));
        assert!(game.last_update.is_some());
        let tics = game.update_realtime(&TicInput::default());
        assert_eq!(tics, (MAX_FRAME_SECS / DOOM_TICK_SECS) as u32);
    }
}

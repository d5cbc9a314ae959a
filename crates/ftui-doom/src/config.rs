//! Engine configuration.
//!
//! Loaded from TOML at startup. Every field has a default, so an empty
//! file (or no file) gives the classic 320×200 game on medium skill.
//!
//! ```toml
//! # ftui-doom.toml
//! screen_width = 640
//! screen_height = 400
//! skill = "hard"
//! seed = 1234
//! ```
//!
//! A few fields can be overridden from the environment:
//!
//! | Variable         | Field      | Values                                  |
//! |------------------|------------|-----------------------------------------|
//! | `FTUI_DOOM_SKILL`| `skill`    | `baby`..`nightmare` or `1`..`5`         |
//! | `FTUI_DOOM_SEED` | `seed`     | decimal or `0x` hex                     |
//! | `FTUI_DOOM_GOD`  | `god_mode` | `1` / `true` / `0` / `false`            |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::menu::Skill;

pub const ENV_SKILL: &str = "FTUI_DOOM_SKILL";
pub const ENV_SEED: &str = "FTUI_DOOM_SEED";
pub const ENV_GOD: &str = "FTUI_DOOM_GOD";

/// Largest render dimension accepted. Visplane rows are stored as `u16`.
pub const MAX_SCREEN_DIM: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoomConfig {
    /// Render resolution in pixels.
    pub screen_width: u32,
    pub screen_height: u32,
    pub skill: Skill,
    /// Seed for the gameplay random stream.
    pub seed: u64,
    pub god_mode: bool,
    /// Map lump to load when a WAD is present.
    pub start_map: String,
    /// Multiplier on the weapon bob; 0 disables it.
    pub bob_scale: f32,
}

impl Default for DoomConfig {
    fn default() -> Self {
        Self {
            screen_width: 320,
            screen_height: 200,
            skill: Skill::Medium,
            seed: 0x5EED,
            god_mode: false,
            start_map: "E1M1".to_owned(),
            bob_scale: 1.0,
        }
    }
}

impl DoomConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        tracing::debug!(
            width = config.screen_width,
            height = config.screen_height,
            skill = ?config.skill,
            map = %config.start_map,
            "config loaded"
        );
        Ok(config)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load, apply environment overrides and validate in one step.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_toml_file(path)?;
        config.apply_env_overrides();
        config.validated()
    }

    /// `self` if it validates, otherwise every problem found.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Check every field. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.screen_width == 0 || self.screen_width > MAX_SCREEN_DIM {
            errors.push(format!(
                "screen_width must be in 1..={MAX_SCREEN_DIM}, got {}",
                self.screen_width
            ));
        }
        if self.screen_height == 0 || self.screen_height > MAX_SCREEN_DIM {
            errors.push(format!(
                "screen_height must be in 1..={MAX_SCREEN_DIM}, got {}",
                self.screen_height
            ));
        }
        if !self.bob_scale.is_finite() || self.bob_scale < 0.0 {
            errors.push(format!(
                "bob_scale must be finite and >= 0, got {}",
                self.bob_scale
            ));
        }
        if self.start_map.is_empty() || self.start_map.len() > 8 || !self.start_map.is_ascii() {
            errors.push(format!(
                "start_map must be a lump name of 1-8 ASCII characters, got {:?}",
                self.start_map
            ));
        }

        errors
    }

    /// Apply `FTUI_DOOM_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_SKILL) {
            match parse_skill(&value) {
                Some(skill) => self.skill = skill,
                None => tracing::warn!(var = ENV_SKILL, %value, "ignoring unknown skill"),
            }
        }
        if let Some(value) = lookup(ENV_SEED) {
            match parse_seed(&value) {
                Some(seed) => self.seed = seed,
                None => tracing::warn!(var = ENV_SEED, %value, "ignoring bad seed"),
            }
        }
        if let Some(value) = lookup(ENV_GOD) {
            match parse_flag(&value) {
                Some(god) => self.god_mode = god,
                None => tracing::warn!(var = ENV_GOD, %value, "ignoring bad flag"),
            }
        }
    }
}

fn parse_skill(value: &str) -> Option<Skill> {
    value.parse().ok()
}

fn parse_seed(value: &str) -> Option<u64> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_validates_clean() {
        let errors = DoomConfig::default().validate();
        assert!(errors.is_empty(), "default should validate: {errors:?}");
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(DoomConfig::from_toml_str("").unwrap(), DoomConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = DoomConfig::from_toml_str(
            "screen_width = 640\nskill = \"nightmare\"\nstart_map = \"E1M2\"\n",
        )
        .unwrap();
        assert_eq!(config.screen_width, 640);
        assert_eq!(config.screen_height, 200);
        assert_eq!(config.skill, Skill::Nightmare);
        assert_eq!(config.start_map, "E1M2");
        assert_eq!(config.seed, 0x5EED);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let err = DoomConfig::from_toml_str("skill = \"impossible\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = DoomConfig::from_toml_file("/nonexistent/ftui-doom.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ftui-doom.toml"));
    }

    #[test]
    fn validate_catches_zero_width() {
        let config = DoomConfig {
            screen_width: 0,
            ..DoomConfig::default()
        };
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("screen_width")));
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_catches_bad_bob_and_map() {
        let config = DoomConfig {
            bob_scale: f32::NAN,
            start_map: "TOOLONGNAME".into(),
            ..DoomConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = DoomConfig::default();
        config.apply_overrides(env(&[
            (ENV_SKILL, "hard"),
            (ENV_SEED, "0x10"),
            (ENV_GOD, "true"),
        ]));
        assert_eq!(config.skill, Skill::Hard);
        assert_eq!(config.seed, 16);
        assert!(config.god_mode);
    }

    #[test]
    fn numeric_skill_is_one_based() {
        let mut config = DoomConfig::default();
        config.apply_overrides(env(&[(ENV_SKILL, "1")]));
        assert_eq!(config.skill, Skill::Baby);
        config.apply_overrides(env(&[(ENV_SKILL, "5")]));
        assert_eq!(config.skill, Skill::Nightmare);
    }

    #[test]
    fn bad_overrides_are_ignored() {
        let mut config = DoomConfig::default();
        config.apply_overrides(env(&[
            (ENV_SKILL, "0"),
            (ENV_SEED, "seedy"),
            (ENV_GOD, "maybe"),
        ]));
        assert_eq!(config, DoomConfig::default());
    }
}

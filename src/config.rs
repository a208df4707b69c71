/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// The runtime itself only sees `LevelConfig`, which is passed by value into
/// level construction; nothing here is process-global.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub level: LevelConfig,
    pub tick_rate_ms: u64,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
}

/// Geometry and physics a level is built and stepped with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelConfig {
    pub screen_width: i32,
    pub screen_height: i32,
    pub tile_size: i32,
    pub physics: PhysicsConfig,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsConfig {
    /// Player pixels per frame in the middle band of the screen.
    pub walk_speed: i32,
    /// World pixels per frame while the camera scrolls.
    pub scroll_speed: i32,
    pub gravity: f32,
    pub jump_speed: f32,
    pub player_width: i32,
    pub player_height: i32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub pause: Vec<String>,
    pub quit: Vec<String>,
    pub restart: Vec<String>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        LevelConfig {
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            tile_size: default_tile_size(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            walk_speed: default_walk_speed(),
            scroll_speed: default_scroll_speed(),
            gravity: default_gravity(),
            jump_speed: default_jump_speed(),
            player_width: default_player_width(),
            player_height: default_player_height(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    screen: TomlScreen,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlScreen {
    #[serde(default = "default_screen_width")]
    width: i32,
    #[serde(default = "default_screen_height")]
    height: i32,
    #[serde(default = "default_tile_size")]
    tile_size: i32,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_walk_speed")]
    walk_speed: i32,
    #[serde(default = "default_scroll_speed")]
    scroll_speed: i32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_jump_speed")]
    jump_speed: f32,
    #[serde(default = "default_player_width")]
    player_width: i32,
    #[serde(default = "default_player_height")]
    player_height: i32,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_screen_width() -> i32 { 1200 }
fn default_screen_height() -> i32 { 704 }  // 11 rows of 64px
fn default_tile_size() -> i32 { 64 }
fn default_walk_speed() -> i32 { 8 }
fn default_scroll_speed() -> i32 { 8 }
fn default_gravity() -> f32 { 0.8 }
fn default_jump_speed() -> f32 { -16.0 }
fn default_player_width() -> i32 { 50 }
fn default_player_height() -> i32 { 64 }
fn default_tick_rate() -> u64 { 16 }      // ~60 frames per second

fn default_jump() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlScreen {
    fn default() -> Self {
        TomlScreen {
            width: default_screen_width(),
            height: default_screen_height(),
            tile_size: default_tile_size(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            walk_speed: default_walk_speed(),
            scroll_speed: default_scroll_speed(),
            gravity: default_gravity(),
            jump_speed: default_jump_speed(),
            player_width: default_player_width(),
            player_height: default_player_height(),
        }
    }
}

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump(),
            pause: default_pause(),
            quit: default_quit(),
            restart: default_restart(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            level: LevelConfig {
                screen_width: toml_cfg.screen.width,
                screen_height: toml_cfg.screen.height,
                tile_size: toml_cfg.screen.tile_size,
                physics: PhysicsConfig {
                    walk_speed: toml_cfg.physics.walk_speed,
                    scroll_speed: toml_cfg.physics.scroll_speed,
                    gravity: toml_cfg.physics.gravity,
                    jump_speed: toml_cfg.physics.jump_speed,
                    player_width: toml_cfg.physics.player_width,
                    player_height: toml_cfg.physics.player_height,
                },
            },
            tick_rate_ms: toml_cfg.speed.tick_rate_ms,
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                pause: toml_cfg.gamepad.pause,
                quit: toml_cfg.gamepad.quit,
                restart: toml_cfg.gamepad.restart,
            },
            levels_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so a linked binary still finds its data.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        info!(path = %path.display(), "config_loaded");
                        return cfg;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "config_parse_failed; using defaults");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config_read_failed");
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml(toml::from_str("").unwrap(), &[]);
        assert_eq!(cfg.level, LevelConfig::default());
        assert_eq!(cfg.level.tile_size, 64);
        assert_eq!(cfg.level.physics.walk_speed, 8);
        assert_eq!(cfg.tick_rate_ms, 16);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = "[screen]\ntile_size = 32\n\n[physics]\ngravity = 1.0\n";
        let cfg = GameConfig::from_toml(toml::from_str(text).unwrap(), &[]);
        assert_eq!(cfg.level.tile_size, 32);
        assert_eq!(cfg.level.screen_width, 1200);
        assert_eq!(cfg.level.physics.gravity, 1.0);
        assert_eq!(cfg.level.physics.jump_speed, -16.0);
        assert_eq!(cfg.gamepad.jump, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn levels_dir_found_in_search_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("stages")).unwrap();
        let text = "[general]\nlevels_dir = \"stages\"\n";
        let cfg = GameConfig::from_toml(toml::from_str(text).unwrap(), &[tmp.path().to_path_buf()]);
        assert_eq!(cfg.levels_dir, tmp.path().join("stages"));
    }
}

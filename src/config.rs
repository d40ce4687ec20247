use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    camera::{orbit::OrbitSettings, wormhole::SpiralSettings},
    gravity::GravitySettings,
    hazard::HazardSettings,
    messages::{self, MessageSettings},
    player::PlayerSettings,
};

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_game_config);
    }
}

/// Every tunable number in the game.
///
/// Loaded once before startup and inserted as a Resource, so systems read it
/// with `Res<GameConfig>`. `#[serde(default)]` on the struct means a file only
/// has to mention the values it wants to change, e.g.
///
/// ```ron
/// (camera: (sensitivity: 0.004), messages: (enabled: false))
/// ```
#[derive(Resource, Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct GameConfig {
    pub player: PlayerSettings,
    pub gravity: GravitySettings,
    pub camera: OrbitSettings,
    pub wormhole: SpiralSettings,
    pub hazard: HazardSettings,
    pub messages: MessageSettings,
}

const CONFIG_FILE: &str = "game.ron";
const APP_DIR: &str = "gravitable-escape";

/// Where to look for the config file, most specific first:
/// the per-user override, then the copy shipped with the game.
fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }
    candidates.push(PathBuf::from("assets/config").join(CONFIG_FILE));
    candidates
}

/// Reads and parses one config file.
/// Returns None (after logging why) if it is missing or broken.
pub fn load_from_path(path: &Path) -> Option<GameConfig> {
    if !path.exists() {
        info!("No config file at {:?}.", path);
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match parse(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                error!("Failed to parse config {:?}: {}. Using defaults.", path, e);
                None
            }
        },
        Err(e) => {
            error!("Failed to read config {:?}: {}. Using defaults.", path, e);
            None
        }
    }
}

pub fn parse(contents: &str) -> Result<GameConfig, ron::error::SpannedError> {
    ron::from_str::<GameConfig>(contents)
}

/// PreStartup system: first config file that parses wins, otherwise defaults.
/// A `GameConfig` inserted before the app starts is left alone.
fn load_game_config(mut commands: Commands, existing: Option<Res<GameConfig>>) {
    if existing.is_some() {
        debug!("GameConfig provided by the app, skipping config files");
        return;
    }

    let config = config_file_candidates()
        .iter()
        .find_map(|path| load_from_path(path))
        .unwrap_or_else(|| {
            info!("Starting with built-in config.");
            GameConfig::default()
        });

    // Bad zones are reported but kept.
    messages::validate_zones(&config.messages.zones);

    commands.insert_resource(config);
}

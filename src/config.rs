use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "WALL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub wall: WallConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_networks")]
    pub networks: String,
    #[serde(default = "default_current_city")]
    pub current_city: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            networks: default_networks(),
            current_city: default_current_city(),
        }
    }
}

fn default_name() -> String {
    "Chibueze Williams".to_string()
}

fn default_networks() -> String {
    "Stanford Alum".to_string()
}

fn default_current_city() -> String {
    "Palo Alto, CA".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WallConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_photo_bytes")]
    pub max_photo_bytes: u64,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_photo_bytes: default_max_photo_bytes(),
        }
    }
}

fn default_max_chars() -> usize {
    280
}

fn default_max_photo_bytes() -> u64 {
    5 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
        }
    }
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(120)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("wall-tui").join("wall.log"))
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("config: failed to read file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("config: failed to parse file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.profile.name.trim().is_empty() {
        base.profile.name = other.profile.name;
    }
    if !other.profile.networks.is_empty() {
        base.profile.networks = other.profile.networks;
    }
    if !other.profile.current_city.is_empty() {
        base.profile.current_city = other.profile.current_city;
    }

    if other.wall.max_chars != 0 {
        base.wall.max_chars = other.wall.max_chars;
    }
    if other.wall.max_photo_bytes != 0 {
        base.wall.max_photo_bytes = other.wall.max_photo_bytes;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    if !other.ui.tick_rate.is_zero() {
        base.ui.tick_rate = other.ui.tick_rate;
    }

    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }
    if !other.log.level.is_empty() {
        base.log.level = other.log.level;
    }

    base
}

// Env values are applied straight onto the merged config so that an unset
// variable never resets a value that came from the file.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "profile.name" => {
            if !value.trim().is_empty() {
                cfg.profile.name = value;
            }
        }
        "profile.networks" => cfg.profile.networks = value,
        "profile.current_city" => cfg.profile.current_city = value,
        "wall.max_chars" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed > 0 {
                    cfg.wall.max_chars = parsed;
                }
            }
        }
        "wall.max_photo_bytes" => {
            if let Ok(parsed) = value.parse::<u64>() {
                if parsed > 0 {
                    cfg.wall.max_photo_bytes = parsed;
                }
            }
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "ui.tick_rate" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.tick_rate = duration;
            }
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wall-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/wall-tui/config.yaml")),
            env_prefix: Some("WALL_TEST_NONE".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.profile.name, "Chibueze Williams");
        assert_eq!(cfg.wall.max_chars, 280);
        assert_eq!(cfg.wall.max_photo_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.ui.tick_rate, Duration::from_millis(120));
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "profile:\n  name: Ada Lovelace\nwall:\n  max_photo_bytes: 1024\nui:\n  tick_rate: 250ms\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("WALL_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.profile.name, "Ada Lovelace");
        assert_eq!(cfg.profile.current_city, "Palo Alto, CA");
        assert_eq!(cfg.wall.max_chars, 280);
        assert_eq!(cfg.wall.max_photo_bytes, 1024);
        assert_eq!(cfg.ui.tick_rate, Duration::from_millis(250));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "profile: [unterminated").unwrap();
        let err = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("WALL_TEST_NONE".into()),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("config: failed to parse"));
    }

    #[test]
    fn env_overrides() {
        env::set_var("WALL_ENVTEST_PROFILE__NAME", "Grace Hopper");
        env::set_var("WALL_ENVTEST_WALL__MAX_CHARS", "not-a-number");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/config.yaml")),
            env_prefix: Some("WALL_ENVTEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.profile.name, "Grace Hopper");
        assert_eq!(cfg.wall.max_chars, 280);
        env::remove_var("WALL_ENVTEST_PROFILE__NAME");
        env::remove_var("WALL_ENVTEST_WALL__MAX_CHARS");
    }
}

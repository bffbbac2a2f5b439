use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Routes `tracing` output to the configured log file; the terminal belongs
/// to the UI. `RUST_LOG` takes precedence over `log.level`. Returns the file
/// in use, or `None` when logging is disabled.
pub fn init(cfg: &LogConfig) -> Result<Option<PathBuf>> {
    let Some(path) = cfg.file.clone() else {
        return Ok(None);
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("log: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("log: open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(filter_for(&cfg.level))
        .try_init()
        .map_err(|err| anyhow!("log: install subscriber: {err}"))?;

    Ok(Some(path))
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_a_file() {
        let cfg = LogConfig {
            file: None,
            level: "debug".into(),
        };
        assert_eq!(init(&cfg).unwrap(), None);
    }

    #[test]
    fn bad_level_falls_back() {
        let filter = filter_for("not a [valid directive");
        assert!(!filter.to_string().is_empty());
    }
}

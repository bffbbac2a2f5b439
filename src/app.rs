use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::config;
use crate::controller::{FeedController, Limits, Profile};
use crate::logging;
use crate::persist::WallStore;
use crate::photo;
use crate::storage::{self, KeyValueStore};
use crate::ui;
use crate::view;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    /// Keep the wall in memory only.
    pub ephemeral: bool,
    /// Print the wall to stdout instead of starting the UI.
    pub print: bool,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    // Logging is best effort; a read-only cache dir should not stop the app.
    let log_path = logging::init(&cfg.log).unwrap_or_else(|err| {
        eprintln!("warning: {err:#}");
        None
    });

    let kv: Arc<dyn KeyValueStore> = if opts.ephemeral {
        Arc::new(storage::MemoryStore::new())
    } else {
        Arc::new(
            storage::Store::open(storage::Options {
                path: cfg.storage.path.clone(),
            })
            .context("open storage")?,
        )
    };
    tracing::info!(
        version = crate::VERSION,
        ephemeral = opts.ephemeral,
        log = ?log_path,
        "starting wall"
    );

    let mut controller = FeedController::new(
        WallStore::new(kv),
        Profile::from(&cfg.profile),
        Limits::from(&cfg.wall),
    );
    controller.hydrate();

    if opts.print {
        let wall = view::project(&controller, Utc::now());
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(view::to_plain_text(&wall).as_bytes())
            .context("write wall")?;
        return Ok(());
    }

    let status = if controller.posts().is_empty() {
        "Welcome! Type a message and press Enter to share.".to_string()
    } else {
        format!("Loaded {} posts.", controller.posts().len())
    };
    let mut model = ui::Model::new(ui::Options {
        decoder: photo::Decoder::new(cfg.wall.max_photo_bytes),
        controller,
        tick_rate: cfg.ui.tick_rate,
        status_message: status,
    });
    model.run()?;

    tracing::info!("wall closed");
    Ok(())
}

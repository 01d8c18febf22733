//! File watcher for hot reload.
//!
//! Watches the host configuration file, the wiring file and every module
//! path. Any change reloads the host configuration and sends it to the
//! server, which rewires the modules from scratch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::HostConfig;

/// A watcher over everything a configuration pass reads.
pub struct ConfigWatcher {
    config_path: PathBuf,
    /// Extra paths and whether to watch them recursively.
    watched: Vec<(PathBuf, RecursiveMode)>,
    update_tx: mpsc::UnboundedSender<HostConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for the config file at `config_path` and the files
    /// `config` points at.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(config_path: &Path, config: &HostConfig) -> (Self, mpsc::UnboundedReceiver<HostConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let mut watched = vec![(config.wirings_path(), RecursiveMode::NonRecursive)];
        watched.extend(config.module_paths().into_iter().map(|p| (p, RecursiveMode::Recursive)));

        (
            Self {
                config_path: config_path.to_path_buf(),
                watched,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread. Dropping the returned watcher
    /// stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let config_path = self.config_path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::debug!(paths = ?event.paths, "Change detected, reloading configuration");
                        match load_config(&config_path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.config_path, RecursiveMode::NonRecursive)?;
        for (path, mode) in &self.watched {
            if let Err(e) = watcher.watch(path, *mode) {
                tracing::warn!(path = %path.display(), error = %e, "Cannot watch path");
            }
        }

        tracing::info!(path = %self.config_path.display(), watched = self.watched.len() + 1, "Config watcher started");
        Ok(watcher)
    }
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Run a configuration pass: zones, discovery, wiring file, module graph
//! - Publish the result (or the failure) as a new snapshot
//! - Offline check of a configuration without serving
//!
//! # Design Decisions
//! - Passes run on the blocking pool; they do file I/O throughout
//! - A pass either publishes a complete application or a failure, never a
//!   partially wired one

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;

use crate::config::loader::load_config;
use crate::config::{HostConfig, Properties};
use crate::error::{HostError, WiringError, WiringResult};
use crate::http::server::{HostState, Snapshot};
use crate::modules::{Application, Discovery, ModuleGraphBuilder};
use crate::observability::metrics;
use crate::routing::{Mounter, MAIN_ZONE};

/// Build a complete application from `config`.
pub fn build_application(config: &HostConfig) -> WiringResult<Application> {
    let started = Instant::now();

    let mut mounter = Mounter::new();
    for (name, url) in &config.zones {
        mounter.register_zone(name, url)?;
    }
    match &config.default_zone {
        Some(default_zone) => mounter.set_default_zone(default_zone)?,
        None => {
            mounter.register_zone(MAIN_ZONE, &config.base_url)?;
            mounter.set_default_zone(MAIN_ZONE)?;
        }
    }

    let discovery = Discovery::new(config.modules.marker.as_str(), &config.modules.ignore)?;
    let mut descriptors = BTreeMap::new();
    for path in config.module_paths() {
        discovery.scan(&path, &mut descriptors);
    }
    tracing::info!(modules = descriptors.len(), "Module discovery complete");

    let wirings_path = config.wirings_path();
    let wirings = Properties::load(&wirings_path).map_err(|source| WiringError::Io {
        path: wirings_path.clone(),
        source,
    })?;

    let app = ModuleGraphBuilder::new(
        descriptors,
        wirings,
        config.modules.default_mount_point.as_str(),
        mounter,
    )
    .build()?;

    for summary in app.describe() {
        tracing::info!(
            module = %summary.name,
            mount_point = ?summary.mount_point.map(|mp| mp.to_string()),
            extends = ?summary.extends,
            implements = ?summary.implements,
            dependencies = ?summary.dependencies,
            "Module ready"
        );
    }
    tracing::info!(
        modules = app.graph().len(),
        zones = app.mounter().zone_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Configuration pass complete"
    );
    Ok(app)
}

/// Run a configuration pass off the async runtime and publish the outcome.
pub async fn reconfigure(snapshot: &ArcSwap<Snapshot>, config: HostConfig) {
    let pass_config = config.clone();
    let result = tokio::task::spawn_blocking(move || build_application(&pass_config))
        .await
        .unwrap_or_else(|e| Err(WiringError::Aborted(e.to_string())));

    let state = match result {
        Ok(app) => {
            metrics::record_reload("ok");
            metrics::record_module_count(app.graph().len());
            HostState::Ready(Arc::new(app))
        }
        Err(e) => {
            tracing::error!(error = %e, "Configuration pass failed");
            metrics::record_reload("failed");
            HostState::Failed(Arc::new(e))
        }
    };

    snapshot.store(Arc::new(Snapshot::new(config, state)));
}

/// Load `path` and wire its modules without serving anything.
pub fn check(path: &Path) -> Result<Application, HostError> {
    let config = load_config(path)?;
    Ok(build_application(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn module(root: &Path, name: &str, descriptor: &str) {
        let dir = root.join("modules").join(name).join("MOD-INF");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("module.properties"), descriptor).unwrap();
    }

    fn config(home: &Path) -> HostConfig {
        HostConfig {
            home: Some(home.to_path_buf()),
            ..HostConfig::default()
        }
    }

    #[test]
    fn test_build_application() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "main", "requires = db\n");
        module(dir.path(), "store", "implements = db\n");
        fs::write(dir.path().join("modules.properties"), "main = /\n").unwrap();

        let app = build_application(&config(dir.path())).unwrap();
        assert_eq!(app.root_module().unwrap().name(), "main");
        assert_eq!(app.module("main").unwrap().dependency("db"), Some("store"));
        assert_eq!(app.mounter().default_zone().unwrap().name(), MAIN_ZONE);
    }

    #[test]
    fn test_missing_wiring_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "main", "");
        let err = build_application(&config(dir.path())).unwrap_err();
        assert!(matches!(err, WiringError::Io { .. }));
    }

    #[test]
    fn test_malformed_zone_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "main", "");
        fs::write(dir.path().join("modules.properties"), "").unwrap();
        let mut config = config(dir.path());
        config.zones.insert("bad".into(), "http://[::1".into());
        let err = build_application(&config).unwrap_err();
        assert!(matches!(err, WiringError::MalformedZone { .. }));
    }

    #[tokio::test]
    async fn test_reconfigure_publishes_outcome() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "main", "");
        fs::write(dir.path().join("modules.properties"), "main = /\n").unwrap();

        let snapshot = ArcSwap::from_pointee(Snapshot::new(config(dir.path()), HostState::Initializing));
        reconfigure(&snapshot, config(dir.path())).await;
        assert!(snapshot.load().application().is_some());

        module(dir.path(), "other", "");
        fs::write(dir.path().join("modules.properties"), "main = /x/\nother = /x/\n").unwrap();
        reconfigure(&snapshot, config(dir.path())).await;
        assert!(matches!(
            snapshot.load().state,
            HostState::Failed(ref e) if matches!(**e, WiringError::DuplicateMountPoint { .. })
        ));
    }

    #[test]
    fn test_check_reports_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modhost.toml");
        fs::write(&path, "[timeouts]\nrequest_secs = 0\n").unwrap();
        assert!(matches!(check(&path), Err(HostError::Config(_))));
    }
}

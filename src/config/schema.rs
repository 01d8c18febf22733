//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the host.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration for the module host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host name used in logs and as the routing cookie value.
    pub name: String,

    /// Base directory for relative paths. Defaults to the config file's directory.
    pub home: Option<PathBuf>,

    /// Path prefix the host itself is served under (`""` for the root).
    pub context_path: String,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Module discovery and wiring.
    pub modules: ModulesConfig,

    /// Zone declarations: name → absolute URL or context path.
    pub zones: BTreeMap<String, String>,

    /// Zone used when a request matches none. When absent, a `main` zone is
    /// registered for `base_url` and used instead.
    pub default_zone: Option<String>,

    /// Base URL of the implicit `main` zone.
    pub base_url: String,

    /// Rebuild the module graph when watched files change.
    pub autoreload: bool,

    /// Sticky-session cookie settings.
    pub routing_cookie: RoutingCookieConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "modhost".to_string(),
            home: None,
            context_path: String::new(),
            listener: ListenerConfig::default(),
            modules: ModulesConfig::default(),
            zones: BTreeMap::new(),
            default_zone: None,
            base_url: "/".to_string(),
            autoreload: false,
            routing_cookie: RoutingCookieConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl HostConfig {
    /// Resolve `location` against `home` unless it is already absolute.
    pub fn resolve_path(&self, location: impl AsRef<Path>) -> PathBuf {
        let location = location.as_ref();
        if location.is_absolute() {
            return location.to_path_buf();
        }
        match &self.home {
            Some(home) => home.join(location),
            None => location.to_path_buf(),
        }
    }

    /// Directories scanned for modules, resolved against `home`.
    pub fn module_paths(&self) -> Vec<PathBuf> {
        self.modules.paths.iter().map(|p| self.resolve_path(p)).collect()
    }

    /// Wiring file location, resolved against `home`.
    pub fn wirings_path(&self) -> PathBuf {
        self.resolve_path(&self.modules.wirings)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Module discovery and wiring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Directories scanned (recursively) for modules.
    pub paths: Vec<PathBuf>,

    /// Regular expressions; modules whose name fully matches one are skipped.
    pub ignore: Vec<String>,

    /// Prefix of the generated mount point for modules the wiring file
    /// doesn't mount explicitly.
    pub default_mount_point: String,

    /// Wiring file: mount points and interface disambiguation.
    pub wirings: PathBuf,

    /// Marker directory that makes a directory a module root.
    pub marker: String,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("modules")],
            ignore: Vec::new(),
            default_mount_point: "/modules".to_string(),
            wirings: PathBuf::from("modules.properties"),
            marker: "MOD-INF".to_string(),
        }
    }
}

/// Routing cookie added for sticky load balancers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingCookieConfig {
    /// Add `host=.<name>` when the request doesn't carry it.
    pub enabled: bool,

    /// Cookie lifetime; a session cookie when absent.
    pub max_age_secs: Option<u64>,
}

impl Default for RoutingCookieConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_secs: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time to produce a response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

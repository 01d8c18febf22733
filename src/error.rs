//! Error taxonomy for the module host.
//!
//! Configuration-fatal conditions are all [`WiringError`]s: any of them aborts a
//! configuration pass, and the host keeps serving an error page until a later
//! pass succeeds. Per-request conditions never surface here; the dispatcher
//! turns them into HTTP statuses directly.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::routing::MountPoint;

/// Fatal errors raised while building the module graph and the mount registry.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("could not parse the zone '{zone}' url '{url}', make sure it's a valid URL or an absolute path: {source}")]
    MalformedZone {
        zone: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("default zone '{0}' is not registered")]
    UnknownDefaultZone(String),

    #[error("cannot have two different modules with the same mount point '{mount_point}' ('{existing}' and '{module}')")]
    DuplicateMountPoint {
        mount_point: MountPoint,
        existing: String,
        module: String,
    },

    #[error("cannot wire module '{module}' because the extended module '{parent}' is not defined")]
    UndefinedParent { module: String, parent: String },

    #[error("module extension cycle: {}", .0.join(" -> "))]
    ExtensionCycle(Vec<String>),

    #[error("cannot wire module '{module}' because no module implements the required interface '{interface}'")]
    UnsatisfiedDependency { module: String, interface: String },

    #[error("cannot wire module '{module}': interface '{interface}' is implemented by {} and no wiring entry selects one", .candidates.join(", "))]
    AmbiguousDependency {
        module: String,
        interface: String,
        candidates: Vec<String>,
    },

    #[error("wiring entry '{key}' names module '{target}' which is not defined")]
    UnknownWiredModule { key: String, target: String },

    #[error("cannot initialize the modules because nothing is mounted at '/' and no module is named 'main'")]
    NoRootModule,

    #[error("invalid module ignore pattern '{pattern}': {source}")]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration pass aborted: {0}")]
    Aborted(String),
}

/// Top-level error for a complete startup: load the host config, then wire.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
}

pub type WiringResult<T> = Result<T, WiringError>;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! host config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HostConfig (validated, immutable)
//!     → configuration pass (lifecycle/startup.rs)
//!
//! module descriptors, wiring file (key = value)
//!     → properties.rs
//!
//! On change (autoreload):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new configuration pass, atomic snapshot swap
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod properties;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use properties::Properties;
pub use schema::{HostConfig, ListenerConfig, ModulesConfig, ObservabilityConfig, RoutingCookieConfig, TimeoutConfig};
pub use watcher::ConfigWatcher;

//! Modular web application host.
//!
//! Modules are directories carrying a `MOD-INF` marker. They are discovered,
//! wired together (inheritance, interfaces, mount points) and served over
//! HTTP, with cross-module links in text resources rewritten to the live
//! mount paths.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod modules;
pub mod observability;
pub mod rewrite;
pub mod routing;

pub use config::schema::HostConfig;
pub use error::{HostError, WiringError};
pub use http::HostServer;
pub use lifecycle::Shutdown;
pub use modules::Application;

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Discover → Wire → Publish snapshot
//!
//! Reload (startup.rs, driven by config/watcher.rs):
//!     Change detected → Rebuild on blocking pool → Atomic snapshot swap
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Broadcast → Stop accepting → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - The listener is bound before the first pass; requests see "initializing"
//! - Failed passes are published, not retried
//! - Shutdown is a broadcast every long-running task subscribes to

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_application, check, reconfigure};

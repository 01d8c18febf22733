//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, host, X-Forwarded-Host, X-Context-Path)
//!     → request.rs (RequestContext: true host / true context path)
//!     → mounter.rs get_zone (absolute context, then relative, then default)
//!     → mounter.rs get_module (longest mount path prefix, zone tie-break)
//!     → Return: name of the owning module (root module as last resort)
//!
//! Registry Construction (per configuration pass):
//!     zone.<name> entries   → zone.rs → Mounter zone tables
//!     wiring mount entries  → mount_point.rs → Mounter mount tables
//!     → frozen inside the Application snapshot
//! ```
//!
//! # Design Decisions
//! - Registry is immutable while serving; reloads swap a whole new one
//! - Duplicate (path, zone) registrations are fatal, never overwritten
//! - Deterministic: same input always resolves to the same module

pub mod mount_point;
pub mod mounter;
pub mod request;
pub mod zone;

pub use mount_point::MountPoint;
pub use mounter::{Mounter, MAIN_ZONE};
pub use request::RequestContext;
pub use zone::Zone;

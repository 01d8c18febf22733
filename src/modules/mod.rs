//! Module composition subsystem.
//!
//! # Data Flow
//! ```text
//! module paths
//!     → discovery.rs (directories holding MOD-INF → descriptors by name)
//!     → wiring.rs (extends chains, mount points, merged properties,
//!                  interface index, injected dependencies, root module)
//!     → Application (graph + mounter, immutable)
//!     → published to the HTTP layer as one snapshot
//! ```
//!
//! # Design Decisions
//! - The graph is an arena keyed by name; relations are names, not pointers
//! - Every configuration problem is a `WiringError` that aborts the pass
//! - Name-ordered tables keep every pass deterministic

pub mod descriptor;
pub mod discovery;
pub mod graph;
pub mod wiring;

pub use descriptor::ModuleDescriptor;
pub use discovery::Discovery;
pub use graph::{Module, ModuleGraph, ModuleSummary};
pub use wiring::{Application, ModuleGraphBuilder, MAIN_MODULE};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID)
//!     → [routing decides zone and module]
//!     → resource.rs (file lookup, streaming, link rewriting)
//!     → response.rs (status pages, routing cookie)
//!     → Send to client
//! ```

pub mod request;
pub mod resource;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HostServer, HostState, Snapshot};

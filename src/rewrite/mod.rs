//! Content rewriting.
//!
//! Text resources pass through a [`LinkRewriter`] on their way to the client,
//! turning `[#module#]` references into the referenced module's mount path.
//! One rewriter per response; it holds at most one partial token.

pub mod link_rewriter;

pub use link_rewriter::{LinkResolver, LinkRewriter, ModuleLinks, MAX_NAME_LEN};

//! Larder Graph: script execution client for a Gremlin graph service.
//!
//! Traversals are built as typed step lists, rendered to Gremlin script
//! text at the HTTP boundary, and answered with status-coded envelopes.
//! The in-memory backend interprets the same traversals for tests.

pub mod backend;
pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod response;
pub mod script;
pub mod traversal;

pub use backend::{Backend, HttpBackend};
pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryBackend;
pub use script::ScriptMode;
pub use traversal::Traversal;

//! In-memory storage backend for the Praxis clinic server.
//!
//! Intended for tests and single-node deployments. Honors the same
//! atomicity contract a relational backend would: the ownership change and
//! transfer-history insert commit together, and versioned session updates
//! are compare-and-swap.

mod store;

pub use store::InMemoryStore;

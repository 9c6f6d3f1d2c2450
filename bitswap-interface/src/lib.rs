//! # bitswap-interface
//!
//! Shared types for the block-exchange core: the error type returned by
//! the network collaborator, and the result alias built on top of it.
//! This crate has no knowledge of the want-manager's internals — it is
//! the seam the core and its collaborators (transport, decision engine)
//! both depend on.

pub mod errors;

pub use errors::*;

/// Result alias used throughout the block-exchange core.
pub type Result<T> = std::result::Result<T, CoreError>;

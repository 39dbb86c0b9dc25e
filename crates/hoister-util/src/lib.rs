//! Shared utilities for the hoister workspace.
//!
//! This crate provides the cross-cutting concerns used by the other hoister
//! crates, currently the error taxonomy reported to callers.

pub mod errors;

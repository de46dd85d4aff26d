//! The user registry.
//!
//! Enforces email uniqueness on top of a store that only guarantees
//! per-key atomicity.

mod error;
pub mod keys;
pub mod records;
mod service;

pub use error::{RegistryError, Result};
pub use service::UserRegistry;

//! Core types for registering confirmed users.
//!
//! Everything here is independent of the concrete key-value store. The
//! DynamoDB adapter lives in the `confirm_signup` crate and plugs in through
//! [`storage::KeyValueStore`].

pub mod clock;
pub mod registry;
pub mod storage;
pub mod user;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

//! DynamoDB storage backend.
//!
//! Implements the `KeyValueStore` trait using `aws-sdk-dynamodb`.

mod conversions;
mod error;
mod store;

pub use error::decode_cancellation_reasons;
pub use store::{create_client, DynamoDbStore};

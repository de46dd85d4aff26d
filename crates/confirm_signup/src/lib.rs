//! Cognito post-confirmation function that records confirmed users in
//! DynamoDB while keeping emails unique.

pub mod config;
pub mod event;
pub mod handler;
pub mod logging;
pub mod storage;

pub use config::Config;
pub use event::ConfirmationEvent;
pub use handler::{HandlerError, PostConfirmationHandler};
pub use storage::DynamoDbStore;

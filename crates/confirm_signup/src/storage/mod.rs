pub mod dynamodb;

pub use dynamodb::DynamoDbStore;

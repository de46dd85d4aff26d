//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB AttributeValue maps and the
//! store-neutral [`Item`]. These are testable in isolation without DynamoDB
//! access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use signup_core::storage::{Attribute, Item, ItemKey, StoreError, PK, SK};

/// Convert an [`Item`] to a DynamoDB item.
pub fn to_dynamo_item(item: Item) -> HashMap<String, AttributeValue> {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute_value(value)))
        .collect()
}

/// Convert a DynamoDB item to an [`Item`].
///
/// Only string and number attributes are part of the users table layout;
/// anything else is rejected rather than dropped.
pub fn from_dynamo_item(item: HashMap<String, AttributeValue>) -> Result<Item, StoreError> {
    item.into_iter()
        .map(|(name, value)| {
            let attribute = from_attribute_value(&name, value)?;
            Ok((name, attribute))
        })
        .collect()
}

/// Key attributes for GetItem.
pub fn key_attributes(key: &ItemKey) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(key.pk.clone())),
        (SK.to_string(), AttributeValue::S(key.sk.clone())),
    ])
}

fn to_attribute_value(value: Attribute) -> AttributeValue {
    match value {
        Attribute::S(s) => AttributeValue::S(s),
        Attribute::N(n) => AttributeValue::N(n),
    }
}

fn from_attribute_value(name: &str, value: AttributeValue) -> Result<Attribute, StoreError> {
    match value {
        AttributeValue::S(s) => Ok(Attribute::S(s)),
        AttributeValue::N(n) => Ok(Attribute::N(n)),
        other => Err(StoreError::Serialization(format!(
            "Unsupported attribute type for {name}: {other:?}"
        ))),
    }
}

//! Conversions between [`User`] and stored items.
//!
//! One user is persisted as two items:
//!
//! | Attribute | Primary record   | Email reservation  |
//! |-----------|------------------|--------------------|
//! | pk / sk   | `USERNAME#<id>`  | `USEREMAIL#<email>`|
//! | email     | yes              | no                 |
//! | name      | when present     | no                 |
//! | createdAt | RFC 3339         | no                 |
//! | ttl       | when present     | when present       |
//!
//! These are pure functions, testable without a store.

use chrono::{DateTime, Utc};

use crate::storage::{Attribute, Item, PK, SK};
use crate::user::User;

use super::keys;
use super::{RegistryError, Result};

pub const ATTR_EMAIL: &str = "email";
pub const ATTR_NAME: &str = "name";
pub const ATTR_CREATED_AT: &str = "createdAt";
/// Expiry attribute the table's time-to-live setting points at.
pub const ATTR_TTL: &str = "ttl";

fn keyed_item(pk: String, expires_at: Option<i64>) -> Item {
    let mut item = Item::new();
    item.insert(PK.to_string(), Attribute::S(pk.clone()));
    item.insert(SK.to_string(), Attribute::S(pk));
    if let Some(ttl) = expires_at {
        item.insert(ATTR_TTL.to_string(), Attribute::N(ttl.to_string()));
    }
    item
}

/// Builds the primary record for a user.
pub fn primary_record(user: &User, expires_at: Option<i64>) -> Item {
    let mut item = keyed_item(keys::user_pk(&user.id), expires_at);

    item.insert(ATTR_EMAIL.to_string(), Attribute::S(user.email.clone()));
    if let Some(name) = &user.name {
        item.insert(ATTR_NAME.to_string(), Attribute::S(name.clone()));
    }
    item.insert(
        ATTR_CREATED_AT.to_string(),
        Attribute::S(user.created_at.to_rfc3339()),
    );

    item
}

/// Builds the email reservation record. It holds nothing but its key and
/// the shared expiry.
pub fn email_record(email: &str, expires_at: Option<i64>) -> Item {
    keyed_item(keys::email_pk(email), expires_at)
}

/// Decodes a primary record back into a [`User`].
pub fn item_to_user(item: &Item) -> Result<User> {
    let pk = get_string(item, PK)?;
    let id = keys::user_id_from_pk(pk)
        .ok_or_else(|| RegistryError::decoding("pk", format!("not a user key: {pk}")))?;

    Ok(User {
        id: id.to_string(),
        email: get_string(item, ATTR_EMAIL)?.to_string(),
        name: get_optional_string(item, ATTR_NAME),
        created_at: get_datetime(item, ATTR_CREATED_AT)?,
        expires_at: get_optional_i64(item, ATTR_TTL)?,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get a required string attribute.
fn get_string<'a>(item: &'a Item, key: &'static str) -> Result<&'a str> {
    item.get(key)
        .and_then(Attribute::as_s)
        .ok_or_else(|| RegistryError::decoding(key, "missing or not a string"))
}

/// Get an optional string attribute.
fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(Attribute::as_s).map(str::to_string)
}

/// Get an optional numeric attribute.
fn get_optional_i64(item: &Item, key: &'static str) -> Result<Option<i64>> {
    match item.get(key) {
        None => Ok(None),
        Some(value) => {
            let n = value
                .as_n()
                .ok_or_else(|| RegistryError::decoding(key, "not a number"))?;
            n.parse()
                .map(Some)
                .map_err(|e| RegistryError::decoding(key, format!("{n}: {e}")))
        }
    }
}

/// Get a required datetime attribute (RFC 3339 format).
fn get_datetime(item: &Item, key: &'static str) -> Result<DateTime<Utc>> {
    let s = get_string(item, key)?;
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RegistryError::decoding(key, format!("{s}: {e}")))
}

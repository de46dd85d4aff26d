//! Key generation for the users table.
//!
//! Both record kinds use a self-referential composite key: the sort key
//! repeats the partition key.

use crate::storage::ItemKey;

pub const USER_PREFIX: &str = "USERNAME#";
pub const EMAIL_PREFIX: &str = "USEREMAIL#";

/// Primary record key.
///
/// Pattern: `USERNAME#<user_id>`
pub fn user_pk(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Email-uniqueness record key.
///
/// Pattern: `USEREMAIL#<email>`
pub fn email_pk(email: &str) -> String {
    format!("{EMAIL_PREFIX}{email}")
}

pub fn user_key(user_id: &str) -> ItemKey {
    let pk = user_pk(user_id);
    ItemKey::new(pk.clone(), pk)
}

pub fn email_key(email: &str) -> ItemKey {
    let pk = email_pk(email);
    ItemKey::new(pk.clone(), pk)
}

/// Recovers the user id from a primary record key.
pub fn user_id_from_pk(pk: &str) -> Option<&str> {
    pk.strip_prefix(USER_PREFIX).filter(|id| !id.is_empty())
}

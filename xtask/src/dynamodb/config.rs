//! Table configuration types (Functional Core - pure data).

use signup_core::registry::records::ATTR_TTL;
use signup_core::storage::{PK, SK};

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    /// Attribute holding the epoch-seconds expiry, if the table expires items.
    pub ttl_attribute: Option<String>,
    pub billing_mode: BillingMode,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// DynamoDB attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

impl TableConfig {
    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }
}

/// Returns the users table configuration.
/// This is a pure function - no I/O.
pub fn users_table_config() -> TableConfig {
    TableConfig {
        table_name: "users".to_string(),
        partition_key: KeyAttribute {
            name: PK.to_string(),
            attribute_type: AttributeType::String,
        },
        sort_key: Some(KeyAttribute {
            name: SK.to_string(),
            attribute_type: AttributeType::String,
        }),
        ttl_attribute: Some(ATTR_TTL.to_string()),
        billing_mode: BillingMode::PayPerRequest,
    }
}

//! Cognito post-confirmation trigger payload.
//!
//! Only the fields the handler reads are typed. Everything else is kept in
//! flattened maps so the event is handed back to Cognito unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationEvent {
    pub trigger_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub request: ConfirmationRequest,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    #[serde(default)]
    pub user_attributes: HashMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfirmationEvent {
    pub fn new(trigger_source: impl Into<String>) -> Self {
        Self {
            trigger_source: trigger_source.into(),
            user_pool_id: None,
            user_name: None,
            request: ConfirmationRequest::default(),
            extra: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .user_attributes
            .insert(name.into(), value.into());
        self
    }

    /// Returns a user attribute, treating blank values as absent.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.request
            .user_attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

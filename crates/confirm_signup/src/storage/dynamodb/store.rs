//! DynamoDB store implementation.
//!
//! Implements `KeyValueStore` from `signup_core::storage` using DynamoDB.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;

use signup_core::storage::{ConditionalPut, Item, ItemKey, KeyValueStore, Result, StoreError};

use super::conversions::{from_dynamo_item, key_attributes, to_dynamo_item};
use super::error::{map_get_item_error, map_put_item_error, map_transact_write_error};
use crate::config::Config;

/// DynamoDB-backed key-value store.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
}

impl DynamoDbStore {
    /// Creates a new store with the given DynamoDB client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a store from configuration.
    ///
    /// Credentials come from the SDK default chain. Region and endpoint are
    /// only overridden when configured.
    pub async fn from_config(config: &Config) -> Self {
        let client = create_client(config.region.as_deref(), config.endpoint_url.as_deref()).await;
        Self::new(client, config.users_table.clone())
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn build_put(&self, put: ConditionalPut) -> Result<Put> {
        Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(to_dynamo_item(put.item)))
            .set_condition_expression(put.condition.map(|c| c.expression()))
            .build()
            .map_err(|e| StoreError::Serialization(format!("Invalid put request: {e}")))
    }
}

/// Creates a DynamoDB client.
pub async fn create_client(region: Option<&str>, endpoint_url: Option<&str>) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    Client::new(&loader.load().await)
}

fn key_display(item: &Item) -> String {
    ItemKey::of(item)
        .map(|key| key.to_string())
        .unwrap_or_else(|| "<missing key>".to_string())
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn get_by_key(&self, key: &ItemKey) -> Result<Item> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(map_get_item_error)?;

        match result.item {
            Some(item) => from_dynamo_item(item),
            None => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn put(&self, put: ConditionalPut) -> Result<()> {
        let key = key_display(&put.item);

        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_dynamo_item(put.item)));
        if let Some(condition) = put.condition {
            request = request.condition_expression(condition.expression());
        }

        request
            .send()
            .await
            .map_err(|e| map_put_item_error(e, key))?;

        Ok(())
    }

    async fn transact_put(&self, puts: Vec<ConditionalPut>) -> Result<()> {
        let count = puts.len();
        let items = puts
            .into_iter()
            .map(|put| {
                self.build_put(put)
                    .map(|put| TransactWriteItem::builder().put(put).build())
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(map_transact_write_error)?;

        tracing::debug!(table = %self.table_name, count, "Transaction committed");
        Ok(())
    }
}

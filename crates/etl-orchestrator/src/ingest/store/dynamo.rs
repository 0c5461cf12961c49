//! DynamoDB-backed metadata store

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::{types::AttributeValue, Client};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::MetadataStore;
use crate::aws::sdk_error_message;
use crate::error::{IngestError, IngestResult};
use crate::ingest::models::{
    attr, format_timestamp, parse_timestamp, IngestionRecord, ProcessingStatus, STATUS_INDEX,
};

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoMetadataStore {
    client: Client,
    table: String,
}

impl DynamoMetadataStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig, table: impl Into<String>) -> Self {
        let table = table.into();
        info!("Metadata store client initialized for table: {}", table);
        Self::new(Client::new(sdk_config), table)
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    #[instrument(skip(self), fields(table = %self.table))]
    async fn create_initiated(
        &self,
        file_id: Uuid,
        source_path: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()> {
        let timestamp = format_timestamp(timestamp);

        self.client
            .put_item()
            .table_name(&self.table)
            .item(attr::FILE_ID, AttributeValue::S(file_id.to_string()))
            .item(attr::SOURCE_PATH, AttributeValue::S(source_path.to_string()))
            .item(
                attr::STATUS,
                AttributeValue::S(ProcessingStatus::Initiated.as_str().to_string()),
            )
            .item(attr::CREATED_AT, AttributeValue::S(timestamp.clone()))
            .item(attr::UPDATED_AT, AttributeValue::S(timestamp))
            .send()
            .await
            .map_err(|e| IngestError::StoreWriteFailed {
                file_id,
                message: sdk_error_message(&e),
            })?;

        debug!("Created metadata record for file ID: {}", file_id);
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn mark_failed(
        &self,
        file_id: Uuid,
        error_message: &str,
        timestamp: DateTime<Utc>,
    ) -> IngestResult<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key(attr::FILE_ID, AttributeValue::S(file_id.to_string()))
            .update_expression("SET #status = :status, #error = :error, #updated = :updated")
            .condition_expression("attribute_exists(#file_id)")
            .expression_attribute_names("#file_id", attr::FILE_ID)
            .expression_attribute_names("#status", attr::STATUS)
            .expression_attribute_names("#error", attr::ERROR_MESSAGE)
            .expression_attribute_names("#updated", attr::UPDATED_AT)
            .expression_attribute_values(
                ":status",
                AttributeValue::S(ProcessingStatus::Failed.as_str().to_string()),
            )
            .expression_attribute_values(":error", AttributeValue::S(error_message.to_string()))
            .expression_attribute_values(":updated", AttributeValue::S(format_timestamp(timestamp)))
            .send()
            .await
            .map_err(|e| IngestError::StoreWriteFailed {
                file_id,
                message: sdk_error_message(&e),
            })?;

        debug!("Marked metadata record {} as failed", file_id);
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn get(&self, file_id: Uuid) -> IngestResult<Option<IngestionRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(attr::FILE_ID, AttributeValue::S(file_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| IngestError::StoreReadFailed(sdk_error_message(&e)))?;

        output.item().map(record_from_item).transpose()
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn list_by_status(&self, status: ProcessingStatus) -> IngestResult<Vec<IngestionRecord>> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table)
                .index_name(STATUS_INDEX)
                .key_condition_expression("#status = :status")
                .expression_attribute_names("#status", attr::STATUS)
                .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| IngestError::StoreReadFailed(sdk_error_message(&e)))?;

            for item in output.items() {
                records.push(record_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!("Found {} records with status {}", records.len(), status);
        Ok(records)
    }
}

fn record_from_item(item: &Item) -> IngestResult<IngestionRecord> {
    let file_id = required_string(item, attr::FILE_ID)?;
    let file_id = Uuid::parse_str(file_id)
        .map_err(|e| IngestError::StoreReadFailed(format!("Invalid file_id '{}': {}", file_id, e)))?;

    let status = required_string(item, attr::STATUS)?;
    let status: ProcessingStatus = status
        .parse()
        .map_err(|e: anyhow::Error| IngestError::StoreReadFailed(e.to_string()))?;

    Ok(IngestionRecord {
        file_id,
        source_path: string_attr(item, attr::SOURCE_PATH).unwrap_or_default().to_string(),
        status,
        created_at: required_timestamp(item, attr::CREATED_AT)?,
        updated_at: required_timestamp(item, attr::UPDATED_AT)?,
        error_message: string_attr(item, attr::ERROR_MESSAGE).map(str::to_string),
        output_path: string_attr(item, attr::OUTPUT_PATH).map(str::to_string),
        record_count: item
            .get(attr::RECORD_COUNT)
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse().ok()),
    })
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::as_str)
}

fn required_string<'a>(item: &'a Item, name: &str) -> IngestResult<&'a str> {
    string_attr(item, name)
        .ok_or_else(|| IngestError::StoreReadFailed(format!("Record is missing attribute {}", name)))
}

fn required_timestamp(item: &Item, name: &str) -> IngestResult<DateTime<Utc>> {
    let raw = required_string(item, name)?;
    parse_timestamp(raw)
        .ok_or_else(|| IngestError::StoreReadFailed(format!("Invalid {} timestamp: {}", name, raw)))
}

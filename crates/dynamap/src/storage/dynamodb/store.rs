//! `RemoteStore` implementation over `aws-sdk-dynamodb`.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    ConditionCheck, Delete, DeleteRequest, KeysAndAttributes, Put, PutRequest, ReturnValue,
    TransactWriteItem as SdkTransactItem, Update, WriteRequest as SdkWriteRequest,
};
use aws_sdk_dynamodb::Client;

use dynamap_core::storage::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    DeleteItemInput, GetItemInput, GetItemOutput, PutItemInput, QueryInput, ReadOutput,
    RemoteStore, ReturnValues, ScanInput, StoreResult, TransactWriteItem, TransactWriteItemsInput,
    UpdateItemInput, UpdateItemOutput, WriteRequest,
};

use super::conversions::{
    expression_maps, from_sdk_item, from_sdk_items, to_sdk_count, to_sdk_item,
};
use super::error::{map_build_error, map_sdk_error, map_transact_error};

/// DynamoDB-backed remote store.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    /// Creates a store over an existing DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store from the AWS SDK default credential chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

// ============================================================================
// Single-item operations
// ============================================================================

#[async_trait]
impl RemoteStore for DynamoDbStore {
    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput> {
        let (names, _) = expression_maps(&input.attributes);
        let result = self
            .client
            .get_item()
            .table_name(&input.table_name)
            .set_key(Some(to_sdk_item(&input.key)))
            .consistent_read(input.consistent_read)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(names)
            .send()
            .await
            .map_err(|e| map_sdk_error("GetItem", e))?;

        let item = result.item.as_ref().map(from_sdk_item).transpose()?;
        Ok(GetItemOutput { item })
    }

    async fn put_item(&self, input: PutItemInput) -> StoreResult<()> {
        let (names, values) = expression_maps(&input.attributes);
        self.client
            .put_item()
            .table_name(&input.table_name)
            .set_item(Some(to_sdk_item(&input.item)))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await
            .map_err(|e| map_sdk_error("PutItem", e))?;
        Ok(())
    }

    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<()> {
        let (names, values) = expression_maps(&input.attributes);
        self.client
            .delete_item()
            .table_name(&input.table_name)
            .set_key(Some(to_sdk_item(&input.key)))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteItem", e))?;
        Ok(())
    }

    async fn update_item(&self, input: UpdateItemInput) -> StoreResult<UpdateItemOutput> {
        let (names, values) = expression_maps(&input.attributes);
        let return_values = match input.return_values {
            ReturnValues::None => ReturnValue::None,
            ReturnValues::AllNew => ReturnValue::AllNew,
        };
        let result = self
            .client
            .update_item()
            .table_name(&input.table_name)
            .set_key(Some(to_sdk_item(&input.key)))
            .update_expression(input.update_expression)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .return_values(return_values)
            .send()
            .await
            .map_err(|e| map_sdk_error("UpdateItem", e))?;

        let attributes = result.attributes.as_ref().map(from_sdk_item).transpose()?;
        Ok(UpdateItemOutput { attributes })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn query(&self, input: QueryInput) -> StoreResult<ReadOutput> {
        let (names, values) = expression_maps(&input.attributes);
        let result = self
            .client
            .query()
            .table_name(&input.table_name)
            .set_index_name(input.index_name)
            .key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .scan_index_forward(input.scan_index_forward)
            .consistent_read(input.consistent_read)
            .set_limit(input.limit.map(to_sdk_count))
            .set_exclusive_start_key(input.exclusive_start_key.as_ref().map(to_sdk_item))
            .send()
            .await
            .map_err(|e| map_sdk_error("Query", e))?;

        Ok(ReadOutput {
            items: from_sdk_items(result.items())?,
            last_evaluated_key: result
                .last_evaluated_key
                .as_ref()
                .map(from_sdk_item)
                .transpose()?,
        })
    }

    async fn scan(&self, input: ScanInput) -> StoreResult<ReadOutput> {
        let (names, values) = expression_maps(&input.attributes);
        let result = self
            .client
            .scan()
            .table_name(&input.table_name)
            .set_index_name(input.index_name)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .consistent_read(input.consistent_read)
            .set_limit(input.limit.map(to_sdk_count))
            .set_exclusive_start_key(input.exclusive_start_key.as_ref().map(to_sdk_item))
            .set_segment(input.segment.map(to_sdk_count))
            .set_total_segments(input.total_segments.map(to_sdk_count))
            .send()
            .await
            .map_err(|e| map_sdk_error("Scan", e))?;

        Ok(ReadOutput {
            items: from_sdk_items(result.items())?,
            last_evaluated_key: result
                .last_evaluated_key
                .as_ref()
                .map(from_sdk_item)
                .transpose()?,
        })
    }

    // ========================================================================
    // Batch and transactional writes
    // ========================================================================

    async fn batch_get_item(&self, input: BatchGetItemInput) -> StoreResult<BatchGetItemOutput> {
        let (names, _) = expression_maps(&input.attributes);
        let keys = KeysAndAttributes::builder()
            .set_keys(Some(input.keys.iter().map(to_sdk_item).collect()))
            .consistent_read(input.consistent_read)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(names)
            .build()
            .map_err(map_build_error)?;

        let result = self
            .client
            .batch_get_item()
            .request_items(&input.table_name, keys)
            .send()
            .await
            .map_err(|e| map_sdk_error("BatchGetItem", e))?;

        let items = match result.responses.as_ref().and_then(|r| r.get(&input.table_name)) {
            Some(items) => from_sdk_items(items)?,
            None => Vec::new(),
        };
        let unprocessed_keys = match result
            .unprocessed_keys
            .as_ref()
            .and_then(|u| u.get(&input.table_name))
        {
            Some(pending) => from_sdk_items(pending.keys())?,
            None => Vec::new(),
        };
        Ok(BatchGetItemOutput {
            items,
            unprocessed_keys,
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> StoreResult<BatchWriteItemOutput> {
        let mut requests = Vec::with_capacity(input.requests.len());
        for request in &input.requests {
            requests.push(match request {
                WriteRequest::Put(item) => SdkWriteRequest::builder()
                    .put_request(
                        PutRequest::builder()
                            .set_item(Some(to_sdk_item(item)))
                            .build()
                            .map_err(map_build_error)?,
                    )
                    .build(),
                WriteRequest::Delete(key) => SdkWriteRequest::builder()
                    .delete_request(
                        DeleteRequest::builder()
                            .set_key(Some(to_sdk_item(key)))
                            .build()
                            .map_err(map_build_error)?,
                    )
                    .build(),
            });
        }

        let result = self
            .client
            .batch_write_item()
            .request_items(&input.table_name, requests)
            .send()
            .await
            .map_err(|e| map_sdk_error("BatchWriteItem", e))?;

        let mut unprocessed = Vec::new();
        let pending = result
            .unprocessed_items
            .as_ref()
            .and_then(|u| u.get(&input.table_name));
        for request in pending.into_iter().flatten() {
            if let Some(put) = request.put_request() {
                unprocessed.push(WriteRequest::Put(from_sdk_item(put.item())?));
            } else if let Some(delete) = request.delete_request() {
                unprocessed.push(WriteRequest::Delete(from_sdk_item(delete.key())?));
            }
        }
        Ok(BatchWriteItemOutput { unprocessed })
    }

    async fn transact_write_items(&self, input: TransactWriteItemsInput) -> StoreResult<()> {
        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(to_sdk_transact_item(item)?);
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(map_transact_error)?;
        Ok(())
    }
}

fn to_sdk_transact_item(item: &TransactWriteItem) -> StoreResult<SdkTransactItem> {
    let action = match item {
        TransactWriteItem::Put {
            table_name,
            item,
            condition_expression,
            attributes,
        } => {
            let (names, values) = expression_maps(attributes);
            let put = Put::builder()
                .table_name(table_name)
                .set_item(Some(to_sdk_item(item)))
                .set_condition_expression(condition_expression.clone())
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(map_build_error)?;
            SdkTransactItem::builder().put(put)
        }
        TransactWriteItem::Delete {
            table_name,
            key,
            condition_expression,
            attributes,
        } => {
            let (names, values) = expression_maps(attributes);
            let delete = Delete::builder()
                .table_name(table_name)
                .set_key(Some(to_sdk_item(key)))
                .set_condition_expression(condition_expression.clone())
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(map_build_error)?;
            SdkTransactItem::builder().delete(delete)
        }
        TransactWriteItem::Update {
            table_name,
            key,
            update_expression,
            condition_expression,
            attributes,
        } => {
            let (names, values) = expression_maps(attributes);
            let update = Update::builder()
                .table_name(table_name)
                .set_key(Some(to_sdk_item(key)))
                .update_expression(update_expression)
                .set_condition_expression(condition_expression.clone())
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(map_build_error)?;
            SdkTransactItem::builder().update(update)
        }
        TransactWriteItem::ConditionCheck {
            table_name,
            key,
            condition_expression,
            attributes,
        } => {
            let (names, values) = expression_maps(attributes);
            let check = ConditionCheck::builder()
                .table_name(table_name)
                .set_key(Some(to_sdk_item(key)))
                .condition_expression(condition_expression)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(map_build_error)?;
            SdkTransactItem::builder().condition_check(check)
        }
    };
    Ok(action.build())
}

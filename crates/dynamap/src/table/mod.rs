//! Record Access Engine: typed CRUD, queries and scans over one table.

mod request;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use dynamap_core::cursor::{decode_cursor, encode_cursor, Cursor, SortDirection};
use dynamap_core::expression::{
    render_key_condition, render_projection, render_update, validate_update, Expr, Placeholders,
    UpdateOp,
};
use dynamap_core::marshal;
use dynamap_core::model::{Model, Record, Role};
use dynamap_core::storage::{
    BatchGetItemInput, DeleteItemInput, ExpressionAttributes, GetItemInput, KeyWrapper,
    PutItemInput, QueryInput, ReadOutput, RemoteStore, ReturnValues, ScanInput,
    TransactWriteItem, UpdateItemInput, WriteRequest,
};
use dynamap_core::{AccessError, AttributeValue, Item, Key, Result};

pub use request::{GetOptions, Page, QueryRequest, ScanRequest, TransactAction, WriteOptions};

use crate::config::EngineConfig;
use crate::encryption::{EncryptionService, NonceSource};
use crate::orchestrator::{
    self, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_BATCH_MAX_RETRIES, DEFAULT_SCAN_CONCURRENCY,
};
use request::render_filter;

/// Predicate deciding whether a retried read is good enough.
pub type Verify<'a, T> = &'a (dyn Fn(&Page<T>) -> bool + Send + Sync);

/// Typed access to the records of one model in one table.
pub struct Table<T> {
    model: Arc<Model>,
    table_name: String,
    store: Arc<dyn RemoteStore>,
    encryption: Option<EncryptionService>,
    sleeper: Arc<dyn Sleeper>,
    batch_max_retries: u32,
    scan_concurrency: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            table_name: self.table_name.clone(),
            store: Arc::clone(&self.store),
            encryption: self.encryption.clone(),
            sleeper: Arc::clone(&self.sleeper),
            batch_max_retries: self.batch_max_retries,
            scan_concurrency: self.scan_concurrency,
            _record: PhantomData,
        }
    }
}

/// Builder for [`Table`]. Configuration errors surface from [`TableBuilder::build`].
pub struct TableBuilder<T> {
    store: Arc<dyn RemoteStore>,
    model: Option<Arc<Model>>,
    table_name: Option<String>,
    key_wrapper: Option<Arc<dyn KeyWrapper>>,
    key_id: Option<String>,
    nonces: Option<Arc<dyn NonceSource>>,
    sleeper: Arc<dyn Sleeper>,
    batch_max_retries: u32,
    scan_concurrency: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> TableBuilder<T> {
    /// Uses an already registered model instead of building one from `T`.
    pub fn model(mut self, model: Arc<Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn key_wrapper(mut self, wrapper: Arc<dyn KeyWrapper>, key_id: impl Into<String>) -> Self {
        self.key_wrapper = Some(wrapper);
        self.key_id = Some(key_id.into());
        self
    }

    pub fn nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = Some(nonces);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn batch_max_retries(mut self, max_retries: u32) -> Self {
        self.batch_max_retries = max_retries;
        self
    }

    pub fn scan_concurrency(mut self, concurrency: usize) -> Self {
        self.scan_concurrency = concurrency;
        self
    }

    /// Applies environment configuration on top of the builder.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        if let Some(table_name) = &config.table_name {
            self.table_name = Some(table_name.clone());
        }
        if let Some(key_id) = &config.kms_key_id {
            self.key_id = Some(key_id.clone());
        }
        self.batch_max_retries = config.batch_max_retries;
        self.scan_concurrency = config.scan_concurrency;
        self
    }

    pub fn build(self) -> Result<Table<T>> {
        let model = match self.model {
            Some(model) => model,
            None => Arc::new(T::model()?),
        };

        let table_name = self
            .table_name
            .or_else(|| model.table_name().map(str::to_string))
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                AccessError::validation(format!(
                    "no table name configured for model {}",
                    model.model_type()
                ))
            })?;

        let encryption = match (self.key_wrapper, self.key_id) {
            (Some(wrapper), Some(key_id)) => {
                let service = EncryptionService::new(key_id, wrapper)?;
                Some(match self.nonces {
                    Some(nonces) => service.with_nonce_source(nonces),
                    None => service,
                })
            }
            _ => None,
        };
        if model.has_encrypted_fields() && encryption.is_none() {
            return Err(AccessError::EncryptionNotConfigured(format!(
                "model {} has encrypted fields but no key wrapper is configured",
                model.model_type()
            )));
        }
        if self.scan_concurrency == 0 {
            return Err(AccessError::validation("scan concurrency must be > 0"));
        }

        tracing::debug!(
            model = %model.model_type(),
            table = %table_name,
            encrypted = encryption.is_some(),
            "table ready"
        );

        Ok(Table {
            model,
            table_name,
            store: self.store,
            encryption,
            sleeper: self.sleeper,
            batch_max_retries: self.batch_max_retries,
            scan_concurrency: self.scan_concurrency,
            _record: PhantomData,
        })
    }
}

impl<T: Record> Table<T> {
    pub fn builder(store: Arc<dyn RemoteStore>) -> TableBuilder<T> {
        TableBuilder {
            store,
            model: None,
            table_name: None,
            key_wrapper: None,
            key_id: None,
            nonces: None,
            sleeper: Arc::new(TokioSleeper),
            batch_max_retries: DEFAULT_BATCH_MAX_RETRIES,
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
            _record: PhantomData,
        }
    }

    pub fn new(store: Arc<dyn RemoteStore>) -> Result<Self> {
        Self::builder(store).build()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub async fn get(&self, key: &Key, options: &GetOptions) -> Result<T> {
        let key = marshal::encode_key(&self.model, key)?;
        let mut placeholders = Placeholders::new();
        let projection = options
            .projection
            .as_deref()
            .map(|fields| render_projection(&self.model, fields, &mut placeholders))
            .transpose()?;

        tracing::debug!(operation = "GetItem", table = %self.table_name, "sending request");
        let output = self
            .store
            .get_item(GetItemInput {
                table_name: self.table_name.clone(),
                key,
                consistent_read: options.consistent_read,
                projection_expression: projection,
                attributes: expression_attributes(placeholders),
            })
            .await?;

        match output.item {
            Some(item) if !item.is_empty() => self.decode_item(&item).await,
            _ => Err(AccessError::NotFound(format!(
                "{} not found",
                self.model.model_type()
            ))),
        }
    }

    pub async fn put(&self, record: &T, options: &WriteOptions) -> Result<()> {
        check_unversioned_put(options)?;
        let item = self.prepare_put(record).await?;
        let mut placeholders = Placeholders::new();
        let condition = options.render(&self.model, &mut placeholders)?;

        tracing::debug!(operation = "PutItem", table = %self.table_name, "sending request");
        self.store
            .put_item(PutItemInput {
                table_name: self.table_name.clone(),
                item,
                condition_expression: condition,
                attributes: expression_attributes(placeholders),
            })
            .await?;
        Ok(())
    }

    /// Deletes one item; a non-zero `expected_version` guards the delete.
    pub async fn delete(&self, key: &Key, options: &WriteOptions) -> Result<()> {
        let key = marshal::encode_key(&self.model, key)?;
        let options = self.with_version_check(options, true)?;
        let mut placeholders = Placeholders::new();
        let condition = options.render(&self.model, &mut placeholders)?;

        tracing::debug!(operation = "DeleteItem", table = %self.table_name, "sending request");
        self.store
            .delete_item(DeleteItemInput {
                table_name: self.table_name.clone(),
                key,
                condition_expression: condition,
                attributes: expression_attributes(placeholders),
            })
            .await?;
        Ok(())
    }

    /// Applies `ops` and returns the record as stored afterwards.
    ///
    /// Updated-at fields are set to the write time and the version field is
    /// bumped by one, unless `ops` already touch them.
    pub async fn update(&self, key: &Key, ops: &[UpdateOp], options: &WriteOptions) -> Result<T> {
        let (key, update_expression, condition, attributes) =
            self.render_update_parts(key, ops, options).await?;

        tracing::debug!(operation = "UpdateItem", table = %self.table_name, "sending request");
        let output = self
            .store
            .update_item(UpdateItemInput {
                table_name: self.table_name.clone(),
                key,
                update_expression,
                condition_expression: condition,
                attributes,
                return_values: ReturnValues::AllNew,
            })
            .await?;

        match output.attributes {
            Some(item) if !item.is_empty() => self.decode_item(&item).await,
            _ => Err(AccessError::validation("update did not return Attributes")),
        }
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<Page<T>> {
        let schema = self.model.key_schema(request.index.as_deref())?;
        if schema.is_gsi() && request.consistent_read {
            return Err(AccessError::validation(
                "consistent_read is not supported for GSIs",
            ));
        }
        check_limit(request.limit)?;
        let exclusive_start_key =
            start_key(request.cursor.as_deref(), request.index.as_deref(), request.direction)?;

        let mut placeholders = Placeholders::new();
        let key_condition = render_key_condition(
            &schema,
            &request.partition,
            request.sort.as_ref(),
            &mut placeholders,
        )?;
        let filter = render_filter(
            &self.model,
            request.filter.as_ref(),
            request.raw_filter.as_ref(),
            &mut placeholders,
        )?;
        let projection = request
            .projection
            .as_deref()
            .map(|fields| render_projection(&self.model, fields, &mut placeholders))
            .transpose()?;

        tracing::debug!(
            operation = "Query",
            table = %self.table_name,
            index = ?request.index,
            "sending request"
        );
        let output = self
            .store
            .query(QueryInput {
                table_name: self.table_name.clone(),
                index_name: request.index.clone(),
                key_condition_expression: key_condition,
                filter_expression: filter,
                projection_expression: projection,
                attributes: expression_attributes(placeholders),
                scan_index_forward: request.direction.is_forward(),
                consistent_read: request.consistent_read,
                limit: request.limit,
                exclusive_start_key,
            })
            .await?;

        self.page(output, request.index.clone(), request.direction)
            .await
    }

    pub async fn scan(&self, request: &ScanRequest) -> Result<Page<T>> {
        let schema = self.model.key_schema(request.index.as_deref())?;
        if schema.is_gsi() && request.consistent_read {
            return Err(AccessError::validation(
                "consistent_read is not supported for GSIs",
            ));
        }
        check_limit(request.limit)?;
        if let Some((segment, total)) = request.segment {
            if total == 0 || segment >= total {
                return Err(AccessError::validation(format!(
                    "invalid scan segment {segment} of {total}"
                )));
            }
        }
        let exclusive_start_key =
            start_key(request.cursor.as_deref(), request.index.as_deref(), SortDirection::Asc)?;

        let mut placeholders = Placeholders::new();
        let filter = render_filter(
            &self.model,
            request.filter.as_ref(),
            request.raw_filter.as_ref(),
            &mut placeholders,
        )?;
        let projection = request
            .projection
            .as_deref()
            .map(|fields| render_projection(&self.model, fields, &mut placeholders))
            .transpose()?;

        tracing::debug!(
            operation = "Scan",
            table = %self.table_name,
            index = ?request.index,
            segment = ?request.segment,
            "sending request"
        );
        let output = self
            .store
            .scan(ScanInput {
                table_name: self.table_name.clone(),
                index_name: request.index.clone(),
                filter_expression: filter,
                projection_expression: projection,
                attributes: expression_attributes(placeholders),
                consistent_read: request.consistent_read,
                limit: request.limit,
                exclusive_start_key,
                segment: request.segment.map(|(segment, _)| segment),
                total_segments: request.segment.map(|(_, total)| total),
            })
            .await?;

        self.page(output, request.index.clone(), SortDirection::Asc)
            .await
    }

    /// Follows cursors until the query is exhausted.
    pub async fn query_all(&self, request: &QueryRequest) -> Result<Vec<T>> {
        let mut request = request.clone();
        let mut items = Vec::new();
        loop {
            let page = self.query(&request).await?;
            items.extend(page.items);
            match page.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => return Ok(items),
            }
        }
    }

    /// Follows cursors until the scan is exhausted.
    pub async fn scan_all(&self, request: &ScanRequest) -> Result<Vec<T>> {
        let mut request = request.clone();
        let mut items = Vec::new();
        loop {
            let page = self.scan(&request).await?;
            items.extend(page.items);
            match page.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => return Ok(items),
            }
        }
    }

    /// Repeats a query page until it satisfies `verify`, or is non-empty
    /// when the policy retries on empty pages.
    pub async fn query_with_retry(
        &self,
        request: &QueryRequest,
        policy: &RetryPolicy,
        verify: Option<Verify<'_, T>>,
    ) -> Result<Page<T>> {
        orchestrator::retry_until(
            policy,
            self.sleeper.as_ref(),
            || self.query(request),
            |page| page_satisfies(policy, verify, page),
        )
        .await
    }

    pub async fn scan_with_retry(
        &self,
        request: &ScanRequest,
        policy: &RetryPolicy,
        verify: Option<Verify<'_, T>>,
    ) -> Result<Page<T>> {
        orchestrator::retry_until(
            policy,
            self.sleeper.as_ref(),
            || self.scan(request),
            |page| page_satisfies(policy, verify, page),
        )
        .await
    }

    /// Scans every segment to exhaustion, `max_concurrency` segments at a
    /// time (default: the table's scan concurrency).
    pub async fn scan_all_segments(
        &self,
        request: &ScanRequest,
        total_segments: u32,
        max_concurrency: Option<usize>,
    ) -> Result<Vec<T>> {
        let concurrency = max_concurrency.unwrap_or(self.scan_concurrency);
        orchestrator::run_segments(total_segments, concurrency, |segment| {
            let request = ScanRequest {
                cursor: None,
                segment: Some((segment, total_segments)),
                ..request.clone()
            };
            async move { self.scan_all(&request).await }
        })
        .await
    }

    /// Fetches many records; missing keys are simply absent from the result.
    pub async fn batch_get(&self, keys: &[Key], options: &GetOptions) -> Result<Vec<T>> {
        let keys = keys
            .iter()
            .map(|key| marshal::encode_key(&self.model, key))
            .collect::<Result<Vec<_>>>()?;
        let mut placeholders = Placeholders::new();
        let projection_expression = options
            .projection
            .as_deref()
            .map(|fields| render_projection(&self.model, fields, &mut placeholders))
            .transpose()?;
        let template = BatchGetItemInput {
            table_name: self.table_name.clone(),
            keys: Vec::new(),
            consistent_read: options.consistent_read,
            projection_expression,
            attributes: expression_attributes(placeholders),
        };

        let items = orchestrator::batch_get(
            self.store.as_ref(),
            self.sleeper.as_ref(),
            &template,
            keys,
            self.batch_max_retries,
        )
        .await?;

        let mut records = Vec::with_capacity(items.len());
        for item in &items {
            records.push(self.decode_item(item).await?);
        }
        Ok(records)
    }

    pub async fn batch_write(&self, puts: &[T], deletes: &[Key]) -> Result<()> {
        let mut requests = Vec::with_capacity(puts.len() + deletes.len());
        for record in puts {
            requests.push(WriteRequest::Put(self.prepare_put(record).await?));
        }
        for key in deletes {
            requests.push(WriteRequest::Delete(marshal::encode_key(&self.model, key)?));
        }

        orchestrator::batch_write(
            self.store.as_ref(),
            self.sleeper.as_ref(),
            &self.table_name,
            requests,
            self.batch_max_retries,
        )
        .await
    }

    pub async fn batch_delete(&self, keys: &[Key]) -> Result<()> {
        self.batch_write(&[], keys).await
    }

    /// Renders one action for a (possibly multi-table) transaction.
    pub async fn transact_item(&self, action: &TransactAction<T>) -> Result<TransactWriteItem> {
        let table_name = self.table_name.clone();
        match action {
            TransactAction::Put { record, options } => {
                check_unversioned_put(options)?;
                let item = self.prepare_put(record).await?;
                let mut placeholders = Placeholders::new();
                let condition_expression = options.render(&self.model, &mut placeholders)?;
                Ok(TransactWriteItem::Put {
                    table_name,
                    item,
                    condition_expression,
                    attributes: expression_attributes(placeholders),
                })
            }
            TransactAction::Delete { key, options } => {
                let key = marshal::encode_key(&self.model, key)?;
                let options = self.with_version_check(options, true)?;
                let mut placeholders = Placeholders::new();
                let condition_expression = options.render(&self.model, &mut placeholders)?;
                Ok(TransactWriteItem::Delete {
                    table_name,
                    key,
                    condition_expression,
                    attributes: expression_attributes(placeholders),
                })
            }
            TransactAction::Update { key, ops, options } => {
                let (key, update_expression, condition_expression, attributes) =
                    self.render_update_parts(key, ops, options).await?;
                Ok(TransactWriteItem::Update {
                    table_name,
                    key,
                    update_expression,
                    condition_expression,
                    attributes,
                })
            }
            TransactAction::ConditionCheck { key, options } => {
                let key = marshal::encode_key(&self.model, key)?;
                let options = self.with_version_check(options, false)?;
                let mut placeholders = Placeholders::new();
                let condition_expression = options
                    .render(&self.model, &mut placeholders)?
                    .ok_or_else(|| {
                        AccessError::validation("condition check requires a condition")
                    })?;
                Ok(TransactWriteItem::ConditionCheck {
                    table_name,
                    key,
                    condition_expression,
                    attributes: expression_attributes(placeholders),
                })
            }
        }
    }

    /// Applies 1..=100 actions atomically.
    pub async fn transact_write(&self, actions: &[TransactAction<T>]) -> Result<()> {
        orchestrator::check_action_count(actions.len())?;
        let mut items = Vec::with_capacity(actions.len());
        for action in actions {
            items.push(self.transact_item(action).await?);
        }
        orchestrator::transact_write(self.store.as_ref(), items).await
    }

    /// Encodes a record into its stored form, sealing encrypted fields.
    pub async fn encode_item(&self, record: &T) -> Result<Item> {
        let value = self.to_value(record)?;
        self.seal_item(marshal::encode_item(&self.model, &value)?)
            .await
    }

    /// Decodes a stored item, opening encrypted fields.
    pub async fn decode_item(&self, item: &Item) -> Result<T> {
        let mut plain = item.clone();
        for def in self.model.attributes().values().filter(|def| def.encrypted) {
            if let Some(stored) = plain.get_mut(&def.attribute_name) {
                let opened = self
                    .encryption()?
                    .decrypt(&def.attribute_name, stored)
                    .await?;
                *stored = opened;
            }
        }

        let value = marshal::decode_item(&self.model, &plain)?;
        serde_json::from_value(value).map_err(|e| {
            AccessError::validation(format!(
                "cannot decode {}: {e}",
                self.model.model_type()
            ))
        })
    }

    /// Decodes a change-stream image; an absent or empty image yields `None`.
    pub async fn decode_stream_image(&self, image: Option<&Item>) -> Result<Option<T>> {
        match image {
            Some(item) if !item.is_empty() => self.decode_item(item).await.map(Some),
            _ => Ok(None),
        }
    }

    fn encryption(&self) -> Result<&EncryptionService> {
        self.encryption.as_ref().ok_or_else(|| {
            AccessError::EncryptionNotConfigured(format!(
                "model {} has encrypted fields but no key wrapper is configured",
                self.model.model_type()
            ))
        })
    }

    fn to_value(&self, record: &T) -> Result<Value> {
        serde_json::to_value(record).map_err(|e| {
            AccessError::validation(format!(
                "cannot serialize {}: {e}",
                self.model.model_type()
            ))
        })
    }

    /// Encoded item for a put, with empty timestamp and version fields filled in.
    async fn prepare_put(&self, record: &T) -> Result<Item> {
        let mut value = self.to_value(record)?;
        self.fill_timestamps(&mut value);
        self.seed_version(&mut value);
        self.seal_item(marshal::encode_item(&self.model, &value)?)
            .await
    }

    fn fill_timestamps(&self, value: &mut Value) {
        let Some(fields) = value.as_object_mut() else {
            return;
        };
        let mut now = None;
        for def in self.model.attributes().values() {
            if !def.has_role(Role::CreatedAt) && !def.has_role(Role::UpdatedAt) {
                continue;
            }
            let field = fields
                .entry(def.field_name.clone())
                .or_insert(Value::Null);
            if marshal::is_empty(field) {
                let now = now.get_or_insert_with(|| Utc::now().to_rfc3339());
                *field = Value::String(now.clone());
            }
        }
    }

    fn seed_version(&self, value: &mut Value) {
        let (Some(def), Some(fields)) = (self.model.version(), value.as_object_mut()) else {
            return;
        };
        let field = fields
            .entry(def.field_name.clone())
            .or_insert(Value::Null);
        if field.is_null() {
            *field = Value::from(0);
        }
    }

    /// Caller ops plus the updated-at and version maintenance ops.
    fn with_lifecycle_ops(&self, ops: &[UpdateOp]) -> Result<Vec<UpdateOp>> {
        if ops.is_empty() {
            return Err(AccessError::validation("no updates provided"));
        }
        let touched = |field: &str| ops.iter().any(|op| op.field() == field);
        let mut all = ops.to_vec();

        let mut now = None;
        for def in self.model.updated_at_fields() {
            if !touched(&def.field_name) {
                let now = now.get_or_insert_with(|| Utc::now().to_rfc3339());
                all.push(UpdateOp::set(def.field_name.clone(), now.clone()));
            }
        }
        if let Some(def) = self.model.version() {
            if !touched(&def.field_name) {
                all.push(UpdateOp::increment(def.field_name.clone(), 1));
            }
        }
        Ok(all)
    }

    /// Folds `expected_version` into the structured condition.
    fn with_version_check(&self, options: &WriteOptions, skip_zero: bool) -> Result<WriteOptions> {
        let mut options = options.clone();
        let Some(expected) = options.expected_version.take() else {
            return Ok(options);
        };
        let def = self.model.version().ok_or_else(|| {
            AccessError::validation(format!(
                "model {} has no version field",
                self.model.model_type()
            ))
        })?;
        if skip_zero && expected == 0 {
            return Ok(options);
        }

        let check = Expr::eq(def.field_name.clone(), expected);
        options.condition = Some(match options.condition.take() {
            Some(existing) => Expr::and([existing, check]),
            None => check,
        });
        Ok(options)
    }

    async fn seal_item(&self, mut item: Item) -> Result<Item> {
        for def in self.model.attributes().values().filter(|def| def.encrypted) {
            if let Some(plain) = item.remove(&def.attribute_name) {
                let sealed = self
                    .encryption()?
                    .encrypt(&def.attribute_name, &plain)
                    .await?;
                item.insert(def.attribute_name.clone(), sealed);
            }
        }
        Ok(item)
    }

    /// Pre-seals the values of encrypted `set`/`set_if_not_exists` operations.
    async fn seal_update_values(&self, ops: &[UpdateOp]) -> Result<HashMap<usize, AttributeValue>> {
        let mut sealed = HashMap::new();
        for (position, op) in ops.iter().enumerate() {
            let Some(def) = self.model.attribute(op.field()) else {
                continue;
            };
            if !def.encrypted {
                continue;
            }
            if let Some(value) = op.sealable_value() {
                let wire = marshal::encode_value(def, value)?;
                let envelope = self
                    .encryption()?
                    .encrypt(&def.attribute_name, &wire)
                    .await?;
                sealed.insert(position, envelope);
            }
        }
        Ok(sealed)
    }

    async fn render_update_parts(
        &self,
        key: &Key,
        ops: &[UpdateOp],
        options: &WriteOptions,
    ) -> Result<(Item, String, Option<String>, ExpressionAttributes)> {
        let key = marshal::encode_key(&self.model, key)?;
        let ops = self.with_lifecycle_ops(ops)?;
        let options = self.with_version_check(options, false)?;
        // Reject bad requests before any data key is generated.
        validate_update(&self.model, &ops)?;
        options.render(&self.model, &mut Placeholders::new())?;

        let sealed = self.seal_update_values(&ops).await?;
        let mut placeholders = Placeholders::new();
        let update_expression = render_update(&self.model, &ops, &sealed, &mut placeholders)?;
        let condition = options.render(&self.model, &mut placeholders)?;
        Ok((
            key,
            update_expression,
            condition,
            expression_attributes(placeholders),
        ))
    }

    async fn page(
        &self,
        output: ReadOutput,
        index: Option<String>,
        direction: SortDirection,
    ) -> Result<Page<T>> {
        let mut items = Vec::with_capacity(output.items.len());
        for item in &output.items {
            items.push(self.decode_item(item).await?);
        }
        let next_cursor = output
            .last_evaluated_key
            .and_then(|last_key| encode_cursor(&Cursor::new(last_key, index, direction)));
        Ok(Page { items, next_cursor })
    }
}

fn expression_attributes(placeholders: Placeholders) -> ExpressionAttributes {
    let (names, values) = placeholders.into_parts();
    ExpressionAttributes::new(names, values)
}

fn check_unversioned_put(options: &WriteOptions) -> Result<()> {
    if options.expected_version.is_some() {
        return Err(AccessError::validation(
            "expected_version applies only to update, delete and condition check",
        ));
    }
    Ok(())
}

fn check_limit(limit: Option<u32>) -> Result<()> {
    if limit == Some(0) {
        return Err(AccessError::validation("limit must be > 0"));
    }
    Ok(())
}

fn start_key(
    cursor: Option<&str>,
    index: Option<&str>,
    direction: SortDirection,
) -> Result<Option<Item>> {
    let Some(text) = cursor.filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let cursor = decode_cursor(text)?;
    cursor.ensure_matches(index, direction)?;
    Ok(Some(cursor.last_key))
}

fn page_satisfies<T>(policy: &RetryPolicy, verify: Option<Verify<'_, T>>, page: &Page<T>) -> bool {
    match verify {
        Some(verify) => verify(page),
        None => !policy.retry_on_empty || !page.is_empty(),
    }
}

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use dynamap_core::storage::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    DeleteItemInput, GetItemInput, GetItemOutput, PutItemInput, QueryInput, ReadOutput,
    RemoteStore, ScanInput, StoreFailure, StoreResult, TransactWriteItem, TransactWriteItemsInput,
    UpdateItemInput, UpdateItemOutput, WriteRequest,
};
use dynamap_core::Item;

/// Remote store operations, used to script and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetItem,
    PutItem,
    DeleteItem,
    UpdateItem,
    Query,
    Scan,
    BatchGetItem,
    BatchWriteItem,
    TransactWriteItems,
}

/// A request received by [`FakeStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetItem(GetItemInput),
    PutItem(PutItemInput),
    DeleteItem(DeleteItemInput),
    UpdateItem(UpdateItemInput),
    Query(QueryInput),
    Scan(ScanInput),
    BatchGetItem(BatchGetItemInput),
    BatchWriteItem(BatchWriteItemInput),
    TransactWriteItems(TransactWriteItemsInput),
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::GetItem(_) => Operation::GetItem,
            Call::PutItem(_) => Operation::PutItem,
            Call::DeleteItem(_) => Operation::DeleteItem,
            Call::UpdateItem(_) => Operation::UpdateItem,
            Call::Query(_) => Operation::Query,
            Call::Scan(_) => Operation::Scan,
            Call::BatchGetItem(_) => Operation::BatchGetItem,
            Call::BatchWriteItem(_) => Operation::BatchWriteItem,
            Call::TransactWriteItems(_) => Operation::TransactWriteItems,
        }
    }
}

/// A scripted response, consumed by the next call of its operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Fail(StoreFailure),
    Get(GetItemOutput),
    Update(UpdateItemOutput),
    Read(ReadOutput),
    BatchGet(BatchGetItemOutput),
    BatchWrite(BatchWriteItemOutput),
}

type ScanHandler = Box<dyn Fn(&ScanInput) -> StoreResult<ReadOutput> + Send + Sync>;

#[derive(Default)]
struct State {
    /// Items by table, then by rendered primary key.
    tables: HashMap<String, BTreeMap<String, Item>>,
    calls: Vec<Call>,
    scripted: HashMap<Operation, VecDeque<Response>>,
    unprocessed_writes: bool,
}

/// In-memory [`RemoteStore`] that records every request.
///
/// Unscripted calls fall back to a simple item map keyed by the configured
/// key attributes: puts, deletes, gets, batch calls and transactions apply
/// to it, scans return everything in key order, and queries return an
/// empty page. Expressions are recorded but never evaluated.
pub struct FakeStore {
    key_attributes: Vec<String>,
    scan_handler: Option<ScanHandler>,
    state: Mutex<State>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    /// A store whose items are keyed by `PK` and `SK`.
    pub fn new() -> Self {
        Self::with_key_attributes(["PK", "SK"])
    }

    pub fn with_key_attributes<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_attributes: attributes.into_iter().map(Into::into).collect(),
            scan_handler: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Queues a response for the next unanswered call of `operation`.
    pub fn script(mut self, operation: Operation, response: Response) -> Self {
        self.state
            .get_mut()
            .scripted
            .entry(operation)
            .or_default()
            .push_back(response);
        self
    }

    pub fn fail_next(self, operation: Operation, failure: StoreFailure) -> Self {
        self.script(operation, Response::Fail(failure))
    }

    /// Answers every unscripted scan through `handler`.
    pub fn on_scan(
        mut self,
        handler: impl Fn(&ScanInput) -> StoreResult<ReadOutput> + Send + Sync + 'static,
    ) -> Self {
        self.scan_handler = Some(Box::new(handler));
        self
    }

    /// Reports every batch write request as unprocessed.
    pub fn always_unprocessed_writes(mut self) -> Self {
        self.state.get_mut().unprocessed_writes = true;
        self
    }

    /// Seeds an item directly, without recording a call.
    pub async fn insert(&self, table_name: &str, item: Item) {
        let key = self.render_key(&item);
        self.state
            .lock()
            .await
            .tables
            .entry(table_name.to_string())
            .or_default()
            .insert(key, item);
    }

    pub async fn item(&self, table_name: &str, key: &Item) -> Option<Item> {
        let key = self.render_key(key);
        self.state
            .lock()
            .await
            .tables
            .get(table_name)
            .and_then(|items| items.get(&key))
            .cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    fn render_key(&self, item: &Item) -> String {
        self.key_attributes
            .iter()
            .map(|attribute| format!("{attribute}={:?}", item.get(attribute)))
            .collect::<Vec<_>>()
            .join("|")
    }

    fn next_response(state: &mut State, operation: Operation) -> Option<Response> {
        state.scripted.get_mut(&operation)?.pop_front()
    }
}

fn misscripted(operation: Operation, response: &Response) -> StoreFailure {
    StoreFailure::new(
        "FakeStoreMisscripted",
        format!("{operation:?} cannot answer with {response:?}"),
    )
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::GetItem(input.clone()));
        match Self::next_response(&mut state, Operation::GetItem) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(Response::Get(output)) => Ok(output),
            Some(other) => Err(misscripted(Operation::GetItem, &other)),
            None => {
                let key = self.render_key(&input.key);
                let item = state
                    .tables
                    .get(&input.table_name)
                    .and_then(|items| items.get(&key))
                    .cloned();
                Ok(GetItemOutput { item })
            }
        }
    }

    async fn put_item(&self, input: PutItemInput) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::PutItem(input.clone()));
        match Self::next_response(&mut state, Operation::PutItem) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(other) => Err(misscripted(Operation::PutItem, &other)),
            None => {
                let key = self.render_key(&input.item);
                state
                    .tables
                    .entry(input.table_name)
                    .or_default()
                    .insert(key, input.item);
                Ok(())
            }
        }
    }

    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::DeleteItem(input.clone()));
        match Self::next_response(&mut state, Operation::DeleteItem) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(other) => Err(misscripted(Operation::DeleteItem, &other)),
            None => {
                let key = self.render_key(&input.key);
                if let Some(items) = state.tables.get_mut(&input.table_name) {
                    items.remove(&key);
                }
                Ok(())
            }
        }
    }

    async fn update_item(&self, input: UpdateItemInput) -> StoreResult<UpdateItemOutput> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::UpdateItem(input.clone()));
        match Self::next_response(&mut state, Operation::UpdateItem) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(Response::Update(output)) => Ok(output),
            Some(other) => Err(misscripted(Operation::UpdateItem, &other)),
            None => {
                let key = self.render_key(&input.key);
                let attributes = state
                    .tables
                    .get(&input.table_name)
                    .and_then(|items| items.get(&key))
                    .cloned();
                Ok(UpdateItemOutput { attributes })
            }
        }
    }

    async fn query(&self, input: QueryInput) -> StoreResult<ReadOutput> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Query(input));
        match Self::next_response(&mut state, Operation::Query) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(Response::Read(output)) => Ok(output),
            Some(other) => Err(misscripted(Operation::Query, &other)),
            None => Ok(ReadOutput::default()),
        }
    }

    async fn scan(&self, input: ScanInput) -> StoreResult<ReadOutput> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Scan(input.clone()));
        match Self::next_response(&mut state, Operation::Scan) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(Response::Read(output)) => Ok(output),
            Some(other) => Err(misscripted(Operation::Scan, &other)),
            None => match &self.scan_handler {
                Some(handler) => handler(&input),
                None => Ok(ReadOutput {
                    items: state
                        .tables
                        .get(&input.table_name)
                        .map(|items| items.values().cloned().collect())
                        .unwrap_or_default(),
                    last_evaluated_key: None,
                }),
            },
        }
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> StoreResult<BatchGetItemOutput> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::BatchGetItem(input.clone()));
        match Self::next_response(&mut state, Operation::BatchGetItem) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(Response::BatchGet(output)) => Ok(output),
            Some(other) => Err(misscripted(Operation::BatchGetItem, &other)),
            None => {
                let items = input
                    .keys
                    .iter()
                    .filter_map(|key| {
                        state
                            .tables
                            .get(&input.table_name)
                            .and_then(|items| items.get(&self.render_key(key)))
                            .cloned()
                    })
                    .collect();
                Ok(BatchGetItemOutput {
                    items,
                    unprocessed_keys: Vec::new(),
                })
            }
        }
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> StoreResult<BatchWriteItemOutput> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::BatchWriteItem(input.clone()));
        match Self::next_response(&mut state, Operation::BatchWriteItem) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(Response::BatchWrite(output)) => Ok(output),
            Some(other) => Err(misscripted(Operation::BatchWriteItem, &other)),
            None if state.unprocessed_writes => Ok(BatchWriteItemOutput {
                unprocessed: input.requests,
            }),
            None => {
                let items = state.tables.entry(input.table_name).or_default();
                for request in input.requests {
                    match request {
                        WriteRequest::Put(item) => {
                            items.insert(self.render_key(&item), item);
                        }
                        WriteRequest::Delete(key) => {
                            items.remove(&self.render_key(&key));
                        }
                    }
                }
                Ok(BatchWriteItemOutput::default())
            }
        }
    }

    async fn transact_write_items(&self, input: TransactWriteItemsInput) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::TransactWriteItems(input.clone()));
        match Self::next_response(&mut state, Operation::TransactWriteItems) {
            Some(Response::Fail(failure)) => Err(failure),
            Some(other) => Err(misscripted(Operation::TransactWriteItems, &other)),
            None => {
                for action in input.items {
                    match action {
                        TransactWriteItem::Put {
                            table_name, item, ..
                        } => {
                            let key = self.render_key(&item);
                            state.tables.entry(table_name).or_default().insert(key, item);
                        }
                        TransactWriteItem::Delete {
                            table_name, key, ..
                        } => {
                            if let Some(items) = state.tables.get_mut(&table_name) {
                                items.remove(&self.render_key(&key));
                            }
                        }
                        TransactWriteItem::Update { .. }
                        | TransactWriteItem::ConditionCheck { .. } => {}
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dynamap_core::AttributeValue;

    use super::*;

    fn item(pk: &str, sk: &str) -> Item {
        Item::from([
            ("PK".to_string(), AttributeValue::S(pk.into())),
            ("SK".to_string(), AttributeValue::S(sk.into())),
        ])
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let store = FakeStore::new();
        store
            .put_item(PutItemInput {
                table_name: "t".into(),
                item: item("a", "1"),
                ..PutItemInput::default()
            })
            .await
            .unwrap();

        let output = store
            .get_item(GetItemInput {
                table_name: "t".into(),
                key: item("a", "1"),
                ..GetItemInput::default()
            })
            .await
            .unwrap();
        assert_eq!(output.item, Some(item("a", "1")));
        assert_eq!(store.call_count(Operation::PutItem).await, 1);
        assert_eq!(store.call_count(Operation::GetItem).await, 1);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_consumed_once() {
        let store = FakeStore::new().fail_next(
            Operation::DeleteItem,
            StoreFailure::new("ConditionalCheckFailedException", "nope"),
        );
        let input = DeleteItemInput {
            table_name: "t".into(),
            key: item("a", "1"),
            ..DeleteItemInput::default()
        };
        assert!(store.delete_item(input.clone()).await.is_err());
        assert!(store.delete_item(input).await.is_ok());
    }

    #[tokio::test]
    async fn test_unprocessed_writes_are_returned() {
        let store = FakeStore::new().always_unprocessed_writes();
        let output = store
            .batch_write_item(BatchWriteItemInput {
                table_name: "t".into(),
                requests: vec![WriteRequest::Put(item("a", "1"))],
            })
            .await
            .unwrap();
        assert_eq!(output.unprocessed.len(), 1);
        assert_eq!(store.item("t", &item("a", "1")).await, None);
    }
}

//! DynamoDBアイテムストア
//!
//! テーブルに対する独立した操作群を提供する。
//! - 単一キーでのget / query / scan / 全件scan
//! - 2テーブルにまたがるbatch get
//! - put / update / 全件削除
//! - テーブルの作成・削除（べき等、完了までポーリングで待機）
//!
//! テーブルの作成・削除は「既に望む状態だった」場合を`TableTransition::AlreadyInState`で返し、
//! それ以外の失敗はすべてエラーとして呼び出し元に返す。

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_table::DeleteTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, DeleteRequest, KeySchemaElement, KeyType,
    KeysAndAttributes, ReturnValue, ScalarAttributeType, SseSpecification, SseType, Tag,
    TableStatus, WriteRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

/// DynamoDBアイテム
pub type Item = HashMap<String, AttributeValue>;

/// BatchWriteItemの1リクエストあたりの上限件数
const BATCH_WRITE_LIMIT: usize = 25;

/// 未処理の書き込みを再送する最大回数
const BATCH_WRITE_MAX_ROUNDS: u32 = 10;

/// 未処理の書き込みを再送する前の待機時間（回数に比例して延ばす）
const UNPROCESSED_BACKOFF: Duration = Duration::from_millis(100);

/// テーブル状態のポーリング間隔（秒）
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// テーブル状態のポーリング回数上限
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 10;

/// アイテムストア操作のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemStoreError {
    /// 読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// 書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// テーブル管理操作に失敗
    #[error("Table error: {0}")]
    TableError(String),

    /// リクエストの組み立てに失敗
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 構造体とアイテムの変換に失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// ポーリング上限までに目的の状態にならなかった
    #[error("Table {table} did not reach {desired} after {attempts} attempts")]
    WaitTimeout {
        table: String,
        desired: String,
        attempts: u32,
    },
}

/// テーブル作成・削除の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableTransition {
    /// 操作を実行し、目的の状態になった
    Applied,
    /// 既に目的の状態だったため何もしなかった
    AlreadyInState,
}

/// DescribeTableから見たテーブル状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableState {
    Active,
    /// CREATING / UPDATING / DELETING など
    Pending(String),
    Missing,
}

impl std::fmt::Display for TableState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableState::Active => write!(f, "ACTIVE"),
            TableState::Pending(status) => write!(f, "{}", status),
            TableState::Missing => write!(f, "MISSING"),
        }
    }
}

/// テーブル状態の待機ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// `check`が`true`を返すまで一定間隔で最大`max_attempts`回確認する
///
/// # 戻り値
/// * `Ok(Some(n))` - n回目の確認で条件を満たした
/// * `Ok(None)` - 上限回数まで条件を満たさなかった
/// * `Err(E)` - 確認自体が失敗した
pub async fn poll_until<F, Fut, E>(policy: WaitPolicy, mut check: F) -> Result<Option<u32>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for attempt in 1..=policy.max_attempts {
        if check().await? {
            return Ok(Some(attempt));
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Ok(None)
}

/// 属性の型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

impl From<AttributeType> for ScalarAttributeType {
    fn from(value: AttributeType) -> Self {
        match value {
            AttributeType::String => ScalarAttributeType::S,
            AttributeType::Number => ScalarAttributeType::N,
            AttributeType::Binary => ScalarAttributeType::B,
        }
    }
}

/// キーの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// パーティションキー
    Hash,
    /// ソートキー
    Range,
}

impl From<KeyRole> for KeyType {
    fn from(value: KeyRole) -> Self {
        match value {
            KeyRole::Hash => KeyType::Hash,
            KeyRole::Range => KeyType::Range,
        }
    }
}

/// テーブル作成の定義
///
/// 課金モードはオンデマンド、サーバー側暗号化はKMSで固定。
/// `kms_key_id`が`None`の場合はAWS管理キーを使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub attributes: Vec<(String, AttributeType)>,
    pub key_schema: Vec<(String, KeyRole)>,
    pub kms_key_id: Option<String>,
    pub tags: Vec<(String, String)>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            key_schema: Vec::new(),
            kms_key_id: None,
            tags: Vec::new(),
        }
    }

    /// キー属性を追加（属性定義とキースキーマの両方に登録）
    pub fn key(mut self, name: impl Into<String>, attr_type: AttributeType, role: KeyRole) -> Self {
        let name = name.into();
        self.attributes.push((name.clone(), attr_type));
        self.key_schema.push((name, role));
        self
    }

    pub fn kms_key_id(mut self, kms_key_id: impl Into<String>) -> Self {
        self.kms_key_id = Some(kms_key_id.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    fn attribute_definitions(&self) -> Result<Vec<AttributeDefinition>, ItemStoreError> {
        self.attributes
            .iter()
            .map(|(name, attr_type)| {
                AttributeDefinition::builder()
                    .attribute_name(name)
                    .attribute_type((*attr_type).into())
                    .build()
                    .map_err(|e| ItemStoreError::InvalidRequest(e.to_string()))
            })
            .collect()
    }

    fn key_schema_elements(&self) -> Result<Vec<KeySchemaElement>, ItemStoreError> {
        if !self.key_schema.iter().any(|(_, role)| *role == KeyRole::Hash) {
            return Err(ItemStoreError::InvalidRequest(format!(
                "table {} has no hash key",
                self.name
            )));
        }

        self.key_schema
            .iter()
            .map(|(name, role)| {
                KeySchemaElement::builder()
                    .attribute_name(name)
                    .key_type((*role).into())
                    .build()
                    .map_err(|e| ItemStoreError::InvalidRequest(e.to_string()))
            })
            .collect()
    }

    fn sdk_tags(&self) -> Result<Option<Vec<Tag>>, ItemStoreError> {
        if self.tags.is_empty() {
            return Ok(None);
        }

        self.tags
            .iter()
            .map(|(key, value)| {
                Tag::builder()
                    .key(key)
                    .value(value)
                    .build()
                    .map_err(|e| ItemStoreError::InvalidRequest(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn sse_specification(&self) -> SseSpecification {
        SseSpecification::builder()
            .enabled(true)
            .sse_type(SseType::Kms)
            .set_kms_master_key_id(self.kms_key_id.clone())
            .build()
    }
}

/// 構造体をアイテムに変換
pub fn to_item<T: Serialize>(value: &T) -> Result<Item, ItemStoreError> {
    serde_dynamo::to_item(value).map_err(|e| ItemStoreError::SerializationError(e.to_string()))
}

/// アイテムを構造体に変換
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, ItemStoreError> {
    serde_dynamo::from_item(item).map_err(|e| ItemStoreError::SerializationError(e.to_string()))
}

/// DescribeTableのステータスをテーブル状態に変換
fn table_state_from_status(status: Option<&TableStatus>) -> TableState {
    match status {
        Some(TableStatus::Active) => TableState::Active,
        Some(other) => TableState::Pending(other.as_str().to_string()),
        None => TableState::Pending("UNKNOWN".to_string()),
    }
}

/// DescribeTableの失敗のうちテーブルが存在しないことを示すもの
fn is_missing_on_describe(err: &DescribeTableError) -> bool {
    err.is_resource_not_found_exception()
}

/// CreateTableの失敗のうち既に存在する（作成中を含む）ことを示すもの
fn is_conflict_on_create(err: &CreateTableError) -> bool {
    err.is_resource_in_use_exception()
}

/// DeleteTableの失敗のうち既に存在しないことを示すもの
fn is_missing_on_delete(err: &DeleteTableError) -> bool {
    err.is_resource_not_found_exception()
}

/// 作成・削除リクエスト単体の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminOutcome {
    /// リクエストが受け付けられた（完了は待機で確認する）
    Accepted,
    /// 既に目的の状態だった
    AlreadyInState,
}

/// テーブル管理APIの呼び出し
///
/// べき等性と待機の判断は`ensure_table_created`/`ensure_table_deleted`が持ち、
/// 実装側はAPI呼び出しとエラーの分類のみを行う。
#[async_trait]
trait TableAdmin: Send + Sync {
    async fn describe_state(&self, table: &str) -> Result<TableState, ItemStoreError>;

    async fn request_create(&self, spec: &TableSpec) -> Result<AdminOutcome, ItemStoreError>;

    async fn request_delete(&self, table: &str) -> Result<AdminOutcome, ItemStoreError>;
}

/// テーブルが`desired`状態になるまでポーリング
async fn wait_for_table_state<A>(
    admin: &A,
    table: &str,
    desired: TableState,
    policy: WaitPolicy,
) -> Result<(), ItemStoreError>
where
    A: TableAdmin + ?Sized,
{
    info!(
        table = %table,
        desired = %desired,
        interval_secs = policy.interval.as_secs(),
        max_attempts = policy.max_attempts,
        "テーブル状態の待機開始"
    );

    let target = &desired;
    let reached = poll_until(policy, move || async move {
        let state = admin.describe_state(table).await?;
        debug!(table = %table, state = %state, "テーブル状態確認");
        Ok::<_, ItemStoreError>(state == *target)
    })
    .await?;

    match reached {
        Some(attempt) => {
            info!(table = %table, desired = %desired, attempt = attempt, "テーブルが目的の状態になりました");
            Ok(())
        }
        None => {
            warn!(table = %table, desired = %desired, "テーブル状態の待機タイムアウト");
            Err(ItemStoreError::WaitTimeout {
                table: table.to_string(),
                desired: desired.to_string(),
                attempts: policy.max_attempts,
            })
        }
    }
}

/// テーブルがなければ作成し、ACTIVEになるまで待つ
async fn ensure_table_created<A>(
    admin: &A,
    spec: &TableSpec,
    policy: WaitPolicy,
) -> Result<TableTransition, ItemStoreError>
where
    A: TableAdmin + ?Sized,
{
    if admin.describe_state(&spec.name).await? != TableState::Missing {
        info!(table = %spec.name, "テーブルは既に存在します");
        return Ok(TableTransition::AlreadyInState);
    }

    info!(table = %spec.name, "テーブル作成開始");
    if admin.request_create(spec).await? == AdminOutcome::AlreadyInState {
        // 存在確認と作成の間に他から作成された
        info!(table = %spec.name, "テーブルは並行して作成済みです");
        return Ok(TableTransition::AlreadyInState);
    }

    wait_for_table_state(admin, &spec.name, TableState::Active, policy).await?;
    Ok(TableTransition::Applied)
}

/// テーブルがあれば削除し、消えるまで待つ
async fn ensure_table_deleted<A>(
    admin: &A,
    table: &str,
    policy: WaitPolicy,
) -> Result<TableTransition, ItemStoreError>
where
    A: TableAdmin + ?Sized,
{
    if admin.describe_state(table).await? == TableState::Missing {
        info!(table = %table, "テーブルは存在しません");
        return Ok(TableTransition::AlreadyInState);
    }

    info!(table = %table, "テーブル削除開始");
    if admin.request_delete(table).await? == AdminOutcome::AlreadyInState {
        return Ok(TableTransition::AlreadyInState);
    }

    wait_for_table_state(admin, table, TableState::Missing, policy).await?;
    Ok(TableTransition::Applied)
}

/// 全件削除用のDeleteRequestを作り、BatchWriteItemの上限件数ごとに分ける
///
/// 各リクエストのキーはテーブルのキー属性のみを含む。
fn delete_request_batches(
    items: &[Item],
    key_names: &[String],
) -> Result<Vec<Vec<WriteRequest>>, ItemStoreError> {
    items
        .chunks(BATCH_WRITE_LIMIT)
        .map(|chunk| {
            chunk
                .iter()
                .map(|item| {
                    let key: Item = key_names
                        .iter()
                        .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
                        .collect();
                    let delete = DeleteRequest::builder()
                        .set_key(Some(key))
                        .build()
                        .map_err(|e| ItemStoreError::InvalidRequest(e.to_string()))?;
                    Ok(WriteRequest::builder().delete_request(delete).build())
                })
                .collect::<Result<Vec<_>, ItemStoreError>>()
        })
        .collect()
}

/// 未処理分がなくなるまでバッチ書き込みを再送する
///
/// `write`は送信したリクエストのうち未処理だったものを返す。
/// `max_rounds`回送っても残る場合はエラー。
///
/// # 戻り値
/// 処理されたリクエスト数
async fn drain_batch_writes<F, Fut>(
    requests: Vec<WriteRequest>,
    max_rounds: u32,
    backoff: Duration,
    mut write: F,
) -> Result<usize, ItemStoreError>
where
    F: FnMut(Vec<WriteRequest>) -> Fut,
    Fut: Future<Output = Result<Vec<WriteRequest>, ItemStoreError>>,
{
    let total = requests.len();
    let mut pending = requests;

    for round in 1..=max_rounds {
        let unprocessed = write(pending).await?;
        if unprocessed.is_empty() {
            return Ok(total);
        }

        debug!(round = round, unprocessed = unprocessed.len(), "未処理の書き込みを再送");
        pending = unprocessed;
        if round < max_rounds {
            tokio::time::sleep(backoff * round).await;
        }
    }

    warn!(unprocessed = pending.len(), rounds = max_rounds, "未処理の書き込みが残りました");
    Err(ItemStoreError::WriteError(format!(
        "{} write requests still unprocessed after {} rounds ({} processed)",
        pending.len(),
        max_rounds,
        total - pending.len()
    )))
}

/// DynamoDBテーブル操作トレイト
///
/// 実際のDynamoDBとテスト用モックを差し替え可能にする。
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// 単一のキー/値でアイテムを1件取得
    async fn get_item(&self, table: &str, key: &str, value: &str)
    -> Result<Option<Item>, ItemStoreError>;

    /// キーの等価条件でクエリ
    async fn query_items(&self, table: &str, key: &str, value: &str)
    -> Result<Vec<Item>, ItemStoreError>;

    /// 等価フィルターと射影式を指定してスキャン
    ///
    /// # 引数
    /// * `projection` - 取得する属性のProjectionExpression（例: `"id, processed"`）
    async fn scan_items(
        &self,
        table: &str,
        key: &str,
        value: &str,
        projection: &str,
    ) -> Result<Vec<Item>, ItemStoreError>;

    /// テーブルの全アイテムをスキャン
    async fn scan_all_items(&self, table: &str) -> Result<Vec<Item>, ItemStoreError>;

    /// 2つのテーブルから1キーずつまとめて取得
    ///
    /// # 戻り値
    /// テーブル名ごとの取得アイテム
    async fn batch_get_items(
        &self,
        table1: &str,
        table2: &str,
        key1: Item,
        key2: Item,
    ) -> Result<HashMap<String, Vec<Item>>, ItemStoreError>;

    /// アイテムを1件書き込み（無条件で上書き）
    async fn put_item(&self, table: &str, item: Item) -> Result<(), ItemStoreError>;

    /// テーブルの全アイテムを削除
    ///
    /// スキャン後にバッチ削除するためアトミックではない。
    ///
    /// # 戻り値
    /// 削除した件数
    async fn delete_all_items(&self, table: &str) -> Result<usize, ItemStoreError>;

    /// テーブルを作成し、ACTIVEになるまで待機する
    async fn create_table(&self, spec: &TableSpec) -> Result<TableTransition, ItemStoreError>;

    /// テーブルを削除し、消えるまで待機する
    async fn delete_table(&self, table: &str) -> Result<TableTransition, ItemStoreError>;

    /// 更新式でアイテムの属性を更新
    ///
    /// # 戻り値
    /// 更新後のアイテムの全属性
    async fn update_item(
        &self,
        table: &str,
        key: Item,
        names: HashMap<String, String>,
        values: Item,
        update_expression: &str,
    ) -> Result<Item, ItemStoreError>;

    /// シリアライズ可能な値をアイテムとして書き込む
    async fn put_record<T: Serialize + Send + Sync>(
        &self,
        table: &str,
        record: &T,
    ) -> Result<(), ItemStoreError> {
        let item = to_item(record)?;
        self.put_item(table, item).await
    }
}

/// SDKエラーを原因まで含めた文字列にする
fn sdk_message<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}

/// ItemStoreのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoItemStore {
    client: DynamoDbClient,
    wait_policy: WaitPolicy,
}

impl DynamoItemStore {
    pub fn new(client: DynamoDbClient) -> Self {
        Self {
            client,
            wait_policy: WaitPolicy::default(),
        }
    }

    /// 共有のAWS設定からクライアントを作成
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(DynamoDbClient::new(config))
    }

    pub fn with_wait_policy(mut self, wait_policy: WaitPolicy) -> Self {
        self.wait_policy = wait_policy;
        self
    }

    /// テーブル状態を取得
    pub async fn table_state(&self, table: &str) -> Result<TableState, ItemStoreError> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(table_state_from_status(
                output.table().and_then(|t| t.table_status()),
            )),
            Err(err) if err.as_service_error().is_some_and(is_missing_on_describe) => {
                Ok(TableState::Missing)
            }
            Err(err) => Err(ItemStoreError::TableError(sdk_message(&err))),
        }
    }

    /// テーブルのキー属性名を取得
    async fn key_attribute_names(&self, table: &str) -> Result<Vec<String>, ItemStoreError> {
        let output = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| ItemStoreError::ReadError(sdk_message(&e)))?;

        let names: Vec<String> = output
            .table()
            .map(|t| {
                t.key_schema()
                    .iter()
                    .map(|k| k.attribute_name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        if names.is_empty() {
            return Err(ItemStoreError::ReadError(format!(
                "no key schema for table {}",
                table
            )));
        }
        Ok(names)
    }

    /// ページングしながらスキャン
    async fn scan_pages(
        &self,
        table: &str,
        filter: Option<(&str, &str)>,
        projection: Option<&str>,
    ) -> Result<Vec<Item>, ItemStoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;
        let mut page = 0u32;

        loop {
            page += 1;
            let mut request = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .set_projection_expression(projection.map(str::to_string));

            if let Some((key, value)) = filter {
                request = request
                    .filter_expression("#k = :v")
                    .expression_attribute_names("#k", key)
                    .expression_attribute_values(":v", AttributeValue::S(value.to_string()));
            }

            let output = request
                .send()
                .await
                .map_err(|e| ItemStoreError::ReadError(sdk_message(&e)))?;

            let page_items = output.items.unwrap_or_default();
            debug!(table = %table, page = page, count = page_items.len(), "スキャンページ取得");
            items.extend(page_items);

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl TableAdmin for DynamoItemStore {
    async fn describe_state(&self, table: &str) -> Result<TableState, ItemStoreError> {
        self.table_state(table).await
    }

    async fn request_create(&self, spec: &TableSpec) -> Result<AdminOutcome, ItemStoreError> {
        let result = self
            .client
            .create_table()
            .table_name(&spec.name)
            .set_attribute_definitions(Some(spec.attribute_definitions()?))
            .set_key_schema(Some(spec.key_schema_elements()?))
            .billing_mode(BillingMode::PayPerRequest)
            .sse_specification(spec.sse_specification())
            .set_tags(spec.sdk_tags()?)
            .send()
            .await;

        match result {
            Ok(_) => Ok(AdminOutcome::Accepted),
            Err(err) if err.as_service_error().is_some_and(is_conflict_on_create) => {
                Ok(AdminOutcome::AlreadyInState)
            }
            Err(err) => Err(ItemStoreError::TableError(sdk_message(&err))),
        }
    }

    async fn request_delete(&self, table: &str) -> Result<AdminOutcome, ItemStoreError> {
        match self.client.delete_table().table_name(table).send().await {
            Ok(_) => Ok(AdminOutcome::Accepted),
            Err(err) if err.as_service_error().is_some_and(is_missing_on_delete) => {
                Ok(AdminOutcome::AlreadyInState)
            }
            Err(err) => Err(ItemStoreError::TableError(sdk_message(&err))),
        }
    }
}

#[async_trait]
impl ItemStore for DynamoItemStore {
    async fn get_item(
        &self,
        table: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<Item>, ItemStoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(key, AttributeValue::S(value.to_string()))
            .send()
            .await
            .map_err(|e| ItemStoreError::ReadError(sdk_message(&e)))?;

        Ok(output.item)
    }

    async fn query_items(
        &self,
        table: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<Item>, ItemStoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", key)
                .expression_attribute_values(":v", AttributeValue::S(value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| ItemStoreError::ReadError(sdk_message(&e)))?;

            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn scan_items(
        &self,
        table: &str,
        key: &str,
        value: &str,
        projection: &str,
    ) -> Result<Vec<Item>, ItemStoreError> {
        self.scan_pages(table, Some((key, value)), Some(projection))
            .await
    }

    async fn scan_all_items(&self, table: &str) -> Result<Vec<Item>, ItemStoreError> {
        self.scan_pages(table, None, None).await
    }

    async fn batch_get_items(
        &self,
        table1: &str,
        table2: &str,
        key1: Item,
        key2: Item,
    ) -> Result<HashMap<String, Vec<Item>>, ItemStoreError> {
        // 同じテーブルを2回指定した場合は1つのリクエストにまとめる
        let mut keys_by_table: HashMap<String, Vec<Item>> = HashMap::new();
        keys_by_table.entry(table1.to_string()).or_default().push(key1);
        keys_by_table.entry(table2.to_string()).or_default().push(key2);

        let mut request = self.client.batch_get_item();
        for (table, keys) in keys_by_table {
            let keys_and_attributes = KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .build()
                .map_err(|e| ItemStoreError::InvalidRequest(e.to_string()))?;
            request = request.request_items(table, keys_and_attributes);
        }

        let output = request
            .send()
            .await
            .map_err(|e| ItemStoreError::ReadError(sdk_message(&e)))?;

        Ok(output.responses.unwrap_or_default())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), ItemStoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| ItemStoreError::WriteError(sdk_message(&e)))?;

        Ok(())
    }

    async fn delete_all_items(&self, table: &str) -> Result<usize, ItemStoreError> {
        let key_names = self.key_attribute_names(table).await?;
        let items = self.scan_pages(table, None, None).await?;
        let client = &self.client;
        let mut deleted = 0usize;

        for batch in delete_request_batches(&items, &key_names)? {
            deleted += drain_batch_writes(
                batch,
                BATCH_WRITE_MAX_ROUNDS,
                UNPROCESSED_BACKOFF,
                move |requests| async move {
                    let output = client
                        .batch_write_item()
                        .request_items(table, requests)
                        .send()
                        .await
                        .map_err(|e| ItemStoreError::WriteError(sdk_message(&e)))?;

                    Ok::<_, ItemStoreError>(
                        output
                            .unprocessed_items
                            .and_then(|mut m| m.remove(table))
                            .unwrap_or_default(),
                    )
                },
            )
            .await?;
        }

        info!(table = %table, deleted = deleted, "全アイテム削除完了");
        Ok(deleted)
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<TableTransition, ItemStoreError> {
        ensure_table_created(self, spec, self.wait_policy).await
    }

    async fn delete_table(&self, table: &str) -> Result<TableTransition, ItemStoreError> {
        ensure_table_deleted(self, table, self.wait_policy).await
    }

    async fn update_item(
        &self,
        table: &str,
        key: Item,
        names: HashMap<String, String>,
        values: Item,
        update_expression: &str,
    ) -> Result<Item, ItemStoreError> {
        // 空のマップはDynamoDBに拒否されるため未指定にする
        let names = (!names.is_empty()).then_some(names);
        let values = (!values.is_empty()).then_some(values);

        let output = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(key))
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .update_expression(update_expression)
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| ItemStoreError::WriteError(sdk_message(&e)))?;

        Ok(output.attributes.unwrap_or_default())
    }
}

/// 単一ノード処理ハンドラー
///
/// `data`を検証したうえで処理結果アイテムを作成し、DynamoDBテーブルに1件書き込む。
use serde_json::Value;
use tracing::{info, warn};

use super::handler_error::{into_envelope, HandlerError};
use crate::domain::{ProcessedItem, ResponseEnvelope, Submission};
use crate::infrastructure::{ItemStore, TableConfig};

pub struct SingleNodeHandler<S>
where
    S: ItemStore,
{
    store: S,
    config: TableConfig,
}

impl<S> SingleNodeHandler<S>
where
    S: ItemStore,
{
    pub fn new(store: S, config: TableConfig) -> Self {
        Self { store, config }
    }

    /// イベントを処理し、`Succeeded: <data> (id: <id>)`を返す
    pub async fn handle(&self, event: &Value) -> Result<String, HandlerError> {
        let submission = Submission::from_proxy_event(event)?;
        let item = ProcessedItem::process(&submission);

        self.store
            .put_record(self.config.table_name(), &item)
            .await?;

        info!(
            data = %submission.data,
            id = %item.id,
            table = %self.config.table_name(),
            status_code = 200,
            "処理結果保存成功"
        );

        Ok(format!("Succeeded: {} (id: {})", submission.data, item.id))
    }

    /// イベントを処理してレスポンスエンベロープを返す
    pub async fn respond(&self, event: &Value) -> ResponseEnvelope {
        let result = self.handle(event).await;
        if let Err(err) = &result {
            warn!(error = %err, status_code = 500, "単一ノード処理失敗");
        }
        into_envelope(result)
    }
}

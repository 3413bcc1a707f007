/// キュー投入ハンドラー
///
/// API Gatewayから受け取った`data`を検証し、分散処理用のSQSキューに
/// `{"data": ...}`として1件投入する。
use serde_json::Value;
use tracing::{info, warn};

use super::handler_error::{into_envelope, HandlerError};
use crate::domain::{ResponseEnvelope, Submission};
use crate::infrastructure::{QueueConfig, SqsOps};

pub struct QueueSubmitHandler<Q>
where
    Q: SqsOps,
{
    sqs: Q,
    config: QueueConfig,
}

impl<Q> QueueSubmitHandler<Q>
where
    Q: SqsOps,
{
    pub fn new(sqs: Q, config: QueueConfig) -> Self {
        Self { sqs, config }
    }

    /// イベントを処理して成功メッセージを返す
    ///
    /// # 処理フロー
    /// 1. bodyから`data`を取り出して検証
    /// 2. キューに送信
    /// 3. `Succeeded: <data>`を返す
    pub async fn handle(&self, event: &Value) -> Result<String, HandlerError> {
        let submission = Submission::from_proxy_event(event)?;

        let sent = self
            .sqs
            .send_json(self.config.queue_url(), &submission)
            .await?;

        info!(
            data = %submission.data,
            message_id = %sent.message_id,
            status_code = 200,
            "キュー投入成功"
        );

        Ok(format!("Succeeded: {}", submission.data))
    }

    /// イベントを処理してレスポンスエンベロープを返す
    pub async fn respond(&self, event: &Value) -> ResponseEnvelope {
        let result = self.handle(event).await;
        if let Err(err) = &result {
            warn!(error = %err, status_code = 500, "キュー投入失敗");
        }
        into_envelope(result)
    }
}

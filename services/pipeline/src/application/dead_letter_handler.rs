/// デッドレターハンドラー
///
/// 再試行上限に達してデッドレターキューに移ったメッセージを受け取り、
/// レコードごとにSNSトピックへ通知する。
use aws_lambda_events::event::sqs::SqsEvent;
use tracing::{info, warn};

use super::handler_error::{into_envelope, HandlerError};
use crate::domain::{ResponseEnvelope, Submission, ValidationError};
use crate::infrastructure::{NotificationConfig, SnsOps};

/// 通知本文に含める失敗理由
pub const FAILURE_REASON: &str = "Failed to process after 5 tries";

/// 通知本文を組み立てる
pub fn notification_message(data: &str) -> String {
    format!("Data: {}\nException: {}", data, FAILURE_REASON)
}

pub struct DeadLetterHandler<N>
where
    N: SnsOps,
{
    sns: N,
    config: NotificationConfig,
}

impl<N> DeadLetterHandler<N>
where
    N: SnsOps,
{
    pub fn new(sns: N, config: NotificationConfig) -> Self {
        Self { sns, config }
    }

    /// SQSイベントの全レコードについて通知を発行する
    ///
    /// # 処理フロー
    /// 1. 各レコードのbodyから`data`を取り出して検証（1件でも不正なら何も発行しない）
    /// 2. レコードごとに1回発行
    /// 3. `Succeeded: <data>, <data>...`を返す
    ///
    /// 発行の途中で失敗した場合、それ以前のレコードの通知は取り消されない。
    pub async fn handle(&self, event: &SqsEvent) -> Result<String, HandlerError> {
        if event.records.is_empty() {
            return Err(ValidationError::NoRecords.into());
        }

        let submissions = event
            .records
            .iter()
            .map(|record| {
                let body = record.body.as_deref().ok_or(ValidationError::MissingBody)?;
                Submission::from_body(body)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for submission in &submissions {
            let published = self
                .sns
                .publish(
                    self.config.topic_arn(),
                    &notification_message(&submission.data),
                    Some(self.config.subject()),
                )
                .await?;

            info!(
                data = %submission.data,
                message_id = %published.message_id,
                "デッドレター通知発行"
            );
        }

        let data = submissions
            .iter()
            .map(|s| s.data.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        info!(data = %data, records = submissions.len(), status_code = 200, "デッドレター処理成功");

        Ok(format!("Succeeded: {}", data))
    }

    /// イベントを処理してレスポンスエンベロープを返す
    pub async fn respond(&self, event: &SqsEvent) -> ResponseEnvelope {
        let result = self.handle(event).await;
        if let Err(err) = &result {
            warn!(error = %err, status_code = 500, "デッドレター処理失敗");
        }
        into_envelope(result)
    }
}

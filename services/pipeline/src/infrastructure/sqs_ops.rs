//! SQS操作モジュール
//!
//! 分散処理Lambdaで使用するキュー投入機能を提供する。
//! 1回の呼び出しで1メッセージを送信する（バッチ送信・重複排除なし）。

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// SQS操作のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqsOpsError {
    /// AWS SDK エラー
    #[error("AWS SQS APIエラー: {0}")]
    AwsSdkError(String),
    /// JSON シリアライズエラー
    #[error("JSONシリアライズエラー: {0}")]
    SerializeError(String),
}

/// SendMessageの応答のうち呼び出し元が参照する部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// メッセージID
    pub message_id: String,
    /// 本文のMD5ダイジェスト
    pub md5_of_body: Option<String>,
}

/// SQS操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait SqsOps: Send + Sync {
    /// テキスト本文を1メッセージとしてキューに送信する
    ///
    /// # 引数
    /// * `queue_url` - 送信先キューURL
    /// * `body` - メッセージ本文
    async fn send_message(&self, queue_url: &str, body: &str) -> Result<SendResult, SqsOpsError>;

    /// 値をJSONにシリアライズしてキューに送信する
    async fn send_json<T: Serialize + Send + Sync>(
        &self,
        queue_url: &str,
        value: &T,
    ) -> Result<SendResult, SqsOpsError> {
        let body = serde_json::to_string(value)
            .map_err(|e| SqsOpsError::SerializeError(e.to_string()))?;

        self.send_message(queue_url, &body).await
    }
}

/// 実際のAWS SQS SDKを使用したSQS操作実装
#[derive(Debug, Clone)]
pub struct AwsSqsOps {
    client: SqsClient,
}

impl AwsSqsOps {
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }

    /// 共有のAWS設定からクライアントを作成
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(SqsClient::new(config))
    }
}

#[async_trait]
impl SqsOps for AwsSqsOps {
    async fn send_message(&self, queue_url: &str, body: &str) -> Result<SendResult, SqsOpsError> {
        let response = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|err| {
                warn!(queue_url = %queue_url, error = %err, "SQS SendMessageエラー");
                SqsOpsError::AwsSdkError(err.to_string())
            })?;

        let message_id = response.message_id().unwrap_or("unknown").to_string();
        info!(queue_url = %queue_url, message_id = %message_id, "SQS SendMessage成功");

        Ok(SendResult {
            message_id,
            md5_of_body: response.md5_of_message_body().map(str::to_string),
        })
    }
}

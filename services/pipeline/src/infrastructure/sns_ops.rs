//! SNS操作モジュール
//!
//! デッドレターLambdaで使用する通知機能を提供する。
//! 発行は1回だけ行い、再試行しない。

use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use thiserror::Error;
use tracing::{info, warn};

/// SNS操作のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnsOpsError {
    /// AWS SDK エラー
    #[error("AWS SNS APIエラー: {0}")]
    AwsSdkError(String),
}

/// SNSメッセージ発行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    /// メッセージID
    pub message_id: String,
    /// 発行先トピックARN
    pub topic_arn: String,
}

impl PublishResult {
    pub fn new(topic_arn: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            topic_arn: topic_arn.into(),
        }
    }
}

/// SNS操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait SnsOps: Send + Sync {
    /// メッセージをSNSトピックに発行する
    ///
    /// # 引数
    /// * `topic_arn` - SNSトピックARN
    /// * `message` - 本文
    /// * `subject` - 件名（オプション）
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        subject: Option<&str>,
    ) -> Result<PublishResult, SnsOpsError>;
}

/// 実際のAWS SNS SDKを使用したSNS操作実装
#[derive(Debug, Clone)]
pub struct AwsSnsOps {
    client: SnsClient,
}

impl AwsSnsOps {
    pub fn new(client: SnsClient) -> Self {
        Self { client }
    }

    /// 共有のAWS設定からクライアントを作成
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(SnsClient::new(config))
    }
}

#[async_trait]
impl SnsOps for AwsSnsOps {
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        subject: Option<&str>,
    ) -> Result<PublishResult, SnsOpsError> {
        info!(
            topic_arn = %topic_arn,
            message_length = message.len(),
            "SNSメッセージ発行開始"
        );

        let response = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .set_subject(subject.map(str::to_string))
            .send()
            .await
            .map_err(|err| {
                warn!(topic_arn = %topic_arn, error = %err, "SNS Publishエラー");
                SnsOpsError::AwsSdkError(err.to_string())
            })?;

        let message_id = response.message_id().unwrap_or("unknown").to_string();
        info!(topic_arn = %topic_arn, message_id = %message_id, "SNS Publish成功");

        Ok(PublishResult::new(topic_arn, message_id))
    }
}

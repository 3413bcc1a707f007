// SubmitClient - バッチ投入CLI用HTTPクライアント
//
// API Gatewayのエンドポイントに`{"data": "<line>"}`をPOSTし、
// レスポンスのmessageフィールドを取り出す。再試行は行わない。

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::SubmitConfig;
use crate::domain::MessageBody;

/// APIキーを渡すヘッダー名
pub const API_KEY_HEADER: &str = "x-api-key";

/// 送信エラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// クライアントの構築に失敗
    #[error("HTTPクライアント構築エラー: {0}")]
    ClientBuild(String),

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// レスポンスがmessageを含むJSONではない
    #[error("レスポンス解析エラー: status={status}, body={body}")]
    InvalidResponse {
        /// HTTPステータスコード
        status: u16,
        /// レスポンス本文
        body: String,
    },
}

/// 1行分のデータを送信してメッセージを受け取るトレイト（テスト用の抽象化）
#[async_trait]
pub trait Submitter: Send + Sync {
    /// データを送信し、レスポンスのmessageを返す
    async fn submit(&self, data: &str) -> Result<String, SubmitError>;
}

/// API Gateway経由でLambdaにデータを送信するクライアント
#[derive(Clone)]
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for HttpSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSubmitter")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// 送信ペイロード
#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    data: &'a str,
}

impl HttpSubmitter {
    pub fn new(config: &SubmitConfig) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SubmitError::ClientBuild(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    /// 構築済みのreqwestクライアントを使う
    pub fn with_client(client: Client, config: &SubmitConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint().to_string(),
            api_key: config.api_key().to_string(),
        }
    }
}

/// レスポンス本文からmessageを取り出す
///
/// ステータスコードに関わらず、`{"message": ...}`であれば成功とする。
/// ハンドラーは失敗時も500とmessageを返すため。
pub fn parse_message(status: u16, body: &str) -> Result<String, SubmitError> {
    serde_json::from_str::<MessageBody>(body)
        .map(|b| b.message)
        .map_err(|_| SubmitError::InvalidResponse {
            status,
            body: body.to_string(),
        })
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, data: &str) -> Result<String, SubmitError> {
        debug!(endpoint = %self.endpoint, data = %data, "データ送信");

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&SubmitPayload { data })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, data = %data, "送信リクエスト失敗");
                SubmitError::NetworkError(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SubmitError::NetworkError(e.to_string()))?;

        parse_message(status, &body)
    }
}

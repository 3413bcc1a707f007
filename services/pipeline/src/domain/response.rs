/// API Gatewayプロキシ統合向けのレスポンスエンベロープ
use serde::{Deserialize, Serialize};

/// 固定のレスポンスヘッダー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeaders {
    #[serde(rename = "Content-Type")]
    pub content_type: String,
    #[serde(rename = "Access-Control-Allow-Origin")]
    pub allow_origin: String,
}

impl Default for ResponseHeaders {
    fn default() -> Self {
        Self {
            content_type: "application/json".to_string(),
            allow_origin: "*".to_string(),
        }
    }
}

/// bodyに格納されるメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// ハンドラーの戻り値
///
/// `body`はJSON文字列化された`{"message": "..."}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: ResponseHeaders,
    pub body: String,
}

impl ResponseEnvelope {
    /// 200 OK
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(200, message)
    }

    /// 500 Internal Server Error
    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_status(500, message)
    }

    fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        let body = MessageBody {
            message: message.into(),
        };
        Self {
            status_code,
            headers: ResponseHeaders::default(),
            // 文字列フィールドのみの構造体なのでシリアライズは失敗しない
            body: serde_json::to_string(&body).unwrap_or_default(),
        }
    }

    /// bodyからメッセージを取り出す
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<MessageBody>(&self.body)
            .ok()
            .map(|b| b.message)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

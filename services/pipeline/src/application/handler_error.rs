/// ハンドラー共通のエラー型
///
/// 検証エラーと下流サービス（SQS/SNS/DynamoDB）のエラーの2種類のみ。
/// Lambdaの境界で500のレスポンスエンベロープに変換され、外には出ない。
use thiserror::Error;

use crate::domain::{ResponseEnvelope, ValidationError};
use crate::infrastructure::{ItemStoreError, SnsOpsError, SqsOpsError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// 入力の検証に失敗
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 下流サービスの呼び出しに失敗
    #[error("{0}")]
    Downstream(String),
}

impl From<SqsOpsError> for HandlerError {
    fn from(err: SqsOpsError) -> Self {
        HandlerError::Downstream(err.to_string())
    }
}

impl From<SnsOpsError> for HandlerError {
    fn from(err: SnsOpsError) -> Self {
        HandlerError::Downstream(err.to_string())
    }
}

impl From<ItemStoreError> for HandlerError {
    fn from(err: ItemStoreError) -> Self {
        HandlerError::Downstream(err.to_string())
    }
}

impl HandlerError {
    /// 失敗レスポンス（500、`Failed: <エラー>`）に変換
    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::failure(format!("Failed: {}", self))
    }
}

/// ハンドラーの結果をレスポンスエンベロープに変換する
///
/// 成功時は200と`message`、失敗時は500と`Failed: <エラー>`。
pub fn into_envelope(result: Result<String, HandlerError>) -> ResponseEnvelope {
    match result {
        Ok(message) => ResponseEnvelope::success(message),
        Err(err) => err.to_envelope(),
    }
}

/// 投入データ（Submission Record）とその検証
///
/// API Gatewayやキューから受け取るペイロードは常に`{"data": "<token>"}`の形をしている。
/// `data`は英数字とアンダースコアのみを許可する。
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// `data`フィールドの許可パターン（ASCIIの単語文字のみ）
static DATA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("固定パターンのコンパイルに失敗"));

/// 入力検証のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// イベントにbodyが含まれていない
    #[error("Missing body in event")]
    MissingBody,

    /// bodyがJSONとして解釈できない
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// bodyに文字列のdataフィールドが含まれていない
    #[error("Missing data field in body")]
    MissingData,

    /// dataの構文が不正
    #[error("Invalid data syntax. Only alphanumeric characters and underscores are allowed.")]
    InvalidSyntax,

    /// レコードが1件も含まれていない
    #[error("No records in event")]
    NoRecords,
}

/// 検証済みの投入データ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub data: String,
}

impl Submission {
    /// 値を検証してSubmissionを作成
    pub fn new(data: impl Into<String>) -> Result<Self, ValidationError> {
        let data = data.into();
        if !is_valid_data(&data) {
            return Err(ValidationError::InvalidSyntax);
        }
        Ok(Self { data })
    }

    /// JSON文字列のbodyからSubmissionを取り出して検証
    ///
    /// # 引数
    /// * `body` - `{"data": "..."}`形式のJSON文字列
    pub fn from_body(body: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;

        let data = value
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or(ValidationError::MissingData)?;

        Self::new(data)
    }

    /// API Gatewayプロキシイベントから取り出して検証
    ///
    /// `body`は文字列化されたJSON。
    pub fn from_proxy_event(event: &Value) -> Result<Self, ValidationError> {
        let body = event
            .get("body")
            .and_then(|b| b.as_str())
            .ok_or(ValidationError::MissingBody)?;

        Self::from_body(body)
    }
}

/// `data`が許可パターンに一致するか
pub fn is_valid_data(data: &str) -> bool {
    DATA_PATTERN.is_match(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_data_accepted() {
        for data in ["abc_123", "A", "_", "0", "ABC_def_789"] {
            assert!(is_valid_data(data), "{data} should be valid");
        }
    }

    #[test]
    fn test_invalid_data_rejected() {
        for data in ["", "bad value!", "a-b", "a b", "日本語", "abc\n", "ａｂｃ", "a.b"] {
            assert!(!is_valid_data(data), "{data:?} should be invalid");
        }
    }

    #[test]
    fn test_invalid_syntax_message() {
        assert_eq!(
            ValidationError::InvalidSyntax.to_string(),
            "Invalid data syntax. Only alphanumeric characters and underscores are allowed."
        );
    }

    #[test]
    fn test_from_body_success() {
        let submission = Submission::from_body(r#"{"data": "abc_123"}"#).unwrap();
        assert_eq!(submission.data, "abc_123");
    }

    #[test]
    fn test_from_body_ignores_extra_fields() {
        let submission = Submission::from_body(r#"{"data": "x", "other": 1}"#).unwrap();
        assert_eq!(submission.data, "x");
    }

    #[test]
    fn test_from_body_invalid_syntax() {
        let result = Submission::from_body(r#"{"data": "bad value!"}"#);
        assert_eq!(result, Err(ValidationError::InvalidSyntax));
    }

    #[test]
    fn test_from_body_malformed_json() {
        let result = Submission::from_body("not json");
        assert!(matches!(result, Err(ValidationError::MalformedBody(_))));
    }

    #[test]
    fn test_from_body_non_string_data() {
        assert_eq!(
            Submission::from_body(r#"{"data": 123}"#),
            Err(ValidationError::MissingData)
        );
        assert_eq!(
            Submission::from_body(r#"{"value": "abc"}"#),
            Err(ValidationError::MissingData)
        );
    }

    #[test]
    fn test_from_proxy_event() {
        let event = json!({ "body": "{\"data\": \"abc_123\"}" });
        assert_eq!(
            Submission::from_proxy_event(&event).unwrap().data,
            "abc_123"
        );
    }

    #[test]
    fn test_from_proxy_event_missing_body() {
        assert_eq!(
            Submission::from_proxy_event(&json!({})),
            Err(ValidationError::MissingBody)
        );
        // bodyがオブジェクトの場合も文字列ではないので拒否
        assert_eq!(
            Submission::from_proxy_event(&json!({ "body": { "data": "abc" } })),
            Err(ValidationError::MissingBody)
        );
    }

    #[test]
    fn test_submission_serializes_to_data_object() {
        let submission = Submission::new("abc").unwrap();
        assert_eq!(serde_json::to_string(&submission).unwrap(), r#"{"data":"abc"}"#);
    }
}

/// 単一ノード処理の結果アイテム
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::random_token::random_token;
use super::submission::Submission;

/// IDのランダム接頭辞の長さ
pub const ID_TOKEN_LENGTH: usize = 5;

/// タイムスタンプの書式（例: 2025-01-01:09-30-00+09:00）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d:%H-%M-%S%Z";

/// DynamoDBに保存する処理結果
///
/// `id`をパーティションキーとして一度だけ書き込まれ、以後更新されない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedItem {
    /// `<ランダム5文字>_<エポック秒>`
    pub id: String,
    /// ローカル時刻
    pub timestamp: String,
    /// `<data>_processed`
    pub processed: String,
}

impl ProcessedItem {
    /// 現在時刻とランダムトークンから処理結果を作成
    pub fn process(submission: &Submission) -> Self {
        Self::process_at(submission, &random_token(ID_TOKEN_LENGTH, false), Local::now())
    }

    /// トークンと時刻を指定して処理結果を作成
    pub fn process_at(submission: &Submission, token: &str, now: DateTime<Local>) -> Self {
        let id = format!(
            "{}_{}.{:06}",
            token,
            now.timestamp(),
            now.timestamp_subsec_micros()
        );

        Self {
            id,
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            processed: format!("{}_processed", submission.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn fixed_time() -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000, 123_456_000).unwrap()
    }

    #[test]
    fn test_process_at_builds_fields() {
        let submission = Submission::new("abc_123").unwrap();
        let item = ProcessedItem::process_at(&submission, "Ab3xZ", fixed_time());

        assert_eq!(item.id, "Ab3xZ_1700000000.123456");
        assert_eq!(item.processed, "abc_123_processed");
        assert_eq!(
            item.timestamp,
            fixed_time().format(TIMESTAMP_FORMAT).to_string()
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let submission = Submission::new("x").unwrap();
        let item = ProcessedItem::process_at(&submission, "aaaaa", fixed_time());
        // YYYY-MM-DD:HH-MM-SS の部分は19文字
        assert!(item.timestamp.len() >= 19);
        assert_eq!(&item.timestamp[10..11], ":");
    }

    #[test]
    fn test_process_generates_unique_ids() {
        let submission = Submission::new("same_input").unwrap();
        let ids: HashSet<String> = (0..200)
            .map(|_| ProcessedItem::process(&submission).id)
            .collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_id_prefix_is_token() {
        let submission = Submission::new("x").unwrap();
        let item = ProcessedItem::process(&submission);
        let (token, seconds) = item.id.split_once('_').unwrap();
        assert_eq!(token.len(), ID_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(seconds.parse::<f64>().is_ok());
    }

    #[test]
    fn test_serializes_with_plain_field_names() {
        let submission = Submission::new("x").unwrap();
        let item = ProcessedItem::process_at(&submission, "aaaaa", fixed_time());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["processed"], "x_processed");
        assert_eq!(json["id"], "aaaaa_1700000000.123456");
    }
}

/// 環境変数からの設定読み込み
///
/// 各Lambdaは起動時に自分が使う設定だけを読み込む。
/// - SQSQUEUE: 投入先SQSキューURL（分散処理Lambda）
/// - SNSTOPIC / SNSSUBJECT: 通知先SNSトピックARNと件名（デッドレターLambda）
/// - DBTABLE: 処理結果を保存するDynamoDBテーブル名（単一ノードLambda）
/// - SUBMIT_API_ENDPOINT / SUBMIT_API_KEY: バッチ投入CLIの送信先とAPIキー
use thiserror::Error;

pub const QUEUE_URL_VAR: &str = "SQSQUEUE";
pub const TOPIC_ARN_VAR: &str = "SNSTOPIC";
pub const SUBJECT_VAR: &str = "SNSSUBJECT";
pub const TABLE_NAME_VAR: &str = "DBTABLE";
pub const SUBMIT_ENDPOINT_VAR: &str = "SUBMIT_API_ENDPOINT";
pub const SUBMIT_API_KEY_VAR: &str = "SUBMIT_API_KEY";

/// 設定読み込みのエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// 必須の環境変数を読み込む（空文字列は未設定扱い）
fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// SQS投入設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    queue_url: String,
}

impl QueueConfig {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(required_env(QUEUE_URL_VAR)?))
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

/// SNS通知設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    topic_arn: String,
    subject: String,
}

impl NotificationConfig {
    pub fn new(topic_arn: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            topic_arn: topic_arn.into(),
            subject: subject.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            required_env(TOPIC_ARN_VAR)?,
            required_env(SUBJECT_VAR)?,
        ))
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// DynamoDBテーブル設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    table_name: String,
}

impl TableConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(required_env(TABLE_NAME_VAR)?))
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// バッチ投入先のHTTP API設定
#[derive(Clone, PartialEq, Eq)]
pub struct SubmitConfig {
    endpoint: String,
    api_key: String,
}

// APIキーをログに出さない
impl std::fmt::Debug for SubmitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitConfig")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SubmitConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            required_env(SUBMIT_ENDPOINT_VAR)?,
            required_env(SUBMIT_API_KEY_VAR)?,
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // 注: Rust 2024エディションでset_var/remove_varはunsafe
    unsafe fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    unsafe fn cleanup() {
        unsafe {
            for var in [
                QUEUE_URL_VAR,
                TOPIC_ARN_VAR,
                SUBJECT_VAR,
                TABLE_NAME_VAR,
                SUBMIT_ENDPOINT_VAR,
                SUBMIT_API_KEY_VAR,
            ] {
                remove_env(var);
            }
        }
    }

    #[test]
    fn test_missing_env_var_error_display() {
        let error = ConfigError::MissingEnvVar("SQSQUEUE".to_string());
        assert_eq!(error.to_string(), "Missing environment variable: SQSQUEUE");
    }

    #[test]
    #[serial(pipeline_env)]
    fn test_queue_config_from_env() {
        unsafe {
            cleanup();
        }
        assert_eq!(
            QueueConfig::from_env(),
            Err(ConfigError::MissingEnvVar(QUEUE_URL_VAR.to_string()))
        );

        unsafe {
            set_env(
                QUEUE_URL_VAR,
                "https://sqs.ap-northeast-1.amazonaws.com/123456789012/data-queue",
            );
        }
        let config = QueueConfig::from_env().unwrap();
        assert_eq!(
            config.queue_url(),
            "https://sqs.ap-northeast-1.amazonaws.com/123456789012/data-queue"
        );

        unsafe {
            cleanup();
        }
    }

    #[test]
    #[serial(pipeline_env)]
    fn test_notification_config_requires_both_vars() {
        unsafe {
            cleanup();
            set_env(TOPIC_ARN_VAR, "arn:aws:sns:ap-northeast-1:123456789012:dead");
        }
        assert_eq!(
            NotificationConfig::from_env(),
            Err(ConfigError::MissingEnvVar(SUBJECT_VAR.to_string()))
        );

        unsafe {
            set_env(SUBJECT_VAR, "Dead letter");
        }
        let config = NotificationConfig::from_env().unwrap();
        assert_eq!(
            config.topic_arn(),
            "arn:aws:sns:ap-northeast-1:123456789012:dead"
        );
        assert_eq!(config.subject(), "Dead letter");

        unsafe {
            cleanup();
        }
    }

    #[test]
    #[serial(pipeline_env)]
    fn test_empty_value_is_missing() {
        unsafe {
            cleanup();
            set_env(TABLE_NAME_VAR, "");
        }
        assert_eq!(
            TableConfig::from_env(),
            Err(ConfigError::MissingEnvVar(TABLE_NAME_VAR.to_string()))
        );

        unsafe {
            set_env(TABLE_NAME_VAR, "processed-items");
        }
        assert_eq!(
            TableConfig::from_env().unwrap().table_name(),
            "processed-items"
        );

        unsafe {
            cleanup();
        }
    }

    #[test]
    #[serial(pipeline_env)]
    fn test_submit_config_from_env() {
        unsafe {
            cleanup();
            set_env(SUBMIT_ENDPOINT_VAR, "https://api.example.com/prod/data");
        }
        assert_eq!(
            SubmitConfig::from_env(),
            Err(ConfigError::MissingEnvVar(SUBMIT_API_KEY_VAR.to_string()))
        );

        unsafe {
            set_env(SUBMIT_API_KEY_VAR, "secret-key");
        }
        let config = SubmitConfig::from_env().unwrap();
        assert_eq!(config.endpoint(), "https://api.example.com/prod/data");
        assert_eq!(config.api_key(), "secret-key");

        unsafe {
            cleanup();
        }
    }

    #[test]
    fn test_submit_config_debug_hides_api_key() {
        let config = SubmitConfig::new("https://api.example.com", "secret-key");
        let debug = format!("{:?}", config);
        assert!(debug.contains("api.example.com"));
        assert!(!debug.contains("secret-key"));
    }
}

// インフラストラクチャ層モジュール
pub mod config;
pub mod item_store;
pub mod logging;
pub mod sns_ops;
pub mod sqs_ops;
pub mod submit_client;

// 再エクスポート
pub use config::{ConfigError, NotificationConfig, QueueConfig, SubmitConfig, TableConfig};
pub use item_store::{
    from_item, poll_until, to_item, AttributeType, DynamoItemStore, Item, ItemStore,
    ItemStoreError, KeyRole, TableSpec, TableState, TableTransition, WaitPolicy,
};
pub use logging::{init_cli_logging, init_logging};
pub use sns_ops::{AwsSnsOps, PublishResult, SnsOps, SnsOpsError};
pub use sqs_ops::{AwsSqsOps, SendResult, SqsOps, SqsOpsError};
pub use submit_client::{parse_message, HttpSubmitter, SubmitError, Submitter, API_KEY_HEADER};

/// 環境からAWS共通設定を読み込む（認証情報、リージョンなど）
///
/// 各クライアントはこの設定を共有して起動時に一度だけ作成する。
pub async fn load_aws_config() -> aws_config::SdkConfig {
    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
}

/// キュー投入Lambda
///
/// API Gatewayからの`{"data": ...}`を検証し、分散処理用のSQSキューに投入する。
///
/// # 環境変数
/// - SQSQUEUE: 投入先キューURL（必須）
/// - RUST_LOG: ログレベル（デフォルト: info）
use lambda_runtime::{service_fn, Error, LambdaEvent};
use pipeline::application::QueueSubmitHandler;
use pipeline::domain::ResponseEnvelope;
use pipeline::infrastructure::{init_logging, load_aws_config, AwsSqsOps, QueueConfig};
use serde_json::Value;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    // 設定とクライアントはコールドスタート時に一度だけ作成する
    let config = QueueConfig::from_env()?;
    let aws_config = load_aws_config().await;
    let submit_handler = QueueSubmitHandler::new(AwsSqsOps::from_sdk_config(&aws_config), config);

    info!("キュー投入Lambda起動");

    let submit_handler = &submit_handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(submit_handler, event).await
    }))
    .await
}

/// Lambda関数のメインハンドラー
///
/// 失敗は500のエンベロープとして返し、ランタイムにはエラーを返さない。
async fn handler(
    submit_handler: &QueueSubmitHandler<AwsSqsOps>,
    event: LambdaEvent<Value>,
) -> Result<ResponseEnvelope, Error> {
    Ok(submit_handler.respond(&event.payload).await)
}

/// デッドレター通知Lambda
///
/// デッドレターキューのメッセージごとにSNSトピックへ通知を発行する。
///
/// # 環境変数
/// - SNSTOPIC: 通知先トピックARN（必須）
/// - SNSSUBJECT: 通知の件名（必須）
/// - RUST_LOG: ログレベル（デフォルト: info）
use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use pipeline::application::DeadLetterHandler;
use pipeline::domain::ResponseEnvelope;
use pipeline::infrastructure::{init_logging, load_aws_config, AwsSnsOps, NotificationConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let config = NotificationConfig::from_env()?;
    let aws_config = load_aws_config().await;
    let dead_letter_handler =
        DeadLetterHandler::new(AwsSnsOps::from_sdk_config(&aws_config), config);

    info!("デッドレター通知Lambda起動");

    let dead_letter_handler = &dead_letter_handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| async move {
        handler(dead_letter_handler, event).await
    }))
    .await
}

async fn handler(
    dead_letter_handler: &DeadLetterHandler<AwsSnsOps>,
    event: LambdaEvent<SqsEvent>,
) -> Result<ResponseEnvelope, Error> {
    Ok(dead_letter_handler.respond(&event.payload).await)
}

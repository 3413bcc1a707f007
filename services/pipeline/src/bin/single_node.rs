/// 単一ノード処理Lambda
///
/// `data`を処理して結果アイテムをDynamoDBテーブルに保存する。
///
/// # 環境変数
/// - DBTABLE: 保存先テーブル名（必須）
/// - RUST_LOG: ログレベル（デフォルト: info）
use lambda_runtime::{service_fn, Error, LambdaEvent};
use pipeline::application::SingleNodeHandler;
use pipeline::domain::ResponseEnvelope;
use pipeline::infrastructure::{init_logging, load_aws_config, DynamoItemStore, TableConfig};
use serde_json::Value;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let config = TableConfig::from_env()?;
    let aws_config = load_aws_config().await;
    let node_handler = SingleNodeHandler::new(DynamoItemStore::from_sdk_config(&aws_config), config);

    info!("単一ノード処理Lambda起動");

    let node_handler = &node_handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(node_handler, event).await
    }))
    .await
}

async fn handler(
    node_handler: &SingleNodeHandler<DynamoItemStore>,
    event: LambdaEvent<Value>,
) -> Result<ResponseEnvelope, Error> {
    Ok(node_handler.respond(&event.payload).await)
}

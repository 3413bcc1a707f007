/// 逐次バッチ投入CLI
///
/// ファイルの各行を順番にAPIへ送信し、レスポンスのmessageを
/// ファイル順に標準出力へ1行ずつ書き出す。
///
/// # 環境変数
/// - SUBMIT_API_ENDPOINT: 送信先エンドポイントURL（必須）
/// - SUBMIT_API_KEY: APIキー（必須）
/// - RUST_LOG: ログレベル（デフォルト: warn、標準エラー出力）
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pipeline::application::{read_lines, BatchDriver, BatchReport, FailurePolicy};
use pipeline::infrastructure::{init_cli_logging, HttpSubmitter, SubmitConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "batch_sequential")]
#[command(about = "ファイルの各行をAPIに順番に送信")]
struct CliArgs {
    /// 入力ファイル（1行1データ）
    file: PathBuf,

    /// 送信に失敗しても残りの行を送信し続ける
    #[arg(long)]
    keep_going: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_cli_logging();
    let args = CliArgs::parse();

    match run(args).await {
        Ok(report) if report.failed == 0 => ExitCode::SUCCESS,
        Ok(report) => {
            error!(failed = report.failed, submitted = report.submitted, "一部の行の送信に失敗");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "バッチ投入に失敗");
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<BatchReport, Box<dyn std::error::Error + Send + Sync>> {
    let config = SubmitConfig::from_env()?;
    let submitter = HttpSubmitter::new(&config)?;

    let policy = if args.keep_going {
        FailurePolicy::ContinueOnError
    } else {
        FailurePolicy::FailFast
    };
    let driver = BatchDriver::new(submitter).with_policy(policy);

    let lines = read_lines(&args.file).await?;
    info!(file = %args.file.display(), lines = lines.len(), ?policy, "入力ファイル読み込み完了");

    let report = driver
        .run_sequential(lines, |message| println!("{}", message))
        .await?;

    Ok(report)
}

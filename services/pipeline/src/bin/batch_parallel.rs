/// 並列バッチ投入CLI
///
/// ファイルの各行を`{"data": <行>}`としてAPIに並列送信し、
/// レスポンスのmessageを完了順に標準出力へ1行ずつ書き出す。
///
/// # 環境変数
/// - SUBMIT_API_ENDPOINT: 送信先エンドポイントURL（必須）
/// - SUBMIT_API_KEY: APIキー（必須）
/// - RUST_LOG: ログレベル（デフォルト: warn、標準エラー出力）
///
/// # 実行例
/// ```bash
/// export SUBMIT_API_ENDPOINT=https://xxx.execute-api.ap-northeast-1.amazonaws.com/prod/data
/// export SUBMIT_API_KEY=your-api-key
///
/// # 4並列で送信
/// cargo run --bin batch_parallel -- 4 input.txt
///
/// # 失敗しても残りの行を送信し続ける
/// cargo run --bin batch_parallel -- 4 input.txt --keep-going
/// ```
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::RangedU64ValueParser;
use pipeline::application::{read_lines, BatchDriver, BatchReport, FailurePolicy};
use pipeline::infrastructure::{init_cli_logging, HttpSubmitter, SubmitConfig};
use tokio::sync::Semaphore;
use tracing::{error, info};

/// 指定できる同時送信数の上限
const MAX_CONCURRENCY: u64 = Semaphore::MAX_PERMITS as u64;

#[derive(Parser, Debug)]
#[command(name = "batch_parallel")]
#[command(about = "ファイルの各行をAPIに並列送信")]
struct CliArgs {
    /// 同時送信数（1以上、行数を超える分は無視される）
    #[arg(value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_CONCURRENCY))]
    concurrency: usize,

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
    info!(file = %args.file.display(), lines = lines.len(), concurrency = args.concurrency, ?policy, "入力ファイル読み込み完了");

    let report = driver
        .run_parallel(lines, args.concurrency, |message| println!("{}", message))
        .await?;

    Ok(report)
}

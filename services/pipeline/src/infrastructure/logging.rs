/// ログ基盤モジュール
///
/// Lambda向けのJSON構造化ログと、バッチ投入CLI向けの標準エラー出力ログを提供する。
/// CLIでは標準出力をレスポンスメッセージ専用にするため、ログは標準エラーに出す。
use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// `RUST_LOG`を優先し、未設定なら`default_level`を使う
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Lambda環境向けのログサブスクライバーを初期化する
///
/// JSON形式（CloudWatch Logs向け）で出力する。
/// 複数回呼び出しても最初の呼び出しのみ初期化を実行する。
pub fn init_logging() {
    INIT.call_once(|| {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
            .with_current_span(false);

        let _ = tracing_subscriber::registry()
            .with(env_filter("info"))
            .with(json_layer)
            .try_init();
    });
}

/// バッチ投入CLI向けのログサブスクライバーを初期化する
///
/// 人間が読みやすい形式で標準エラーに出力する。
pub fn init_cli_logging() {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter("warn"))
            .with(fmt_layer)
            .try_init();
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter("debug"))
            .with(fmt_layer)
            .try_init();
    });
}

/// バッチ投入ドライバー
///
/// ファイルの各行を`{"data": <行>}`としてAPIに送信し、レスポンスのmessageを
/// sinkに渡す。並列版はJoinSetとSemaphoreで同時実行数を制限し、
/// 完了した順に結果を受け取る（順序保証なし）。逐次版はファイル順。
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::infrastructure::{SubmitError, Submitter};

/// 送信失敗時の方針
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 最初の失敗で残りのタスクを中断し、そのエラーを返す
    #[default]
    FailFast,
    /// 失敗を記録して残りの行の送信を続ける
    ContinueOnError,
}

/// 実行結果の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// messageを受け取れた行数
    pub submitted: usize,
    /// 送信に失敗した行数（ContinueOnErrorのときのみ非ゼロ）
    pub failed: usize,
}

/// バッチ実行のエラー型
#[derive(Debug, Error)]
pub enum BatchError {
    /// 入力ファイルの読み込みに失敗
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 行の送信に失敗
    #[error("Submission failed for line '{line}': {source}")]
    Submit {
        line: String,
        #[source]
        source: SubmitError,
    },

    /// タスクがパニックした、または中断された
    #[error("Task error: {0}")]
    Task(String),
}

/// 実際に使う同時実行数
///
/// 1以上、Semaphoreの上限以下、かつ行数以下に収める。
pub fn effective_concurrency(requested: usize, lines: usize) -> usize {
    requested.clamp(1, Semaphore::MAX_PERMITS).min(lines.max(1))
}

/// 入力ファイルを行ごとに読み込む
///
/// 末尾の`\n`/`\r\n`は取り除かれる。
pub async fn read_lines(path: &Path) -> Result<Vec<String>, BatchError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BatchError::Io {
            path: path.display().to_string(),
            source,
        })?;

    Ok(content.lines().map(str::to_string).collect())
}

pub struct BatchDriver<S>
where
    S: Submitter + 'static,
{
    submitter: Arc<S>,
    policy: FailurePolicy,
}

impl<S> BatchDriver<S>
where
    S: Submitter + 'static,
{
    pub fn new(submitter: S) -> Self {
        Self {
            submitter: Arc::new(submitter),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// 最大`concurrency`件を同時に送信する
    ///
    /// messageは完了した順にsinkへ渡される。すべてのタスクの終了を待ってから戻る。
    /// FailFastの場合、最初の失敗で残りのタスクを中断する。
    pub async fn run_parallel(
        &self,
        lines: Vec<String>,
        concurrency: usize,
        mut sink: impl FnMut(&str),
    ) -> Result<BatchReport, BatchError> {
        let concurrency = effective_concurrency(concurrency, lines.len());
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        info!(lines = lines.len(), concurrency, "並列送信開始");

        for line in lines {
            let submitter = Arc::clone(&self.submitter);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => submitter.submit(&line).await,
                    Err(e) => Err(SubmitError::NetworkError(e.to_string())),
                };
                (line, result)
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            let settled = match joined {
                Ok((line, result)) => self.settle(&mut report, line, result, &mut sink),
                Err(e) => Err(BatchError::Task(e.to_string())),
            };

            if let Err(err) = settled {
                tasks.shutdown().await;
                return Err(err);
            }
        }

        info!(submitted = report.submitted, failed = report.failed, "並列送信完了");
        Ok(report)
    }

    /// ファイル順に1件ずつ送信する
    pub async fn run_sequential(
        &self,
        lines: Vec<String>,
        mut sink: impl FnMut(&str),
    ) -> Result<BatchReport, BatchError> {
        info!(lines = lines.len(), "逐次送信開始");

        let mut report = BatchReport::default();
        for line in lines {
            let result = self.submitter.submit(&line).await;
            self.settle(&mut report, line, result, &mut sink)?;
        }

        info!(submitted = report.submitted, failed = report.failed, "逐次送信完了");
        Ok(report)
    }

    /// 1行分の結果を集計に反映する
    fn settle(
        &self,
        report: &mut BatchReport,
        line: String,
        result: Result<String, SubmitError>,
        sink: &mut impl FnMut(&str),
    ) -> Result<(), BatchError> {
        match result {
            Ok(message) => {
                debug!(line = %line, message = %message, "送信完了");
                report.submitted += 1;
                sink(&message);
                Ok(())
            }
            Err(source) => match self.policy {
                FailurePolicy::FailFast => Err(BatchError::Submit { line, source }),
                FailurePolicy::ContinueOnError => {
                    warn!(line = %line, error = %source, "送信失敗、続行");
                    report.failed += 1;
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::submit_client::tests::MockSubmitter;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// 同時実行数の最大値を記録する送信クライアント
    #[derive(Debug, Default)]
    struct ConcurrencyTracker {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Submitter for ConcurrencyTracker {
        async fn submit(&self, data: &str) -> Result<String, SubmitError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("Succeeded: {}", data))
        }
    }

    #[tokio::test]
    async fn test_parallel_three_lines_pool_of_two() {
        let driver = BatchDriver::new(MockSubmitter::new());
        let mut messages = Vec::new();

        let report = driver
            .run_parallel(lines(&["a1", "b2", "c3"]), 2, |m| messages.push(m.to_string()))
            .await
            .unwrap();

        assert_eq!(report, BatchReport { submitted: 3, failed: 0 });
        let received: HashSet<_> = messages.into_iter().collect();
        let expected: HashSet<_> = ["Succeeded: a1", "Succeeded: b2", "Succeeded: c3"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_parallel_respects_concurrency_limit() {
        let driver = BatchDriver::new(ConcurrencyTracker::default());
        let input = (0..8).map(|i| format!("line_{}", i)).collect();

        let report = driver.run_parallel(input, 3, |_| {}).await.unwrap();

        assert_eq!(report.submitted, 8);
        let max = driver.submitter.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "max in flight was {}", max);
        assert!(max >= 1);
    }

    #[tokio::test]
    async fn test_parallel_yields_in_completion_order() {
        let submitter = MockSubmitter::new().delay("slow", Duration::from_millis(200));
        let driver = BatchDriver::new(submitter);
        let mut messages = Vec::new();

        driver
            .run_parallel(lines(&["slow", "fast"]), 2, |m| messages.push(m.to_string()))
            .await
            .unwrap();

        assert_eq!(messages, vec!["Succeeded: fast", "Succeeded: slow"]);
    }

    #[tokio::test]
    async fn test_sequential_keeps_file_order() {
        let submitter = MockSubmitter::new().delay("first", Duration::from_millis(50));
        let driver = BatchDriver::new(submitter);
        let mut messages = Vec::new();

        let report = driver
            .run_sequential(lines(&["first", "second", "third"]), |m| {
                messages.push(m.to_string())
            })
            .await
            .unwrap();

        assert_eq!(report.submitted, 3);
        assert_eq!(
            messages,
            vec!["Succeeded: first", "Succeeded: second", "Succeeded: third"]
        );
    }

    #[tokio::test]
    async fn test_sequential_fail_fast_stops_at_first_error() {
        let submitter = MockSubmitter::new().failing_on("broken");
        let driver = BatchDriver::new(submitter.clone());
        let mut messages = Vec::new();

        let result = driver
            .run_sequential(lines(&["ok_1", "broken", "ok_2"]), |m| {
                messages.push(m.to_string())
            })
            .await;

        assert!(matches!(result, Err(BatchError::Submit { ref line, .. }) if line == "broken"));
        assert_eq!(messages, vec!["Succeeded: ok_1"]);
        assert_eq!(submitter.submitted(), lines(&["ok_1", "broken"]));
    }

    #[tokio::test]
    async fn test_parallel_fail_fast_returns_error() {
        // 後続の行は送信完了前に中断されるよう遅延させる
        let submitter = MockSubmitter::new()
            .failing_on("broken")
            .delay("ok_1", Duration::from_millis(200))
            .delay("ok_2", Duration::from_millis(200));
        let driver = BatchDriver::new(submitter.clone());
        let mut messages = Vec::new();

        let result = driver
            .run_parallel(lines(&["broken", "ok_1", "ok_2"]), 1, |m| {
                messages.push(m.to_string())
            })
            .await;

        match result {
            Err(BatchError::Submit { line, source }) => {
                assert_eq!(line, "broken");
                assert!(matches!(source, SubmitError::NetworkError(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(messages.is_empty());
        assert_eq!(submitter.submitted(), lines(&["broken"]));

        // 中断されたタスクが後から送信を記録しないこと
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(submitter.submitted(), lines(&["broken"]));
    }

    #[test]
    fn test_effective_concurrency_bounds() {
        assert_eq!(effective_concurrency(0, 3), 1);
        assert_eq!(effective_concurrency(2, 3), 2);
        assert_eq!(effective_concurrency(10, 3), 3);
        assert_eq!(effective_concurrency(4, 0), 1);
        assert_eq!(effective_concurrency(usize::MAX, usize::MAX), Semaphore::MAX_PERMITS);
    }

    #[tokio::test]
    async fn test_parallel_accepts_huge_concurrency() {
        let driver = BatchDriver::new(MockSubmitter::new());
        let mut messages = Vec::new();

        let report = driver
            .run_parallel(lines(&["a1"]), usize::MAX, |m| messages.push(m.to_string()))
            .await
            .unwrap();

        assert_eq!(report.submitted, 1);
        assert_eq!(messages, vec!["Succeeded: a1"]);
    }

    #[tokio::test]
    async fn test_continue_on_error_counts_failures() {
        let submitter = MockSubmitter::new().failing_on("broken");
        let driver = BatchDriver::new(submitter).with_policy(FailurePolicy::ContinueOnError);
        let mut parallel = Vec::new();
        let mut sequential = Vec::new();

        let input = lines(&["ok_1", "broken", "ok_2"]);
        let parallel_report = driver
            .run_parallel(input.clone(), 2, |m| parallel.push(m.to_string()))
            .await
            .unwrap();
        let sequential_report = driver
            .run_sequential(input, |m| sequential.push(m.to_string()))
            .await
            .unwrap();

        let expected = BatchReport { submitted: 2, failed: 1 };
        assert_eq!(parallel_report, expected);
        assert_eq!(sequential_report, expected);
        assert_eq!(parallel.len(), 2);
        assert_eq!(sequential, vec!["Succeeded: ok_1", "Succeeded: ok_2"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let driver = BatchDriver::new(MockSubmitter::new());

        let report = driver.run_parallel(Vec::new(), 4, |_| {}).await.unwrap();

        assert_eq!(report, BatchReport::default());
    }

    #[tokio::test]
    async fn test_read_lines_strips_line_endings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "abc_123\r\ndef_456\nghi_789\n").unwrap();

        let read = read_lines(file.path()).await.unwrap();

        assert_eq!(read, lines(&["abc_123", "def_456", "ghi_789"]));
    }

    #[tokio::test]
    async fn test_read_lines_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let result = read_lines(&path).await;

        match result {
            Err(err @ BatchError::Io { .. }) => {
                assert!(err.to_string().starts_with("Failed to read "));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_default_policy_is_fail_fast() {
        let driver = BatchDriver::new(MockSubmitter::new());
        assert_eq!(driver.policy(), FailurePolicy::FailFast);
    }
}

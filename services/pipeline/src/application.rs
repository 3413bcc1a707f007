// アプリケーション層モジュール
pub mod batch_driver;
pub mod dead_letter_handler;
pub mod handler_error;
pub mod queue_submit_handler;
pub mod single_node_handler;

// 再エクスポート
pub use batch_driver::{
    effective_concurrency, read_lines, BatchDriver, BatchError, BatchReport, FailurePolicy,
};
pub use dead_letter_handler::{notification_message, DeadLetterHandler};
pub use handler_error::{into_envelope, HandlerError};
pub use queue_submit_handler::QueueSubmitHandler;
pub use single_node_handler::SingleNodeHandler;

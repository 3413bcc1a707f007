// ドメイン層モジュール
pub mod processed_item;
pub mod random_token;
pub mod response;
pub mod submission;

// 再エクスポート
pub use processed_item::ProcessedItem;
pub use random_token::{random_token, Alphabet, TokenGenerator};
pub use response::{MessageBody, ResponseEnvelope, ResponseHeaders};
pub use submission::{is_valid_data, Submission, ValidationError};

mod clipboard;

pub use clipboard::ClipboardOutput;

use crate::domain::error::AppError;

/// 出力先 trait（手動貼り付け用のテキスト受け渡し先）
pub trait OutputTarget: Send + Sync {
    fn deliver(&self, text: &str) -> Result<(), AppError>;
    fn name(&self) -> &str;
}

use std::sync::Arc;

use serde::Serialize;

use crate::domain::document::{DomError, EditableRegion, RegionDriver};
use crate::domain::error::AppError;
use crate::infra::output::{ClipboardOutput, OutputTarget};

/// 検証に使う先頭文字数
pub const VERIFY_PREFIX_CHARS: usize = 30;

/// 置換戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    SelectionInsert,
    ValueAssignment,
    ContentAssignment,
    ClipboardHandoff,
}

/// 置換結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplaceOutcome {
    pub strategy: ReplaceStrategy,
    pub verified: bool,
}

impl ReplaceOutcome {
    /// クリップボード経由で、利用者の貼り付けが必要
    pub fn needs_manual_paste(&self) -> bool {
        self.strategy == ReplaceStrategy::ClipboardHandoff
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplaceError {
    #[error("Replacement text is empty")]
    EmptyText,
    #[error("No replacement strategy succeeded and the clipboard is unavailable: {reason}")]
    TotalFailure { text: String, reason: String },
}

impl From<ReplaceError> for AppError {
    fn from(e: ReplaceError) -> Self {
        match e {
            ReplaceError::EmptyText => AppError::validation(e.to_string()),
            ReplaceError::TotalFailure { .. } => AppError::replacement(e.to_string()),
        }
    }
}

/// 編集領域のテキストを置き換える
pub struct TextReplacer {
    clipboard: Arc<dyn OutputTarget>,
}

impl TextReplacer {
    pub fn new(clipboard: Arc<dyn OutputTarget>) -> Self {
        Self { clipboard }
    }

    /// システムクリップボードへ引き渡す置換器
    pub fn with_system_clipboard() -> Self {
        Self::new(Arc::new(ClipboardOutput::new()))
    }

    pub fn handoff_target(&self) -> &str {
        self.clipboard.name()
    }

    /// 領域の種別ごとの試行順（クリップボードは最後に別扱い）
    pub fn strategies_for(region: &EditableRegion) -> &'static [ReplaceStrategy] {
        match region {
            EditableRegion::ContentEditable(_) => &[
                ReplaceStrategy::SelectionInsert,
                ReplaceStrategy::ContentAssignment,
            ],
            EditableRegion::ValueBearing(_) => &[
                ReplaceStrategy::SelectionInsert,
                ReplaceStrategy::ValueAssignment,
            ],
        }
    }

    pub fn replace<D: RegionDriver + ?Sized>(
        &self,
        doc: &mut D,
        region: EditableRegion,
        new_text: &str,
    ) -> Result<ReplaceOutcome, ReplaceError> {
        if new_text.trim().is_empty() {
            return Err(ReplaceError::EmptyText);
        }

        let before = region.read(&*doc);

        for &strategy in Self::strategies_for(&region) {
            match apply(doc, region, strategy, new_text) {
                Ok(()) => {
                    let actual = region.read(&*doc);
                    if confirms(&before, &actual, new_text) {
                        log::debug!("置換成功: {strategy:?} ({})", region.element());
                        return Ok(ReplaceOutcome {
                            strategy,
                            verified: true,
                        });
                    }
                    log::debug!("置換を検証できません: {strategy:?} ({})", region.element());
                }
                Err(e) => log::debug!("置換失敗: {strategy:?}: {e}"),
            }
        }

        match self.clipboard.deliver(new_text) {
            Ok(()) => {
                log::info!("置換できないため {} に引き渡しました", self.clipboard.name());
                Ok(ReplaceOutcome {
                    strategy: ReplaceStrategy::ClipboardHandoff,
                    verified: false,
                })
            }
            Err(e) => {
                log::warn!("クリップボードへの引き渡しも失敗: {e}");
                Err(ReplaceError::TotalFailure {
                    text: new_text.to_string(),
                    reason: e.message,
                })
            }
        }
    }
}

fn apply<D: RegionDriver + ?Sized>(
    doc: &mut D,
    region: EditableRegion,
    strategy: ReplaceStrategy,
    text: &str,
) -> Result<(), DomError> {
    let id = region.element();
    match strategy {
        ReplaceStrategy::SelectionInsert => {
            doc.focus(id)?;
            doc.select_all(id)?;
            if doc.insert_text(text)? {
                Ok(())
            } else {
                Err(DomError::Rejected("insertText", "command not supported".to_string()))
            }
        }
        ReplaceStrategy::ValueAssignment => doc.set_value(id, text),
        ReplaceStrategy::ContentAssignment => doc.set_text_content(id, text),
        ReplaceStrategy::ClipboardHandoff => Err(DomError::Unsupported(id, "clipboard handoff")),
    }
}

/// 領域のテキストが意図したテキストの先頭部分を含むか。
/// ホストの整形による空白の違いは無視する。
pub fn verify(actual: &str, intended: &str) -> bool {
    let prefix: String = intended.trim().chars().take(VERIFY_PREFIX_CHARS).collect();
    let prefix = collapse_whitespace(&prefix);
    if prefix.is_empty() {
        return false;
    }
    collapse_whitespace(actual).contains(&prefix)
}

/// 書き込みが実際に反映されたか。
/// 書き込み前から先頭部分が一致していた場合は、内容が変化したか、
/// 元から意図したテキストと同一であることを要求する。
fn confirms(before: &str, actual: &str, intended: &str) -> bool {
    if !verify(actual, intended) {
        return false;
    }
    if !verify(before, intended) {
        return true;
    }
    actual != before || collapse_whitespace(actual) == collapse_whitespace(intended)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! ホストページの DOM に対する抽象。
//!
//! コア側はページを所有しない。ホスト（拡張機能のコンテンツスクリプトやテスト用の
//! インメモリ実装）がこの trait を実装し、1 回のユーザー操作の間だけ参照を渡す。

use serde::Serialize;

/// ホスト文書内の要素 ID（ホストが採番する不透明な値）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// DOM 操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Element {0} is detached")]
    Detached(ElementId),
    #[error("Element {0} does not support {1}")]
    Unsupported(ElementId, &'static str),
    #[error("Host rejected {0}: {1}")]
    Rejected(&'static str, String),
}

/// 読み取り専用のホスト文書
pub trait HostDocument {
    /// 文書順の全要素
    fn elements(&self) -> Vec<ElementId>;

    fn parent(&self, id: ElementId) -> Option<ElementId>;

    /// 小文字のタグ名
    fn tag_name(&self, id: ElementId) -> Option<String>;

    fn attribute(&self, id: ElementId, name: &str) -> Option<String>;

    /// 文書に接続されているか
    fn is_connected(&self, id: ElementId) -> bool;

    /// 描画されているか（自身と祖先が非表示でない）
    fn is_rendered(&self, id: ElementId) -> bool;

    /// 入力フォーカスを持つ要素
    fn active_element(&self) -> Option<ElementId>;

    /// テキスト選択のアンカーノードを含む要素
    fn selection_anchor(&self) -> Option<ElementId>;

    /// 要素の現在のテキスト（入力欄は value、編集可能領域は innerText）
    fn text(&self, id: ElementId) -> Option<String>;

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// `ancestor` が `id` 自身またはその祖先か
    fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// 自身から祖先方向に辿り、条件に合う最初の要素を返す（`Element.closest` 相当）
    fn closest(&self, id: ElementId, pred: &dyn Fn(ElementId) -> bool) -> Option<ElementId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// `root` 配下（自身を除く）で条件に合う最初の要素（文書順）
    fn find_descendant(
        &self,
        root: ElementId,
        pred: &dyn Fn(ElementId) -> bool,
    ) -> Option<ElementId> {
        self.elements()
            .into_iter()
            .find(|&id| id != root && self.contains(root, id) && pred(id))
    }
}

/// 書き込み可能なホスト文書（テキスト置換戦略が使う操作）
pub trait RegionDriver: HostDocument {
    fn focus(&mut self, id: ElementId) -> Result<(), DomError>;

    /// 要素の内容を全選択する
    fn select_all(&mut self, id: ElementId) -> Result<(), DomError>;

    /// 現在の選択範囲をテキストで置き換える（`insertText` コマンド相当）。
    /// ホストがコマンドを受け付けなかった場合は `Ok(false)`。
    fn insert_text(&mut self, text: &str) -> Result<bool, DomError>;

    /// 入力欄の value を直接設定する
    fn set_value(&mut self, id: ElementId, text: &str) -> Result<(), DomError>;

    /// 要素の textContent を直接設定する
    fn set_text_content(&mut self, id: ElementId, text: &str) -> Result<(), DomError>;
}

/// 編集可能領域の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ContentEditable,
    ValueBearing,
}

/// 編集可能領域（種別タグ付きの一時参照）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "capability", content = "element", rename_all = "kebab-case")]
pub enum EditableRegion {
    ContentEditable(ElementId),
    ValueBearing(ElementId),
}

impl EditableRegion {
    /// 要素の種別を判定する。自由テキストを受け付けない要素は `None`。
    pub fn classify<D: HostDocument + ?Sized>(doc: &D, id: ElementId) -> Option<Self> {
        if let Some(flag) = doc.attribute(id, "contenteditable") {
            let flag = flag.trim().to_ascii_lowercase();
            if flag.is_empty() || flag == "true" || flag == "plaintext-only" {
                return Some(Self::ContentEditable(id));
            }
        }

        if doc.attribute(id, "disabled").is_some() || doc.attribute(id, "readonly").is_some() {
            return None;
        }

        match doc.tag_name(id)?.as_str() {
            "textarea" => Some(Self::ValueBearing(id)),
            "input" => {
                let kind = doc
                    .attribute(id, "type")
                    .map(|t| t.trim().to_ascii_lowercase())
                    .unwrap_or_default();
                matches!(kind.as_str(), "" | "text" | "search" | "email")
                    .then_some(Self::ValueBearing(id))
            }
            _ => None,
        }
    }

    pub fn element(&self) -> ElementId {
        match self {
            Self::ContentEditable(id) | Self::ValueBearing(id) => *id,
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::ContentEditable(_) => Capability::ContentEditable,
            Self::ValueBearing(_) => Capability::ValueBearing,
        }
    }

    /// 現在のテキスト（要素が外れていれば空文字）
    pub fn read<D: HostDocument + ?Sized>(&self, doc: &D) -> String {
        doc.text(self.element()).unwrap_or_default()
    }
}

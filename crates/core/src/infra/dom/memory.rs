use std::collections::BTreeMap;

use crate::domain::document::{DomError, ElementId, HostDocument, RegionDriver};

/// ウィジェットごとの振る舞い（実ページの癖を再現する）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidgetBehavior {
    /// `insertText` を拒否する（execCommand が false を返す）
    pub rejects_insert_text: bool,
    /// `insertText` を受け付けたように見せて内容を変えない
    pub ignores_insert_text: bool,
    /// value の直接代入を無視する（フレームワーク管理の入力欄）
    pub ignores_value: bool,
    /// textContent の直接代入を無視する
    pub ignores_text_content: bool,
    /// 書き込み後に空白を詰め、末尾に改行を付ける
    pub normalizes_whitespace: bool,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attrs: BTreeMap<String, String>,
    text: String,
    hidden: bool,
    behavior: WidgetBehavior,
}

/// インメモリのホスト文書。ルートは `body`（ID 0）。
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    active: Option<ElementId>,
    selection_anchor: Option<ElementId>,
    selection: Option<ElementId>,
}

impl MemoryDocument {
    pub const ROOT: ElementId = ElementId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".to_string(),
                parent: None,
                children: vec![],
                attrs: BTreeMap::new(),
                text: String::new(),
                hidden: false,
                behavior: WidgetBehavior::default(),
            }],
            active: None,
            selection_anchor: None,
            selection: None,
        }
    }

    /// 子要素を末尾に追加する
    pub fn append(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let id = ElementId(self.nodes.len() as u64);
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            parent: Some(parent),
            children: vec![],
            attrs: BTreeMap::new(),
            text: String::new(),
            hidden: false,
            behavior: WidgetBehavior::default(),
        });
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// 属性付きで子要素を追加する
    pub fn append_with(
        &mut self,
        parent: ElementId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> ElementId {
        let id = self.append(parent, tag);
        for (name, value) in attrs {
            self.set_attribute(id, name, value);
        }
        id
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn set_text(&mut self, id: ElementId, text: &str) {
        if let Some(node) = self.node_mut(id) {
            node.text = text.to_string();
        }
    }

    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) {
        if let Some(node) = self.node_mut(id) {
            node.hidden = hidden;
        }
    }

    pub fn set_behavior(&mut self, id: ElementId, behavior: WidgetBehavior) {
        if let Some(node) = self.node_mut(id) {
            node.behavior = behavior;
        }
    }

    /// 親から切り離す（要素自体は ID で参照可能なまま残る）
    pub fn detach(&mut self, id: ElementId) {
        let parent = self.node(id).and_then(|n| n.parent);
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    pub fn set_active_element(&mut self, id: Option<ElementId>) {
        self.active = id;
    }

    pub fn set_selection_anchor(&mut self, id: Option<ElementId>) {
        self.selection_anchor = id;
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn collect(&self, id: ElementId, out: &mut Vec<ElementId>) {
        out.push(id);
        if let Some(node) = self.node(id) {
            for &child in &node.children {
                self.collect(child, out);
            }
        }
    }

    fn write(&mut self, id: ElementId, text: &str) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.text = if node.behavior.normalizes_whitespace {
            let mut collapsed = text
                .split(' ')
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            collapsed.push('\n');
            collapsed
        } else {
            text.to_string()
        };
        let children = std::mem::take(&mut node.children);
        for child in children {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
        }
    }

    fn ensure_connected(&self, id: ElementId) -> Result<&Node, DomError> {
        if !self.is_connected(id) {
            return Err(DomError::Detached(id));
        }
        self.node(id).ok_or(DomError::Detached(id))
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDocument for MemoryDocument {
    /// 文書順（接続中の要素）の後に、切り離された要素を追加順で並べる
    fn elements(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.collect(Self::ROOT, &mut out);
        for i in 0..self.nodes.len() {
            let id = ElementId(i as u64);
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).and_then(|n| n.parent)
    }

    fn tag_name(&self, id: ElementId) -> Option<String> {
        self.node(id).map(|n| n.tag.clone())
    }

    fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.node(id)
            .and_then(|n| n.attrs.get(&name.to_ascii_lowercase()))
            .cloned()
    }

    fn is_connected(&self, id: ElementId) -> bool {
        self.contains(Self::ROOT, id)
    }

    fn is_rendered(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.node(node_id) {
                Some(node) if !node.hidden && node.attrs.get("hidden").is_none() => {
                    current = node.parent;
                }
                _ => return false,
            }
        }
        true
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active
    }

    fn selection_anchor(&self) -> Option<ElementId> {
        self.selection_anchor
    }

    fn text(&self, id: ElementId) -> Option<String> {
        let node = self.node(id)?;
        let mut text = node.text.clone();
        for &child in &node.children {
            if let Some(child_text) = self.text(child).filter(|t| !t.is_empty()) {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&child_text);
            }
        }
        Some(text)
    }
}

impl RegionDriver for MemoryDocument {
    fn focus(&mut self, id: ElementId) -> Result<(), DomError> {
        self.ensure_connected(id)?;
        self.active = Some(id);
        Ok(())
    }

    fn select_all(&mut self, id: ElementId) -> Result<(), DomError> {
        self.ensure_connected(id)?;
        self.selection = Some(id);
        self.selection_anchor = Some(id);
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<bool, DomError> {
        let target = self
            .selection
            .ok_or_else(|| DomError::Rejected("insertText", "no active selection".to_string()))?;
        let behavior = self.ensure_connected(target)?.behavior;
        if behavior.rejects_insert_text {
            return Ok(false);
        }
        if !behavior.ignores_insert_text {
            self.write(target, text);
        }
        Ok(true)
    }

    fn set_value(&mut self, id: ElementId, text: &str) -> Result<(), DomError> {
        let node = self.ensure_connected(id)?;
        if node.tag != "input" && node.tag != "textarea" {
            return Err(DomError::Unsupported(id, "value"));
        }
        if !node.behavior.ignores_value {
            self.write(id, text);
        }
        Ok(())
    }

    fn set_text_content(&mut self, id: ElementId, text: &str) -> Result<(), DomError> {
        let node = self.ensure_connected(id)?;
        if !node.behavior.ignores_text_content {
            self.write(id, text);
        }
        Ok(())
    }
}

use crate::domain::document::{ElementId, HostDocument};
use super::widgets::WidgetRegistry;

/// トリガーボタンの固定識別子
pub const TRIGGER_KEY: &str = "sr-rewrite-btn-v1";

/// 作成ウィンドウのコンテナとみなす webmail のクラス名
const ROOT_CLASSES: &[&str] = &["nH", "aoI", "ads"];

const TOOLBAR_LABELS: &[&str] = &["Formatting options", "Formatting options toolbar"];

/// 作成ウィンドウに付けるトリガーの配置情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeTrigger {
    pub root: ElementId,
    /// ボタンを差し込む要素（ツールバー、なければルート自身）
    pub anchor: ElementId,
}

/// 作成ウィンドウの探索
pub struct ComposeScanner;

impl ComposeScanner {
    /// ダイアログ・テキストボックス・編集可能要素を囲む作成ウィンドウのルート（文書順、重複なし）
    pub fn find_roots<D: HostDocument + ?Sized>(doc: &D) -> Vec<ElementId> {
        let mut roots = Vec::new();
        for id in doc.elements() {
            if !doc.is_connected(id) || !is_compose_seed(doc, id) {
                continue;
            }
            if let Some(root) = doc.closest(id, &|n| is_compose_root(doc, n)) {
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        roots
    }

    /// ルート内のツールバー。見つからなければルート自身。
    pub fn toolbar_anchor<D: HostDocument + ?Sized>(doc: &D, root: ElementId) -> ElementId {
        let attr_is = |id: ElementId, name: &str, values: &[&str]| {
            doc.attribute(id, name)
                .map(|v| values.contains(&v.as_str()))
                .unwrap_or(false)
        };

        doc.find_descendant(root, &|id| attr_is(id, "aria-label", TOOLBAR_LABELS))
            .or_else(|| doc.find_descendant(root, &|id| attr_is(id, "role", &["toolbar"][..])))
            .or_else(|| {
                doc.find_descendant(root, &|id| {
                    doc.tag_name(id).as_deref() == Some("div")
                        && attr_is(id, "command", &["Formatting options"][..])
                })
            })
            .unwrap_or(root)
    }

    /// ルート内の本文テキストボックス
    pub fn textbox<D: HostDocument + ?Sized>(doc: &D, root: ElementId) -> Option<ElementId> {
        let attr_is = |id: ElementId, name: &str, value: &str| {
            doc.attribute(id, name).as_deref() == Some(value)
        };

        doc.find_descendant(root, &|id| attr_is(id, "role", "textbox"))
            .or_else(|| doc.find_descendant(root, &|id| attr_is(id, "aria-label", "Message Body")))
            .or_else(|| {
                doc.find_descendant(root, &|id| {
                    doc.tag_name(id).as_deref() == Some("div")
                        && attr_is(id, "contenteditable", "true")
                })
            })
    }

    /// 作成ウィンドウごとにトリガーを 1 つだけ用意する。
    /// 切り離されたルートのトリガーは破棄し、新規に作ったトリガーを返す。
    pub fn sync_triggers<D, W>(
        doc: &D,
        registry: &mut WidgetRegistry<ElementId, W>,
        mut create: impl FnMut(ComposeTrigger) -> W,
    ) -> Vec<ComposeTrigger>
    where
        D: HostDocument + ?Sized,
    {
        let removed = registry.retain(|&root| doc.is_connected(root));
        if !removed.is_empty() {
            log::debug!("閉じた作成ウィンドウのトリガーを破棄: {}", removed.len());
        }

        let mut attached = Vec::new();
        for root in Self::find_roots(doc) {
            let trigger = ComposeTrigger {
                root,
                anchor: Self::toolbar_anchor(doc, root),
            };
            let (_, created) = registry.ensure(root, || create(trigger));
            if created {
                log::info!("{TRIGGER_KEY} を作成ウィンドウ {root} に追加");
                attached.push(trigger);
            }
        }
        attached
    }
}

fn is_compose_seed<D: HostDocument + ?Sized>(doc: &D, id: ElementId) -> bool {
    matches!(doc.attribute(id, "role").as_deref(), Some("dialog") | Some("textbox"))
        || doc.attribute(id, "contenteditable").as_deref() == Some("true")
}

fn is_compose_root<D: HostDocument + ?Sized>(doc: &D, id: ElementId) -> bool {
    doc.attribute(id, "role").as_deref() == Some("dialog")
        || ROOT_CLASSES.iter().any(|class| doc.has_class(id, class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::dom::MemoryDocument;
    use crate::usecase::widgets::ChangeFeed;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const ROOT: ElementId = MemoryDocument::ROOT;

    struct Compose {
        dialog: ElementId,
        toolbar: ElementId,
        body: ElementId,
    }

    fn open_compose(doc: &mut MemoryDocument) -> Compose {
        let dialog = doc.append_with(ROOT, "div", &[("role", "dialog")]);
        let _subject = doc.append_with(dialog, "input", &[("name", "subjectbox")]);
        let body = doc.append_with(
            dialog,
            "div",
            &[("contenteditable", "true"), ("role", "textbox"), ("aria-label", "Message Body")],
        );
        let toolbar = doc.append_with(dialog, "div", &[("aria-label", "Formatting options")]);
        Compose { dialog, toolbar, body }
    }

    #[test]
    fn test_find_roots_dedups_and_orders() {
        let mut doc = MemoryDocument::new();
        let first = open_compose(&mut doc);
        let second = open_compose(&mut doc);
        assert_eq!(ComposeScanner::find_roots(&doc), vec![first.dialog, second.dialog]);
    }

    #[test]
    fn test_container_class_is_root() {
        let mut doc = MemoryDocument::new();
        let container = doc.append_with(ROOT, "div", &[("class", "nH aXjCH")]);
        let _body = doc.append_with(container, "div", &[("contenteditable", "true")]);
        assert_eq!(ComposeScanner::find_roots(&doc), vec![container]);
    }

    #[test]
    fn test_orphan_editable_has_no_root() {
        let mut doc = MemoryDocument::new();
        doc.append_with(ROOT, "div", &[("contenteditable", "true")]);
        assert!(ComposeScanner::find_roots(&doc).is_empty());
    }

    #[test]
    fn test_toolbar_anchor_preference() {
        let mut doc = MemoryDocument::new();
        let compose = open_compose(&mut doc);
        assert_eq!(ComposeScanner::toolbar_anchor(&doc, compose.dialog), compose.toolbar);

        let bare = doc.append_with(ROOT, "div", &[("role", "dialog")]);
        let role_toolbar = doc.append_with(bare, "div", &[("role", "toolbar")]);
        assert_eq!(ComposeScanner::toolbar_anchor(&doc, bare), role_toolbar);

        let empty = doc.append_with(ROOT, "div", &[("role", "dialog")]);
        assert_eq!(ComposeScanner::toolbar_anchor(&doc, empty), empty);
    }

    #[test]
    fn test_textbox_lookup() {
        let mut doc = MemoryDocument::new();
        let compose = open_compose(&mut doc);
        assert_eq!(ComposeScanner::textbox(&doc, compose.dialog), Some(compose.body));

        let plain = doc.append_with(ROOT, "div", &[("role", "dialog")]);
        let editable = doc.append_with(plain, "div", &[("contenteditable", "true")]);
        assert_eq!(ComposeScanner::textbox(&doc, plain), Some(editable));
    }

    #[test]
    fn test_sync_triggers_on_change_notifications() {
        let mut doc = MemoryDocument::new();
        let mut registry: WidgetRegistry<ElementId, ComposeTrigger> = WidgetRegistry::new();

        let first = open_compose(&mut doc);
        let attached = ComposeScanner::sync_triggers(&doc, &mut registry, |t| t);
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].anchor, first.toolbar);

        // 変化なしの再走査では追加されない
        assert!(ComposeScanner::sync_triggers(&doc, &mut registry, |t| t).is_empty());

        let second = open_compose(&mut doc);
        doc.detach(first.dialog);
        let attached = ComposeScanner::sync_triggers(&doc, &mut registry, |t| t);
        assert_eq!(attached.iter().map(|t| t.root).collect::<Vec<_>>(), vec![second.dialog]);
        assert!(!registry.contains(&first.dialog));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_scan_driven_by_change_feed() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let registry = Arc::new(Mutex::new(WidgetRegistry::<ElementId, ComposeTrigger>::new()));
        let attached = Arc::new(AtomicUsize::new(0));

        let feed = ChangeFeed::new();
        let subscription = {
            let doc = Arc::clone(&doc);
            let registry = Arc::clone(&registry);
            let attached = Arc::clone(&attached);
            feed.subscribe(move || {
                let doc = doc.lock();
                let mut registry = registry.lock();
                let added = ComposeScanner::sync_triggers(&*doc, &mut *registry, |t| t);
                attached.fetch_add(added.len(), Ordering::SeqCst);
            })
        };

        open_compose(&mut doc.lock());
        feed.notify();
        assert_eq!(attached.load(Ordering::SeqCst), 1);

        drop(subscription);
        open_compose(&mut doc.lock());
        feed.notify();
        assert_eq!(attached.load(Ordering::SeqCst), 1);
        assert_eq!(registry.lock().len(), 1);
    }
}

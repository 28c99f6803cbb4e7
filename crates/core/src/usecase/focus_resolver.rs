use crate::domain::document::{EditableRegion, ElementId, HostDocument};

/// 本文欄を示すラベルのヒント（大文字小文字を区別しない部分一致）
pub const MESSAGE_BODY_HINT: &str = "message";

/// フォーカス中の編集領域を決定するリゾルバ。
///
/// 状態を持たず、ページを変更しない。DOM は常に変化するので操作のたびに呼び直す。
pub struct FocusResolver;

impl FocusResolver {
    /// 文書全体から対象領域を 1 つ選ぶ
    pub fn resolve<D: HostDocument + ?Sized>(doc: &D) -> Option<EditableRegion> {
        Self::resolve_scoped(doc, None)
    }

    /// `scope` 配下の候補だけで同じ優先順位を適用する
    pub fn resolve_within<D: HostDocument + ?Sized>(
        doc: &D,
        scope: ElementId,
    ) -> Option<EditableRegion> {
        Self::resolve_scoped(doc, Some(scope))
    }

    /// 接続済みかつ描画中の編集可能要素（文書順）
    pub fn candidates<D: HostDocument + ?Sized>(
        doc: &D,
        scope: Option<ElementId>,
    ) -> Vec<EditableRegion> {
        doc.elements()
            .into_iter()
            .filter(|&id| doc.is_connected(id) && doc.is_rendered(id))
            .filter(|&id| scope.map_or(true, |s| doc.contains(s, id)))
            .filter_map(|id| EditableRegion::classify(doc, id))
            .collect()
    }

    fn resolve_scoped<D: HostDocument + ?Sized>(
        doc: &D,
        scope: Option<ElementId>,
    ) -> Option<EditableRegion> {
        let candidates = Self::candidates(doc, scope);
        if candidates.is_empty() {
            return None;
        }

        // 自身または最も近い祖先の候補
        let owning_candidate = |start: ElementId| -> Option<EditableRegion> {
            let mut current = Some(start);
            while let Some(id) = current {
                if let Some(region) = candidates.iter().find(|r| r.element() == id) {
                    return Some(*region);
                }
                current = doc.parent(id);
            }
            None
        };

        if let Some(region) = doc.active_element().and_then(|id| owning_candidate(id)) {
            log::debug!("フォーカス要素から解決: {}", region.element());
            return Some(region);
        }

        if let Some(region) = doc.selection_anchor().and_then(|id| owning_candidate(id)) {
            log::debug!("選択アンカーから解決: {}", region.element());
            return Some(region);
        }

        let labelled = candidates.iter().find(|r| {
            doc.attribute(r.element(), "aria-label")
                .map(|label| label.to_lowercase().contains(MESSAGE_BODY_HINT))
                .unwrap_or(false)
        });
        if let Some(region) = labelled {
            log::debug!("ラベルから解決: {}", region.element());
            return Some(*region);
        }

        candidates.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::dom::MemoryDocument;

    const ROOT: ElementId = MemoryDocument::ROOT;

    fn editable(doc: &mut MemoryDocument, parent: ElementId) -> ElementId {
        doc.append_with(parent, "div", &[("contenteditable", "true")])
    }

    #[test]
    fn test_no_candidates() {
        let mut doc = MemoryDocument::new();
        doc.append(ROOT, "div");
        doc.append_with(ROOT, "input", &[("type", "checkbox")]);
        assert_eq!(FocusResolver::resolve(&doc), None);
    }

    #[test]
    fn test_focused_candidate_wins() {
        let mut doc = MemoryDocument::new();
        let _subject = doc.append_with(ROOT, "input", &[("type", "text")]);
        let body = editable(&mut doc, ROOT);
        let labelled = doc.append_with(
            ROOT,
            "div",
            &[("contenteditable", "true"), ("aria-label", "Message Body")],
        );
        let _last = doc.append(ROOT, "textarea");
        doc.set_active_element(Some(body));
        doc.set_selection_anchor(Some(labelled));

        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ContentEditable(body)));
    }

    #[test]
    fn test_focused_descendant_resolves_to_candidate_ancestor() {
        let mut doc = MemoryDocument::new();
        let body = editable(&mut doc, ROOT);
        let paragraph = doc.append(body, "div");
        let _other = editable(&mut doc, ROOT);
        doc.set_active_element(Some(paragraph));

        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ContentEditable(body)));
    }

    #[test]
    fn test_focus_outside_candidates_falls_through_to_selection() {
        let mut doc = MemoryDocument::new();
        let button = doc.append(ROOT, "button");
        let first = editable(&mut doc, ROOT);
        let text_node_holder = doc.append(first, "span");
        let _second = editable(&mut doc, ROOT);
        doc.set_active_element(Some(button));
        doc.set_selection_anchor(Some(text_node_holder));

        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ContentEditable(first)));
    }

    #[test]
    fn test_label_hint_is_case_insensitive() {
        let mut doc = MemoryDocument::new();
        let _subject = doc.append_with(ROOT, "input", &[("aria-label", "Subject")]);
        let body = doc.append_with(
            ROOT,
            "div",
            &[("contenteditable", "true"), ("aria-label", "MESSAGE BODY")],
        );
        let _trailing = doc.append(ROOT, "textarea");

        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ContentEditable(body)));
    }

    #[test]
    fn test_last_candidate_fallback() {
        let mut doc = MemoryDocument::new();
        let _a = editable(&mut doc, ROOT);
        let b = doc.append(ROOT, "textarea");

        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ValueBearing(b)));
    }

    #[test]
    fn test_hidden_and_detached_are_excluded() {
        let mut doc = MemoryDocument::new();
        let visible = editable(&mut doc, ROOT);
        let hidden = editable(&mut doc, ROOT);
        let detached = editable(&mut doc, ROOT);
        doc.set_hidden(hidden, true);
        doc.detach(detached);
        doc.set_active_element(Some(detached));

        let candidates = FocusResolver::candidates(&doc, None);
        assert_eq!(candidates, vec![EditableRegion::ContentEditable(visible)]);
        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ContentEditable(visible)));
    }

    #[test]
    fn test_disabled_and_readonly_inputs_are_excluded() {
        let mut doc = MemoryDocument::new();
        doc.append_with(ROOT, "textarea", &[("readonly", "")]);
        doc.append_with(ROOT, "input", &[("disabled", "")]);
        doc.append_with(ROOT, "div", &[("contenteditable", "false")]);
        assert_eq!(FocusResolver::resolve(&doc), None);
    }

    #[test]
    fn test_resolve_within_scope() {
        let mut doc = MemoryDocument::new();
        let dialog_a = doc.append_with(ROOT, "div", &[("role", "dialog")]);
        let body_a = editable(&mut doc, dialog_a);
        let dialog_b = doc.append_with(ROOT, "div", &[("role", "dialog")]);
        let body_b = editable(&mut doc, dialog_b);
        doc.set_active_element(Some(body_b));

        assert_eq!(
            FocusResolver::resolve_within(&doc, dialog_a),
            Some(EditableRegion::ContentEditable(body_a))
        );
        assert_eq!(FocusResolver::resolve(&doc), Some(EditableRegion::ContentEditable(body_b)));
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let mut doc = MemoryDocument::new();
        let body = editable(&mut doc, ROOT);
        doc.set_text(body, "draft");
        let before = format!("{doc:?}");
        let first = FocusResolver::resolve(&doc);
        let second = FocusResolver::resolve(&doc);
        assert_eq!(first, second);
        assert_eq!(before, format!("{doc:?}"));
    }

    #[test]
    fn test_single_focused_candidate_among_many() {
        for focused_index in 0..5 {
            let mut doc = MemoryDocument::new();
            let ids: Vec<ElementId> = (0..5)
                .map(|i| {
                    if i % 2 == 0 {
                        editable(&mut doc, ROOT)
                    } else {
                        doc.append_with(ROOT, "input", &[("aria-label", "message")])
                    }
                })
                .collect();
            doc.set_active_element(Some(ids[focused_index]));
            let resolved = FocusResolver::resolve(&doc).unwrap();
            assert_eq!(resolved.element(), ids[focused_index]);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn focused_candidate_always_wins(
                kinds in proptest::collection::vec(0u8..3, 1..12),
                focus in any::<prop::sample::Index>(),
                anchor in any::<prop::sample::Index>(),
                label in any::<prop::sample::Index>(),
                focus_child in any::<bool>(),
            ) {
                let mut doc = MemoryDocument::new();
                let ids: Vec<ElementId> = kinds
                    .iter()
                    .map(|kind| match kind {
                        0 => editable(&mut doc, ROOT),
                        1 => doc.append(ROOT, "textarea"),
                        _ => doc.append_with(ROOT, "input", &[("type", "email")]),
                    })
                    .collect();

                let target_index = focus.index(ids.len());
                let target = ids[target_index];
                doc.set_attribute(*label.get(&ids), "aria-label", "Message Body");
                doc.set_selection_anchor(Some(*anchor.get(&ids)));
                let focused = if focus_child && kinds[target_index] == 0 {
                    doc.append(target, "span")
                } else {
                    target
                };
                doc.set_active_element(Some(focused));

                let resolved = FocusResolver::resolve(&doc).map(|r| r.element());
                prop_assert_eq!(resolved, Some(target));
            }
        }
    }
}

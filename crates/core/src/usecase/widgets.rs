//! UI 側の単一リソース（トリガーボタン、モーダル）の管理と、DOM 変更通知の購読。

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// 固定キーで管理するウィジェットのレジストリ。
/// `ensure` は存在確認してから生成するので、同じキーのウィジェットは 1 つだけ。
pub struct WidgetRegistry<K, W> {
    entries: HashMap<K, W>,
}

impl<K: Eq + Hash + Clone, W> WidgetRegistry<K, W> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 存在しなければ生成する。2 番目の値は今回生成したかどうか。
    pub fn ensure(&mut self, key: K, create: impl FnOnce() -> W) -> (&mut W, bool) {
        let mut created = false;
        let widget = self.entries.entry(key).or_insert_with(|| {
            created = true;
            create()
        });
        (widget, created)
    }

    pub fn get(&self, key: &K) -> Option<&W> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<W> {
        self.entries.remove(key)
    }

    /// 条件を満たさないエントリを破棄し、破棄したキーを返す
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) -> Vec<K> {
        let stale: Vec<K> = self.entries.keys().filter(|k| !keep(k)).cloned().collect();
        for key in &stale {
            self.entries.remove(key);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone, W> Default for WidgetRegistry<K, W> {
    fn default() -> Self {
        Self::new()
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct FeedInner {
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<u64, Callback>>,
}

/// ホストから届く DOM 変更通知の配信点
#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

/// 購読ハンドル。破棄すると購読が解除される。
pub struct Subscription {
    id: u64,
    feed: Weak<FeedInner>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.lock().insert(id, Arc::new(callback));
        Subscription {
            id,
            feed: Arc::downgrade(&self.inner),
        }
    }

    /// 変更を通知し、呼び出した購読者数を返す。
    /// コールバック中の購読・解除でデッドロックしないようロック外で呼ぶ。
    pub fn notify(&self) -> usize {
        let callbacks: Vec<Callback> = self.inner.subscribers.lock().values().cloned().collect();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.subscribers.lock().remove(&self.id);
        }
    }
}

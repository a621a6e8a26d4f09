use crate::application::ports::view_store::{PagedUpdater, SingleUpdater, ViewChanged, ViewStore};
use crate::domain::entities::{CachedView, PagedCollection, PostRecord};
use crate::domain::value_objects::ViewKey;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

const DEFAULT_CHANGE_BUFFER: usize = 256;

#[derive(Clone)]
struct ViewEntry {
    view: CachedView,
    version: u64,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    views: HashMap<ViewKey, ViewEntry>,
    next_version: u64,
}

impl StoreState {
    fn replace(&mut self, key: ViewKey, view: CachedView) -> ViewChanged {
        self.next_version += 1;
        let version = self.next_version;
        self.views.insert(
            key.clone(),
            ViewEntry {
                view,
                version,
                updated_at: Utc::now(),
            },
        );
        ViewChanged { key, version }
    }
}

/// メモリ上のビューストア
///
/// 値は常に「旧い値から計算した新しい値で置き換える」形で更新し、置き換えのたびに
/// [`ViewChanged`] を配信する。同じキーへの書き込みは書き込みロックの下で直列化される。
#[derive(Clone)]
pub struct MemoryViewStore {
    state: Arc<RwLock<StoreState>>,
    changes: broadcast::Sender<ViewChanged>,
}

impl MemoryViewStore {
    pub fn new() -> Self {
        Self::with_change_buffer(DEFAULT_CHANGE_BUFFER)
    }

    pub fn with_change_buffer(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            changes,
        }
    }

    fn publish(&self, change: ViewChanged) {
        // 購読者がいなくてもエラーにはしない
        let _ = self.changes.send(change);
    }

    /// 型のないクエリキーと値からビューを投入する
    pub async fn seed_from_json(&self, query_key: &Value, value: &Value) -> Result<ViewKey, AppError> {
        let key = ViewKey::from_query_key(query_key).map_err(AppError::InvalidViewKey)?;

        let view = if key.is_paged() {
            let collection = PagedCollection::from_value_lenient(value);
            if !collection.is_seeded() {
                debug!(key = %key, "Cached value has no usable pages, treating as unseeded");
            }
            CachedView::Paged(collection)
        } else {
            let record = PostRecord::from_value(value).ok_or_else(|| {
                AppError::ValidationError(format!("Cached post for {key} has no _id"))
            })?;
            CachedView::Single(record)
        };

        self.set(key.clone(), view).await;
        Ok(key)
    }

    /// ストア全体を `[{ "key": ..., "value": ... }]` 形式で書き出す
    pub async fn snapshot_json(&self) -> Result<Value, AppError> {
        let state = self.state.read().await;
        let mut entries: Vec<(&ViewKey, &ViewEntry)> = state.views.iter().collect();
        entries.sort_by_key(|(key, _)| key.to_string());

        let mut out = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            out.push(serde_json::json!({
                "key": key.to_query_key(),
                "value": serde_json::to_value(&entry.view)?,
            }));
        }
        Ok(Value::Array(out))
    }

    pub async fn version(&self, key: &ViewKey) -> Option<u64> {
        let state = self.state.read().await;
        state.views.get(key).map(|entry| entry.version)
    }

    pub async fn updated_at(&self, key: &ViewKey) -> Option<DateTime<Utc>> {
        let state = self.state.read().await;
        state.views.get(key).map(|entry| entry.updated_at)
    }

    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.views.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryViewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ViewStore for MemoryViewStore {
    async fn read(&self, key: &ViewKey) -> Option<CachedView> {
        let state = self.state.read().await;
        state.views.get(key).map(|entry| entry.view.clone())
    }

    async fn write_paged(&self, key: &ViewKey, updater: PagedUpdater) {
        let change = {
            let mut state = self.state.write().await;
            let current = match state.views.get(key).map(|entry| &entry.view) {
                Some(CachedView::Paged(collection)) => collection.clone(),
                Some(CachedView::Single(_)) => {
                    warn!(key = %key, "Paged write found a single-post value, reseeding");
                    PagedCollection::empty()
                }
                None => PagedCollection::empty(),
            };
            state.replace(key.clone(), CachedView::Paged(updater(current)))
        };
        self.publish(change);
    }

    async fn update_paged(&self, key: &ViewKey, updater: PagedUpdater) -> bool {
        let change = {
            let mut state = self.state.write().await;
            let Some(CachedView::Paged(collection)) = state.views.get(key).map(|entry| &entry.view)
            else {
                return false;
            };
            let next = updater(collection.clone());
            state.replace(key.clone(), CachedView::Paged(next))
        };
        self.publish(change);
        true
    }

    async fn update_single(&self, key: &ViewKey, updater: SingleUpdater) -> bool {
        let change = {
            let mut state = self.state.write().await;
            let Some(CachedView::Single(record)) = state.views.get(key).map(|entry| &entry.view)
            else {
                return false;
            };
            let next = updater(record.clone());
            state.replace(key.clone(), CachedView::Single(next))
        };
        self.publish(change);
        true
    }

    async fn set(&self, key: ViewKey, view: CachedView) {
        let change = {
            let mut state = self.state.write().await;
            state.replace(key, view)
        };
        self.publish(change);
    }

    async fn remove(&self, key: &ViewKey) -> Option<CachedView> {
        let mut state = self.state.write().await;
        state.views.remove(key).map(|entry| entry.view)
    }

    async fn clear(&self) {
        let mut state = self.state.write().await;
        state.views.clear();
    }

    async fn keys(&self) -> Vec<ViewKey> {
        let state = self.state.read().await;
        state.views.keys().cloned().collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<ViewChanged> {
        self.changes.subscribe()
    }
}

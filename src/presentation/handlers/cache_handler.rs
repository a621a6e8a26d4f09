use crate::{
    application::services::{CacheUpdate, CacheUpdateService},
    domain::{
        entities::{Post, reconcile_order},
        value_objects::{CacheOperation, ChannelId, ViewKey},
    },
    infrastructure::cache::MemoryViewStore,
    presentation::dto::{
        ApiResponse, Validate,
        cache_dto::{ReorderRequest, ReplayReport, ReplayScript, SeedEntry, UpdateCacheRequest},
    },
    shared::error::AppError,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

pub struct CacheHandler {
    store: Arc<MemoryViewStore>,
    cache_service: Arc<CacheUpdateService>,
}

impl CacheHandler {
    pub fn new(store: Arc<MemoryViewStore>) -> Self {
        let cache_service = Arc::new(CacheUpdateService::new(store.clone()));
        Self {
            store,
            cache_service,
        }
    }

    pub fn cache_service(&self) -> Arc<CacheUpdateService> {
        self.cache_service.clone()
    }

    /// 失敗しても呼び出し元には返さない。ログに残してキャッシュはそのまま。
    pub async fn update_cache(&self, request: UpdateCacheRequest) {
        match Self::parse(request) {
            Ok(update) => self.cache_service.update_cache(update).await,
            Err(e) => error!(code = e.code(), "updateCache error: {}", e),
        }
    }

    fn parse(request: UpdateCacheRequest) -> Result<CacheUpdate, AppError> {
        request.validate().map_err(AppError::ValidationError)?;

        let view_key =
            ViewKey::from_query_key(&request.view_key).map_err(AppError::InvalidViewKey)?;
        let operation: CacheOperation = request
            .operation
            .parse()
            .map_err(AppError::InvalidOperation)?;
        let post: Post = serde_json::from_value(request.post)?;

        Ok(CacheUpdate::new(view_key, operation, post)
            .not_adding_to_current_view(request.not_adding_to_current_view.unwrap_or(false)))
    }

    pub async fn seed(&self, entries: &[SeedEntry]) -> Result<Vec<ViewKey>, AppError> {
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            keys.push(self.store.seed_from_json(&entry.key, &entry.value).await?);
        }
        Ok(keys)
    }

    pub fn reorder(request: &ReorderRequest) -> Vec<ChannelId> {
        reconcile_order(&request.items, &request.moved_id, &request.target_id)
            .into_iter()
            .map(|channel| channel.id)
            .collect()
    }

    /// 投入 → 更新 → 並べ替えの順に実行し、最終的なキャッシュを返す
    pub async fn replay(&self, script: ReplayScript) -> Result<ReplayReport, AppError> {
        let seeded = self.seed(&script.seed).await?;
        let updates = script.updates.len();
        for request in script.updates {
            self.update_cache(request).await;
        }
        let reorders = script.reorders.iter().map(Self::reorder).collect();

        info!(seeded = seeded.len(), updates, "Replay finished");
        Ok(ReplayReport {
            views: self.store.snapshot_json().await?,
            reorders,
        })
    }

    pub async fn snapshot(&self) -> ApiResponse<Value> {
        ApiResponse::from_result(self.store.snapshot_json().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::view_store::ViewStore;
    use serde_json::json;

    fn handler() -> (Arc<MemoryViewStore>, CacheHandler) {
        let store = Arc::new(MemoryViewStore::new());
        (store.clone(), CacheHandler::new(store))
    }

    fn request(view_key: Value, operation: &str) -> UpdateCacheRequest {
        UpdateCacheRequest {
            view_key,
            operation: operation.to_string(),
            post: json!({ "_id": 5, "title": "x", "channel": { "_id": "c1" } }),
            not_adding_to_current_view: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_key_is_logged_not_applied() {
        let (store, handler) = handler();
        handler
            .update_cache(request(json!("random"), "create"))
            .await;
        handler
            .update_cache(request(json!(["unknown-collection", "x"]), "create"))
            .await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_operation_is_ignored() {
        let (store, handler) = handler();
        handler
            .update_cache(request(json!("postsByFollowing"), "delete"))
            .await;

        assert!(store.read(&ViewKey::Following).await.is_none());
    }

    #[tokio::test]
    async fn test_create_through_boundary() {
        let (store, handler) = handler();
        handler
            .update_cache(request(json!("postsByFollowing"), "create"))
            .await;

        let view = store.read(&ViewKey::Following).await.unwrap();
        let collection = view.as_paged().unwrap();
        assert_eq!(collection.page_params, vec![0]);
        assert_eq!(collection.pages[0][0].get("title"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn test_replay_reports_views_and_reorders() {
        let (_, handler) = handler();
        let script: ReplayScript = serde_json::from_value(json!({
            "seed": [{
                "key": "postsByFollowing",
                "value": { "pages": [[{ "_id": 1, "title": "a" }]], "pageParams": [0] }
            }],
            "updates": [{
                "viewKey": "postsByFollowing",
                "operation": "update",
                "post": { "_id": 1, "title": "b", "image": null, "imagePublicId": null, "channel": { "_id": "c1" } }
            }],
            "reorders": [{
                "items": [
                    { "_id": "A", "name": "a" },
                    { "_id": "B", "name": "b" },
                    { "_id": "C", "name": "c" },
                    { "_id": "D", "name": "d" }
                ],
                "movedId": "A",
                "targetId": "C"
            }]
        }))
        .unwrap();

        let report = handler.replay(script).await.unwrap();

        assert_eq!(
            report.views,
            json!([{
                "key": "postsByFollowing",
                "value": {
                    "pages": [[{ "_id": 1, "title": "b", "image": null, "imagePublicId": null, "channelId": "c1" }]],
                    "pageParams": [0]
                }
            }])
        );
        assert_eq!(
            report.reorders,
            vec![vec![
                ChannelId::from("B"),
                ChannelId::from("C"),
                ChannelId::from("A"),
                ChannelId::from("D")
            ]]
        );
    }

    #[tokio::test]
    async fn test_seed_rejects_unknown_key() {
        let (_, handler) = handler();
        let result = handler
            .seed(&[SeedEntry {
                key: json!("random"),
                value: json!({}),
            }])
            .await;

        assert!(matches!(result, Err(AppError::InvalidViewKey(_))));
    }

    #[tokio::test]
    async fn test_snapshot_response() {
        let (_, handler) = handler();
        let response = handler.snapshot().await;
        assert!(response.success);
        assert_eq!(response.data, Some(json!([])));
    }
}

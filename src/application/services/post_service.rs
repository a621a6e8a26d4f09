use super::cache_update_service::CacheUpdateService;
use crate::application::ports::api_client::PostApi;
use crate::domain::entities::{Post, PostDraft};
use crate::domain::value_objects::{CacheOperation, PostId};
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// 投稿の作成・更新。API の応答をそのままキャッシュ済みの各ビューへ反映する。
pub struct PostService {
    api: Arc<dyn PostApi>,
    cache: Arc<CacheUpdateService>,
}

impl PostService {
    pub fn new(api: Arc<dyn PostApi>, cache: Arc<CacheUpdateService>) -> Self {
        Self { api, cache }
    }

    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, AppError> {
        draft.validate().map_err(AppError::ValidationError)?;

        let post = self.api.create_post(draft).await?;
        let views = self.cache.propagate(CacheOperation::Create, &post).await;
        info!(post_id = %post.id, views = views.len(), "Post created");
        Ok(post)
    }

    pub async fn update_post(&self, id: &PostId, draft: PostDraft) -> Result<Post, AppError> {
        draft.validate().map_err(AppError::ValidationError)?;

        let post = self.api.update_post(id, draft).await?;
        let views = self.cache.propagate(CacheOperation::Update, &post).await;
        info!(post_id = %post.id, views = views.len(), "Post updated");
        Ok(post)
    }
}

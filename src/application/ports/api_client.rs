use crate::domain::entities::{Channel, Post, PostDraft, PostRecord};
use crate::domain::value_objects::{ChannelId, PostId, ViewKey};
use crate::shared::AppError;
use async_trait::async_trait;

/// 投稿の作成・更新 API
#[async_trait]
pub trait PostApi: Send + Sync {
    async fn create_post(&self, draft: PostDraft) -> Result<Post, AppError>;
    async fn update_post(&self, id: &PostId, draft: PostDraft) -> Result<Post, AppError>;
}

/// チャンネル API
#[async_trait]
pub trait ChannelApi: Send + Sync {
    async fn fetch_channels(&self) -> Result<Vec<Channel>, AppError>;
    /// 並び全体を置き換える（部分更新は無い）
    async fn reorder_channels(&self, ordered_ids: &[ChannelId]) -> Result<(), AppError>;
    async fn delete_channel(&self, id: &ChannelId) -> Result<Channel, AppError>;
}

/// ビューのページ取得 API
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn fetch_page(
        &self,
        key: &ViewKey,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostRecord>, AppError>;
}

use crate::application::ports::view_store::ViewStore;
use crate::domain::entities::{Post, PostRecord};
use crate::domain::value_objects::{CacheOperation, PostId, ViewKey};
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::debug;

/// 書き込み結果を1つのビューへ反映する
///
/// 取得し直しはせず、API が返した投稿からキャッシュ済みページを組み替える。
/// 所有していないフィールドには触れない。
#[derive(Clone)]
pub struct ViewMutationResolver {
    store: Arc<dyn ViewStore>,
}

impl ViewMutationResolver {
    pub fn new(store: Arc<dyn ViewStore>) -> Self {
        Self { store }
    }

    /// ページング一覧への反映。ストアが変わったら `true`。
    pub async fn apply_paged(
        &self,
        key: &ViewKey,
        operation: CacheOperation,
        post: &Post,
    ) -> Result<bool, AppError> {
        match operation {
            CacheOperation::Create => {
                let record = PostRecord::try_from(post)?;
                self.store
                    .write_paged(key, Box::new(move |current| current.with_prepended(record)))
                    .await;
                Ok(true)
            }
            CacheOperation::Update => {
                let id = post.id.clone();
                let patch = post.patch();
                let applied = self
                    .store
                    .update_paged(
                        key,
                        Box::new(move |current| current.with_patched(&id, &patch)),
                    )
                    .await;
                if !applied {
                    debug!(key = %key, post_id = %post.id, "View not loaded, skipping update");
                }
                Ok(applied)
            }
        }
    }

    /// 単一投稿ビューへの反映。作成は意味を持たないので何もしない。
    pub async fn apply_single(
        &self,
        key: &ViewKey,
        operation: CacheOperation,
        post: &Post,
    ) -> bool {
        match operation {
            CacheOperation::Create => {
                debug!(key = %key, "Create has no effect on a single post view");
                false
            }
            CacheOperation::Update => {
                let patch = post.patch();
                self.store
                    .update_single(key, Box::new(move |current| current.merged(&patch)))
                    .await
            }
        }
    }

    /// 全ページから投稿を取り除く
    pub async fn remove_from_paged(&self, key: &ViewKey, id: &PostId) -> bool {
        let id = id.clone();
        self.store
            .update_paged(key, Box::new(move |current| current.without(&id)))
            .await
    }
}

use crate::application::ports::view_store::ViewStore;
use crate::application::shared::ViewMutationResolver;
use crate::domain::entities::Post;
use crate::domain::value_objects::{CacheOperation, ViewKey};
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::{debug, error};

/// 1つのビューへ反映する書き込み結果
#[derive(Debug, Clone, PartialEq)]
pub struct CacheUpdate {
    pub view_key: ViewKey,
    pub operation: CacheOperation,
    pub post: Post,
    /// 投稿のチャンネルがこのビューのチャンネルと一致しない
    pub not_adding_to_current_view: bool,
}

impl CacheUpdate {
    pub fn new(view_key: ViewKey, operation: CacheOperation, post: Post) -> Self {
        Self {
            view_key,
            operation,
            post,
            not_adding_to_current_view: false,
        }
    }

    pub fn not_adding_to_current_view(mut self, flag: bool) -> Self {
        self.not_adding_to_current_view = flag;
        self
    }
}

/// 投稿の作成・更新結果を、投稿を含み得るビューへ振り分ける
///
/// キャッシュ更新の失敗は呼び出し元の書き込みフローを壊さないようにログだけ残す。
/// 次回の取得で自己修復される。
pub struct CacheUpdateService {
    store: Arc<dyn ViewStore>,
    resolver: ViewMutationResolver,
}

impl CacheUpdateService {
    pub fn new(store: Arc<dyn ViewStore>) -> Self {
        let resolver = ViewMutationResolver::new(store.clone());
        Self { store, resolver }
    }

    pub async fn update_cache(&self, update: CacheUpdate) {
        if let Err(e) = self.dispatch(&update).await {
            error!(
                key = %update.view_key,
                operation = %update.operation,
                "updateCache error: {}",
                e
            );
        }
    }

    async fn dispatch(&self, update: &CacheUpdate) -> Result<(), AppError> {
        let CacheUpdate {
            view_key,
            operation,
            post,
            not_adding_to_current_view,
        } = update;

        match view_key {
            ViewKey::Following | ViewKey::ByAuthor(_) => {
                self.resolver.apply_paged(view_key, *operation, post).await?;
            }
            ViewKey::SinglePost(_) => {
                self.resolver.apply_single(view_key, *operation, post).await;
            }
            ViewKey::ByChannel(_) => {
                self.update_channel_view(view_key, *operation, post, *not_adding_to_current_view)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_channel_view(
        &self,
        key: &ViewKey,
        operation: CacheOperation,
        post: &Post,
        not_adding_to_current_view: bool,
    ) -> Result<(), AppError> {
        match (not_adding_to_current_view, operation) {
            // 別チャンネルへの投稿は、そのチャンネルを開いたときに読み込まれる
            (true, CacheOperation::Create) => {
                debug!(key = %key, "Post belongs to another channel, skipping create");
            }
            // チャンネルが変わった投稿は現在の一覧から外す
            (true, CacheOperation::Update) => {
                self.resolver.remove_from_paged(key, &post.id).await;
            }
            (false, _) => {
                self.resolver.apply_paged(key, operation, post).await?;
            }
        }
        Ok(())
    }

    /// 現在ストアにある全てのビューへ書き込み結果を反映する。対象にしたキーを返す。
    pub async fn propagate(&self, operation: CacheOperation, post: &Post) -> Vec<ViewKey> {
        let mut keys = self.store.keys().await;
        keys.sort_by_key(|key| key.to_string());

        let mut targeted = Vec::new();
        for key in keys {
            let Some(update) = Self::plan(&key, operation, post) else {
                continue;
            };
            self.update_cache(update).await;
            targeted.push(key);
        }

        debug!(
            post_id = %post.id,
            operation = %operation,
            views = targeted.len(),
            "Propagated write to cached views"
        );
        targeted
    }

    /// ビューごとの方針: この投稿が現れるべきでないビューは対象にしない
    fn plan(key: &ViewKey, operation: CacheOperation, post: &Post) -> Option<CacheUpdate> {
        let update = CacheUpdate::new(key.clone(), operation, post.clone());
        match key {
            ViewKey::Following => Some(update),
            ViewKey::ByAuthor(author) => match operation {
                CacheOperation::Create => (post.author_id() == Some(author)).then_some(update),
                CacheOperation::Update => Some(update),
            },
            ViewKey::SinglePost(id) => (id == &post.id).then_some(update),
            ViewKey::ByChannel(name) => match (post.channel_name(), operation) {
                (Some(channel), _) => Some(update.not_adding_to_current_view(channel != name)),
                (None, CacheOperation::Create) => None,
                (None, CacheOperation::Update) => Some(update),
            },
        }
    }
}

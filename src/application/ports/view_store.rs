use crate::domain::entities::{CachedView, PagedCollection, PostRecord};
use crate::domain::value_objects::ViewKey;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// 旧い値から新しい値を計算する関数。ストアは戻り値で丸ごと置き換える。
pub type PagedUpdater = Box<dyn FnOnce(PagedCollection) -> PagedCollection + Send>;
pub type SingleUpdater = Box<dyn FnOnce(PostRecord) -> PostRecord + Send>;

/// ビューの値が置き換えられたことの通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewChanged {
    pub key: ViewKey,
    /// キーごとに単調増加する版数
    pub version: u64,
}

/// ページングされたビューを保持するストアのポート
#[async_trait]
pub trait ViewStore: Send + Sync {
    async fn read(&self, key: &ViewKey) -> Option<CachedView>;

    /// 現在の値（無ければ空のシード）に `updater` を適用して保存する
    async fn write_paged(&self, key: &ViewKey, updater: PagedUpdater);

    /// 既に値がある場合だけ `updater` を適用する。適用したら `true`。
    async fn update_paged(&self, key: &ViewKey, updater: PagedUpdater) -> bool;

    /// 単一投稿ビューに値がある場合だけ `updater` を適用する
    async fn update_single(&self, key: &ViewKey, updater: SingleUpdater) -> bool;

    async fn set(&self, key: ViewKey, view: CachedView);

    async fn remove(&self, key: &ViewKey) -> Option<CachedView>;

    async fn clear(&self);

    async fn keys(&self) -> Vec<ViewKey>;

    fn subscribe(&self) -> broadcast::Receiver<ViewChanged>;
}

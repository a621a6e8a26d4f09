//! orca のクライアント側ビューキャッシュ
//!
//! 同じ投稿を含む複数のページング済みキャッシュ（ホーム・プロフィール・チャンネル・
//! 投稿詳細）を、作成・更新の結果から再取得なしで整合させる。チャンネル一覧の
//! 楽観的な並べ替えもここで扱う。

// モジュール定義
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod shared;

pub use application::ports::{ChannelApi, FeedApi, Notifier, PostApi, ViewChanged, ViewStore};
pub use application::services::{
    CacheUpdate, CacheUpdateService, ChannelOrderService, DropEvent, InfiniteScroll,
    PostService, ReorderOutcome, ScrollEvent,
};
pub use domain::entities::{CachedView, Channel, PagedCollection, Post, PostRecord, reconcile_order};
pub use domain::value_objects::{CacheOperation, Identifier, ViewKey};
pub use infrastructure::cache::MemoryViewStore;
pub use presentation::handlers::CacheHandler;
pub use shared::{AppConfig, AppError, Result};

/// 環境変数の設定でログを初期化する
pub fn init_logging() {
    let config = AppConfig::from_env();
    shared::logging::init(&config.logging);
}

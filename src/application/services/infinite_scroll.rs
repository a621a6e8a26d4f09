use crate::application::ports::api_client::FeedApi;
use crate::application::ports::view_store::ViewStore;
use crate::domain::entities::{CachedView, PagedCollection};
use crate::domain::value_objects::ViewKey;
use crate::shared::config::PaginationConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

const EVENT_BUFFER: usize = 64;

/// スクロール位置の観測値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub window_height: f64,
    pub scroll_top: f64,
    pub offset_height: f64,
}

impl ScrollEvent {
    pub fn new(window_height: f64, scroll_top: f64, offset_height: f64) -> Self {
        Self {
            window_height,
            scroll_top,
            offset_height,
        }
    }

    /// 表示領域の下端が文書末尾から `offset_height / divisor` 以内にあるか
    pub fn is_near_bottom(&self, divisor: u32) -> bool {
        let divisor = f64::from(divisor.max(1));
        self.window_height + self.scroll_top > self.offset_height - self.offset_height / divisor
    }
}

/// リスナーが止まった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStop {
    /// 最後のページが空だった
    Exhausted,
    /// イベントの送り手が全て閉じた
    Closed,
}

/// 1つのビューに紐づく無限スクロールのリスナー
///
/// マウント時に未取得なら先頭ページを読み、以降はスクロールイベントを静止時間で
/// まとめてから次ページを読む。空のページを受け取ったら自分で停止する。
/// ハンドルを drop するとアンマウントされる。
pub struct InfiniteScroll {
    events: mpsc::Sender<ScrollEvent>,
    task: Option<JoinHandle<ScrollStop>>,
}

impl InfiniteScroll {
    pub fn mount(
        store: Arc<dyn ViewStore>,
        feed: Arc<dyn FeedApi>,
        key: ViewKey,
        config: PaginationConfig,
    ) -> Self {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let listener = ScrollListener {
            store,
            feed,
            key,
            config,
        };
        let task = tokio::spawn(listener.run(rx));
        Self {
            events,
            task: Some(task),
        }
    }

    /// イベントを渡す。リスナーが既に止まっていれば `false`。
    pub async fn scrolled(&self, event: ScrollEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    pub fn sender(&self) -> mpsc::Sender<ScrollEvent> {
        self.events.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 送り手を閉じてリスナーの終了を待つ
    pub async fn finish(mut self) -> Option<ScrollStop> {
        let task = self.task.take()?;
        drop(self);
        task.await.ok()
    }

    pub fn unmount(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for InfiniteScroll {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct ScrollListener {
    store: Arc<dyn ViewStore>,
    feed: Arc<dyn FeedApi>,
    key: ViewKey,
    config: PaginationConfig,
}

enum FetchResult {
    More,
    Exhausted,
}

impl ScrollListener {
    async fn run(self, mut events: mpsc::Receiver<ScrollEvent>) -> ScrollStop {
        let current = self.current().await;
        if !current.is_seeded() {
            if let FetchResult::Exhausted = self.fetch_next().await {
                return ScrollStop::Exhausted;
            }
        } else if current.is_exhausted() {
            debug!(key = %self.key, "Cached view already exhausted");
            return ScrollStop::Exhausted;
        }

        let quiet = self.config.scroll_debounce();
        while let Some(mut latest) = events.recv().await {
            // 静止時間内に届いたイベントは最後の1つにまとめる
            let mut closed = false;
            loop {
                match timeout(quiet, events.recv()).await {
                    Ok(Some(event)) => latest = event,
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }

            if latest.is_near_bottom(self.config.scroll_threshold_divisor)
                && let FetchResult::Exhausted = self.fetch_next().await
            {
                return ScrollStop::Exhausted;
            }
            if closed {
                break;
            }
        }
        ScrollStop::Closed
    }

    async fn current(&self) -> PagedCollection {
        match self.store.read(&self.key).await {
            Some(CachedView::Paged(collection)) => collection,
            _ => PagedCollection::empty(),
        }
    }

    async fn fetch_next(&self) -> FetchResult {
        let page_size = self.config.page_size;
        let Some(offset) = self.current().await.next_page_param(page_size) else {
            return FetchResult::Exhausted;
        };

        let page = match self.feed.fetch_page(&self.key, offset, page_size).await {
            Ok(page) => page,
            Err(e) => {
                // 次のスクロールで再試行する
                warn!(key = %self.key, offset, "Failed to fetch page: {}", e);
                return FetchResult::More;
            }
        };

        let exhausted = page.is_empty();
        debug!(key = %self.key, offset, items = page.len(), "Fetched page");
        self.store
            .write_paged(
                &self.key,
                Box::new(move |current| current.with_page(page, offset)),
            )
            .await;

        if exhausted {
            FetchResult::Exhausted
        } else {
            FetchResult::More
        }
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use orca_cache::application::ports::{Alert, ChannelApi, Notifier, ViewStore};
use orca_cache::domain::value_objects::ChannelId;
use orca_cache::{AppError, CachedView, Channel, MemoryViewStore, PagedCollection, ViewKey};
use serde_json::{Value, json};

/// `[[{_id, title}...]]` 形式のページ値
pub fn pages(pages: &[&[(i64, &str)]]) -> Value {
    let pages: Vec<Value> = pages
        .iter()
        .map(|page| {
            page.iter()
                .map(|(id, title)| json!({ "_id": id, "title": title, "likes": [], "comments": [] }))
                .collect()
        })
        .collect();
    let params: Vec<u64> = (0..pages.len() as u64).map(|i| i * 10).collect();
    json!({ "pages": pages, "pageParams": params })
}

pub fn post_json(id: i64, title: &str, channel_id: &str, channel_name: &str, author: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "image": null,
        "imagePublicId": null,
        "channel": { "_id": channel_id, "name": channel_name },
        "author": { "_id": author, "fullName": "Ash Ketchum" }
    })
}

pub async fn seeded_store(entries: &[(Value, Value)]) -> Result<Arc<MemoryViewStore>> {
    let store = Arc::new(MemoryViewStore::new());
    for (key, value) in entries {
        store.seed_from_json(key, value).await?;
    }
    Ok(store)
}

pub async fn paged(store: &MemoryViewStore, key: &ViewKey) -> Option<PagedCollection> {
    match store.read(key).await? {
        CachedView::Paged(collection) => Some(collection),
        CachedView::Single(_) => None,
    }
}

pub fn channels(names: &[&str]) -> Vec<Channel> {
    names.iter().map(|name| Channel::new(*name, *name)).collect()
}

pub fn channel_names(items: &[Channel]) -> Vec<String> {
    items.iter().map(|channel| channel.name.clone()).collect()
}

/// 呼び出しを記録するチャンネル API
#[derive(Default)]
pub struct FakeChannelApi {
    pub channels: Vec<Channel>,
    pub fail_reorder: bool,
    pub reorder_calls: Mutex<Vec<Vec<ChannelId>>>,
}

impl FakeChannelApi {
    pub fn with_channels(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_reorder = true;
        self
    }

    pub fn reorder_calls(&self) -> Vec<Vec<ChannelId>> {
        self.reorder_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelApi for FakeChannelApi {
    async fn fetch_channels(&self) -> Result<Vec<Channel>, AppError> {
        Ok(self.channels.clone())
    }

    async fn reorder_channels(&self, ordered_ids: &[ChannelId]) -> Result<(), AppError> {
        self.reorder_calls.lock().unwrap().push(ordered_ids.to_vec());
        if self.fail_reorder {
            return Err(AppError::Network("503 Service Unavailable".into()));
        }
        Ok(())
    }

    async fn delete_channel(&self, id: &ChannelId) -> Result<Channel, AppError> {
        self.channels
            .iter()
            .find(|channel| &channel.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("channel {id}")))
    }
}

/// 通知を溜めておく Notifier
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

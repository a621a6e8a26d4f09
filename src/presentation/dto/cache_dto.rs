use super::Validate;
use crate::domain::entities::Channel;
use crate::domain::value_objects::ChannelId;
use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// 画面側から届く `updateCache` 呼び出し。キーも投稿も型付け前の JSON のまま受け取る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCacheRequest {
    pub view_key: Value,
    pub operation: String,
    pub post: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_adding_to_current_view: Option<bool>,
}

impl Validate for UpdateCacheRequest {
    fn validate(&self) -> Result<(), String> {
        if self.operation.trim().is_empty() {
            return Err("Operation is required".to_string());
        }
        if !self.post.is_object() {
            return Err("Post must be an object".to_string());
        }
        Ok(())
    }
}

/// 事前に投入するキャッシュの1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub key: Value,
    pub value: Value,
}

/// 並べ替えの確認用入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub items: Vec<Channel>,
    pub moved_id: ChannelId,
    pub target_id: ChannelId,
}

/// リプレイ用のスクリプト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
    #[serde(default)]
    pub updates: Vec<UpdateCacheRequest>,
    #[serde(default)]
    pub reorders: Vec<ReorderRequest>,
}

impl ReplayScript {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// リプレイ結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub views: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reorders: Vec<Vec<ChannelId>>,
}

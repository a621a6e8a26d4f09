use super::channel_order::OrderedItem;
use crate::domain::value_objects::ChannelId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// サイドバーに並ぶチャンネル。表示順は配列の並びで決まる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "_id")]
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            auth_required: false,
            order: None,
            description: None,
            extra: Map::new(),
        }
    }
}

impl OrderedItem for Channel {
    type Id = ChannelId;

    fn item_id(&self) -> &Self::Id {
        &self.id
    }
}

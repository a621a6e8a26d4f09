use super::identifier::{PostId, UserId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub const POSTS_BY_FOLLOWING: &str = "postsByFollowing";
pub const POSTS_BY_AUTHOR_ID: &str = "postsByAuthorId";
pub const POSTS_BY_CHANNEL_NAME: &str = "postsByChannelName";
pub const SINGLE_POST: &str = "post";

/// キャッシュされたビュー（ページング一覧または単一投稿）を識別するキー
///
/// フロントエンドのクエリキーとの対応:
/// - `"postsByFollowing"` → [`ViewKey::Following`]（ホーム）
/// - `["postsByAuthorId", id]` → [`ViewKey::ByAuthor`]（プロフィール）
/// - `["postsByChannelName", name]` → [`ViewKey::ByChannel`]（チャンネル）
/// - `["post", id]` → [`ViewKey::SinglePost`]（投稿詳細）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    Following,
    ByAuthor(UserId),
    ByChannel(String),
    SinglePost(PostId),
}

impl ViewKey {
    /// 型のないクエリキーを検証して変換する
    pub fn from_query_key(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(name) if name == POSTS_BY_FOLLOWING => Ok(Self::Following),
            Value::String(name) => Err(format!("{name} is an unknown cache key")),
            Value::Array(parts) => Self::from_parts(parts),
            other => Err(format!("{other} is an unknown cache key")),
        }
    }

    fn from_parts(parts: &[Value]) -> Result<Self, String> {
        let Some(name) = parts.first().and_then(Value::as_str) else {
            return Err(format!("{} is an unknown cache key", Value::from(parts)));
        };
        let discriminator = parts.get(1);

        match name {
            POSTS_BY_AUTHOR_ID => discriminator
                .and_then(super::Identifier::from_value)
                .map(Self::ByAuthor)
                .ok_or_else(|| format!("{name} key requires an author id")),
            POSTS_BY_CHANNEL_NAME => discriminator
                .and_then(Value::as_str)
                .filter(|channel| !channel.trim().is_empty())
                .map(|channel| Self::ByChannel(channel.to_string()))
                .ok_or_else(|| format!("{name} key requires a channel name")),
            SINGLE_POST => discriminator
                .and_then(super::Identifier::from_value)
                .map(Self::SinglePost)
                .ok_or_else(|| format!("{name} key requires a post id")),
            _ => Err(format!("{} is an unknown cache key", Value::from(parts))),
        }
    }

    pub fn to_query_key(&self) -> Value {
        match self {
            Self::Following => Value::String(POSTS_BY_FOLLOWING.to_string()),
            Self::ByAuthor(id) => Value::Array(vec![POSTS_BY_AUTHOR_ID.into(), id.to_value()]),
            Self::ByChannel(name) => {
                Value::Array(vec![POSTS_BY_CHANNEL_NAME.into(), name.as_str().into()])
            }
            Self::SinglePost(id) => Value::Array(vec![SINGLE_POST.into(), id.to_value()]),
        }
    }

    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::Following => POSTS_BY_FOLLOWING,
            Self::ByAuthor(_) => POSTS_BY_AUTHOR_ID,
            Self::ByChannel(_) => POSTS_BY_CHANNEL_NAME,
            Self::SinglePost(_) => SINGLE_POST,
        }
    }

    /// ページング一覧を保持するキーかどうか
    pub fn is_paged(&self) -> bool {
        !matches!(self, Self::SinglePost(_))
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_key())
    }
}

impl Serialize for ViewKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_query_key().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ViewKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_query_key(&value).map_err(serde::de::Error::custom)
    }
}

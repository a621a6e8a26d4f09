use crate::domain::value_objects::{ChannelId, PostId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 作成・更新 API が返すサーバー正準の投稿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_public_id: Option<String>,
    pub channel: ChannelRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 投稿に埋め込まれたチャンネル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRef {
    #[serde(rename = "_id")]
    pub id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 投稿者は ID のみ、または populate 済みのユーザーとして返る
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    Id(UserId),
    Profile(AuthorProfile),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorRef {
    pub fn id(&self) -> &UserId {
        match self {
            AuthorRef::Id(id) => id,
            AuthorRef::Profile(profile) => &profile.id,
        }
    }
}

impl Post {
    pub fn new(id: PostId, title: Option<String>, channel: ChannelRef) -> Self {
        Self {
            id,
            title,
            image: None,
            image_public_id: None,
            channel,
            author: None,
            extra: Map::new(),
        }
    }

    pub fn with_author(mut self, author: UserId) -> Self {
        self.author = Some(AuthorRef::Id(author));
        self
    }

    pub fn with_image(mut self, image: String, image_public_id: String) -> Self {
        self.image = Some(image);
        self.image_public_id = Some(image_public_id);
        self
    }

    pub fn author_id(&self) -> Option<&UserId> {
        self.author.as_ref().map(AuthorRef::id)
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel.name.as_deref()
    }

    /// キャッシュ側で上書きしてよいフィールドの集合
    pub fn patch(&self) -> PostPatch {
        PostPatch::from(self)
    }
}

impl ChannelRef {
    pub fn new(id: impl Into<ChannelId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            extra: Map::new(),
        }
    }

    pub fn named(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            extra: Map::new(),
        }
    }
}

/// 投稿作成・更新リクエストの入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: Option<String>,
    pub channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_to_delete_public_id: Option<String>,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title
            && title.chars().count() > 3000
        {
            return Err("Post title is too long (max 3000 characters)".to_string());
        }
        Ok(())
    }
}

/// ビューに保持される非正規化済みの投稿。`_id` 以外のフィールドはそのまま保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "_id")]
    pub id: PostId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PostRecord {
    pub fn new(id: PostId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// 型のない JSON から取り出す。`_id` が無いものは `None`。
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = object.get("_id").and_then(PostId::from_value)?;
        let fields = object
            .iter()
            .filter(|(key, _)| key.as_str() != "_id")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Self { id, fields })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// パッチを適用した新しいレコードを返す
    pub fn merged(&self, patch: &PostPatch) -> Self {
        let mut next = self.clone();
        patch.apply(&mut next.fields);
        next
    }
}

impl TryFrom<&Post> for PostRecord {
    type Error = serde_json::Error;

    fn try_from(post: &Post) -> Result<Self, Self::Error> {
        let value = serde_json::to_value(post)?;
        let fields = match value {
            Value::Object(mut map) => {
                map.remove("_id");
                map
            }
            _ => Map::new(),
        };
        Ok(Self {
            id: post.id.clone(),
            fields,
        })
    }
}

/// 書き込みで変わり得るフィールドだけを持つパッチ
#[derive(Debug, Clone, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
    pub channel_id: ChannelId,
}

impl PostPatch {
    pub const FIELDS: [&'static str; 4] = ["title", "image", "imagePublicId", "channelId"];

    pub fn apply(&self, fields: &mut Map<String, Value>) {
        fields.insert("title".to_string(), optional_string(&self.title));
        fields.insert("image".to_string(), optional_string(&self.image));
        fields.insert(
            "imagePublicId".to_string(),
            optional_string(&self.image_public_id),
        );
        fields.insert("channelId".to_string(), self.channel_id.to_value());
    }
}

impl From<&Post> for PostPatch {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            image: post.image.clone(),
            image_public_id: post.image_public_id.clone(),
            channel_id: post.channel.id.clone(),
        }
    }
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

use crate::domain::value_objects::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserRole {
    #[default]
    Regular,
    Admin,
    SuperAdmin,
}

/// ログイン中のユーザー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<UserId>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            role,
            full_name: None,
        }
    }

    /// チャンネル並び順の保存などの管理操作が許可されているか
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::SuperAdmin)
    }
}

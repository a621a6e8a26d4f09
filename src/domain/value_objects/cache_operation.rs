use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// キャッシュへ反映する書き込みの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOperation {
    Create,
    Update,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Create => "create",
            CacheOperation::Update => "update",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "create" => Ok(CacheOperation::Create),
            "update" => Ok(CacheOperation::Update),
            other => Err(format!("Unknown cache operation: {other}")),
        }
    }
}

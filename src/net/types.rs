//! Request/response DTOs for the user, app and chat-history endpoints.
//!
//! DESIGN
//! ======
//! Field names mirror the backend's camelCase JSON. Backend `Long` ids are
//! serialized as strings by some endpoints and numbers by others, so every
//! id goes through [`Id`], which accepts both.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// IDS AND ROLES
// =============================================================================

/// Backend entity identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(pub i64);

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Id)
                .ok_or_else(|| D::Error::custom(format!("id {number} is not an integer"))),
            serde_json::Value::String(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Id)
                .map_err(|_| D::Error::custom(format!("id {raw:?} is not an integer"))),
            _ => Err(D::Error::custom("expected id as number or string")),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Id)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Role tag carried on user records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Admin,
    #[default]
    User,
    /// Any role the client does not know about; never satisfies a rule for a known role.
    Other(String),
}

impl UserRole {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for UserRole {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for UserRole {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_owned()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// USERS
// =============================================================================

/// The authenticated user as returned by `/user/get/login` and `/user/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: Id,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub user_profile: Option<String>,
    #[serde(default)]
    pub user_role: UserRole,
}

/// Public user record used in listings and embedded in apps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVo {
    pub id: Id,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub user_profile: Option<String>,
    #[serde(default)]
    pub user_role: UserRole,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginRequest {
    pub user_account: String,
    pub user_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegisterRequest {
    pub user_account: String,
    pub user_password: String,
    pub check_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAddRequest {
    pub user_name: String,
    pub user_account: String,
    pub user_role: UserRole,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    pub id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<UserRole>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<UserRole>,
}

/// Body of every `.../delete` endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: Id,
}

// =============================================================================
// APPS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppVo {
    pub id: Id,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub init_prompt: String,
    #[serde(default)]
    pub code_gen_type: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub user_id: Option<Id>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub user: Option<UserVo>,
    #[serde(default)]
    pub app_status: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAddRequest {
    pub init_prompt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdateRequest {
    pub id: Id,
    pub app_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAdminUpdateRequest {
    pub id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppQueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_gen_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCodeUpdateRequest {
    pub id: Id,
    pub code_content: String,
}

/// Raw bytes returned by the app download endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    /// File name from `Content-Disposition`, when the backend sent one.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

// =============================================================================
// CHAT HISTORY
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub id: Id,
    #[serde(default)]
    pub message: String,
    /// `user` or `ai`.
    #[serde(default)]
    pub message_type: String,
    pub app_id: Id,
    #[serde(default)]
    pub user_id: Option<Id>,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryQueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

/// Cursor for the per-app history feed: newest first, older pages via `last_create_time`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatHistoryCursor {
    pub page_size: Option<u64>,
    pub last_create_time: Option<String>,
}

impl ChatHistoryCursor {
    /// Query-string pairs for the cursor, omitting unset fields.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(size) = self.page_size {
            query.push(("pageSize".to_owned(), size.to_string()));
        }
        if let Some(before) = &self.last_create_time {
            query.push(("lastCreateTime".to_owned(), before.clone()));
        }
        query
    }
}

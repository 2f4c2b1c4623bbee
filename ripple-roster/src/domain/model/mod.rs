use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ripple_sync_core::gateway::Row;

/// 提供方频道行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ChannelRow {
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }
}

/// 提供方用户资料行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileRow {
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }
}

/// 工作区成员角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Member,
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Member
    }
}

/// 提供方成员关系行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRow {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub role: MemberRole,
}

impl MemberRow {
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }
}

/// 成员名录条目：成员关系 + 资料 + 在线标记
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub role: MemberRole,
    pub online: bool,
}

/// 邀请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

/// 提供方邀请行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub invited_email: String,
    pub invited_by: Uuid,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl InvitationRow {
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }
}

/// 推送给视图层的目录更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterUpdate {
    /// 频道目录加载完成
    ChannelsLoaded { workspace_id: Uuid },
    /// 新频道加入目录
    ChannelAppended { channel_id: Uuid },
}

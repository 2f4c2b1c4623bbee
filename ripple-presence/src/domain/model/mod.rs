use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ripple_sync_core::gateway::Row;

/// 在线状态宣告的元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineAnnouncement {
    pub user_id: Uuid,
    pub online_at: DateTime<Utc>,
}

impl OnlineAnnouncement {
    pub fn now(user_id: Uuid) -> Self {
        Self {
            user_id,
            online_at: Utc::now(),
        }
    }

    pub fn to_row(&self) -> Row {
        serde_json::to_value(self).expect("announcement serializes")
    }
}

/// 输入提示宣告的元数据
///
/// 每次按键都会重新宣告，观察端只认每个用户的最新一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingAnnouncement {
    pub user_id: Uuid,
    pub username: String,
    pub typing: bool,
}

impl TypingAnnouncement {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            typing: true,
        }
    }

    pub fn to_row(&self) -> Row {
        serde_json::to_value(self).expect("announcement serializes")
    }

    pub fn from_row(row: &Row) -> Option<Self> {
        serde_json::from_value(row.clone()).ok()
    }
}

/// 推送给视图层的状态更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    /// 在线成员集合被新快照整体替换
    OnlineSynced { online_count: usize },
    /// 某作用域的输入者集合变化
    TypistsChanged { scope: String },
}

/// 在线状态领域配置
#[derive(Debug, Clone)]
pub struct PresenceDomainConfig {
    /// 输入提示的发送端过期时间
    pub typing_timeout: Duration,
}

impl Default for PresenceDomainConfig {
    fn default() -> Self {
        Self {
            typing_timeout: Duration::from_secs(3),
        }
    }
}

impl PresenceDomainConfig {
    pub fn from_app_config(config: &ripple_sync_core::config::RippleAppConfig) -> Self {
        Self {
            typing_timeout: Duration::from_secs(config.sync.typing_timeout_secs),
        }
    }
}

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ripple_sync_core::gateway::Row;

/// 墓碑消息的固定展示文案
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// 聊天作用域键
///
/// 每个作用域拥有独立的事件订阅与本地缓存，作用域之间没有顺序保证
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// 频道
    Channel(Uuid),
    /// 私聊会话（私聊频道 ID）
    Direct(Uuid),
    /// 话题（父消息 ID）
    Thread(Uuid),
}

impl ScopeKey {
    /// 该作用域对应的提供方表名
    pub fn table(&self) -> &'static str {
        match self {
            ScopeKey::Channel(_) | ScopeKey::Thread(_) => "messages",
            ScopeKey::Direct(_) => "direct_messages",
        }
    }

    /// 该作用域的订阅/查询过滤条件（列名，值）
    pub fn filter(&self) -> (&'static str, String) {
        match self {
            ScopeKey::Channel(id) => ("channel_id", id.to_string()),
            ScopeKey::Direct(id) => ("channel_id", id.to_string()),
            ScopeKey::Thread(parent_id) => ("parent_id", parent_id.to_string()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ScopeKey::Channel(id) => format!("channel:{}", id),
            ScopeKey::Direct(id) => format!("dm:{}", id),
            ScopeKey::Thread(id) => format!("thread:{}", id),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// 提供方消息行
///
/// 字段名遵循提供方的列名约定（content/user_id 等），
/// 私聊表没有 parent_id/is_signal 列，反序列化时取默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: Uuid,
    pub channel_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// 发送者，系统 signal 消息可能为空
    #[serde(rename = "user_id", default)]
    pub author_id: Option<Uuid>,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(default)]
    pub is_signal: bool,
    /// 乐观写入的关联 ID，从写入载荷透传到变更事件
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    /// 从提供方行快照解析
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }

    pub fn is_tombstoned(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 待写入的消息
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub scope: ScopeKey,
    pub channel_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub body: String,
    pub is_signal: bool,
    pub correlation_id: String,
}

/// 缓存条目的来源标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOrigin {
    /// 乐观写入的本地占位条目，等待服务端确认
    PendingLocal { correlation: String },
    /// 服务端已确认的行
    Confirmed,
}

/// 本地缓存中的一条消息
#[derive(Debug, Clone)]
pub struct CachedMessage {
    pub row: MessageRow,
    pub origin: MessageOrigin,
    /// 已解析的发送者展示名
    pub author_name: Option<String>,
}

impl CachedMessage {
    pub fn confirmed(row: MessageRow, author_name: Option<String>) -> Self {
        Self {
            row,
            origin: MessageOrigin::Confirmed,
            author_name,
        }
    }

    pub fn pending(row: MessageRow, correlation: String, author_name: Option<String>) -> Self {
        Self {
            row,
            origin: MessageOrigin::PendingLocal { correlation },
            author_name,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.origin, MessageOrigin::PendingLocal { .. })
    }

    /// 展示用的消息内容，墓碑条目返回固定文案
    pub fn display_body(&self) -> &str {
        if self.row.is_tombstoned() {
            DELETED_PLACEHOLDER
        } else {
            &self.row.body
        }
    }
}

/// 提供方表情回应行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRow {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
}

impl ReactionRow {
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }
}

/// 单个表情的聚合结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionTally {
    pub emoji: String,
    pub count: usize,
    /// 当前查看者是否参与了该表情
    pub reacted: bool,
}

/// 从完整的回应记录集合重算聚合
///
/// 不信任增量计数，每次回应事件后全量重算以避免漂移；
/// 结果顺序与表情首次出现的顺序一致，与记录到达顺序无关
pub fn compute_reaction_tallies(records: &[ReactionRow], viewer: Uuid) -> Vec<ReactionTally> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, (usize, bool)> = HashMap::new();

    for record in records {
        let entry = counts.entry(record.emoji.as_str()).or_insert_with(|| {
            order.push(record.emoji.as_str());
            (0, false)
        });
        entry.0 += 1;
        if record.user_id == viewer {
            entry.1 = true;
        }
    }

    order
        .into_iter()
        .map(|emoji| {
            let (count, reacted) = counts[emoji];
            ReactionTally {
                emoji: emoji.to_string(),
                count,
                reacted,
            }
        })
        .collect()
}

/// 推送给视图层的增量更新通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineUpdate {
    /// 作用域初始加载完成
    ScopeLoaded { scope: ScopeKey },
    /// 新消息追加
    MessageAppended { scope: ScopeKey, id: Uuid },
    /// 消息被就地修改（编辑或乐观条目被确认）
    MessagePatched { scope: ScopeKey, id: Uuid },
    /// 消息被软删除为墓碑
    MessageTombstoned { scope: ScopeKey, id: Uuid },
    /// 乐观条目因写入失败被撤回
    MessageRetracted { scope: ScopeKey, id: Uuid },
    /// 话题回复数变化
    ReplyCountChanged { parent_id: Uuid, count: usize },
    /// 表情回应聚合变化
    ReactionsChanged { message_id: Uuid },
    /// 未读数变化
    UnreadChanged { scope: ScopeKey, count: usize },
}

/// 时间线领域配置
#[derive(Debug, Clone)]
pub struct TimelineDomainConfig {
    /// 频道/私聊作用域的初始拉取上限
    pub channel_history_limit: usize,
    /// 话题作用域的初始拉取上限
    pub thread_history_limit: usize,
}

impl Default for TimelineDomainConfig {
    fn default() -> Self {
        Self {
            channel_history_limit: 200,
            thread_history_limit: 100,
        }
    }
}

impl TimelineDomainConfig {
    pub fn from_app_config(config: &ripple_sync_core::config::RippleAppConfig) -> Self {
        Self {
            channel_history_limit: config.sync.channel_history_limit,
            thread_history_limit: config.sync.thread_history_limit,
        }
    }

    pub fn history_limit(&self, scope: &ScopeKey) -> usize {
        match scope {
            ScopeKey::Channel(_) | ScopeKey::Direct(_) => self.channel_history_limit,
            ScopeKey::Thread(_) => self.thread_history_limit,
        }
    }
}

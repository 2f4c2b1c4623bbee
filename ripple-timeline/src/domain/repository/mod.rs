use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use ripple_sync_core::gateway::Subscription;

use crate::domain::model::{MessageDraft, MessageRow, ReactionRow, ScopeKey};

/// 消息仓储接口（需要作为 trait 对象使用，保留 async-trait）
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 拉取作用域内最近的 N 条消息，按创建时间升序返回
    async fn recent_messages(&self, scope: &ScopeKey, limit: usize) -> Result<Vec<MessageRow>>;

    /// 拉取作用域内晚于指定时间的全部消息（未读数重算）
    async fn messages_after(
        &self,
        scope: &ScopeKey,
        after: DateTime<Utc>,
    ) -> Result<Vec<MessageRow>>;

    /// 写入一条消息，返回提供方存储后的行
    async fn insert_message(&self, draft: &MessageDraft) -> Result<MessageRow>;

    /// 编辑消息内容
    async fn update_body(&self, scope: &ScopeKey, id: Uuid, body: &str) -> Result<MessageRow>;

    /// 软删除消息（设置墓碑时间戳，行保留）
    async fn tombstone(&self, scope: &ScopeKey, id: Uuid) -> Result<MessageRow>;

    /// 订阅作用域内的消息插入与更新事件
    async fn subscribe_messages(&self, scope: &ScopeKey) -> Result<Subscription>;
}

/// 表情回应仓储接口
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// 拉取一组消息的全部回应记录
    async fn reactions_for(&self, message_ids: &[Uuid]) -> Result<Vec<ReactionRow>>;

    async fn add_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<ReactionRow>;

    async fn remove_reaction(&self, reaction_id: Uuid) -> Result<()>;

    /// 订阅回应表的插入与删除事件
    async fn subscribe_reactions(&self) -> Result<Subscription>;
}

/// 用户资料解析接口
///
/// 消息窗口安装时批量解析发送者展示名，实时事件按需单条解析
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// 批量解析展示名，未知用户不在返回表中
    async fn resolve(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>>;

    /// 单条解析，未知用户返回 None
    async fn display_name(&self, user_id: Uuid) -> Result<Option<String>>;
}

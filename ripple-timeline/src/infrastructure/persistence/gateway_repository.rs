//! 基于数据网关的消息与回应仓储实现
//!
//! 行以 JSON 形式跨越网关边界，此处负责类型化解析；
//! 无法解析的行视为畸形数据直接报错，不污染缓存

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;

use ripple_sync_core::gateway::{
    ChangeOp, DataGateway, RealtimeGateway, Row, SelectQuery, SubscribeSpec, Subscription,
};

use crate::domain::model::{MessageDraft, MessageRow, ReactionRow, ScopeKey};
use crate::domain::repository::{MessageRepository, ReactionRepository};

const REACTIONS_TABLE: &str = "reactions";

/// 网关消息仓储
pub struct GatewayMessageRepository {
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
}

impl GatewayMessageRepository {
    pub fn new(data: Arc<dyn DataGateway>, realtime: Arc<dyn RealtimeGateway>) -> Self {
        Self { data, realtime }
    }

    fn parse_rows(table: &str, rows: Vec<Row>) -> Result<Vec<MessageRow>> {
        rows.iter()
            .map(|row| {
                MessageRow::from_row(row)
                    .with_context(|| format!("malformed message row in table {}", table))
            })
            .collect()
    }
}

#[async_trait]
impl MessageRepository for GatewayMessageRepository {
    async fn recent_messages(&self, scope: &ScopeKey, limit: usize) -> Result<Vec<MessageRow>> {
        let (column, value) = scope.filter();
        // 取最近 N 条：降序拉取后翻转为升序展示窗口
        let rows = self
            .data
            .select(
                SelectQuery::table(scope.table())
                    .eq(column, value)
                    .order("created_at", false)
                    .limit(limit),
            )
            .await
            .context("bulk message fetch failed")?;
        let mut messages = Self::parse_rows(scope.table(), rows)?;
        messages.reverse();
        Ok(messages)
    }

    async fn messages_after(
        &self,
        scope: &ScopeKey,
        after: DateTime<Utc>,
    ) -> Result<Vec<MessageRow>> {
        let (column, value) = scope.filter();
        let rows = self
            .data
            .select(
                SelectQuery::table(scope.table())
                    .eq(column, value)
                    .after("created_at", after),
            )
            .await
            .context("unread requery failed")?;
        Self::parse_rows(scope.table(), rows)
    }

    async fn insert_message(&self, draft: &MessageDraft) -> Result<MessageRow> {
        let mut payload = json!({
            "channel_id": draft.channel_id.to_string(),
            "content": draft.body,
            "correlation_id": draft.correlation_id,
        });
        {
            let object = payload.as_object_mut().expect("payload is an object");
            if let Some(author_id) = draft.author_id {
                object.insert("user_id".into(), json!(author_id.to_string()));
            }
            if let Some(parent_id) = draft.parent_id {
                object.insert("parent_id".into(), json!(parent_id.to_string()));
            }
            if draft.is_signal {
                object.insert("is_signal".into(), json!(true));
            }
        }

        let stored = self
            .data
            .insert(draft.scope.table(), payload)
            .await
            .context("message write failed")?;
        MessageRow::from_row(&stored).context("provider returned malformed message row")
    }

    async fn update_body(&self, scope: &ScopeKey, id: Uuid, body: &str) -> Result<MessageRow> {
        let stored = self
            .data
            .update(
                scope.table(),
                id,
                json!({
                    "content": body,
                    "edited_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                }),
            )
            .await
            .context("message edit failed")?;
        MessageRow::from_row(&stored).context("provider returned malformed message row")
    }

    async fn tombstone(&self, scope: &ScopeKey, id: Uuid) -> Result<MessageRow> {
        let stored = self
            .data
            .update(
                scope.table(),
                id,
                json!({
                    "deleted_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                }),
            )
            .await
            .context("message soft delete failed")?;
        MessageRow::from_row(&stored).context("provider returned malformed message row")
    }

    async fn subscribe_messages(&self, scope: &ScopeKey) -> Result<Subscription> {
        let (column, value) = scope.filter();
        let subscription = self
            .realtime
            .subscribe(
                SubscribeSpec::all(scope.table())
                    .filtered(column, value)
                    .with_ops(vec![ChangeOp::Insert, ChangeOp::Update]),
            )
            .await
            .context("message subscription failed")?;
        Ok(subscription)
    }
}

/// 网关回应仓储
pub struct GatewayReactionRepository {
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
}

impl GatewayReactionRepository {
    pub fn new(data: Arc<dyn DataGateway>, realtime: Arc<dyn RealtimeGateway>) -> Self {
        Self { data, realtime }
    }
}

#[async_trait]
impl ReactionRepository for GatewayReactionRepository {
    async fn reactions_for(&self, message_ids: &[Uuid]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .data
            .select(SelectQuery::table(REACTIONS_TABLE).within(
                "message_id",
                message_ids.iter().map(|id| id.to_string()).collect(),
            ))
            .await
            .context("reaction fetch failed")?;
        rows.iter()
            .map(|row| ReactionRow::from_row(row).context("malformed reaction row"))
            .collect()
    }

    async fn add_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<ReactionRow> {
        let stored = self
            .data
            .insert(
                REACTIONS_TABLE,
                json!({
                    "message_id": message_id.to_string(),
                    "user_id": user_id.to_string(),
                    "emoji": emoji,
                }),
            )
            .await
            .context("reaction write failed")?;
        ReactionRow::from_row(&stored).context("provider returned malformed reaction row")
    }

    async fn remove_reaction(&self, reaction_id: Uuid) -> Result<()> {
        self.data
            .delete(REACTIONS_TABLE, reaction_id)
            .await
            .context("reaction delete failed")?;
        Ok(())
    }

    async fn subscribe_reactions(&self) -> Result<Subscription> {
        let subscription = self
            .realtime
            .subscribe(
                SubscribeSpec::all(REACTIONS_TABLE)
                    .with_ops(vec![ChangeOp::Insert, ChangeOp::Delete]),
            )
            .await
            .context("reaction subscription failed")?;
        Ok(subscription)
    }
}

//! 基于数据网关的任务仓储与 signal 发布实现

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use ripple_sync_core::gateway::{
    DataGateway, RealtimeGateway, SelectQuery, SubscribeSpec, Subscription, row,
};

use crate::domain::model::{TaskDraft, TaskRow, TaskStatus};
use crate::domain::repository::{SignalPublisher, TaskRepository};

const TASKS_TABLE: &str = "tasks";
const CHANNELS_TABLE: &str = "channels";
const MESSAGES_TABLE: &str = "messages";

/// 网关任务仓储
pub struct GatewayTaskRepository {
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
}

impl GatewayTaskRepository {
    pub fn new(data: Arc<dyn DataGateway>, realtime: Arc<dyn RealtimeGateway>) -> Self {
        Self { data, realtime }
    }
}

#[async_trait]
impl TaskRepository for GatewayTaskRepository {
    async fn list_tasks(&self, workspace_id: Uuid) -> Result<Vec<TaskRow>> {
        let rows = self
            .data
            .select(
                SelectQuery::table(TASKS_TABLE)
                    .eq("workspace_id", workspace_id)
                    .order("created_at", false),
            )
            .await
            .context("task fetch failed")?;
        rows.iter()
            .map(|task_row| TaskRow::from_row(task_row).context("malformed task row"))
            .collect()
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<TaskRow> {
        let mut payload = json!({
            "workspace_id": draft.workspace_id.to_string(),
            "title": draft.title,
            "priority": draft.priority,
            "created_by": draft.created_by.to_string(),
            "status": TaskStatus::Todo,
        });
        if let Some(description) = &draft.description {
            payload
                .as_object_mut()
                .expect("payload is an object")
                .insert("description".into(), json!(description));
        }

        let stored = self
            .data
            .insert(TASKS_TABLE, payload)
            .await
            .context("task write failed")?;
        TaskRow::from_row(&stored).context("provider returned malformed task row")
    }

    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<TaskRow> {
        let stored = self
            .data
            .update(TASKS_TABLE, task_id, json!({ "status": status }))
            .await
            .context("task status update failed")?;
        TaskRow::from_row(&stored).context("provider returned malformed task row")
    }

    async fn subscribe_tasks(&self, workspace_id: Uuid) -> Result<Subscription> {
        let subscription = self
            .realtime
            .subscribe(SubscribeSpec::all(TASKS_TABLE).filtered("workspace_id", workspace_id))
            .await
            .context("task subscription failed")?;
        Ok(subscription)
    }
}

/// 网关 signal 发布器
///
/// 查找工作区默认频道并写入 is_signal 消息行，
/// 消息经时间线订阅事件到达各客户端
pub struct GatewaySignalPublisher {
    data: Arc<dyn DataGateway>,
    actor: Uuid,
}

impl GatewaySignalPublisher {
    pub fn new(data: Arc<dyn DataGateway>, actor: Uuid) -> Self {
        Self { data, actor }
    }

    async fn default_channel(&self, workspace_id: Uuid) -> Result<Uuid> {
        let rows = self
            .data
            .select(
                SelectQuery::table(CHANNELS_TABLE)
                    .eq("workspace_id", workspace_id)
                    .eq("is_default", "true")
                    .limit(1),
            )
            .await
            .context("default channel lookup failed")?;
        rows.first()
            .and_then(row::row_id)
            .ok_or_else(|| anyhow!("workspace {} has no default channel", workspace_id))
    }
}

#[async_trait]
impl SignalPublisher for GatewaySignalPublisher {
    async fn publish(&self, workspace_id: Uuid, body: &str) -> Result<()> {
        let channel_id = self.default_channel(workspace_id).await?;
        self.data
            .insert(
                MESSAGES_TABLE,
                json!({
                    "channel_id": channel_id.to_string(),
                    "user_id": self.actor.to_string(),
                    "content": body,
                    "is_signal": true,
                }),
            )
            .await
            .context("signal write failed")?;
        Ok(())
    }
}

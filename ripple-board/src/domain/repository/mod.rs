use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use ripple_sync_core::gateway::Subscription;

use crate::domain::model::{TaskDraft, TaskRow, TaskStatus};

/// 任务仓储接口（需要作为 trait 对象使用，保留 async-trait）
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 拉取工作区的全部任务，按创建时间降序
    async fn list_tasks(&self, workspace_id: Uuid) -> Result<Vec<TaskRow>>;

    async fn insert_task(&self, draft: &TaskDraft) -> Result<TaskRow>;

    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<TaskRow>;

    /// 订阅工作区任务表的全部变更事件
    async fn subscribe_tasks(&self, workspace_id: Uuid) -> Result<Subscription>;
}

/// signal 消息发布接口
///
/// 看板流转通知写入工作区默认频道，消息本体经时间线的
/// 订阅事件到达各客户端
#[async_trait]
pub trait SignalPublisher: Send + Sync {
    async fn publish(&self, workspace_id: Uuid, body: &str) -> Result<()>;
}

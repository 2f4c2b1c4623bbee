use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ripple_sync_core::gateway::Row;

/// 任务状态（看板列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// 列标题
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// signal 消息使用的状态表情
    pub fn signal_emoji(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "📋",
            TaskStatus::InProgress => "🔄",
            TaskStatus::Done => "✅",
        }
    }

    /// 看板列的固定顺序
    pub const COLUMNS: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];
}

/// 任务优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// 提供方任务行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub created_by: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TaskRow {
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.clone())
    }
}

/// 待创建的任务
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub workspace_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub created_by: Uuid,
}

/// 推送给视图层的看板更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    /// 整板已重载
    Reloaded { workspace_id: Uuid },
    /// 任务被乐观移动到新列
    TaskMoved { task_id: Uuid, status: TaskStatus },
    /// 移动失败，任务回到原列
    MoveReverted { task_id: Uuid, status: TaskStatus },
}

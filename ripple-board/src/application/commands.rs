use uuid::Uuid;

use crate::domain::model::{TaskPriority, TaskStatus};

/// 加载看板命令
#[derive(Debug, Clone)]
pub struct LoadBoardCommand {
    pub workspace_id: Uuid,
}

/// 创建任务命令
#[derive(Debug, Clone)]
pub struct CreateTaskCommand {
    pub workspace_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    /// 操作者展示名（signal 文案使用）
    pub actor_name: String,
}

/// 移动任务命令
#[derive(Debug, Clone)]
pub struct MoveTaskCommand {
    pub task_id: Uuid,
    pub new_status: TaskStatus,
    /// 操作者展示名（signal 文案使用）
    pub actor_name: String,
}

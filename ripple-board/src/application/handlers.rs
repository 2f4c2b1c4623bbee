use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::application::commands::{CreateTaskCommand, LoadBoardCommand, MoveTaskCommand};
use crate::application::queries::{BoardSnapshotQuery, ColumnQuery};
use crate::domain::model::{TaskDraft, TaskRow};
use crate::domain::service::BoardDomainService;

/// 看板命令处理器
pub struct BoardCommandHandler {
    domain_service: Arc<BoardDomainService>,
    viewer: uuid::Uuid,
}

impl BoardCommandHandler {
    pub fn new(domain_service: Arc<BoardDomainService>, viewer: uuid::Uuid) -> Self {
        Self {
            domain_service,
            viewer,
        }
    }

    /// 处理加载看板命令
    pub async fn handle_load_board(&self, command: LoadBoardCommand) -> Result<()> {
        debug!(workspace_id = %command.workspace_id, "Handling load board command");

        self.domain_service.load_board(command.workspace_id).await?;

        info!(workspace_id = %command.workspace_id, "Board loaded");
        Ok(())
    }

    /// 处理创建任务命令
    pub async fn handle_create_task(&self, command: CreateTaskCommand) -> Result<TaskRow> {
        debug!(
            workspace_id = %command.workspace_id,
            title = %command.title,
            "Handling create task command"
        );

        let draft = TaskDraft {
            workspace_id: command.workspace_id,
            title: command.title,
            description: command.description,
            priority: command.priority,
            created_by: self.viewer,
        };
        self.domain_service
            .create_task(draft, &command.actor_name)
            .await
    }

    /// 处理移动任务命令
    pub async fn handle_move_task(&self, command: MoveTaskCommand) -> Result<()> {
        debug!(
            task_id = %command.task_id,
            new_status = ?command.new_status,
            "Handling move task command"
        );

        self.domain_service
            .move_task(command.task_id, command.new_status, &command.actor_name)
            .await
    }
}

/// 看板查询处理器
pub struct BoardQueryHandler {
    domain_service: Arc<BoardDomainService>,
}

impl BoardQueryHandler {
    pub fn new(domain_service: Arc<BoardDomainService>) -> Self {
        Self { domain_service }
    }

    /// 处理整板快照查询
    pub async fn handle_board_snapshot(&self, _query: BoardSnapshotQuery) -> Vec<TaskRow> {
        self.domain_service.board_snapshot().await
    }

    /// 处理单列任务查询
    pub async fn handle_column(&self, query: ColumnQuery) -> Vec<TaskRow> {
        self.domain_service.tasks_in(query.status).await
    }
}

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::application::commands::{
    JoinTypingScopeCommand, JoinWorkspaceCommand, KeystrokeCommand, LeaveTypingScopeCommand,
    LeaveWorkspaceCommand, MessageSentCommand,
};
use crate::application::queries::{IsOnlineQuery, OnlineCountQuery, TypistsQuery};
use crate::domain::service::{PresenceDomainService, TypingDomainService};

/// 在线状态命令处理器
pub struct PresenceCommandHandler {
    presence_service: Arc<PresenceDomainService>,
    typing_service: Arc<TypingDomainService>,
}

impl PresenceCommandHandler {
    pub fn new(
        presence_service: Arc<PresenceDomainService>,
        typing_service: Arc<TypingDomainService>,
    ) -> Self {
        Self {
            presence_service,
            typing_service,
        }
    }

    /// 处理加入工作区命令
    pub async fn handle_join_workspace(&self, command: JoinWorkspaceCommand) -> Result<()> {
        debug!(workspace_id = %command.workspace_id, "Handling join workspace command");

        self.presence_service
            .join_workspace(command.workspace_id)
            .await
    }

    /// 处理离开工作区命令
    pub async fn handle_leave_workspace(&self, _command: LeaveWorkspaceCommand) -> Result<()> {
        debug!("Handling leave workspace command");

        self.presence_service.leave_workspace().await;
        Ok(())
    }

    /// 处理加入输入提示组命令
    pub async fn handle_join_typing_scope(&self, command: JoinTypingScopeCommand) -> Result<()> {
        debug!(scope = %command.scope, "Handling join typing scope command");

        self.typing_service.join_scope(&command.scope).await
    }

    /// 处理离开输入提示组命令
    pub async fn handle_leave_typing_scope(&self, _command: LeaveTypingScopeCommand) -> Result<()> {
        debug!("Handling leave typing scope command");

        self.typing_service.leave_scope().await;
        Ok(())
    }

    /// 处理本地按键命令
    pub async fn handle_keystroke(&self, _command: KeystrokeCommand) -> Result<()> {
        self.typing_service.keystroke().await
    }

    /// 处理消息已发出命令
    pub async fn handle_message_sent(&self, _command: MessageSentCommand) -> Result<()> {
        self.typing_service.message_sent().await
    }
}

/// 在线状态查询处理器
pub struct PresenceQueryHandler {
    presence_service: Arc<PresenceDomainService>,
    typing_service: Arc<TypingDomainService>,
}

impl PresenceQueryHandler {
    pub fn new(
        presence_service: Arc<PresenceDomainService>,
        typing_service: Arc<TypingDomainService>,
    ) -> Self {
        Self {
            presence_service,
            typing_service,
        }
    }

    /// 处理在线状态查询
    pub async fn handle_is_online(&self, query: IsOnlineQuery) -> bool {
        self.presence_service.is_online(query.user_id).await
    }

    /// 处理在线人数查询
    pub async fn handle_online_count(&self, _query: OnlineCountQuery) -> usize {
        self.presence_service.online_count().await
    }

    /// 处理输入者列表查询
    pub async fn handle_typists(&self, _query: TypistsQuery) -> Vec<String> {
        self.typing_service.typists().await
    }
}

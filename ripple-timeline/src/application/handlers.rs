use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::application::commands::{
    ActivateScopeCommand, DeleteMessageCommand, EditMessageCommand, MarkScopeReadCommand,
    PostSignalCommand, SendMessageCommand, SendReplyCommand, ToggleReactionCommand,
    WatchScopeCommand,
};
use crate::application::queries::{
    ReactionTallyQuery, ReplyCountQuery, TimelineQuery, UnreadCountQuery,
};
use crate::domain::model::{CachedMessage, ReactionTally};
use crate::domain::service::TimelineDomainService;

/// 时间线命令处理器
pub struct TimelineCommandHandler {
    domain_service: Arc<TimelineDomainService>,
}

impl TimelineCommandHandler {
    pub fn new(domain_service: Arc<TimelineDomainService>) -> Self {
        Self { domain_service }
    }

    /// 处理激活作用域命令
    pub async fn handle_activate_scope(&self, command: ActivateScopeCommand) -> Result<()> {
        debug!(scope = %command.scope, "Handling activate scope command");

        self.domain_service.activate_scope(command.scope).await?;

        info!(scope = %command.scope, "Scope activated");
        Ok(())
    }

    /// 处理发送消息命令
    pub async fn handle_send_message(&self, command: SendMessageCommand) -> Result<()> {
        debug!(
            scope = %command.scope,
            length = command.body.len(),
            "Handling send message command"
        );

        self.domain_service
            .send_message(command.scope, &command.body)
            .await
    }

    /// 处理话题回复命令
    pub async fn handle_send_reply(&self, command: SendReplyCommand) -> Result<()> {
        debug!(
            channel_id = %command.channel_id,
            parent_id = %command.parent_id,
            "Handling send reply command"
        );

        self.domain_service
            .send_reply(command.channel_id, command.parent_id, &command.body)
            .await
    }

    /// 处理编辑消息命令
    pub async fn handle_edit_message(&self, command: EditMessageCommand) -> Result<()> {
        debug!(
            scope = %command.scope,
            message_id = %command.message_id,
            "Handling edit message command"
        );

        self.domain_service
            .edit_message(command.scope, command.message_id, &command.body)
            .await
    }

    /// 处理软删除消息命令
    pub async fn handle_delete_message(&self, command: DeleteMessageCommand) -> Result<()> {
        debug!(
            scope = %command.scope,
            message_id = %command.message_id,
            "Handling delete message command"
        );

        self.domain_service
            .delete_message(command.scope, command.message_id)
            .await
    }

    /// 处理切换表情回应命令
    pub async fn handle_toggle_reaction(&self, command: ToggleReactionCommand) -> Result<()> {
        debug!(
            message_id = %command.message_id,
            emoji = %command.emoji,
            "Handling toggle reaction command"
        );

        self.domain_service
            .toggle_reaction(command.message_id, &command.emoji)
            .await
    }

    /// 处理标记已读命令
    pub async fn handle_mark_read(&self, command: MarkScopeReadCommand) -> Result<()> {
        debug!(scope = %command.scope, "Handling mark read command");

        self.domain_service.mark_read(command.scope);
        Ok(())
    }

    /// 处理注册未读轮询命令
    pub async fn handle_watch_scope(&self, command: WatchScopeCommand) -> Result<()> {
        debug!(scope = %command.scope, "Handling watch scope command");

        self.domain_service.watch_scope(command.scope);
        Ok(())
    }

    /// 处理写入 signal 命令
    pub async fn handle_post_signal(&self, command: PostSignalCommand) -> Result<()> {
        debug!(channel_id = %command.channel_id, "Handling post signal command");

        self.domain_service
            .post_signal(command.channel_id, &command.body)
            .await
    }
}

/// 时间线查询处理器
pub struct TimelineQueryHandler {
    domain_service: Arc<TimelineDomainService>,
}

impl TimelineQueryHandler {
    pub fn new(domain_service: Arc<TimelineDomainService>) -> Self {
        Self { domain_service }
    }

    /// 处理消息列表查询
    pub async fn handle_timeline(&self, query: TimelineQuery) -> Vec<CachedMessage> {
        self.domain_service.messages(query.scope).await
    }

    /// 处理回复数查询
    pub async fn handle_reply_count(&self, query: ReplyCountQuery) -> usize {
        self.domain_service.reply_count(query.parent_id).await
    }

    /// 处理表情回应聚合查询
    pub async fn handle_reaction_tallies(&self, query: ReactionTallyQuery) -> Vec<ReactionTally> {
        self.domain_service.reaction_tallies(query.message_id).await
    }

    /// 处理未读数查询
    pub async fn handle_unread_count(&self, query: UnreadCountQuery) -> usize {
        self.domain_service.unread_count(query.scope)
    }
}

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::application::commands::{
    AcceptInvitationCommand, CreateChannelCommand, DeclineInvitationCommand, InviteMemberCommand,
    LoadChannelsCommand,
};
use crate::application::queries::{
    ChannelsQuery, DefaultChannelQuery, MembersQuery, PendingInvitationsQuery,
};
use crate::domain::model::{ChannelRow, InvitationRow, MemberProfile};
use crate::domain::service::{
    ChannelDirectoryService, InvitationService, MemberDirectoryService,
};

/// 目录命令处理器
pub struct RosterCommandHandler {
    channel_service: Arc<ChannelDirectoryService>,
    invitation_service: Arc<InvitationService>,
    viewer: uuid::Uuid,
}

impl RosterCommandHandler {
    pub fn new(
        channel_service: Arc<ChannelDirectoryService>,
        invitation_service: Arc<InvitationService>,
        viewer: uuid::Uuid,
    ) -> Self {
        Self {
            channel_service,
            invitation_service,
            viewer,
        }
    }

    /// 处理加载频道目录命令
    pub async fn handle_load_channels(&self, command: LoadChannelsCommand) -> Result<()> {
        debug!(workspace_id = %command.workspace_id, "Handling load channels command");

        self.channel_service
            .load_channels(command.workspace_id)
            .await
    }

    /// 处理创建频道命令
    pub async fn handle_create_channel(&self, command: CreateChannelCommand) -> Result<ChannelRow> {
        debug!(name = %command.name, "Handling create channel command");

        self.channel_service
            .create_channel(&command.name, self.viewer)
            .await
    }

    /// 处理发出邀请命令
    pub async fn handle_invite_member(&self, command: InviteMemberCommand) -> Result<InvitationRow> {
        debug!(workspace_id = %command.workspace_id, "Handling invite member command");

        self.invitation_service
            .invite(command.workspace_id, &command.email)
            .await
    }

    /// 处理接受邀请命令
    pub async fn handle_accept_invitation(&self, command: AcceptInvitationCommand) -> Result<()> {
        debug!(invitation_id = %command.invitation.id, "Handling accept invitation command");

        self.invitation_service.accept(&command.invitation).await
    }

    /// 处理谢绝邀请命令
    pub async fn handle_decline_invitation(&self, command: DeclineInvitationCommand) -> Result<()> {
        debug!(invitation_id = %command.invitation.id, "Handling decline invitation command");

        self.invitation_service.decline(&command.invitation).await
    }
}

/// 目录查询处理器
pub struct RosterQueryHandler {
    channel_service: Arc<ChannelDirectoryService>,
    member_service: Arc<MemberDirectoryService>,
    invitation_service: Arc<InvitationService>,
}

impl RosterQueryHandler {
    pub fn new(
        channel_service: Arc<ChannelDirectoryService>,
        member_service: Arc<MemberDirectoryService>,
        invitation_service: Arc<InvitationService>,
    ) -> Self {
        Self {
            channel_service,
            member_service,
            invitation_service,
        }
    }

    /// 处理频道目录查询
    pub async fn handle_channels(&self, _query: ChannelsQuery) -> Vec<ChannelRow> {
        self.channel_service.channels().await
    }

    /// 处理默认频道查询
    pub async fn handle_default_channel(&self, _query: DefaultChannelQuery) -> Option<ChannelRow> {
        self.channel_service.default_channel().await
    }

    /// 处理成员名录查询
    pub async fn handle_members(&self, query: MembersQuery) -> Result<Vec<MemberProfile>> {
        let members = self
            .member_service
            .members(query.workspace_id, &query.online)
            .await?;
        if query.search.is_empty() {
            return Ok(members);
        }
        Ok(MemberDirectoryService::search(&members, &query.search)
            .into_iter()
            .cloned()
            .collect())
    }

    /// 处理待处理邀请查询
    pub async fn handle_pending_invitations(
        &self,
        _query: PendingInvitationsQuery,
    ) -> Result<Vec<InvitationRow>> {
        self.invitation_service.pending().await
    }
}

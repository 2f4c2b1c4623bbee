//! Wire 风格的依赖注入模块

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use ripple_sync_core::gateway::{DataGateway, RealtimeGateway};
use ripple_sync_core::notify::Notifier;

use crate::application::handlers::{RosterCommandHandler, RosterQueryHandler};
use crate::domain::service::{
    ChannelDirectoryService, InvitationService, MemberDirectoryService, ProfileDirectory,
};
use crate::infrastructure::persistence::{
    GatewayChannelRepository, GatewayInvitationRepository, GatewayMemberRepository,
    GatewayProfileRepository, GatewaySignalPublisher,
};

/// 目录应用上下文 - 包含所有已初始化的服务
pub struct RosterContext {
    pub command_handler: RosterCommandHandler,
    pub query_handler: RosterQueryHandler,
    pub channel_service: Arc<ChannelDirectoryService>,
    pub member_service: Arc<MemberDirectoryService>,
    pub profile_directory: Arc<ProfileDirectory>,
    pub invitation_service: Arc<InvitationService>,
}

/// 构建目录应用上下文
///
/// # 参数
/// * `viewer` - 当前用户
/// * `viewer_email` - 当前用户邮箱（邀请匹配与展示名兜底）
/// * `viewer_name` - 当前用户展示名（加入 signal 文案）
pub fn initialize(
    viewer: Uuid,
    viewer_email: &str,
    viewer_name: &str,
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
    notifier: Notifier,
) -> Result<RosterContext> {
    // 1. 仓储
    let channel_repo = Arc::new(GatewayChannelRepository::new(
        Arc::clone(&data),
        Arc::clone(&realtime),
    ));
    let member_repo = Arc::new(GatewayMemberRepository::new(Arc::clone(&data)));
    let profile_repo = Arc::new(GatewayProfileRepository::new(Arc::clone(&data)));
    let invitation_repo = Arc::new(GatewayInvitationRepository::new(Arc::clone(&data)));
    let signals = Arc::new(GatewaySignalPublisher::new(Arc::clone(&data), viewer));

    // 2. 领域服务
    let channel_service = ChannelDirectoryService::new(channel_repo, notifier.clone());
    let member_service = Arc::new(MemberDirectoryService::new(
        Arc::clone(&member_repo) as Arc<dyn crate::domain::repository::MemberRepository>,
        Arc::clone(&profile_repo) as Arc<dyn crate::domain::repository::ProfileRepository>,
    ));
    let profile_directory = Arc::new(ProfileDirectory::new(
        Arc::clone(&profile_repo) as Arc<dyn crate::domain::repository::ProfileRepository>,
    ));
    let invitation_service = Arc::new(InvitationService::new(
        invitation_repo,
        member_repo,
        signals,
        notifier,
        viewer,
        viewer_email,
        viewer_name,
    ));

    // 3. 应用处理器
    let command_handler = RosterCommandHandler::new(
        Arc::clone(&channel_service),
        Arc::clone(&invitation_service),
        viewer,
    );
    let query_handler = RosterQueryHandler::new(
        Arc::clone(&channel_service),
        Arc::clone(&member_service),
        Arc::clone(&invitation_service),
    );

    Ok(RosterContext {
        command_handler,
        query_handler,
        channel_service,
        member_service,
        profile_directory,
        invitation_service,
    })
}

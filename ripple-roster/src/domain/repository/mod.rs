use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use ripple_sync_core::gateway::Subscription;

use crate::domain::model::{ChannelRow, InvitationRow, MemberRow, ProfileRow};

/// 频道仓储接口（需要作为 trait 对象使用，保留 async-trait）
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// 拉取工作区的频道目录，按创建时间升序
    async fn list_channels(&self, workspace_id: Uuid) -> Result<Vec<ChannelRow>>;

    /// 创建频道（名称已 slug 化）
    async fn create_channel(
        &self,
        workspace_id: Uuid,
        name: &str,
        created_by: Uuid,
    ) -> Result<ChannelRow>;

    /// 订阅工作区频道表的插入事件
    async fn subscribe_channels(&self, workspace_id: Uuid) -> Result<Subscription>;
}

/// 成员仓储接口
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<MemberRow>>;

    async fn add_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<MemberRow>;
}

/// 用户资料仓储接口
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn profiles_for(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileRow>>;

    async fn profile_of(&self, user_id: Uuid) -> Result<Option<ProfileRow>>;
}

/// 邀请仓储接口
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// 某邮箱的全部待处理邀请
    async fn pending_for(&self, email: &str) -> Result<Vec<InvitationRow>>;

    async fn create_invitation(
        &self,
        workspace_id: Uuid,
        email: &str,
        invited_by: Uuid,
    ) -> Result<InvitationRow>;

    async fn set_status(
        &self,
        invitation_id: Uuid,
        status: crate::domain::model::InvitationStatus,
    ) -> Result<()>;
}

/// signal 消息发布接口（成员加入通知）
#[async_trait]
pub trait SignalPublisher: Send + Sync {
    async fn publish(&self, workspace_id: Uuid, body: &str) -> Result<()>;
}

//! 基于数据网关的目录仓储实现

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use ripple_sync_core::gateway::{
    ChangeOp, DataGateway, RealtimeGateway, SelectQuery, SubscribeSpec, Subscription, row,
};

use crate::domain::model::{ChannelRow, InvitationRow, InvitationStatus, MemberRow, ProfileRow};
use crate::domain::repository::{
    ChannelRepository, InvitationRepository, MemberRepository, ProfileRepository, SignalPublisher,
};

const CHANNELS_TABLE: &str = "channels";
const MEMBERS_TABLE: &str = "workspace_members";
const PROFILES_TABLE: &str = "profiles";
const INVITATIONS_TABLE: &str = "workspace_invitations";
const MESSAGES_TABLE: &str = "messages";

/// 网关频道仓储
pub struct GatewayChannelRepository {
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
}

impl GatewayChannelRepository {
    pub fn new(data: Arc<dyn DataGateway>, realtime: Arc<dyn RealtimeGateway>) -> Self {
        Self { data, realtime }
    }
}

#[async_trait]
impl ChannelRepository for GatewayChannelRepository {
    async fn list_channels(&self, workspace_id: Uuid) -> Result<Vec<ChannelRow>> {
        let rows = self
            .data
            .select(
                SelectQuery::table(CHANNELS_TABLE)
                    .eq("workspace_id", workspace_id)
                    .order("created_at", true),
            )
            .await
            .context("channel fetch failed")?;
        rows.iter()
            .map(|channel_row| ChannelRow::from_row(channel_row).context("malformed channel row"))
            .collect()
    }

    async fn create_channel(
        &self,
        workspace_id: Uuid,
        name: &str,
        created_by: Uuid,
    ) -> Result<ChannelRow> {
        let stored = self
            .data
            .insert(
                CHANNELS_TABLE,
                json!({
                    "workspace_id": workspace_id.to_string(),
                    "name": name,
                    "is_default": false,
                    "created_by": created_by.to_string(),
                }),
            )
            .await
            .context("channel write failed")?;
        ChannelRow::from_row(&stored).context("provider returned malformed channel row")
    }

    async fn subscribe_channels(&self, workspace_id: Uuid) -> Result<Subscription> {
        let subscription = self
            .realtime
            .subscribe(
                SubscribeSpec::all(CHANNELS_TABLE)
                    .filtered("workspace_id", workspace_id)
                    .with_ops(vec![ChangeOp::Insert]),
            )
            .await
            .context("channel subscription failed")?;
        Ok(subscription)
    }
}

/// 网关成员仓储
pub struct GatewayMemberRepository {
    data: Arc<dyn DataGateway>,
}

impl GatewayMemberRepository {
    pub fn new(data: Arc<dyn DataGateway>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl MemberRepository for GatewayMemberRepository {
    async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<MemberRow>> {
        let rows = self
            .data
            .select(SelectQuery::table(MEMBERS_TABLE).eq("workspace_id", workspace_id))
            .await
            .context("member fetch failed")?;
        rows.iter()
            .map(|member_row| MemberRow::from_row(member_row).context("malformed member row"))
            .collect()
    }

    async fn add_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<MemberRow> {
        let stored = self
            .data
            .insert(
                MEMBERS_TABLE,
                json!({
                    "workspace_id": workspace_id.to_string(),
                    "user_id": user_id.to_string(),
                    "role": "member",
                }),
            )
            .await
            .context("member write failed")?;
        MemberRow::from_row(&stored).context("provider returned malformed member row")
    }
}

/// 网关资料仓储
pub struct GatewayProfileRepository {
    data: Arc<dyn DataGateway>,
}

impl GatewayProfileRepository {
    pub fn new(data: Arc<dyn DataGateway>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ProfileRepository for GatewayProfileRepository {
    async fn profiles_for(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileRow>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .data
            .select(SelectQuery::table(PROFILES_TABLE).within(
                "user_id",
                user_ids.iter().map(|id| id.to_string()).collect(),
            ))
            .await
            .context("profile fetch failed")?;
        rows.iter()
            .map(|profile_row| ProfileRow::from_row(profile_row).context("malformed profile row"))
            .collect()
    }

    async fn profile_of(&self, user_id: Uuid) -> Result<Option<ProfileRow>> {
        let rows = self
            .data
            .select(SelectQuery::table(PROFILES_TABLE).eq("user_id", user_id).limit(1))
            .await
            .context("profile fetch failed")?;
        rows.first()
            .map(|profile_row| ProfileRow::from_row(profile_row).context("malformed profile row"))
            .transpose()
    }
}

/// 网关邀请仓储
pub struct GatewayInvitationRepository {
    data: Arc<dyn DataGateway>,
}

impl GatewayInvitationRepository {
    pub fn new(data: Arc<dyn DataGateway>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl InvitationRepository for GatewayInvitationRepository {
    async fn pending_for(&self, email: &str) -> Result<Vec<InvitationRow>> {
        let rows = self
            .data
            .select(
                SelectQuery::table(INVITATIONS_TABLE)
                    .eq("invited_email", email)
                    .eq("status", "pending"),
            )
            .await
            .context("invitation fetch failed")?;
        rows.iter()
            .map(|invitation_row| {
                InvitationRow::from_row(invitation_row).context("malformed invitation row")
            })
            .collect()
    }

    async fn create_invitation(
        &self,
        workspace_id: Uuid,
        email: &str,
        invited_by: Uuid,
    ) -> Result<InvitationRow> {
        let stored = self
            .data
            .insert(
                INVITATIONS_TABLE,
                json!({
                    "workspace_id": workspace_id.to_string(),
                    "invited_email": email,
                    "invited_by": invited_by.to_string(),
                    "status": "pending",
                }),
            )
            .await
            .context("invitation write failed")?;
        InvitationRow::from_row(&stored).context("provider returned malformed invitation row")
    }

    async fn set_status(&self, invitation_id: Uuid, status: InvitationStatus) -> Result<()> {
        self.data
            .update(INVITATIONS_TABLE, invitation_id, json!({ "status": status }))
            .await
            .context("invitation status update failed")?;
        Ok(())
    }
}

/// 网关 signal 发布器（成员加入通知）
pub struct GatewaySignalPublisher {
    data: Arc<dyn DataGateway>,
    actor: Uuid,
}

impl GatewaySignalPublisher {
    pub fn new(data: Arc<dyn DataGateway>, actor: Uuid) -> Self {
        Self { data, actor }
    }
}

#[async_trait]
impl SignalPublisher for GatewaySignalPublisher {
    async fn publish(&self, workspace_id: Uuid, body: &str) -> Result<()> {
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
        let channel_id = rows
            .first()
            .and_then(row::row_id)
            .ok_or_else(|| anyhow!("workspace {} has no default channel", workspace_id))?;

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

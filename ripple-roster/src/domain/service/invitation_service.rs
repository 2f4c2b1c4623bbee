//! 邀请流程领域服务
//!
//! 邀请按邮箱投递；接受邀请时写入成员关系、更新邀请状态，
//! 并向该工作区默认频道写入加入 signal

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{info, warn};
use uuid::Uuid;

use ripple_sync_core::notify::Notifier;
use ripple_sync_core::utils::is_valid_email;

use crate::domain::model::{InvitationRow, InvitationStatus};
use crate::domain::repository::{InvitationRepository, MemberRepository, SignalPublisher};

/// 邀请领域服务
pub struct InvitationService {
    invitation_repo: Arc<dyn InvitationRepository>,
    member_repo: Arc<dyn MemberRepository>,
    signals: Arc<dyn SignalPublisher>,
    notifier: Notifier,
    self_id: Uuid,
    self_email: String,
    self_name: String,
}

impl InvitationService {
    pub fn new(
        invitation_repo: Arc<dyn InvitationRepository>,
        member_repo: Arc<dyn MemberRepository>,
        signals: Arc<dyn SignalPublisher>,
        notifier: Notifier,
        self_id: Uuid,
        self_email: impl Into<String>,
        self_name: impl Into<String>,
    ) -> Self {
        Self {
            invitation_repo,
            member_repo,
            signals,
            notifier,
            self_id,
            self_email: self_email.into(),
            self_name: self_name.into(),
        }
    }

    /// 当前用户的待处理邀请
    pub async fn pending(&self) -> Result<Vec<InvitationRow>> {
        self.invitation_repo.pending_for(&self.self_email).await
    }

    /// 向某邮箱发出工作区邀请
    pub async fn invite(&self, workspace_id: Uuid, email: &str) -> Result<InvitationRow> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            self.notifier.error("Please enter a valid email address");
            return Err(anyhow!("invalid email address"));
        }
        if email == self.self_email.to_lowercase() {
            self.notifier.error("You can't invite yourself");
            return Err(anyhow!("cannot invite yourself"));
        }

        let invitation = self
            .invitation_repo
            .create_invitation(workspace_id, &email, self.self_id)
            .await
            .map_err(|e| {
                self.notifier.error("Failed to send invitation");
                e
            })?;

        self.notifier.success("Invitation sent!");
        info!(workspace_id = %workspace_id, "invitation created");
        Ok(invitation)
    }

    /// 接受邀请：加入成员、更新状态、写入加入 signal
    pub async fn accept(&self, invitation: &InvitationRow) -> Result<()> {
        self.member_repo
            .add_member(invitation.workspace_id, self.self_id)
            .await
            .map_err(|e| {
                self.notifier.error("Failed to accept invitation");
                e
            })?;

        self.invitation_repo
            .set_status(invitation.id, InvitationStatus::Accepted)
            .await?;

        let body = format!("👋 Signal: {} joined the workspace!", self.self_name);
        if let Err(e) = self.signals.publish(invitation.workspace_id, &body).await {
            warn!(workspace_id = %invitation.workspace_id, error = %e, "join signal failed");
        }

        self.notifier.success("Joined the workspace!");
        info!(workspace_id = %invitation.workspace_id, "invitation accepted");
        Ok(())
    }

    /// 谢绝邀请
    pub async fn decline(&self, invitation: &InvitationRow) -> Result<()> {
        self.invitation_repo
            .set_status(invitation.id, InvitationStatus::Declined)
            .await?;
        self.notifier.info("Invitation declined");
        Ok(())
    }
}

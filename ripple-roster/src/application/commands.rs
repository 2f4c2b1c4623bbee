use uuid::Uuid;

use crate::domain::model::InvitationRow;

/// 加载频道目录命令
#[derive(Debug, Clone)]
pub struct LoadChannelsCommand {
    pub workspace_id: Uuid,
}

/// 创建频道命令
#[derive(Debug, Clone)]
pub struct CreateChannelCommand {
    pub name: String,
}

/// 发出邀请命令
#[derive(Debug, Clone)]
pub struct InviteMemberCommand {
    pub workspace_id: Uuid,
    pub email: String,
}

/// 接受邀请命令
#[derive(Debug, Clone)]
pub struct AcceptInvitationCommand {
    pub invitation: InvitationRow,
}

/// 谢绝邀请命令
#[derive(Debug, Clone)]
pub struct DeclineInvitationCommand {
    pub invitation: InvitationRow,
}

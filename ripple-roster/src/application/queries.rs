use std::collections::HashSet;

use uuid::Uuid;

/// 频道目录查询
#[derive(Debug, Clone)]
pub struct ChannelsQuery;

/// 默认频道查询
#[derive(Debug, Clone)]
pub struct DefaultChannelQuery;

/// 成员名录查询
#[derive(Debug, Clone)]
pub struct MembersQuery {
    pub workspace_id: Uuid,
    /// 当前在线的用户集合（由在线状态服务提供）
    pub online: HashSet<Uuid>,
    /// 用户名过滤，空串表示不过滤
    pub search: String,
}

/// 待处理邀请查询
#[derive(Debug, Clone)]
pub struct PendingInvitationsQuery;

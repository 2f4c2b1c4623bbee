use uuid::Uuid;

use crate::domain::model::ScopeKey;

/// 作用域消息列表查询
#[derive(Debug, Clone)]
pub struct TimelineQuery {
    pub scope: ScopeKey,
}

/// 话题回复数查询
#[derive(Debug, Clone)]
pub struct ReplyCountQuery {
    pub parent_id: Uuid,
}

/// 表情回应聚合查询
#[derive(Debug, Clone)]
pub struct ReactionTallyQuery {
    pub message_id: Uuid,
}

/// 未读数查询
#[derive(Debug, Clone)]
pub struct UnreadCountQuery {
    pub scope: ScopeKey,
}

use uuid::Uuid;

/// 用户在线状态查询
#[derive(Debug, Clone)]
pub struct IsOnlineQuery {
    pub user_id: Uuid,
}

/// 在线人数查询
#[derive(Debug, Clone)]
pub struct OnlineCountQuery;

/// 正在输入的用户列表查询
#[derive(Debug, Clone)]
pub struct TypistsQuery;

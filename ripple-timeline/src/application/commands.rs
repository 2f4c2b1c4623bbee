use uuid::Uuid;

use crate::domain::model::ScopeKey;

/// 激活作用域命令
#[derive(Debug, Clone)]
pub struct ActivateScopeCommand {
    pub scope: ScopeKey,
}

/// 发送消息命令
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub scope: ScopeKey,
    pub body: String,
}

/// 话题回复命令
#[derive(Debug, Clone)]
pub struct SendReplyCommand {
    pub channel_id: Uuid,
    pub parent_id: Uuid,
    pub body: String,
}

/// 编辑消息命令
#[derive(Debug, Clone)]
pub struct EditMessageCommand {
    pub scope: ScopeKey,
    pub message_id: Uuid,
    pub body: String,
}

/// 软删除消息命令
#[derive(Debug, Clone)]
pub struct DeleteMessageCommand {
    pub scope: ScopeKey,
    pub message_id: Uuid,
}

/// 切换表情回应命令
#[derive(Debug, Clone)]
pub struct ToggleReactionCommand {
    pub message_id: Uuid,
    pub emoji: String,
}

/// 标记作用域已读命令
#[derive(Debug, Clone)]
pub struct MarkScopeReadCommand {
    pub scope: ScopeKey,
}

/// 注册作用域进入未读轮询命令
#[derive(Debug, Clone)]
pub struct WatchScopeCommand {
    pub scope: ScopeKey,
}

/// 写入系统 signal 消息命令
#[derive(Debug, Clone)]
pub struct PostSignalCommand {
    pub channel_id: Uuid,
    pub body: String,
}

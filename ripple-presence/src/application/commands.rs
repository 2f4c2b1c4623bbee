use uuid::Uuid;

/// 加入工作区在线状态命令
#[derive(Debug, Clone)]
pub struct JoinWorkspaceCommand {
    pub workspace_id: Uuid,
}

/// 离开工作区在线状态命令
#[derive(Debug, Clone)]
pub struct LeaveWorkspaceCommand;

/// 加入聊天作用域输入提示组命令
#[derive(Debug, Clone)]
pub struct JoinTypingScopeCommand {
    pub scope: String,
}

/// 离开输入提示组命令
#[derive(Debug, Clone)]
pub struct LeaveTypingScopeCommand;

/// 本地按键命令
#[derive(Debug, Clone)]
pub struct KeystrokeCommand;

/// 消息已发出命令（显式停止输入提示）
#[derive(Debug, Clone)]
pub struct MessageSentCommand;

//! Wire 风格的依赖注入模块

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use ripple_sync_core::config::RippleAppConfig;
use ripple_sync_core::gateway::PresenceGateway;

use crate::application::handlers::{PresenceCommandHandler, PresenceQueryHandler};
use crate::domain::model::PresenceDomainConfig;
use crate::domain::service::{PresenceDomainService, TypingDomainService};

/// 在线状态应用上下文 - 包含所有已初始化的服务
pub struct PresenceContext {
    pub command_handler: PresenceCommandHandler,
    pub query_handler: PresenceQueryHandler,
    pub presence_service: Arc<PresenceDomainService>,
    pub typing_service: Arc<TypingDomainService>,
}

/// 构建在线状态应用上下文
///
/// # 参数
/// * `self_id` - 当前用户
/// * `username` - 当前用户展示名（输入提示宣告携带）
/// * `app_config` - 应用配置
/// * `gateway` - 在线状态网关
pub fn initialize(
    self_id: Uuid,
    username: &str,
    app_config: &RippleAppConfig,
    gateway: Arc<dyn PresenceGateway>,
) -> Result<PresenceContext> {
    let domain_config = PresenceDomainConfig::from_app_config(app_config);

    let presence_service = PresenceDomainService::new(self_id, Arc::clone(&gateway));
    let typing_service = TypingDomainService::new(
        self_id,
        username,
        gateway,
        domain_config.typing_timeout,
    );

    let command_handler = PresenceCommandHandler::new(
        Arc::clone(&presence_service),
        Arc::clone(&typing_service),
    );
    let query_handler = PresenceQueryHandler::new(
        Arc::clone(&presence_service),
        Arc::clone(&typing_service),
    );

    Ok(PresenceContext {
        command_handler,
        query_handler,
        presence_service,
        typing_service,
    })
}

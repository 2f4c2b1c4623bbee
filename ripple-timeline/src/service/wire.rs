//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建时间线服务的全部组件

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use uuid::Uuid;

use ripple_sync_core::config::RippleAppConfig;
use ripple_sync_core::gateway::{DataGateway, RealtimeGateway};
use ripple_sync_core::notify::Notifier;

use crate::application::handlers::{TimelineCommandHandler, TimelineQueryHandler};
use crate::domain::model::TimelineDomainConfig;
use crate::domain::service::TimelineDomainService;
use crate::infrastructure::persistence::{
    GatewayMessageRepository, GatewayProfileResolver, GatewayReactionRepository,
};

/// 时间线应用上下文 - 包含所有已初始化的服务
pub struct TimelineContext {
    pub command_handler: TimelineCommandHandler,
    pub query_handler: TimelineQueryHandler,
    pub domain_service: Arc<TimelineDomainService>,
    /// 未读数轮询任务句柄，随上下文一同存活
    pub unread_poller: JoinHandle<()>,
}

impl Drop for TimelineContext {
    fn drop(&mut self) {
        self.unread_poller.abort();
    }
}

/// 构建时间线应用上下文
///
/// # 参数
/// * `viewer` - 当前查看者
/// * `app_config` - 应用配置
/// * `data` - 数据网关
/// * `realtime` - 变更订阅网关
/// * `notifier` - 瞬时通知发布器
pub fn initialize(
    viewer: Uuid,
    app_config: &RippleAppConfig,
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
    notifier: Notifier,
) -> Result<TimelineContext> {
    // 1. 领域配置
    let domain_config = TimelineDomainConfig::from_app_config(app_config);

    // 2. 仓储与资料解析器
    let message_repo = Arc::new(GatewayMessageRepository::new(
        Arc::clone(&data),
        Arc::clone(&realtime),
    ));
    let reaction_repo = Arc::new(GatewayReactionRepository::new(
        Arc::clone(&data),
        Arc::clone(&realtime),
    ));
    let profile_resolver = Arc::new(GatewayProfileResolver::new(Arc::clone(&data)));

    // 3. 领域服务
    let domain_service = TimelineDomainService::new(
        viewer,
        message_repo,
        reaction_repo,
        profile_resolver,
        domain_config,
        notifier,
    );

    // 4. 未读数轮询
    let unread_poller = domain_service
        .spawn_unread_poller(Duration::from_secs(app_config.sync.unread_poll_interval_secs));

    // 5. 应用处理器
    let command_handler = TimelineCommandHandler::new(Arc::clone(&domain_service));
    let query_handler = TimelineQueryHandler::new(Arc::clone(&domain_service));

    Ok(TimelineContext {
        command_handler,
        query_handler,
        domain_service,
        unread_poller,
    })
}

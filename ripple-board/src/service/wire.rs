//! Wire 风格的依赖注入模块

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use ripple_sync_core::gateway::{DataGateway, RealtimeGateway};
use ripple_sync_core::notify::Notifier;

use crate::application::handlers::{BoardCommandHandler, BoardQueryHandler};
use crate::domain::service::BoardDomainService;
use crate::infrastructure::persistence::{GatewaySignalPublisher, GatewayTaskRepository};

/// 看板应用上下文 - 包含所有已初始化的服务
pub struct BoardContext {
    pub command_handler: BoardCommandHandler,
    pub query_handler: BoardQueryHandler,
    pub domain_service: Arc<BoardDomainService>,
}

/// 构建看板应用上下文
pub fn initialize(
    viewer: Uuid,
    data: Arc<dyn DataGateway>,
    realtime: Arc<dyn RealtimeGateway>,
    notifier: Notifier,
) -> Result<BoardContext> {
    let task_repo = Arc::new(GatewayTaskRepository::new(
        Arc::clone(&data),
        Arc::clone(&realtime),
    ));
    let signals = Arc::new(GatewaySignalPublisher::new(Arc::clone(&data), viewer));

    let domain_service = BoardDomainService::new(task_repo, signals, notifier);

    let command_handler = BoardCommandHandler::new(Arc::clone(&domain_service), viewer);
    let query_handler = BoardQueryHandler::new(Arc::clone(&domain_service));

    Ok(BoardContext {
        command_handler,
        query_handler,
        domain_service,
    })
}

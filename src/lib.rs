//! Ripple Sync Core 公共库
//!
//! 提供统一的配置加载、错误类型、外部数据网关契约与指标收集功能

pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod notify;
pub mod tracing;
pub mod utils;

pub use config::{
    LoggingConfig, ProviderConfig, RippleAppConfig, SyncTuningConfig, app_config, load_config,
    load_config_with_validation,
};
pub use error::*;
pub use gateway::{
    ChangeEvent, ChangeOp, DataGateway, PresenceChannel, PresenceGateway, PresenceHandle,
    PresenceSnapshot, RealtimeGateway, Row, SelectQuery, SubscribeSpec, Subscription,
    SubscriptionHandle, memory::MemoryGateway,
};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use utils::*;

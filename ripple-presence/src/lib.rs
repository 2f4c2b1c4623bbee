//! 在线状态与输入提示同步服务
//!
//! 在线状态完全由提供方推送的全量快照驱动，没有定时过期；
//! 输入提示由发送端的本地定时器负责撤回，观察端只消费最新快照

pub mod application;
pub mod domain;
pub mod service;

pub use application::{PresenceCommandHandler, PresenceQueryHandler};
pub use domain::model::{PresenceDomainConfig, PresenceUpdate, TypingAnnouncement};
pub use domain::service::{PresenceDomainService, TypingDomainService};
pub use service::{PresenceContext, initialize};

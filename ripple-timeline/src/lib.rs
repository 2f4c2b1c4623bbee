//! 消息时间线同步服务
//!
//! 维护各聊天作用域（频道/私聊/话题）的本地有序消息缓存，
//! 将提供方推送的行级变更事件折叠进缓存，并派生回复数、
//! 表情回应聚合与未读数等二级视图

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::{TimelineCommandHandler, TimelineQueryHandler};
pub use domain::model::{
    CachedMessage, DELETED_PLACEHOLDER, MessageDraft, MessageOrigin, MessageRow, ReactionRow,
    ReactionTally, ScopeKey, TimelineUpdate,
};
pub use domain::service::TimelineDomainService;
pub use service::{TimelineContext, initialize};

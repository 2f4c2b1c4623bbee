//! 看板同步服务
//!
//! 看板任务的局部修补不划算（拖拽会同时影响多列），
//! 因此任何任务变更事件都触发整板重载；
//! 拖拽移动走乐观翻转 + 失败回滚，成功后向默认频道写入 signal

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::{BoardCommandHandler, BoardQueryHandler};
pub use domain::model::{BoardUpdate, TaskDraft, TaskPriority, TaskRow, TaskStatus};
pub use domain::service::BoardDomainService;
pub use service::{BoardContext, initialize};

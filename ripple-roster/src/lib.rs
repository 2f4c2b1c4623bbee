//! 工作区目录服务
//!
//! 频道目录、成员名录、用户资料缓存与邀请流程。
//! 成员在线标记由调用方传入在线集合（视图层同时持有
//! 在线状态服务），目录本身不订阅 presence

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::{RosterCommandHandler, RosterQueryHandler};
pub use domain::model::{
    ChannelRow, InvitationRow, InvitationStatus, MemberProfile, MemberRole, MemberRow, ProfileRow,
    RosterUpdate,
};
pub use domain::service::{
    ChannelDirectoryService, InvitationService, MemberDirectoryService, ProfileDirectory,
};
pub use service::{RosterContext, initialize};

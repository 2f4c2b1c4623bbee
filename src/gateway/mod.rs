//! 数据提供方网关契约
//!
//! 同步层与外部 BaaS 提供方之间的唯一边界。提供方负责存储、
//! 行级权限与实时投递；本模块只定义批量查询、写入、变更订阅
//! 与在线状态跟踪的抽象接口。
//!
//! 所有组件通过显式注入的 `Arc<dyn …Gateway>` 获得网关能力，
//! 不存在进程级单例；测试通过 [`memory::MemoryGateway`] 替换真实提供方。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::error::SyncResult;

pub mod memory;
pub mod row;

pub use memory::MemoryGateway;

/// 提供方的一行数据，以 JSON 对象跨越网关边界
///
/// 类型化的解析发生在各服务的 infrastructure 适配层
pub type Row = serde_json::Value;

/// 变更操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Insert => "insert",
            ChangeOp::Update => "update",
            ChangeOp::Delete => "delete",
        }
    }
}

/// 单条变更事件：操作类型 + 行快照
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub row: Row,
}

/// 批量查询描述
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub table: String,
    /// 等值过滤（列名，值的字符串形式）
    pub eq: Vec<(String, String)>,
    /// IN 过滤（列名，候选值集合）
    pub within: Option<(String, Vec<String>)>,
    /// 严格大于过滤（列名，时间戳），用于未读数重算
    pub after: Option<(String, DateTime<Utc>)>,
    /// 排序键（列名，是否升序）
    pub order_by: Option<(String, bool)>,
    /// 返回条数上限
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            eq: Vec::new(),
            within: None,
            after: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.eq.push((column.into(), value.to_string()));
        self
    }

    pub fn within(mut self, column: impl Into<String>, values: Vec<String>) -> Self {
        self.within = Some((column.into(), values));
        self
    }

    pub fn after(mut self, column: impl Into<String>, ts: DateTime<Utc>) -> Self {
        self.after = Some((column.into(), ts));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some((column.into(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 变更订阅描述
#[derive(Debug, Clone)]
pub struct SubscribeSpec {
    pub table: String,
    /// 等值过滤（列名，值的字符串形式）
    pub filter: Option<(String, String)>,
    /// 关注的操作类型，None 表示全部
    pub ops: Option<Vec<ChangeOp>>,
}

impl SubscribeSpec {
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            ops: None,
        }
    }

    pub fn inserts(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            ops: Some(vec![ChangeOp::Insert]),
        }
    }

    pub fn filtered(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter = Some((column.into(), value.to_string()));
        self
    }

    pub fn with_ops(mut self, ops: Vec<ChangeOp>) -> Self {
        self.ops = Some(ops);
        self
    }

    fn wants(&self, op: ChangeOp) -> bool {
        match &self.ops {
            Some(ops) => ops.contains(&op),
            None => true,
        }
    }
}

/// 订阅句柄，负责在释放时注销订阅
///
/// 句柄随作用域退出自动释放（scoped acquisition），
/// 也可以通过 [`SubscriptionHandle::release`] 显式释放
pub struct SubscriptionHandle {
    id: u64,
    releaser: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(id: u64, releaser: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            id,
            releaser: Some(releaser),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 显式释放订阅
    pub fn release(mut self) {
        self.run_releaser();
    }

    fn run_releaser(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            debug!(subscription_id = self.id, "releasing subscription");
            releaser();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.run_releaser();
    }
}

/// 活动的变更订阅：事件接收端 + 释放句柄
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    handle: SubscriptionHandle,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<ChangeEvent>, handle: SubscriptionHandle) -> Self {
        Self { events, handle }
    }

    /// 接收下一条变更事件，订阅被注销后返回 None
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    /// 显式释放订阅
    pub fn release(self) {
        self.handle.release();
    }
}

/// 在线状态全量快照
///
/// 提供方在成员集合变化时推送完整成员表，本地状态以最新快照为准
#[derive(Debug, Clone, Default)]
pub struct PresenceSnapshot {
    /// 成员键 → 附加元数据
    pub members: HashMap<Uuid, Row>,
}

impl PresenceSnapshot {
    pub fn keys(&self) -> HashSet<Uuid> {
        self.members.keys().copied().collect()
    }

    pub fn contains(&self, key: &Uuid) -> bool {
        self.members.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// 在线状态操作句柄
#[async_trait]
pub trait PresenceHandle: Send + Sync {
    /// 宣告/刷新本客户端在该作用域的存在（携带元数据）
    async fn track(&self, meta: Row) -> SyncResult<()>;

    /// 撤回本客户端的存在宣告
    async fn untrack(&self) -> SyncResult<()>;
}

/// 已加入的在线状态作用域：快照接收端 + 操作句柄 + 释放守卫
///
/// 离开作用域（drop）会注销观察者并撤回自己的宣告
pub struct PresenceChannel {
    snapshots: mpsc::Receiver<PresenceSnapshot>,
    handle: Arc<dyn PresenceHandle>,
    guard: SubscriptionHandle,
}

impl PresenceChannel {
    pub fn new(
        snapshots: mpsc::Receiver<PresenceSnapshot>,
        handle: Arc<dyn PresenceHandle>,
        guard: SubscriptionHandle,
    ) -> Self {
        Self {
            snapshots,
            handle,
            guard,
        }
    }

    /// 接收下一份全量快照
    pub async fn recv(&mut self) -> Option<PresenceSnapshot> {
        self.snapshots.recv().await
    }

    pub fn handle(&self) -> Arc<dyn PresenceHandle> {
        Arc::clone(&self.handle)
    }

    pub fn id(&self) -> u64 {
        self.guard.id()
    }

    /// 显式离开作用域
    pub fn leave(self) {
        self.guard.release();
    }

    /// 拆分为操作句柄与快照接收端（供事件泵独占接收端）
    pub fn into_parts(
        self,
    ) -> (
        Arc<dyn PresenceHandle>,
        mpsc::Receiver<PresenceSnapshot>,
        SubscriptionHandle,
    ) {
        (self.handle, self.snapshots, self.guard)
    }
}

/// 批量查询与写入接口
///
/// 提供方负责分配行 ID 与创建时间戳；写入失败属于瞬时错误，
/// 调用方不得据此修改本地缓存
#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn select(&self, query: SelectQuery) -> SyncResult<Vec<Row>>;

    async fn insert(&self, table: &str, row: Row) -> SyncResult<Row>;

    async fn update(&self, table: &str, id: Uuid, patch: Row) -> SyncResult<Row>;

    async fn delete(&self, table: &str, id: Uuid) -> SyncResult<()>;
}

/// 变更订阅接口
///
/// 断线重连后没有事件重放，消费方必须重新批量拉取以闭合缺口
#[async_trait]
pub trait RealtimeGateway: Send + Sync {
    async fn subscribe(&self, spec: SubscribeSpec) -> SyncResult<Subscription>;
}

/// 在线状态接口
#[async_trait]
pub trait PresenceGateway: Send + Sync {
    /// 加入一个在线状态作用域
    ///
    /// 加入本身不宣告存在，需要随后调用 [`PresenceHandle::track`]
    async fn join(&self, scope: &str, self_key: Uuid) -> SyncResult<PresenceChannel>;
}

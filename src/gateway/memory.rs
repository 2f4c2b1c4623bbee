//! 内存版数据网关
//!
//! 以进程内结构模拟提供方的表存储、变更投递与在线状态跟踪，
//! 供全部测试以及嵌入式场景替换真实提供方。行为契约与真实
//! 提供方一致：行 ID 与创建时间由网关分配（调用方已提供时保留，
//! 供测试构造确定性数据）、事件缓冲溢出时直接丢弃不重放。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

use super::row::{datetime_field, field_as_match_string, row_id};
use super::{
    ChangeEvent, ChangeOp, DataGateway, PresenceChannel, PresenceGateway, PresenceHandle,
    PresenceSnapshot, RealtimeGateway, Row, SelectQuery, SubscribeSpec, Subscription,
    SubscriptionHandle,
};

const DEFAULT_EVENT_BUFFER: usize = 256;
const PRESENCE_BUFFER: usize = 32;

struct Subscriber {
    spec: SubscribeSpec,
    tx: mpsc::Sender<ChangeEvent>,
}

#[derive(Default)]
struct PresenceScopeState {
    members: HashMap<Uuid, Row>,
    watchers: HashMap<u64, mpsc::Sender<PresenceSnapshot>>,
}

struct MemoryState {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    subscribers: DashMap<u64, Subscriber>,
    presence: DashMap<String, PresenceScopeState>,
    next_id: AtomicU64,
    buffer: usize,
}

impl MemoryState {
    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// 向匹配的订阅者投递变更事件
    fn emit(&self, table: &str, op: ChangeOp, row: &Row) {
        let mut dead = Vec::new();
        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if subscriber.spec.table != table || !subscriber.spec.wants(op) {
                continue;
            }
            if let Some((column, expected)) = &subscriber.spec.filter {
                if field_as_match_string(row, column).as_deref() != Some(expected.as_str()) {
                    continue;
                }
            }
            let event = ChangeEvent {
                op,
                row: row.clone(),
            };
            match subscriber.tx.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // 缓冲溢出不重放，消费方需重新批量拉取闭合缺口
                    warn!(table = %table, subscription_id = *entry.key(), "event buffer full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*entry.key());
                }
            }
        }
        for id in dead {
            self.subscribers.remove(&id);
        }
    }

    /// 向作用域的全部观察者推送全量快照
    fn broadcast_presence(&self, scope: &str) {
        let Some(state) = self.presence.get(scope) else {
            return;
        };
        let snapshot = PresenceSnapshot {
            members: state.members.clone(),
        };
        for (watcher_id, tx) in state.watchers.iter() {
            if tx.try_send(snapshot.clone()).is_err() {
                debug!(scope = %scope, watcher_id, "presence watcher unavailable");
            }
        }
    }
}

/// 内存网关
///
/// 同时实现 [`DataGateway`]、[`RealtimeGateway`] 与 [`PresenceGateway`]
#[derive(Clone)]
pub struct MemoryGateway {
    state: Arc<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_EVENT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            state: Arc::new(MemoryState {
                tables: Mutex::new(HashMap::new()),
                subscribers: DashMap::new(),
                presence: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer,
            }),
        }
    }

    /// 当前表中的行数（测试辅助）
    pub fn table_len(&self, table: &str) -> usize {
        self.state
            .tables
            .lock()
            .map(|tables| tables.get(table).map(|rows| rows.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_query(row: &Row, query: &SelectQuery) -> bool {
    for (column, expected) in &query.eq {
        if field_as_match_string(row, column).as_deref() != Some(expected.as_str()) {
            return false;
        }
    }
    if let Some((column, candidates)) = &query.within {
        match field_as_match_string(row, column) {
            Some(value) if candidates.contains(&value) => {}
            _ => return false,
        }
    }
    if let Some((column, after)) = &query.after {
        match datetime_field(row, column) {
            Some(ts) if ts > *after => {}
            _ => return false,
        }
    }
    true
}

fn compare_rows(a: &Row, b: &Row, column: &str) -> std::cmp::Ordering {
    // 时间戳列按时间比较，其余按字符串比较
    match (datetime_field(a, column), datetime_field(b, column)) {
        (Some(ta), Some(tb)) => ta.cmp(&tb),
        _ => {
            let sa = field_as_match_string(a, column).unwrap_or_default();
            let sb = field_as_match_string(b, column).unwrap_or_default();
            sa.cmp(&sb)
        }
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn select(&self, query: SelectQuery) -> SyncResult<Vec<Row>> {
        let tables = self
            .state
            .tables
            .lock()
            .map_err(|_| SyncError::gateway("tables lock poisoned"))?;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_query(row, &query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, ascending)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare_rows(a, b, column);
                if *ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> SyncResult<Row> {
        let mut row = row;
        {
            let object = row
                .as_object_mut()
                .ok_or_else(|| SyncError::malformed(table, "insert payload must be an object"))?;
            // 提供方分配 ID 与创建时间；调用方已提供时保留
            object
                .entry("id")
                .or_insert_with(|| serde_json::Value::String(Uuid::new_v4().to_string()));
            object.entry("created_at").or_insert_with(|| {
                serde_json::Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            });
        }

        {
            let mut tables = self
                .state
                .tables
                .lock()
                .map_err(|_| SyncError::gateway("tables lock poisoned"))?;
            tables.entry(table.to_string()).or_default().push(row.clone());
        }

        self.state.emit(table, ChangeOp::Insert, &row);
        Ok(row)
    }

    async fn update(&self, table: &str, id: Uuid, patch: Row) -> SyncResult<Row> {
        let patch_object = patch
            .as_object()
            .ok_or_else(|| SyncError::malformed(table, "update payload must be an object"))?
            .clone();

        let updated = {
            let mut tables = self
                .state
                .tables
                .lock()
                .map_err(|_| SyncError::gateway("tables lock poisoned"))?;
            let rows = tables.get_mut(table).ok_or(SyncError::NotFound {
                kind: "table",
                id: table.to_string(),
            })?;
            let row = rows
                .iter_mut()
                .find(|row| row_id(row) == Some(id))
                .ok_or(SyncError::NotFound {
                    kind: "row",
                    id: id.to_string(),
                })?;
            let object = row
                .as_object_mut()
                .ok_or_else(|| SyncError::malformed(table, "stored row is not an object"))?;
            for (key, value) in patch_object {
                object.insert(key, value);
            }
            row.clone()
        };

        self.state.emit(table, ChangeOp::Update, &updated);
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: Uuid) -> SyncResult<()> {
        let removed = {
            let mut tables = self
                .state
                .tables
                .lock()
                .map_err(|_| SyncError::gateway("tables lock poisoned"))?;
            match tables.get_mut(table) {
                Some(rows) => {
                    let position = rows.iter().position(|row| row_id(row) == Some(id));
                    position.map(|index| rows.remove(index))
                }
                None => None,
            }
        };

        // 删除不存在的行是幂等操作
        if let Some(row) = removed {
            self.state.emit(table, ChangeOp::Delete, &row);
        }
        Ok(())
    }
}

#[async_trait]
impl RealtimeGateway for MemoryGateway {
    async fn subscribe(&self, spec: SubscribeSpec) -> SyncResult<Subscription> {
        let id = self.state.allocate_id();
        let (tx, rx) = mpsc::channel(self.state.buffer);
        self.state.subscribers.insert(id, Subscriber { spec, tx });

        let state = Arc::clone(&self.state);
        let handle = SubscriptionHandle::new(
            id,
            Box::new(move || {
                state.subscribers.remove(&id);
            }),
        );
        Ok(Subscription::new(rx, handle))
    }
}

struct MemoryPresenceHandle {
    state: Arc<MemoryState>,
    scope: String,
    self_key: Uuid,
}

#[async_trait]
impl PresenceHandle for MemoryPresenceHandle {
    async fn track(&self, meta: Row) -> SyncResult<()> {
        self.state
            .presence
            .entry(self.scope.clone())
            .or_default()
            .members
            .insert(self.self_key, meta);
        self.state.broadcast_presence(&self.scope);
        Ok(())
    }

    async fn untrack(&self) -> SyncResult<()> {
        let removed = self
            .state
            .presence
            .get_mut(&self.scope)
            .map(|mut scope| scope.members.remove(&self.self_key).is_some())
            .unwrap_or(false);
        if removed {
            self.state.broadcast_presence(&self.scope);
        }
        Ok(())
    }
}

#[async_trait]
impl PresenceGateway for MemoryGateway {
    async fn join(&self, scope: &str, self_key: Uuid) -> SyncResult<PresenceChannel> {
        let watcher_id = self.state.allocate_id();
        let (tx, rx) = mpsc::channel(PRESENCE_BUFFER);

        let initial = {
            let mut state = self.state.presence.entry(scope.to_string()).or_default();
            state.watchers.insert(watcher_id, tx.clone());
            PresenceSnapshot {
                members: state.members.clone(),
            }
        };

        // 加入即收到一份当前快照
        let _ = tx.try_send(initial);

        let handle = Arc::new(MemoryPresenceHandle {
            state: Arc::clone(&self.state),
            scope: scope.to_string(),
            self_key,
        });

        let state = Arc::clone(&self.state);
        let scope_name = scope.to_string();
        let guard = SubscriptionHandle::new(
            watcher_id,
            Box::new(move || {
                // 离开作用域：注销观察者并撤回自己的宣告
                let tracked = match state.presence.get_mut(&scope_name) {
                    Some(mut scope_state) => {
                        scope_state.watchers.remove(&watcher_id);
                        scope_state.members.remove(&self_key).is_some()
                    }
                    None => false,
                };
                if tracked {
                    state.broadcast_presence(&scope_name);
                }
            }),
        );

        Ok(PresenceChannel::new(rx, handle, guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn message_row(channel: &str, body: &str) -> Row {
        json!({
            "channel_id": channel,
            "body": body,
        })
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let gateway = MemoryGateway::new();
        let stored = gateway
            .insert("messages", message_row("c1", "hello"))
            .await
            .expect("insert should succeed");
        assert!(row_id(&stored).is_some());
        assert!(datetime_field(&stored, "created_at").is_some());
    }

    #[tokio::test]
    async fn subscription_receives_filtered_inserts() {
        let gateway = MemoryGateway::new();
        let mut subscription = gateway
            .subscribe(SubscribeSpec::inserts("messages").filtered("channel_id", "c1"))
            .await
            .expect("subscribe should succeed");

        gateway
            .insert("messages", message_row("c2", "other scope"))
            .await
            .expect("insert");
        gateway
            .insert("messages", message_row("c1", "mine"))
            .await
            .expect("insert");

        let event = subscription.recv().await.expect("event should arrive");
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(
            event.row.get("body").and_then(|v| v.as_str()),
            Some("mine")
        );
    }

    #[tokio::test]
    async fn update_merges_patch_and_emits() {
        let gateway = MemoryGateway::new();
        let stored = gateway
            .insert("messages", message_row("c1", "original"))
            .await
            .expect("insert");
        let id = row_id(&stored).expect("id");

        let mut subscription = gateway
            .subscribe(SubscribeSpec::all("messages"))
            .await
            .expect("subscribe");

        let updated = gateway
            .update("messages", id, json!({ "body": "edited" }))
            .await
            .expect("update");
        assert_eq!(updated.get("body").and_then(|v| v.as_str()), Some("edited"));
        // 未出现在补丁中的字段保持不变
        assert_eq!(
            updated.get("channel_id").and_then(|v| v.as_str()),
            Some("c1")
        );

        let event = subscription.recv().await.expect("event");
        assert_eq!(event.op, ChangeOp::Update);
    }

    #[tokio::test]
    async fn update_unknown_row_fails() {
        let gateway = MemoryGateway::new();
        gateway
            .insert("messages", message_row("c1", "x"))
            .await
            .expect("insert");
        let err = gateway
            .update("messages", Uuid::new_v4(), json!({ "body": "y" }))
            .await
            .expect_err("unknown id should fail");
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let gateway = MemoryGateway::new();
        let stored = gateway
            .insert("reactions", json!({ "emoji": "👍" }))
            .await
            .expect("insert");
        let id = row_id(&stored).expect("id");

        tokio_test::assert_ok!(gateway.delete("reactions", id).await);
        // 第二次删除同一行是无操作
        tokio_test::assert_ok!(gateway.delete("reactions", id).await);
        assert_eq!(gateway.table_len("reactions"), 0);
    }

    #[tokio::test]
    async fn released_subscription_stops_delivery() {
        let gateway = MemoryGateway::new();
        let subscription = gateway
            .subscribe(SubscribeSpec::inserts("messages"))
            .await
            .expect("subscribe");
        subscription.release();

        gateway
            .insert("messages", message_row("c1", "after release"))
            .await
            .expect("insert");
        // 订阅者已注销
        assert!(gateway.state.subscribers.is_empty());
    }

    #[tokio::test]
    async fn select_orders_and_limits() {
        let gateway = MemoryGateway::new();
        for (body, ts) in [
            ("first", "2026-03-01T10:00:00Z"),
            ("third", "2026-03-01T12:00:00Z"),
            ("second", "2026-03-01T11:00:00Z"),
        ] {
            gateway
                .insert(
                    "messages",
                    json!({ "channel_id": "c1", "body": body, "created_at": ts }),
                )
                .await
                .expect("insert");
        }

        let rows = gateway
            .select(
                SelectQuery::table("messages")
                    .eq("channel_id", "c1")
                    .order("created_at", false)
                    .limit(2),
            )
            .await
            .expect("select");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("body").and_then(|v| v.as_str()), Some("third"));
        assert_eq!(rows[1].get("body").and_then(|v| v.as_str()), Some("second"));
    }

    #[tokio::test]
    async fn presence_track_untrack_roundtrip() {
        let gateway = MemoryGateway::new();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut mine = gateway.join("presence:ws1", me).await.expect("join");
        // 加入即收到当前（空）快照
        let initial = mine.recv().await.expect("initial snapshot");
        assert!(initial.is_empty());

        let theirs = gateway.join("presence:ws1", other).await.expect("join");
        theirs
            .handle()
            .track(json!({ "online_at": "2026-03-01T10:00:00Z" }))
            .await
            .expect("track");

        let snapshot = mine.recv().await.expect("snapshot after track");
        assert!(snapshot.contains(&other));

        theirs.handle().untrack().await.expect("untrack");
        let snapshot = mine.recv().await.expect("snapshot after untrack");
        assert!(!snapshot.contains(&other));
    }

    #[tokio::test]
    async fn leaving_scope_untracks_own_presence() {
        let gateway = MemoryGateway::new();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut mine = gateway.join("presence:ws1", me).await.expect("join");
        let _ = mine.recv().await;

        let theirs = gateway.join("presence:ws1", other).await.expect("join");
        theirs.handle().track(json!({})).await.expect("track");
        let snapshot = mine.recv().await.expect("snapshot");
        assert!(snapshot.contains(&other));

        // 断开连接（drop）等价于 untrack + 注销观察者
        theirs.leave();
        let snapshot = mine.recv().await.expect("snapshot after leave");
        assert!(!snapshot.contains(&other));
    }
}

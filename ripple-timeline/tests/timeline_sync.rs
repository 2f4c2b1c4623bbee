//! 时间线同步集成测试
//!
//! 以内存网关替换真实提供方，验证缓存安装、事件折叠、
//! 乐观写入与未读数重算的端到端行为

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tokio::time::timeout;
use tokio_test::assert_ok;
use uuid::Uuid;

use ripple_sync_core::config::RippleAppConfig;
use ripple_sync_core::gateway::{
    ChangeOp, DataGateway, MemoryGateway, RealtimeGateway, Row, SelectQuery,
};
use ripple_sync_core::notify::Notifier;
use ripple_timeline::domain::model::{
    DELETED_PLACEHOLDER, MessageRow, ScopeKey, TimelineUpdate,
};
use ripple_timeline::service::{TimelineContext, initialize};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Harness {
    gateway: MemoryGateway,
    context: TimelineContext,
    viewer: Uuid,
}

fn harness() -> Harness {
    harness_with_config(RippleAppConfig::default())
}

fn harness_with_config(config: RippleAppConfig) -> Harness {
    let gateway = MemoryGateway::new();
    let viewer = Uuid::new_v4();
    let data: Arc<dyn DataGateway> = Arc::new(gateway.clone());
    let realtime: Arc<dyn RealtimeGateway> = Arc::new(gateway.clone());
    let context = initialize(viewer, &config, data, realtime, Notifier::default())
        .expect("wire-up should succeed");
    Harness {
        gateway,
        context,
        viewer,
    }
}

/// 以另一个客户端的身份直接写入提供方
async fn remote_message(
    gateway: &MemoryGateway,
    channel_id: Uuid,
    author: Uuid,
    body: &str,
) -> Row {
    gateway
        .insert(
            "messages",
            json!({
                "channel_id": channel_id.to_string(),
                "user_id": author.to_string(),
                "content": body,
            }),
        )
        .await
        .expect("remote insert should succeed")
}

async fn remote_message_at(
    gateway: &MemoryGateway,
    channel_id: Uuid,
    author: Uuid,
    body: &str,
    created_at: chrono::DateTime<Utc>,
) -> Row {
    gateway
        .insert(
            "messages",
            json!({
                "channel_id": channel_id.to_string(),
                "user_id": author.to_string(),
                "content": body,
                "created_at": created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            }),
        )
        .await
        .expect("remote insert should succeed")
}

async fn seed_profile(gateway: &MemoryGateway, user_id: Uuid, username: &str) {
    gateway
        .insert(
            "profiles",
            json!({
                "user_id": user_id.to_string(),
                "username": username,
            }),
        )
        .await
        .expect("profile insert should succeed");
}

async fn wait_for(
    updates: &mut tokio::sync::broadcast::Receiver<TimelineUpdate>,
    mut predicate: impl FnMut(&TimelineUpdate) -> bool,
) -> TimelineUpdate {
    loop {
        let update = timeout(RECV_TIMEOUT, updates.recv())
            .await
            .expect("update should arrive in time")
            .expect("update channel open");
        if predicate(&update) {
            return update;
        }
    }
}

#[tokio::test]
async fn activation_installs_ascending_window_with_names() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    seed_profile(&h.gateway, other, "ada").await;

    let base = Utc::now();
    // 乱序写入
    for (body, offset) in [("second", 60), ("first", 0), ("third", 120)] {
        remote_message_at(
            &h.gateway,
            channel,
            other,
            body,
            base + chrono::Duration::seconds(offset),
        )
        .await;
    }

    let scope = ScopeKey::Channel(channel);
    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation should succeed");

    let messages = h.context.domain_service.messages(scope).await;
    let bodies: Vec<&str> = messages.iter().map(|m| m.row.body.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second", "third"]);
    assert!(messages.iter().all(|m| m.author_name.as_deref() == Some("ada")));
    // 激活即视为已读
    assert_eq!(h.context.domain_service.unread_count(scope), 0);
    assert!(h.context.domain_service.last_read(scope).is_some());
}

#[tokio::test]
async fn remote_insert_event_appends_in_order() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    tokio_test::assert_ok!(h.context.domain_service.activate_scope(scope).await);
    let mut updates = h.context.domain_service.updates();

    remote_message(&h.gateway, channel, other, "hello from afar").await;
    wait_for(&mut updates, |u| {
        matches!(u, TimelineUpdate::MessageAppended { .. })
    })
    .await;

    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].row.body, "hello from afar");

    // 显示顺序对任意插入序列保持非降序
    let timestamps: Vec<_> = messages.iter().map(|m| m.row.created_at).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn duplicate_insert_event_is_suppressed() {
    let h = harness();
    let channel = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);
    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");

    let stored = remote_message(&h.gateway, channel, Uuid::new_v4(), "only once").await;
    let row = MessageRow::from_row(&stored).expect("row parses");

    // 模拟乐观确认与订阅事件的双重投递
    h.context
        .domain_service
        .apply_message_event(scope, ChangeOp::Insert, row.clone())
        .await;
    h.context
        .domain_service
        .apply_message_event(scope, ChangeOp::Insert, row)
        .await;

    assert_eq!(h.context.domain_service.messages(scope).await.len(), 1);
}

#[tokio::test]
async fn optimistic_send_confirms_without_duplicate() {
    let h = harness();
    let channel = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);
    seed_profile(&h.gateway, h.viewer, "me").await;

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");

    h.context
        .domain_service
        .send_message(scope, "  optimistic hello  ")
        .await
        .expect("send should succeed");

    // 等订阅事件也投递完毕再检查
    tokio::task::yield_now().await;
    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 1, "confirmed row must replace the pending entry");
    assert_eq!(messages[0].row.body, "optimistic hello");
    assert!(!messages[0].is_pending());
    assert_eq!(h.gateway.table_len("messages"), 1);
}

/// 消息写入失败的网关包装
struct FailingWrites {
    inner: MemoryGateway,
}

#[async_trait]
impl DataGateway for FailingWrites {
    async fn select(&self, query: SelectQuery) -> ripple_sync_core::error::SyncResult<Vec<Row>> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, row: Row) -> ripple_sync_core::error::SyncResult<Row> {
        if table == "messages" {
            return Err(ripple_sync_core::error::SyncError::gateway(
                "provider unavailable",
            ));
        }
        self.inner.insert(table, row).await
    }

    async fn update(
        &self,
        table: &str,
        id: Uuid,
        patch: Row,
    ) -> ripple_sync_core::error::SyncResult<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: Uuid) -> ripple_sync_core::error::SyncResult<()> {
        self.inner.delete(table, id).await
    }
}

#[tokio::test]
async fn failed_send_rolls_back_and_notifies() {
    let gateway = MemoryGateway::new();
    let viewer = Uuid::new_v4();
    let data: Arc<dyn DataGateway> = Arc::new(FailingWrites {
        inner: gateway.clone(),
    });
    let realtime: Arc<dyn RealtimeGateway> = Arc::new(gateway.clone());
    let notifier = Notifier::default();
    let mut notices = notifier.subscribe();
    let context = initialize(
        viewer,
        &RippleAppConfig::default(),
        data,
        realtime,
        notifier,
    )
    .expect("wire-up");

    let channel = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);
    context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");

    let result = context.domain_service.send_message(scope, "will fail").await;
    assert!(result.is_err());

    // 本地状态未被污染：乐观条目已撤回
    assert!(context.domain_service.messages(scope).await.is_empty());
    let notice = timeout(RECV_TIMEOUT, notices.recv())
        .await
        .expect("notice should arrive")
        .expect("notifier open");
    assert_eq!(notice.message, "Failed to send message");
}

#[tokio::test]
async fn soft_delete_keeps_position_and_length() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    let base = Utc::now();
    remote_message_at(&h.gateway, channel, other, "first", base).await;
    let target =
        remote_message_at(&h.gateway, channel, other, "doomed", base + chrono::Duration::seconds(1))
            .await;
    remote_message_at(
        &h.gateway,
        channel,
        other,
        "third",
        base + chrono::Duration::seconds(2),
    )
    .await;
    let target_row = MessageRow::from_row(&target).expect("row parses");

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    let mut updates = h.context.domain_service.updates();

    h.context
        .domain_service
        .delete_message(scope, target_row.id)
        .await
        .expect("delete should succeed");
    wait_for(&mut updates, |u| {
        matches!(u, TimelineUpdate::MessageTombstoned { .. })
    })
    .await;

    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 3, "tombstoning never shrinks the list");
    assert_eq!(messages[1].row.id, target_row.id, "position preserved");
    assert_eq!(messages[1].display_body(), DELETED_PLACEHOLDER);
}

#[tokio::test]
async fn edit_event_patches_in_place_and_unknown_id_is_dropped() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    let stored = remote_message(&h.gateway, channel, other, "tpyo").await;
    let row = MessageRow::from_row(&stored).expect("row parses");

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    let mut updates = h.context.domain_service.updates();

    h.context
        .domain_service
        .edit_message(scope, row.id, "typo fixed")
        .await
        .expect("edit should succeed");
    wait_for(&mut updates, |u| {
        matches!(u, TimelineUpdate::MessagePatched { .. })
    })
    .await;

    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages[0].row.body, "typo fixed");
    assert!(messages[0].row.edited_at.is_some());

    // 窗口外 ID 的更新事件被静默丢弃
    let mut ghost = row.clone();
    ghost.id = Uuid::new_v4();
    ghost.body = "never applied".into();
    h.context
        .domain_service
        .apply_message_event(scope, ChangeOp::Update, ghost)
        .await;
    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].row.body, "typo fixed");
}

#[tokio::test]
async fn thread_reply_bumps_count_without_appending() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    let parent = remote_message(&h.gateway, channel, other, "parent message").await;
    let parent_row = MessageRow::from_row(&parent).expect("row parses");

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    let mut updates = h.context.domain_service.updates();

    h.gateway
        .insert(
            "messages",
            json!({
                "channel_id": channel.to_string(),
                "user_id": other.to_string(),
                "content": "a reply",
                "parent_id": parent_row.id.to_string(),
            }),
        )
        .await
        .expect("reply insert");

    let update = wait_for(&mut updates, |u| {
        matches!(u, TimelineUpdate::ReplyCountChanged { .. })
    })
    .await;
    assert_eq!(
        update,
        TimelineUpdate::ReplyCountChanged {
            parent_id: parent_row.id,
            count: 1
        }
    );

    // 回复不追加进频道可见列表
    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(h.context.domain_service.reply_count(parent_row.id).await, 1);
}

#[tokio::test]
async fn unread_counts_messages_after_marker_excluding_own() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    let t1 = Utc::now() - chrono::Duration::minutes(3);
    let t2 = Utc::now() - chrono::Duration::minutes(2);
    let t3 = Utc::now() - chrono::Duration::minutes(1);
    remote_message_at(&h.gateway, channel, other, "at t1", t1).await;
    remote_message_at(&h.gateway, channel, other, "at t2", t2).await;
    remote_message_at(&h.gateway, channel, other, "at t3", t3).await;

    // 已读标记停在 t2：只有 t3 计入未读
    h.context.domain_service.restore_marker(scope, t2);
    let count = h
        .context
        .domain_service
        .recompute_unread(scope)
        .await
        .expect("recompute");
    assert_eq!(count, 1);

    // 查看者自己的消息不计入未读
    remote_message_at(
        &h.gateway,
        channel,
        h.viewer,
        "my own",
        Utc::now(),
    )
    .await;
    let count = h
        .context
        .domain_service
        .recompute_unread(scope)
        .await
        .expect("recompute");
    assert_eq!(count, 1);

    // 进入作用域：未读清零，标记推进到当前时间
    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    assert_eq!(h.context.domain_service.unread_count(scope), 0);
    let marker = h
        .context
        .domain_service
        .last_read(scope)
        .expect("marker set");
    assert!(marker > t3);
}

#[tokio::test(start_paused = true)]
async fn unread_poller_recomputes_periodically() {
    let mut config = RippleAppConfig::default();
    config.sync.unread_poll_interval_secs = 15;
    let h = harness_with_config(config);
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    h.context.domain_service.watch_scope(scope);
    h.context
        .domain_service
        .restore_marker(scope, Utc::now() - chrono::Duration::minutes(10));
    remote_message_at(
        &h.gateway,
        channel,
        other,
        "unseen",
        Utc::now() - chrono::Duration::minutes(5),
    )
    .await;

    assert_eq!(h.context.domain_service.unread_count(scope), 0);
    // 跨过一个轮询周期
    tokio::time::sleep(Duration::from_secs(16)).await;
    tokio::task::yield_now().await;
    assert_eq!(h.context.domain_service.unread_count(scope), 1);
}

#[tokio::test]
async fn reaction_tallies_recompute_from_full_set() {
    let h = harness();
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    let stored = remote_message(&h.gateway, channel, other, "react to me").await;
    let message = MessageRow::from_row(&stored).expect("row parses");

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    let mut updates = h.context.domain_service.updates();

    // 查看者 👍，对方 👍，查看者 ❤️
    h.context
        .domain_service
        .toggle_reaction(message.id, "👍")
        .await
        .expect("toggle");
    h.gateway
        .insert(
            "reactions",
            json!({
                "message_id": message.id.to_string(),
                "user_id": other.to_string(),
                "emoji": "👍",
            }),
        )
        .await
        .expect("remote reaction");
    h.context
        .domain_service
        .toggle_reaction(message.id, "❤️")
        .await
        .expect("toggle");

    let mut seen = 0;
    while seen < 3 {
        let update = wait_for(&mut updates, |u| {
            matches!(u, TimelineUpdate::ReactionsChanged { .. })
        })
        .await;
        assert_eq!(
            update,
            TimelineUpdate::ReactionsChanged {
                message_id: message.id
            }
        );
        seen += 1;
    }

    let tallies = h.context.domain_service.reaction_tallies(message.id).await;
    assert_eq!(tallies.len(), 2);
    let thumbs = tallies.iter().find(|t| t.emoji == "👍").expect("👍 present");
    assert_eq!(thumbs.count, 2);
    assert!(thumbs.reacted);
    let heart = tallies.iter().find(|t| t.emoji == "❤️").expect("❤️ present");
    assert_eq!(heart.count, 1);
    assert!(heart.reacted);

    // 再次切换 👍：移除查看者自己的记录
    h.context
        .domain_service
        .toggle_reaction(message.id, "👍")
        .await
        .expect("toggle off");
    wait_for(&mut updates, |u| {
        matches!(u, TimelineUpdate::ReactionsChanged { .. })
    })
    .await;
    let tallies = h.context.domain_service.reaction_tallies(message.id).await;
    let thumbs = tallies.iter().find(|t| t.emoji == "👍").expect("👍 present");
    assert_eq!(thumbs.count, 1);
    assert!(!thumbs.reacted);
}

#[tokio::test(start_paused = true)]
async fn late_events_for_previous_scope_are_ignored() {
    let h = harness();
    let channel_a = Uuid::new_v4();
    let channel_b = Uuid::new_v4();
    let other = Uuid::new_v4();

    h.context
        .domain_service
        .activate_scope(ScopeKey::Channel(channel_a))
        .await
        .expect("activation a");
    h.context
        .domain_service
        .activate_scope(ScopeKey::Channel(channel_b))
        .await
        .expect("activation b");

    let mut updates = h.context.domain_service.updates();
    remote_message(&h.gateway, channel_a, other, "late for a").await;

    // 旧作用域的事件不产生任何可见更新
    let result = timeout(Duration::from_millis(500), updates.recv()).await;
    assert!(result.is_err(), "no update expected for a torn-down scope");
    assert!(
        h.context
            .domain_service
            .messages(ScopeKey::Channel(channel_b))
            .await
            .is_empty()
    );
    assert!(
        h.context
            .domain_service
            .messages(ScopeKey::Channel(channel_a))
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn history_limit_keeps_most_recent_rows() {
    let mut config = RippleAppConfig::default();
    config.sync.channel_history_limit = 2;
    let h = harness_with_config(config);
    let channel = Uuid::new_v4();
    let other = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    let base = Utc::now();
    for (index, body) in ["oldest", "middle", "newest"].iter().enumerate() {
        remote_message_at(
            &h.gateway,
            channel,
            other,
            body,
            base + chrono::Duration::seconds(index as i64),
        )
        .await;
    }

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    let messages = h.context.domain_service.messages(scope).await;
    let bodies: Vec<&str> = messages.iter().map(|m| m.row.body.as_str()).collect();
    assert_eq!(bodies, vec!["middle", "newest"]);
}

#[tokio::test]
async fn signal_message_arrives_flagged() {
    let h = harness();
    let channel = Uuid::new_v4();
    let scope = ScopeKey::Channel(channel);

    h.context
        .domain_service
        .activate_scope(scope)
        .await
        .expect("activation");
    let mut updates = h.context.domain_service.updates();

    h.context
        .domain_service
        .post_signal(channel, "📋 Signal: ada created task \"ship it\"")
        .await
        .expect("signal post");
    wait_for(&mut updates, |u| {
        matches!(u, TimelineUpdate::MessageAppended { .. })
    })
    .await;

    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].row.is_signal);
}

#[tokio::test]
async fn dm_scope_uses_direct_messages_table() -> Result<()> {
    let h = harness();
    let dm_channel = Uuid::new_v4();
    let scope = ScopeKey::Direct(dm_channel);

    h.context.domain_service.activate_scope(scope).await?;
    h.context
        .domain_service
        .send_message(scope, "dm hello")
        .await?;

    tokio::task::yield_now().await;
    assert_eq!(h.gateway.table_len("direct_messages"), 1);
    assert_eq!(h.gateway.table_len("messages"), 0);
    let messages = h.context.domain_service.messages(scope).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].row.body, "dm hello");
    Ok(())
}

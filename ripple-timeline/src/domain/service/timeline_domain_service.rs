//! 时间线领域服务 - 包含缓存折叠与派生视图的全部业务逻辑
//!
//! 所有缓存变更都在本服务内发生：初始批量拉取安装窗口，
//! 事件泵将订阅事件逐条折叠进缓存，写入走乐观占位 + 确认替换。
//! 切换作用域会停泵、释放订阅并丢弃旧缓存，迟到事件按作用域键丢弃。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ulid::Ulid;
use uuid::Uuid;

use ripple_sync_core::gateway::ChangeOp;
use ripple_sync_core::metrics::{SYNC_METRICS, drop_reason};
use ripple_sync_core::notify::Notifier;

use crate::domain::model::{
    CachedMessage, MessageDraft, MessageRow, ReactionRow, ReactionTally, ScopeKey,
    TimelineDomainConfig, TimelineUpdate, compute_reaction_tallies,
};
use crate::domain::repository::{MessageRepository, ProfileResolver, ReactionRepository};
use crate::domain::service::scope_timeline::{InsertOutcome, ScopeTimeline};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// 当前活动作用域的全部本地状态
///
/// drop 时停掉事件泵，泵持有的订阅随任务结束释放
struct ActiveScope {
    timeline: ScopeTimeline,
    /// 父消息 ID → 已知回复 ID 集合（按 ID 去重后计数）
    replies: HashMap<Uuid, HashSet<Uuid>>,
    /// 消息 ID → 回应记录全集，聚合始终从全集重算
    reactions: HashMap<Uuid, Vec<ReactionRow>>,
    pumps: Vec<JoinHandle<()>>,
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

/// 时间线领域服务
pub struct TimelineDomainService {
    viewer: Uuid,
    message_repo: Arc<dyn MessageRepository>,
    reaction_repo: Arc<dyn ReactionRepository>,
    profile_resolver: Arc<dyn ProfileResolver>,
    config: TimelineDomainConfig,
    active: RwLock<Option<ActiveScope>>,
    /// 各作用域的已读标记（本查看者）
    markers: DashMap<ScopeKey, DateTime<Utc>>,
    /// 各作用域最近一次重算得到的未读数
    unread_counts: DashMap<ScopeKey, usize>,
    updates: broadcast::Sender<TimelineUpdate>,
    notifier: Notifier,
}

impl TimelineDomainService {
    pub fn new(
        viewer: Uuid,
        message_repo: Arc<dyn MessageRepository>,
        reaction_repo: Arc<dyn ReactionRepository>,
        profile_resolver: Arc<dyn ProfileResolver>,
        config: TimelineDomainConfig,
        notifier: Notifier,
    ) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            viewer,
            message_repo,
            reaction_repo,
            profile_resolver,
            config,
            active: RwLock::new(None),
            markers: DashMap::new(),
            unread_counts: DashMap::new(),
            updates,
            notifier,
        })
    }

    pub fn viewer(&self) -> Uuid {
        self.viewer
    }

    /// 订阅视图层更新通知
    pub fn updates(&self) -> broadcast::Receiver<TimelineUpdate> {
        self.updates.subscribe()
    }

    /// 激活一个作用域
    ///
    /// 拆除旧作用域（停泵、释放订阅、丢弃缓存），先建立订阅再批量
    /// 拉取：拉取期间到达的事件滞留在订阅缓冲区，安装完成后由泵
    /// 折叠进缓存，重复部分由按 ID 去重吸收。激活同时推进已读标记。
    pub async fn activate_scope(self: &Arc<Self>, scope: ScopeKey) -> Result<()> {
        {
            let mut active = self.active.write().await;
            if active.is_some() {
                debug!(scope = %scope, "tearing down previous scope");
            }
            *active = None;
        }

        let message_sub = self.message_repo.subscribe_messages(&scope).await?;
        let reaction_sub = self.reaction_repo.subscribe_reactions().await?;

        let timer = SYNC_METRICS.bulk_fetch_duration_seconds.start_timer();
        let limit = self.config.history_limit(&scope);
        let rows = self.message_repo.recent_messages(&scope, limit).await?;

        // 频道作用域中的话题回复不进入可见列表，折叠为回复数
        let mut replies: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        let mut visible_rows: Vec<MessageRow> = Vec::new();
        for row in rows {
            match (&scope, row.parent_id) {
                (ScopeKey::Channel(_), Some(parent_id)) => {
                    replies.entry(parent_id).or_default().insert(row.id);
                }
                _ => visible_rows.push(row),
            }
        }

        let author_ids: Vec<Uuid> = {
            let mut seen = HashSet::new();
            visible_rows
                .iter()
                .filter_map(|row| row.author_id)
                .filter(|id| seen.insert(*id))
                .collect()
        };
        let names = match self.profile_resolver.resolve(&author_ids).await {
            Ok(names) => names,
            Err(e) => {
                warn!(scope = %scope, error = %e, "profile resolution failed, rendering without names");
                HashMap::new()
            }
        };

        let visible_ids: Vec<Uuid> = visible_rows.iter().map(|row| row.id).collect();
        let mut reactions: HashMap<Uuid, Vec<ReactionRow>> = HashMap::new();
        match self.reaction_repo.reactions_for(&visible_ids).await {
            Ok(records) => {
                for record in records {
                    reactions.entry(record.message_id).or_default().push(record);
                }
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "reaction fetch failed, tallies start empty");
            }
        }

        let mut timeline = ScopeTimeline::new(scope);
        timeline.install(
            visible_rows
                .into_iter()
                .map(|row| {
                    let author_name =
                        row.author_id.and_then(|id| names.get(&id).cloned());
                    CachedMessage::confirmed(row, author_name)
                })
                .collect(),
        );
        let loaded = timeline.len();

        {
            let mut active = self.active.write().await;
            let pumps = vec![
                self.spawn_message_pump(scope, message_sub),
                self.spawn_reaction_pump(reaction_sub),
            ];
            *active = Some(ActiveScope {
                timeline,
                replies,
                reactions,
                pumps,
            });
        }
        timer.observe_duration();

        // 进入作用域即视为已读
        self.mark_read(scope);
        let _ = self.updates.send(TimelineUpdate::ScopeLoaded { scope });
        info!(scope = %scope, messages = loaded, "scope activated");
        Ok(())
    }

    /// 注销当前作用域（离开聊天视图）
    pub async fn deactivate(&self) {
        let mut active = self.active.write().await;
        if active.take().is_some() {
            debug!("active scope released");
        }
    }

    // ------------------------------------------------------------------
    // 事件折叠
    // ------------------------------------------------------------------

    fn spawn_message_pump(
        self: &Arc<Self>,
        scope: ScopeKey,
        mut subscription: ripple_sync_core::gateway::Subscription,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let Some(service) = weak.upgrade() else { break };
                match MessageRow::from_row(&event.row) {
                    Ok(row) => service.apply_message_event(scope, event.op, row).await,
                    Err(e) => {
                        warn!(scope = %scope, error = %e, "dropping malformed message row");
                        SYNC_METRICS
                            .events_dropped_total
                            .with_label_values(&["message", drop_reason::MALFORMED])
                            .inc();
                    }
                }
            }
            debug!(scope = %scope, "message pump stopped");
        })
    }

    fn spawn_reaction_pump(
        self: &Arc<Self>,
        mut subscription: ripple_sync_core::gateway::Subscription,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let Some(service) = weak.upgrade() else { break };
                match ReactionRow::from_row(&event.row) {
                    Ok(row) => service.apply_reaction_event(event.op, row).await,
                    Err(e) => {
                        warn!(error = %e, "dropping malformed reaction row");
                        SYNC_METRICS
                            .events_dropped_total
                            .with_label_values(&["reaction", drop_reason::MALFORMED])
                            .inc();
                    }
                }
            }
            debug!("reaction pump stopped");
        })
    }

    /// 折叠一条消息变更事件
    pub async fn apply_message_event(&self, scope: ScopeKey, op: ChangeOp, row: MessageRow) {
        if !self.is_active_scope(&scope).await {
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["message", drop_reason::STALE_SCOPE])
                .inc();
            return;
        }
        match op {
            ChangeOp::Insert => self.apply_message_insert(scope, row).await,
            ChangeOp::Update => self.apply_message_update(scope, row).await,
            ChangeOp::Delete => {
                // 消息行永不物理删除，提供方不应发出该事件
                debug!(scope = %scope, id = %row.id, "ignoring physical delete for message row");
                SYNC_METRICS
                    .events_dropped_total
                    .with_label_values(&["message", drop_reason::UNSUPPORTED_OP])
                    .inc();
            }
        }
    }

    async fn apply_message_insert(&self, scope: ScopeKey, row: MessageRow) {
        // 子实体插入：不追加进可见列表，只重算父消息的回复数
        if let (ScopeKey::Channel(_), Some(parent_id)) = (&scope, row.parent_id) {
            let mut guard = self.active.write().await;
            let Some(active) = Self::active_for(&mut guard, &scope) else {
                return;
            };
            let replies = active.replies.entry(parent_id).or_default();
            if !replies.insert(row.id) {
                SYNC_METRICS
                    .events_dropped_total
                    .with_label_values(&["message", drop_reason::DUPLICATE])
                    .inc();
                return;
            }
            let count = replies.len();
            SYNC_METRICS
                .events_applied_total
                .with_label_values(&["message", "insert"])
                .inc();
            let _ = self
                .updates
                .send(TimelineUpdate::ReplyCountChanged { parent_id, count });
            return;
        }

        // 先解析发送者展示名，再持锁折叠
        let author_name = match row.author_id {
            Some(author_id) => self
                .profile_resolver
                .display_name(author_id)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        let message_id = row.id;
        let outcome = {
            let mut guard = self.active.write().await;
            let Some(active) = Self::active_for(&mut guard, &scope) else {
                return;
            };
            active
                .timeline
                .insert(CachedMessage::confirmed(row, author_name))
        };

        match outcome {
            InsertOutcome::Appended => {
                SYNC_METRICS
                    .events_applied_total
                    .with_label_values(&["message", "insert"])
                    .inc();
                let _ = self.updates.send(TimelineUpdate::MessageAppended {
                    scope,
                    id: message_id,
                });
            }
            InsertOutcome::ReplacedPending => {
                SYNC_METRICS.optimistic_confirmed_total.inc();
                SYNC_METRICS
                    .events_applied_total
                    .with_label_values(&["message", "insert"])
                    .inc();
                let _ = self.updates.send(TimelineUpdate::MessagePatched {
                    scope,
                    id: message_id,
                });
            }
            InsertOutcome::Duplicate => {
                SYNC_METRICS
                    .events_dropped_total
                    .with_label_values(&["message", drop_reason::DUPLICATE])
                    .inc();
            }
        }
    }

    async fn apply_message_update(&self, scope: ScopeKey, row: MessageRow) {
        let mut guard = self.active.write().await;
        let Some(active) = Self::active_for(&mut guard, &scope) else {
            return;
        };

        let applied = if let Some(deleted_at) = row.deleted_at {
            if active.timeline.tombstone(row.id, deleted_at) {
                let _ = self
                    .updates
                    .send(TimelineUpdate::MessageTombstoned { scope, id: row.id });
                true
            } else {
                false
            }
        } else if active
            .timeline
            .patch_body(row.id, row.body.clone(), row.edited_at)
        {
            let _ = self
                .updates
                .send(TimelineUpdate::MessagePatched { scope, id: row.id });
            true
        } else {
            false
        };

        if applied {
            SYNC_METRICS
                .events_applied_total
                .with_label_values(&["message", "update"])
                .inc();
        } else {
            // 窗口外的行：静默丢弃，绝不乱序插入
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["message", drop_reason::UNKNOWN_ID])
                .inc();
        }
    }

    /// 折叠一条回应变更事件
    pub async fn apply_reaction_event(&self, op: ChangeOp, row: ReactionRow) {
        let mut guard = self.active.write().await;
        let Some(active) = guard.as_mut() else {
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["reaction", drop_reason::STALE_SCOPE])
                .inc();
            return;
        };
        if !active.timeline.contains(row.message_id) {
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["reaction", drop_reason::UNKNOWN_ID])
                .inc();
            return;
        }

        let message_id = row.message_id;
        let records = active.reactions.entry(message_id).or_default();
        let applied = match op {
            ChangeOp::Insert => {
                if records.iter().any(|r| r.id == row.id) {
                    SYNC_METRICS
                        .events_dropped_total
                        .with_label_values(&["reaction", drop_reason::DUPLICATE])
                        .inc();
                    false
                } else {
                    records.push(row);
                    true
                }
            }
            ChangeOp::Delete => {
                let before = records.len();
                records.retain(|r| r.id != row.id);
                if records.len() == before {
                    SYNC_METRICS
                        .events_dropped_total
                        .with_label_values(&["reaction", drop_reason::UNKNOWN_ID])
                        .inc();
                    false
                } else {
                    true
                }
            }
            ChangeOp::Update => {
                SYNC_METRICS
                    .events_dropped_total
                    .with_label_values(&["reaction", drop_reason::UNSUPPORTED_OP])
                    .inc();
                false
            }
        };

        if applied {
            SYNC_METRICS
                .events_applied_total
                .with_label_values(&["reaction", op.as_str()])
                .inc();
            let _ = self
                .updates
                .send(TimelineUpdate::ReactionsChanged { message_id });
        }
    }

    // ------------------------------------------------------------------
    // 写入
    // ------------------------------------------------------------------

    /// 发送消息（频道或私聊作用域）
    pub async fn send_message(&self, scope: ScopeKey, body: &str) -> Result<()> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }
        let channel_id = match scope {
            ScopeKey::Channel(id) | ScopeKey::Direct(id) => id,
            ScopeKey::Thread(_) => {
                return Err(anyhow!("thread replies must go through send_reply"));
            }
        };
        let draft = MessageDraft {
            scope,
            channel_id,
            parent_id: None,
            author_id: Some(self.viewer),
            body: body.to_string(),
            is_signal: false,
            correlation_id: Ulid::new().to_string(),
        };
        self.submit_draft(draft).await
    }

    /// 在话题中回复
    pub async fn send_reply(&self, channel_id: Uuid, parent_id: Uuid, body: &str) -> Result<()> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }
        let draft = MessageDraft {
            scope: ScopeKey::Thread(parent_id),
            channel_id,
            parent_id: Some(parent_id),
            author_id: Some(self.viewer),
            body: body.to_string(),
            is_signal: false,
            correlation_id: Ulid::new().to_string(),
        };
        self.submit_draft(draft).await
    }

    /// 向频道写入一条系统 signal 消息（看板流转、成员加入等）
    ///
    /// signal 不做乐观占位，统一经订阅事件到达
    pub async fn post_signal(&self, channel_id: Uuid, body: &str) -> Result<()> {
        let draft = MessageDraft {
            scope: ScopeKey::Channel(channel_id),
            channel_id,
            parent_id: None,
            author_id: Some(self.viewer),
            body: body.to_string(),
            is_signal: true,
            correlation_id: Ulid::new().to_string(),
        };
        self.message_repo.insert_message(&draft).await?;
        Ok(())
    }

    async fn submit_draft(&self, draft: MessageDraft) -> Result<()> {
        let correlation = draft.correlation_id.clone();
        let author_name = self
            .profile_resolver
            .display_name(self.viewer)
            .await
            .ok()
            .flatten();

        // 乐观占位：临时行 ID 与客户端时间戳，确认时整体替换
        let pending_row = MessageRow {
            id: Uuid::new_v4(),
            channel_id: draft.channel_id,
            parent_id: draft.parent_id,
            author_id: draft.author_id,
            body: draft.body.clone(),
            is_signal: draft.is_signal,
            correlation_id: Some(correlation.clone()),
            created_at: Utc::now(),
            edited_at: None,
            deleted_at: None,
        };
        let pending_id = pending_row.id;

        {
            let mut guard = self.active.write().await;
            if let Some(active) = Self::active_for(&mut guard, &draft.scope) {
                active.timeline.insert(CachedMessage::pending(
                    pending_row,
                    correlation.clone(),
                    author_name.clone(),
                ));
                let _ = self.updates.send(TimelineUpdate::MessageAppended {
                    scope: draft.scope,
                    id: pending_id,
                });
            }
        }

        match self.message_repo.insert_message(&draft).await {
            Ok(confirmed) => {
                // 确认行通常也会经订阅事件到达；这里直接应用一次，
                // 两条路径由关联 ID 与行 ID 去重保证只生效一次
                let confirmed_id = confirmed.id;
                let outcome = {
                    let mut guard = self.active.write().await;
                    match Self::active_for(&mut guard, &draft.scope) {
                        Some(active) => Some(
                            active
                                .timeline
                                .insert(CachedMessage::confirmed(confirmed, author_name)),
                        ),
                        None => None,
                    }
                };
                if let Some(InsertOutcome::ReplacedPending) = outcome {
                    SYNC_METRICS.optimistic_confirmed_total.inc();
                    let _ = self.updates.send(TimelineUpdate::MessagePatched {
                        scope: draft.scope,
                        id: confirmed_id,
                    });
                }
                Ok(())
            }
            Err(e) => {
                // 写入失败：撤回占位条目，缓存回到写入前的状态
                SYNC_METRICS.optimistic_failed_total.inc();
                let retracted = {
                    let mut guard = self.active.write().await;
                    Self::active_for(&mut guard, &draft.scope)
                        .and_then(|active| active.timeline.remove_pending(&correlation))
                };
                if let Some(id) = retracted {
                    let _ = self.updates.send(TimelineUpdate::MessageRetracted {
                        scope: draft.scope,
                        id,
                    });
                }
                self.notifier.error("Failed to send message");
                warn!(scope = %draft.scope, error = %e, "message write failed");
                Err(e)
            }
        }
    }

    /// 编辑消息内容，缓存经更新事件收敛
    pub async fn edit_message(&self, scope: ScopeKey, id: Uuid, body: &str) -> Result<()> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }
        self.message_repo
            .update_body(&scope, id, body)
            .await
            .map_err(|e| {
                self.notifier.error("Failed to edit message");
                e
            })?;
        Ok(())
    }

    /// 软删除消息，缓存经更新事件打墓碑
    pub async fn delete_message(&self, scope: ScopeKey, id: Uuid) -> Result<()> {
        self.message_repo.tombstone(&scope, id).await.map_err(|e| {
            self.notifier.error("Failed to delete message");
            e
        })?;
        Ok(())
    }

    /// 切换查看者对某条消息的表情回应
    pub async fn toggle_reaction(&self, message_id: Uuid, emoji: &str) -> Result<()> {
        let existing = {
            let guard = self.active.read().await;
            guard.as_ref().and_then(|active| {
                active.reactions.get(&message_id).and_then(|records| {
                    records
                        .iter()
                        .find(|r| r.user_id == self.viewer && r.emoji == emoji)
                        .map(|r| r.id)
                })
            })
        };

        let result = match existing {
            Some(reaction_id) => self.reaction_repo.remove_reaction(reaction_id).await,
            None => self
                .reaction_repo
                .add_reaction(message_id, self.viewer, emoji)
                .await
                .map(|_| ()),
        };
        result.map_err(|e| {
            self.notifier.error("Failed to update reaction");
            e
        })
    }

    // ------------------------------------------------------------------
    // 未读数
    // ------------------------------------------------------------------

    /// 注册一个作用域进入未读轮询
    ///
    /// 首次注册时以当前时间为已读基准，只统计此后到达的消息
    pub fn watch_scope(&self, scope: ScopeKey) {
        self.markers.entry(scope).or_insert_with(Utc::now);
    }

    /// 恢复持久化的已读标记（登录后回填各作用域的阅读进度）
    pub fn restore_marker(&self, scope: ScopeKey, last_read: DateTime<Utc>) {
        self.markers.insert(scope, last_read);
    }

    /// 将作用域标记为已读（标记推进到当前时间，未读清零）
    pub fn mark_read(&self, scope: ScopeKey) {
        self.markers.insert(scope, Utc::now());
        let previous = self.unread_counts.insert(scope, 0);
        if previous.unwrap_or(0) != 0 {
            let _ = self
                .updates
                .send(TimelineUpdate::UnreadChanged { scope, count: 0 });
        }
    }

    /// 重算单个作用域的未读数
    ///
    /// 始终全量重查而非增量递减，以容忍漏掉的事件
    pub async fn recompute_unread(&self, scope: ScopeKey) -> Result<usize> {
        let Some(marker) = self.markers.get(&scope).map(|m| *m) else {
            return Ok(0);
        };
        let rows = self.message_repo.messages_after(&scope, marker).await?;
        let count = rows
            .iter()
            .filter(|row| row.author_id != Some(self.viewer))
            .count();
        SYNC_METRICS.unread_recomputes_total.inc();

        let previous = self.unread_counts.insert(scope, count);
        if previous != Some(count) {
            let _ = self
                .updates
                .send(TimelineUpdate::UnreadChanged { scope, count });
        }
        Ok(count)
    }

    /// 重算全部被关注作用域的未读数
    pub async fn recompute_all_unread(&self) {
        let scopes: Vec<ScopeKey> = self.markers.iter().map(|entry| *entry.key()).collect();
        for scope in scopes {
            if let Err(e) = self.recompute_unread(scope).await {
                warn!(scope = %scope, error = %e, "unread recompute failed");
            }
        }
    }

    /// 启动未读数轮询任务
    pub fn spawn_unread_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval 的第一次 tick 立即完成
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = weak.upgrade() else { break };
                service.recompute_all_unread().await;
            }
        })
    }

    // ------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------

    /// 当前作用域的有序消息列表；作用域不匹配时返回空
    pub async fn messages(&self, scope: ScopeKey) -> Vec<CachedMessage> {
        let guard = self.active.read().await;
        match guard.as_ref() {
            Some(active) if *active.timeline.scope() == scope => {
                active.timeline.messages().to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// 话题回复数（徽标展示）
    pub async fn reply_count(&self, parent_id: Uuid) -> usize {
        let guard = self.active.read().await;
        guard
            .as_ref()
            .and_then(|active| active.replies.get(&parent_id).map(|ids| ids.len()))
            .unwrap_or(0)
    }

    /// 某条消息的表情回应聚合
    pub async fn reaction_tallies(&self, message_id: Uuid) -> Vec<ReactionTally> {
        let guard = self.active.read().await;
        guard
            .as_ref()
            .and_then(|active| active.reactions.get(&message_id))
            .map(|records| compute_reaction_tallies(records, self.viewer))
            .unwrap_or_default()
    }

    /// 最近一次重算得到的未读数
    pub fn unread_count(&self, scope: ScopeKey) -> usize {
        self.unread_counts.get(&scope).map(|c| *c).unwrap_or(0)
    }

    /// 查看者在作用域上的已读标记
    pub fn last_read(&self, scope: ScopeKey) -> Option<DateTime<Utc>> {
        self.markers.get(&scope).map(|m| *m)
    }

    // ------------------------------------------------------------------

    async fn is_active_scope(&self, scope: &ScopeKey) -> bool {
        let guard = self.active.read().await;
        matches!(guard.as_ref(), Some(active) if active.timeline.scope() == scope)
    }

    /// 取出活动作用域，作用域不匹配的迟到事件计入丢弃指标
    fn active_for<'a>(
        guard: &'a mut Option<ActiveScope>,
        scope: &ScopeKey,
    ) -> Option<&'a mut ActiveScope> {
        match guard.as_mut() {
            Some(active) if active.timeline.scope() == scope => Some(active),
            _ => {
                SYNC_METRICS
                    .events_dropped_total
                    .with_label_values(&["message", drop_reason::STALE_SCOPE])
                    .inc();
                None
            }
        }
    }
}

//! 单个作用域的本地有序消息缓存
//!
//! 按 (created_at, id) 升序维护条目，提供按 ID 的就地修补。
//! 行一旦进入缓存就不会被物理移除（软删除仅打墓碑），
//! 唯一的例外是写入失败后撤回乐观占位条目。

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::model::{CachedMessage, DELETED_PLACEHOLDER, MessageOrigin, ScopeKey};

/// 插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 追加了新条目
    Appended,
    /// 确认行替换了匹配关联 ID 的乐观占位条目
    ReplacedPending,
    /// 行 ID 已存在，重复投递被抑制
    Duplicate,
}

/// 作用域时间线缓存
#[derive(Debug)]
pub struct ScopeTimeline {
    scope: ScopeKey,
    entries: Vec<CachedMessage>,
    ids: HashSet<Uuid>,
}

impl ScopeTimeline {
    pub fn new(scope: ScopeKey) -> Self {
        Self {
            scope,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    /// 初始安装：排序并按 ID 去重
    pub fn install(&mut self, messages: Vec<CachedMessage>) {
        self.entries.clear();
        self.ids.clear();
        for message in messages {
            self.insert(message);
        }
    }

    /// 按排序位置插入一条消息
    ///
    /// 重复 ID 被抑制；携带匹配关联 ID 的确认行会先移除
    /// 对应的乐观占位条目再插入（替换而非合并）
    pub fn insert(&mut self, message: CachedMessage) -> InsertOutcome {
        if self.ids.contains(&message.row.id) {
            return InsertOutcome::Duplicate;
        }

        let mut replaced = false;
        if let Some(correlation) = message
            .row
            .correlation_id
            .as_deref()
            .filter(|_| !message.is_pending())
        {
            replaced = self.remove_pending(correlation).is_some();
        }

        let key = (message.row.created_at, message.row.id);
        let position = self
            .entries
            .partition_point(|existing| (existing.row.created_at, existing.row.id) <= key);
        self.ids.insert(message.row.id);
        if position == self.entries.len() {
            self.entries.push(message);
        } else {
            self.entries.insert(position, message);
        }

        if replaced {
            InsertOutcome::ReplacedPending
        } else {
            InsertOutcome::Appended
        }
    }

    /// 就地修补消息内容（编辑）
    ///
    /// 返回是否命中；窗口外的 ID 不做任何处理
    pub fn patch_body(
        &mut self,
        id: Uuid,
        body: String,
        edited_at: Option<DateTime<Utc>>,
    ) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.row.body = body;
                entry.row.edited_at = edited_at;
                true
            }
            None => false,
        }
    }

    /// 打墓碑：保留位置与长度，展示内容替换为固定文案
    pub fn tombstone(&mut self, id: Uuid, deleted_at: DateTime<Utc>) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.row.deleted_at = Some(deleted_at);
                entry.row.body = DELETED_PLACEHOLDER.to_string();
                true
            }
            None => false,
        }
    }

    /// 撤回写入失败的乐观占位条目
    pub fn remove_pending(&mut self, correlation: &str) -> Option<Uuid> {
        let position = self.entries.iter().position(|entry| {
            matches!(&entry.origin, MessageOrigin::PendingLocal { correlation: c } if c == correlation)
        })?;
        let removed = self.entries.remove(position);
        self.ids.remove(&removed.row.id);
        Some(removed.row.id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&CachedMessage> {
        self.entries.iter().find(|entry| entry.row.id == id)
    }

    pub fn messages(&self) -> &[CachedMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, id: Uuid) -> Option<&mut CachedMessage> {
        self.entries.iter_mut().find(|entry| entry.row.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MessageRow;
    use chrono::TimeZone;

    fn scope() -> ScopeKey {
        ScopeKey::Channel(Uuid::nil())
    }

    fn row_at(ts_minute: u32) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4(),
            channel_id: Uuid::nil(),
            parent_id: None,
            author_id: Some(Uuid::new_v4()),
            body: format!("message at minute {}", ts_minute),
            is_signal: false,
            correlation_id: None,
            created_at: chrono::Utc
                .with_ymd_and_hms(2026, 3, 1, 12, ts_minute, 0)
                .unwrap(),
            edited_at: None,
            deleted_at: None,
        }
    }

    fn confirmed_at(ts_minute: u32) -> CachedMessage {
        CachedMessage::confirmed(row_at(ts_minute), None)
    }

    #[test]
    fn order_is_non_decreasing_for_any_insert_sequence() {
        let mut timeline = ScopeTimeline::new(scope());
        // 乱序到达
        for minute in [30, 5, 20, 45, 10, 10, 0] {
            timeline.insert(confirmed_at(minute));
        }

        let timestamps: Vec<_> = timeline
            .messages()
            .iter()
            .map(|m| m.row.created_at)
            .collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
    }

    #[test]
    fn duplicate_insert_is_suppressed() {
        let mut timeline = ScopeTimeline::new(scope());
        let message = confirmed_at(10);
        assert_eq!(timeline.insert(message.clone()), InsertOutcome::Appended);
        assert_eq!(timeline.insert(message), InsertOutcome::Duplicate);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn confirmed_row_replaces_pending_by_correlation() {
        let mut timeline = ScopeTimeline::new(scope());
        timeline.insert(confirmed_at(5));

        let correlation = "01JD0000000000000000000000".to_string();
        let mut pending_row = row_at(10);
        pending_row.correlation_id = Some(correlation.clone());
        let pending_id = pending_row.id;
        timeline.insert(CachedMessage::pending(
            pending_row,
            correlation.clone(),
            Some("ada".into()),
        ));
        assert_eq!(timeline.len(), 2);

        // 服务端确认行携带相同关联 ID 但不同的行 ID
        let mut confirmed_row = row_at(11);
        confirmed_row.correlation_id = Some(correlation);
        let confirmed_id = confirmed_row.id;
        let outcome = timeline.insert(CachedMessage::confirmed(confirmed_row, Some("ada".into())));

        assert_eq!(outcome, InsertOutcome::ReplacedPending);
        assert_eq!(timeline.len(), 2);
        assert!(!timeline.contains(pending_id));
        assert!(timeline.contains(confirmed_id));
    }

    #[test]
    fn tombstone_preserves_position_and_length() {
        let mut timeline = ScopeTimeline::new(scope());
        let first = confirmed_at(1);
        let second = confirmed_at(2);
        let third = confirmed_at(3);
        let target_id = second.row.id;
        for message in [first, second, third] {
            timeline.insert(message);
        }

        assert!(timeline.tombstone(target_id, chrono::Utc::now()));
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.messages()[1].row.id, target_id);
        assert_eq!(timeline.messages()[1].display_body(), DELETED_PLACEHOLDER);
        assert!(timeline.messages()[1].row.is_tombstoned());
    }

    #[test]
    fn patch_unknown_id_is_ignored() {
        let mut timeline = ScopeTimeline::new(scope());
        timeline.insert(confirmed_at(1));
        assert!(!timeline.patch_body(Uuid::new_v4(), "edited".into(), None));
        assert!(!timeline.tombstone(Uuid::new_v4(), chrono::Utc::now()));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn remove_pending_rolls_back_optimistic_entry() {
        let mut timeline = ScopeTimeline::new(scope());
        let correlation = "corr-1".to_string();
        let mut row = row_at(7);
        row.correlation_id = Some(correlation.clone());
        timeline.insert(CachedMessage::pending(row, correlation.clone(), None));
        assert_eq!(timeline.len(), 1);

        assert!(timeline.remove_pending(&correlation).is_some());
        assert!(timeline.is_empty());
        // 重复撤回无效果
        assert!(timeline.remove_pending(&correlation).is_none());
    }

    #[test]
    fn install_sorts_and_dedupes() {
        let mut timeline = ScopeTimeline::new(scope());
        let a = confirmed_at(2);
        let duplicate = a.clone();
        let b = confirmed_at(1);
        timeline.install(vec![a, duplicate, b]);
        assert_eq!(timeline.len(), 2);
        assert!(timeline.messages()[0].row.created_at <= timeline.messages()[1].row.created_at);
    }
}

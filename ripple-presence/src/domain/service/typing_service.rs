//! 输入提示领域服务
//!
//! 发送端状态机：每次按键（重新）宣告并重置本地定时器，
//! 定时器到期或消息实际发出时撤回宣告。观察端没有独立的
//! 超时，只消费每个用户的最新宣告——发送端断线未撤回造成的
//! 陈旧提示由下一份快照兜底，这是已接受的权衡。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use ripple_sync_core::gateway::{PresenceGateway, PresenceHandle, SubscriptionHandle};
use ripple_sync_core::metrics::SYNC_METRICS;
use ripple_sync_core::utils::typing_scope_label;

use crate::domain::model::{PresenceUpdate, TypingAnnouncement};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// 已加入的输入提示会话
struct TypingSession {
    scope: String,
    handle: Arc<dyn PresenceHandle>,
    pump: JoinHandle<()>,
    _guard: SubscriptionHandle,
}

impl Drop for TypingSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// 输入提示领域服务
pub struct TypingDomainService {
    self_id: Uuid,
    username: String,
    gateway: Arc<dyn PresenceGateway>,
    timeout: Duration,
    session: Mutex<Option<TypingSession>>,
    /// 最新快照中的输入者（含自己，查询时剔除）
    typists: Arc<RwLock<HashMap<Uuid, String>>>,
    expiry: Mutex<Option<JoinHandle<()>>>,
    updates: broadcast::Sender<PresenceUpdate>,
}

impl TypingDomainService {
    pub fn new(
        self_id: Uuid,
        username: impl Into<String>,
        gateway: Arc<dyn PresenceGateway>,
        timeout: Duration,
    ) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            self_id,
            username: username.into(),
            gateway,
            timeout,
            session: Mutex::new(None),
            typists: Arc::new(RwLock::new(HashMap::new())),
            expiry: Mutex::new(None),
            updates,
        })
    }

    pub fn updates(&self) -> broadcast::Receiver<PresenceUpdate> {
        self.updates.subscribe()
    }

    /// 加入某个聊天作用域的输入提示组
    pub async fn join_scope(self: &Arc<Self>, scope: &str) -> Result<()> {
        self.leave_scope().await;

        let label = typing_scope_label(scope);
        let channel = self.gateway.join(&label, self.self_id).await?;
        let (handle, mut snapshots, guard) = channel.into_parts();

        let typists = Arc::clone(&self.typists);
        let updates = self.updates.clone();
        let scope_name = scope.to_string();
        let pump = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                // 每个用户只认最新一条宣告，整体替换
                let mut latest = HashMap::new();
                for meta in snapshot.members.values() {
                    if let Some(announcement) = TypingAnnouncement::from_row(meta) {
                        if announcement.typing {
                            latest.insert(announcement.user_id, announcement.username);
                        }
                    }
                }
                *typists.write().await = latest;
                let _ = updates.send(PresenceUpdate::TypistsChanged {
                    scope: scope_name.clone(),
                });
            }
            debug!("typing snapshot pump stopped");
        });

        let mut session = self.session.lock().await;
        *session = Some(TypingSession {
            scope: label,
            handle,
            pump,
            _guard: guard,
        });
        Ok(())
    }

    /// 离开当前输入提示组
    pub async fn leave_scope(&self) {
        self.cancel_expiry().await;
        let taken = self.session.lock().await.take();
        if let Some(session) = taken {
            if let Err(e) = session.handle.untrack().await {
                debug!(error = %e, "typing untrack on leave failed");
            }
            self.typists.write().await.clear();
            info!(scope = %session.scope, "left typing scope");
        }
    }

    /// 本地按键：（重新）宣告正在输入并重置过期定时器
    pub async fn keystroke(self: &Arc<Self>) -> Result<()> {
        let handle = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) => Arc::clone(&session.handle),
                None => return Ok(()),
            }
        };

        handle
            .track(TypingAnnouncement::new(self.self_id, self.username.clone()).to_row())
            .await?;

        // 重置过期定时器：到期无后续按键则自动撤回
        self.cancel_expiry().await;
        let timeout = self.timeout;
        let expiry_handle = Arc::clone(&handle);
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            SYNC_METRICS.typing_expirations_total.inc();
            if let Err(e) = expiry_handle.untrack().await {
                debug!(error = %e, "typing expiry untrack failed");
            }
        });
        *self.expiry.lock().await = Some(task);
        Ok(())
    }

    /// 消息实际发出：立即显式停止输入提示
    pub async fn message_sent(&self) -> Result<()> {
        self.cancel_expiry().await;
        let handle = {
            let session = self.session.lock().await;
            session.as_ref().map(|s| Arc::clone(&s.handle))
        };
        if let Some(handle) = handle {
            handle.untrack().await?;
        }
        Ok(())
    }

    /// 当前正在输入的用户名列表（剔除自己，按名称排序）
    pub async fn typists(&self) -> Vec<String> {
        let typists = self.typists.read().await;
        let mut names: Vec<String> = typists
            .iter()
            .filter(|(user_id, _)| **user_id != self.self_id)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// 输入提示的展示文案（与聊天视图一致）
    pub async fn typing_line(&self) -> Option<String> {
        let names = self.typists().await;
        match names.len() {
            0 => None,
            1 => Some(format!("{} is typing", names[0])),
            2 => Some(format!("{} and {} are typing", names[0], names[1])),
            n => Some(format!("{} and {} others are typing", names[0], n - 1)),
        }
    }

    async fn cancel_expiry(&self) {
        if let Some(task) = self.expiry.lock().await.take() {
            task.abort();
        }
    }
}

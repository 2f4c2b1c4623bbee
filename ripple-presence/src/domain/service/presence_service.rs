//! 工作区在线状态领域服务
//!
//! 状态机只有 {absent, present} 两态，完全由提供方推送的
//! 全量快照驱动：键出现即在线，键消失即离线，没有定时过期。
//! 断开连接（离开作用域）会撤回本客户端自己的宣告。

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use ripple_sync_core::gateway::{PresenceGateway, PresenceHandle, SubscriptionHandle};
use ripple_sync_core::metrics::SYNC_METRICS;
use ripple_sync_core::utils::presence_scope_label;

use crate::domain::model::{OnlineAnnouncement, PresenceUpdate};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// 已加入的工作区会话
struct WorkspaceSession {
    workspace_id: Uuid,
    handle: Arc<dyn PresenceHandle>,
    pump: JoinHandle<()>,
    _guard: SubscriptionHandle,
}

impl Drop for WorkspaceSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// 在线状态领域服务
pub struct PresenceDomainService {
    self_id: Uuid,
    gateway: Arc<dyn PresenceGateway>,
    online: Arc<RwLock<HashSet<Uuid>>>,
    session: Mutex<Option<WorkspaceSession>>,
    updates: broadcast::Sender<PresenceUpdate>,
}

impl PresenceDomainService {
    pub fn new(self_id: Uuid, gateway: Arc<dyn PresenceGateway>) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            self_id,
            gateway,
            online: Arc::new(RwLock::new(HashSet::new())),
            session: Mutex::new(None),
            updates,
        })
    }

    pub fn updates(&self) -> broadcast::Receiver<PresenceUpdate> {
        self.updates.subscribe()
    }

    /// 加入工作区的在线状态作用域并宣告自己在线
    pub async fn join_workspace(self: &Arc<Self>, workspace_id: Uuid) -> Result<()> {
        self.leave_workspace().await;

        let scope = presence_scope_label(workspace_id);
        let channel = self.gateway.join(&scope, self.self_id).await?;
        let (handle, mut snapshots, guard) = channel.into_parts();

        handle
            .track(OnlineAnnouncement::now(self.self_id).to_row())
            .await?;

        let online = Arc::clone(&self.online);
        let updates = self.updates.clone();
        let pump = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                // 本地集合与最新快照完全一致，不做合并
                let keys = snapshot.keys();
                let online_count = keys.len();
                *online.write().await = keys;
                SYNC_METRICS.presence_snapshots_total.inc();
                let _ = updates.send(PresenceUpdate::OnlineSynced { online_count });
            }
            debug!("presence snapshot pump stopped");
        });

        let mut session = self.session.lock().await;
        *session = Some(WorkspaceSession {
            workspace_id,
            handle,
            pump,
            _guard: guard,
        });
        info!(workspace_id = %workspace_id, "joined workspace presence");
        Ok(())
    }

    /// 离开当前工作区：撤回宣告并清空本地集合
    pub async fn leave_workspace(&self) {
        let taken = self.session.lock().await.take();
        if let Some(session) = taken {
            if let Err(e) = session.handle.untrack().await {
                debug!(error = %e, "untrack on leave failed");
            }
            self.online.write().await.clear();
            info!(workspace_id = %session.workspace_id, "left workspace presence");
        }
    }

    /// 用户是否在线（存在于最近一份快照中）
    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.online.read().await.contains(&user_id)
    }

    pub async fn online_count(&self) -> usize {
        self.online.read().await.len()
    }

    pub async fn online_users(&self) -> HashSet<Uuid> {
        self.online.read().await.clone()
    }
}

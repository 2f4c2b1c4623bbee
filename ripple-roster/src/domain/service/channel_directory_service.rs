//! 频道目录领域服务
//!
//! 目录按创建时间升序维护，新频道（本地创建或其他成员创建）
//! 通过插入事件追加，按 ID 去重

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ripple_sync_core::metrics::{SYNC_METRICS, drop_reason};
use ripple_sync_core::notify::Notifier;
use ripple_sync_core::utils::slugify_channel_name;

use crate::domain::model::{ChannelRow, RosterUpdate};
use crate::domain::repository::ChannelRepository;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

struct Directory {
    workspace_id: Uuid,
    channels: Vec<ChannelRow>,
    pump: Option<JoinHandle<()>>,
}

impl Drop for Directory {
    fn drop(&mut self) {
        if let Some(pump) = &self.pump {
            pump.abort();
        }
    }
}

/// 频道目录领域服务
pub struct ChannelDirectoryService {
    channel_repo: Arc<dyn ChannelRepository>,
    directory: RwLock<Option<Directory>>,
    updates: broadcast::Sender<RosterUpdate>,
    notifier: Notifier,
}

impl ChannelDirectoryService {
    pub fn new(channel_repo: Arc<dyn ChannelRepository>, notifier: Notifier) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            channel_repo,
            directory: RwLock::new(None),
            updates,
            notifier,
        })
    }

    pub fn updates(&self) -> broadcast::Receiver<RosterUpdate> {
        self.updates.subscribe()
    }

    /// 加载工作区的频道目录并订阅新频道
    pub async fn load_channels(self: &Arc<Self>, workspace_id: Uuid) -> Result<()> {
        {
            let mut directory = self.directory.write().await;
            *directory = None;
        }

        let mut subscription = self.channel_repo.subscribe_channels(workspace_id).await?;
        let channels = self
            .channel_repo
            .list_channels(workspace_id)
            .await
            .map_err(|e| {
                self.notifier.error("Failed to load channels");
                e
            })?;
        let loaded = channels.len();

        {
            let mut directory = self.directory.write().await;
            *directory = Some(Directory {
                workspace_id,
                channels,
                pump: None,
            });
        }

        let weak = Arc::downgrade(self);
        let pump = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let Some(service) = weak.upgrade() else { break };
                match ChannelRow::from_row(&event.row) {
                    Ok(channel) => service.append_channel(channel).await,
                    Err(e) => {
                        warn!(error = %e, "dropping malformed channel row");
                        SYNC_METRICS
                            .events_dropped_total
                            .with_label_values(&["channel", drop_reason::MALFORMED])
                            .inc();
                    }
                }
            }
            debug!("channel pump stopped");
        });
        {
            let mut directory = self.directory.write().await;
            if let Some(active) = directory.as_mut() {
                active.pump = Some(pump);
            } else {
                pump.abort();
            }
        }

        let _ = self
            .updates
            .send(RosterUpdate::ChannelsLoaded { workspace_id });
        info!(workspace_id = %workspace_id, channels = loaded, "channel directory loaded");
        Ok(())
    }

    /// 创建频道（名称 slug 化后写入）
    ///
    /// 本地追加与订阅事件到达由按 ID 去重保证只生效一次
    pub async fn create_channel(&self, name: &str, created_by: Uuid) -> Result<ChannelRow> {
        let slug = slugify_channel_name(name);
        if slug.is_empty() {
            return Err(anyhow!("channel name must not be empty"));
        }

        let workspace_id = {
            let directory = self.directory.read().await;
            directory
                .as_ref()
                .map(|d| d.workspace_id)
                .ok_or_else(|| anyhow!("no workspace loaded"))?
        };

        let channel = self
            .channel_repo
            .create_channel(workspace_id, &slug, created_by)
            .await
            .map_err(|e| {
                self.notifier.error("Failed to create channel");
                e
            })?;

        self.append_channel(channel.clone()).await;
        self.notifier.success("Channel created!");
        Ok(channel)
    }

    /// 当前目录快照（创建时间升序）
    pub async fn channels(&self) -> Vec<ChannelRow> {
        let directory = self.directory.read().await;
        directory
            .as_ref()
            .map(|d| d.channels.clone())
            .unwrap_or_default()
    }

    /// 默认频道：is_default 标记优先，否则目录第一个
    pub async fn default_channel(&self) -> Option<ChannelRow> {
        let directory = self.directory.read().await;
        directory.as_ref().and_then(|d| {
            d.channels
                .iter()
                .find(|c| c.is_default)
                .or_else(|| d.channels.first())
                .cloned()
        })
    }

    async fn append_channel(&self, channel: ChannelRow) {
        let mut directory = self.directory.write().await;
        let Some(active) = directory.as_mut() else {
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["channel", drop_reason::STALE_SCOPE])
                .inc();
            return;
        };
        if active.workspace_id != channel.workspace_id {
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["channel", drop_reason::STALE_SCOPE])
                .inc();
            return;
        }
        if active.channels.iter().any(|c| c.id == channel.id) {
            SYNC_METRICS
                .events_dropped_total
                .with_label_values(&["channel", drop_reason::DUPLICATE])
                .inc();
            return;
        }

        let channel_id = channel.id;
        active.channels.push(channel);
        SYNC_METRICS
            .events_applied_total
            .with_label_values(&["channel", "insert"])
            .inc();
        let _ = self
            .updates
            .send(RosterUpdate::ChannelAppended { channel_id });
    }
}

//! 看板领域服务 - 包含所有业务逻辑实现
//!
//! 任务缓存的一致性策略是整板重载：任何任务变更事件都触发
//! 重新批量拉取并整体替换本地列表。拖拽移动先乐观翻转本地
//! 状态，写入失败时回滚并发出瞬时通知。

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ripple_sync_core::metrics::SYNC_METRICS;
use ripple_sync_core::notify::Notifier;

use crate::domain::model::{BoardUpdate, TaskDraft, TaskRow, TaskStatus};
use crate::domain::repository::{SignalPublisher, TaskRepository};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// 已加载的看板
struct ActiveBoard {
    workspace_id: Uuid,
    tasks: Vec<TaskRow>,
    pump: Option<JoinHandle<()>>,
}

impl Drop for ActiveBoard {
    fn drop(&mut self) {
        if let Some(pump) = &self.pump {
            pump.abort();
        }
    }
}

/// 看板领域服务
pub struct BoardDomainService {
    task_repo: Arc<dyn TaskRepository>,
    signals: Arc<dyn SignalPublisher>,
    board: RwLock<Option<ActiveBoard>>,
    updates: broadcast::Sender<BoardUpdate>,
    notifier: Notifier,
}

impl BoardDomainService {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        signals: Arc<dyn SignalPublisher>,
        notifier: Notifier,
    ) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            task_repo,
            signals,
            board: RwLock::new(None),
            updates,
            notifier,
        })
    }

    pub fn updates(&self) -> broadcast::Receiver<BoardUpdate> {
        self.updates.subscribe()
    }

    /// 加载一个工作区的看板并订阅任务变更
    pub async fn load_board(self: &Arc<Self>, workspace_id: Uuid) -> Result<()> {
        {
            let mut board = self.board.write().await;
            *board = None;
        }

        let mut subscription = self.task_repo.subscribe_tasks(workspace_id).await?;
        let tasks = self.task_repo.list_tasks(workspace_id).await?;
        let loaded = tasks.len();

        {
            let mut board = self.board.write().await;
            *board = Some(ActiveBoard {
                workspace_id,
                tasks,
                pump: None,
            });
        }

        // 任何任务事件都触发整板重载，不做行级修补
        let weak = Arc::downgrade(self);
        let pump = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let Some(service) = weak.upgrade() else { break };
                debug!(op = event.op.as_str(), "task change event, reloading board");
                if let Err(e) = service.reload(workspace_id).await {
                    warn!(workspace_id = %workspace_id, error = %e, "board reload failed");
                }
            }
            debug!("task pump stopped");
        });
        {
            let mut board = self.board.write().await;
            if let Some(active) = board.as_mut() {
                active.pump = Some(pump);
            } else {
                pump.abort();
            }
        }

        info!(workspace_id = %workspace_id, tasks = loaded, "board loaded");
        Ok(())
    }

    /// 整板重载：重新批量拉取并整体替换
    pub async fn reload(&self, workspace_id: Uuid) -> Result<()> {
        let tasks = self.task_repo.list_tasks(workspace_id).await?;
        {
            let mut board = self.board.write().await;
            match board.as_mut() {
                Some(active) if active.workspace_id == workspace_id => {
                    active.tasks = tasks;
                }
                // 看板已切换，迟到的重载直接丢弃
                _ => return Ok(()),
            }
        }
        SYNC_METRICS
            .full_reloads_total
            .with_label_values(&["task"])
            .inc();
        let _ = self.updates.send(BoardUpdate::Reloaded { workspace_id });
        Ok(())
    }

    /// 创建任务并向默认频道写入 signal
    pub async fn create_task(&self, draft: TaskDraft, actor_name: &str) -> Result<TaskRow> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(anyhow!("task title must not be empty"));
        }
        let draft = TaskDraft {
            title: title.to_string(),
            ..draft
        };

        let task = self.task_repo.insert_task(&draft).await.map_err(|e| {
            self.notifier.error("Failed to create task");
            e
        })?;

        let body = format!("📋 Signal: {} created task \"{}\"", actor_name, task.title);
        if let Err(e) = self.signals.publish(draft.workspace_id, &body).await {
            warn!(workspace_id = %draft.workspace_id, error = %e, "task creation signal failed");
        }

        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// 拖拽移动任务
    ///
    /// 先乐观翻转本地状态，写入失败则回滚；
    /// 成功后向默认频道写入流转 signal
    pub async fn move_task(
        &self,
        task_id: Uuid,
        new_status: TaskStatus,
        actor_name: &str,
    ) -> Result<()> {
        let (old_status, title) = {
            let board = self.board.read().await;
            let Some(active) = board.as_ref() else {
                return Err(anyhow!("no board loaded"));
            };
            let Some(task) = active.tasks.iter().find(|t| t.id == task_id) else {
                return Err(anyhow!("task not found: {}", task_id));
            };
            (task.status, task.title.clone())
        };
        if old_status == new_status {
            return Ok(());
        }

        // 乐观翻转
        self.set_status_locally(task_id, new_status).await;
        let _ = self.updates.send(BoardUpdate::TaskMoved {
            task_id,
            status: new_status,
        });

        if let Err(e) = self.task_repo.update_status(task_id, new_status).await {
            // 回滚到原列，本地状态不被失败的写入污染
            SYNC_METRICS.optimistic_failed_total.inc();
            self.set_status_locally(task_id, old_status).await;
            let _ = self.updates.send(BoardUpdate::MoveReverted {
                task_id,
                status: old_status,
            });
            self.notifier.error("Failed to move task");
            warn!(task_id = %task_id, error = %e, "task move failed");
            return Err(e);
        }

        let workspace_id = {
            let board = self.board.read().await;
            board.as_ref().map(|active| active.workspace_id)
        };
        if let Some(workspace_id) = workspace_id {
            let body = format!(
                "{} Signal: {} moved \"{}\" from {} → {}",
                new_status.signal_emoji(),
                actor_name,
                title,
                old_status.label(),
                new_status.label(),
            );
            if let Err(e) = self.signals.publish(workspace_id, &body).await {
                warn!(workspace_id = %workspace_id, error = %e, "task move signal failed");
            }
        }

        Ok(())
    }

    /// 当前看板快照（创建时间降序）
    pub async fn board_snapshot(&self) -> Vec<TaskRow> {
        let board = self.board.read().await;
        board
            .as_ref()
            .map(|active| active.tasks.clone())
            .unwrap_or_default()
    }

    /// 某一列的任务（保持整体顺序）
    pub async fn tasks_in(&self, status: TaskStatus) -> Vec<TaskRow> {
        let board = self.board.read().await;
        board
            .as_ref()
            .map(|active| {
                active
                    .tasks
                    .iter()
                    .filter(|task| task.status == status)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn set_status_locally(&self, task_id: Uuid, status: TaskStatus) {
        let mut board = self.board.write().await;
        if let Some(active) = board.as_mut() {
            if let Some(task) = active.tasks.iter_mut().find(|t| t.id == task_id) {
                task.status = status;
            }
        }
    }
}

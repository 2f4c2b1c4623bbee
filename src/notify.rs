//! 瞬时通知模块
//!
//! 同步层对用户的唯一错误出口是 toast 风格的瞬时通知，
//! 视图层订阅广播通道并负责展示

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// 瞬时通知
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// 通知发布器
///
/// 无订阅者时发布不报错，通知直接丢弃（与 toast 语义一致）
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 订阅通知流
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Error => warn!(notice = %message, "transient error notice"),
            _ => debug!(notice = %message, "notice"),
        }
        let _ = self.tx.send(Notice { level, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_subscriber() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.error("Failed to send message");
        let notice = rx.recv().await.expect("notice should arrive");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Failed to send message");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let notifier = Notifier::default();
        notifier.info("nobody listening");
    }
}

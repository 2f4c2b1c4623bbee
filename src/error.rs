//! 同步层错误类型定义

use thiserror::Error;

/// 同步层错误类型
#[derive(Debug, Error)]
pub enum SyncError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 数据网关瞬时错误（写入失败等，本地状态保持不变）
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// 订阅通道已关闭
    #[error("Subscription closed: {0}")]
    SubscriptionClosed(String),

    /// 行数据无法解析为目标实体
    #[error("Malformed row for table {table}: {reason}")]
    MalformedRow { table: String, reason: String },

    /// 实体未找到
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// 无效的参数
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 同步层结果类型
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// 是否属于瞬时错误（可提示用户重试，本地缓存未受影响）
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Gateway(_) | SyncError::SubscriptionClosed(_))
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        SyncError::Gateway(msg.into())
    }

    pub fn malformed(table: &str, reason: impl Into<String>) -> Self {
        SyncError::MalformedRow {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SyncError::gateway("write failed").is_transient());
        assert!(!SyncError::InvalidParameter("bad".into()).is_transient());
        assert!(
            !SyncError::NotFound {
                kind: "message",
                id: "x".into()
            }
            .is_transient()
        );
    }
}

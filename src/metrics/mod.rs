//! # Prometheus 指标收集模块
//!
//! 为同步层各个模块提供统一的 Prometheus 指标收集能力。

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 全局同步指标实例
pub static SYNC_METRICS: Lazy<SyncMetrics> = Lazy::new(SyncMetrics::new);

/// 同步层指标
pub struct SyncMetrics {
    /// 已应用的变更事件总数
    pub events_applied_total: IntCounterVec,
    /// 被丢弃的变更事件总数
    pub events_dropped_total: IntCounterVec,
    /// 乐观写入被服务端事件确认的次数
    pub optimistic_confirmed_total: IntCounter,
    /// 乐观写入失败并回滚的次数
    pub optimistic_failed_total: IntCounter,
    /// 集合全量重载次数
    pub full_reloads_total: IntCounterVec,
    /// 未读数重算次数
    pub unread_recomputes_total: IntCounter,
    /// 在线状态快照应用次数
    pub presence_snapshots_total: IntCounter,
    /// 输入提示超时自动停止次数
    pub typing_expirations_total: IntCounter,
    /// 初始批量拉取耗时（秒）
    pub bulk_fetch_duration_seconds: Histogram,
}

impl SyncMetrics {
    pub fn new() -> Self {
        let events_applied_total = IntCounterVec::new(
            Opts::new(
                "sync_events_applied_total",
                "Total number of change events applied to local caches",
            ),
            &["entity", "op"],
        )
        .expect("Failed to create sync_events_applied_total metric");

        let events_dropped_total = IntCounterVec::new(
            Opts::new(
                "sync_events_dropped_total",
                "Total number of change events dropped before application",
            ),
            &["entity", "reason"],
        )
        .expect("Failed to create sync_events_dropped_total metric");

        let optimistic_confirmed_total = IntCounter::new(
            "sync_optimistic_confirmed_total",
            "Total number of optimistic entries replaced by confirmed rows",
        )
        .expect("Failed to create sync_optimistic_confirmed_total metric");

        let optimistic_failed_total = IntCounter::new(
            "sync_optimistic_failed_total",
            "Total number of optimistic entries rolled back after a write error",
        )
        .expect("Failed to create sync_optimistic_failed_total metric");

        let full_reloads_total = IntCounterVec::new(
            Opts::new(
                "sync_full_reloads_total",
                "Total number of full collection reloads",
            ),
            &["entity"],
        )
        .expect("Failed to create sync_full_reloads_total metric");

        let unread_recomputes_total = IntCounter::new(
            "sync_unread_recomputes_total",
            "Total number of unread counter recomputations",
        )
        .expect("Failed to create sync_unread_recomputes_total metric");

        let presence_snapshots_total = IntCounter::new(
            "sync_presence_snapshots_total",
            "Total number of presence snapshots applied",
        )
        .expect("Failed to create sync_presence_snapshots_total metric");

        let typing_expirations_total = IntCounter::new(
            "sync_typing_expirations_total",
            "Total number of typing announcements stopped by the local timer",
        )
        .expect("Failed to create sync_typing_expirations_total metric");

        let bulk_fetch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sync_bulk_fetch_duration_seconds",
                "Initial bulk fetch duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )
        .expect("Failed to create sync_bulk_fetch_duration_seconds metric");

        let metrics = Self {
            events_applied_total,
            events_dropped_total,
            optimistic_confirmed_total,
            optimistic_failed_total,
            full_reloads_total,
            unread_recomputes_total,
            presence_snapshots_total,
            typing_expirations_total,
            bulk_fetch_duration_seconds,
        };

        metrics.register(&REGISTRY);
        metrics
    }

    fn register(&self, registry: &Registry) {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(self.events_applied_total.clone()),
            Box::new(self.events_dropped_total.clone()),
            Box::new(self.optimistic_confirmed_total.clone()),
            Box::new(self.optimistic_failed_total.clone()),
            Box::new(self.full_reloads_total.clone()),
            Box::new(self.unread_recomputes_total.clone()),
            Box::new(self.presence_snapshots_total.clone()),
            Box::new(self.typing_expirations_total.clone()),
            Box::new(self.bulk_fetch_duration_seconds.clone()),
        ];
        for collector in collectors {
            if let Err(e) = registry.register(collector) {
                tracing::warn!(error = %e, "metric already registered");
            }
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 事件丢弃原因常量
pub mod drop_reason {
    /// 事件的行 ID 不在当前已加载窗口内
    pub const UNKNOWN_ID: &str = "unknown_id";
    /// 事件属于已被切换走的作用域
    pub const STALE_SCOPE: &str = "stale_scope";
    /// 重复投递（乐观写入确认或提供方重复事件）
    pub const DUPLICATE: &str = "duplicate";
    /// 行数据无法解析
    pub const MALFORMED: &str = "malformed";
    /// 该实体不支持的操作类型
    pub const UNSUPPORTED_OP: &str = "unsupported_op";
}

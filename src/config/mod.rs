//! Ripple Sync Core 配置模块
//!
//! 该模块提供了完整的应用程序配置管理功能，包括：
//! - 配置文件加载和解析
//! - 环境特定配置覆盖
//! - 数据提供方与同步调优配置定义

use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<RippleAppConfig> = OnceLock::new();

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否显示日志目标模块
    #[serde(default = "default_true")]
    pub with_target: bool,
    /// 是否显示线程 ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否显示源文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否显示行号
    #[serde(default)]
    pub with_line_number: bool,
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// 数据提供方配置（BaaS 端点信息）
///
/// 同步层不实现传输协议，该配置仅描述部署环境，供网关实现使用
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderConfig {
    /// 提供方服务端点
    #[serde(default)]
    pub endpoint: String,
    /// 匿名访问密钥
    #[serde(default)]
    pub api_key: Option<String>,
    /// 数据库 schema 名称
    #[serde(default)]
    pub schema: Option<String>,
}

/// 同步调优配置
#[derive(Debug, Clone, Deserialize)]
pub struct SyncTuningConfig {
    /// 频道/私聊作用域初始拉取的最大消息数
    #[serde(default = "default_channel_history_limit")]
    pub channel_history_limit: usize,
    /// 话题作用域初始拉取的最大回复数
    #[serde(default = "default_thread_history_limit")]
    pub thread_history_limit: usize,
    /// 输入提示的发送端过期时间（秒）
    #[serde(default = "default_typing_timeout_secs")]
    pub typing_timeout_secs: u64,
    /// 未读数周期性重算的间隔（秒）
    #[serde(default = "default_unread_poll_interval_secs")]
    pub unread_poll_interval_secs: u64,
    /// 单个订阅通道的事件缓冲区大小
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

fn default_channel_history_limit() -> usize {
    200
}

fn default_thread_history_limit() -> usize {
    100
}

fn default_typing_timeout_secs() -> u64 {
    3
}

fn default_unread_poll_interval_secs() -> u64 {
    15
}

fn default_event_buffer_size() -> usize {
    256
}

impl Default for SyncTuningConfig {
    fn default() -> Self {
        Self {
            channel_history_limit: default_channel_history_limit(),
            thread_history_limit: default_thread_history_limit(),
            typing_timeout_secs: default_typing_timeout_secs(),
            unread_poll_interval_secs: default_unread_poll_interval_secs(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RippleAppConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 数据提供方配置
    #[serde(default)]
    pub provider: ProviderConfig,
    /// 同步调优配置
    #[serde(default)]
    pub sync: SyncTuningConfig,
}

impl RippleAppConfig {
    /// 校验配置值的内部一致性
    ///
    /// # 返回
    /// 所有检查通过时返回 Ok(())，否则返回第一个失败项
    pub fn validate_references(&self) -> Result<()> {
        if self.sync.channel_history_limit == 0 {
            return Err(anyhow!("sync.channel_history_limit must be greater than 0"));
        }
        if self.sync.thread_history_limit == 0 {
            return Err(anyhow!("sync.thread_history_limit must be greater than 0"));
        }
        if self.sync.typing_timeout_secs == 0 {
            return Err(anyhow!("sync.typing_timeout_secs must be greater than 0"));
        }
        if self.sync.unread_poll_interval_secs == 0 {
            return Err(anyhow!(
                "sync.unread_poll_interval_secs must be greater than 0"
            ));
        }
        if self.sync.event_buffer_size == 0 {
            return Err(anyhow!("sync.event_buffer_size must be greater than 0"));
        }
        if self.provider.api_key.is_some() && self.provider.endpoint.is_empty() {
            return Err(anyhow!(
                "provider.endpoint is required when provider.api_key is set"
            ));
        }
        Ok(())
    }
}

/// 从指定目录加载配置
///
/// 加载顺序：
/// 1. 环境变量 RIPPLE_CONFIG 指定的目录（优先）
/// 2. 传入的 `config_dir` 参数
/// 3. 未找到配置文件时回退到默认配置
///
/// 基础配置为 `{dir}/ripple.toml`，随后合并 `{dir}/environments/{env}.toml`
pub fn load_config(config_dir: Option<&str>) -> &'static RippleAppConfig {
    APP_CONFIG.get_or_init(|| {
        let dir = env::var("RIPPLE_CONFIG")
            .ok()
            .or_else(|| config_dir.map(|s| s.to_string()))
            .unwrap_or_else(|| "config".to_string());

        let mut config = match read_base_config(&dir) {
            Ok(config) => config,
            Err(e) => {
                warn!(dir = %dir, error = %e, "falling back to default configuration");
                RippleAppConfig::default()
            }
        };

        if let Err(e) = ConfigManager::load_environment_config(&dir, &mut config) {
            warn!(error = %e, "failed to apply environment configuration overlay");
        }

        config
    })
}

/// 加载配置并执行严格校验
pub fn load_config_with_validation(config_dir: Option<&str>) -> Result<&'static RippleAppConfig> {
    let config = load_config(config_dir);
    config
        .validate_references()
        .context("configuration validation failed")?;
    Ok(config)
}

/// 获取已加载的全局配置，未加载时使用默认目录加载
pub fn app_config() -> &'static RippleAppConfig {
    load_config(None)
}

fn read_base_config(dir: &str) -> Result<RippleAppConfig> {
    let path = Path::new(dir).join("ripple.toml");
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("invalid config format: {}", path.display()))
}

//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 获取当前环境名称
//! - 加载环境特定配置
//! - 合并同步调优配置值

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;

use super::RippleAppConfig;

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    ///
    /// 从环境变量 RIPPLE_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    pub fn get_environment() -> String {
        env::var("RIPPLE_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 根据环境加载特定配置
    ///
    /// 加载 {dir}/environments/{environment}.toml 文件中的配置，
    /// 并将其合并到基础配置中
    ///
    /// # 参数
    /// * `dir` - 配置目录
    /// * `base_config` - 基础配置，将被修改以包含环境特定配置
    pub fn load_environment_config(dir: &str, base_config: &mut RippleAppConfig) -> Result<()> {
        let environment = Self::get_environment();
        let env_config_path = Path::new(dir)
            .join("environments")
            .join(format!("{}.toml", environment));

        if env_config_path.exists() {
            let env_config_content = fs::read_to_string(&env_config_path).with_context(|| {
                format!(
                    "failed to read environment config: {}",
                    env_config_path.display()
                )
            })?;
            let env_config: Value = toml::from_str(&env_config_content).with_context(|| {
                format!(
                    "invalid environment config format: {}",
                    env_config_path.display()
                )
            })?;

            Self::merge_config_values(base_config, &env_config);
        }

        Ok(())
    }

    /// 合并配置值
    ///
    /// 将环境配置中的日志与同步调优配置合并到基础配置中
    fn merge_config_values(base_config: &mut RippleAppConfig, env_config: &Value) {
        if let Some(logging) = env_config.get("logging") {
            if let Some(level) = logging.get("level").and_then(|v| v.as_str()) {
                base_config.logging.level = level.to_string();
            }
            if let Some(with_target) = logging.get("with_target").and_then(|v| v.as_bool()) {
                base_config.logging.with_target = with_target;
            }
        }

        if let Some(sync) = env_config.get("sync") {
            if let Some(limit) = sync.get("channel_history_limit").and_then(|v| v.as_integer()) {
                if limit > 0 {
                    base_config.sync.channel_history_limit = limit as usize;
                }
            }
            if let Some(limit) = sync.get("thread_history_limit").and_then(|v| v.as_integer()) {
                if limit > 0 {
                    base_config.sync.thread_history_limit = limit as usize;
                }
            }
            if let Some(secs) = sync.get("typing_timeout_secs").and_then(|v| v.as_integer()) {
                if secs > 0 {
                    base_config.sync.typing_timeout_secs = secs as u64;
                }
            }
            if let Some(secs) = sync
                .get("unread_poll_interval_secs")
                .and_then(|v| v.as_integer())
            {
                if secs > 0 {
                    base_config.sync.unread_poll_interval_secs = secs as u64;
                }
            }
            if let Some(size) = sync.get("event_buffer_size").and_then(|v| v.as_integer()) {
                if size > 0 {
                    base_config.sync.event_buffer_size = size as usize;
                }
            }
        }

        if let Some(provider) = env_config.get("provider") {
            if let Some(endpoint) = provider.get("endpoint").and_then(|v| v.as_str()) {
                base_config.provider.endpoint = endpoint.to_string();
            }
            if let Some(api_key) = provider.get("api_key").and_then(|v| v.as_str()) {
                base_config.provider.api_key = Some(api_key.to_string());
            }
            if let Some(schema) = provider.get("schema").and_then(|v| v.as_str()) {
                base_config.provider.schema = Some(schema.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_sync_tuning() {
        let mut config = RippleAppConfig::default();
        let overlay: Value = toml::from_str(
            r#"
            [logging]
            level = "warn"

            [sync]
            channel_history_limit = 50
            typing_timeout_secs = 10
            "#,
        )
        .expect("overlay should parse");

        ConfigManager::merge_config_values(&mut config, &overlay);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.sync.channel_history_limit, 50);
        assert_eq!(config.sync.typing_timeout_secs, 10);
        // 未覆盖的字段保持原值
        assert_eq!(config.sync.thread_history_limit, 100);
    }

    #[test]
    fn merge_ignores_invalid_values() {
        let mut config = RippleAppConfig::default();
        let overlay: Value = toml::from_str(
            r#"
            [sync]
            channel_history_limit = 0
            "#,
        )
        .expect("overlay should parse");

        ConfigManager::merge_config_values(&mut config, &overlay);
        assert_eq!(config.sync.channel_history_limit, 200);
    }
}

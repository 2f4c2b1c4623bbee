//! 基于数据网关的用户资料解析器
//!
//! 窗口安装时按去重后的发送者集合批量拉取，实时事件未命中
//! 缓存时单条补拉，解析结果进程内长期缓存

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use ripple_sync_core::gateway::{DataGateway, SelectQuery, row};

use crate::domain::repository::ProfileResolver;

const PROFILES_TABLE: &str = "profiles";

/// 网关资料解析器
pub struct GatewayProfileResolver {
    data: Arc<dyn DataGateway>,
    cache: DashMap<Uuid, String>,
}

impl GatewayProfileResolver {
    pub fn new(data: Arc<dyn DataGateway>) -> Self {
        Self {
            data,
            cache: DashMap::new(),
        }
    }

    fn cache_row(&self, profile_row: &ripple_sync_core::gateway::Row) -> Option<(Uuid, String)> {
        let user_id = row::uuid_field(profile_row, "user_id")?;
        let username = row::str_field(profile_row, "username")?;
        self.cache.insert(user_id, username.clone());
        Some((user_id, username))
    }
}

#[async_trait]
impl ProfileResolver for GatewayProfileResolver {
    async fn resolve(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        let mut resolved = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for user_id in user_ids {
            match self.cache.get(user_id) {
                Some(name) => {
                    resolved.insert(*user_id, name.clone());
                }
                None => missing.push(user_id.to_string()),
            }
        }

        if !missing.is_empty() {
            let rows = self
                .data
                .select(SelectQuery::table(PROFILES_TABLE).within("user_id", missing))
                .await
                .context("profile fetch failed")?;
            for profile_row in &rows {
                if let Some((user_id, username)) = self.cache_row(profile_row) {
                    resolved.insert(user_id, username);
                }
            }
        }

        Ok(resolved)
    }

    async fn display_name(&self, user_id: Uuid) -> Result<Option<String>> {
        if let Some(name) = self.cache.get(&user_id) {
            return Ok(Some(name.clone()));
        }
        let rows = self
            .data
            .select(SelectQuery::table(PROFILES_TABLE).eq("user_id", user_id))
            .await
            .context("profile fetch failed")?;
        Ok(rows.first().and_then(|row| self.cache_row(row)).map(|(_, name)| name))
    }
}

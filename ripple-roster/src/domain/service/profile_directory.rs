//! 用户资料缓存
//!
//! 批量预取 + 未命中单条补拉，展示名兜底链：
//! username → 邮箱本地部分 → "Unknown"

use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use uuid::Uuid;

use ripple_sync_core::utils::email_local_part;

use crate::domain::model::ProfileRow;
use crate::domain::repository::ProfileRepository;

/// 资料目录
pub struct ProfileDirectory {
    profile_repo: Arc<dyn ProfileRepository>,
    cache: DashMap<Uuid, ProfileRow>,
}

impl ProfileDirectory {
    pub fn new(profile_repo: Arc<dyn ProfileRepository>) -> Self {
        Self {
            profile_repo,
            cache: DashMap::new(),
        }
    }

    /// 确保一组用户的资料已在缓存中
    pub async fn ensure(&self, user_ids: &[Uuid]) -> Result<()> {
        let missing: Vec<Uuid> = user_ids
            .iter()
            .filter(|id| !self.cache.contains_key(id))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let profiles = self.profile_repo.profiles_for(&missing).await?;
        for profile in profiles {
            self.cache.insert(profile.user_id, profile);
        }
        Ok(())
    }

    /// 读取缓存中的资料
    pub fn get(&self, user_id: Uuid) -> Option<ProfileRow> {
        self.cache.get(&user_id).map(|p| p.clone())
    }

    /// 展示名，未命中缓存时单条补拉
    ///
    /// 兜底链与来源一致：username → 邮箱本地部分 → "Unknown"
    pub async fn display_name(&self, user_id: Uuid, email: Option<&str>) -> String {
        if let Some(profile) = self.get(user_id) {
            return profile.username;
        }
        if let Ok(Some(profile)) = self.profile_repo.profile_of(user_id).await {
            let username = profile.username.clone();
            self.cache.insert(user_id, profile);
            return username;
        }
        email
            .and_then(email_local_part)
            .unwrap_or("Unknown")
            .to_string()
    }
}

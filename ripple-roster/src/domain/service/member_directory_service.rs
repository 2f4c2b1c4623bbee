//! 成员名录领域服务
//!
//! 每次查询都重新拉取成员关系与资料（名录不订阅变更事件），
//! 在线标记由调用方传入的在线集合决定，排序为在线优先、
//! 其后按用户名字典序

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use crate::domain::model::MemberProfile;
use crate::domain::repository::{MemberRepository, ProfileRepository};

/// 成员名录领域服务
pub struct MemberDirectoryService {
    member_repo: Arc<dyn MemberRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
}

impl MemberDirectoryService {
    pub fn new(
        member_repo: Arc<dyn MemberRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            member_repo,
            profile_repo,
        }
    }

    /// 工作区成员名录：成员关系 + 资料 + 在线标记
    ///
    /// 没有资料行的成员不进入名录
    pub async fn members(
        &self,
        workspace_id: Uuid,
        online: &HashSet<Uuid>,
    ) -> Result<Vec<MemberProfile>> {
        let member_rows = self.member_repo.list_members(workspace_id).await?;
        let role_map: HashMap<Uuid, _> = member_rows
            .iter()
            .map(|member| (member.user_id, member.role))
            .collect();

        let user_ids: Vec<Uuid> = member_rows.iter().map(|member| member.user_id).collect();
        let profiles = self.profile_repo.profiles_for(&user_ids).await?;

        let mut members: Vec<MemberProfile> = profiles
            .into_iter()
            .filter_map(|profile| {
                role_map.get(&profile.user_id).map(|role| MemberProfile {
                    user_id: profile.user_id,
                    username: profile.username,
                    avatar_url: profile.avatar_url,
                    bio: profile.bio,
                    role: *role,
                    online: online.contains(&profile.user_id),
                })
            })
            .collect();

        // 在线优先，其后按用户名排序
        members.sort_by(|a, b| {
            b.online
                .cmp(&a.online)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(members)
    }

    /// 按用户名过滤（大小写不敏感的包含匹配）
    pub fn search<'a>(
        members: &'a [MemberProfile],
        needle: &str,
    ) -> Vec<&'a MemberProfile> {
        let needle = needle.to_lowercase();
        members
            .iter()
            .filter(|member| member.username.to_lowercase().contains(&needle))
            .collect()
    }
}

//! 辅助工具函数模块
//!
//! 提供时间转换、作用域标签与名称规整等常用辅助函数

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// 毫秒时间戳转换为 DateTime<Utc>
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// DateTime<Utc> 转换为毫秒时间戳
pub fn datetime_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// 将频道名规整为 slug 形式
///
/// 小写化并将连续空白折叠为单个连字符
pub fn slugify_channel_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// 私聊对的规范顺序（较小的 UUID 在前）
///
/// 两个用户无论谁发起会话，得到的作用域标签都相同
pub fn canonical_dm_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// 私聊对的作用域标签
pub fn dm_scope_label(a: Uuid, b: Uuid) -> String {
    let (first, second) = canonical_dm_pair(a, b);
    format!("dm:{}:{}", first, second)
}

/// 工作区在线状态作用域标签
pub fn presence_scope_label(workspace_id: Uuid) -> String {
    format!("presence:{}", workspace_id)
}

/// 输入提示作用域标签
pub fn typing_scope_label(scope: &str) -> String {
    format!("typing:{}", scope)
}

/// 从邮箱地址取本地部分作为展示名兜底
pub fn email_local_part(email: &str) -> Option<&str> {
    let local = email.split('@').next()?;
    if local.is_empty() { None } else { Some(local) }
}

/// 简单的邮箱地址语法校验
///
/// 与来源一致：local@domain，domain 至少含一个点，不允许空白
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let mut domain_parts = domain.split('.');
    let Some(head) = domain_parts.next() else {
        return false;
    };
    let tail: Vec<&str> = domain_parts.collect();
    !head.is_empty() && !tail.is_empty() && tail.iter().all(|part| !part.is_empty())
}

//! 行数据解析辅助函数
//!
//! 提供方的行以 JSON 对象传递，各 infrastructure 适配层使用
//! 这些函数将字段解析为强类型值

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Row;

/// 读取字符串字段
pub fn str_field(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// 读取布尔字段，缺失时返回 false
pub fn bool_field(row: &Row, key: &str) -> bool {
    row.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// 读取 UUID 字段
pub fn uuid_field(row: &Row, key: &str) -> Option<Uuid> {
    row.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// 读取 RFC3339 时间戳字段
pub fn datetime_field(row: &Row, key: &str) -> Option<DateTime<Utc>> {
    row.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// 行的主键 ID（约定列名为 "id"）
pub fn row_id(row: &Row) -> Option<Uuid> {
    uuid_field(row, "id")
}

/// 将字段值规整为等值比较用的字符串形式
///
/// 订阅过滤与查询过滤均基于该形式比较，
/// 字符串取原文，其余标量取 JSON 文本
pub fn field_as_match_string(row: &Row, key: &str) -> Option<String> {
    match row.get(key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

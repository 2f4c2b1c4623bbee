use crate::domain::model::TaskStatus;

/// 整板快照查询
#[derive(Debug, Clone)]
pub struct BoardSnapshotQuery;

/// 单列任务查询
#[derive(Debug, Clone)]
pub struct ColumnQuery {
    pub status: TaskStatus,
}

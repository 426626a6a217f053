use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 容器同步任务的持久化配置，由外部配置管理创建，调度核心只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSync {
    pub id: Uuid,
    pub repo: String,        // 目标仓库引用
    pub provider: String,    // 仓库提供方，如 "github"
    pub image_queue: String, // 执行镜像声明的队列类别
    pub created_at: DateTime<Utc>,
}

impl ContainerSync {
    pub fn new(repo: String, provider: String, image_queue: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            repo,
            provider,
            image_queue,
            created_at: Utc::now(),
        }
    }
    pub fn entity_description(&self) -> String {
        format!("同步任务 {} (仓库: {})", self.id, self.repo)
    }
}

/// 资格查询的结果行：一个到期待派发的同步任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueSync {
    pub sync_id: Uuid,
    pub provider: String,
    pub image_queue: String,
}

/// 一次派发的历史记录，把同步任务关联到队列作业；只追加，从不修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncExecution {
    pub sync_id: Uuid,
    pub job_id: i64,
    pub created_at: DateTime<Utc>,
}

/// 队列子系统的作业记录，调度核心只读取状态和完成时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub queue: String,
    pub typename: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl JobStatus {
    /// 作业仍占据在途配额，对应的同步任务不可重新派发
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for JobStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("TEXT")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for JobStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Invalid job status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for JobStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// 提交给队列子系统的作业载荷，携带同步任务的标识
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncJobPayload {
    pub sync_id: Uuid,
}

impl SyncJobPayload {
    /// 作业类型名，队列子系统的worker按此路由
    pub const TYPENAME: &'static str = "container/sync";

    pub fn new(sync_id: Uuid) -> Self {
        Self { sync_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_active() {
        assert!(JobStatus::Pending.is_active());
        assert!(JobStatus::Running.is_active());
        assert!(!JobStatus::Completed.is_active());
        assert!(!JobStatus::Failed.is_active());
        assert!(!JobStatus::Cancelled.is_active());
    }

    #[test]
    fn test_job_status_roundtrip_serde() {
        let json = serde_json::to_string(&JobStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let status: JobStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(status, JobStatus::Failed);
    }

    #[test]
    fn test_sync_job_payload_serialization() {
        let sync_id = Uuid::new_v4();
        let payload = SyncJobPayload::new(sync_id);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["sync_id"], serde_json::json!(sync_id.to_string()));
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use syncsched_domain::{
    entities::{DueSync, SyncExecution, SyncJobPayload},
    repositories::{CycleTransaction, DispatchStore},
    value_objects::QueueSpec,
};
use syncsched_errors::SchedulerResult;

/// 周期级咨询锁的固定键，所有调度器实例共用
const CYCLE_LOCK_KEY: i64 = 0x53594E43_53434844;

/// 资格查询：每个已排期的同步任务取最近一次执行，关联其作业的
/// 状态与完成时间，过滤出可以重新派发的任务
const LIST_DUE_SYNCS_QUERY: &str = r#"
SELECT id, provider, image_queue FROM (
    SELECT DISTINCT ON (cs.id) cs.id, cs.provider, cs.image_queue,
        job.status, job.completed_at
        FROM container_sync_schedules sched
            INNER JOIN container_syncs cs ON cs.id = sched.sync_id
            LEFT OUTER JOIN container_sync_executions exec ON exec.sync_id = cs.id
            LEFT OUTER JOIN jobs job ON job.id = exec.job_id
        ORDER BY cs.id, exec.created_at DESC
) latest
    WHERE (status IS NULL OR status NOT IN ('PENDING', 'RUNNING'))
    AND (completed_at IS NULL OR completed_at < $1)
    ORDER BY id
"#;

const UPSERT_QUEUE_QUERY: &str = r#"
INSERT INTO job_queues (name, concurrency, priority) VALUES ($1, $2, $3)
    ON CONFLICT (name) DO UPDATE SET concurrency = excluded.concurrency, priority = excluded.priority
"#;

const ENQUEUE_JOB_QUERY: &str = r#"
INSERT INTO jobs (queue, typename, payload) VALUES ($1, $2, $3) RETURNING id
"#;

const RECORD_EXECUTION_QUERY: &str = r#"
INSERT INTO container_sync_executions (sync_id, job_id) VALUES ($1, $2)
    RETURNING sync_id, job_id, created_at
"#;

pub struct PostgresDispatchStore {
    pool: PgPool,
}

impl PostgresDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_due_sync(row: &sqlx::postgres::PgRow) -> SchedulerResult<DueSync> {
    Ok(DueSync {
        sync_id: row.try_get("id")?,
        provider: row.try_get("provider")?,
        image_queue: row.try_get("image_queue")?,
    })
}

#[async_trait]
impl DispatchStore for PostgresDispatchStore {
    async fn begin_cycle(&self) -> SchedulerResult<Box<dyn CycleTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresCycleTransaction { tx }))
    }
}

/// 单个调度周期的Postgres事务。未commit即drop时由sqlx自动回滚。
struct PostgresCycleTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CycleTransaction for PostgresCycleTransaction {
    #[instrument(skip(self))]
    async fn try_lock_cycle(&mut self) -> SchedulerResult<bool> {
        // 事务级咨询锁，commit或回滚时自动释放
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(CYCLE_LOCK_KEY)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(locked)
    }

    #[instrument(skip(self))]
    async fn list_due_syncs(
        &mut self,
        completed_before: DateTime<Utc>,
    ) -> SchedulerResult<Vec<DueSync>> {
        let rows = sqlx::query(LIST_DUE_SYNCS_QUERY)
            .bind(completed_before)
            .fetch_all(&mut *self.tx)
            .await?;

        let due = rows
            .iter()
            .map(row_to_due_sync)
            .collect::<SchedulerResult<Vec<_>>>()?;

        debug!("资格查询返回 {} 个到期的同步任务", due.len());
        Ok(due)
    }

    #[instrument(skip(self, spec), fields(queue = %spec.name))]
    async fn upsert_queue(&mut self, spec: &QueueSpec) -> SchedulerResult<()> {
        sqlx::query(UPSERT_QUEUE_QUERY)
            .bind(&spec.name)
            .bind(spec.concurrency)
            .bind(spec.priority)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, payload), fields(sync_id = %payload.sync_id))]
    async fn enqueue_job(
        &mut self,
        queue: &str,
        payload: &SyncJobPayload,
    ) -> SchedulerResult<i64> {
        let payload_json = serde_json::to_value(payload)?;

        let job_id: i64 = sqlx::query_scalar(ENQUEUE_JOB_QUERY)
            .bind(queue)
            .bind(SyncJobPayload::TYPENAME)
            .bind(payload_json)
            .fetch_one(&mut *self.tx)
            .await?;

        debug!("作业 {} 已提交到队列 {}", job_id, queue);
        Ok(job_id)
    }

    #[instrument(skip(self), fields(sync_id = %sync_id, job_id = %job_id))]
    async fn record_execution(
        &mut self,
        sync_id: Uuid,
        job_id: i64,
    ) -> SchedulerResult<SyncExecution> {
        let row = sqlx::query(RECORD_EXECUTION_QUERY)
            .bind(sync_id)
            .bind(job_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(SyncExecution {
            sync_id: row.try_get("sync_id")?,
            job_id: row.try_get("job_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn commit(self: Box<Self>) -> SchedulerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument};

use syncsched_domain::{
    entities::{SyncExecution, SyncJobPayload},
    repositories::{CycleTransaction, DispatchStore},
    value_objects::QueuePolicy,
};
use syncsched_errors::SchedulerResult;
use syncsched_infrastructure::MetricsCollector;

/// 容器同步任务的调度周期
///
/// 每次run_cycle执行一趟全有或全无的派发：在一个事务内查询到期的
/// 同步任务，为每个任务先注册队列配置再入队作业并记录执行历史。
/// 任何一步失败整个批次回滚，下个tick自动重试。
pub struct SyncScheduler {
    store: Arc<dyn DispatchStore>,
    policy: QueuePolicy,
    due_delay: Duration,
    metrics: Arc<MetricsCollector>,
}

impl SyncScheduler {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        policy: QueuePolicy,
        due_delay: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            policy,
            due_delay,
            metrics,
        }
    }

    /// 执行一个调度周期，返回本周期新建的执行记录
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> SchedulerResult<Vec<SyncExecution>> {
        let started = Instant::now();

        let result = self.dispatch_due().await;
        match &result {
            Ok(dispatched) => {
                self.metrics
                    .record_cycle(started.elapsed().as_secs_f64(), dispatched.len());
                info!("本次调度完成，共派发了 {} 个同步作业", dispatched.len());
            }
            Err(_) => {
                self.metrics.record_cycle_failure();
            }
        }
        result
    }

    async fn dispatch_due(&self) -> SchedulerResult<Vec<SyncExecution>> {
        let mut tx = self.store.begin_cycle().await?;

        if !tx.try_lock_cycle().await? {
            debug!("未获取到调度周期锁，本轮由其他实例执行");
            return Ok(Vec::new());
        }

        let cutoff = Utc::now() - self.due_delay;
        let due = tx.list_due_syncs(cutoff).await?;
        self.metrics.record_due_syncs(due.len());

        let mut dispatched = Vec::with_capacity(due.len());
        for sync in &due {
            // 队列配置必须先于作业提交生效
            let spec = self.policy.spec_for(sync);
            tx.upsert_queue(&spec).await?;

            let payload = SyncJobPayload::new(sync.sync_id);
            let job_id = tx.enqueue_job(&spec.name, &payload).await?;

            let execution = tx.record_execution(sync.sync_id, job_id).await?;
            debug!(
                "同步任务 {} 已入队作业 {} (队列: {})",
                sync.sync_id, job_id, spec.name
            );
            dispatched.push(execution);
        }

        tx.commit().await?;
        Ok(dispatched)
    }
}

//! 调度周期的数据访问抽象
//!
//! 定义派发周期的事务接口，遵循依赖倒置原则

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{DueSync, SyncExecution, SyncJobPayload};
use crate::value_objects::QueueSpec;
use syncsched_errors::SchedulerResult;

/// 派发存储抽象：每个调度周期开启一个全有或全无的事务
#[async_trait]
pub trait DispatchStore: Send + Sync {
    async fn begin_cycle(&self) -> SchedulerResult<Box<dyn CycleTransaction>>;
}

/// 单个调度周期内的全部读写。未commit就被drop时整体回滚。
///
/// 作业提交在同一事务内完成，因此作业与其执行记录要么同时存在
/// 要么都不存在。
#[async_trait]
pub trait CycleTransaction: Send {
    /// 探测周期级咨询锁；拿不到说明另一实例正在执行本周期
    async fn try_lock_cycle(&mut self) -> SchedulerResult<bool>;

    /// 资格查询：最近一次执行的作业已终态、且完成时间早于 completed_before
    /// （或从未执行过）的同步任务，按任务id排序
    async fn list_due_syncs(
        &mut self,
        completed_before: DateTime<Utc>,
    ) -> SchedulerResult<Vec<DueSync>>;

    /// 幂等地确保队列存在并持有给定的并发/优先级（后写覆盖先写）
    async fn upsert_queue(&mut self, spec: &QueueSpec) -> SchedulerResult<()>;

    /// 向队列提交一个新作业，返回作业标识
    async fn enqueue_job(&mut self, queue: &str, payload: &SyncJobPayload)
        -> SchedulerResult<i64>;

    /// 追加一条执行记录，把同步任务关联到作业
    async fn record_execution(
        &mut self,
        sync_id: Uuid,
        job_id: i64,
    ) -> SchedulerResult<SyncExecution>;

    async fn commit(self: Box<Self>) -> SchedulerResult<()>;
}

//! Mock implementation of the dispatch store
//!
//! Provides an in-memory store with stage-then-commit transaction
//! semantics so tests can exercise the all-or-nothing behavior of the
//! scheduling cycle without a database connection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use syncsched_domain::entities::{ContainerSync, DueSync, JobStatus, SyncExecution, SyncJobPayload};
use syncsched_domain::repositories::{CycleTransaction, DispatchStore};
use syncsched_domain::value_objects::QueueSpec;
use syncsched_errors::{SchedulerError, SchedulerResult};

/// A job row as stored by the mock queue subsystem
#[derive(Debug, Clone)]
pub struct MockJob {
    pub queue: String,
    pub typename: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct MockState {
    syncs: Vec<ContainerSync>,
    executions: Vec<SyncExecution>,
    jobs: HashMap<i64, MockJob>,
    queues: HashMap<String, (Option<i32>, i32)>,
    next_job_id: i64,
    cycle_locked: bool,
    fail_enqueue_for: HashSet<Uuid>,
}

/// Mock implementation of DispatchStore for testing
#[derive(Clone)]
pub struct MockDispatchStore {
    state: Arc<Mutex<MockState>>,
}

impl MockDispatchStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_job_id: 1,
                ..Default::default()
            })),
        }
    }

    /// Register a sync as scheduled (visible to the eligibility query)
    pub fn add_scheduled_sync(&self, sync: &ContainerSync) {
        self.state.lock().unwrap().syncs.push(sync.clone());
    }

    /// Seed an execution record directly (bypassing any transaction)
    pub fn add_execution(&self, sync_id: Uuid, job_id: i64, created_at: DateTime<Utc>) {
        self.state.lock().unwrap().executions.push(SyncExecution {
            sync_id,
            job_id,
            created_at,
        });
    }

    /// Seed a job row directly (bypassing any transaction)
    pub fn add_job(
        &self,
        job_id: i64,
        queue: &str,
        status: JobStatus,
        completed_at: Option<DateTime<Utc>>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.jobs.insert(
            job_id,
            MockJob {
                queue: queue.to_string(),
                typename: SyncJobPayload::TYPENAME.to_string(),
                payload: serde_json::json!({}),
                status,
                completed_at,
            },
        );
        if job_id >= state.next_job_id {
            state.next_job_id = job_id + 1;
        }
    }

    /// Make enqueue_job fail for jobs carrying the given sync id
    pub fn fail_enqueue_for(&self, sync_id: Uuid) {
        self.state.lock().unwrap().fail_enqueue_for.insert(sync_id);
    }

    /// Remove all injected enqueue failures
    pub fn clear_enqueue_failures(&self) {
        self.state.lock().unwrap().fail_enqueue_for.clear();
    }

    pub fn executions_for(&self, sync_id: Uuid) -> Vec<SyncExecution> {
        let state = self.state.lock().unwrap();
        let mut executions: Vec<_> = state
            .executions
            .iter()
            .filter(|e| e.sync_id == sync_id)
            .cloned()
            .collect();
        executions.sort_by_key(|e| e.created_at);
        executions
    }

    pub fn execution_count(&self) -> usize {
        self.state.lock().unwrap().executions.len()
    }

    pub fn queue(&self, name: &str) -> Option<(Option<i32>, i32)> {
        self.state.lock().unwrap().queues.get(name).copied()
    }

    pub fn queue_count(&self) -> usize {
        self.state.lock().unwrap().queues.len()
    }

    pub fn job(&self, job_id: i64) -> Option<MockJob> {
        self.state.lock().unwrap().jobs.get(&job_id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }
}

impl Default for MockDispatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchStore for MockDispatchStore {
    async fn begin_cycle(&self) -> SchedulerResult<Box<dyn CycleTransaction>> {
        Ok(Box::new(MockCycleTransaction {
            state: Arc::clone(&self.state),
            staged_queues: Vec::new(),
            staged_jobs: Vec::new(),
            staged_executions: Vec::new(),
            holds_lock: false,
            finished: false,
        }))
    }
}

/// One in-flight mock cycle. Writes are staged locally and only applied
/// to the shared state on commit; dropping the transaction discards them.
pub struct MockCycleTransaction {
    state: Arc<Mutex<MockState>>,
    staged_queues: Vec<QueueSpec>,
    staged_jobs: Vec<(i64, MockJob)>,
    staged_executions: Vec<SyncExecution>,
    holds_lock: bool,
    finished: bool,
}

#[async_trait]
impl CycleTransaction for MockCycleTransaction {
    async fn try_lock_cycle(&mut self) -> SchedulerResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.cycle_locked {
            return Ok(false);
        }
        state.cycle_locked = true;
        self.holds_lock = true;
        Ok(true)
    }

    async fn list_due_syncs(
        &mut self,
        completed_before: DateTime<Utc>,
    ) -> SchedulerResult<Vec<DueSync>> {
        let state = self.state.lock().unwrap();

        let mut due = Vec::new();
        for sync in &state.syncs {
            let latest = state
                .executions
                .iter()
                .enumerate()
                .filter(|(_, e)| e.sync_id == sync.id)
                .max_by_key(|(idx, e)| (e.created_at, *idx))
                .map(|(_, e)| e);

            let eligible = match latest {
                None => true,
                Some(execution) => match state.jobs.get(&execution.job_id) {
                    // 没有作业记录等同于状态为NULL
                    None => true,
                    Some(job) => {
                        !job.status.is_active()
                            && job.completed_at.map_or(true, |t| t < completed_before)
                    }
                },
            };

            if eligible {
                due.push(DueSync {
                    sync_id: sync.id,
                    provider: sync.provider.clone(),
                    image_queue: sync.image_queue.clone(),
                });
            }
        }

        due.sort_by_key(|d| d.sync_id);
        Ok(due)
    }

    async fn upsert_queue(&mut self, spec: &QueueSpec) -> SchedulerResult<()> {
        self.staged_queues.push(spec.clone());
        Ok(())
    }

    async fn enqueue_job(
        &mut self,
        queue: &str,
        payload: &SyncJobPayload,
    ) -> SchedulerResult<i64> {
        let mut state = self.state.lock().unwrap();

        if state.fail_enqueue_for.contains(&payload.sync_id) {
            return Err(SchedulerError::enqueue_error(queue, "injected enqueue failure"));
        }

        // 外键语义：队列必须已注册（本事务内或已提交均可）
        let queue_known = state.queues.contains_key(queue)
            || self.staged_queues.iter().any(|q| q.name == queue);
        if !queue_known {
            return Err(SchedulerError::database_error(format!(
                "queue does not exist: {queue}"
            )));
        }

        // 序列语义：回滚也不复用作业id
        let job_id = state.next_job_id;
        state.next_job_id += 1;

        self.staged_jobs.push((
            job_id,
            MockJob {
                queue: queue.to_string(),
                typename: SyncJobPayload::TYPENAME.to_string(),
                payload: serde_json::to_value(payload)?,
                status: JobStatus::Pending,
                completed_at: None,
            },
        ));
        Ok(job_id)
    }

    async fn record_execution(
        &mut self,
        sync_id: Uuid,
        job_id: i64,
    ) -> SchedulerResult<SyncExecution> {
        let execution = SyncExecution {
            sync_id,
            job_id,
            created_at: Utc::now(),
        };
        self.staged_executions.push(execution.clone());
        Ok(execution)
    }

    async fn commit(mut self: Box<Self>) -> SchedulerResult<()> {
        let staged_queues = std::mem::take(&mut self.staged_queues);
        let staged_jobs = std::mem::take(&mut self.staged_jobs);
        let mut staged_executions = std::mem::take(&mut self.staged_executions);

        let mut state = self.state.lock().unwrap();
        for spec in staged_queues {
            state
                .queues
                .insert(spec.name, (spec.concurrency, spec.priority));
        }
        for (job_id, job) in staged_jobs {
            state.jobs.insert(job_id, job);
        }
        state.executions.append(&mut staged_executions);
        if self.holds_lock {
            state.cycle_locked = false;
        }
        drop(state);

        self.holds_lock = false;
        self.finished = true;
        Ok(())
    }
}

impl Drop for MockCycleTransaction {
    fn drop(&mut self) {
        // 未提交即丢弃时释放周期锁，暂存写入随之作废
        if !self.finished && self.holds_lock {
            if let Ok(mut state) = self.state.lock() {
                state.cycle_locked = false;
            }
        }
    }
}

//! In-memory stores
//!
//! Process-local implementations of the repository and queue traits. They
//! keep the same guarantees as the Postgres ones (one order per user and
//! product, staged transactional writes, FIFO claims) and expose a few hooks
//! for injecting storage failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use motormart_core::domain::cart::CartItem;
use motormart_core::domain::job::{Job, JobCounts, JobOptions, JobStatus};
use motormart_core::domain::log::LogEntry;
use motormart_core::domain::order::{Order, OrderStatus};
use motormart_core::domain::product::Product;
use motormart_core::outcome::Reply;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::queue::{JobQueue, STALLED_REASON, StalledJobs};
use crate::repository::{CartStore, OrderStore, OrderTransaction, ProductStore, TxOptions};

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    carts: Vec<CartItem>,
    /// Insertion order
    orders: Vec<Order>,
}

/// In-memory product, cart and order store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    writes: Arc<AtomicU64>,
    fail_next_commit: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.tables
            .lock()
            .await
            .products
            .insert(product.id, product);
    }

    pub async fn insert_cart_item(&self, item: CartItem) {
        self.tables.lock().await.carts.push(item);
    }

    /// Number of order writes made durable so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next transaction commit fail, discarding its staged writes
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Makes every operation fail with [`StoreError::Unavailable`] while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        self.check_available()?;
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<CartItem>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .carts
            .iter()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
            .cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_user_and_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Order>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.user_id == user_id && o.product_id == product_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, order: &Order) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let duplicate = tables
            .orders
            .iter()
            .any(|o| o.user_id == order.user_id && o.product_id == order.product_id);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "order already exists for user {} and product {}",
                order.user_id, order.product_id
            )));
        }

        tables.orders.push(order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn begin(&self, _options: TxOptions) -> Result<Box<dyn OrderTransaction>> {
        self.check_available()?;
        let guard = self.tables.clone().lock_owned().await;

        Ok(Box::new(MemoryTransaction {
            guard,
            staged: HashMap::new(),
            writes: self.writes.clone(),
            fail_next_commit: self.fail_next_commit.clone(),
        }))
    }
}

/// Holds the store exclusively; writes are applied only on commit
struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: HashMap<Uuid, OrderStatus>,
    writes: Arc<AtomicU64>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryTransaction {
    fn current(&self, id: Uuid) -> Option<Order> {
        let mut order = self.guard.orders.iter().find(|o| o.id == id).cloned()?;
        if let Some(status) = self.staged.get(&id) {
            order.status = *status;
        }
        Some(order)
    }
}

#[async_trait]
impl OrderTransaction for MemoryTransaction {
    async fn find_for_update(&mut self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.current(id))
    }

    async fn update_status(
        &mut self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool> {
        match self.current(id) {
            Some(order) if order.status == expected => {
                self.staged.insert(id, next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        if this.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "commit rejected by storage".to_string(),
            ));
        }

        let staged = std::mem::take(&mut this.staged);
        for (id, status) in staged {
            if let Some(order) = this.guard.orders.iter_mut().find(|o| o.id == id) {
                order.status = status;
                this.writes.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Job Queue
// =============================================================================

#[derive(Debug, Default)]
struct QueueState {
    next_seq: i64,
    jobs: HashMap<Uuid, Job>,
    logs: HashMap<Uuid, Vec<LogEntry>>,
}

impl QueueState {
    fn job_mut(&mut self, id: Uuid) -> Result<&mut Job> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("job {}", id)))
    }
}

/// In-memory job queue
#[derive(Debug, Clone, Default)]
pub struct MemoryJobQueue {
    state: Arc<Mutex<QueueState>>,
    reject_enqueues: Arc<AtomicBool>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `enqueue` fail with [`StoreError::Unavailable`] while set
    pub fn reject_enqueues(&self, reject: bool) {
        self.reject_enqueues.store(reject, Ordering::SeqCst);
    }
}

fn invalid_state(operation: &str, job: &Job) -> StoreError {
    StoreError::InvalidState(format!(
        "cannot {} job {} in status {}",
        operation, job.id, job.status
    ))
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<Job> {
        if self.reject_enqueues.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("queue offline".to_string()));
        }

        let mut state = self.state.lock().await;
        state.next_seq += 1;
        let now = Utc::now();

        let job = Job {
            id: Uuid::new_v4(),
            queue: queue.to_string(),
            seq: state.next_seq,
            payload,
            status: JobStatus::Waiting,
            progress: 0,
            attempts_made: 0,
            max_attempts: options.max_attempts,
            backoff: options.backoff,
            stalled_count: 0,
            enqueued_at: now,
            available_at: now,
            started_at: None,
            finished_at: None,
            worker_id: None,
            result: None,
            failed_reason: None,
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn claim_next(&self, queue: &str, worker_id: &str) -> Result<Option<Job>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let next = state
            .jobs
            .values_mut()
            .filter(|j| j.queue == queue && j.status == JobStatus::Waiting && j.available_at <= now)
            .min_by_key(|j| j.seq);

        Ok(next.map(|job| {
            job.status = JobStatus::Active;
            job.started_at = Some(now);
            job.worker_id = Some(worker_id.to_string());
            job.attempts_made += 1;
            job.clone()
        }))
    }

    async fn update_progress(&self, id: Uuid, progress: u8) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(&id) {
            job.progress = job.progress.max(progress.min(100));
        }
        Ok(())
    }

    async fn append_logs(&self, id: Uuid, entries: Vec<LogEntry>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.logs.entry(id).or_default().extend(entries);
        Ok(())
    }

    async fn complete(&self, id: Uuid, result: Reply) -> Result<Job> {
        let mut state = self.state.lock().await;
        let job = state.job_mut(id)?;
        if job.status.is_terminal() {
            return Err(invalid_state("complete", job));
        }

        job.status = JobStatus::Completed;
        job.progress = 100;
        job.finished_at = Some(Utc::now());
        job.result = Some(result);
        Ok(job.clone())
    }

    async fn fail(&self, id: Uuid, reason: &str, result: Option<Reply>) -> Result<Job> {
        let mut state = self.state.lock().await;
        let job = state.job_mut(id)?;
        if job.status.is_terminal() {
            return Err(invalid_state("fail", job));
        }

        let now = Utc::now();
        job.failed_reason = Some(reason.to_string());
        job.result = result;
        match job.retry_at(now) {
            Some(available_at) => {
                job.status = JobStatus::Waiting;
                job.available_at = available_at;
                job.started_at = None;
                job.worker_id = None;
            }
            None => {
                job.status = JobStatus::Failed;
                job.finished_at = Some(now);
            }
        }
        Ok(job.clone())
    }

    async fn requeue_stalled(
        &self,
        queue: &str,
        started_before: DateTime<Utc>,
        max_stalled: u32,
    ) -> Result<StalledJobs> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut swept = StalledJobs::default();

        for job in state.jobs.values_mut() {
            let stalled = job.queue == queue
                && job.status == JobStatus::Active
                && job.started_at.is_some_and(|at| at < started_before);
            if !stalled {
                continue;
            }

            if job.stalled_count >= max_stalled {
                job.status = JobStatus::Failed;
                job.finished_at = Some(now);
                job.failed_reason = Some(STALLED_REASON.to_string());
                swept.failed += 1;
            } else {
                job.status = JobStatus::Waiting;
                job.stalled_count += 1;
                job.started_at = None;
                job.worker_id = None;
                job.available_at = now;
                swept.requeued += 1;
            }
        }

        Ok(swept)
    }

    async fn retry(&self, id: Uuid) -> Result<Job> {
        let mut state = self.state.lock().await;
        let job = state.job_mut(id)?;
        if job.status != JobStatus::Failed {
            return Err(invalid_state("retry", job));
        }

        job.status = JobStatus::Waiting;
        job.attempts_made = 0;
        job.stalled_count = 0;
        job.progress = 0;
        job.available_at = Utc::now();
        job.started_at = None;
        job.finished_at = None;
        job.worker_id = None;
        job.result = None;
        job.failed_reason = None;
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn list(&self, queue: &str, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.queue == queue && status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.seq);
        Ok(jobs)
    }

    async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        Ok(self
            .state
            .lock()
            .await
            .logs
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn counts(&self, queue: &str) -> Result<JobCounts> {
        let state = self.state.lock().await;
        let now = Utc::now();
        let mut counts = JobCounts::default();

        for job in state.jobs.values().filter(|j| j.queue == queue) {
            match job.status {
                JobStatus::Waiting if job.is_delayed(now) => counts.delayed += 1,
                JobStatus::Waiting => counts.waiting += 1,
                JobStatus::Active => counts.active += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }

        Ok(counts)
    }
}

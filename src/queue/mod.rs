//! Job queue implementation with database-specific backends.
//!
//! This module defines the queue operations through the [`DatabaseQueue`]
//! trait and provides the generic [`JobQueue`] handle. The PostgreSQL backend
//! lives in `postgres`; an in-memory backend for tests lives in `test`.
//!
//! Every compound state transition (claiming a job, promoting delayed jobs)
//! is a single atomic transaction at the backend. The backend is the sole
//! arbiter of mutual exclusion: correctness holds across processes, not just
//! across tasks in one process.

use crate::{
    Result,
    job::{Job, JobId},
    stats::QueueStats,
};
use async_trait::async_trait;
use sqlx::{Database, Pool};

#[cfg(feature = "postgres")]
pub mod postgres;


/// Queue namespace used when none is given.
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// The operations a queue backend must provide.
///
/// Implementations are required to make each method behave as one atomic unit
/// against the shared store: a timeout or connection failure surfaces as an
/// error with no partial mutation applied.
#[async_trait]
pub trait DatabaseQueue: Send + Sync {
    /// Create the backing tables if they do not exist. Idempotent.
    async fn create_tables(&self) -> Result<()>;

    /// Add one job to the queue and return its id.
    ///
    /// A job whose `run_at` lies in the future (per the backend clock) is
    /// placed in the `delayed` state; otherwise it goes straight into
    /// `inactive`, ordered by `(priority, insertion order)`.
    async fn enqueue(&self, job: Job) -> Result<JobId>;

    /// Add many jobs in a single atomic round-trip.
    ///
    /// Ids are returned in the same order as the input. Each job is placed
    /// delayed-or-inactive individually based on its own `run_at`. An empty
    /// batch is rejected.
    async fn enqueue_batch(&self, jobs: Vec<Job>) -> Result<Vec<JobId>>;

    /// Atomically claim the highest-priority ready job.
    ///
    /// The claimed job moves from `inactive` to `active` and is returned with
    /// `claimed_at` set. Returns `Ok(None)` when no job is ready; that is not
    /// an error. Two concurrent callers can never claim the same job, even
    /// from separate processes.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use driftq::queue::DatabaseQueue;
    ///
    /// # async fn example(queue: &impl DatabaseQueue) -> driftq::Result<()> {
    /// while let Some(job) = queue.dequeue().await? {
    ///     println!("processing {}: {}", job.id, job.payload);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn dequeue(&self) -> Result<Option<Job>>;

    /// Look up a job by id across all states.
    ///
    /// Returns `Ok(None)` for unknown ids. Never mutates state.
    async fn get_job(&self, job_id: JobId) -> Result<Option<Job>>;

    /// Per-state job counts, read as one consistent snapshot.
    async fn queue_stats(&self) -> Result<QueueStats>;

    /// Promote every delayed job whose `run_at` is due into `inactive`.
    ///
    /// Returns the number of jobs promoted. Promoted jobs are ordered among
    /// the already-ready jobs purely by `(priority, insertion order)`; the
    /// promotion time plays no part. Safe to invoke repeatedly and from
    /// concurrent processes: each due job is promoted exactly once, and an
    /// invocation that finds nothing due returns 0 without side effects.
    async fn promote_delayed_jobs(&self) -> Result<u64>;
}

/// A handle to a named job queue backed by a database connection pool.
///
/// The pool is an injected capability: several `JobQueue` instances may share
/// one pool (distinct namespaces over one database) or own separate pools.
///
/// # Examples
///
/// ```rust,no_run
/// use driftq::{Job, JobQueue, queue::DatabaseQueue};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = sqlx::PgPool::connect("postgres://localhost/driftq").await?;
/// let queue = JobQueue::with_name(pool, "emails");
///
/// let job_id = queue.enqueue(Job::new(json!({"to": "user@example.com"}))).await?;
/// # Ok(())
/// # }
/// ```
pub struct JobQueue<DB: Database> {
    pub pool: Pool<DB>,
    pub(crate) queue_name: String,
}

impl<DB: Database> Clone for JobQueue<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            queue_name: self.queue_name.clone(),
        }
    }
}

impl<DB: Database> JobQueue<DB> {
    /// Creates a queue handle over the default namespace.
    pub fn new(pool: Pool<DB>) -> Self {
        Self::with_name(pool, DEFAULT_QUEUE_NAME)
    }

    /// Creates a queue handle bound to the given namespace.
    ///
    /// Jobs enqueued through one namespace are invisible to the others even
    /// when the namespaces share a database.
    pub fn with_name<S: Into<String>>(pool: Pool<DB>, queue_name: S) -> Self {
        Self {
            pool,
            queue_name: queue_name.into(),
        }
    }

    /// The namespace this handle operates on.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// A reference to the underlying connection pool.
    pub fn get_pool(&self) -> &Pool<DB> {
        &self.pool
    }
}

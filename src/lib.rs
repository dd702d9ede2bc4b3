//! # Driftq
//!
//! A priority- and delay-aware job queue for Rust, backed by PostgreSQL as the
//! durable source of truth shared by every producer, consumer, and maintenance
//! process.
//!
//! ## Features
//!
//! - **Atomic job claiming**: concurrent consumers never receive the same job twice,
//!   enforced by the database rather than in-process locking
//! - **Delayed jobs**: jobs with a future activation time sit in the `delayed` state
//!   until a promotion cycle moves them into the ready set
//! - **Integer priorities**: lower values are served first, with insertion order as
//!   a stable tie-break
//! - **Batch enqueueing**: submit many jobs in a single round-trip
//! - **Operational metrics**: a time-bucketed series tracker stored alongside the jobs
//! - **Async/await**: built on Tokio; every operation is one backend round-trip
//! - **Testable**: an in-memory backend with a controllable clock behind the `test`
//!   feature flag
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use driftq::{Job, JobQueue, queue::DatabaseQueue};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/driftq").await?;
//!     let queue = JobQueue::new(pool);
//!     queue.create_tables().await?;
//!
//!     // Enqueue an immediately eligible job
//!     let id = queue.enqueue(Job::new(json!({"task": "send_email"}))).await?;
//!     println!("enqueued {id}");
//!
//!     // Claim the highest-priority ready job
//!     if let Some(job) = queue.dequeue().await? {
//!         println!("claimed {}: {}", job.id, job.payload);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Jobs
//!
//! A job is an opaque JSON payload with a UUID, an integer priority (lower is
//! served first), and an optional activation time (`run_at`). A job is always in
//! exactly one of three states:
//!
//! - `delayed`: holds a future `run_at`; not retrievable until promoted
//! - `inactive`: eligible for retrieval, ordered by `(priority, insertion order)`
//! - `active`: claimed by a consumer
//!
//! What happens to a job after `active` (completion, retries, removal) is the
//! consumer's responsibility, not this crate's.
//!
//! ### Promotion cycles
//!
//! [`DatabaseQueue::promote_delayed_jobs`] moves every due delayed job into the
//! ready set as one atomic transition. The [`maintenance::MaintenanceScheduler`]
//! runs it on a fixed interval; it is safe to run any number of schedulers
//! against the same database.
//!
//! ### Metrics
//!
//! [`metrics::MetricsTracker`] records scalar observations into named series,
//! bucketed per second. Two observations in the same bucket collapse to the
//! later value.
//!
//! ## Feature Flags
//!
//! - `postgres` - PostgreSQL backend support (default)
//! - `test` - in-memory `queue::test::TestQueue` and mock clock for testing

pub mod error;
pub mod job;
pub mod maintenance;
pub mod metrics;
pub mod queue;
pub mod stats;

pub use error::DriftqError;
pub use job::{Job, JobId, JobState};
pub use maintenance::MaintenanceScheduler;
pub use metrics::{MetricPoint, MetricsStore, MetricsTracker};
pub use queue::{DatabaseQueue, JobQueue};
pub use stats::QueueStats;

/// Convenient type alias for Results with [`DriftqError`] as the error type.
pub type Result<T> = std::result::Result<T, DriftqError>;

//! PostgreSQL implementation of the job queue.
//!
//! Single-statement transitions do the heavy lifting here: claiming uses
//! `FOR UPDATE SKIP LOCKED` inside one `UPDATE ... RETURNING`, and promotion
//! is one set-based `UPDATE`. The database clock (`NOW()`) is the authority
//! for deciding whether a `run_at` is due, so producers with skewed clocks
//! cannot disagree about placement.

use super::DatabaseQueue;
use crate::{
    DriftqError, Result,
    job::{Job, JobId, JobState},
    stats::QueueStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Row};

#[derive(FromRow, Clone)]
pub(crate) struct JobRow {
    pub id: uuid::Uuid,
    pub payload: serde_json::Value,
    pub state: String,
    pub priority: i32,
    pub run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    pub fn into_job(self) -> Result<Job> {
        Ok(Job {
            id: self.id,
            payload: self.payload,
            priority: self.priority,
            run_at: self.run_at,
            state: JobState::parse_from_db(&self.state)?,
            created_at: self.created_at,
            claimed_at: self.claimed_at,
        })
    }
}

const JOB_COLUMNS: &str = "id, payload, state, priority, run_at, created_at, claimed_at";

#[async_trait]
impl DatabaseQueue for crate::queue::JobQueue<Postgres> {
    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS driftq_jobs (
                id UUID PRIMARY KEY,
                queue_name TEXT NOT NULL,
                seq BIGSERIAL,
                payload JSONB NOT NULL,
                state TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                run_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                claimed_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_driftq_jobs_ready
            ON driftq_jobs (queue_name, state, priority, seq)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_driftq_jobs_due
            ON driftq_jobs (queue_name, state, run_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn enqueue(&self, job: Job) -> Result<JobId> {
        sqlx::query(
            r#"
            INSERT INTO driftq_jobs (id, queue_name, payload, state, priority, run_at, created_at)
            VALUES ($1, $2, $3,
                    CASE WHEN $5::timestamptz IS NULL OR $5 <= NOW() THEN 'inactive' ELSE 'delayed' END,
                    $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(&self.queue_name)
        .bind(&job.payload)
        .bind(job.priority)
        .bind(job.run_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        Ok(job.id)
    }

    async fn enqueue_batch(&self, jobs: Vec<Job>) -> Result<Vec<JobId>> {
        if jobs.is_empty() {
            return Err(DriftqError::Queue {
                message: "cannot enqueue an empty batch".to_string(),
            });
        }

        let mut ids = Vec::with_capacity(jobs.len());
        let mut payloads = Vec::with_capacity(jobs.len());
        let mut priorities = Vec::with_capacity(jobs.len());
        let mut run_ats = Vec::with_capacity(jobs.len());
        let mut created_ats = Vec::with_capacity(jobs.len());

        for job in &jobs {
            ids.push(job.id);
            payloads.push(job.payload.clone());
            priorities.push(job.priority);
            run_ats.push(job.run_at);
            created_ats.push(job.created_at);
        }

        // WITH ORDINALITY keeps seq assignment in input order.
        sqlx::query(
            r#"
            INSERT INTO driftq_jobs (id, queue_name, payload, state, priority, run_at, created_at)
            SELECT t.id, $1, t.payload,
                   CASE WHEN t.run_at IS NULL OR t.run_at <= NOW() THEN 'inactive' ELSE 'delayed' END,
                   t.priority, t.run_at, t.created_at
            FROM UNNEST($2::uuid[], $3::jsonb[], $4::integer[], $5::timestamptz[], $6::timestamptz[])
                 WITH ORDINALITY AS t(id, payload, priority, run_at, created_at, ord)
            ORDER BY t.ord
            "#,
        )
        .bind(&self.queue_name)
        .bind(&ids)
        .bind(&payloads)
        .bind(&priorities)
        .bind(&run_ats)
        .bind(&created_ats)
        .execute(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn dequeue(&self) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE driftq_jobs
            SET state = 'active', claimed_at = NOW()
            WHERE id = (
                SELECT id FROM driftq_jobs
                WHERE queue_name = $1 AND state = 'inactive'
                ORDER BY priority ASC, seq ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload, state, priority, run_at, created_at, claimed_at
            "#,
        )
        .bind(&self.queue_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    async fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM driftq_jobs WHERE queue_name = $1 AND id = $2"
        ))
        .bind(&self.queue_name)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE state = 'delayed') AS delayed_count,
                COUNT(*) FILTER (WHERE state = 'inactive') AS inactive_count,
                COUNT(*) FILTER (WHERE state = 'active') AS active_count,
                COUNT(*) AS total_count
            FROM driftq_jobs
            WHERE queue_name = $1
            "#,
        )
        .bind(&self.queue_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueStats {
            delayed_count: row.try_get::<i64, _>("delayed_count")? as u64,
            inactive_count: row.try_get::<i64, _>("inactive_count")? as u64,
            active_count: row.try_get::<i64, _>("active_count")? as u64,
            total_count: row.try_get::<i64, _>("total_count")? as u64,
        })
    }

    async fn promote_delayed_jobs(&self) -> Result<u64> {
        // Concurrent cycles race on the same rows; the losers re-check the
        // WHERE clause after the lock and skip rows already promoted.
        let result = sqlx::query(
            r#"
            UPDATE driftq_jobs
            SET state = 'inactive'
            WHERE queue_name = $1 AND state = 'delayed' AND run_at <= NOW()
            "#,
        )
        .bind(&self.queue_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row(state: &str) -> JobRow {
        JobRow {
            id: uuid::Uuid::new_v4(),
            payload: json!({"n": 1}),
            state: state.to_string(),
            priority: 5,
            run_at: None,
            created_at: Utc::now(),
            claimed_at: None,
        }
    }

    #[test]
    fn test_row_maps_into_job() {
        let row = sample_row("delayed");
        let id = row.id;
        let job = row.into_job().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.state, JobState::Delayed);
        assert_eq!(job.priority, 5);
    }

    #[test]
    fn test_row_rejects_unknown_state() {
        let row = sample_row("paused");
        assert!(matches!(
            row.into_job(),
            Err(DriftqError::Queue { .. })
        ));
    }
}

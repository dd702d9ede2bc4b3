use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JobId = Uuid;

/// The state a job occupies in its lifecycle.
///
/// A job is always in exactly one state; state transitions happen atomically
/// with the membership change in the backing store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Holds a future `run_at`; must be promoted before it can be claimed.
    Delayed,
    /// Eligible for retrieval, ordered by `(priority, insertion order)`.
    Inactive,
    /// Claimed by a consumer. Later lifecycle is the consumer's concern.
    Active,
}

impl JobState {
    /// Database representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Delayed => "delayed",
            JobState::Inactive => "inactive",
            JobState::Active => "active",
        }
    }

    /// Parse the database representation back into a state.
    pub(crate) fn parse_from_db(s: &str) -> crate::Result<Self> {
        match s {
            "delayed" => Ok(JobState::Delayed),
            "inactive" => Ok(JobState::Inactive),
            "active" => Ok(JobState::Active),
            other => Err(crate::DriftqError::Queue {
                message: format!("unknown job state: {}", other),
            }),
        }
    }
}

/// A unit of work owned by the queue.
///
/// The payload is caller-supplied JSON, stored verbatim and returned unchanged.
/// Lower `priority` values are served earlier; jobs with equal priority are
/// served in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub payload: serde_json::Value,
    pub priority: i32,
    /// Absolute time after which the job becomes eligible. `None` means
    /// immediately eligible.
    pub run_at: Option<DateTime<Utc>>,
    /// Assigned by the queue at enqueue time; the backend clock decides
    /// whether a `run_at` is already due.
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates an immediately eligible job with the default priority of 0.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            priority: 0,
            run_at: None,
            state: JobState::Inactive,
            created_at: Utc::now(),
            claimed_at: None,
        }
    }

    /// Creates a job that becomes eligible only after `delay` has elapsed.
    pub fn with_delay(payload: serde_json::Value, delay: chrono::Duration) -> Self {
        let mut job = Self::new(payload);
        job.run_at = Some(job.created_at + delay);
        job
    }

    /// Sets the job's priority. Lower values are served earlier.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets an absolute activation time. The queue keeps the job in the
    /// `delayed` state until a promotion cycle finds `run_at` due.
    pub fn delayed_until(mut self, run_at: DateTime<Utc>) -> Self {
        self.run_at = Some(run_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new(json!({"kind": "email"}));
        assert_eq!(job.priority, 0);
        assert!(job.run_at.is_none());
        assert_eq!(job.state, JobState::Inactive);
        assert!(job.claimed_at.is_none());
    }

    #[test]
    fn test_with_delay_sets_run_at() {
        let job = Job::with_delay(json!(1), chrono::Duration::seconds(30));
        assert_eq!(job.run_at, Some(job.created_at + chrono::Duration::seconds(30)));
    }

    #[test]
    fn test_builders() {
        let run_at = Utc::now() + chrono::Duration::minutes(5);
        let job = Job::new(json!("raw")).with_priority(-3).delayed_until(run_at);
        assert_eq!(job.priority, -3);
        assert_eq!(job.run_at, Some(run_at));
    }

    #[test]
    fn test_state_round_trip() {
        for state in [JobState::Delayed, JobState::Inactive, JobState::Active] {
            assert_eq!(JobState::parse_from_db(state.as_str()).unwrap(), state);
        }
        assert!(JobState::parse_from_db("completed").is_err());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobState::Delayed).unwrap(),
            "\"delayed\""
        );
        let state: JobState = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(state, JobState::Inactive);
    }
}

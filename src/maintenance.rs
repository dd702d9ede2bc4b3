//! Recurring promotion of delayed jobs.
//!
//! The queue itself does not own a timer; something has to call
//! [`DatabaseQueue::promote_delayed_jobs`] on a schedule. `MaintenanceScheduler`
//! is that something: a small loop that runs the promotion cycle at a fixed
//! interval until told to shut down. Promotion is exactly-once per job at the
//! backend, so running several schedulers against the same database is safe.

use crate::{Result, queue::DatabaseQueue};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, error, info};

pub struct MaintenanceScheduler<Q> {
    queue: Arc<Q>,
    cycle_interval: Duration,
}

impl<Q> MaintenanceScheduler<Q>
where
    Q: DatabaseQueue,
{
    pub fn new(queue: Arc<Q>) -> Self {
        Self {
            queue,
            cycle_interval: Duration::from_secs(1),
        }
    }

    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    /// Run promotion cycles until a shutdown signal arrives (or every sender
    /// is dropped).
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!("Maintenance scheduler started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Maintenance scheduler shutting down");
                    break;
                }
                _ = sleep(self.cycle_interval) => {
                    self.run_cycle().await;
                }
            }
        }

        Ok(())
    }

    /// One promotion cycle. Errors are logged and the loop continues; the
    /// cycle itself is never retried, the next tick simply runs again.
    async fn run_cycle(&self) {
        match self.queue.promote_delayed_jobs().await {
            Ok(0) => {}
            Ok(promoted) => debug!("Promoted {} delayed jobs", promoted),
            Err(e) => error!("Delayed job promotion failed: {}", e),
        }
    }
}

#[cfg(all(test, feature = "test"))]
mod tests {
    use super::*;
    use crate::{Job, JobState, queue::test::TestQueue};
    use serde_json::json;

    #[tokio::test]
    async fn test_scheduler_promotes_due_jobs() {
        let queue = Arc::new(TestQueue::new());
        let clock = queue.clock().await;

        let job_id = queue
            .enqueue(Job::new(json!(1)).delayed_until(clock.now() + chrono::Duration::seconds(30)))
            .await
            .unwrap();

        let scheduler = MaintenanceScheduler::new(queue.clone())
            .with_cycle_interval(Duration::from_millis(10));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        // Nothing due yet: the job must stay delayed across cycles.
        sleep(Duration::from_millis(50)).await;
        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Delayed);

        clock.advance(chrono::Duration::seconds(31));
        sleep(Duration::from_millis(100)).await;
        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Inactive);

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let queue = Arc::new(TestQueue::new());
        let scheduler =
            MaintenanceScheduler::new(queue).with_cycle_interval(Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();
    }
}

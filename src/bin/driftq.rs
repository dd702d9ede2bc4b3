use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use driftq::{Job, JobQueue, queue::DatabaseQueue};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/driftq";

#[derive(Parser)]
#[command(name = "driftq")]
#[command(about = "A priority- and delay-aware job queue over PostgreSQL")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Add jobs to the queue")]
    Add {
        #[arg(
            short = 'r',
            long = "database-url",
            default_value = DEFAULT_DATABASE_URL,
            help = "Database connection URL"
        )]
        database_url: String,
        #[arg(
            short = 'j',
            long = "job",
            help = "Job to add; repeatable. Reads one job per line from stdin when absent"
        )]
        job: Vec<String>,
        #[arg(
            short = 'b',
            long = "batch",
            default_value_t = 25,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Number of jobs submitted per round-trip"
        )]
        batch: u32,
        #[arg(
            short = 'p',
            long = "priority",
            default_value_t = 0,
            help = "Job priority, lower numbers are processed first"
        )]
        priority: i32,
    },
    #[command(about = "Get a job from the queue")]
    Get {
        #[arg(
            short = 'r',
            long = "database-url",
            default_value = DEFAULT_DATABASE_URL,
            help = "Database connection URL"
        )]
        database_url: String,
        #[arg(help = "Job id")]
        id: String,
    },
}

/// A raw job line from the command line or stdin: either structured JSON or
/// an opaque string. Parse failure is a normal outcome here, not an error.
enum JobInput {
    Structured(serde_json::Value),
    Raw(String),
}

impl JobInput {
    fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => JobInput::Structured(value),
            Err(_) => JobInput::Raw(raw.to_string()),
        }
    }

    fn into_payload(self) -> serde_json::Value {
        match self {
            JobInput::Structured(value) => value,
            JobInput::Raw(raw) => serde_json::Value::String(raw),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Add {
            database_url,
            job,
            batch,
            priority,
        } => add_jobs(&database_url, job, batch as usize, priority).await,
        Commands::Get { database_url, id } => get_job(&database_url, &id).await,
    }
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "driftq=debug" } else { "driftq=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn connect(database_url: &str) -> Result<JobQueue<sqlx::Postgres>> {
    let pool = sqlx::PgPool::connect(database_url)
        .await
        .with_context(|| format!("failed to connect to {database_url}"))?;
    let queue = JobQueue::new(pool);
    queue.create_tables().await?;
    Ok(queue)
}

async fn add_jobs(database_url: &str, jobs: Vec<String>, batch: usize, priority: i32) -> Result<()> {
    let queue = connect(database_url).await?;
    let mut pending: Vec<Job> = Vec::with_capacity(batch);

    if jobs.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            pending.push(build_job(&line, priority));
            if pending.len() == batch {
                flush(&queue, &mut pending).await?;
            }
        }
    } else {
        for raw in &jobs {
            pending.push(build_job(raw, priority));
            if pending.len() == batch {
                flush(&queue, &mut pending).await?;
            }
        }
    }

    if !pending.is_empty() {
        flush(&queue, &mut pending).await?;
    }

    Ok(())
}

fn build_job(raw: &str, priority: i32) -> Job {
    Job::new(JobInput::parse(raw).into_payload()).with_priority(priority)
}

/// Submit the collected batch and print one id per line in submission order.
async fn flush(queue: &JobQueue<sqlx::Postgres>, pending: &mut Vec<Job>) -> Result<()> {
    let ids = queue.enqueue_batch(std::mem::take(pending)).await?;
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

async fn get_job(database_url: &str, id: &str) -> Result<()> {
    let job_id = Uuid::parse_str(id).with_context(|| format!("invalid job id: {id}"))?;

    let queue = connect(database_url).await?;
    match queue.get_job(job_id).await? {
        Some(job) => println!("{}", serde_json::to_string_pretty(&job)?),
        None => println!("null"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_input_parses_as_json() {
        let payload = JobInput::parse(r#"{"task": "resize", "width": 800}"#).into_payload();
        assert_eq!(payload, json!({"task": "resize", "width": 800}));
    }

    #[test]
    fn test_malformed_input_falls_back_to_raw_string() {
        let payload = JobInput::parse("{not json").into_payload();
        assert_eq!(payload, json!("{not json"));
    }

    #[test]
    fn test_bare_scalar_is_structured() {
        assert_eq!(JobInput::parse("42").into_payload(), json!(42));
        assert_eq!(JobInput::parse("\"quoted\"").into_payload(), json!("quoted"));
    }

    #[test]
    fn test_build_job_applies_priority() {
        let job = build_job("work", 7);
        assert_eq!(job.priority, 7);
        assert_eq!(job.payload, json!("work"));
    }
}

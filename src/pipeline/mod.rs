//! Submission pipeline — drives each unit through the remote call sequence
//!
//! One [`SubmissionPipeline`] is constructed per batch run and holds the
//! client, target and policy context immutably, so units can be processed
//! from many workers without shared mutable state. Fan-out is bounded by a
//! semaphore sized from `batch.max_concurrent_units`; per-unit failures are
//! recorded and never abort the batch.

mod unit_task;

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, broadcast};
use tokio::task::JoinSet;

use crate::client::CanvasClient;
use crate::config::{AssignmentTarget, Config};
use crate::error::Result;
use crate::types::{Event, StudentId, SubmissionResult, SubmissionUnit, UnitOutcome};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Batch pipeline for one assignment on one grading service
pub struct SubmissionPipeline {
    client: Arc<CanvasClient>,
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
}

impl SubmissionPipeline {
    /// Create a pipeline for one batch run
    ///
    /// The configuration and target are captured immutably for the lifetime
    /// of the pipeline; a new run against a different assignment needs a new
    /// pipeline.
    pub fn new(config: Config, target: AssignmentTarget) -> Result<Self> {
        let client = CanvasClient::new(&config.api, target)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            event_tx,
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Consumers get one [`Event`] per unit per step outcome plus a final
    /// [`Event::BatchCompleted`]. Slow consumers may observe lagged drops;
    /// the authoritative record is the result list returned by
    /// [`run`](Self::run).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Process a batch of units and return one result per unit
    ///
    /// Units are processed with bounded concurrency and no ordering
    /// guarantee between them; steps within a unit are strictly sequential.
    /// A batch of N units always yields exactly N results, however many
    /// fail.
    pub async fn run(&self, units: Vec<SubmissionUnit>) -> Vec<SubmissionResult> {
        let total = units.len();
        let concurrency = self.config.batch.max_concurrent_units.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let results: Arc<Mutex<Vec<SubmissionResult>>> =
            Arc::new(Mutex::new(Vec::with_capacity(total)));

        tracing::info!(
            total,
            concurrency,
            course_id = %self.client.target().course_id,
            assignment_id = %self.client.target().assignment_id,
            "starting batch"
        );

        let mut tasks = JoinSet::new();
        for unit in units {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let config = Arc::clone(&self.config);
            let event_tx = self.event_tx.clone();
            let results = Arc::clone(&results);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        unit_task::process_unit(&client, &config, &event_tx, unit).await
                    }
                    // The semaphore is never closed while tasks run, but a
                    // unit must still account for an outcome if it were.
                    Err(_) => failed_result(unit.student_id, "pipeline shut down"),
                };
                results.lock().await.push(result);
            });
        }

        while tasks.join_next().await.is_some() {}

        let outcomes = {
            let mut guard = results.lock().await;
            std::mem::take(&mut *guard)
        };
        let failed = outcomes
            .iter()
            .filter(|result| result.outcome.is_failed())
            .count();

        tracing::info!(total, failed, "batch complete");
        self.event_tx
            .send(Event::BatchCompleted { total, failed })
            .ok();

        outcomes
    }
}

fn failed_result(student_id: StudentId, reason: &str) -> SubmissionResult {
    SubmissionResult {
        student_id,
        outcome: UnitOutcome::Failed(reason.to_string()),
    }
}

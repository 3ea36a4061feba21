//! Delayed jobs and the live poll auto-advance processor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{PollError, Result};
use crate::host::Host;
use crate::models::user::User;
use crate::sequencer::{Advance, LivePollSequencer};

pub const NEXT_POLL_JOB: &str = "nextPoll";

/// What a scheduled job needs to know when it fires.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    #[serde(rename = "setId")]
    pub set_id: String,
    /// Index the set is expected to be on when the job fires.
    #[serde(rename = "expectedIndex")]
    pub expected_index: usize,
    pub user: User,
    pub room: String,
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(&self, job_id: &str, context: JobContext, delay: Duration) -> Result<()>;
}

#[async_trait]
pub trait JobProcessor: Send + Sync {
    fn id(&self) -> &'static str;

    /// Runs the job. Failures are dealt with here; nothing reaches the scheduler.
    async fn process(&self, context: JobContext);
}

/// Advances a live poll set when its poll's time-to-vote runs out.
pub struct NextPollProcessor {
    sequencer: Arc<LivePollSequencer>,
    host: Arc<dyn Host>,
}

impl NextPollProcessor {
    pub fn new(sequencer: Arc<LivePollSequencer>, host: Arc<dyn Host>) -> Self {
        NextPollProcessor { sequencer, host }
    }
}

#[async_trait]
impl JobProcessor for NextPollProcessor {
    fn id(&self) -> &'static str {
        NEXT_POLL_JOB
    }

    async fn process(&self, context: JobContext) {
        match self
            .sequencer
            .advance(&context.set_id, context.expected_index)
            .await
        {
            Ok(Advance::Stale) => {
                debug!(
                    "Ignoring stale {} job for {} at index {}",
                    NEXT_POLL_JOB, context.set_id, context.expected_index
                );
            }
            Ok(advance) => debug!("{} job for {}: {:?}", NEXT_POLL_JOB, context.set_id, advance),
            Err(e) => {
                error!("Failed to advance poll set {}: {}", context.set_id, e);
                if let Err(notify_err) = self
                    .host
                    .notify_user(&context.user, &context.room, &e.notice())
                    .await
                {
                    error!("Failed to notify {} about it: {}", context.user.id, notify_err);
                }
            }
        }
    }
}

/// Runs each job on its own tokio task once its delay has elapsed.
#[derive(Default)]
pub struct TokioScheduler {
    processors: OnceCell<HashMap<&'static str, Arc<dyn JobProcessor>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the job processors. Only the first call succeeds.
    pub fn register_processors(&self, processors: Vec<Arc<dyn JobProcessor>>) -> Result<()> {
        let table = processors
            .into_iter()
            .map(|processor| (processor.id(), processor))
            .collect::<HashMap<_, _>>();
        let ids: Vec<_> = table.keys().copied().collect();
        self.processors
            .set(table)
            .map_err(|_| PollError::Scheduler("job processors are already registered".to_owned()))?;
        info!("Registered job processors: {:?}", ids);
        Ok(())
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn schedule(&self, job_id: &str, context: JobContext, delay: Duration) -> Result<()> {
        let processor = self
            .processors
            .get()
            .and_then(|table| table.get(job_id))
            .cloned()
            .ok_or_else(|| PollError::Scheduler(format!("no processor registered for {job_id}")))?;

        debug!("Scheduling {} for {} in {:?}", job_id, context.set_id, delay);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            processor.process(context).await;
        });
        Ok(())
    }
}

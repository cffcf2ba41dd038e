//! Built-in task producer
//!
//! Emits one word from a fixed vocabulary into the ingress queue on a fixed
//! cadence. Deployments with their own producer disable it and push into the
//! coordinator's ingress sender directly.

use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::Task;

/// Default emission cadence
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Default vocabulary
pub const DEFAULT_VOCABULARY: &[&str] = &["foo", "bar", "baz", "foobar", "foobaz"];

pub struct TaskSource {
    interval: Duration,
    vocabulary: Vec<Bytes>,
    rng: StdRng,
}

impl TaskSource {
    pub fn new(interval: Duration, vocabulary: &[String]) -> Result<Self> {
        Self::with_rng(interval, vocabulary, StdRng::from_entropy())
    }

    pub fn with_seed(interval: Duration, vocabulary: &[String], seed: u64) -> Result<Self> {
        Self::with_rng(interval, vocabulary, StdRng::seed_from_u64(seed))
    }

    fn with_rng(interval: Duration, vocabulary: &[String], rng: StdRng) -> Result<Self> {
        if vocabulary.is_empty() {
            return Err(Error::config_field_invalid(
                "task_source.vocabulary",
                "must contain at least one entry",
            ));
        }
        Ok(Self {
            interval,
            vocabulary: vocabulary.iter().map(|w| Bytes::from(w.clone())).collect(),
            rng,
        })
    }

    /// Pick the next payload, uniformly over the whole vocabulary
    pub fn next_task(&mut self) -> Task {
        let idx = self.rng.gen_range(0..self.vocabulary.len());
        Task::from(self.vocabulary[idx].clone())
    }

    /// Emit a task every interval until the ingress queue closes.
    ///
    /// Returns the number of tasks emitted.
    pub async fn run(mut self, ingress: mpsc::Sender<Task>) -> u64 {
        let mut emitted = 0u64;
        info!(
            interval_ms = self.interval.as_millis() as u64,
            vocabulary = self.vocabulary.len(),
            "Task source started"
        );

        loop {
            tokio::time::sleep(self.interval).await;
            let task = self.next_task();
            info!(task = %task, "Emitting task");
            if ingress.send(task).await.is_err() {
                debug!("Ingress queue closed");
                break;
            }
            emitted += 1;
        }

        info!(emitted, "Task source stopped");
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn vocabulary() -> Vec<String> {
        DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_every_word_can_be_picked() {
        let mut source = TaskSource::with_seed(DEFAULT_INTERVAL, &vocabulary(), 9).unwrap();
        let seen: HashSet<String> = (0..1000).map(|_| source.next_task().to_string()).collect();

        assert_eq!(seen.len(), DEFAULT_VOCABULARY.len());
        assert!(seen.contains("foobaz"));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let err = TaskSource::new(DEFAULT_INTERVAL, &[]).err().unwrap();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_on_cadence_until_queue_closes() {
        let interval = Duration::from_secs(2);
        let source = TaskSource::with_seed(interval, &vocabulary(), 1).unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let start = tokio::time::Instant::now();

        let handle = tokio::spawn(source.run(tx));

        for _ in 0..3 {
            let task = rx.recv().await.unwrap();
            assert!(DEFAULT_VOCABULARY.contains(&task.to_string().as_str()));
        }
        assert!(start.elapsed() >= interval * 3);

        drop(rx);
        assert_eq!(handle.await.unwrap(), 3);
    }
}

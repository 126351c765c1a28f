use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::db::{Sample, SampleStore};
use crate::error::Result;
use crate::probe::probe_all;
use crate::query::now_secs;
use crate::registry::Registry;

/// Background task that runs one probe pass per interval and persists the
/// results as a single timestamped batch. Sole writer to the sample store.
pub struct Sampler {
    registry: Arc<Registry>,
    store: Arc<dyn SampleStore>,
    health: Arc<HealthState>,
    interval_secs: u64,
    probe_timeout: Duration,
    max_workers: usize,
}

impl Sampler {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn SampleStore>,
        health: Arc<HealthState>,
        interval_secs: u64,
        probe_timeout: Duration,
        max_workers: usize,
    ) -> Self {
        Self {
            registry,
            store,
            health,
            interval_secs,
            probe_timeout,
            max_workers,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            targets = self.registry.len(),
            interval_secs = self.interval_secs,
            "Sampler started"
        );

        loop {
            let started = Instant::now();
            // A failed persist loses this pass only; the next tick starts fresh.
            if let Err(e) = self.sample_once().await {
                error!("Sample pass failed: {e}");
            }

            let pause = sleep_duration(self.interval_secs, started.elapsed());
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sampler stopped");
                    return;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    async fn sample_once(&self) -> Result<()> {
        let started = Instant::now();
        let statuses =
            probe_all(self.registry.targets(), self.probe_timeout, self.max_workers).await;

        // One timestamp per pass, shared by every sample in the batch.
        let ts = now_secs();
        let online = statuses.iter().filter(|s| s.online).count();
        let samples: Vec<Sample> = statuses
            .into_iter()
            .map(|s| Sample {
                host: s.host,
                port: s.port,
                ts,
                online: s.online,
            })
            .collect();

        self.store.insert_batch(&samples).await?;
        self.health.record_pass(ts, samples.len() as u64);

        info!(
            targets = samples.len(),
            online,
            ts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sample pass persisted"
        );
        Ok(())
    }
}

/// Drift-corrected pause until the next pass: the configured interval minus
/// the wall-clock time the pass took, floored at 1s so a slow pass can never
/// turn the loop into a busy spin.
pub fn sleep_duration(interval_secs: u64, elapsed: Duration) -> Duration {
    let remaining = interval_secs as f64 - elapsed.as_secs_f64();
    Duration::from_secs_f64(remaining.max(1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_is_the_interval_remainder() {
        let pause = sleep_duration(60, Duration::from_secs(45));
        assert!((pause.as_secs_f64() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn sleep_floors_at_one_second_when_the_pass_overruns() {
        assert_eq!(sleep_duration(60, Duration::from_secs(75)), Duration::from_secs(1));
        assert_eq!(sleep_duration(60, Duration::from_secs(60)), Duration::from_secs(1));
        assert_eq!(sleep_duration(60, Duration::from_secs(59)), Duration::from_secs(1));
    }

    #[test]
    fn fast_pass_sleeps_nearly_the_full_interval() {
        let pause = sleep_duration(60, Duration::from_millis(250));
        assert!((pause.as_secs_f64() - 59.75).abs() < 1e-9);
    }
}

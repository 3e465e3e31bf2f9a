use crate::models::{MetricKind, MetricSample};
use crate::window::MetricBoard;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Something that can be read for the current value of a live metric.
pub trait SampleSource: Send + 'static {
    fn read(&mut self, kind: MetricKind) -> f64;
}

/// Stand-in for the operations feed, producing values in the same ranges the
/// real pipeline reports.
pub struct SimulatedSource {
    rng: StdRng,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SimulatedSource {
    fn read(&mut self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Throughput => f64::from(self.rng.gen_range(95_000..100_000)),
            MetricKind::Latency => f64::from(self.rng.gen_range(100..150)),
            MetricKind::ErrorRate => self.rng.gen_range(0.0..0.5),
        }
    }
}

/// All samples taken on one tick.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    pub taken_at: DateTime<Utc>,
    pub samples: Vec<(MetricKind, MetricSample)>,
}

impl SampleBatch {
    pub fn apply(&self, board: &mut MetricBoard) {
        for (kind, sample) in &self.samples {
            board.record(*kind, *sample);
        }
    }
}

/// Handle to a running sample producer. Dropping the handle also stops it.
pub struct Producer {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Producer {
    pub fn start<S: SampleSource>(
        mut source: S,
        interval: Duration,
        tx: mpsc::Sender<SampleBatch>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            tracing::info!(interval_ms = period.as_millis() as u64, "sample producer started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                let batch = take_batch(&mut source, Utc::now());
                // A full channel must not hold off a stop request.
                tokio::select! {
                    _ = &mut stop_rx => break,
                    sent = tx.send(batch) => {
                        if sent.is_err() {
                            tracing::debug!("sample consumer went away");
                            break;
                        }
                    }
                }
            }
            tracing::info!("sample producer stopped");
        });

        Self {
            stop: Some(stop_tx),
            handle,
        }
    }

    /// Stops production and waits for the task to exit. Windows fed by this
    /// producer are left untouched.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            // The task may already have exited on a closed channel.
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.handle).await {
            tracing::warn!(error = %err, "sample producer task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn take_batch<S: SampleSource>(source: &mut S, taken_at: DateTime<Utc>) -> SampleBatch {
    let samples = MetricKind::ALL
        .into_iter()
        .filter_map(|kind| match MetricSample::new(taken_at, source.read(kind)) {
            Ok(sample) => Some((kind, sample)),
            Err(err) => {
                tracing::warn!(metric = kind.key(), error = %err, "rejected sample");
                None
            }
        })
        .collect();
    SampleBatch { taken_at, samples }
}

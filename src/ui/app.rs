use crate::models::MetricKind;
use crate::sampler::SampleBatch;
use crate::window::MetricBoard;
use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LiveState {
    pub running: bool,
    pub paused: bool,
    pub status: String,
    pub interval: Duration,
    pub board: MetricBoard,
    pub ticks: u64,
    pub last_sample: Option<DateTime<Utc>>,
}

impl LiveState {
    pub fn new(capacity: NonZeroUsize, interval: Duration) -> Self {
        Self {
            running: true,
            paused: false,
            status: "waiting for samples".into(),
            interval,
            board: MetricBoard::new(capacity),
            ticks: 0,
            last_sample: None,
        }
    }

    pub fn apply(&mut self, batch: &SampleBatch) {
        batch.apply(&mut self.board);
        self.ticks += 1;
        self.last_sample = Some(batch.taken_at);
        if !self.paused {
            self.status = "live".into();
        }
    }

    /// Current value as shown on a metric card; `0` until the first sample.
    pub fn headline(&self, kind: MetricKind) -> String {
        match self.board.latest(kind) {
            Some(sample) => format_value(kind, sample.value()),
            None => "0".into(),
        }
    }

    /// Window values scaled to integers for the sparkline widgets.
    pub fn spark_data(&self, kind: MetricKind) -> Vec<u64> {
        let scale = match kind {
            MetricKind::ErrorRate => 1000.0,
            MetricKind::Throughput | MetricKind::Latency => 1.0,
        };
        self.board
            .window(kind)
            .map(|w| {
                w.snapshot()
                    .iter()
                    .map(|s| (s.value() * scale).max(0.0).round() as u64)
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub fn format_value(kind: MetricKind, value: f64) -> String {
    match kind {
        MetricKind::Throughput => group_thousands(value.round() as i64),
        MetricKind::Latency => format!("{value:.0}"),
        MetricKind::ErrorRate => format!("{value:.3}"),
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// One status line per tick for non-interactive runs.
pub fn headless_line(state: &LiveState) -> String {
    let parts: Vec<String> = MetricKind::ALL
        .into_iter()
        .map(|kind| {
            let len = state.board.window(kind).map_or(0, |w| w.len());
            format!(
                "{}={} {} [{}]",
                kind.key(),
                state.headline(kind),
                kind.unit(),
                len
            )
        })
        .collect();
    format!("tick {:>3}  {}", state.ticks, parts.join("  "))
}

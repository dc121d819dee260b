use std::{
    future::Future,
    io::Write,
    num::NonZeroU64,
    time::{Duration, Instant},
};

use serde::Deserialize;
use typed_builder::TypedBuilder;

use crate::{
    record::Synthesizer, reporter::RateReporter, template::Template, transport::Transport, Error,
};

pub const DEFAULT_REPORT_EVERY: NonZeroU64 = match NonZeroU64::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// What to do when a request cannot be delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OnError {
    /// Stop the run with a failure on the first transport error.
    #[default]
    Abort,
    /// Log the error, count it and keep sending.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Requests issued, failed ones included.
    pub sent: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

#[derive(TypedBuilder)]
pub struct Runner<W: Write> {
    template: Template,
    synthesizer: Synthesizer,
    transport: Transport,

    /// `None` runs until the shutdown future resolves.
    #[builder(default = None)]
    iterations: Option<u64>,

    #[builder(default = DEFAULT_REPORT_EVERY)]
    report_every: NonZeroU64,

    #[builder(default)]
    on_error: OnError,

    /// Receives the `<n> req/s` lines.
    out: W,
}

impl<W: Write> Runner<W> {
    pub async fn run<F>(mut self, shutdown: F) -> Result<RunSummary, Error>
    where
        F: Future<Output = ()>,
    {
        let mut reporter = RateReporter::new(Instant::now(), self.report_every);
        let mut failed = 0;
        let mut cancelled = false;
        tokio::pin!(shutdown);

        tracing::info!(
            url = %self.transport.url(),
            iterations = ?self.iterations,
            on_error = ?self.on_error,
            "starting run"
        );

        while self.iterations.map_or(true, |n| reporter.count() < n) {
            let record = self.synthesizer.next_record();
            let payload = self.template.render(&record.fields())?;

            let res = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    cancelled = true;
                    break;
                }
                res = self.transport.post(payload) => res,
            };

            match res {
                Ok(metric) => tracing::debug!(
                    uuid = %record.uuid,
                    status = metric.status_code,
                    latency_us = metric.latency.as_micros() as u64,
                    bytes = metric.bytes_sent,
                    "posted"
                ),
                Err(e) if self.on_error == OnError::Continue => {
                    failed += 1;
                    tracing::warn!(uuid = %record.uuid, "{e}");
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(rate) = reporter.record(Instant::now()) {
                writeln!(self.out, "{rate} req/s")?;
                self.out.flush()?;
            }
        }

        let summary = RunSummary {
            sent: reporter.count(),
            failed,
            elapsed: reporter.elapsed(Instant::now()),
            cancelled,
        };
        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            cancelled = summary.cancelled,
            "run finished"
        );
        Ok(summary)
    }
}

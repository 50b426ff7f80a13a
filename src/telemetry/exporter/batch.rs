//! Buffered asynchronous span export.
//!
//! # Responsibilities
//! - Accept closed spans from any request task without blocking
//! - Batch them in a single background worker
//! - Flush on batch size or on the scheduled interval
//! - Retry failed exports a bounded number of times, then drop the batch
//! - Drain once on shutdown, bounded by the caller's deadline
//!
//! # Worker Loop
//! ```text
//! span queue ──▶ buffer ──(len == max_export_batch_size)──▶ export
//! ticker ─────────────────(buffer non-empty)──────────────▶ export
//! control ── Flush ─────▶ drain queue ─▶ export all ─▶ reply
//!         └─ Shutdown ──▶ close queue ─▶ drain ─▶ export all ─▶ reply ─▶ exit
//! ```
//!
//! # Design Decisions
//! - Bounded `mpsc` channel; `try_send` failures count as dropped spans
//! - The first drop is logged at warn, later ones only counted
//! - Control messages use their own channel so shutdown still gets through
//!   when the span queue is full

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::ExporterConfig;
use crate::error::ExportError;
use crate::observability::metrics;
use crate::resilience::{Backoff, RetryPolicy};
use crate::telemetry::exporter::SpanExporter;
use crate::telemetry::span::{SpanData, SpanSink};

/// Tuning for [`BatchSpanProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Capacity of the queue between request tasks and the worker.
    pub max_queue_size: usize,
    /// Buffer length that triggers an immediate export.
    pub max_export_batch_size: usize,
    /// Interval between time-based flushes.
    pub scheduled_delay: Duration,
    /// Upper bound on a single export attempt.
    pub max_export_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&ExporterConfig::default())
    }
}

impl From<&ExporterConfig> for BatchConfig {
    fn from(config: &ExporterConfig) -> Self {
        Self {
            max_queue_size: config.max_queue_size.max(1),
            max_export_batch_size: config.max_export_batch_size.max(1),
            scheduled_delay: Duration::from_millis(config.scheduled_delay_ms.max(1)),
            max_export_timeout: Duration::from_millis(config.max_export_timeout_ms),
            retry: RetryPolicy::new(
                config.max_attempts,
                Backoff::new(
                    Duration::from_millis(config.base_delay_ms),
                    Duration::from_millis(config.max_delay_ms),
                ),
            ),
        }
    }
}

enum Control {
    Flush(oneshot::Sender<Result<(), ExportError>>),
    Shutdown(oneshot::Sender<Result<(), ExportError>>),
}

/// Handle to the export pipeline. Implements [`SpanSink`].
#[derive(Debug)]
pub struct BatchSpanProcessor {
    span_tx: mpsc::Sender<SpanData>,
    control_tx: mpsc::UnboundedSender<Control>,
    dropped_spans: AtomicU64,
    is_shutdown: AtomicBool,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::Flush(_) => f.write_str("Flush"),
            Control::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

impl BatchSpanProcessor {
    /// Spawn the export worker on the current tokio runtime.
    pub fn new<E: SpanExporter>(exporter: E, config: BatchConfig) -> Self {
        let (span_tx, span_rx) = mpsc::channel(config.max_queue_size);
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let worker = BatchWorker {
            exporter,
            config,
            buffer: Vec::with_capacity(config.max_export_batch_size),
            spans: span_rx,
            control: control_rx,
        };
        tokio::spawn(worker.run());

        tracing::debug!(
            max_queue_size = config.max_queue_size,
            max_export_batch_size = config.max_export_batch_size,
            scheduled_delay_ms = config.scheduled_delay.as_millis() as u64,
            "Span export worker started"
        );

        Self {
            span_tx,
            control_tx,
            dropped_spans: AtomicU64::new(0),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Spans dropped because the queue was full or the pipeline was shut down.
    pub fn dropped_spans(&self) -> u64 {
        self.dropped_spans.load(Ordering::Relaxed)
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::Acquire)
    }

    /// Export everything queued so far and wait for the result.
    pub async fn force_flush(&self) -> Result<(), ExportError> {
        if self.is_shutdown() {
            return Err(ExportError::AlreadyShutdown);
        }
        let (tx, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Flush(tx))
            .map_err(|_| ExportError::ChannelClosed)?;
        rx.await.map_err(|_| ExportError::ChannelClosed)?
    }

    /// Stop accepting spans, flush once, and wait at most `deadline`.
    ///
    /// Spans still buffered when the deadline passes are abandoned.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ExportError> {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Err(ExportError::AlreadyShutdown);
        }

        let (tx, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Shutdown(tx))
            .map_err(|_| ExportError::ChannelClosed)?;

        let result = match time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ExportError::ChannelClosed),
            Err(_) => {
                tracing::warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    "Span export did not finish before shutdown deadline, abandoning buffered spans"
                );
                Err(ExportError::Timeout(deadline))
            }
        };

        let dropped = self.dropped_spans();
        if dropped > 0 {
            tracing::warn!(
                dropped_spans = dropped,
                "Spans were dropped during the lifetime of the exporter; consider a larger queue"
            );
        }
        result
    }

    fn record_drop(&self, reason: &'static str) {
        if self.dropped_spans.fetch_add(1, Ordering::Relaxed) == 0 {
            tracing::warn!(
                reason,
                "Beginning to drop spans; further drops are only counted until shutdown"
            );
        }
        metrics::record_span_dropped(reason);
    }
}

impl SpanSink for BatchSpanProcessor {
    fn enqueue(&self, span: SpanData) {
        if self.is_shutdown() {
            self.record_drop("shutdown");
            return;
        }
        match self.span_tx.try_send(span) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => self.record_drop("queue_full"),
            Err(mpsc::error::TrySendError::Closed(_)) => self.record_drop("closed"),
        }
    }
}

struct BatchWorker<E> {
    exporter: E,
    config: BatchConfig,
    buffer: Vec<SpanData>,
    spans: mpsc::Receiver<SpanData>,
    control: mpsc::UnboundedReceiver<Control>,
}

impl<E: SpanExporter> BatchWorker<E> {
    async fn run(mut self) {
        let delay = self.config.scheduled_delay;
        let mut ticker = time::interval_at(Instant::now() + delay, delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_span = self.spans.recv() => match maybe_span {
                    Some(span) => {
                        self.buffer.push(span);
                        if self.buffer.len() >= self.config.max_export_batch_size {
                            let batch = std::mem::take(&mut self.buffer);
                            let _ = self.export_with_retry(batch).await;
                        }
                    }
                    None => {
                        let _ = self.export_all().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !self.buffer.is_empty() {
                        let batch = std::mem::take(&mut self.buffer);
                        let _ = self.export_with_retry(batch).await;
                    }
                },
                Some(control) = self.control.recv() => match control {
                    Control::Flush(reply) => {
                        self.drain_queue();
                        let _ = reply.send(self.export_all().await);
                    }
                    Control::Shutdown(reply) => {
                        self.spans.close();
                        self.drain_queue();
                        let result = self.export_all().await;
                        self.exporter.shutdown();
                        let _ = reply.send(result);
                        tracing::debug!("Span export worker stopped");
                        break;
                    }
                },
            }
        }
    }

    fn drain_queue(&mut self) {
        while let Ok(span) = self.spans.try_recv() {
            self.buffer.push(span);
        }
    }

    /// Export the whole buffer in chunks of `max_export_batch_size`.
    async fn export_all(&mut self) -> Result<(), ExportError> {
        let mut result = Ok(());
        while !self.buffer.is_empty() {
            let take = self.buffer.len().min(self.config.max_export_batch_size);
            let batch: Vec<SpanData> = self.buffer.drain(..take).collect();
            if let Err(e) = self.export_with_retry(batch).await {
                result = Err(e);
            }
        }
        result
    }

    async fn export_with_retry(&self, batch: Vec<SpanData>) -> Result<(), ExportError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match time::timeout(
                self.config.max_export_timeout,
                self.exporter.export(&batch),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ExportError::Timeout(self.config.max_export_timeout)),
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!(spans = batch.len(), attempt, "Exported span batch");
                    metrics::record_spans_exported(batch.len());
                    return Ok(());
                }
                Err(e) => match self.config.retry.next_delay(attempt, &e) {
                    Some(delay) => {
                        tracing::warn!(
                            error = %e,
                            attempt,
                            delay = ?delay,
                            spans = batch.len(),
                            "Span export failed, retrying"
                        );
                        metrics::record_export_retry();
                        time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            error = %e,
                            attempts = attempt,
                            spans = batch.len(),
                            "Dropping span batch after export failure"
                        );
                        metrics::record_export_failure(batch.len());
                        return Err(e);
                    }
                },
            }
        }
    }
}

// src/monitor.rs
//! The polling loop: fetch -> extract -> compare -> notify -> persist -> sleep.
//!
//! One cycle runs to completion before the next starts. Any failure ends the
//! cycle early, is logged, and the loop sleeps as usual. Only the shutdown
//! signal stops it.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, Utc};
use metrics::{counter, gauge};
use tracing::{debug, error, info, warn};

use crate::change_detector::{compare, ChangeSummary};
use crate::config::MonitorConfig;
use crate::error::{CycleError, ErrorKind};
use crate::extract::Extractor;
use crate::fetch::{Fetcher, PageTransport, ReqwestTransport};
use crate::metrics::ensure_metrics_described;
use crate::notify::{DispatchReport, Notification, NotifierMux};
use crate::record::ContentRecord;
use crate::shutdown::Shutdown;
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Extracting,
    Comparing,
    Notifying,
    Persisting,
    Sleeping,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Fetching => "fetching",
            CyclePhase::Extracting => "extracting",
            CyclePhase::Comparing => "comparing",
            CyclePhase::Notifying => "notifying",
            CyclePhase::Persisting => "persisting",
            CyclePhase::Sleeping => "sleeping",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Unchanged,
    Changed {
        summary: ChangeSummary,
        report: DispatchReport,
    },
}

pub struct Monitor<T> {
    fetcher: Fetcher<T>,
    extractor: Extractor,
    store: StateStore,
    notifiers: NotifierMux,
    interval: Duration,
    last: Option<ContentRecord>,
    phase: CyclePhase,
}

impl Monitor<ReqwestTransport> {
    /// Production wiring: reqwest transport and every configured channel.
    pub async fn from_config(cfg: &MonitorConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(cfg.request_timeout())?;
        let notifiers = NotifierMux::from_config(&cfg.notify).context("building notifiers")?;
        Self::new(cfg, transport, notifiers).await
    }
}

impl<T: PageTransport> Monitor<T> {
    /// Builds the components and reads the persisted state once.
    pub async fn new(
        cfg: &MonitorConfig,
        transport: T,
        notifiers: NotifierMux,
    ) -> anyhow::Result<Self> {
        ensure_metrics_described();
        let fetcher = Fetcher::from_config(transport, cfg)?;
        let extractor = Extractor::new(&cfg.extract, cfg.target_url.clone())?;
        let store = StateStore::new(&cfg.storage_file);
        let last = store.load().await;
        match &last {
            Some(r) => info!(hash = %r.fingerprint, "loaded previous state: {}", r.title),
            None => info!("no previous state, first cycle will report initial content"),
        }
        Ok(Self {
            fetcher,
            extractor,
            store,
            notifiers,
            interval: cfg.check_interval(),
            last,
            phase: CyclePhase::Idle,
        })
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn last_record(&self) -> Option<&ContentRecord> {
        self.last.as_ref()
    }

    fn enter(&mut self, phase: CyclePhase) {
        debug!(from = %self.phase, to = %phase, "phase");
        self.phase = phase;
    }

    /// One full cycle, without the trailing sleep.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        self.enter(CyclePhase::Fetching);
        let raw = self.fetcher.fetch().await?;

        self.enter(CyclePhase::Extracting);
        let current = self.extractor.extract(&raw).inspect_err(|_| {
            counter!("extract_failures_total").increment(1);
        })?;

        self.enter(CyclePhase::Comparing);
        let Some(summary) = compare(self.last.as_ref(), &current) else {
            return Ok(CycleOutcome::Unchanged);
        };
        counter!("changes_detected_total").increment(1);
        info!(title = %current.title, date = %current.published_date, "change detected: {summary}");

        self.enter(CyclePhase::Notifying);
        let note = Notification {
            title: current.title.clone(),
            content: summary.to_string(),
            url: Some(current.source_url.clone()),
        };
        let report = self.notifiers.notify(&note).await;
        if report.all_failed() {
            warn!("every notification channel failed; persisting state anyway");
        }

        self.enter(CyclePhase::Persisting);
        let saved = self.store.save(&current).await;
        // Keep the new baseline in memory even if the disk write failed,
        // otherwise every following cycle would alert again.
        self.last = Some(current);
        saved?;

        Ok(CycleOutcome::Changed { summary, report })
    }

    /// Loops until `shutdown` fires. Returns the number of cycles started.
    pub async fn run(mut self, shutdown: Shutdown) -> u64 {
        info!(url = %self.fetcher.url(), interval = ?self.interval, "monitoring started");
        let mut cycle: u64 = 0;
        loop {
            if shutdown.is_triggered() {
                break;
            }
            self.enter(CyclePhase::Idle);
            cycle += 1;
            counter!("monitor_cycles_total").increment(1);
            info!(cycle, "cycle {cycle} started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

            let result = tokio::select! {
                r = self.run_cycle() => r,
                _ = shutdown.triggered() => break,
            };
            match result {
                Ok(CycleOutcome::Unchanged) => info!(cycle, "content unchanged"),
                Ok(CycleOutcome::Changed { report, .. }) => info!(
                    cycle,
                    delivered = report.delivered.len(),
                    failed = report.failed.len(),
                    "change handled"
                ),
                Err(e) => error!(
                    cycle,
                    phase = %e.phase(),
                    kind = %ErrorKind(&e),
                    "cycle aborted: {e}"
                ),
            }
            gauge!("monitor_last_cycle_ts").set(Utc::now().timestamp() as f64);

            self.enter(CyclePhase::Sleeping);
            if !shutdown.sleep(self.interval).await {
                break;
            }
        }
        self.enter(CyclePhase::Idle);
        info!(cycles = cycle, "monitoring stopped by operator");
        cycle
    }
}

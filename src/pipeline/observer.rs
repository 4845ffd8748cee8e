//! Stage callbacks for logging and profiling.
//!
//! The trainer and interpreter notify a [`PipelineObserver`] around every
//! component they run. [`NoopObserver`] is the default;
//! [`StageTimingObserver`] collects per-component wall-clock timings.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Which pass a stage ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    Train,
    Persist,
    Process,
}

/// Outcome of one component invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub phase: StagePhase,
    pub elapsed: Duration,
    pub ok: bool,
}

/// Measures one stage.
#[derive(Debug)]
pub struct StageClock {
    started: Instant,
}

impl StageClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn finish(self, stage: &str, phase: StagePhase, ok: bool) -> StageReport {
        StageReport {
            stage: stage.to_string(),
            phase,
            elapsed: self.started.elapsed(),
            ok,
        }
    }
}

/// Receives callbacks at every stage boundary. All methods default to no-ops.
pub trait PipelineObserver {
    fn on_stage_start(&mut self, _stage: &str, _phase: StagePhase) {}

    fn on_stage_end(&mut self, _report: &StageReport) {}
}

/// Ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Records every [`StageReport`] in call order.
#[derive(Debug, Clone, Default)]
pub struct StageTimingObserver {
    pub reports: Vec<StageReport>,
}

impl StageTimingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summed time per stage name, in first-seen order.
    pub fn totals(&self) -> Vec<(String, Duration)> {
        let mut totals: Vec<(String, Duration)> = Vec::new();
        for report in &self.reports {
            match totals.iter_mut().find(|(stage, _)| *stage == report.stage) {
                Some((_, total)) => *total += report.elapsed,
                None => totals.push((report.stage.clone(), report.elapsed)),
            }
        }
        totals
    }
}

impl PipelineObserver for StageTimingObserver {
    fn on_stage_end(&mut self, report: &StageReport) {
        tracing::debug!(
            stage = %report.stage,
            phase = ?report.phase,
            elapsed_us = report.elapsed.as_micros() as u64,
            ok = report.ok,
            "stage finished"
        );
        self.reports.push(report.clone());
    }
}

//! Cycle dispatch and the out-of-band queue worker.
//!
//! [`JobDispatcher::run_cycle`] gates every enabled job, runs the due ones
//! through the trigger with at most `max_concurrent` in flight, and seals
//! the outcomes into one [`ExecutionReport`](crate::report::ExecutionReport).

mod dispatch;
mod drain;


pub use drain::{drain_queue, DrainSummary};

use std::sync::Arc;
use std::time::Duration;

use crate::config::HarvestConfig;
use crate::gate::ScheduleGate;
use crate::ledger::RunLedger;
use crate::report::ExecutionRecorder;
use crate::trigger::Trigger;

/// Fans jobs out to a trigger with bounded concurrency and per-job failure isolation.
#[derive(Clone)]
pub struct JobDispatcher {
    trigger: Arc<dyn Trigger>,
    gate: ScheduleGate,
    recorder: Option<ExecutionRecorder>,
    ledger: Option<RunLedger>,
    max_concurrent: usize,
    cycle_deadline: Option<Duration>,
}

impl JobDispatcher {
    pub fn new(trigger: Arc<dyn Trigger>, gate: ScheduleGate, max_concurrent: usize) -> Self {
        Self {
            trigger,
            gate,
            recorder: None,
            ledger: None,
            max_concurrent: max_concurrent.max(1),
            cycle_deadline: None,
        }
    }

    /// Dispatcher wired from config: W and the cycle deadline come from `[scheduler]`.
    pub fn from_config(
        cfg: &HarvestConfig,
        trigger: Arc<dyn Trigger>,
        gate: ScheduleGate,
        recorder: ExecutionRecorder,
        ledger: RunLedger,
    ) -> Self {
        let mut d = Self::new(trigger, gate, cfg.scheduler.max_concurrent_jobs)
            .with_recorder(recorder)
            .with_ledger(ledger);
        d.cycle_deadline = cfg.scheduler.cycle_deadline_secs.map(Duration::from_secs);
        d
    }

    /// Persist each sealed report through `recorder`.
    pub fn with_recorder(mut self, recorder: ExecutionRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Record successful outcomes in the per-collector ledger.
    pub fn with_ledger(mut self, ledger: RunLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_cycle_deadline(mut self, deadline: Duration) -> Self {
        self.cycle_deadline = Some(deadline);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

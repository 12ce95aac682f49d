//! In-process coprocessor running the firmware session on a worker thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use super::event::EventLine;
use super::head::{PaperLog, SensorTrips, SimulatedHead};
use super::timer::SimTimer;
use crate::config::SimulationConfig;
use crate::error::HostError;
use crate::sync::Coprocessor;
use dotline_common::{LayoutError, QueueView};
use dotline_firmware::port::{PinMap, RegisterPort};
use dotline_firmware::session::SessionSummary;
use dotline_firmware::{HostLink, JobProcessor, ProcessorConfig, Session};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

type SharedMemory = Arc<Mutex<Vec<u8>>>;

/// Coprocessor end of the simulated boundary.
struct SimLink {
    memory: SharedMemory,
    submission: Arc<EventLine>,
    completion: Arc<EventLine>,
}

impl HostLink for SimLink {
    fn wait_for_submission(&mut self) {
        self.submission.wait();
    }

    fn acknowledge_submission(&mut self) {
        self.submission.clear();
    }

    fn signal_completion(&mut self) {
        self.completion.raise();
    }

    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, LayoutError> {
        let mut memory = self.memory.lock();
        let mut view = QueueView::new(memory.as_mut_slice())?;
        Ok(f(&mut view))
    }

    fn power_down(&mut self) {
        debug!("Simulated core powered down");
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        self.completion.close();
    }
}

type Worker = JoinHandle<Result<SessionSummary, LayoutError>>;

/// Host end of the simulated boundary.
pub struct SimulatedCoprocessor {
    memory: SharedMemory,
    submission: Arc<EventLine>,
    completion: Arc<EventLine>,
    stop: Arc<AtomicBool>,
    paper: Arc<Mutex<PaperLog>>,
    worker: Option<Worker>,
    summary: Option<SessionSummary>,
}

impl SimulatedCoprocessor {
    /// Start a session over a zeroed shared block of `memory_size` bytes.
    pub fn spawn(
        memory_size: usize,
        processor: ProcessorConfig,
        simulation: &SimulationConfig,
    ) -> Result<Self, HostError> {
        let memory: SharedMemory = Arc::new(Mutex::new(vec![0; memory_size]));
        let submission = Arc::new(EventLine::new());
        let completion = Arc::new(EventLine::new());
        let stop = Arc::new(AtomicBool::new(false));
        let paper = Arc::new(Mutex::new(PaperLog::default()));

        let trips = SensorTrips {
            thermal_after_steps: simulation.thermal_trip_after_steps,
            paper_out_after_steps: simulation.paper_out_after_steps,
        };
        let head = SimulatedHead::new(
            PinMap::REFERENCE,
            trips,
            processor.max_black_dots,
            Arc::clone(&paper),
        );
        let port = RegisterPort::new(head, PinMap::REFERENCE);
        let timer = SimTimer::new(simulation.pacing, Arc::clone(&stop));
        let link = SimLink {
            memory: Arc::clone(&memory),
            submission: Arc::clone(&submission),
            completion: Arc::clone(&completion),
        };

        let worker = thread::Builder::new()
            .name("dotline-coprocessor".to_string())
            .spawn(move || Session::new(link, JobProcessor::new(port, timer, processor)).run())?;

        info!(memory_size, pacing = simulation.pacing, "Simulated coprocessor started");
        Ok(Self {
            memory,
            submission,
            completion,
            stop,
            paper,
            worker: Some(worker),
            summary: None,
        })
    }

    /// Snapshot of the simulated paper.
    pub fn paper(&self) -> PaperLog {
        self.paper.lock().clone()
    }

    /// Session result, once [`Coprocessor::shutdown`] has joined the worker.
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// True if the status word is readable and carries the halt flag. A
    /// locked queue means a batch is still running.
    fn halt_pending(&self) -> bool {
        let Some(mut memory) = self.memory.try_lock() else {
            return false;
        };
        let halted = QueueView::new(memory.as_mut_slice())
            .is_ok_and(|view| view.status().halt_requested());
        halted
    }

    fn join(&mut self, worker: Worker) -> Result<(), HostError> {
        match worker.join() {
            Ok(Ok(summary)) => {
                info!(
                    batches = summary.batches,
                    status = summary.final_status.bits(),
                    "Simulated coprocessor halted"
                );
                self.summary = Some(summary);
                Ok(())
            }
            Ok(Err(layout)) => Err(layout.into()),
            Err(_) => Err(HostError::CoprocessorStopped(
                "coprocessor thread panicked".to_string(),
            )),
        }
    }
}

impl Coprocessor for SimulatedCoprocessor {
    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, HostError> {
        let mut memory = self.memory.lock();
        let mut view = QueueView::new(memory.as_mut_slice())?;
        Ok(f(&mut view))
    }

    fn submit(&mut self) -> Result<(), HostError> {
        if self.completion.is_closed() {
            return Err(HostError::CoprocessorStopped(
                "session is no longer accepting batches".to_string(),
            ));
        }
        self.submission.raise();
        Ok(())
    }

    fn wait_completion(&mut self) -> Result<(), HostError> {
        if !self.completion.wait() {
            return Err(HostError::CoprocessorStopped(
                "session ended before completing the batch".to_string(),
            ));
        }
        self.completion.clear();
        Ok(())
    }

    /// Join a halted session. A session that is still busy (Test-Signals) or
    /// still waiting for batches is stopped and left detached.
    fn shutdown(&mut self) -> Result<(), HostError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        if worker.is_finished() || self.halt_pending() {
            self.join(worker)
        } else {
            self.stop.store(true, Ordering::Release);
            warn!("Coprocessor session still running, detaching");
            Ok(())
        }
    }
}

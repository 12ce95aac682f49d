//! Coprocessor session loop.
//!
//! Idle → Running on a submission signal, back to Idle once the batch is
//! done and completion has been raised, Halted once a finished batch left
//! the halt flag set. Halted is terminal.

use crate::port::HardwarePort;
use crate::processor::{BatchReport, JobProcessor};
use crate::timing::Timer;
use dotline_common::{LayoutError, PrinterStatus, QueueView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the submission signal.
    Idle,
    /// Interpreting a batch.
    Running,
    /// Halt observed; core is shutting down.
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Submitted,
    BatchFinished,
    HaltObserved,
}

/// Result of a session transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Ok(SessionState),
    Rejected(&'static str),
}

/// Session lifecycle holding the current state.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl SessionStateMachine {
    pub const fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    #[inline]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> TransitionResult {
        use SessionEvent::*;
        use SessionState::*;

        let next = match (self.state, event) {
            (Idle, Submitted) => Running,
            (Running, BatchFinished) => Idle,
            (Idle, HaltObserved) => Halted,
            (Halted, _) => return TransitionResult::Rejected("Halted: terminal state"),
            (Running, _) => {
                return TransitionResult::Rejected("Running: only BatchFinished allowed");
            }
            (Idle, BatchFinished) => {
                return TransitionResult::Rejected("Idle: no batch in progress");
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Coprocessor side of the host boundary.
pub trait HostLink {
    /// Block until the host raises the submission signal.
    fn wait_for_submission(&mut self);

    /// Clear the pending submission indication.
    fn acknowledge_submission(&mut self);

    /// Raise the completion signal.
    fn signal_completion(&mut self);

    /// Run `f` over the shared job queue.
    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, LayoutError>;

    /// Clear pending interrupts and stop the core. On hardware this does not
    /// return.
    fn power_down(&mut self);
}

impl<L: HostLink> HostLink for &mut L {
    fn wait_for_submission(&mut self) {
        (**self).wait_for_submission();
    }

    fn acknowledge_submission(&mut self) {
        (**self).acknowledge_submission();
    }

    fn signal_completion(&mut self) {
        (**self).signal_completion();
    }

    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, LayoutError> {
        (**self).with_queue(f)
    }

    fn power_down(&mut self) {
        (**self).power_down();
    }
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub batches: usize,
    pub last_batch: Option<BatchReport>,
    pub final_status: PrinterStatus,
}

/// One coprocessor session from reset to power-down.
pub struct Session<L, P, T> {
    link: L,
    processor: JobProcessor<P, T>,
    machine: SessionStateMachine,
}

impl<L: HostLink, P: HardwarePort, T: Timer> Session<L, P, T> {
    pub fn new(link: L, processor: JobProcessor<P, T>) -> Self {
        Self {
            link,
            processor,
            machine: SessionStateMachine::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Serve batches until one leaves the halt flag set, then shut down.
    ///
    /// The status register is zeroed once, here. Flags raised afterwards
    /// stay set for the rest of the session.
    pub fn run(mut self) -> Result<SessionSummary, LayoutError> {
        self.link.with_queue(|queue| queue.status_register().reset())?;
        self.processor.reset_outputs();

        let mut batches = 0;
        let mut last_batch = None;
        let final_status = loop {
            self.link.wait_for_submission();
            self.link.acknowledge_submission();
            self.transition(SessionEvent::Submitted);

            let processor = &mut self.processor;
            let (report, status) = self.link.with_queue(|queue| {
                let report = processor.process_batch(queue);
                (report, queue.status())
            })?;
            batches += 1;
            last_batch = Some(report);

            self.link.signal_completion();
            self.transition(SessionEvent::BatchFinished);

            if status.halt_requested() {
                self.transition(SessionEvent::HaltObserved);
                break status;
            }
        };

        let shutdown = self.processor.config().timing.shutdown;
        self.processor.timer_mut().delay(shutdown);
        self.link.power_down();

        Ok(SessionSummary {
            batches,
            last_batch,
            final_status,
        })
    }

    fn transition(&mut self, event: SessionEvent) {
        let result = self.machine.handle_event(event);
        debug_assert!(
            matches!(result, TransitionResult::Ok(_)),
            "session transition {event:?} rejected: {result:?}"
        );
    }
}

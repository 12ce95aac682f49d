//! Edge-signal lines between host and simulated coprocessor.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LineState {
    raised: bool,
    closed: bool,
}

/// One-shot event that stays raised until its receiver clears it.
///
/// A closed line wakes every waiter; waits after close return `false`
/// unless the event was still pending.
#[derive(Debug, Default)]
pub struct EventLine {
    state: Mutex<LineState>,
    changed: Condvar,
}

impl EventLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        let mut state = self.state.lock();
        state.raised = true;
        self.changed.notify_all();
    }

    pub fn clear(&self) {
        self.state.lock().raised = false;
    }

    pub fn is_raised(&self) -> bool {
        self.state.lock().raised
    }

    /// Mark the sender gone. Pending events remain visible.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Block until raised or closed. Returns whether the event is raised.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while !state.raised && !state.closed {
            self.changed.wait(&mut state);
        }
        state.raised
    }
}

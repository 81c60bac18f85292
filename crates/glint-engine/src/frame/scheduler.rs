use std::cell::Cell;
use std::rc::Rc;

/// Host primitive that delivers the next frame tick.
///
/// Implementations only *request* a tick; the host later calls
/// `FrameLoop::tick` from its own event loop (display refresh, redraw event).
/// Requests are never executed re-entrantly.
pub trait TickScheduler {
    fn request_tick(&mut self);
}

/// Scheduler that queues requests for the caller to deliver by hand.
///
/// Meant for test harnesses and headless hosts: clones share one queue, so a
/// harness can keep a clone while the loop owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    pending: Rc<Cell<u32>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requested ticks not yet delivered.
    pub fn pending(&self) -> u32 {
        self.pending.get()
    }

    /// Removes one pending request; `false` if none was queued.
    pub fn take(&self) -> bool {
        match self.pending.get() {
            0 => false,
            n => {
                self.pending.set(n - 1);
                true
            }
        }
    }
}

impl TickScheduler for ManualScheduler {
    fn request_tick(&mut self) {
        self.pending.set(self.pending.get() + 1);
    }
}

/// Wraps a scheduler so requests can be held back while nothing can be shown.
///
/// While paused, a request is remembered instead of forwarded; `resume`
/// forwards it. Used by the window runtime to stop redrawing a minimized
/// window.
#[derive(Debug)]
pub struct PausableScheduler<S> {
    inner: S,
    paused: bool,
    held: bool,
}

impl<S: TickScheduler> PausableScheduler<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            paused: false,
            held: false,
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            log::debug!("tick requests paused");
            self.paused = true;
        }
    }

    /// Unpauses and forwards a request held while paused.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        log::debug!("tick requests resumed");
        self.paused = false;
        if std::mem::take(&mut self.held) {
            self.inner.request_tick();
        }
    }
}

impl<S: TickScheduler> TickScheduler for PausableScheduler<S> {
    fn request_tick(&mut self) {
        if self.paused {
            self.held = true;
        } else {
            self.inner.request_tick();
        }
    }
}

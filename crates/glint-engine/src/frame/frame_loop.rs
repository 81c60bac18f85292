use std::cell::Cell;
use std::f32::consts::TAU;
use std::rc::Rc;

use crate::error::{RenderError, Result};
use crate::time::FrameTime;

use super::TickScheduler;

/// Loop state. Only `start` leaves `Stopped`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Data handed to the draw callback on every tick.
#[derive(Debug, Copy, Clone)]
pub struct FrameTick {
    pub time: FrameTime,
    /// Rotation accumulated since the loop was created, radians in `[0, 2π)`.
    pub rotation: f32,
    /// Rotation added by this tick, radians.
    pub delta: f32,
}

/// What a call to `FrameLoop::tick` did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    /// The loop was stopped; the callback did not run.
    Idle,
    /// The callback ran.
    Drawn,
}

/// Cloneable stop switch for a running loop.
///
/// Lets the draw callback or the host stop the loop without holding the loop
/// itself.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    running: Rc<Cell<bool>>,
}

impl LoopHandle {
    /// Stops the loop. Idempotent.
    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

/// Rotation rate used unless overridden: 75 degrees per second.
pub const DEFAULT_ANGULAR_VELOCITY: f32 = 75.0 * (TAU / 360.0);

type FrameCallback<C> = Box<dyn FnMut(&mut C, FrameTick) -> Result<()>>;

/// Drives a draw callback once per host tick.
///
/// `Stopped → start → Running → stop | surface lost → Stopped`.
///
/// Cancellation is checked inside `tick`, not only when scheduling: a tick the
/// host had already queued when `stop` ran returns `TickOutcome::Idle` without
/// invoking the callback. `C` is the state the callback draws with (context,
/// scene); it is lent to each tick rather than owned by the loop.
///
/// At most one tick request is outstanding at a time, so a `stop`/`start`
/// cycle while a tick is queued keeps a single tick chain.
pub struct FrameLoop<C, S> {
    running: Rc<Cell<bool>>,
    scheduler: S,
    callback: FrameCallback<C>,
    rotation: f32,
    angular_velocity: f32,
    frames_drawn: u64,
    tick_requested: bool,
}

impl<C, S: TickScheduler> FrameLoop<C, S> {
    /// Creates a stopped loop.
    pub fn new<F>(scheduler: S, callback: F) -> Self
    where
        F: FnMut(&mut C, FrameTick) -> Result<()> + 'static,
    {
        Self {
            running: Rc::new(Cell::new(false)),
            scheduler,
            callback: Box::new(callback),
            rotation: 0.0,
            angular_velocity: DEFAULT_ANGULAR_VELOCITY,
            frames_drawn: 0,
            tick_requested: false,
        }
    }

    /// Sets the rotation rate in radians per second.
    pub fn with_angular_velocity(mut self, radians_per_second: f32) -> Self {
        self.angular_velocity = radians_per_second;
        self
    }

    pub fn state(&self) -> LoopState {
        if self.running.get() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            running: Rc::clone(&self.running),
        }
    }

    /// Rotation accumulated so far, radians.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Number of callback invocations that completed.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Enters `Running` and requests the first tick. No-op when already running.
    ///
    /// A tick still queued from before a `stop` is reused instead of
    /// requesting another.
    pub fn start(&mut self) {
        if self.running.replace(true) {
            return;
        }
        log::info!("frame loop started");
        self.request_tick();
    }

    /// Enters `Stopped`. Idempotent; no callback runs after this returns.
    pub fn stop(&mut self) {
        if self.running.replace(false) {
            log::info!("frame loop stopped after {} frames", self.frames_drawn);
        }
    }

    /// Forced transition to `Stopped` when the surface goes away.
    pub fn surface_lost(&mut self) {
        if self.running.replace(false) {
            log::warn!("frame loop stopped: surface lost");
        }
    }

    /// Handles one host tick.
    ///
    /// When running: advances the rotation by `time.dt * angular_velocity`,
    /// invokes the callback, then requests the next tick unless the callback
    /// stopped the loop. A callback error stops the loop and is returned.
    pub fn tick(&mut self, cx: &mut C, time: FrameTime) -> Result<TickOutcome> {
        self.tick_requested = false;
        if !self.running.get() {
            return Ok(TickOutcome::Idle);
        }

        let delta = time.dt * self.angular_velocity;
        self.rotation = (self.rotation + delta).rem_euclid(TAU);

        let tick = FrameTick {
            time,
            rotation: self.rotation,
            delta,
        };

        if let Err(err) = (self.callback)(cx, tick) {
            match err {
                RenderError::SurfaceLost => self.surface_lost(),
                ref other => {
                    log::error!("frame callback failed: {other}");
                    self.stop();
                }
            }
            return Err(err);
        }
        self.frames_drawn += 1;

        if self.running.get() {
            self.request_tick();
        }
        Ok(TickOutcome::Drawn)
    }

    fn request_tick(&mut self) {
        if !self.tick_requested {
            self.tick_requested = true;
            self.scheduler.request_tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ManualScheduler, PausableScheduler};

    const DT: f32 = 1.0 / 60.0;

    fn counting_loop(scheduler: &ManualScheduler) -> FrameLoop<u32, ManualScheduler> {
        FrameLoop::new(scheduler.clone(), |count: &mut u32, _tick| {
            *count += 1;
            Ok(())
        })
    }

    // Delivers one queued tick the way a host event loop would.
    fn deliver(frame_loop: &mut FrameLoop<u32, ManualScheduler>, scheduler: &ManualScheduler, count: &mut u32) -> Option<TickOutcome> {
        scheduler
            .take()
            .then(|| frame_loop.tick(count, FrameTime::from_dt(DT, 0)).unwrap())
    }

    #[test]
    fn starts_stopped_and_ignores_ticks() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop = counting_loop(&scheduler);
        let mut count = 0;

        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(frame_loop.tick(&mut count, FrameTime::from_dt(DT, 0)).unwrap(), TickOutcome::Idle);
        assert_eq!(count, 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn stop_cancels_a_tick_already_in_flight() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop = counting_loop(&scheduler);
        let mut count = 0;

        frame_loop.start();
        for _ in 0..3 {
            assert_eq!(deliver(&mut frame_loop, &scheduler, &mut count), Some(TickOutcome::Drawn));
        }
        // The third callback already requested a fourth tick.
        assert_eq!(scheduler.pending(), 1);

        frame_loop.stop();
        assert_eq!(deliver(&mut frame_loop, &scheduler, &mut count), Some(TickOutcome::Idle));
        assert_eq!(deliver(&mut frame_loop, &scheduler, &mut count), None);

        assert_eq!(count, 3);
        assert_eq!(frame_loop.frames_drawn(), 3);
    }

    #[test]
    fn stop_is_idempotent() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop = counting_loop(&scheduler);
        frame_loop.stop();
        frame_loop.start();
        frame_loop.stop();
        frame_loop.stop();
        assert_eq!(frame_loop.state(), LoopState::Stopped);
    }

    #[test]
    fn start_twice_requests_one_tick() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop = counting_loop(&scheduler);
        frame_loop.start();
        frame_loop.start();
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn restart_with_a_queued_tick_keeps_one_chain() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop = counting_loop(&scheduler);
        let mut count = 0;

        frame_loop.start();
        assert_eq!(deliver(&mut frame_loop, &scheduler, &mut count), Some(TickOutcome::Drawn));
        assert_eq!(scheduler.pending(), 1);

        frame_loop.stop();
        frame_loop.start();
        assert_eq!(scheduler.pending(), 1);

        // Each host refresh delivers every queued tick.
        for _ in 0..3 {
            let mut drawn = 0;
            for _ in 0..scheduler.pending() {
                if deliver(&mut frame_loop, &scheduler, &mut count) == Some(TickOutcome::Drawn) {
                    drawn += 1;
                }
            }
            assert_eq!(drawn, 1);
            assert_eq!(scheduler.pending(), 1);
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn restart_after_idle_tick_requests_again() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop = counting_loop(&scheduler);
        let mut count = 0;

        frame_loop.start();
        frame_loop.stop();
        assert_eq!(deliver(&mut frame_loop, &scheduler, &mut count), Some(TickOutcome::Idle));
        assert_eq!(scheduler.pending(), 0);

        frame_loop.start();
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(deliver(&mut frame_loop, &scheduler, &mut count), Some(TickOutcome::Drawn));
        assert_eq!(count, 1);
    }

    #[test]
    fn paused_scheduler_parks_the_chain_until_resumed() {
        let manual = ManualScheduler::new();
        let mut frame_loop = FrameLoop::new(PausableScheduler::new(manual.clone()), |count: &mut u32, _tick| {
            *count += 1;
            Ok(())
        });
        let mut count = 0;

        frame_loop.start();
        frame_loop.scheduler_mut().pause();
        assert!(manual.take());
        assert_eq!(frame_loop.tick(&mut count, FrameTime::from_dt(DT, 0)).unwrap(), TickOutcome::Drawn);
        assert_eq!(manual.pending(), 0);

        frame_loop.scheduler_mut().resume();
        assert_eq!(manual.pending(), 1);
        assert!(manual.take());
        frame_loop.tick(&mut count, FrameTime::from_dt(DT, 1)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(manual.pending(), 1);
    }

    #[test]
    fn handle_stops_from_inside_callback() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop: FrameLoop<Option<LoopHandle>, _> =
            FrameLoop::new(scheduler.clone(), |handle: &mut Option<LoopHandle>, _tick| {
                if let Some(h) = handle {
                    h.stop();
                }
                Ok(())
            });

        let mut handle = Some(frame_loop.handle());
        frame_loop.start();
        assert!(scheduler.take());
        assert_eq!(
            frame_loop.tick(&mut handle, FrameTime::from_dt(DT, 0)).unwrap(),
            TickOutcome::Drawn
        );

        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn surface_loss_forces_stop() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop: FrameLoop<(), _> =
            FrameLoop::new(scheduler.clone(), |_: &mut (), _tick| Err(RenderError::SurfaceLost));

        frame_loop.start();
        assert!(scheduler.take());
        let err = frame_loop.tick(&mut (), FrameTime::from_dt(DT, 0)).err().unwrap();

        assert_eq!(err, RenderError::SurfaceLost);
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(frame_loop.frames_drawn(), 0);
    }

    #[test]
    fn rotation_accumulates_from_dt() {
        let scheduler = ManualScheduler::new();
        let mut frame_loop: FrameLoop<Vec<f32>, _> =
            FrameLoop::new(scheduler.clone(), |seen: &mut Vec<f32>, tick| {
                seen.push(tick.rotation);
                Ok(())
            })
            .with_angular_velocity(1.0);

        let mut seen = Vec::new();
        frame_loop.start();
        for _ in 0..2 {
            frame_loop.tick(&mut seen, FrameTime::from_dt(0.5, 0)).unwrap();
        }

        assert_eq!(seen, vec![0.5, 1.0]);
        assert_eq!(frame_loop.rotation(), 1.0);
    }
}

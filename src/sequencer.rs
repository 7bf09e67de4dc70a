//! Timed capture state machine.
//!
//! The sequencer never sleeps. Every wait is handed to a [`Scheduler`] as a [`Tick`] to be
//! delivered back through [`CaptureSequencer::on_tick`] once the delay has elapsed. [`drive`]
//! pairs a [`TimerQueue`] with a [`Clock`] to run a whole session to completion, which keeps
//! tests independent of wall-clock time.
//!
//! State flow for one run:
//!
//! `Idle -> CountingDown(3) -> CountingDown(2) -> CountingDown(1) -> Capturing`
//! `-> [Paused -> CountingDown(3) -> ...] -> Complete -> Idle`

use std::{collections::VecDeque, time::Duration};

use crate::{
    BoothError, BoothResult,
    camera::{CameraSource, RawFrame, snapshot},
    foundation::core::CaptureMode,
};

/// Delays and countdown length used by the sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    pub countdown_from: u8,
    #[serde(with = "duration_ms")]
    pub tick: Duration,
    #[serde(with = "duration_ms")]
    pub pause: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            tick: Duration::from_secs(1),
            pause: Duration::from_millis(500),
        }
    }
}

impl Timing {
    pub fn validate(&self) -> BoothResult<()> {
        if self.countdown_from == 0 {
            return Err(BoothError::validation("countdown must start at >= 1"));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = <u64 as serde::Deserialize>::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    CountingDown(u8),
    Capturing,
    Paused,
    Complete,
}

/// State of one capture run.
#[derive(Clone, Debug)]
pub struct CaptureSession {
    mode: CaptureMode,
    slots: Vec<Option<RawFrame>>,
    shots_taken: usize,
    status: Status,
}

impl CaptureSession {
    fn idle() -> Self {
        Self {
            mode: CaptureMode::default(),
            slots: Vec::new(),
            shots_taken: 0,
            status: Status::Idle,
        }
    }

    fn new(mode: CaptureMode, status: Status) -> Self {
        Self {
            mode,
            slots: vec![None; mode.shots_required()],
            shots_taken: 0,
            status,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn shots_required(&self) -> usize {
        self.slots.len()
    }

    pub fn shots_taken(&self) -> usize {
        self.shots_taken
    }

    pub fn slots(&self) -> &[Option<RawFrame>] {
        &self.slots
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn countdown_remaining(&self) -> Option<u8> {
        match self.status {
            Status::CountingDown(n) => Some(n),
            _ => None,
        }
    }

    // Slots are filled strictly in index order, each exactly once.
    fn record(&mut self, frame: Option<RawFrame>) {
        debug_assert!(self.shots_taken < self.slots.len());
        self.slots[self.shots_taken] = frame;
        self.shots_taken += 1;
    }

    fn has_more_shots(&self) -> bool {
        self.shots_taken < self.slots.len()
    }
}

/// Snapshot of sequencer progress for the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub status: Status,
    pub countdown: Option<u8>,
    pub shots_taken: usize,
    pub shots_required: usize,
}

/// The slots of a finished run, in capture order.
#[derive(Clone, Debug)]
pub struct CompletedCapture {
    pub mode: CaptureMode,
    pub slots: Vec<Option<RawFrame>>,
}

impl CompletedCapture {
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickKind {
    Countdown,
    Resume,
}

/// Timer event addressed to the session that scheduled it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    generation: u64,
    pub kind: TickKind,
}

pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, tick: Tick);
}

/// Owns the camera and the current [`CaptureSession`].
///
/// All mutation goes through `&mut self`; callers that share a sequencer across threads wrap it
/// in a mutex so slot writes stay single-owner.
pub struct CaptureSequencer<C> {
    camera: C,
    timing: Timing,
    generation: u64,
    session: CaptureSession,
}

impl<C: CameraSource> CaptureSequencer<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            timing: Timing::default(),
            generation: 0,
            session: CaptureSession::idle(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> BoothResult<Self> {
        timing.validate()?;
        self.timing = timing;
        Ok(self)
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn status(&self) -> Status {
        self.session.status
    }

    pub fn is_idle(&self) -> bool {
        self.session.status == Status::Idle
    }

    pub fn progress(&self) -> Progress {
        Progress {
            status: self.session.status,
            countdown: self.session.countdown_remaining(),
            shots_taken: self.session.shots_taken,
            shots_required: self.session.shots_required(),
        }
    }

    /// Begin a timed run. Rejected without side effects unless idle.
    pub fn start(&mut self, mode: CaptureMode, scheduler: &mut dyn Scheduler) -> BoothResult<()> {
        if !self.is_idle() {
            tracing::debug!(status = ?self.session.status, "start rejected: session active");
            return Err(BoothError::SessionActive);
        }

        self.generation += 1;
        let from = self.timing.countdown_from;
        self.session = CaptureSession::new(mode, Status::CountingDown(from));
        tracing::debug!(?mode, generation = self.generation, "capture session started");
        self.schedule(scheduler, self.timing.tick, TickKind::Countdown);
        Ok(())
    }

    /// Capture one frame immediately, without countdown or timers.
    pub fn capture_now(&mut self) -> BoothResult<CompletedCapture> {
        if !self.is_idle() {
            return Err(BoothError::SessionActive);
        }

        self.generation += 1;
        self.session = CaptureSession::new(CaptureMode::Single, Status::Capturing);
        let frame = snapshot(&mut self.camera);
        self.session.record(frame);
        Ok(self.finish())
    }

    /// Advance the state machine for an elapsed timer.
    ///
    /// Returns the finished slots when this tick completes the run. Ticks from a torn-down
    /// session are ignored.
    pub fn on_tick(
        &mut self,
        tick: Tick,
        scheduler: &mut dyn Scheduler,
    ) -> Option<CompletedCapture> {
        if tick.generation != self.generation {
            tracing::debug!(
                tick_generation = tick.generation,
                generation = self.generation,
                "ignoring stale tick"
            );
            return None;
        }

        match (self.session.status, tick.kind) {
            (Status::CountingDown(n), TickKind::Countdown) => {
                let remaining = n.saturating_sub(1);
                if remaining > 0 {
                    self.session.status = Status::CountingDown(remaining);
                    self.schedule(scheduler, self.timing.tick, TickKind::Countdown);
                    return None;
                }
                self.capture_shot(scheduler)
            }
            (Status::Paused, TickKind::Resume) => {
                self.session.status = Status::CountingDown(self.timing.countdown_from);
                self.schedule(scheduler, self.timing.tick, TickKind::Countdown);
                None
            }
            (status, kind) => {
                tracing::warn!(?status, ?kind, "tick does not match sequencer state");
                None
            }
        }
    }

    /// Tear down the capture surface, discarding any run in progress.
    pub fn exit(&mut self) {
        self.generation += 1;
        if !self.is_idle() {
            tracing::info!(status = ?self.session.status, "capture session aborted");
        }
        self.session = CaptureSession::idle();
    }

    fn capture_shot(&mut self, scheduler: &mut dyn Scheduler) -> Option<CompletedCapture> {
        self.session.status = Status::Capturing;
        let index = self.session.shots_taken;
        let frame = snapshot(&mut self.camera);
        tracing::debug!(slot = index, captured = frame.is_some(), "shot taken");
        self.session.record(frame);

        if self.session.has_more_shots() {
            self.session.status = Status::Paused;
            self.schedule(scheduler, self.timing.pause, TickKind::Resume);
            return None;
        }
        Some(self.finish())
    }

    fn finish(&mut self) -> CompletedCapture {
        self.session.status = Status::Complete;
        let done = CompletedCapture {
            mode: self.session.mode,
            slots: self.session.slots.clone(),
        };
        tracing::info!(
            mode = ?done.mode,
            filled = done.filled(),
            total = done.slots.len(),
            "capture complete"
        );
        self.session.status = Status::Idle;
        done
    }

    fn schedule(&self, scheduler: &mut dyn Scheduler, delay: Duration, kind: TickKind) {
        scheduler.schedule(
            delay,
            Tick {
                generation: self.generation,
                kind,
            },
        );
    }
}

/// FIFO of pending ticks.
#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: VecDeque<(Duration, Tick)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<(Duration, Tick)> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, tick: Tick) {
        self.pending.push_back((delay, tick));
    }
}

pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// Real time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual time; records every sleep instead of blocking.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    pub elapsed: Duration,
    pub sleeps: Vec<Duration>,
}

impl Clock for ManualClock {
    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.sleeps.push(duration);
    }
}

/// Run a full timed session, reporting progress after every transition.
pub fn drive<C: CameraSource>(
    sequencer: &mut CaptureSequencer<C>,
    mode: CaptureMode,
    clock: &mut dyn Clock,
    mut on_progress: impl FnMut(&Progress),
) -> BoothResult<CompletedCapture> {
    let mut queue = TimerQueue::new();
    sequencer.start(mode, &mut queue)?;
    on_progress(&sequencer.progress());

    while let Some((delay, tick)) = queue.pop() {
        clock.sleep(delay);
        let done = sequencer.on_tick(tick, &mut queue);
        on_progress(&sequencer.progress());
        if let Some(done) = done {
            return Ok(done);
        }
    }

    Err(BoothError::validation(
        "capture sequence stopped before completion",
    ))
}

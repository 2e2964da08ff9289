use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TickResult {
    pub should_render: bool,
    pub frames_due: u32,
}

/// Fixed-rate frame scheduling for the pacer thread. Lag collapses into a
/// single rendered frame; the clock never replays missed frames.
#[derive(Debug)]
pub struct FrameClock {
    fps: f32,
    last_tick: Instant,
    accumulator: Duration,
    last_render_at: Option<Instant>,
    render_intervals: VecDeque<Duration>,
    max_intervals: usize,
}

impl FrameClock {
    pub fn new(fps: f32) -> Self {
        Self::with_start(fps, Instant::now())
    }

    pub fn with_start(fps: f32, now: Instant) -> Self {
        Self {
            fps: fps.max(1.0),
            last_tick: now,
            accumulator: Duration::ZERO,
            last_render_at: None,
            render_intervals: VecDeque::new(),
            max_intervals: 90,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps)
    }

    /// Drops accumulated debt, e.g. when resuming from pause.
    pub fn reset(&mut self, now: Instant) {
        self.last_tick = now;
        self.accumulator = Duration::ZERO;
        self.last_render_at = None;
    }

    pub fn next_deadline(&self) -> Instant {
        let remaining = self
            .frame_duration()
            .checked_sub(self.accumulator)
            .unwrap_or_default();
        self.last_tick + remaining
    }

    pub fn average_fps(&self) -> f32 {
        if self.render_intervals.is_empty() {
            return 0.0;
        }

        let sum: Duration = self.render_intervals.iter().copied().sum();
        let avg = sum / self.render_intervals.len() as u32;

        if avg.is_zero() {
            return 0.0;
        }

        1.0 / avg.as_secs_f32()
    }

    pub fn tick(&mut self, now: Instant) -> TickResult {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.accumulator += elapsed;

        let frame_duration = self.frame_duration();
        let mut due = 0u32;

        while self.accumulator >= frame_duration {
            self.accumulator -= frame_duration;
            due += 1;
        }

        if due == 0 {
            return TickResult::default();
        }

        self.record_render(now);

        TickResult {
            should_render: true,
            frames_due: due,
        }
    }

    fn record_render(&mut self, now: Instant) {
        let Some(last_render_at) = self.last_render_at.replace(now) else {
            return;
        };

        self.render_intervals
            .push_back(now.saturating_duration_since(last_render_at));
        if self.render_intervals.len() > self.max_intervals {
            self.render_intervals.pop_front();
        }
    }
}

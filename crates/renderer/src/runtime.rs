use std::time::Instant;

/// Update cap applied to the time uniform when the caller does not pick one.
pub const DEFAULT_MAX_FPS: f32 = 60.0;

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Animate continuously, advancing `u_time` at most `max_fps` times per
    /// second. `None` falls back to [`DEFAULT_MAX_FPS`].
    Animate { max_fps: Option<f32> },
    /// Hold `u_time` at a fixed timestamp (seconds).
    Still { time: f32 },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { max_fps: None }
    }
}

impl RenderPolicy {
    /// Effective update cap for this policy.
    pub fn max_fps(&self) -> f32 {
        match self {
            RenderPolicy::Animate { max_fps } => max_fps.unwrap_or(DEFAULT_MAX_FPS),
            RenderPolicy::Still { .. } => DEFAULT_MAX_FPS,
        }
    }
}

/// One reading of the time source, taken once per display refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the surface was mounted, or the pinned still time.
    pub seconds: f32,
    /// Number of refreshes seen before this one.
    pub frame_index: u64,
}

/// Where the surface reads its timestamps from.
pub trait TimeSource: Send {
    fn sample(&mut self) -> TimeSample;
}

/// Monotonic clock started when the source is built.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frames: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            frames: 0,
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let frame_index = self.frames;
        self.frames += 1;
        TimeSample {
            seconds: self.origin.elapsed().as_secs_f32(),
            frame_index,
        }
    }
}

/// Reports the same timestamp on every refresh.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    seconds: f32,
    frames: u64,
}

impl FixedTimeSource {
    pub fn new(seconds: f32) -> Self {
        Self { seconds, frames: 0 }
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&mut self) -> TimeSample {
        let frame_index = self.frames;
        self.frames += 1;
        TimeSample {
            seconds: self.seconds,
            frame_index,
        }
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource>;

pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match *policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } => Box::new(FixedTimeSource::new(time)),
    }
}

/// Frame-rate gate for the time uniform.
///
/// The clock is plain data: [`SurfaceClock::advance`] maps the previous state
/// and a tick timestamp to the next state, reporting whether `u_time` should
/// be rewritten. Ticks arriving faster than `1 / max_fps` are dropped, not
/// queued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceClock {
    time: f32,
    last_update: f32,
    max_fps: f32,
}

impl SurfaceClock {
    /// Creates a clock whose last update sits at `t = 0`.
    ///
    /// A non-positive or non-finite `max_fps` disables the cap.
    pub fn new(max_fps: f32) -> Self {
        Self {
            time: 0.0,
            last_update: 0.0,
            max_fps,
        }
    }

    /// Clock for a render policy.
    ///
    /// A still clock starts with `time` and `last_update` at the pinned
    /// timestamp, so the value is in place before the first tick and the
    /// repeated samples of a [`FixedTimeSource`] never reopen the gate.
    pub fn for_policy(policy: &RenderPolicy) -> Self {
        match *policy {
            RenderPolicy::Animate { .. } => Self::new(policy.max_fps()),
            RenderPolicy::Still { time } => Self {
                time,
                last_update: time,
                max_fps: policy.max_fps(),
            },
        }
    }

    /// Minimum spacing between two time updates, in seconds.
    pub fn min_interval(&self) -> f32 {
        if self.max_fps.is_finite() && self.max_fps > 0.0 {
            1.0 / self.max_fps
        } else {
            0.0
        }
    }

    /// Current value of the time uniform.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn last_update(&self) -> f32 {
        self.last_update
    }

    pub fn max_fps(&self) -> f32 {
        self.max_fps
    }

    /// Pure transition: returns the next state and whether it changed `time`.
    pub fn advance(self, timestamp: f32) -> (Self, bool) {
        if timestamp - self.last_update < self.min_interval() {
            return (self, false);
        }
        (
            Self {
                time: timestamp,
                last_update: timestamp,
                ..self
            },
            true,
        )
    }

    /// In-place wrapper around [`SurfaceClock::advance`].
    pub fn tick(&mut self, timestamp: f32) -> bool {
        let (next, updated) = self.advance(timestamp);
        *self = next;
        updated
    }
}

impl Default for SurfaceClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_skips_ticks_inside_the_frame_interval() {
        let clock = SurfaceClock::new(60.0);
        let (clock, first) = clock.advance(0.0);
        let (clock, second) = clock.advance(0.005);
        let (clock, third) = clock.advance(0.02);

        assert!(!first);
        assert!(!second);
        assert!(third);
        assert!((clock.time() - 0.02).abs() < f32::EPSILON);
    }

    #[test]
    fn skipped_ticks_leave_state_untouched() {
        let clock = SurfaceClock::new(30.0);
        let (next, updated) = clock.advance(0.01);
        assert!(!updated);
        assert_eq!(next, clock);
    }

    #[test]
    fn interval_is_measured_from_the_last_update_not_the_last_tick() {
        let mut clock = SurfaceClock::new(10.0);
        assert!(clock.tick(0.1));
        assert!(!clock.tick(0.15));
        assert!(!clock.tick(0.19));
        assert!(clock.tick(0.2));
        assert!((clock.last_update() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn non_positive_cap_disables_the_gate() {
        let mut clock = SurfaceClock::new(0.0);
        assert_eq!(clock.min_interval(), 0.0);
        assert!(clock.tick(0.0));
        assert!(clock.tick(0.0001));
    }

    #[test]
    fn fixed_source_repeats_its_timestamp() {
        let mut source = time_source_for_policy(&RenderPolicy::Still { time: 2.5 });
        let first = source.sample();
        let second = source.sample();
        assert_eq!(first.seconds, 2.5);
        assert_eq!(second.seconds, 2.5);
        assert_eq!(second.frame_index, 1);
    }

    #[test]
    fn still_clock_holds_times_shorter_than_one_frame() {
        let policy = RenderPolicy::Still { time: 0.01 };
        let mut source = time_source_for_policy(&policy);
        let mut clock = SurfaceClock::for_policy(&policy);
        assert_eq!(clock.time(), 0.01);
        for _ in 0..5 {
            clock.tick(source.sample().seconds);
            assert_eq!(clock.time(), 0.01);
        }
    }

    #[test]
    fn animate_clock_for_policy_starts_at_zero() {
        let clock = SurfaceClock::for_policy(&RenderPolicy::Animate {
            max_fps: Some(60.0),
        });
        assert_eq!(clock, SurfaceClock::new(60.0));
        let (_, updated) = clock.advance(0.005);
        assert!(!updated);
    }

    #[test]
    fn animate_policy_defaults_to_sixty_fps() {
        assert_eq!(RenderPolicy::default().max_fps(), DEFAULT_MAX_FPS);
        assert_eq!(
            RenderPolicy::Animate {
                max_fps: Some(24.0)
            }
            .max_fps(),
            24.0
        );
    }
}

//! Timing for the cosmetic expand/collapse and modal enter/exit animations.
//! Nothing here ever blocks input; callers sample [`Transition::visibility`]
//! when they render and drop the transition once it is done.

use std::time::{Duration, Instant};

use tachyonfx::Interpolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub direction: Direction,
    started: Instant,
    duration: Duration,
}

impl Transition {
    pub fn new(direction: Direction, started: Instant, duration: Duration) -> Self {
        Self {
            direction,
            started,
            duration,
        }
    }

    pub fn enter(now: Instant, duration: Duration) -> Self {
        Self::new(Direction::Enter, now, duration)
    }

    pub fn exit(now: Instant, duration: Duration) -> Self {
        Self::new(Direction::Exit, now, duration)
    }

    /// Linear progress in `0.0..=1.0`.
    pub fn linear(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Quadratic ease-out of [`Transition::linear`].
    pub fn progress(&self, now: Instant) -> f32 {
        Interpolation::QuadOut.alpha(self.linear(now))
    }

    /// How much of the animated content is shown: rises for `Enter`, falls
    /// for `Exit`.
    pub fn visibility(&self, now: Instant) -> f32 {
        match self.direction {
            Direction::Enter => self.progress(now),
            Direction::Exit => 1.0 - self.progress(now),
        }
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.linear(now) >= 1.0
    }
}

/// Number of `total` rows to reveal at `visibility`. Never zero while
/// anything is visible so the first row appears immediately.
pub fn revealed_rows(total: usize, visibility: f32) -> usize {
    if total == 0 || visibility <= 0.0 {
        return 0;
    }
    ((total as f32 * visibility).ceil() as usize).clamp(1, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_immediately_done() {
        let now = Instant::now();
        let t = Transition::enter(now, Duration::ZERO);
        assert!(t.is_done(now));
        assert_eq!(t.visibility(now), 1.0);
        assert_eq!(Transition::exit(now, Duration::ZERO).visibility(now), 0.0);
    }

    #[test]
    fn enter_progress_is_eased_and_monotonic() {
        let start = Instant::now();
        let t = Transition::enter(start, Duration::from_millis(300));
        let quarter = t.visibility(start + Duration::from_millis(75));
        let half = t.visibility(start + Duration::from_millis(150));
        assert!(quarter < half);
        assert!(half > 0.5);
        assert!(!t.is_done(start + Duration::from_millis(150)));
        assert!(t.is_done(start + Duration::from_millis(300)));
        assert_eq!(t.visibility(start + Duration::from_secs(2)), 1.0);
    }

    #[test]
    fn easing_matches_quad_out() {
        let start = Instant::now();
        let t = Transition::enter(start, Duration::from_millis(200));
        let half = t.progress(start + Duration::from_millis(100));
        assert!((half - 0.75).abs() < 1e-4);
    }

    #[test]
    fn exit_fades_to_nothing() {
        let start = Instant::now();
        let t = Transition::exit(start, Duration::from_millis(250));
        assert_eq!(t.visibility(start), 1.0);
        assert_eq!(t.visibility(start + Duration::from_millis(250)), 0.0);
    }

    #[test]
    fn reveal_shows_at_least_one_row() {
        assert_eq!(revealed_rows(10, 0.01), 1);
        assert_eq!(revealed_rows(10, 0.5), 5);
        assert_eq!(revealed_rows(10, 1.0), 10);
        assert_eq!(revealed_rows(0, 1.0), 0);
        assert_eq!(revealed_rows(4, 0.0), 0);
    }
}

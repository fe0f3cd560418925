use cozy_chess::Color;
use std::time::{Duration, Instant};

/// Two-sided chess clock with an optional per-move increment.
#[derive(Debug, Clone)]
pub struct ChessTimer {
    remaining: [Duration; 2],
    increment: Duration,
    active_side: Option<Color>,
    last_tick: Instant,
}

impl ChessTimer {
    /// Create a new timer with equal initial time for both sides.
    pub fn new(initial_time: Duration) -> Self {
        Self {
            remaining: [initial_time; 2],
            increment: Duration::ZERO,
            active_side: None,
            last_tick: Instant::now(),
        }
    }

    pub fn with_increment(mut self, increment: Duration) -> Self {
        self.increment = increment;
        self
    }

    /// Deduct the time elapsed since the last tick from the running side.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        self.tick_with_elapsed(elapsed);
    }

    /// Tick with a specific elapsed duration (useful for testing).
    pub fn tick_with_elapsed(&mut self, elapsed: Duration) {
        if let Some(side) = self.active_side {
            let slot = &mut self.remaining[side as usize];
            *slot = slot.saturating_sub(elapsed);
        }
    }

    /// Start or switch the clock to the given side.
    pub fn switch_to(&mut self, side: Color) {
        self.last_tick = Instant::now();
        self.active_side = Some(side);
    }

    /// `mover` finished a ply: credit the increment and hand the clock over.
    pub fn press(&mut self, mover: Color) {
        self.tick();
        if self.active_side.is_some() {
            self.remaining[mover as usize] += self.increment;
        }
        self.switch_to(!mover);
    }

    /// Stop both clocks.
    pub fn pause(&mut self) {
        self.tick();
        self.active_side = None;
    }

    pub fn remaining(&self, side: Color) -> Duration {
        self.remaining[side as usize]
    }

    pub fn is_flag_fallen(&self, side: Color) -> bool {
        self.remaining(side) == Duration::ZERO
    }

    pub fn active_side(&self) -> Option<Color> {
        self.active_side
    }

    /// Format a duration for display. MM:SS or M:SS.s when under 10 seconds.
    pub fn format_time(duration: Duration) -> String {
        let total_secs = duration.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;

        if total_secs < 10 {
            let tenths = duration.subsec_millis() / 100;
            format!("{}:{:02}.{}", minutes, seconds, tenths)
        } else {
            format!("{}:{:02}", minutes, seconds)
        }
    }
}

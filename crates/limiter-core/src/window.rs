//! Two-bucket window arithmetic for a single key.
//!
//! All timestamps are milliseconds from the injected clock. A key's window
//! grid is anchored at its first request; shifts move `window_start` forward
//! by whole window lengths so the grid never drifts.

/// The counters kept for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub window_start: u64,
    pub current: u32,
    pub previous: u32,
}

/// What a window shift did to the buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    None,
    /// Exactly one boundary crossed: current became previous.
    Rolled,
    /// Two or more boundaries crossed: both buckets cleared.
    Reset { windows: u64 },
}

impl Counters {
    pub fn new(window_start: u64) -> Self {
        Self {
            window_start,
            current: 0,
            previous: 0,
        }
    }

    /// Moves the buckets forward so that `now` falls inside the current
    /// window. A `now` before `window_start` is left alone.
    pub fn advance(&mut self, now: u64, window_ms: u64) -> Shift {
        let windows_passed = now.saturating_sub(self.window_start) / window_ms;
        let shift = match windows_passed {
            0 => return Shift::None,
            1 => {
                self.previous = self.current;
                self.current = 0;
                Shift::Rolled
            }
            windows => {
                self.previous = 0;
                self.current = 0;
                Shift::Reset { windows }
            }
        };
        // windows_passed * window_ms <= now - window_start, cannot overflow
        self.window_start += windows_passed * window_ms;
        shift
    }

    /// `floor(previous * weight) + current`, where the previous bucket's
    /// weight falls linearly from 1 at the start of the current window to 0
    /// at its end. Computed in integers so exact weights truncate exactly.
    pub fn weighted_count(&self, now: u64, window_ms: u64) -> u64 {
        let elapsed = now.saturating_sub(self.window_start).min(window_ms);
        let remaining = window_ms - elapsed;
        let carried =
            u128::from(self.previous) * u128::from(remaining) / u128::from(window_ms);
        // carried <= previous, which is a u32
        carried as u64 + u64::from(self.current)
    }
}

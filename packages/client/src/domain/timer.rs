//! Local countdown engine.
//!
//! `TimerState` is the per-device mirror of the shared document plus the
//! segment budget used to compute elapsed time. All transitions are
//! synchronous; pushing them to the store is the controller's job.

use super::ValidationError;

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Timer mode (segment kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerMode {
    Focus,
    Break,
}

impl TimerMode {
    pub fn opposite(self) -> Self {
        match self {
            Self::Focus => Self::Break,
            Self::Break => Self::Focus,
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Self::Focus => "Focus Time",
            Self::Break => "Break Time",
        }
    }
}

/// Run state of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Focus / break lengths in minutes (both at least 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    focus_minutes: u32,
    break_minutes: u32,
}

impl Durations {
    pub fn new(focus_minutes: u32, break_minutes: u32) -> Result<Self, ValidationError> {
        if focus_minutes < 1 {
            return Err(ValidationError::InvalidDuration {
                field: "focusDurationMinutes",
                value: focus_minutes,
            });
        }
        if break_minutes < 1 {
            return Err(ValidationError::InvalidDuration {
                field: "breakDurationMinutes",
                value: break_minutes,
            });
        }
        Ok(Self {
            focus_minutes,
            break_minutes,
        })
    }

    pub fn focus_minutes(&self) -> u32 {
        self.focus_minutes
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_minutes,
            TimerMode::Break => self.break_minutes,
        }
    }

    /// Full length of a segment of `mode`
    pub fn seconds_for(&self, mode: TimerMode) -> u32 {
        self.minutes_for(mode).saturating_mul(60)
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed
    Idle,
    /// Counted down one second
    Counted,
    /// The running segment reached zero. The timer has already switched to
    /// the opposite mode, reset to its full length and stopped.
    SegmentComplete {
        mode: TimerMode,
        elapsed_seconds: u32,
    },
}

/// Per-device timer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub run_state: RunState,
    pub active_mode: TimerMode,
    pub durations: Durations,
    /// Seconds the current running/paused segment began with
    pub segment_start_budget: u32,
}

impl TimerState {
    /// Stopped focus segment at full length
    pub fn new(durations: Durations) -> Self {
        let remaining_seconds = durations.seconds_for(TimerMode::Focus);
        Self {
            remaining_seconds,
            run_state: RunState::Stopped,
            active_mode: TimerMode::Focus,
            durations,
            segment_start_budget: remaining_seconds,
        }
    }

    /// Seconds spent in the current segment (0 while stopped)
    pub fn elapsed_seconds(&self) -> u32 {
        match self.run_state {
            RunState::Stopped => 0,
            RunState::Running | RunState::Paused => self
                .segment_start_budget
                .saturating_sub(self.remaining_seconds),
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.run_state != RunState::Running {
            return TickOutcome::Idle;
        }
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
            if self.remaining_seconds > 0 {
                return TickOutcome::Counted;
            }
        }

        let mode = self.active_mode;
        let elapsed_seconds = self.segment_start_budget;
        self.reset_to(mode.opposite());
        TickOutcome::SegmentComplete {
            mode,
            elapsed_seconds,
        }
    }

    /// Start or resume. Returns `false` if already running.
    ///
    /// A paused segment keeps its budget; a stopped one starts a new budget.
    pub fn start(&mut self) -> bool {
        match self.run_state {
            RunState::Running => return false,
            RunState::Stopped => {
                if self.remaining_seconds == 0 {
                    self.remaining_seconds = self.durations.seconds_for(self.active_mode);
                }
                self.segment_start_budget = self.remaining_seconds;
            }
            RunState::Paused => {
                if self.remaining_seconds == 0 {
                    self.remaining_seconds = self.durations.seconds_for(self.active_mode);
                    self.segment_start_budget = self.remaining_seconds;
                }
            }
        }
        self.run_state = RunState::Running;
        true
    }

    /// Returns `false` unless the timer was running
    pub fn pause(&mut self) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        self.run_state = RunState::Paused;
        true
    }

    /// Stop and reset the current mode; returns the elapsed seconds of the aborted segment
    pub fn stop(&mut self) -> u32 {
        let elapsed = self.elapsed_seconds();
        self.reset_to(self.active_mode);
        elapsed
    }

    /// Switch to `mode` (stopped, full length); returns the previous mode and its elapsed seconds
    pub fn switch_mode(&mut self, mode: TimerMode) -> (TimerMode, u32) {
        let previous = self.active_mode;
        let elapsed = self.elapsed_seconds();
        self.reset_to(mode);
        (previous, elapsed)
    }

    /// Adopt new durations; reflows the remaining time unless running
    pub fn apply_durations(&mut self, durations: Durations) {
        self.durations = durations;
        if self.run_state != RunState::Running {
            self.remaining_seconds = durations.seconds_for(self.active_mode);
            self.segment_start_budget = self.remaining_seconds;
        }
    }

    fn reset_to(&mut self, mode: TimerMode) {
        self.active_mode = mode;
        self.remaining_seconds = self.durations.seconds_for(mode);
        self.run_state = RunState::Stopped;
        self.segment_start_budget = self.remaining_seconds;
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(Durations::default())
    }
}

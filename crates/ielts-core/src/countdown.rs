//! Per-attempt countdown timer.
//!
//! The timer is a pure state machine; [`CountdownState`] makes the legal
//! states explicit. Something else (see `driver`) calls [`Countdown::tick`]
//! once per second.

/// Below this many seconds the display is flagged urgent.
pub const URGENT_THRESHOLD_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// Not started yet; holds the seeded time.
    Idle { seconds: u64 },
    Running { left: u64 },
    /// Reached zero. Terminal.
    Expired,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running with this many seconds left.
    Running(u64),
    /// This tick reached zero. Reported exactly once.
    Expired,
    /// The timer is not running; nothing happened.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    state: CountdownState,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Self {
            state: CountdownState::Idle { seconds },
        }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(u64::from(minutes) * 60)
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Start counting down. Does nothing unless idle with time on the clock.
    pub fn start(&mut self) -> bool {
        match self.state {
            CountdownState::Idle { seconds } if seconds > 0 => {
                self.state = CountdownState::Running { left: seconds };
                true
            }
            _ => false,
        }
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            CountdownState::Running { left } if left <= 1 => {
                self.state = CountdownState::Expired;
                TickOutcome::Expired
            }
            CountdownState::Running { left } => {
                self.state = CountdownState::Running { left: left - 1 };
                TickOutcome::Running(left - 1)
            }
            CountdownState::Idle { .. } | CountdownState::Expired => TickOutcome::Stopped,
        }
    }

    /// Re-seed the remaining time, e.g. after the test was fetched again.
    ///
    /// An expired timer stays expired, and a running timer ignores a zero
    /// seed.
    pub fn reseed(&mut self, seconds: u64) {
        self.state = match self.state {
            CountdownState::Idle { .. } => CountdownState::Idle { seconds },
            CountdownState::Running { left } if seconds == 0 => CountdownState::Running { left },
            CountdownState::Running { .. } => CountdownState::Running { left: seconds },
            CountdownState::Expired => CountdownState::Expired,
        };
    }

    pub fn time_left(&self) -> u64 {
        match self.state {
            CountdownState::Idle { seconds } => seconds,
            CountdownState::Running { left } => left,
            CountdownState::Expired => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.state, CountdownState::Expired)
    }

    /// Display hint only.
    pub fn is_urgent(&self) -> bool {
        matches!(self.state, CountdownState::Running { left } if left < URGENT_THRESHOLD_SECS)
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_clock(self.time_left())
    }
}

/// Format seconds as `MM:SS` (minutes may exceed 59).
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_until_started() {
        let mut timer = Countdown::new(10);
        assert_eq!(timer.tick(), TickOutcome::Stopped);
        assert_eq!(timer.time_left(), 10);
        assert!(timer.start());
        assert!(!timer.start());
        assert!(timer.is_running());
    }

    #[test]
    fn zero_time_never_starts() {
        let mut timer = Countdown::new(0);
        assert!(!timer.start());
        assert_eq!(timer.state(), CountdownState::Idle { seconds: 0 });
    }

    #[test]
    fn expires_exactly_once_after_t_ticks() {
        for t in 1..=20u64 {
            let mut timer = Countdown::new(t);
            timer.start();
            let mut expirations = 0;
            for i in 1..=t {
                match timer.tick() {
                    TickOutcome::Expired => {
                        expirations += 1;
                        assert_eq!(i, t);
                    }
                    TickOutcome::Running(left) => assert_eq!(left, t - i),
                    TickOutcome::Stopped => panic!("stopped early at tick {i}"),
                }
            }
            assert_eq!(expirations, 1);
            assert_eq!(timer.tick(), TickOutcome::Stopped);
            assert!(!timer.start());
        }
    }

    #[test]
    fn reseed_never_rearms_expired_timer() {
        let mut timer = Countdown::new(1);
        timer.start();
        assert_eq!(timer.tick(), TickOutcome::Expired);
        timer.reseed(600);
        assert!(timer.is_expired());
        assert_eq!(timer.time_left(), 0);
    }

    #[test]
    fn reseed_updates_running_and_idle_timers() {
        let mut timer = Countdown::from_minutes(1);
        timer.reseed(120);
        assert_eq!(timer.time_left(), 120);
        timer.start();
        timer.tick();
        timer.reseed(300);
        assert_eq!(timer.state(), CountdownState::Running { left: 300 });
        timer.reseed(0);
        assert_eq!(timer.time_left(), 300);
    }

    #[test]
    fn urgent_below_five_minutes() {
        let mut timer = Countdown::new(301);
        timer.start();
        assert!(!timer.is_urgent());
        timer.tick();
        assert!(!timer.is_urgent());
        timer.tick();
        assert!(timer.is_urgent());
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(3600), "60:00");
        assert_eq!(Countdown::from_minutes(40).display(), "40:00");
    }
}

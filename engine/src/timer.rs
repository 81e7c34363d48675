//! Countdown timer for the active quiz.
//!
//! [`Countdown`] is the pure state machine. [`QuizTimer`] drives it from a
//! once-per-second background task that sends [`TimerTick`]s over a channel.
//! Every tick carries the [`SessionId`] it was started for; ticks for any other
//! session are dropped, so a late tick can never touch a newer session.

use std::fmt;
use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

/// Fixed time budget per question.
pub const SECONDS_PER_QUESTION: u32 = 60;

/// Remaining time below which the clock is shown as urgent.
pub const URGENT_THRESHOLD_SECS: u32 = 60;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub session: SessionId,
}

/// Total seconds allowed for a quiz of `question_count` questions.
#[must_use]
pub fn time_budget(question_count: usize) -> u32 {
    u32::try_from(question_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(SECONDS_PER_QUESTION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Stopped,
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining: u32 },
    /// The clock just reached zero. Reported exactly once per run.
    Expired,
    /// Timer not running, or the tick belongs to another session.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    state: TimerState,
    remaining: u32,
    total: u32,
}

impl Countdown {
    #[must_use]
    pub const fn start(total_secs: u32) -> Self {
        Self {
            state: TimerState::Running,
            remaining: total_secs,
            total: total_secs,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Expired;
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining: self.remaining,
            }
        }
    }

    /// Freeze the clock. Remaining time is kept for display.
    pub fn stop(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
        }
    }

    #[must_use]
    pub const fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        self.total.saturating_sub(self.remaining)
    }

    #[must_use]
    pub fn is_urgent(&self) -> bool {
        self.state == TimerState::Running && self.remaining < URGENT_THRESHOLD_SECS
    }
}

/// A [`Countdown`] plus the background task feeding it.
#[derive(Debug)]
pub struct QuizTimer {
    countdown: Countdown,
    session: Option<SessionId>,
    ticker: Option<AbortHandle>,
    tx: mpsc::UnboundedSender<TimerTick>,
    rx: mpsc::UnboundedReceiver<TimerTick>,
}

impl Default for QuizTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizTimer {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            countdown: Countdown::default(),
            session: None,
            ticker: None,
            tx,
            rx,
        }
    }

    /// Start a full countdown for `session`, replacing any previous run.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, session: SessionId, total_secs: u32) {
        self.abort_ticker();
        self.countdown = Countdown::start(total_secs);
        self.session = Some(session);

        let (abort_handle, registration) = AbortHandle::new_pair();
        let tx = self.tx.clone();
        let ticks = async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            loop {
                interval.tick().await;
                if tx.send(TimerTick { session }).is_err() {
                    break;
                }
            }
        };
        tokio::spawn(Abortable::new(ticks, registration));
        self.ticker = Some(abort_handle);

        tracing::debug!(%session, total_secs, "Quiz timer started");
    }

    /// Stop ticking and freeze the clock.
    pub fn stop(&mut self) {
        self.abort_ticker();
        self.countdown.stop();
    }

    fn abort_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    /// Apply one tick. Ticks for any session but the current one are ignored.
    pub fn handle_tick(&mut self, tick: TimerTick) -> TickOutcome {
        if self.session != Some(tick.session) {
            tracing::debug!(tick = %tick.session, "Dropping stale timer tick");
            return TickOutcome::Ignored;
        }
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            self.abort_ticker();
        }
        outcome
    }

    /// Drain pending ticks. Returns true if the countdown expired during this drain.
    pub fn poll(&mut self) -> bool {
        let mut expired = false;
        while let Ok(tick) = self.rx.try_recv() {
            expired |= self.handle_tick(tick) == TickOutcome::Expired;
        }
        expired
    }

    #[must_use]
    pub const fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    #[must_use]
    pub const fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Whether a background ticker is currently alive.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.abort_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Countdown, QuizTimer, SessionId, TickOutcome, TimerState, TimerTick, time_budget,
    };
    use std::time::Duration;

    #[test]
    fn budget_is_a_minute_per_question() {
        assert_eq!(time_budget(5), 300);
        assert_eq!(time_budget(20), 1200);
    }

    #[test]
    fn countdown_expires_exactly_once() {
        let mut countdown = Countdown::start(2);
        assert_eq!(countdown.tick(), TickOutcome::Running { remaining: 1 });
        assert_eq!(countdown.tick(), TickOutcome::Expired);
        assert_eq!(countdown.state(), TimerState::Expired);
        assert_eq!(countdown.tick(), TickOutcome::Ignored);
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn stopped_countdown_ignores_ticks_and_keeps_remaining() {
        let mut countdown = Countdown::start(90);
        countdown.tick();
        countdown.stop();
        assert_eq!(countdown.tick(), TickOutcome::Ignored);
        assert_eq!(countdown.remaining(), 89);
        assert_eq!(countdown.elapsed(), 1);
        assert_eq!(countdown.state(), TimerState::Stopped);
    }

    #[test]
    fn urgent_below_one_minute() {
        let mut countdown = Countdown::start(61);
        assert!(!countdown.is_urgent());
        countdown.tick();
        assert!(!countdown.is_urgent());
        countdown.tick();
        assert!(countdown.is_urgent());
        countdown.stop();
        assert!(!countdown.is_urgent());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_session_ticks_are_ignored() {
        let mut timer = QuizTimer::new();
        timer.start(SessionId::new(1), 120);
        timer.start(SessionId::new(2), 120);

        let outcome = timer.handle_tick(TimerTick {
            session: SessionId::new(1),
        });
        assert_eq!(outcome, TickOutcome::Ignored);
        assert_eq!(timer.countdown().remaining(), 120);

        let outcome = timer.handle_tick(TimerTick {
            session: SessionId::new(2),
        });
        assert_eq!(outcome, TickOutcome::Running { remaining: 119 });
    }

    #[tokio::test(start_paused = true)]
    async fn background_ticks_drive_the_countdown() {
        let mut timer = QuizTimer::new();
        timer.start(SessionId::new(7), 3);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!timer.poll());
        assert_eq!(timer.countdown().remaining(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(timer.poll());
        assert_eq!(timer.countdown().state(), TimerState::Expired);
        assert!(!timer.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_the_ticker() {
        let mut timer = QuizTimer::new();
        timer.start(SessionId::new(1), 10);
        timer.stop();
        assert!(!timer.is_ticking());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!timer.poll());
        assert_eq!(timer.countdown().remaining(), 10);
    }
}

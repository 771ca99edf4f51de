//! Adaptive scan pacing.
//!
//! [`ScanScheduler`] is a pure state machine: it decides when a scan should
//! be requested and which timer should be pending, and reports that as a
//! [`ScanDirective`]. [`ScanTimer`] owns the single tokio task that turns an
//! armed timer into a [`Message::ScanTick`].
//!
//! ```text
//!   enter_view / resume / manual scan
//!  ┌────────────────────────────────────┐
//!  │                                    ▼
//! Off ◄── leave_view / pause ──── Fast ──(N non-empty results)──► Slow
//!  ▲                                    ▲                          │
//!  │                                    └──── manual scan / empty ─┘
//!  └──────────── leave_view / pause ───────────────────────────────┘
//! ```

use crate::command::Message;
use crate::config::ScanConfig;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Scan pacing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// No periodic scans
    #[default]
    Off,
    /// Short interval, used while the environment may be changing
    Fast,
    /// Long interval, used once results look stable
    Slow,
}

/// What the timer should do after a scheduler transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerChange {
    /// Leave the pending timer alone
    Keep,
    /// Replace any pending timer with one firing after `after`
    Arm {
        /// Token the resulting tick must carry
        generation: u64,
        /// Delay before the tick
        after: Duration,
    },
    /// Drop the pending timer
    Cancel,
}

/// Outcome of a scheduler transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanDirective {
    /// Request a scan right away
    pub scan_now: bool,
    /// Timer adjustment
    pub timer: TimerChange,
}

impl ScanDirective {
    const IDLE: Self = Self {
        scan_now: false,
        timer: TimerChange::Keep,
    };
}

/// State machine pacing scan requests.
#[derive(Debug, Clone)]
pub struct ScanScheduler {
    config: ScanConfig,
    mode: ScanMode,
    view_active: bool,
    paused: bool,
    consecutive_non_empty: u32,
    generation: u64,
}

impl ScanScheduler {
    /// Create a scheduler in the `Off` state.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            mode: ScanMode::Off,
            view_active: false,
            paused: false,
            consecutive_non_empty: 0,
            generation: 0,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Whether periodic scanning was switched off by the user.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Interval for the current mode, `None` when off.
    pub fn interval(&self) -> Option<Duration> {
        match self.mode {
            ScanMode::Off => None,
            ScanMode::Fast => Some(self.config.fast_interval),
            ScanMode::Slow => Some(self.config.slow_interval),
        }
    }

    /// Generation the next accepted tick must carry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn arm(&mut self) -> TimerChange {
        self.generation += 1;
        match self.interval() {
            Some(after) => TimerChange::Arm {
                generation: self.generation,
                after,
            },
            None => TimerChange::Cancel,
        }
    }

    fn go_fast(&mut self) -> ScanDirective {
        self.mode = ScanMode::Fast;
        self.consecutive_non_empty = 0;
        ScanDirective {
            scan_now: true,
            timer: self.arm(),
        }
    }

    fn go_off(&mut self) -> ScanDirective {
        self.mode = ScanMode::Off;
        self.consecutive_non_empty = 0;
        self.generation += 1;
        ScanDirective {
            scan_now: false,
            timer: TimerChange::Cancel,
        }
    }

    /// A view needing live data became visible.
    pub fn enter_view(&mut self) -> ScanDirective {
        self.view_active = true;
        if self.paused {
            debug!("Scan view entered while paused");
            return ScanDirective::IDLE;
        }
        debug!("Scan view entered, scanning fast");
        self.go_fast()
    }

    /// The live view was left; nothing further fires.
    pub fn leave_view(&mut self) -> ScanDirective {
        self.view_active = false;
        debug!("Scan view left, scanning off");
        self.go_off()
    }

    /// The user asked for a scan.
    ///
    /// Always scans once. Periodic scanning restarts at the fast interval
    /// unless it is paused or no live view is showing.
    pub fn request_scan(&mut self) -> ScanDirective {
        if self.paused || !self.view_active {
            return ScanDirective {
                scan_now: true,
                timer: TimerChange::Keep,
            };
        }
        self.go_fast()
    }

    /// Pause or resume periodic scanning.
    pub fn set_paused(&mut self, paused: bool) -> ScanDirective {
        if self.paused == paused {
            return ScanDirective::IDLE;
        }
        self.paused = paused;
        if paused {
            debug!("Periodic scanning paused");
            self.go_off()
        } else if self.view_active {
            debug!("Periodic scanning resumed");
            self.go_fast()
        } else {
            ScanDirective::IDLE
        }
    }

    /// A timer tick arrived.
    ///
    /// Ticks from a cancelled or replaced timer are ignored.
    pub fn on_tick(&mut self, generation: u64) -> ScanDirective {
        if self.mode == ScanMode::Off || generation != self.generation {
            trace!("Ignoring stale scan tick {}", generation);
            return ScanDirective::IDLE;
        }
        ScanDirective {
            scan_now: true,
            timer: self.arm(),
        }
    }

    /// Feed back whether a scan returned any networks.
    pub fn record_result(&mut self, non_empty: bool) {
        if self.mode == ScanMode::Off {
            return;
        }
        if !non_empty {
            self.consecutive_non_empty = 0;
            if self.mode == ScanMode::Slow {
                debug!("Empty scan result, back to fast scanning");
                self.mode = ScanMode::Fast;
            }
            return;
        }
        self.consecutive_non_empty = self.consecutive_non_empty.saturating_add(1);
        if self.mode == ScanMode::Fast && self.consecutive_non_empty >= self.config.stable_ticks {
            debug!(
                "{} consecutive non-empty scans, slowing down",
                self.consecutive_non_empty
            );
            self.mode = ScanMode::Slow;
        }
    }
}

/// Owner of the one pending scan timer.
///
/// Arming replaces the previous timer; dropping the owner cancels it.
#[derive(Debug)]
pub struct ScanTimer {
    tx: mpsc::Sender<Message>,
    pending: Option<JoinHandle<()>>,
}

impl ScanTimer {
    /// Create a timer that posts ticks into `tx`.
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx, pending: None }
    }

    /// Apply a scheduler decision.
    pub fn apply(&mut self, change: TimerChange) {
        match change {
            TimerChange::Keep => {}
            TimerChange::Arm { generation, after } => self.arm(generation, after),
            TimerChange::Cancel => self.cancel(),
        }
    }

    /// Whether a tick is still pending.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn arm(&mut self, generation: u64, after: Duration) {
        self.cancel();
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if tx.send(Message::ScanTick { generation }).await.is_err() {
                trace!("Scan tick {} dropped, consumer gone", generation);
            }
        }));
    }

    /// Drop the pending tick, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for ScanTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> ScanScheduler {
        ScanScheduler::new(ScanConfig {
            fast_interval: Duration::from_secs(2),
            slow_interval: Duration::from_secs(10),
            stable_ticks: 3,
        })
    }

    fn armed_generation(directive: ScanDirective) -> u64 {
        match directive.timer {
            TimerChange::Arm { generation, .. } => generation,
            other => panic!("expected armed timer, got {:?}", other),
        }
    }

    #[test]
    fn test_enter_view_scans_immediately() {
        let mut s = scheduler();
        assert_eq!(s.mode(), ScanMode::Off);
        let d = s.enter_view();
        assert!(d.scan_now);
        assert_eq!(s.mode(), ScanMode::Fast);
        assert!(matches!(
            d.timer,
            TimerChange::Arm { after, .. } if after == Duration::from_secs(2)
        ));
    }

    #[test]
    fn test_three_non_empty_results_slow_down() {
        let mut s = scheduler();
        s.enter_view();
        s.record_result(true);
        s.record_result(true);
        assert_eq!(s.mode(), ScanMode::Fast);
        s.record_result(true);
        assert_eq!(s.mode(), ScanMode::Slow);

        let d = s.on_tick(s.generation());
        assert!(d.scan_now);
        assert!(matches!(
            d.timer,
            TimerChange::Arm { after, .. } if after == Duration::from_secs(10)
        ));
    }

    #[test]
    fn test_empty_result_resets_streak() {
        let mut s = scheduler();
        s.enter_view();
        s.record_result(true);
        s.record_result(true);
        s.record_result(false);
        s.record_result(true);
        assert_eq!(s.mode(), ScanMode::Fast);
    }

    #[test]
    fn test_manual_scan_resets_to_fast() {
        let mut s = scheduler();
        s.enter_view();
        for _ in 0..3 {
            s.record_result(true);
        }
        assert_eq!(s.mode(), ScanMode::Slow);
        let d = s.request_scan();
        assert!(d.scan_now);
        assert_eq!(s.mode(), ScanMode::Fast);
    }

    #[test]
    fn test_reentering_view_resets_to_fast() {
        let mut s = scheduler();
        s.enter_view();
        for _ in 0..3 {
            s.record_result(true);
        }
        s.leave_view();
        assert_eq!(s.mode(), ScanMode::Off);
        s.enter_view();
        assert_eq!(s.mode(), ScanMode::Fast);
    }

    #[test]
    fn test_stale_tick_ignored_after_leave() {
        let mut s = scheduler();
        let generation = armed_generation(s.enter_view());
        let d = s.leave_view();
        assert_eq!(d.timer, TimerChange::Cancel);
        assert_eq!(s.on_tick(generation), ScanDirective::IDLE);
    }

    #[test]
    fn test_rearm_invalidates_previous_tick() {
        let mut s = scheduler();
        let first = armed_generation(s.enter_view());
        let second = armed_generation(s.request_scan());
        assert_ne!(first, second);
        assert!(!s.on_tick(first).scan_now);
        assert!(s.on_tick(second).scan_now);
    }

    #[test]
    fn test_pause_forces_off_and_resume_goes_fast() {
        let mut s = scheduler();
        s.enter_view();
        for _ in 0..3 {
            s.record_result(true);
        }
        let d = s.set_paused(true);
        assert_eq!(d.timer, TimerChange::Cancel);
        assert_eq!(s.mode(), ScanMode::Off);

        // Entering while paused stays off.
        assert_eq!(s.enter_view(), ScanDirective::IDLE);
        // A manual scan still scans once without restarting the timer.
        let d = s.request_scan();
        assert!(d.scan_now);
        assert_eq!(d.timer, TimerChange::Keep);

        let d = s.set_paused(false);
        assert!(d.scan_now);
        assert_eq!(s.mode(), ScanMode::Fast);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_delivers_tick() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = ScanTimer::new(tx);
        timer.apply(TimerChange::Arm {
            generation: 7,
            after: Duration::from_secs(2),
        });
        assert!(timer.is_pending());

        match rx.recv().await {
            Some(Message::ScanTick { generation }) => assert_eq!(generation, 7),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = ScanTimer::new(tx);
        timer.apply(TimerChange::Arm {
            generation: 1,
            after: Duration::from_secs(2),
        });
        timer.apply(TimerChange::Cancel);
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_timer() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = ScanTimer::new(tx);
        timer.apply(TimerChange::Arm {
            generation: 1,
            after: Duration::from_secs(2),
        });
        timer.apply(TimerChange::Arm {
            generation: 2,
            after: Duration::from_secs(5),
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        match rx.try_recv() {
            Ok(Message::ScanTick { generation }) => assert_eq!(generation, 2),
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}

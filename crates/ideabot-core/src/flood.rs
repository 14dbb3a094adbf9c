//! Per-sender anti-flood state: sliding window plus cooldown lockout.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use crate::domain::UserId;

/// Anti-flood policy knobs.
#[derive(Clone, Copy, Debug)]
pub struct FloodConfig {
    pub enabled: bool,
    /// Messages tolerated inside `window`; one more trips the cooldown.
    pub max_in_window: usize,
    pub window: Duration,
    pub cooldown: Duration,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_in_window: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(120),
        }
    }
}

/// Why a sender was turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// A previous overflow put the sender into cooldown that has not expired.
    CoolingDown,
    /// This message exceeded the window budget and started a cooldown.
    WindowExceeded,
}

impl DenyReason {
    /// Short warning shown to the sender.
    pub fn user_text(self) -> &'static str {
        match self {
            DenyReason::CoolingDown => {
                "Слишком много сообщений. Пожалуйста, попробуйте позже."
            }
            DenyReason::WindowExceeded => {
                "Слишком много сообщений за короткое время. Подождите немного и попробуйте снова."
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(DenyReason),
}

#[derive(Debug, Default)]
struct SenderEntry {
    hits: VecDeque<Instant>,
    cooldown_until: Option<Instant>,
}

/// Sliding-window limiter with a cooldown lockout, keyed by sender id.
///
/// Attempts rejected during cooldown are not recorded, so a sustained flood
/// does not grow the window while the sender is locked out.
#[derive(Debug)]
pub struct FloodControl {
    cfg: FloodConfig,
    entries: HashMap<UserId, SenderEntry>,
}

impl FloodControl {
    pub fn new(cfg: FloodConfig) -> Self {
        Self {
            cfg,
            entries: HashMap::new(),
        }
    }

    pub fn check(&mut self, sender: UserId) -> Verdict {
        self.check_at(sender, Instant::now())
    }

    pub fn check_at(&mut self, sender: UserId, now: Instant) -> Verdict {
        if !self.cfg.enabled {
            return Verdict::Allowed;
        }

        let entry = self.entries.entry(sender).or_default();

        if let Some(until) = entry.cooldown_until {
            if now < until {
                return Verdict::Denied(DenyReason::CoolingDown);
            }
            entry.cooldown_until = None;
        }

        entry.hits.push_back(now);
        while entry
            .hits
            .front()
            .map(|t| now.duration_since(*t) > self.cfg.window)
            .unwrap_or(false)
        {
            entry.hits.pop_front();
        }

        if entry.hits.len() > self.cfg.max_in_window {
            entry.cooldown_until = Some(now + self.cfg.cooldown);
            return Verdict::Denied(DenyReason::WindowExceeded);
        }

        Verdict::Allowed
    }

    pub fn sweep(&mut self) {
        self.sweep_at(Instant::now());
    }

    /// Drop senders with no hit inside the window and no pending cooldown,
    /// so the map does not grow with every sender ever seen.
    pub fn sweep_at(&mut self, now: Instant) {
        let window = self.cfg.window;
        self.entries.retain(|_, entry| {
            if let Some(until) = entry.cooldown_until {
                if now < until {
                    return true;
                }
            }
            entry
                .hits
                .back()
                .map(|t| now.duration_since(*t) <= window)
                .unwrap_or(false)
        });
    }

    pub fn tracked_senders(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> FloodConfig {
        FloodConfig::default()
    }

    #[test]
    fn tolerates_exactly_the_window_budget() {
        let start = Instant::now();
        let mut fc = FloodControl::new(cfg());
        let u = UserId(42);

        for i in 0..5 {
            assert_eq!(
                fc.check_at(u, start + Duration::from_secs(i)),
                Verdict::Allowed,
                "message {} should pass",
                i + 1
            );
        }
        assert_eq!(
            fc.check_at(u, start + Duration::from_secs(5)),
            Verdict::Denied(DenyReason::WindowExceeded)
        );
    }

    #[test]
    fn old_hits_age_out_of_the_rolling_window() {
        let start = Instant::now();
        let mut fc = FloodControl::new(cfg());
        let u = UserId(1);

        // Five hits spread across the window, then a sixth after the first
        // has aged out: still five inside the window, so it passes.
        for i in 0..5 {
            assert_eq!(
                fc.check_at(u, start + Duration::from_secs(i * 10)),
                Verdict::Allowed
            );
        }
        assert_eq!(
            fc.check_at(u, start + Duration::from_secs(61)),
            Verdict::Allowed
        );
    }

    #[test]
    fn cooldown_denies_until_expiry_without_recording() {
        let start = Instant::now();
        let mut fc = FloodControl::new(cfg());
        let u = UserId(7);

        for i in 0..5 {
            fc.check_at(u, start + Duration::from_secs(i));
        }
        assert_eq!(
            fc.check_at(u, start + Duration::from_secs(5)),
            Verdict::Denied(DenyReason::WindowExceeded)
        );

        // Hammering during cooldown is rejected with the distinct reason.
        for s in [6, 60, 115, 116, 117, 118, 119, 124] {
            assert_eq!(
                fc.check_at(u, start + Duration::from_secs(s)),
                Verdict::Denied(DenyReason::CoolingDown),
                "at +{s}s"
            );
        }

        // Cooldown was set at +5s, so it expires at +125s. None of the
        // rejected attempts were recorded and the pre-cooldown hits have
        // aged out, so the next message passes cleanly.
        assert_eq!(
            fc.check_at(u, start + Duration::from_secs(125)),
            Verdict::Allowed
        );
    }

    #[test]
    fn expired_cooldown_does_not_linger() {
        let start = Instant::now();
        let mut fc = FloodControl::new(cfg());
        let u = UserId(9);

        for i in 0..6 {
            fc.check_at(u, start + Duration::from_secs(i));
        }
        // Well past expiry: evaluated purely on the (empty) window.
        assert_eq!(
            fc.check_at(u, start + Duration::from_secs(300)),
            Verdict::Allowed
        );
        assert_eq!(
            fc.check_at(u, start + Duration::from_secs(301)),
            Verdict::Allowed
        );
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let start = Instant::now();
        let mut fc = FloodControl::new(FloodConfig {
            enabled: false,
            ..cfg()
        });
        let u = UserId(3);

        for i in 0..50 {
            assert_eq!(
                fc.check_at(u, start + Duration::from_millis(i)),
                Verdict::Allowed
            );
        }
    }

    #[test]
    fn senders_are_limited_independently() {
        let start = Instant::now();
        let mut fc = FloodControl::new(cfg());

        for i in 0..6 {
            fc.check_at(UserId(1), start + Duration::from_secs(i));
        }
        assert_eq!(
            fc.check_at(UserId(1), start + Duration::from_secs(7)),
            Verdict::Denied(DenyReason::CoolingDown)
        );
        assert_eq!(
            fc.check_at(UserId(2), start + Duration::from_secs(7)),
            Verdict::Allowed
        );
    }

    #[test]
    fn sweep_drops_idle_senders_but_keeps_cooldowns() {
        let start = Instant::now();
        let mut fc = FloodControl::new(cfg());

        // One idle sender, one in cooldown.
        fc.check_at(UserId(1), start);
        for i in 0..6 {
            fc.check_at(UserId(2), start + Duration::from_secs(i));
        }
        assert_eq!(fc.tracked_senders(), 2);

        fc.sweep_at(start + Duration::from_secs(90));
        assert_eq!(fc.tracked_senders(), 1);

        // After the cooldown expires and the hits age out, the sweep clears
        // the last entry too.
        fc.sweep_at(start + Duration::from_secs(300));
        assert_eq!(fc.tracked_senders(), 0);
    }
}

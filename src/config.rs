//! # Dispatcher configuration.
//!
//! Provides [`Config`] (dispatcher-wide settings) and [`NotifyConfig`]
//! (per-round overrides).
//!
//! Config is used in two ways:
//! 1. **Dispatcher creation**: `Dispatcher::builder(config).build()`
//! 2. **Round defaults**: `NotifyConfig::resolve(&config)` fills unset overrides
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → clamped to 1 (a dispatcher always has a limiter)
//! - `call_timeout = 0s` → no per-call timeout
//! - `round_deadline = 0s` → no round deadline

use std::thread;
use std::time::Duration;

/// Global configuration for a dispatcher.
///
/// ## Field semantics
/// - `max_concurrent`: In-flight subscriber invocations per dispatcher (min 1)
/// - `call_timeout`: Default per-call timeout (`0s` = none)
/// - `round_deadline`: Default overall round deadline (`0s` = none)
/// - `bus_capacity`: Lifecycle event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public. Prefer the accessors to avoid sprinkling sentinel
/// checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of subscriber invocations running at once.
    ///
    /// Applied across all rounds of one dispatcher.
    pub max_concurrent: usize,

    /// Default per-call timeout.
    ///
    /// A call exceeding it is recorded as `TimedOut` and detached.
    pub call_timeout: Duration,

    /// Default deadline for a whole round.
    ///
    /// When it expires, unresolved subscribers are recorded as `TimedOut`
    /// and `notify` returns without waiting further.
    pub round_deadline: Duration,

    /// Capacity of the lifecycle event bus.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the concurrency limit clamped to a minimum of 1.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Returns the per-call timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per call
    #[inline]
    pub fn call_timeout(&self) -> Option<Duration> {
        non_zero(self.call_timeout)
    }

    /// Returns the round deadline as an `Option`.
    #[inline]
    pub fn round_deadline(&self) -> Option<Duration> {
        non_zero(self.round_deadline)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_concurrent` = available parallelism (1 if unknown)
    /// - `call_timeout = 0s` (no timeout)
    /// - `round_deadline = 0s` (no deadline)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: thread::available_parallelism().map_or(1, |n| n.get()),
            call_timeout: Duration::ZERO,
            round_deadline: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}

/// Per-round overrides for [`Dispatcher::notify_with`](crate::Dispatcher::notify_with).
///
/// Unset fields fall back to the dispatcher's [`Config`].
///
/// `concurrency_limit` can only narrow the dispatcher-wide limit: a round
/// never runs more invocations than the dispatcher allows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Per-round concurrency cap.
    pub concurrency_limit: Option<usize>,
    /// Per-call timeout (`Some(0s)` disables the dispatcher default).
    pub call_timeout: Option<Duration>,
    /// Round deadline (`Some(0s)` disables the dispatcher default).
    pub round_deadline: Option<Duration>,
}

impl NotifyConfig {
    /// Empty overrides (use dispatcher defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps concurrency for this round only.
    #[must_use]
    pub fn with_concurrency_limit(mut self, n: usize) -> Self {
        self.concurrency_limit = Some(n.max(1));
        self
    }

    /// Sets the per-call timeout for this round.
    #[must_use]
    pub fn with_call_timeout(mut self, d: Duration) -> Self {
        self.call_timeout = Some(d);
        self
    }

    /// Sets the round deadline.
    #[must_use]
    pub fn with_round_deadline(mut self, d: Duration) -> Self {
        self.round_deadline = Some(d);
        self
    }

    /// Resolves overrides against dispatcher defaults.
    pub(crate) fn resolve(&self, cfg: &Config) -> RoundSettings {
        let global = cfg.concurrency_limit();
        RoundSettings {
            round_limit: self
                .concurrency_limit
                .map(|n| n.max(1))
                .filter(|n| *n < global),
            call_timeout: self.call_timeout.map_or(cfg.call_timeout(), non_zero),
            round_deadline: self.round_deadline.map_or(cfg.round_deadline(), non_zero),
        }
    }
}

/// Effective settings of one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RoundSettings {
    /// Round-local cap; `None` when the dispatcher limit already applies.
    pub round_limit: Option<usize>,
    pub call_timeout: Option<Duration>,
    pub round_deadline: Option<Duration>,
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d == Duration::ZERO { None } else { Some(d) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config {
            max_concurrent: 4,
            call_timeout: Duration::from_millis(100),
            round_deadline: Duration::ZERO,
            bus_capacity: 0,
        }
    }

    #[test]
    fn sentinels() {
        let c = cfg();
        assert_eq!(c.call_timeout(), Some(Duration::from_millis(100)));
        assert_eq!(c.round_deadline(), None);
        assert_eq!(c.bus_capacity_clamped(), 1);

        let zero = Config {
            max_concurrent: 0,
            ..cfg()
        };
        assert_eq!(zero.concurrency_limit(), 1);
    }

    #[test]
    fn default_concurrency_is_at_least_one() {
        assert!(Config::default().concurrency_limit() >= 1);
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let s = NotifyConfig::new().resolve(&cfg());
        assert_eq!(s.round_limit, None);
        assert_eq!(s.call_timeout, Some(Duration::from_millis(100)));
        assert_eq!(s.round_deadline, None);
    }

    #[test]
    fn resolve_applies_overrides() {
        let s = NotifyConfig::new()
            .with_concurrency_limit(2)
            .with_call_timeout(Duration::ZERO)
            .with_round_deadline(Duration::from_secs(1))
            .resolve(&cfg());
        assert_eq!(s.round_limit, Some(2));
        assert_eq!(s.call_timeout, None);
        assert_eq!(s.round_deadline, Some(Duration::from_secs(1)));
    }

    #[test]
    fn round_limit_never_widens_global() {
        let s = NotifyConfig::new()
            .with_concurrency_limit(16)
            .resolve(&cfg());
        assert_eq!(s.round_limit, None);
    }
}

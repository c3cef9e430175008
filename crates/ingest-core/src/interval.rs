//! Interval provider capability consumed by `PeriodicScheduler`.

use chrono::Utc;
use croner::Cron;
use std::time::Duration;

/// Capability exposing the next sleep duration for a periodic task.
///
/// `PeriodicScheduler` reads [`IntervalProvider::value`] once per iteration;
/// implementations may return a constant or compute it dynamically (e.g.
/// from a cron schedule).
pub trait IntervalProvider: Send + Sync {
    /// The duration to sleep before the next iteration. `Duration::MAX`
    /// signals "wait forever" (used to represent the `infinite` sentinel
    /// described in spec.md §4.10).
    fn value(&self) -> Duration;
}

/// Sentinel used in place of an actual "infinite" duration type; chosen so
/// arithmetic against it never overflows `tokio::time::sleep`.
pub const INFINITE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// The default unit used to interpret a bare numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn as_duration(self, raw: i64) -> Duration {
        let ms: i64 = match self {
            TimeUnit::Milliseconds => raw,
            TimeUnit::Seconds => raw.saturating_mul(1_000),
            TimeUnit::Minutes => raw.saturating_mul(60_000),
            TimeUnit::Hours => raw.saturating_mul(3_600_000),
            TimeUnit::Days => raw.saturating_mul(86_400_000),
        };
        Duration::from_millis(ms.max(0) as u64)
    }
}

/// Parses a user-visible duration string (`"30s"`, `"5m"`, `"1500"`, ...)
/// using `default_unit` when no suffix is present.
///
/// A raw value of zero becomes [`INFINITE`] unless `allow_zero` is set; a
/// negative raw value always becomes [`INFINITE`].
#[derive(Debug, Clone)]
pub struct TimeSpanWrapper {
    value: Duration,
}

impl TimeSpanWrapper {
    /// Parses `raw` with the given default unit and zero-handling.
    pub fn parse(raw: &str, default_unit: TimeUnit, allow_zero: bool) -> Self {
        let (number, unit) = split_suffix(raw, default_unit);
        let value = match number {
            n if n < 0 => INFINITE,
            0 if !allow_zero => INFINITE,
            n => unit.as_duration(n),
        };
        Self { value }
    }

    /// Wraps an already-computed duration directly (used by tests and by
    /// callers that already have a `Duration`, bypassing string parsing).
    pub fn from_duration(value: Duration) -> Self {
        Self { value }
    }
}

impl IntervalProvider for TimeSpanWrapper {
    fn value(&self) -> Duration {
        self.value
    }
}

fn split_suffix(raw: &str, default_unit: TimeUnit) -> (i64, TimeUnit) {
    let raw = raw.trim();
    let (digits, unit) = if let Some(stripped) = raw.strip_suffix("ms") {
        (stripped, TimeUnit::Milliseconds)
    } else if let Some(stripped) = raw.strip_suffix('s') {
        (stripped, TimeUnit::Seconds)
    } else if let Some(stripped) = raw.strip_suffix('m') {
        (stripped, TimeUnit::Minutes)
    } else if let Some(stripped) = raw.strip_suffix('h') {
        (stripped, TimeUnit::Hours)
    } else if let Some(stripped) = raw.strip_suffix('d') {
        (stripped, TimeUnit::Days)
    } else {
        (raw, default_unit)
    };
    let number = digits.trim().parse::<i64>().unwrap_or(0);
    (number, unit)
}

/// Cron-backed interval provider.
///
/// When constructed from an `@`-prefixed or space-containing string, the
/// value is parsed as a crontab schedule and `value()` returns the gap to
/// the next occurrence computed from `now + 500ms` (the small look-ahead
/// keeps a task scheduled exactly on a cron boundary from firing twice).
/// Otherwise this degrades to a plain [`TimeSpanWrapper`].
pub enum CronTimeSpanWrapper {
    /// A parsed crontab schedule.
    Cron(Box<Cron>),
    /// Degraded plain wrapper, used when `raw` isn't a cron expression.
    Plain(TimeSpanWrapper),
}

impl CronTimeSpanWrapper {
    /// Parses `raw`, treating it as a cron expression when it starts with
    /// `@` or contains whitespace; otherwise behaves like
    /// [`TimeSpanWrapper::parse`].
    pub fn parse(raw: &str, default_unit: TimeUnit, allow_zero: bool) -> Self {
        let trimmed = raw.trim();
        let looks_like_cron = trimmed.starts_with('@') || trimmed.contains(' ');
        if looks_like_cron {
            if let Ok(cron) = trimmed.parse::<Cron>() {
                return CronTimeSpanWrapper::Cron(Box::new(cron));
            }
        }
        CronTimeSpanWrapper::Plain(TimeSpanWrapper::parse(raw, default_unit, allow_zero))
    }
}

impl IntervalProvider for CronTimeSpanWrapper {
    fn value(&self) -> Duration {
        match self {
            CronTimeSpanWrapper::Plain(p) => p.value(),
            CronTimeSpanWrapper::Cron(cron) => {
                let now = Utc::now();
                let lookahead = now + chrono::Duration::milliseconds(500);
                match cron.find_next_occurrence(&lookahead, false) {
                    Ok(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
                    Err(_) => INFINITE,
                }
            }
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far ahead the collector looks, and how far out a certificate may be
/// before it stops being worth mentioning
pub const LOOKAHEAD_DAYS: i64 = 30;

/// Anything due within this many days is critical
pub const CRITICAL_WITHIN_DAYS: i64 = 7;

/// Anything due within this many days (and not critical) is a warning
pub const WARNING_WITHIN_DAYS: i64 = 14;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// How soon somebody needs to look at a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Due within 7 days (or already overdue)
    Critical,
    /// Due in 8-14 days
    Warning,
    /// Due in more than 14 days
    Info,
}

impl Urgency {
    /// The one threshold table - domains, certificates and servers all share it
    pub fn from_days_until(days_until: i64) -> Self {
        if days_until <= CRITICAL_WITHIN_DAYS {
            Urgency::Critical
        } else if days_until <= WARNING_WITHIN_DAYS {
            Urgency::Warning
        } else {
            Urgency::Info
        }
    }

    /// Sort rank: most pressing first
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::Critical => 0,
            Urgency::Warning => 1,
            Urgency::Info => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::Warning => "warning",
            Urgency::Info => "info",
        }
    }

    pub fn all() -> [Urgency; 3] {
        [Urgency::Critical, Urgency::Warning, Urgency::Info]
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whole days from `now` until `target`, rounding any partial day up
///
/// Ten hours away is 1 day; ten hours ago is 0 days; thirty hours ago is -1.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (target - now).num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Shorthand for `Urgency::from_days_until`
pub fn classify(days_until: i64) -> Urgency {
    Urgency::from_days_until(days_until)
}

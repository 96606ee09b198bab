//! Quota configuration and usage arithmetic.

use crate::error::QuotaConfigError;
use chrono::{DateTime, Duration, Utc};
use readmodel_events::quota::QuotaUnit;
use std::collections::HashSet;

/// A usage notification configured on a quota.
///
/// # Example
///
/// ```
/// use readmodel_quota::Notification;
///
/// let warn = Notification::new("warn-80", 80, "https://hooks.example/quota").repeating();
/// assert!(warn.repeat);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Id, unique within the quota.
    pub id: String,
    /// Threshold in percent of the amount (may exceed 100).
    pub percent: u16,
    /// Fire again at every multiple of `percent`.
    pub repeat: bool,
    /// Endpoint the delivery collaborator calls.
    pub call_url: String,
}

impl Notification {
    /// Non-repeating notification at `percent`.
    #[must_use]
    pub fn new(id: impl Into<String>, percent: u16, call_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            percent,
            repeat: false,
            call_url: call_url.into(),
        }
    }

    /// Make the notification fire at every multiple of its percent.
    #[must_use]
    pub const fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Threshold to fire at for `used_relative` percent, if any.
    ///
    /// Non-repeating notifications fire at their percent. Repeating ones fire
    /// at their percent and again at every further full 100 %, i.e. at the
    /// largest `percent + k * 100` not above usage. Thresholds beyond
    /// `u16::MAX` are capped at the largest such value that fits.
    #[must_use]
    pub fn candidate_threshold(&self, used_relative: u64) -> Option<u16> {
        let percent = u64::from(self.percent);
        if percent == 0 || percent > used_relative {
            return None;
        }
        if !self.repeat {
            return Some(self.percent);
        }

        let max_repeats = (u64::from(u16::MAX) - percent) / 100;
        let repeats = ((used_relative - percent) / 100).min(max_repeats);
        u16::try_from(percent + repeats * 100).ok()
    }
}

/// A usage quota of one instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quota {
    /// Quota (aggregate) id.
    pub id: String,
    /// What the quota counts.
    pub unit: QuotaUnit,
    /// Usage that counts as 100 %.
    pub amount: u64,
    /// Start of the first period.
    pub from: DateTime<Utc>,
    /// Length of each period.
    pub reset_interval: Duration,
    /// Whether usage beyond the amount is blocked.
    pub limit: bool,
    /// Configured notifications.
    pub notifications: Vec<Notification>,
}

impl Quota {
    /// Quota without limit or notifications.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        unit: QuotaUnit,
        amount: u64,
        from: DateTime<Utc>,
        reset_interval: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            unit,
            amount,
            from,
            reset_interval,
            limit: false,
            notifications: Vec::new(),
        }
    }

    /// Block usage beyond the amount.
    #[must_use]
    pub const fn with_limit(mut self) -> Self {
        self.limit = true;
        self
    }

    /// Add a notification.
    #[must_use]
    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }

    /// Check the configuration can be evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaConfigError`] for a zero amount, a reset interval
    /// below one millisecond, a zero percent or a duplicated notification id.
    pub fn validate(&self) -> Result<(), QuotaConfigError> {
        if self.amount == 0 {
            return Err(QuotaConfigError::ZeroAmount);
        }
        if self.reset_interval.num_milliseconds() <= 0 {
            return Err(QuotaConfigError::NonPositiveResetInterval);
        }

        let mut seen = HashSet::with_capacity(self.notifications.len());
        for notification in &self.notifications {
            if notification.percent == 0 {
                return Err(QuotaConfigError::ZeroPercent {
                    id: notification.id.clone(),
                });
            }
            if !seen.insert(notification.id.as_str()) {
                return Err(QuotaConfigError::DuplicateNotification {
                    id: notification.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Start of the period containing `now`: the latest
    /// `from + k * reset_interval` not after `now`, or `from` before it.
    #[must_use]
    pub fn current_period_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let interval = self.reset_interval.num_milliseconds();
        if now <= self.from || interval <= 0 {
            return self.from;
        }

        let elapsed = (now - self.from).num_milliseconds();
        let periods = elapsed / interval;
        periods
            .checked_mul(interval)
            .map(Duration::milliseconds)
            .and_then(|offset| self.from.checked_add_signed(offset))
            .unwrap_or(self.from)
    }

    /// Usage in whole percent of the amount, rounded down.
    ///
    /// Computed in 128 bits, so no absolute usage overflows.
    #[must_use]
    pub fn used_relative(&self, used_absolute: u64) -> u64 {
        if self.amount == 0 {
            return u64::MAX;
        }
        let relative = u128::from(used_absolute) * 100 / u128::from(self.amount);
        u64::try_from(relative).unwrap_or(u64::MAX)
    }

    /// Whether a limiting quota is used up.
    #[must_use]
    pub const fn is_exhausted(&self, used_absolute: u64) -> bool {
        self.limit && used_absolute >= self.amount
    }
}

//! Screen-time policy.
//!
//! A pure decision over the daily limit, minutes already watched and an
//! optional bedtime window. Times of day are minutes since midnight.

use common::{SafeViewError, SafeViewResult};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A window during which watching is not allowed. May wrap midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bedtime {
    pub start_minute: u16,
    pub end_minute: u16,
}

impl Bedtime {
    pub fn new(start_minute: u16, end_minute: u16) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    pub fn contains(&self, minute_of_day: u16) -> bool {
        if self.start_minute <= self.end_minute {
            (self.start_minute..self.end_minute).contains(&minute_of_day)
        } else {
            minute_of_day >= self.start_minute || minute_of_day < self.end_minute
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenTimePolicy {
    pub daily_limit_minutes: Option<u32>,
    pub bedtime: Option<Bedtime>,
}

/// The verdict for right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenTimeStatus {
    Allowed { remaining_minutes: Option<u32> },
    LimitReached,
    Bedtime,
}

impl ScreenTimeStatus {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ScreenTimeStatus::Allowed { .. })
    }
}

impl ScreenTimePolicy {
    pub fn with_daily_limit(mut self, minutes: u32) -> Self {
        self.daily_limit_minutes = Some(minutes);
        self
    }

    pub fn with_bedtime(mut self, bedtime: Bedtime) -> Self {
        self.bedtime = Some(bedtime);
        self
    }

    pub fn validate(&self) -> SafeViewResult<()> {
        if let Some(bedtime) = self.bedtime {
            if bedtime.start_minute >= MINUTES_PER_DAY || bedtime.end_minute >= MINUTES_PER_DAY {
                return Err(SafeViewError::config("bedtime minutes must be below 1440"));
            }
            if bedtime.start_minute == bedtime.end_minute {
                return Err(SafeViewError::config("bedtime window is empty"));
            }
        }
        Ok(())
    }

    /// Bedtime wins over the limit.
    pub fn evaluate(&self, minutes_used: u32, minute_of_day: u16) -> ScreenTimeStatus {
        if self.bedtime.map_or(false, |b| b.contains(minute_of_day)) {
            return ScreenTimeStatus::Bedtime;
        }
        match self.daily_limit_minutes {
            Some(limit) if minutes_used >= limit => ScreenTimeStatus::LimitReached,
            Some(limit) => ScreenTimeStatus::Allowed {
                remaining_minutes: Some(limit - minutes_used),
            },
            None => ScreenTimeStatus::Allowed {
                remaining_minutes: None,
            },
        }
    }

    /// `evaluate` as an error for callers that refuse to mount.
    pub fn check(&self, minutes_used: u32, minute_of_day: u16) -> SafeViewResult<()> {
        match self.evaluate(minutes_used, minute_of_day) {
            ScreenTimeStatus::Allowed { .. } => Ok(()),
            ScreenTimeStatus::LimitReached => {
                Err(SafeViewError::screen_time("daily limit reached"))
            }
            ScreenTimeStatus::Bedtime => Err(SafeViewError::screen_time("it's bedtime")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u16, minute: u16) -> u16 {
        hour * 60 + minute
    }

    #[test]
    fn test_unlimited() {
        let policy = ScreenTimePolicy::default();
        assert_eq!(
            policy.evaluate(500, at(12, 0)),
            ScreenTimeStatus::Allowed {
                remaining_minutes: None
            }
        );
    }

    #[test]
    fn test_daily_limit() {
        let policy = ScreenTimePolicy::default().with_daily_limit(60);
        assert_eq!(
            policy.evaluate(45, at(12, 0)),
            ScreenTimeStatus::Allowed {
                remaining_minutes: Some(15)
            }
        );
        assert_eq!(policy.evaluate(60, at(12, 0)), ScreenTimeStatus::LimitReached);
        assert!(policy.check(61, at(12, 0)).is_err());
    }

    #[test]
    fn test_bedtime_wraps_midnight() {
        let policy = ScreenTimePolicy::default().with_bedtime(Bedtime::new(at(20, 30), at(7, 0)));
        assert_eq!(policy.evaluate(0, at(21, 0)), ScreenTimeStatus::Bedtime);
        assert_eq!(policy.evaluate(0, at(6, 59)), ScreenTimeStatus::Bedtime);
        assert!(policy.evaluate(0, at(7, 0)).is_allowed());
        assert!(policy.evaluate(0, at(20, 29)).is_allowed());
    }

    #[test]
    fn test_bedtime_beats_remaining_allowance() {
        let policy = ScreenTimePolicy::default()
            .with_daily_limit(120)
            .with_bedtime(Bedtime::new(at(13, 0), at(15, 0)));
        assert_eq!(policy.evaluate(0, at(14, 0)), ScreenTimeStatus::Bedtime);
    }

    #[test]
    fn test_validate() {
        assert!(ScreenTimePolicy::default()
            .with_bedtime(Bedtime::new(1500, 10))
            .validate()
            .is_err());
        assert!(ScreenTimePolicy::default()
            .with_bedtime(Bedtime::new(600, 600))
            .validate()
            .is_err());
    }
}

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::LabelCount;

pub(crate) const TOP_PAGES_LIMIT: u32 = 20;
pub(crate) const AFFILIATE_PAGES_LIMIT: u32 = 10;
pub(crate) const DAILY_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub path: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateClick {
    pub affiliate: String,
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageViewStats {
    pub total: u64,
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
    /// Most viewed paths over the last 30 days.
    pub top_pages: Vec<LabelCount>,
    /// Views per calendar day over the last two weeks, oldest first.
    pub daily: Vec<DailyCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AffiliateStats {
    pub total: u64,
    pub today: u64,
    pub this_week: u64,
    pub by_affiliate: Vec<LabelCount>,
    pub by_page: Vec<LabelCount>,
}

/// Reporting windows anchored at UTC midnight, mirroring SQLite's
/// `date('now', '-N days')`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReportWindows {
    pub today: DateTime<Utc>,
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
    pub daily: DateTime<Utc>,
}

impl ReportWindows {
    pub(crate) fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            today,
            week: today - Duration::days(7),
            month: today - Duration::days(30),
            daily: today - Duration::days(DAILY_WINDOW_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn windows_start_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 15, 42, 0).unwrap();
        let windows = ReportWindows::at(now);
        assert_eq!(windows.today, Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap());
        assert_eq!(windows.week, Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap());
        assert_eq!(windows.month, Utc.with_ymd_and_hms(2024, 4, 20, 0, 0, 0).unwrap());
        assert_eq!(windows.daily, Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap());
    }
}

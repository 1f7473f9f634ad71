use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive date range of a simulation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Splits the window into `k` equal time-length intervals and returns the end of
    /// each interval. The last checkpoint always coincides with the window end.
    pub fn checkpoints(&self, k: usize) -> Vec<NaiveDateTime> {
        if k == 0 {
            return Vec::new();
        }
        let origin = self.start.and_time(chrono::NaiveTime::MIN);
        let total = (self.end - self.start).num_seconds().max(0) as i128;
        (1..=k as i128)
            .map(|i| origin + Duration::seconds((total * i / k as i128) as i64))
            .collect()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_checkpoints_end_on_window_end() {
        let window = DateWindow::new(d(2018, 1, 1), d(2019, 1, 1));
        let checkpoints = window.checkpoints(24);
        assert_eq!(checkpoints.len(), 24);
        assert_eq!(checkpoints[23], d(2019, 1, 1).and_hms_opt(0, 0, 0).unwrap());
        assert!(checkpoints.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_fractional_interval() {
        let window = DateWindow::new(d(2020, 1, 1), d(2020, 1, 4));
        let checkpoints = window.checkpoints(2);
        assert_eq!(checkpoints[0], d(2020, 1, 2).and_hms_opt(12, 0, 0).unwrap());
    }
}

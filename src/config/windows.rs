use super::traits::ConfigSection;
use crate::data::DateWindow;
use crate::error::GpTraderError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Training, testing and validation windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsConfig {
    pub training: DateWindow,
    pub testing: DateWindow,
    pub validation: DateWindow,
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            training: DateWindow::new(ymd(2018, 1, 1), ymd(2019, 1, 1)),
            testing: DateWindow::new(ymd(2019, 1, 1), ymd(2020, 1, 1)),
            validation: DateWindow::new(ymd(2020, 1, 1), ymd(2021, 1, 1)),
        }
    }
}

impl ConfigSection for WindowsConfig {
    fn section_name() -> &'static str {
        "windows"
    }

    fn validate(&self) -> Result<(), GpTraderError> {
        for (name, window) in [
            ("training", &self.training),
            ("testing", &self.testing),
            ("validation", &self.validation),
        ] {
            if window.start >= window.end {
                return Err(GpTraderError::Configuration(format!(
                    "{} window must start before it ends ({} >= {})",
                    name, window.start, window.end
                )));
            }
        }
        Ok(())
    }
}

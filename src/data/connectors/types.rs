use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Columns every price file must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredColumn {
    Date,
    Close,
}

impl RequiredColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Close => "close",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Date, Self::Close]
    }

    /// Common alternative column names
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Self::Date => vec!["date", "Date", "DATE", "datetime", "timestamp"],
            Self::Close => vec!["close", "Close", "CLOSE", "adj_close", "c"],
        }
    }
}

/// Summary of a loaded price file, printed by the `check` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub price_range: (f64, f64), // (min, max)
    pub indicator_columns: Vec<String>,
    pub ignored_columns: Vec<String>,
    pub null_counts: Vec<(String, usize)>,
}

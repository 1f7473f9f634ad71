use super::{
    types::{DatasetMetadata, RequiredColumn},
    validator::DataValidator,
};
use crate::data::price_table::PriceTable;
use crate::error::{GpTraderError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| GpTraderError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load a CSV file and convert it into a validated price table
    pub fn load_price_table<P: AsRef<Path>>(path: P) -> Result<PriceTable> {
        let df = Self::load(&path)?;
        DataValidator::validate_minimum_rows(&df, 2)?;

        // Nulls in indicator warm-up rows are expected; they surface as NaN
        let null_report = DataValidator::check_nulls(&df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected: {:?}", null_report);
        }

        let table = Self::to_price_table(&df)?;
        log::info!(
            "Loaded {} rows with {} indicator columns from {}",
            table.len(),
            table.indicator_keys().len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Convert an in-memory frame into a price table
    pub fn to_price_table(df: &DataFrame) -> Result<PriceTable> {
        let column_map = DataValidator::validate_price_columns(df)?;
        let date_name = &column_map[&RequiredColumn::Date];
        let close_name = &column_map[&RequiredColumn::Close];

        let dates = Self::read_dates(df, date_name)?;
        let closes = DataValidator::float_column(df, close_name)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    GpTraderError::DataLoading(format!("Missing close price at row {}", row))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut table = PriceTable::new(dates, closes)?;
        for (key, name) in DataValidator::indicator_columns(df)? {
            let values = DataValidator::float_column(df, &name)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            table.insert_indicator(key, values)?;
        }
        Ok(table)
    }

    /// Create metadata for a loaded DataFrame
    pub fn create_metadata<P: AsRef<Path>>(path: P, df: &DataFrame) -> Result<DatasetMetadata> {
        let column_map = DataValidator::validate_price_columns(df)?;
        let dates = Self::read_dates(df, &column_map[&RequiredColumn::Date])?;
        let date_range = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => Some((*first, *last)),
            _ => None,
        };

        let close = df
            .column(&column_map[&RequiredColumn::Close])?
            .cast(&DataType::Float64)?;
        let close_f64 = close.f64()?;
        let price_range = (close_f64.min().unwrap_or(0.0), close_f64.max().unwrap_or(0.0));

        let indicator_columns: Vec<String> = DataValidator::indicator_columns(df)?
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        let ignored_columns = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| {
                !column_map.values().any(|v| v == name) && !indicator_columns.contains(name)
            })
            .collect();

        Ok(DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: df.height(),
            date_range,
            price_range,
            indicator_columns,
            ignored_columns,
            null_counts: DataValidator::check_nulls(df)?,
        })
    }

    fn read_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
        let column = df.column(name)?.cast(&DataType::String)?;
        column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, raw)| {
                let raw = raw.ok_or_else(|| {
                    GpTraderError::DataLoading(format!("Missing date at row {}", row))
                })?;
                parse_date(raw).ok_or_else(|| {
                    GpTraderError::DataLoading(format!("Unparseable date '{}' at row {}", raw, row))
                })
            })
            .collect()
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    })
}

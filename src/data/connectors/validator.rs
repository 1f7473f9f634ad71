use super::types::RequiredColumn;
use crate::data::price_table::IndicatorKey;
use crate::error::{GpTraderError, Result};
use polars::prelude::*;
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    /// Validate that the DataFrame has a date column and a numeric close column
    pub fn validate_price_columns(df: &DataFrame) -> Result<HashMap<RequiredColumn, String>> {
        let mut column_map = HashMap::new();

        for required in RequiredColumn::all() {
            match Self::find_column(df, &required) {
                Some(col_name) => {
                    column_map.insert(required, col_name.to_string());
                }
                None => {
                    return Err(GpTraderError::DataLoading(format!(
                        "Missing required column: {} (tried aliases: {:?})",
                        required.as_str(),
                        required.aliases()
                    )));
                }
            }
        }

        if let Some(close_name) = column_map.get(&RequiredColumn::Close) {
            Self::ensure_numeric(df, close_name)?;
        }

        Ok(column_map)
    }

    /// Columns whose names parse as indicator keys, in file order
    pub fn indicator_columns(df: &DataFrame) -> Result<Vec<(IndicatorKey, String)>> {
        let mut found = Vec::new();
        for col_name in df.get_column_names() {
            if let Some(key) = IndicatorKey::parse(col_name.as_str()) {
                Self::ensure_numeric(df, col_name.as_str())?;
                found.push((key, col_name.to_string()));
            }
        }
        Ok(found)
    }

    fn ensure_numeric(df: &DataFrame, name: &str) -> Result<()> {
        let series = df.column(name)?;
        if !matches!(
            series.dtype(),
            DataType::Float64
                | DataType::Float32
                | DataType::Int64
                | DataType::Int32
                | DataType::UInt64
                | DataType::UInt32
        ) {
            return Err(GpTraderError::DataLoading(format!(
                "Column '{}' must be numeric, found {:?}",
                name,
                series.dtype()
            )));
        }
        Ok(())
    }

    fn find_column<'a>(df: &'a DataFrame, required: &RequiredColumn) -> Option<&'a str> {
        let columns = df.get_column_names();
        for alias in required.aliases() {
            if columns.iter().any(|col| col.as_str() == alias) {
                return Some(alias);
            }
        }
        None
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(GpTraderError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Null counts per column, only for columns that have any
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for col_name in df.get_column_names() {
            let series = df.column(col_name.as_str())?;
            let null_count = series.null_count();
            if null_count > 0 {
                null_report.push((col_name.to_string(), null_count));
            }
        }

        Ok(null_report)
    }

    /// Cast helper shared by the connector
    pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }
}

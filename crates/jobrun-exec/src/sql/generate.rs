use jobrun_db::RowCursor;
use jobrun_prometheus::{Labels, MetricSet};
use tracing::debug;

use super::coerce::{CoerceError, to_f64};
use crate::error::GenerationError;

pub const DEFAULT_METRIC_PREFIX: &str = "sql_query_result";
pub const DEFAULT_VALUE_COLUMN: &str = "value";

/// Row counts from one generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub rows: usize,
    pub emitted: usize,
    pub skipped_null: usize,
    pub skipped_invalid: usize,
}

/// Turns result rows into samples.
///
/// The value column supplies the sample; every other non-null column becomes
/// a label, in column order.
#[derive(Debug, Clone)]
pub struct MetricGenerator {
    prefix: String,
    value_column: String,
}

impl MetricGenerator {
    /// Empty arguments fall back to the defaults.
    pub fn new(prefix: impl Into<String>, value_column: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let value_column = value_column.into();
        Self {
            prefix: if prefix.is_empty() {
                DEFAULT_METRIC_PREFIX.to_string()
            } else {
                prefix
            },
            value_column: if value_column.is_empty() {
                DEFAULT_VALUE_COLUMN.to_string()
            } else {
                value_column
            },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    /// Consume `cursor`, writing one sample per usable row into `set`.
    ///
    /// A missing value column fails before anything is written, even when the
    /// result has no rows. Null values and values that do not parse as numbers
    /// skip their row only.
    pub async fn generate(
        &self,
        set: &mut MetricSet,
        cursor: &mut RowCursor<'_>,
    ) -> Result<GenerateStats, GenerationError> {
        let mut stats = GenerateStats::default();
        let Some(columns) = cursor.columns().await? else {
            return Ok(stats);
        };

        let wanted = self.value_column.to_lowercase();
        let value_idx = columns
            .iter()
            .position(|c| c.to_lowercase() == wanted)
            .ok_or_else(|| GenerationError::ValueColumnNotFound(self.value_column.clone()))?;

        while let Some(row) = cursor.next().await? {
            stats.rows += 1;

            let mut labels = Labels::new();
            for (idx, (name, cell)) in row.iter().enumerate() {
                if idx != value_idx && !cell.is_null() {
                    labels.push(name, cell.to_string());
                }
            }

            let Some(cell) = row.get(value_idx) else {
                continue;
            };
            match to_f64(cell) {
                Ok(value) => {
                    set.set(&self.prefix, &labels, value);
                    stats.emitted += 1;
                }
                Err(CoerceError::Null) => stats.skipped_null += 1,
                Err(err) => {
                    debug!(
                        metric = %self.prefix,
                        labels = %labels.render(),
                        error = %err,
                        "skipping row with non-numeric value"
                    );
                    stats.skipped_invalid += 1;
                }
            }
        }

        Ok(stats)
    }
}

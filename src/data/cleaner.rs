//! Data Cleaner Module
//! Normalizes the raw transaction table into typed records: imputes
//! missing values, parses dates, derives revenue/profit/margin columns,
//! and accounts for every row it touches in a `CleaningSummary`.

use crate::data::loader::tx_columns;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Raised per row when an order date cannot be parsed. The row is
/// excluded and counted; the run continues.
#[derive(Error, Debug)]
#[error("unparseable order date: '{0}'")]
pub struct MalformedDateError(pub String);

/// Imputation policy for missing numeric fields. Explicit configuration,
/// applied identically to every affected row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ImputePolicy {
    /// Replace missing numerics with 0.
    #[default]
    Zero,
    /// Replace missing numerics with the column median of present values.
    Median,
}

/// Sales channel of an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Online,
    InStore,
    /// Sentinel for missing or unrecognized channel values.
    Other,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Online => "Online",
            Channel::InStore => "In-Store",
            Channel::Other => "Other",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentinel for missing categorical values.
pub const OTHER: &str = "Other";

/// One cleaned order line with derived monetary columns attached.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub customer_id: String,
    pub store_id: String,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub segment: String,
    pub channel: Channel,
    pub quantity: f64,
    pub unit_price: f64,
    pub unit_cost: f64,
    pub discount: f64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin: f64,
}

/// Counts of rows affected by each cleaning rule. Logged after the
/// cleaning pass and written out as a JSON artifact.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CleaningSummary {
    pub rows_in: usize,
    pub rows_kept: usize,
    /// Rows excluded for a missing or unparseable order date.
    pub malformed_dates: usize,
    /// Rows excluded because the order identifier itself was missing.
    pub unusable_rows: usize,
    pub imputed_quantity: usize,
    pub imputed_price: usize,
    pub imputed_cost: usize,
    pub imputed_discount: usize,
    /// Discount values outside [0, 1] clamped into range.
    pub clamped_discounts: usize,
    pub imputed_category: usize,
    pub imputed_product_name: usize,
    /// Segments filled from the category mapping (no source segment).
    pub derived_segments: usize,
    pub unknown_channels: usize,
    /// Rows where revenue was 0 and margin defaulted to 0.
    pub zero_revenue_margins: usize,
}

impl CleaningSummary {
    pub fn log(&self) {
        if self.malformed_dates > 0 {
            warn!(
                excluded = self.malformed_dates,
                "rows excluded for unparseable order dates"
            );
        }
        if self.unusable_rows > 0 {
            warn!(
                excluded = self.unusable_rows,
                "rows excluded for missing order identifiers"
            );
        }
        tracing::info!(
            rows_in = self.rows_in,
            rows_kept = self.rows_kept,
            imputed_numeric = self.imputed_quantity
                + self.imputed_price
                + self.imputed_cost
                + self.imputed_discount,
            clamped_discounts = self.clamped_discounts,
            derived_segments = self.derived_segments,
            "cleaning pass complete"
        );
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Cleans the raw transaction table into `CleanRecord`s.
pub struct DataCleaner;

impl DataCleaner {
    /// Run the cleaning pass. Pure: the input frame is not modified.
    pub fn clean(
        df: &DataFrame,
        policy: ImputePolicy,
    ) -> Result<(Vec<CleanRecord>, CleaningSummary), CleanerError> {
        let n = df.height();
        let mut summary = CleaningSummary {
            rows_in: n,
            ..Default::default()
        };

        let order_ids = Self::str_values(df, tx_columns::ORDER_ID)?;
        let order_dates = Self::str_values(df, tx_columns::ORDER_DATE)?;
        let customer_ids = Self::str_values(df, tx_columns::CUSTOMER_ID)?;
        let store_ids = Self::str_values(df, tx_columns::STORE_ID)?;
        let product_ids = Self::str_values(df, tx_columns::PRODUCT_ID)?;
        let product_names = Self::str_values(df, tx_columns::PRODUCT_NAME)?;
        let categories = Self::str_values(df, tx_columns::CATEGORY)?;
        let channels = Self::str_values(df, tx_columns::CHANNEL)?;

        // Optional columns: absent entirely in some exports.
        let sub_categories = Self::optional_str_values(df, tx_columns::SUB_CATEGORY, n)?;
        let segments = Self::optional_str_values(df, tx_columns::SEGMENT, n)?;

        let quantities = Self::f64_values(df, tx_columns::QUANTITY)?;
        let prices = Self::f64_values(df, tx_columns::UNIT_PRICE)?;
        let costs = Self::f64_values(df, tx_columns::UNIT_COST)?;
        let discounts = Self::f64_values(df, tx_columns::DISCOUNT)?;

        let quantity_fill = Self::fill_value(&quantities, policy);
        let price_fill = Self::fill_value(&prices, policy);
        let cost_fill = Self::fill_value(&costs, policy);
        let discount_fill = Self::fill_value(&discounts, policy);

        let mut records = Vec::with_capacity(n);

        for i in 0..n {
            let Some(order_id) = order_ids[i].clone() else {
                summary.unusable_rows += 1;
                continue;
            };

            let order_date = match order_dates[i].as_deref() {
                Some(raw) => match Self::parse_date(raw) {
                    Ok(d) => d,
                    Err(_) => {
                        summary.malformed_dates += 1;
                        continue;
                    }
                },
                None => {
                    summary.malformed_dates += 1;
                    continue;
                }
            };

            let quantity =
                Self::impute(&quantities[i], quantity_fill, &mut summary.imputed_quantity);
            let unit_price = Self::impute(&prices[i], price_fill, &mut summary.imputed_price);
            let unit_cost = Self::impute(&costs[i], cost_fill, &mut summary.imputed_cost);
            let raw_discount =
                Self::impute(&discounts[i], discount_fill, &mut summary.imputed_discount);
            let discount = raw_discount.clamp(0.0, 1.0);
            if discount != raw_discount {
                summary.clamped_discounts += 1;
            }

            let category = categories[i].clone().unwrap_or_else(|| {
                summary.imputed_category += 1;
                OTHER.to_string()
            });
            let product_name = product_names[i].clone().unwrap_or_else(|| {
                summary.imputed_product_name += 1;
                OTHER.to_string()
            });
            let segment = match segments[i].clone() {
                Some(s) => s,
                None => {
                    summary.derived_segments += 1;
                    Self::derive_segment(&category).to_string()
                }
            };
            let channel = match channels[i].as_deref() {
                Some(raw) => match Self::parse_channel(raw) {
                    Some(c) => c,
                    None => {
                        summary.unknown_channels += 1;
                        Channel::Other
                    }
                },
                None => {
                    summary.unknown_channels += 1;
                    Channel::Other
                }
            };

            let revenue = unit_price * quantity * (1.0 - discount);
            let cost = unit_cost * quantity;
            let profit = revenue - cost;
            let margin = if revenue == 0.0 {
                summary.zero_revenue_margins += 1;
                0.0
            } else {
                profit / revenue
            };

            records.push(CleanRecord {
                order_id,
                order_date,
                customer_id: customer_ids[i].clone().unwrap_or_default(),
                store_id: store_ids[i].clone().unwrap_or_default(),
                product_id: product_ids[i].clone().unwrap_or_default(),
                product_name,
                category,
                sub_category: sub_categories[i].clone(),
                segment,
                channel,
                quantity,
                unit_price,
                unit_cost,
                discount,
                revenue,
                cost,
                profit,
                margin,
            });
        }

        summary.rows_kept = records.len();
        Ok((records, summary))
    }

    /// Map a category to its market segment. Used when the source has
    /// no segment column of its own.
    pub fn derive_segment(category: &str) -> &'static str {
        if category.starts_with("Food") {
            "Food & Beverages"
        } else if matches!(category, "Home" | "Kitchen" | "Home Appliances") {
            "Home & Living"
        } else if matches!(category, "Health" | "Beauty" | "Grooming") {
            "Health & Beauty"
        } else if category.starts_with("Clothing") {
            "Fashion"
        } else {
            OTHER
        }
    }

    fn parse_date(raw: &str) -> Result<NaiveDate, MalformedDateError> {
        for fmt in DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
                return Ok(d);
            }
        }
        Err(MalformedDateError(raw.to_string()))
    }

    fn parse_channel(raw: &str) -> Option<Channel> {
        match raw.to_ascii_lowercase().as_str() {
            "online" => Some(Channel::Online),
            "in-store" | "in store" | "instore" => Some(Channel::InStore),
            _ => None,
        }
    }

    fn impute(value: &Option<f64>, fill: f64, counter: &mut usize) -> f64 {
        match value {
            Some(v) => *v,
            None => {
                *counter += 1;
                fill
            }
        }
    }

    /// Fill value for a numeric column under the configured policy.
    fn fill_value(values: &[Option<f64>], policy: ImputePolicy) -> f64 {
        match policy {
            ImputePolicy::Zero => 0.0,
            ImputePolicy::Median => Self::median(values),
        }
    }

    fn median(values: &[Option<f64>]) -> f64 {
        let mut present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
        if present.is_empty() {
            return 0.0;
        }
        present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = present.len();
        if n % 2 == 0 {
            (present[n / 2 - 1] + present[n / 2]) / 2.0
        } else {
            present[n / 2]
        }
    }

    /// Extract a string column, trimming and null-ing empty values.
    fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, CleanerError> {
        let col = df.column(name)?.cast(&DataType::String)?;
        let ca = col.str()?;
        Ok((0..ca.len())
            .map(|i| {
                ca.get(i)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .collect())
    }

    fn optional_str_values(
        df: &DataFrame,
        name: &str,
        n: usize,
    ) -> Result<Vec<Option<String>>, CleanerError> {
        if df.get_column_names().iter().any(|c| c.as_str() == name) {
            Self::str_values(df, name)
        } else {
            Ok(vec![None; n])
        }
    }

    /// Extract a numeric column as f64, with NaN treated as missing.
    fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, CleanerError> {
        let col = df.column(name)?.cast(&DataType::Float64)?;
        let ca = col.f64()?;
        Ok((0..ca.len())
            .map(|i| ca.get(i).filter(|v| !v.is_nan()))
            .collect())
    }
}

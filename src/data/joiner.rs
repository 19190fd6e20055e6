//! Joiner Module
//! Attaches store-location metadata to cleaned transactions. A left
//! join: every transaction survives, matched or not.

use crate::data::cleaner::CleanRecord;
use crate::data::loader::store_columns;
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("duplicate store identifiers in location table: {}", keys.join(", "))]
    DuplicateKeyError { keys: Vec<String> },
}

/// Region bucket for transactions whose store id has no location row.
pub const UNKNOWN_REGION: &str = "Unknown";

/// One store-location row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreLocation {
    pub store_id: String,
    pub region: String,
    pub country: Option<String>,
}

/// A cleaned transaction with its region metadata attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub tx: CleanRecord,
    pub region: String,
    pub country: Option<String>,
}

/// Store lookup table keyed by store identifier. Construction fails on
/// duplicate keys so totals can never be inflated by a fan-out join.
#[derive(Debug)]
pub struct StoreDirectory {
    by_id: HashMap<String, StoreLocation>,
}

impl StoreDirectory {
    /// Build the directory from the loaded store-location frame.
    pub fn from_frame(df: &DataFrame) -> Result<Self, JoinError> {
        let ids = Self::str_values(df, store_columns::STORE_ID)?;
        let regions = Self::str_values(df, store_columns::REGION)?;
        let countries = if df
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == store_columns::COUNTRY)
        {
            Self::str_values(df, store_columns::COUNTRY)?
        } else {
            vec![None; df.height()]
        };

        let mut by_id: HashMap<String, StoreLocation> = HashMap::new();
        let mut duplicates: Vec<String> = Vec::new();

        for i in 0..df.height() {
            let Some(store_id) = ids[i].clone() else {
                continue;
            };
            let location = StoreLocation {
                store_id: store_id.clone(),
                region: regions[i].clone().unwrap_or_else(|| UNKNOWN_REGION.to_string()),
                country: countries[i].clone(),
            };
            if by_id.insert(store_id.clone(), location).is_some() {
                duplicates.push(store_id);
            }
        }

        if !duplicates.is_empty() {
            duplicates.sort();
            duplicates.dedup();
            return Err(JoinError::DuplicateKeyError { keys: duplicates });
        }

        Ok(Self { by_id })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, store_id: &str) -> Option<&StoreLocation> {
        self.by_id.get(store_id)
    }

    /// Left-join the cleaned transactions against the directory.
    /// Unmatched rows keep all their figures and land in the
    /// "Unknown" region bucket; the unmatched count is returned.
    pub fn join(&self, records: Vec<CleanRecord>) -> (Vec<EnrichedRecord>, usize) {
        let mut unmatched = 0usize;
        let enriched = records
            .into_iter()
            .map(|tx| match self.by_id.get(&tx.store_id) {
                Some(loc) => EnrichedRecord {
                    tx,
                    region: loc.region.clone(),
                    country: loc.country.clone(),
                },
                None => {
                    unmatched += 1;
                    EnrichedRecord {
                        tx,
                        region: UNKNOWN_REGION.to_string(),
                        country: None,
                    }
                }
            })
            .collect();

        if unmatched > 0 {
            warn!(unmatched, "transactions without a store-location match");
        }
        (enriched, unmatched)
    }

    fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, JoinError> {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cleaner::{DataCleaner, ImputePolicy};
    use crate::data::loader::tx_columns;
    use chrono::NaiveDate;

    fn store_frame(ids: Vec<&str>, regions: Vec<&str>) -> DataFrame {
        DataFrame::new(vec![
            Column::new(store_columns::STORE_ID.into(), ids),
            Column::new(store_columns::REGION.into(), regions),
        ])
        .unwrap()
    }

    fn tx(order_id: &str, store_id: &str, revenue: f64) -> CleanRecord {
        CleanRecord {
            order_id: order_id.to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            customer_id: "C1".to_string(),
            store_id: store_id.to_string(),
            product_id: "P1".to_string(),
            product_name: "Olive Oil".to_string(),
            category: "Food - Pantry".to_string(),
            sub_category: None,
            segment: "Food & Beverages".to_string(),
            channel: crate::data::cleaner::Channel::Online,
            quantity: 1.0,
            unit_price: revenue,
            unit_cost: 0.0,
            discount: 0.0,
            revenue,
            cost: 0.0,
            profit: revenue,
            margin: 1.0,
        }
    }

    #[test]
    fn duplicate_store_ids_fail_with_keys() {
        let df = store_frame(vec!["S1", "S2", "S1"], vec!["North", "South", "East"]);
        let err = StoreDirectory::from_frame(&df).unwrap_err();
        match err {
            JoinError::DuplicateKeyError { keys } => assert_eq!(keys, vec!["S1".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmatched_rows_are_kept_in_unknown_bucket() {
        let dir =
            StoreDirectory::from_frame(&store_frame(vec!["S1"], vec!["North"])).unwrap();
        let records = vec![tx("O1", "S1", 100.0), tx("O2", "S9", 50.0)];
        let total_before: f64 = records.iter().map(|r| r.revenue).sum();

        let (enriched, unmatched) = dir.join(records);

        assert_eq!(unmatched, 1);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].region, "North");
        assert_eq!(enriched[1].region, UNKNOWN_REGION);
        let total_after: f64 = enriched.iter().map(|r| r.tx.revenue).sum();
        assert_eq!(total_before, total_after);
    }

    #[test]
    fn join_attaches_country_when_present() {
        let df = DataFrame::new(vec![
            Column::new(store_columns::STORE_ID.into(), vec!["S1"]),
            Column::new(store_columns::REGION.into(), vec!["North"]),
            Column::new(store_columns::COUNTRY.into(), vec!["United Kingdom"]),
        ])
        .unwrap();
        let dir = StoreDirectory::from_frame(&df).unwrap();
        let (enriched, _) = dir.join(vec![tx("O1", "S1", 10.0)]);
        assert_eq!(enriched[0].country.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn cleaner_output_joins_end_to_end() {
        let df = DataFrame::new(vec![
            Column::new(tx_columns::ORDER_ID.into(), vec!["O1"]),
            Column::new(tx_columns::ORDER_DATE.into(), vec!["2024-01-05"]),
            Column::new(tx_columns::CUSTOMER_ID.into(), vec!["C1"]),
            Column::new(tx_columns::STORE_ID.into(), vec!["S1"]),
            Column::new(tx_columns::PRODUCT_ID.into(), vec!["P1"]),
            Column::new(tx_columns::PRODUCT_NAME.into(), vec!["Olive Oil"]),
            Column::new(tx_columns::CATEGORY.into(), vec!["Food - Pantry"]),
            Column::new(tx_columns::CHANNEL.into(), vec!["Online"]),
            Column::new(tx_columns::QUANTITY.into(), vec![2.0]),
            Column::new(tx_columns::UNIT_PRICE.into(), vec![10.0]),
            Column::new(tx_columns::UNIT_COST.into(), vec![6.0]),
            Column::new(tx_columns::DISCOUNT.into(), vec![0.0]),
        ])
        .unwrap();
        let (records, _) = DataCleaner::clean(&df, ImputePolicy::Zero).unwrap();
        let dir =
            StoreDirectory::from_frame(&store_frame(vec!["S1"], vec!["North"])).unwrap();
        let (enriched, unmatched) = dir.join(records);
        assert_eq!(unmatched, 0);
        assert_eq!(enriched[0].region, "North");
        assert_eq!(enriched[0].tx.revenue, 20.0);
    }
}

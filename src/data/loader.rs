//! CSV Record Loader Module
//! Loads the transaction and store-location sources with Polars and
//! validates their schemas before any business logic runs.

use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("{source_name}: required column '{column}' is missing")]
    SchemaError {
        source_name: &'static str,
        column: &'static str,
    },
}

/// Column names of the transaction source.
pub mod tx_columns {
    pub const ORDER_ID: &str = "Order ID";
    pub const ORDER_DATE: &str = "Order Date";
    pub const CUSTOMER_ID: &str = "Customer ID";
    pub const STORE_ID: &str = "Store ID";
    pub const PRODUCT_ID: &str = "Product ID";
    pub const PRODUCT_NAME: &str = "Product Name";
    pub const CATEGORY: &str = "Category";
    pub const SUB_CATEGORY: &str = "Sub-Category";
    pub const SEGMENT: &str = "Segment";
    pub const CHANNEL: &str = "Channel";
    pub const QUANTITY: &str = "Quantity";
    pub const UNIT_PRICE: &str = "Unit Price";
    pub const UNIT_COST: &str = "Unit Cost";
    pub const DISCOUNT: &str = "Discount";

    /// Columns that must be present; `Segment` and `Sub-Category` are
    /// optional and imputed/derived by the cleaner when absent.
    pub const REQUIRED: &[&str] = &[
        ORDER_ID,
        ORDER_DATE,
        CUSTOMER_ID,
        STORE_ID,
        PRODUCT_ID,
        PRODUCT_NAME,
        CATEGORY,
        CHANNEL,
        QUANTITY,
        UNIT_PRICE,
        UNIT_COST,
        DISCOUNT,
    ];
}

/// Column names of the store-location source.
pub mod store_columns {
    pub const STORE_ID: &str = "Store ID";
    pub const REGION: &str = "Region";
    pub const COUNTRY: &str = "Country";

    pub const REQUIRED: &[&str] = &[STORE_ID, REGION];
}

/// Loads the two CSV sources into DataFrames. Purely structural:
/// no imputation, no derived columns, no row filtering.
pub struct RecordLoader;

impl RecordLoader {
    /// Load the transaction source and validate its schema.
    pub fn load_transactions(path: &Path) -> Result<DataFrame, LoaderError> {
        let df = Self::read_csv(path)?;
        Self::check_schema(&df, "transactions", tx_columns::REQUIRED)?;
        Ok(df)
    }

    /// Load the store-location source and validate its schema.
    pub fn load_stores(path: &Path) -> Result<DataFrame, LoaderError> {
        let df = Self::read_csv(path)?;
        Self::check_schema(&df, "store locations", store_columns::REQUIRED)?;
        Ok(df)
    }

    fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        // Lazy scan, then collect; dates stay as strings so the cleaner
        // can count unparseable values instead of losing them to nulls.
        let df = LazyCsvReader::new(path.to_string_lossy().as_ref())
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    fn check_schema(
        df: &DataFrame,
        source_name: &'static str,
        required: &[&'static str],
    ) -> Result<(), LoaderError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for &column in required {
            if !names.iter().any(|n| n == column) {
                return Err(LoaderError::SchemaError {
                    source_name,
                    column,
                });
            }
        }
        Ok(())
    }
}

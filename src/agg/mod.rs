//! Aggregation module - grouped summary statistics

mod aggregator;

pub use aggregator::{AggregateRow, Aggregator, DatasetOverview, Dimension, YearMonth};

//! Retail sales analysis pipeline: load two CSV sources, clean and
//! enrich the transactions, aggregate by report dimensions, and render
//! charts plus a narrative markdown report.
//!
//! The pipeline is strictly linear and deterministic:
//! loader → cleaner → joiner → aggregator → reporter.

pub mod agg;
pub mod data;
pub mod report;

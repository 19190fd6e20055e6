//! Aggregator Module
//! Groups enriched transactions by report dimensions and computes the
//! summary statistics quoted in the report. Pure and stateless: the
//! same input always produces the same ordered output.

use crate::data::{EnrichedRecord, OTHER};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// A report dimension a grouping can key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Region,
    Segment,
    Category,
    SubCategory,
    Product,
    Channel,
    Month,
}

impl Dimension {
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Region => "Region",
            Dimension::Segment => "Segment",
            Dimension::Category => "Category",
            Dimension::SubCategory => "Sub-Category",
            Dimension::Product => "Product",
            Dimension::Channel => "Channel",
            Dimension::Month => "Month",
        }
    }

    /// The dimension value of one record.
    fn value(&self, row: &EnrichedRecord) -> String {
        match self {
            Dimension::Region => row.region.clone(),
            Dimension::Segment => row.tx.segment.clone(),
            Dimension::Category => row.tx.category.clone(),
            Dimension::SubCategory => {
                row.tx.sub_category.clone().unwrap_or_else(|| OTHER.to_string())
            }
            Dimension::Product => row.tx.product_name.clone(),
            Dimension::Channel => row.tx.channel.to_string(),
            Dimension::Month => YearMonth::from_date(row.tx.order_date).to_string(),
        }
    }
}

/// A calendar year-month bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Summary statistics for one dimension-value combination.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// One value per grouping dimension, in grouping order.
    pub key: Vec<String>,
    pub total_revenue: f64,
    pub total_orders: usize,
    pub avg_order_value: f64,
    pub margin: f64,
    /// This group's revenue as a fraction of the grand total, in [0, 1].
    pub share: f64,
}

impl AggregateRow {
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

#[derive(Default)]
struct Accumulator {
    revenue: f64,
    profit: f64,
    orders: BTreeSet<String>,
}

/// Headline figures over the whole enriched table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOverview {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub line_count: usize,
    pub order_count: usize,
    pub customer_count: usize,
    pub product_count: usize,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub overall_margin: f64,
    pub avg_order_value: f64,
}

/// Computes ordered aggregate summaries over enriched transactions.
pub struct Aggregator;

impl Aggregator {
    /// Group by the given dimensions and summarize each combination
    /// present in the data. Rows are ordered by total revenue
    /// descending, ties broken by key lexical order.
    pub fn aggregate(rows: &[EnrichedRecord], dims: &[Dimension]) -> Vec<AggregateRow> {
        let grand_total = Self::grand_total_revenue(rows);
        let mut result = Self::accumulate(rows, dims, grand_total);
        result.sort_by(|a, b| {
            b.total_revenue
                .partial_cmp(&a.total_revenue)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        result
    }

    /// Group by the given dimensions, ordered ascending by revenue.
    /// Used for underperformer rankings.
    pub fn aggregate_ascending(rows: &[EnrichedRecord], dims: &[Dimension]) -> Vec<AggregateRow> {
        let grand_total = Self::grand_total_revenue(rows);
        let mut result = Self::accumulate(rows, dims, grand_total);
        result.sort_by(|a, b| {
            a.total_revenue
                .partial_cmp(&b.total_revenue)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        result
    }

    /// Group by the given dimensions, ordered by margin descending.
    pub fn aggregate_by_margin(rows: &[EnrichedRecord], dims: &[Dimension]) -> Vec<AggregateRow> {
        let grand_total = Self::grand_total_revenue(rows);
        let mut result = Self::accumulate(rows, dims, grand_total);
        result.sort_by(|a, b| {
            b.margin
                .partial_cmp(&a.margin)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        result
    }

    /// Bucket by calendar year-month, in chronological order. With
    /// `zero_fill`, every month between the first and last active month
    /// gets a row even when it has no transactions.
    pub fn monthly_trend(rows: &[EnrichedRecord], zero_fill: bool) -> Vec<AggregateRow> {
        let grand_total = Self::grand_total_revenue(rows);
        let mut groups: BTreeMap<YearMonth, Accumulator> = BTreeMap::new();

        for row in rows {
            let month = YearMonth::from_date(row.tx.order_date);
            let acc = groups.entry(month).or_default();
            acc.revenue += row.tx.revenue;
            acc.profit += row.tx.profit;
            acc.orders.insert(row.tx.order_id.clone());
        }

        if zero_fill {
            if let (Some(&first), Some(&last)) =
                (groups.keys().next(), groups.keys().next_back())
            {
                let mut month = first;
                while month <= last {
                    groups.entry(month).or_default();
                    month = month.succ();
                }
            }
        }

        groups
            .into_iter()
            .map(|(month, acc)| Self::finish(vec![month.to_string()], acc, grand_total))
            .collect()
    }

    /// Headline figures; `None` when the table is empty.
    pub fn overview(rows: &[EnrichedRecord]) -> Option<DatasetOverview> {
        let first_date = rows.iter().map(|r| r.tx.order_date).min()?;
        let last_date = rows.iter().map(|r| r.tx.order_date).max()?;

        let mut orders: BTreeSet<&str> = BTreeSet::new();
        let mut customers: BTreeSet<&str> = BTreeSet::new();
        let mut products: BTreeSet<&str> = BTreeSet::new();
        let mut total_revenue = 0.0;
        let mut total_profit = 0.0;

        for row in rows {
            orders.insert(&row.tx.order_id);
            customers.insert(&row.tx.customer_id);
            products.insert(&row.tx.product_id);
            total_revenue += row.tx.revenue;
            total_profit += row.tx.profit;
        }

        let order_count = orders.len();
        Some(DatasetOverview {
            first_date,
            last_date,
            line_count: rows.len(),
            order_count,
            customer_count: customers.len(),
            product_count: products.len(),
            total_revenue,
            total_profit,
            overall_margin: Self::ratio(total_profit, total_revenue),
            avg_order_value: Self::ratio(total_revenue, order_count as f64),
        })
    }

    fn accumulate(
        rows: &[EnrichedRecord],
        dims: &[Dimension],
        grand_total: f64,
    ) -> Vec<AggregateRow> {
        let mut groups: BTreeMap<Vec<String>, Accumulator> = BTreeMap::new();

        for row in rows {
            let key: Vec<String> = dims.iter().map(|d| d.value(row)).collect();
            let acc = groups.entry(key).or_default();
            acc.revenue += row.tx.revenue;
            acc.profit += row.tx.profit;
            acc.orders.insert(row.tx.order_id.clone());
        }

        groups
            .into_iter()
            .map(|(key, acc)| Self::finish(key, acc, grand_total))
            .collect()
    }

    fn finish(key: Vec<String>, acc: Accumulator, grand_total: f64) -> AggregateRow {
        let total_orders = acc.orders.len();
        AggregateRow {
            key,
            total_revenue: acc.revenue,
            total_orders,
            avg_order_value: Self::ratio(acc.revenue, total_orders as f64),
            margin: Self::ratio(acc.profit, acc.revenue),
            share: Self::ratio(acc.revenue, grand_total),
        }
    }

    fn grand_total_revenue(rows: &[EnrichedRecord]) -> f64 {
        rows.iter().map(|r| r.tx.revenue).sum()
    }

    /// Ratio with the division-by-zero policy: 0 when the denominator
    /// is 0.
    fn ratio(numerator: f64, denominator: f64) -> f64 {
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Channel, CleanRecord, EnrichedRecord};
    use chrono::NaiveDate;

    fn record(order_id: &str, region: &str, date: (i32, u32, u32), revenue: f64) -> EnrichedRecord {
        record_full(order_id, region, date, revenue, revenue * 0.4)
    }

    fn record_full(
        order_id: &str,
        region: &str,
        date: (i32, u32, u32),
        revenue: f64,
        profit: f64,
    ) -> EnrichedRecord {
        EnrichedRecord {
            tx: CleanRecord {
                order_id: order_id.to_string(),
                order_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                customer_id: format!("C-{order_id}"),
                store_id: "S1".to_string(),
                product_id: format!("P-{order_id}"),
                product_name: format!("Product {order_id}"),
                category: "Home".to_string(),
                sub_category: None,
                segment: "Home & Living".to_string(),
                channel: Channel::Online,
                quantity: 1.0,
                unit_price: revenue,
                unit_cost: revenue - profit,
                discount: 0.0,
                revenue,
                cost: revenue - profit,
                profit,
                margin: if revenue == 0.0 { 0.0 } else { profit / revenue },
            },
            region: region.to_string(),
            country: None,
        }
    }

    #[test]
    fn region_grouping_orders_by_revenue_and_share() {
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 100.0),
            record("O2", "A", (2024, 1, 2), 200.0),
            record("O3", "A", (2024, 1, 3), 300.0),
            record("O4", "B", (2024, 1, 4), 400.0),
        ];
        let agg = Aggregator::aggregate(&rows, &[Dimension::Region]);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].key, vec!["B".to_string()]);
        assert_eq!(agg[0].total_revenue, 400.0);
        assert!((agg[0].share - 0.4).abs() < 1e-12);
        assert_eq!(agg[1].key, vec!["A".to_string()]);
        assert_eq!(agg[1].total_revenue, 600.0);
        assert!((agg[1].share - 0.6).abs() < 1e-12);
    }

    #[test]
    fn partition_is_consistent_with_grand_total() {
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 10.0),
            record("O2", "B", (2024, 2, 1), 20.5),
            record("O3", "C", (2024, 3, 1), 30.25),
            record("O4", "B", (2024, 4, 1), 40.0),
        ];
        let grand_total: f64 = rows.iter().map(|r| r.tx.revenue).sum();
        let agg = Aggregator::aggregate(&rows, &[Dimension::Region]);
        let partition_total: f64 = agg.iter().map(|r| r.total_revenue).sum();
        assert!((partition_total - grand_total).abs() < 1e-9);

        let share_total: f64 = agg.iter().map(|r| r.share).sum();
        assert!((share_total - 1.0).abs() < 1e-9);
        assert!(agg.iter().all(|r| (0.0..=1.0).contains(&r.share)));
    }

    #[test]
    fn revenue_ties_break_lexically() {
        let rows = vec![
            record("O1", "Zeta", (2024, 1, 1), 100.0),
            record("O2", "Alpha", (2024, 1, 2), 100.0),
        ];
        let agg = Aggregator::aggregate(&rows, &[Dimension::Region]);
        assert_eq!(agg[0].key, vec!["Alpha".to_string()]);
        assert_eq!(agg[1].key, vec!["Zeta".to_string()]);
    }

    #[test]
    fn distinct_orders_counted_once_across_lines() {
        // Two lines of the same order.
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 60.0),
            record("O1", "A", (2024, 1, 1), 40.0),
        ];
        let agg = Aggregator::aggregate(&rows, &[Dimension::Region]);
        assert_eq!(agg[0].total_orders, 1);
        assert_eq!(agg[0].avg_order_value, 100.0);
    }

    #[test]
    fn margin_zero_when_revenue_zero_and_negative_allowed() {
        let rows = vec![
            record_full("O1", "A", (2024, 1, 1), 0.0, -5.0),
            record_full("O2", "B", (2024, 1, 2), 100.0, -20.0),
        ];
        let agg = Aggregator::aggregate(&rows, &[Dimension::Region]);
        let a = agg.iter().find(|r| r.key[0] == "A").unwrap();
        let b = agg.iter().find(|r| r.key[0] == "B").unwrap();
        assert_eq!(a.margin, 0.0);
        assert!((b.margin - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn multi_dimension_keys_combine() {
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 100.0),
            record("O2", "A", (2024, 2, 1), 50.0),
        ];
        let agg = Aggregator::aggregate(&rows, &[Dimension::Region, Dimension::Month]);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].key, vec!["A".to_string(), "2024-01".to_string()]);
        assert_eq!(agg[0].label(), "A / 2024-01");
    }

    #[test]
    fn monthly_trend_zero_fills_gap_months() {
        // Jan 2023 through Mar 2025 with activity only at the ends.
        let rows = vec![
            record("O1", "A", (2023, 1, 15), 100.0),
            record("O2", "A", (2025, 3, 2), 50.0),
        ];
        let trend = Aggregator::monthly_trend(&rows, true);
        assert_eq!(trend.len(), 27);
        assert_eq!(trend[0].key, vec!["2023-01".to_string()]);
        assert_eq!(trend[26].key, vec!["2025-03".to_string()]);
        // Chronological, and gap months are explicit zero rows.
        assert!(trend.windows(2).all(|w| w[0].key < w[1].key));
        assert_eq!(trend[1].total_revenue, 0.0);
        assert_eq!(trend[1].total_orders, 0);
        assert_eq!(trend[1].margin, 0.0);
    }

    #[test]
    fn monthly_trend_without_zero_fill_skips_gaps() {
        let rows = vec![
            record("O1", "A", (2023, 1, 15), 100.0),
            record("O2", "A", (2023, 4, 2), 50.0),
        ];
        let trend = Aggregator::monthly_trend(&rows, false);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].key, vec!["2023-01".to_string()]);
        assert_eq!(trend[1].key, vec!["2023-04".to_string()]);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 10.0),
            record("O2", "B", (2024, 2, 1), 20.0),
            record("O3", "C", (2024, 3, 1), 20.0),
        ];
        let first = Aggregator::aggregate(&rows, &[Dimension::Region]);
        let second = Aggregator::aggregate(&rows, &[Dimension::Region]);
        assert_eq!(first, second);
    }

    #[test]
    fn overview_counts_distinct_entities() {
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 100.0),
            record("O1", "A", (2024, 1, 1), 50.0),
            record("O2", "B", (2024, 3, 5), 50.0),
        ];
        let ov = Aggregator::overview(&rows).unwrap();
        assert_eq!(ov.line_count, 3);
        assert_eq!(ov.order_count, 2);
        assert_eq!(ov.first_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ov.last_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(ov.total_revenue, 200.0);
        assert_eq!(ov.avg_order_value, 100.0);
    }

    #[test]
    fn overview_of_empty_table_is_none() {
        assert!(Aggregator::overview(&[]).is_none());
    }

    #[test]
    fn ascending_ranking_for_underperformers() {
        let rows = vec![
            record("O1", "A", (2024, 1, 1), 300.0),
            record("O2", "B", (2024, 1, 1), 100.0),
            record("O3", "C", (2024, 1, 1), 200.0),
        ];
        let agg = Aggregator::aggregate_ascending(&rows, &[Dimension::Region]);
        assert_eq!(agg[0].key, vec!["B".to_string()]);
        assert_eq!(agg[2].key, vec!["A".to_string()]);
    }

    #[test]
    fn margin_ranking_orders_by_margin() {
        let rows = vec![
            record_full("O1", "A", (2024, 1, 1), 100.0, 10.0),
            record_full("O2", "B", (2024, 1, 1), 100.0, 60.0),
        ];
        let agg = Aggregator::aggregate_by_margin(&rows, &[Dimension::Region]);
        assert_eq!(agg[0].key, vec!["B".to_string()]);
        assert!((agg[0].margin - 0.6).abs() < 1e-12);
    }
}

//! Narrative Report Module
//! Renders the aggregate tables into the markdown report, embedding the
//! literal figures quoted in the executive summary.

use crate::agg::{AggregateRow, DatasetOverview};
use crate::data::CleaningSummary;
use std::fmt::Write;

/// Everything the markdown report is built from.
pub struct NarrativeReport<'a> {
    pub overview: &'a DatasetOverview,
    pub regions: &'a [AggregateRow],
    pub segments: &'a [AggregateRow],
    pub top_products: &'a [AggregateRow],
    pub bottom_products: &'a [AggregateRow],
    pub category_margins: &'a [AggregateRow],
    pub channels: &'a [AggregateRow],
    pub monthly: &'a [AggregateRow],
    pub quality: &'a CleaningSummary,
    pub unmatched_stores: usize,
}

impl NarrativeReport<'_> {
    /// Render the full markdown document.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_header(&mut out);
        self.write_overview(&mut out);
        self.write_grouping(&mut out, "Regional Performance", "Region", self.regions);
        self.write_grouping(&mut out, "Segment Performance", "Segment", self.segments);
        self.write_products(&mut out);
        self.write_category_margins(&mut out);
        self.write_channels(&mut out);
        self.write_monthly(&mut out);
        self.write_quality(&mut out);
        out
    }

    fn write_header(&self, out: &mut String) {
        let _ = writeln!(out, "# Retail Sales Analysis Report\n");
        let _ = writeln!(
            out,
            "Covering orders from {} to {}.\n",
            self.overview.first_date.format("%B %Y"),
            self.overview.last_date.format("%B %Y"),
        );
    }

    fn write_overview(&self, out: &mut String) {
        let ov = self.overview;
        let _ = writeln!(out, "## Executive Summary\n");
        let _ = writeln!(out, "- **Total Revenue**: {}", money(ov.total_revenue));
        let _ = writeln!(out, "- **Total Profit**: {}", money(ov.total_profit));
        let _ = writeln!(out, "- **Overall Margin**: {}", pct(ov.overall_margin));
        let _ = writeln!(out, "- **Orders**: {}", group_int(ov.order_count));
        let _ = writeln!(out, "- **Order Lines**: {}", group_int(ov.line_count));
        let _ = writeln!(
            out,
            "- **Average Order Value**: {}",
            money(ov.avg_order_value)
        );
        let _ = writeln!(out, "- **Unique Customers**: {}", group_int(ov.customer_count));
        let _ = writeln!(out, "- **Product Portfolio**: {} products", group_int(ov.product_count));
        let _ = writeln!(out);
    }

    fn write_grouping(&self, out: &mut String, title: &str, dim: &str, rows: &[AggregateRow]) {
        let _ = writeln!(out, "## {title}\n");
        table(out, dim, rows);
        if let Some(leader) = rows.first() {
            let _ = writeln!(
                out,
                "**{}** leads with {} in revenue ({} of the total).\n",
                leader.label(),
                money(leader.total_revenue),
                pct(leader.share),
            );
        }
    }

    fn write_products(&self, out: &mut String) {
        let _ = writeln!(out, "## Product Performance\n");
        let _ = writeln!(out, "### Top Products by Revenue\n");
        ranked_list(out, self.top_products);
        let _ = writeln!(out, "### Underperforming Products by Revenue\n");
        ranked_list(out, self.bottom_products);
    }

    fn write_category_margins(&self, out: &mut String) {
        let _ = writeln!(out, "## Category Margins\n");
        table(out, "Category", self.category_margins);
        if let Some(best) = self.category_margins.first() {
            let _ = writeln!(
                out,
                "**{}** is the most profitable category at {} margin.\n",
                best.label(),
                pct(best.margin),
            );
        }
    }

    fn write_channels(&self, out: &mut String) {
        let _ = writeln!(out, "## Channel Performance\n");
        table(out, "Channel", self.channels);
        if let Some(leader) = self.channels.first() {
            let _ = writeln!(
                out,
                "The **{}** channel leads with {} of total revenue.\n",
                leader.label(),
                pct(leader.share),
            );
        }
    }

    fn write_monthly(&self, out: &mut String) {
        let _ = writeln!(out, "## Monthly Revenue Trend\n");
        table(out, "Month", self.monthly);
    }

    fn write_quality(&self, out: &mut String) {
        let q = self.quality;
        let _ = writeln!(out, "## Data Quality\n");
        let _ = writeln!(
            out,
            "{} of {} input rows were kept.\n",
            group_int(q.rows_kept),
            group_int(q.rows_in),
        );
        let _ = writeln!(out, "| Rule | Rows Affected |");
        let _ = writeln!(out, "|---|---:|");
        let _ = writeln!(out, "| Excluded: unparseable order date | {} |", q.malformed_dates);
        let _ = writeln!(out, "| Excluded: missing order id | {} |", q.unusable_rows);
        let _ = writeln!(out, "| Imputed quantity | {} |", q.imputed_quantity);
        let _ = writeln!(out, "| Imputed unit price | {} |", q.imputed_price);
        let _ = writeln!(out, "| Imputed unit cost | {} |", q.imputed_cost);
        let _ = writeln!(out, "| Imputed discount | {} |", q.imputed_discount);
        let _ = writeln!(out, "| Clamped discount | {} |", q.clamped_discounts);
        let _ = writeln!(out, "| Imputed category | {} |", q.imputed_category);
        let _ = writeln!(out, "| Derived segment | {} |", q.derived_segments);
        let _ = writeln!(out, "| Unrecognized channel | {} |", q.unknown_channels);
        let _ = writeln!(out, "| Margin defaulted (zero revenue) | {} |", q.zero_revenue_margins);
        let _ = writeln!(
            out,
            "| No store-location match (kept, region Unknown) | {} |",
            self.unmatched_stores
        );
        let _ = writeln!(out);
    }
}

fn table(out: &mut String, dim: &str, rows: &[AggregateRow]) {
    let _ = writeln!(
        out,
        "| {dim} | Total Revenue | Orders | Avg Order Value | Margin | Share |"
    );
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|");
    for row in rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            row.label(),
            money(row.total_revenue),
            group_int(row.total_orders),
            money(row.avg_order_value),
            pct(row.margin),
            pct(row.share),
        );
    }
    let _ = writeln!(out);
}

fn ranked_list(out: &mut String, rows: &[AggregateRow]) {
    for (i, row) in rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. **{}**: {} ({} margin)",
            i + 1,
            row.label(),
            money(row.total_revenue),
            pct(row.margin),
        );
    }
    let _ = writeln!(out);
}

/// "$1,234,567.89" with a leading minus for losses.
pub fn money(v: f64) -> String {
    let formatted = format!("{:.2}", v.abs());
    let (int, frac) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let mut grouped = String::new();
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

/// Fraction rendered as a percentage with one decimal place.
pub fn pct(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

fn group_int(v: usize) -> String {
    let s = v.to_string();
    let mut grouped = String::new();
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_groups_thousands() {
        assert_eq!(money(2126853.54), "$2,126,853.54");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(-1200.5), "-$1,200.50");
    }

    #[test]
    fn pct_renders_one_decimal() {
        assert_eq!(pct(0.4), "40.0%");
        assert_eq!(pct(0.1667), "16.7%");
    }

    #[test]
    fn report_embeds_headline_figures() {
        use chrono::NaiveDate;

        let overview = DatasetOverview {
            first_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            last_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            line_count: 4,
            order_count: 4,
            customer_count: 4,
            product_count: 4,
            total_revenue: 1000.0,
            total_profit: 400.0,
            overall_margin: 0.4,
            avg_order_value: 250.0,
        };
        let regions = vec![
            AggregateRow {
                key: vec!["B".to_string()],
                total_revenue: 400.0,
                total_orders: 1,
                avg_order_value: 400.0,
                margin: 0.4,
                share: 0.4,
            },
            AggregateRow {
                key: vec!["A".to_string()],
                total_revenue: 600.0,
                total_orders: 3,
                avg_order_value: 200.0,
                margin: 0.4,
                share: 0.6,
            },
        ];
        let quality = CleaningSummary {
            rows_in: 5,
            rows_kept: 4,
            malformed_dates: 1,
            ..Default::default()
        };
        let report = NarrativeReport {
            overview: &overview,
            regions: &regions,
            segments: &[],
            top_products: &[],
            bottom_products: &[],
            category_margins: &[],
            channels: &[],
            monthly: &[],
            quality: &quality,
            unmatched_stores: 1,
        };

        let md = report.render();
        assert!(md.contains("$1,000.00"));
        assert!(md.contains("| B | $400.00 | 1 | $400.00 | 40.0% | 40.0% |"));
        assert!(md.contains("Excluded: unparseable order date | 1"));
        assert!(md.contains("region Unknown) | 1"));
    }
}

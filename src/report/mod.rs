//! Report module - chart images, markdown narrative and quality artifact

mod charts;
mod narrative;

pub use charts::{ChartError, ChartRenderer, PALETTE};
pub use narrative::{money, pct, NarrativeReport};

use crate::data::CleaningSummary;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("Failed to serialize quality summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// The data-quality artifact written beside the report.
#[derive(Debug, Serialize)]
pub struct QualityArtifact<'a> {
    pub cleaning: &'a CleaningSummary,
    pub unmatched_store_ids: usize,
}

/// Writes all report artifacts into one output directory:
/// `report.md`, `data_quality.json` and the chart PNGs.
pub struct Reporter {
    out_dir: PathBuf,
}

impl Reporter {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
        }
    }

    pub fn write(&self, report: &NarrativeReport<'_>) -> Result<(), ReportError> {
        let charts_dir = self.out_dir.join("charts");
        fs::create_dir_all(&charts_dir)?;

        let report_path = self.out_dir.join("report.md");
        fs::write(&report_path, report.render())?;
        info!(path = %report_path.display(), "wrote narrative report");

        let quality = QualityArtifact {
            cleaning: report.quality,
            unmatched_store_ids: report.unmatched_stores,
        };
        let quality_path = self.out_dir.join("data_quality.json");
        fs::write(&quality_path, serde_json::to_string_pretty(&quality)?)?;
        info!(path = %quality_path.display(), "wrote data-quality summary");

        ChartRenderer::bar_chart(
            &charts_dir.join("revenue_by_region.png"),
            "Total Revenue by Region",
            report.regions,
            12,
        )?;
        ChartRenderer::bar_chart(
            &charts_dir.join("revenue_by_segment.png"),
            "Total Revenue by Segment",
            report.segments,
            12,
        )?;
        ChartRenderer::pie_chart(
            &charts_dir.join("channel_share.png"),
            "Revenue Share by Channel",
            report.channels,
        )?;
        ChartRenderer::line_chart(
            &charts_dir.join("monthly_revenue.png"),
            "Monthly Revenue Trend",
            report.monthly,
        )?;
        info!(dir = %charts_dir.display(), "wrote chart images");

        Ok(())
    }
}

//! Static Chart Renderer
//! Renders the report figures as PNG images with plotters:
//! revenue bars per dimension, channel share pie, monthly revenue line.

use crate::agg::AggregateRow;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to render chart: {0}")]
    Render(String),
}

/// Color palette for chart series.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(255, 87, 34),   // Deep Orange
    RGBColor(96, 125, 139),  // Blue Grey
];

const BAR_SIZE: (u32, u32) = (1000, 620);
const PIE_SIZE: (u32, u32) = (800, 600);

pub struct ChartRenderer;

impl ChartRenderer {
    /// Vertical bar chart of total revenue per group. At most
    /// `max_bars` groups are drawn, in the order given.
    pub fn bar_chart(
        path: &Path,
        title: &str,
        rows: &[AggregateRow],
        max_bars: usize,
    ) -> Result<(), ChartError> {
        let bars = &rows[..rows.len().min(max_bars)];
        if bars.is_empty() {
            return Ok(());
        }

        let labels: Vec<String> = bars.iter().map(|r| r.label()).collect();
        let n = bars.len();
        let y_top = bars
            .iter()
            .map(|r| r.total_revenue)
            .fold(0.0f64, f64::max)
            .max(1.0)
            * 1.1;

        let root = BitMapBackend::new(path, BAR_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(Self::render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(15)
            .x_label_area_size(110)
            .y_label_area_size(100)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..y_top)
            .map_err(Self::render_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc("Total Revenue")
            .x_labels(n)
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    labels.get(*i).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .x_label_style(
                ("sans-serif", 14)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_label_formatter(&|v| format!("{v:.0}"))
            .draw()
            .map_err(Self::render_err)?;

        chart
            .draw_series(bars.iter().enumerate().map(|(i, r)| {
                let color = PALETTE[i % PALETTE.len()];
                Rectangle::new(
                    [
                        (SegmentValue::Exact(i), 0.0),
                        (SegmentValue::Exact(i + 1), r.total_revenue),
                    ],
                    color.mix(0.85).filled(),
                )
            }))
            .map_err(Self::render_err)?;

        root.present().map_err(Self::render_err)
    }

    /// Line chart of total revenue over chronologically ordered
    /// monthly aggregate rows.
    pub fn line_chart(path: &Path, title: &str, rows: &[AggregateRow]) -> Result<(), ChartError> {
        if rows.is_empty() {
            return Ok(());
        }

        let labels: Vec<String> = rows.iter().map(|r| r.label()).collect();
        let n = rows.len();
        let x_max = (n.max(2) - 1) as f64;
        let y_top = rows
            .iter()
            .map(|r| r.total_revenue)
            .fold(0.0f64, f64::max)
            .max(1.0)
            * 1.1;

        let root = BitMapBackend::new(path, BAR_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(Self::render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(15)
            .x_label_area_size(90)
            .y_label_area_size(100)
            .build_cartesian_2d(0f64..x_max, 0f64..y_top)
            .map_err(Self::render_err)?;

        chart
            .configure_mesh()
            .y_desc("Total Revenue")
            .x_labels(n.min(14))
            .x_label_formatter(&|v| {
                let i = v.round();
                if (v - i).abs() < 1e-6 {
                    labels.get(i as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .x_label_style(
                ("sans-serif", 14)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_label_formatter(&|v| format!("{v:.0}"))
            .draw()
            .map_err(Self::render_err)?;

        let color = PALETTE[0];
        chart
            .draw_series(LineSeries::new(
                rows.iter()
                    .enumerate()
                    .map(|(i, r)| (i as f64, r.total_revenue)),
                ShapeStyle::from(&color).stroke_width(2),
            ))
            .map_err(Self::render_err)?;

        chart
            .draw_series(
                rows.iter()
                    .enumerate()
                    .map(|(i, r)| Circle::new((i as f64, r.total_revenue), 3, color.filled())),
            )
            .map_err(Self::render_err)?;

        root.present().map_err(Self::render_err)
    }

    /// Pie chart of revenue share per group.
    pub fn pie_chart(path: &Path, title: &str, rows: &[AggregateRow]) -> Result<(), ChartError> {
        let sizes: Vec<f64> = rows.iter().map(|r| r.total_revenue.max(0.0)).collect();
        if sizes.iter().sum::<f64>() <= 0.0 {
            return Ok(());
        }

        let labels: Vec<String> = rows
            .iter()
            .map(|r| format!("{} ({:.1}%)", r.label(), r.share * 100.0))
            .collect();
        let colors: Vec<RGBColor> = (0..rows.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();

        let root = BitMapBackend::new(path, PIE_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(Self::render_err)?;
        let root = root
            .titled(title, ("sans-serif", 30))
            .map_err(Self::render_err)?;

        let center = (
            (PIE_SIZE.0 / 2) as i32,
            (PIE_SIZE.1 / 2) as i32,
        );
        let radius = (PIE_SIZE.1 as f64) * 0.33;
        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style(("sans-serif", 18).into_font());
        root.draw(&pie).map_err(Self::render_err)?;

        root.present().map_err(Self::render_err)
    }

    fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
        ChartError::Render(e.to_string())
    }
}

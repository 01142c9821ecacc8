//! Static Chart Renderer
//! Draws dashboard sections with plotters.
//!
//! Every call builds its own backend and returns an owned [`Figure`]; no
//! drawing state outlives a call.
//!
//! Layout per section kind:
//! - Bar: categories on the x-axis, counts on the y-axis
//! - HorizontalBar: categories on the y-axis, largest at the top
//! - Line: value per model year
//! - Histogram: range bins with a mean marker
//! - Forecast: fitted history and projected years on one axis

use crate::forecast::ForecastReport;
use crate::stats::{RangeDistribution, SummaryTable};
use crate::views::{ChartKind, Section, SectionContent};
use clap::ValueEnum;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;
use thiserror::Error;

const BAR_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
const FORECAST_COLOR: RGBColor = RGBColor(231, 76, 60); // Red
const MEAN_COLOR: RGBColor = RGBColor(243, 156, 18); // Orange
const GRID_COLOR: RGBColor = RGBColor(200, 200, 200);

const CAPTION_FONT: (&str, f64) = ("sans-serif", 22.0);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Pixel buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Draw(e.to_string())
    }
}

/// Output encoding of a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChartFormat {
    #[default]
    Svg,
    Png,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Svg => "svg",
            ChartFormat::Png => "png",
        }
    }
}

/// A rendered chart owned by the caller.
#[derive(Debug, Clone)]
pub struct Figure {
    pub title: String,
    pub format: ChartFormat,
    pub bytes: Vec<u8>,
}

impl Figure {
    /// File name such as `03-top-10-manufacturers.svg`.
    pub fn file_name(&self, index: usize) -> String {
        let mut slug = String::new();
        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-');
        format!("{:02}-{}.{}", index, slug, self.format.extension())
    }
}

/// Renders sections to SVG or PNG figures.
#[derive(Debug, Clone, Copy)]
pub struct StaticChartRenderer {
    pub width: u32,
    pub height: u32,
    pub format: ChartFormat,
}

impl Default for StaticChartRenderer {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            format: ChartFormat::Svg,
        }
    }
}

impl StaticChartRenderer {
    /// Render a section, or `None` when the section has nothing to draw.
    pub fn render(&self, section: &Section) -> Result<Option<Figure>, RenderError> {
        if !section.is_available() {
            return Ok(None);
        }

        let size = (self.width, self.height);
        let bytes = match self.format {
            ChartFormat::Svg => {
                let mut svg = String::new();
                {
                    let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
                    Self::draw_section(&root, section)?;
                    root.present()?;
                }
                svg.into_bytes()
            }
            ChartFormat::Png => {
                let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
                {
                    let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
                    Self::draw_section(&root, section)?;
                    root.present()?;
                }
                let image = image::RgbImage::from_raw(self.width, self.height, buffer).ok_or(
                    RenderError::Buffer {
                        width: self.width,
                        height: self.height,
                    },
                )?;
                let mut png = Vec::new();
                image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
                png
            }
        };

        Ok(Some(Figure {
            title: section.title.clone(),
            format: self.format,
            bytes,
        }))
    }

    fn draw_section<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        section: &Section,
    ) -> Result<(), RenderError> {
        root.fill(&WHITE)?;
        let title = section.title.as_str();

        match (&section.content, section.chart) {
            (SectionContent::Table { table }, ChartKind::HorizontalBar) => {
                Self::draw_horizontal_bars(root, title, table)
            }
            (SectionContent::Table { table }, ChartKind::Line) => {
                Self::draw_year_line(root, title, table)
            }
            (SectionContent::Table { table }, _) => Self::draw_bars(root, title, table),
            (SectionContent::Distribution { distribution }, _) => {
                Self::draw_histogram(root, title, distribution)
            }
            (SectionContent::Forecast { report }, _) => Self::draw_forecast(root, title, report),
            (SectionContent::Unavailable { .. }, _) => Ok(()),
        }
    }

    fn draw_bars<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        title: &str,
        table: &SummaryTable,
    ) -> Result<(), RenderError> {
        let labels: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        let values: Vec<f64> = table.rows.iter().map(|r| r.value.as_f64()).collect();
        let n = values.len().max(1) as u32;

        let mut chart = ChartBuilder::on(root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..n).into_segmented(), 0f64..axis_max(&values))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(GRID_COLOR)
            .x_labels(labels.len())
            .x_label_formatter(&|x| segment_label(x, &labels, false))
            .x_desc(table.key_labels.join(" / "))
            .y_desc(table.value_label.as_str())
            .draw()?;

        chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                BAR_COLOR.filled(),
            );
            bar.set_margin(0, 0, 4, 4);
            bar
        }))?;

        Ok(())
    }

    fn draw_horizontal_bars<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        title: &str,
        table: &SummaryTable,
    ) -> Result<(), RenderError> {
        let labels: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        let values: Vec<f64> = table.rows.iter().map(|r| r.value.as_f64()).collect();
        let n = values.len().max(1) as u32;
        let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0) as u32 * 8;

        let mut chart = ChartBuilder::on(root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(label_width.clamp(80, 400))
            .build_cartesian_2d(0f64..axis_max(&values), (0u32..n).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .light_line_style(GRID_COLOR)
            .y_labels(labels.len())
            .y_label_formatter(&|y| segment_label(y, &labels, true))
            .x_desc(table.value_label.as_str())
            .draw()?;

        // first row drawn at the top
        let top = values.len() as u32;
        chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
            let slot = top - 1 - i as u32;
            let mut bar = Rectangle::new(
                [(0.0, SegmentValue::Exact(slot)), (v, SegmentValue::Exact(slot + 1))],
                BAR_COLOR.filled(),
            );
            bar.set_margin(3, 3, 0, 0);
            bar
        }))?;

        Ok(())
    }

    fn draw_year_line<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        title: &str,
        table: &SummaryTable,
    ) -> Result<(), RenderError> {
        let points: Vec<(f64, f64)> = table
            .year_points()
            .into_iter()
            .map(|(year, value)| (year as f64, value))
            .collect();
        let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        let (x_min, x_max) = year_span(points.iter().map(|(x, _)| *x));

        let mut chart = ChartBuilder::on(root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, 0f64..axis_max(&values))?;

        chart
            .configure_mesh()
            .light_line_style(GRID_COLOR)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .x_desc(table.key_labels.join(" / "))
            .y_desc(table.value_label.as_str())
            .draw()?;

        chart.draw_series(LineSeries::new(points.iter().copied(), BAR_COLOR.stroke_width(2)))?;
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, BAR_COLOR.filled())),
        )?;

        Ok(())
    }

    fn draw_histogram<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        title: &str,
        distribution: &RangeDistribution,
    ) -> Result<(), RenderError> {
        let counts: Vec<f64> = distribution.bins.iter().map(|b| b.count as f64).collect();
        let y_max = axis_max(&counts);
        let (x_min, x_max) = if distribution.max > distribution.min {
            (distribution.min, distribution.max)
        } else {
            (distribution.min - 1.0, distribution.max + 1.0)
        };

        let mut chart = ChartBuilder::on(root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(GRID_COLOR)
            .x_desc("Electric Range (miles)")
            .y_desc("Number of Vehicles")
            .draw()?;

        chart.draw_series(distribution.bins.iter().map(|bin| {
            let (lower, upper) = if bin.upper > bin.lower {
                (bin.lower, bin.upper)
            } else {
                (bin.lower - 0.5, bin.upper + 0.5)
            };
            Rectangle::new(
                [(lower, 0.0), (upper, bin.count as f64)],
                BAR_COLOR.mix(0.7).filled(),
            )
        }))?;

        let mean = distribution.mean;
        chart
            .draw_series(LineSeries::new(
                [(mean, 0.0), (mean, y_max)],
                MEAN_COLOR.stroke_width(2),
            ))?
            .label(format!("Mean: {:.1} miles", mean))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MEAN_COLOR));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }

    fn draw_forecast<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        title: &str,
        report: &ForecastReport,
    ) -> Result<(), RenderError> {
        let observed: Vec<(f64, f64)> = report
            .observed
            .iter()
            .map(|&(year, count)| (year as f64, count))
            .collect();
        // continue the projected line from the last fitted year
        let projected: Vec<(f64, f64)> = report
            .observed
            .last()
            .map(|&(year, count)| (year as f64, count))
            .into_iter()
            .chain(
                report
                    .projected
                    .iter()
                    .map(|p| (p.year as f64, p.projected_count as f64)),
            )
            .collect();

        let all_values: Vec<f64> = observed
            .iter()
            .chain(projected.iter())
            .map(|(_, v)| *v)
            .collect();
        let (x_min, x_max) = year_span(observed.iter().chain(projected.iter()).map(|(x, _)| *x));

        let mut chart = ChartBuilder::on(root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, 0f64..axis_max(&all_values))?;

        chart
            .configure_mesh()
            .light_line_style(GRID_COLOR)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .x_desc("Year")
            .y_desc("Number of Vehicles")
            .draw()?;

        chart
            .draw_series(LineSeries::new(
                observed.iter().copied(),
                BAR_COLOR.stroke_width(2),
            ))?
            .label("Actual Registrations")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BAR_COLOR));

        chart
            .draw_series(LineSeries::new(
                projected.iter().copied(),
                FORECAST_COLOR.stroke_width(2),
            ))?
            .label("Forecasted Registrations")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], FORECAST_COLOR));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }
}

/// Upper bound of a value axis with some headroom.
fn axis_max(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Padded year range, never empty.
fn year_span(years: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = years.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });
    if min.is_finite() {
        (min - 0.5, max + 0.5)
    } else {
        (0.0, 1.0)
    }
}

fn segment_label(value: &SegmentValue<u32>, labels: &[String], reversed: bool) -> String {
    let SegmentValue::CenterOf(slot) = value else {
        return String::new();
    };
    let slot = *slot as usize;
    let index = if reversed {
        labels.len().checked_sub(slot + 1)
    } else {
        Some(slot)
    };
    index
        .and_then(|i| labels.get(i))
        .cloned()
        .unwrap_or_default()
}

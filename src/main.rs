//! EV Dashboard - Electric vehicle registration analysis
//!
//! ```text
//! ev_dashboard [INPUT] [--columns] [--view dashboard] [--format text|json]
//!              [--config dashboard.json] [--charts-dir out/ --chart-format svg|png]
//!              [--fit-until 2023 --forecast-start 2024 --forecast-end 2029]
//! ```
//!
//! `INPUT` defaults to `Electric_Vehicle_Population_Data.csv`; `-` reads the
//! CSV from standard input.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ev_dashboard::charts::{ChartFormat, StaticChartRenderer};
use ev_dashboard::data::DataLoader;
use ev_dashboard::{build_report, DashboardConfig, View, ViewReport};
use log::{info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ev_dashboard",
    about = "Summarise electric vehicle registrations and forecast adoption"
)]
struct Cli {
    /// Vehicle population CSV, or `-` for standard input
    #[arg(default_value = "Electric_Vehicle_Population_Data.csv")]
    input: String,

    /// Print the input's columns with their inferred kinds and exit
    #[arg(long)]
    columns: bool,

    /// Which view to produce
    #[arg(long, value_enum, default_value = "dashboard")]
    view: View,

    /// Output format on standard output
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// JSON file with limits and forecast window
    #[arg(long)]
    config: Option<PathBuf>,

    /// Last year used to fit the forecast
    #[arg(long)]
    fit_until: Option<i64>,

    /// First projected year
    #[arg(long)]
    forecast_start: Option<i64>,

    /// Last projected year
    #[arg(long)]
    forecast_end: Option<i64>,

    /// Directory to write one chart per section into
    #[arg(long)]
    charts_dir: Option<PathBuf>,

    /// Encoding of written charts
    #[arg(long, value_enum, default_value = "svg")]
    chart_format: ChartFormat,
}

impl Cli {
    fn dashboard_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_path(path)
                .with_context(|| format!("Loading config {}", path.display()))?,
            None => DashboardConfig::default(),
        };

        let window = &mut config.forecast;
        if let Some(year) = self.fit_until {
            window.fit_until = year;
        }
        if let Some(year) = self.forecast_start {
            window.start = year;
        }
        if let Some(year) = self.forecast_end {
            window.end = year;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.dashboard_config()?;

    let raw = if cli.input == "-" {
        DataLoader::load_reader(std::io::stdin().lock()).context("Reading CSV from stdin")?
    } else {
        DataLoader::load_path(&cli.input).with_context(|| format!("Loading {}", cli.input))?
    };

    if cli.columns {
        let columns = raw.columns();
        let mut stdout = std::io::stdout().lock();
        match cli.format {
            OutputFormat::Text => {
                let width = columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
                for column in &columns {
                    writeln!(stdout, "{:<width$}  {}", column.name, column.kind)?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut stdout, &columns)?;
                writeln!(stdout)?;
            }
        }
        return Ok(());
    }

    let dataset = raw
        .clean()
        .and_then(|table| table.to_dataset())
        .context("Preparing records")?;

    let report = build_report(cli.view, &dataset, &config);
    info!(
        "Built {} sections for {:?} from {} records",
        report.sections.len(),
        cli.view,
        report.record_count
    );

    let mut stdout = std::io::stdout().lock();
    match cli.format {
        OutputFormat::Text => write!(stdout, "{report}")?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }

    if let Some(dir) = &cli.charts_dir {
        let renderer = StaticChartRenderer {
            format: cli.chart_format,
            ..StaticChartRenderer::default()
        };
        write_charts(&renderer, &report, dir)?;
    }

    Ok(())
}

/// Write every drawable section; a failed chart is logged and skipped.
fn write_charts(renderer: &StaticChartRenderer, report: &ViewReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Creating charts directory {}", dir.display()))?;

    for (index, section) in report.sections.iter().enumerate() {
        match renderer.render(section) {
            Ok(Some(figure)) => {
                let path = dir.join(figure.file_name(index + 1));
                std::fs::write(&path, &figure.bytes)
                    .with_context(|| format!("Writing {}", path.display()))?;
                info!("Wrote {}", path.display());
            }
            Ok(None) => info!("Skipping chart for '{}': nothing to draw", section.title),
            Err(e) => warn!("Failed to render '{}': {e}", section.title),
        }
    }
    Ok(())
}

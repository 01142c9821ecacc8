//! Charts module - Static figure rendering

mod renderer;

pub use renderer::{ChartFormat, Figure, RenderError, StaticChartRenderer};

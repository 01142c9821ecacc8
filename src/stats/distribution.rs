//! Range Distribution Module
//! Descriptive statistics and histogram of the electric range.

use crate::data::Dataset;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min, OrderStatistics};
use std::fmt;

/// One equal-width histogram bin. The last bin includes its upper edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Summary of electric range across a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeDistribution {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub bins: Vec<HistogramBin>,
}

impl RangeDistribution {
    /// Statistics over every record's range, or `None` for an empty dataset.
    pub fn from_dataset(dataset: &Dataset, bins: usize) -> Option<Self> {
        let values: Vec<f64> = dataset.iter().map(|r| r.electric_range).collect();
        Self::from_values(values, bins)
    }

    pub fn from_values(values: Vec<f64>, bins: usize) -> Option<Self> {
        let count = values.len();
        if count == 0 {
            return None;
        }

        let histogram = histogram(&values, bins.max(1));
        let mut data = Data::new(values);

        let mean = data.mean().unwrap_or(f64::NAN);
        let std_dev = if count > 1 {
            data.std_dev().unwrap_or(f64::NAN)
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            median: data.median(),
            std_dev,
            min: Min::min(&data),
            max: Max::max(&data),
            lower_quartile: data.lower_quartile(),
            upper_quartile: data.upper_quartile(),
            bins: histogram,
        })
    }
}

fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len() as u64,
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0u64; bins];
    for &value in values {
        let idx = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: if i + 1 == bins {
                max
            } else {
                min + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

impl fmt::Display for RangeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vehicles:        {}", self.count)?;
        writeln!(f, "Mean range:      {:.1} miles", self.mean)?;
        writeln!(f, "Median range:    {:.1} miles", self.median)?;
        writeln!(f, "Std deviation:   {:.1} miles", self.std_dev)?;
        writeln!(f, "Min / Max:       {:.0} / {:.0} miles", self.min, self.max)?;
        writeln!(
            f,
            "Quartiles:       {:.1} / {:.1} miles",
            self.lower_quartile, self.upper_quartile
        )?;
        writeln!(f, "Histogram:")?;
        for bin in &self.bins {
            writeln!(f, "  {:>7.1} - {:>7.1}  {}", bin.lower, bin.upper, bin.count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_distribution() {
        assert!(RangeDistribution::from_values(Vec::new(), 30).is_none());
    }

    #[test]
    fn summary_statistics() {
        let dist = RangeDistribution::from_values(vec![0.0, 100.0, 200.0, 300.0, 400.0], 4).unwrap();

        assert_eq!(dist.count, 5);
        assert!((dist.mean - 200.0).abs() < 1e-9);
        assert!((dist.median - 200.0).abs() < 1e-9);
        assert!((dist.std_dev - 158.113_883).abs() < 1e-5);
        assert_eq!(dist.min, 0.0);
        assert_eq!(dist.max, 400.0);
        assert!(dist.lower_quartile <= dist.median && dist.median <= dist.upper_quartile);
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let dist = RangeDistribution::from_values(vec![0.0, 100.0, 200.0, 300.0, 400.0], 4).unwrap();

        assert_eq!(dist.bins.len(), 4);
        let counts: Vec<_> = dist.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_eq!(dist.bins[0].lower, 0.0);
        assert_eq!(dist.bins[3].upper, 400.0);
    }

    #[test]
    fn constant_values_fall_in_one_bin() {
        let dist = RangeDistribution::from_values(vec![0.0; 6], 30).unwrap();
        assert_eq!(dist.bins.len(), 1);
        assert_eq!(dist.bins[0].count, 6);
        assert_eq!(dist.std_dev, 0.0);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let dist = RangeDistribution::from_values(vec![215.0], 30).unwrap();
        assert_eq!(dist.mean, 215.0);
        assert_eq!(dist.std_dev, 0.0);
    }
}

//! Histograms and their ASCII rendering

use crate::cube::{map_cube, Cube};
use crate::dtype::Element;
use crate::errors::{Result, RuCubeError};
use std::fmt;
use std::str::FromStr;

/// How bin populations are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistogramMode {
    /// Absolute counts
    #[default]
    Number,
    /// Percentage of all binned elements
    Percentage,
}

impl HistogramMode {
    /// Parse `number`/`num` or `percentage`/`%`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidArgument`] for any other name.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "number" | "num" | "n" => Ok(HistogramMode::Number),
            "percentage" | "percent" | "%" | "p" => Ok(HistogramMode::Percentage),
            other => Err(RuCubeError::InvalidArgument(format!(
                "unknown histogram mode '{other}'"
            ))),
        }
    }
}

impl FromStr for HistogramMode {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HistogramMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HistogramMode::Number => "number",
            HistogramMode::Percentage => "percentage",
        })
    }
}

/// Equal-width bins over a closed range
///
/// Every bin is half-open except the last, which includes the upper edge.
/// Values outside the range and NaNs are not binned.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    edges: Vec<f64>,
    counts: Vec<u64>,
}

impl Histogram {
    /// Empty histogram with `bins` bins over `range`
    ///
    /// A degenerate range `(v, v)` is widened to `(v - 0.5, v + 0.5)`.
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidArgument`] for zero bins or a range that
    /// is reversed or not finite.
    pub fn new(bins: usize, range: (f64, f64)) -> Result<Self> {
        let (mut low, mut high) = range;
        if bins == 0 {
            return Err(RuCubeError::InvalidArgument(
                "histogram needs at least one bin".to_string(),
            ));
        }
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(RuCubeError::InvalidArgument(format!(
                "invalid histogram range [{low}, {high}]"
            )));
        }
        if low == high {
            low -= 0.5;
            high += 0.5;
        }
        let width = (high - low) / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| low + i as f64 * width).collect();
        edges.push(high);
        Ok(Self {
            edges,
            counts: vec![0; bins],
        })
    }

    /// Histogram of a whole cube; the range defaults to the finite min/max
    ///
    /// # Errors
    ///
    /// Same conditions as [`Histogram::new`].
    pub fn from_cube(cube: &Cube, bins: usize, range: Option<(f64, f64)>) -> Result<Self> {
        let range = match range {
            Some(range) => range,
            None => map_cube!(cube, a => finite_range(a.iter().copied())),
        };
        let mut histogram = Self::new(bins, range)?;
        map_cube!(cube, a => histogram.add(a.iter().copied()));
        Ok(histogram)
    }

    /// Bin more values
    pub fn add<T: Element, I: IntoIterator<Item = T>>(&mut self, values: I) {
        let bins = self.counts.len();
        let low = self.edges[0];
        let high = self.edges[bins];
        let scale = bins as f64 / (high - low);
        for value in values {
            let v = value.to_f64();
            if v.is_nan() || v < low || v > high {
                continue;
            }
            let mut bin = ((v - low) * scale) as usize;
            if bin >= bins {
                bin = bins - 1;
            }
            // guard against rounding at interior edges
            if v < self.edges[bin] && bin > 0 {
                bin -= 1;
            } else if bin + 1 < bins && v >= self.edges[bin + 1] {
                bin += 1;
            }
            self.counts[bin] += 1;
        }
    }

    #[must_use]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// The `bins + 1` bin edges
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of binned values
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// One line per bin, each `hlength` characters wide when it fits
    ///
    /// A line is `<low> <high> |<bar>| <value>`; the bar takes whatever width
    /// the labels leave and is scaled by `count / max_count`.
    #[must_use]
    pub fn format(&self, hlength: usize, mode: HistogramMode) -> Vec<String> {
        let total = self.total();
        let max_count = self.counts.iter().copied().max().unwrap_or(0);
        let lows: Vec<String> = self.edges[..self.bins()].iter().map(|e| format_edge(*e)).collect();
        let highs: Vec<String> = self.edges[1..].iter().map(|e| format_edge(*e)).collect();
        let values: Vec<String> = self
            .counts
            .iter()
            .map(|&count| match mode {
                HistogramMode::Number => count.to_string(),
                HistogramMode::Percentage => {
                    let pct = if total == 0 {
                        0.0
                    } else {
                        count as f64 * 100.0 / total as f64
                    };
                    format!("{pct:.2}%")
                }
            })
            .collect();

        let low_width = column_width(&lows);
        let high_width = column_width(&highs);
        let value_width = column_width(&values);
        let fixed = low_width + 1 + high_width + 2 + 2 + value_width;
        let bar_width = hlength.saturating_sub(fixed);

        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let filled = if max_count == 0 {
                    0
                } else {
                    ((count as f64 / max_count as f64) * bar_width as f64).round() as usize
                };
                let bar = format!("{}{}", "*".repeat(filled), " ".repeat(bar_width - filled));
                format!(
                    "{:>low_width$} {:>high_width$} |{bar}| {:>value_width$}",
                    lows[i], highs[i], values[i]
                )
            })
            .collect()
    }
}

fn finite_range<T: Element>(values: impl Iterator<Item = T>) -> (f64, f64) {
    let mut range: Option<(f64, f64)> = None;
    for v in values.map(Element::to_f64).filter(|v| v.is_finite()) {
        range = Some(match range {
            Some((low, high)) => (low.min(v), high.max(v)),
            None => (v, v),
        });
    }
    range.unwrap_or((0.0, 1.0))
}

fn format_edge(edge: f64) -> String {
    let text = format!("{edge:.3}");
    if text == "-0.000" {
        "0.000".to_string()
    } else {
        text
    }
}

fn column_width(cells: &[String]) -> usize {
    cells.iter().map(String::len).max().unwrap_or(0)
}

/// Histogram of a cube rendered as ASCII lines
///
/// # Errors
///
/// Same conditions as [`Histogram::new`].
pub fn histogram_lines(
    cube: &Cube,
    bins: usize,
    range: Option<(f64, f64)>,
    hlength: usize,
    mode: HistogramMode,
) -> Result<Vec<String>> {
    Ok(Histogram::from_cube(cube, bins, range)?.format(hlength, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning_follows_edges() {
        let cube = Cube::from_vec(&[6], vec![0.0f64, 0.1, 0.5, 0.99, 1.0, 1.5]).unwrap();
        let histogram = Histogram::from_cube(&cube, 2, Some((0.0, 1.0))).unwrap();
        assert_eq!(histogram.edges(), &[0.0, 0.5, 1.0]);
        assert_eq!(histogram.counts(), &[2, 3]);
        assert_eq!(histogram.total(), 5);
    }

    #[test]
    fn test_default_range() {
        let cube = Cube::from_vec(&[4], vec![2i32, 4, 6, 10]).unwrap();
        let histogram = Histogram::from_cube(&cube, 4, None).unwrap();
        assert_eq!(histogram.edges(), &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(histogram.counts(), &[1, 1, 1, 1]);

        let constant = Cube::from_vec(&[3], vec![5u8; 3]).unwrap();
        let histogram = Histogram::from_cube(&constant, 1, None).unwrap();
        assert_eq!(histogram.edges(), &[4.5, 5.5]);
        assert_eq!(histogram.counts(), &[3]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Histogram::new(0, (0.0, 1.0)).is_err());
        assert!(Histogram::new(3, (1.0, 0.0)).is_err());
        assert!(Histogram::new(3, (0.0, f64::INFINITY)).is_err());
        assert!(HistogramMode::parse("bars").is_err());
        assert_eq!(HistogramMode::parse("%").unwrap(), HistogramMode::Percentage);
    }

    #[test]
    fn test_format_is_columnar() {
        let cube = Cube::from_vec(&[10], (0..10).map(|v| v as f32).collect()).unwrap();
        let histogram = Histogram::from_cube(&cube, 3, Some((0.0, 9.0))).unwrap();
        assert_eq!(histogram.counts(), &[3, 3, 4]);

        let lines = histogram.format(60, HistogramMode::Number);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.len() == 60));
        assert!(lines[2].ends_with("| 4"));
        let bar_of = |line: &str| line.chars().filter(|&c| c == '*').count();
        assert!(bar_of(&lines[2]) > bar_of(&lines[0]));

        let lines = histogram.format(60, HistogramMode::Percentage);
        assert!(lines[0].ends_with(" 30.00%"));
        assert!(lines[2].ends_with(" 40.00%"));

        let narrow = histogram.format(5, HistogramMode::Number);
        assert!(narrow.iter().all(|l| l.contains("||")));
    }
}

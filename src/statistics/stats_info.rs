//! Combinable summary statistics
//!
//! A [`StatsInfo`] covers the element range `offset..offset + count` of a
//! cube. Partials over adjacent ranges combine into the summary of their
//! union; min/max positions are kept as flat indices into the whole cube.

use crate::cube::{map_cube, Cube};
use crate::dtype::{Dtype, Element, Scalar};
use crate::errors::{Result, RuCubeError};
use crate::shape::unravel_index;
use serde_json::{json, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;

/// Extreme value and its flat position in the cube
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extreme {
    pub value: Scalar,
    pub index: usize,
}

/// Incremental statistics over a cube
#[derive(Debug, Clone, PartialEq)]
pub struct StatsInfo {
    dtype: Dtype,
    cube_shape: Vec<usize>,
    offset: usize,
    count: usize,
    sum: Scalar,
    min: Option<Extreme>,
    max: Option<Extreme>,
    zero_count: usize,
    nonzero_count: usize,
    nan_count: usize,
    inf_count: usize,
}

impl StatsInfo {
    /// Empty statistics positioned at the start of a cube
    #[must_use]
    pub fn new(dtype: Dtype, cube_shape: &[usize]) -> Self {
        Self::empty_at(dtype, cube_shape, 0)
    }

    fn empty_at(dtype: Dtype, cube_shape: &[usize], offset: usize) -> Self {
        Self {
            dtype,
            cube_shape: cube_shape.to_vec(),
            offset,
            count: 0,
            sum: Scalar::zero(dtype),
            min: None,
            max: None,
            zero_count: 0,
            nonzero_count: 0,
            nan_count: 0,
            inf_count: 0,
        }
    }

    /// Statistics of a block of elements starting at flat index `offset`
    #[must_use]
    pub fn from_block<T: Element>(block: &[T], offset: usize, cube_shape: &[usize]) -> Self {
        let mut stats = Self::empty_at(T::DTYPE, cube_shape, offset);
        stats.count = block.len();
        stats.sum = T::sum_precise(block.iter());

        let mut min: Option<(usize, T)> = None;
        let mut max: Option<(usize, T)> = None;
        for (i, &value) in block.iter().enumerate() {
            if value.is_nan() {
                stats.nan_count += 1;
                stats.nonzero_count += 1;
                continue;
            }
            if value.is_infinite() {
                stats.inf_count += 1;
            }
            if value.is_zero() {
                stats.zero_count += 1;
            } else {
                stats.nonzero_count += 1;
            }
            if min.map_or(true, |(_, m)| value.precedes(m)) {
                min = Some((i, value));
            }
            if max.map_or(true, |(_, m)| m.precedes(value)) {
                max = Some((i, value));
            }
        }
        stats.min = min.map(|(i, value)| Extreme {
            value: value.to_scalar(),
            index: offset + i,
        });
        stats.max = max.map(|(i, value)| Extreme {
            value: value.to_scalar(),
            index: offset + i,
        });
        stats
    }

    /// Statistics of a whole in-memory cube
    #[must_use]
    pub fn from_cube(cube: &Cube) -> Self {
        fn of_array<T: Element>(array: &ndarray::ArrayD<T>) -> StatsInfo {
            match array.as_slice() {
                Some(values) => StatsInfo::from_block(values, 0, array.shape()),
                None => {
                    let values: Vec<T> = array.iter().copied().collect();
                    StatsInfo::from_block(&values, 0, array.shape())
                }
            }
        }
        map_cube!(cube, a => of_array(a))
    }

    /// Fold the next adjacent block into these statistics
    ///
    /// # Errors
    ///
    /// Same conditions as [`StatsInfo::combine`].
    pub fn update<T: Element>(&mut self, block: &[T], offset: usize) -> Result<()> {
        let partial = Self::from_block(block, offset, &self.cube_shape);
        *self = self.combine(&partial)?;
        Ok(())
    }

    /// Statistics of the union of two adjacent partials
    ///
    /// `other` must start right where `self` ends. Ties on min/max keep the
    /// earlier position.
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::DtypeMismatch`], [`RuCubeError::ShapeMismatch`] or
    /// [`RuCubeError::NonAdjacentPartials`] when the partials do not fit.
    pub fn combine(&self, other: &StatsInfo) -> Result<StatsInfo> {
        if self.dtype != other.dtype {
            return Err(RuCubeError::DtypeMismatch {
                left: self.dtype.to_string(),
                right: other.dtype.to_string(),
            });
        }
        if self.cube_shape != other.cube_shape {
            return Err(RuCubeError::ShapeMismatch {
                left: self.cube_shape.clone(),
                right: other.cube_shape.clone(),
            });
        }
        let expected = self.offset + self.count;
        if other.offset != expected {
            return Err(RuCubeError::NonAdjacentPartials {
                expected,
                found: other.offset,
            });
        }
        Ok(StatsInfo {
            dtype: self.dtype,
            cube_shape: self.cube_shape.clone(),
            offset: self.offset,
            count: self.count + other.count,
            sum: self.sum.add(other.sum)?,
            min: pick_extreme(self.min, other.min, Ordering::Less),
            max: pick_extreme(self.max, other.max, Ordering::Greater),
            zero_count: self.zero_count + other.zero_count,
            nonzero_count: self.nonzero_count + other.nonzero_count,
            nan_count: self.nan_count + other.nan_count,
            inf_count: self.inf_count + other.inf_count,
        })
    }

    #[must_use]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    #[must_use]
    pub fn cube_shape(&self) -> &[usize] {
        &self.cube_shape
    }

    /// Number of elements in the whole cube
    #[must_use]
    pub fn cube_count(&self) -> usize {
        self.cube_shape.iter().product()
    }

    /// First flat index covered
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of elements seen
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Precise-kind sum
    #[must_use]
    pub fn sum(&self) -> Scalar {
        self.sum
    }

    #[must_use]
    pub fn min(&self) -> Option<Scalar> {
        self.min.map(|e| e.value)
    }

    #[must_use]
    pub fn max(&self) -> Option<Scalar> {
        self.max.map(|e| e.value)
    }

    /// Cube coordinates of the minimum
    #[must_use]
    pub fn min_index(&self) -> Option<Vec<usize>> {
        self.min.map(|e| unravel_index(&self.cube_shape, e.index))
    }

    /// Cube coordinates of the maximum
    #[must_use]
    pub fn max_index(&self) -> Option<Vec<usize>> {
        self.max.map(|e| unravel_index(&self.cube_shape, e.index))
    }

    #[must_use]
    pub fn zero_count(&self) -> usize {
        self.zero_count
    }

    #[must_use]
    pub fn nonzero_count(&self) -> usize {
        self.nonzero_count
    }

    #[must_use]
    pub fn nan_count(&self) -> usize {
        self.nan_count
    }

    #[must_use]
    pub fn inf_count(&self) -> usize {
        self.inf_count
    }

    /// Mean of the elements seen; `None` before any element
    #[must_use]
    pub fn average(&self) -> Option<Scalar> {
        (self.count > 0).then(|| self.sum.div_count(self.count))
    }

    fn fraction(&self, count: usize) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            count as f64 / self.count as f64
        }
    }

    #[must_use]
    pub fn zero_fraction(&self) -> f64 {
        self.fraction(self.zero_count)
    }

    #[must_use]
    pub fn nonzero_fraction(&self) -> f64 {
        self.fraction(self.nonzero_count)
    }

    #[must_use]
    pub fn nan_fraction(&self) -> f64 {
        self.fraction(self.nan_count)
    }

    #[must_use]
    pub fn inf_fraction(&self) -> f64 {
        self.fraction(self.inf_count)
    }

    /// Column-aligned `name = value` lines
    #[must_use]
    pub fn report_lines(&self) -> Vec<String> {
        let optional =
            |value: Option<Scalar>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
        let located = |extreme: Option<Extreme>| match extreme {
            Some(e) => format!(
                "{} at {}",
                e.value,
                format_index(&unravel_index(&self.cube_shape, e.index))
            ),
            None => "-".to_string(),
        };
        let counted = |count: usize, fraction: f64| format!("{count} [{:.2}%]", fraction * 100.0);
        let rows = [
            ("shape", format_index(&self.cube_shape)),
            ("dtype", self.dtype.to_string()),
            ("count", self.count.to_string()),
            ("sum", self.sum.to_string()),
            ("ave", optional(self.average())),
            ("min", located(self.min)),
            ("max", located(self.max)),
            ("zero", counted(self.zero_count, self.zero_fraction())),
            ("nonzero", counted(self.nonzero_count, self.nonzero_fraction())),
            ("nan", counted(self.nan_count, self.nan_fraction())),
            ("inf", counted(self.inf_count, self.inf_fraction())),
        ];
        let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        rows.iter()
            .map(|(name, value)| format!("{name:<width$} = {value}"))
            .collect()
    }

    /// JSON document with every field
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let extreme = |extreme: Option<Extreme>| match extreme {
            Some(e) => json!({
                "value": e.value.to_json(),
                "index": unravel_index(&self.cube_shape, e.index),
            }),
            None => JsonValue::Null,
        };
        json!({
            "shape": self.cube_shape,
            "dtype": self.dtype.name(),
            "count": self.count,
            "sum": self.sum.to_json(),
            "ave": self.average().map_or(JsonValue::Null, |v| v.to_json()),
            "min": extreme(self.min),
            "max": extreme(self.max),
            "zero_count": self.zero_count,
            "nonzero_count": self.nonzero_count,
            "nan_count": self.nan_count,
            "inf_count": self.inf_count,
        })
    }
}

impl fmt::Display for StatsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.report_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Keep `left` unless `right` is strictly more extreme in direction `wanted`
fn pick_extreme(
    left: Option<Extreme>,
    right: Option<Extreme>,
    wanted: Ordering,
) -> Option<Extreme> {
    match (left, right) {
        (Some(l), Some(r)) => {
            if r.value.compare(&l.value) == Some(wanted) {
                Some(r)
            } else {
                Some(l)
            }
        }
        (l, r) => l.or(r),
    }
}

fn format_index(index: &[usize]) -> String {
    let parts: Vec<String> = index.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}

impl Cube {
    /// Summary statistics of every element
    #[must_use]
    pub fn stats(&self) -> StatsInfo {
        StatsInfo::from_cube(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_stats() {
        let values: Vec<f32> = (0..60).map(|v| v as f32).collect();
        let cube = Cube::from_vec(&[3, 4, 5], values).unwrap();
        let stats = cube.stats();
        assert_eq!(stats.count(), 60);
        assert_eq!(stats.sum(), Scalar::Float(1770.0));
        assert_eq!(stats.min(), Some(Scalar::Float(0.0)));
        assert_eq!(stats.max(), Some(Scalar::Float(59.0)));
        assert_eq!(stats.min_index(), Some(vec![0, 0, 0]));
        assert_eq!(stats.max_index(), Some(vec![2, 3, 4]));
        assert_eq!(stats.zero_count(), 1);
        assert_eq!(stats.nonzero_count(), 59);
        assert_eq!(stats.average(), Some(Scalar::Float(29.5)));
    }

    #[test]
    fn test_nan_and_inf_are_counted_not_ranked() {
        let block = [1.0f64, f64::NAN, f64::INFINITY, -2.0, 0.0];
        let stats = StatsInfo::from_block(&block, 0, &[5]);
        assert_eq!(stats.nan_count(), 1);
        assert_eq!(stats.inf_count(), 1);
        assert_eq!(stats.zero_count(), 1);
        assert_eq!(stats.nonzero_count(), 4);
        assert_eq!(stats.min(), Some(Scalar::Float(-2.0)));
        assert_eq!(stats.max(), Some(Scalar::Float(f64::INFINITY)));
        assert_eq!(stats.max_index(), Some(vec![2]));
    }

    #[test]
    fn test_combine_adjacent_partials() {
        let values: Vec<i32> = vec![5, -3, 7, 7, -3, 2, 0, 9];
        let whole = StatsInfo::from_block(&values, 0, &[2, 4]);
        let left = StatsInfo::from_block(&values[..3], 0, &[2, 4]);
        let right = StatsInfo::from_block(&values[3..], 3, &[2, 4]);
        let combined = left.combine(&right).unwrap();
        assert_eq!(combined, whole);
        // ties keep the first occurrence
        assert_eq!(combined.min_index(), Some(vec![0, 1]));
        assert_eq!(combined.sum(), Scalar::Int(24));

        let mut incremental = StatsInfo::new(Dtype::Int32, &[2, 4]);
        incremental.update(&values[..5], 0).unwrap();
        incremental.update(&values[5..], 5).unwrap();
        assert_eq!(incremental, whole);
    }

    #[test]
    fn test_combine_rejects_gaps_and_mismatches() {
        let a = StatsInfo::from_block(&[1u8, 2], 0, &[6]);
        let b = StatsInfo::from_block(&[3u8, 4], 3, &[6]);
        assert!(matches!(
            a.combine(&b),
            Err(RuCubeError::NonAdjacentPartials {
                expected: 2,
                found: 3
            })
        ));
        let c = StatsInfo::from_block(&[3u16, 4], 2, &[6]);
        assert!(matches!(a.combine(&c), Err(RuCubeError::DtypeMismatch { .. })));
    }

    #[test]
    fn test_precise_sum_of_small_ints() {
        let block = vec![i8::MAX; 1000];
        let stats = StatsInfo::from_block(&block, 0, &[1000]);
        assert_eq!(stats.sum(), Scalar::Int(127_000));
    }

    #[test]
    fn test_report_and_json() {
        let stats = StatsInfo::from_block(&[1.0f32, 0.0, 3.0, 4.0], 0, &[2, 2]);
        let lines = stats.report_lines();
        assert_eq!(lines[0], "shape   = (2, 2)");
        assert!(lines.iter().any(|l| l == "max     = 4 at (1, 1)"));
        assert!(lines.iter().any(|l| l == "zero    = 1 [25.00%]"));

        let json = stats.to_json();
        assert_eq!(json["count"], 4);
        assert_eq!(json["max"]["index"], json!([1, 1]));
        assert_eq!(json["dtype"], "float32");
    }
}

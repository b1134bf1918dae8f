//! Statistics of the difference between two cubes

use super::stats_info::StatsInfo;
use crate::cube::Cube;
use crate::dtype::{Dtype, Element};
use crate::errors::{Result, RuCubeError};
use serde_json::{json, Value as JsonValue};
use std::fmt;

/// Default guard against dividing by zero in relative differences
pub const DEFAULT_EPSILON: f64 = 1e-30;

/// Parameters of the relative difference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffOptions {
    /// Lower bound of the denominator `max(|a|, |b|, epsilon)`
    pub epsilon: f64,
    /// Relative differences are zeroed where `max(|a|, |b|)` is below this
    pub in_threshold: Option<f64>,
    /// Relative differences are zeroed where `max(|a|, |b|)` is above this
    pub out_threshold: Option<f64>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            in_threshold: None,
            out_threshold: None,
        }
    }
}

impl DiffOptions {
    /// Relative difference of one pair of magnitudes
    #[must_use]
    pub fn rel_diff(&self, abs_diff: f64, magnitude: f64) -> f64 {
        if self.in_threshold.is_some_and(|t| magnitude < t)
            || self.out_threshold.is_some_and(|t| magnitude > t)
        {
            return 0.0;
        }
        abs_diff / magnitude.max(self.epsilon)
    }
}

/// Left, right, relative-difference and absolute-difference statistics
#[derive(Debug, Clone, PartialEq)]
pub struct DiffInfo {
    pub left: StatsInfo,
    pub right: StatsInfo,
    pub rel_diff: StatsInfo,
    pub abs_diff: StatsInfo,
}

impl DiffInfo {
    /// Empty statistics for two cubes of `dtype` and `cube_shape`
    #[must_use]
    pub fn new(dtype: Dtype, cube_shape: &[usize]) -> Self {
        Self {
            left: StatsInfo::new(dtype, cube_shape),
            right: StatsInfo::new(dtype, cube_shape),
            rel_diff: StatsInfo::new(f64::DTYPE, cube_shape),
            abs_diff: StatsInfo::new(f64::DTYPE, cube_shape),
        }
    }

    /// Statistics of two aligned blocks starting at flat index `offset`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::ShapeMismatch`] if the blocks differ in length.
    pub fn from_blocks<T: Element>(
        left: &[T],
        right: &[T],
        offset: usize,
        cube_shape: &[usize],
        options: &DiffOptions,
    ) -> Result<Self> {
        if left.len() != right.len() {
            return Err(RuCubeError::ShapeMismatch {
                left: vec![left.len()],
                right: vec![right.len()],
            });
        }
        let mut abs_values = Vec::with_capacity(left.len());
        let mut rel_values = Vec::with_capacity(left.len());
        for (&a, &b) in left.iter().zip(right) {
            let (a, b) = (a.to_complex(), b.to_complex());
            let abs_diff = (a - b).norm();
            abs_values.push(abs_diff);
            rel_values.push(options.rel_diff(abs_diff, a.norm().max(b.norm())));
        }
        Ok(Self {
            left: StatsInfo::from_block(left, offset, cube_shape),
            right: StatsInfo::from_block(right, offset, cube_shape),
            rel_diff: StatsInfo::from_block(&rel_values, offset, cube_shape),
            abs_diff: StatsInfo::from_block(&abs_values, offset, cube_shape),
        })
    }

    /// Statistics of two whole in-memory cubes
    ///
    /// # Errors
    ///
    /// Returns an error if the cubes differ in shape or element type.
    pub fn from_cubes(left: &Cube, right: &Cube, options: &DiffOptions) -> Result<Self> {
        if left.shape() != right.shape() {
            return Err(RuCubeError::ShapeMismatch {
                left: left.shape().to_vec(),
                right: right.shape().to_vec(),
            });
        }
        fn of_arrays<T: Element>(
            left: &Cube,
            right: &Cube,
            options: &DiffOptions,
        ) -> Result<DiffInfo> {
            let l: Vec<T> = left.expect_array::<T>()?.iter().copied().collect();
            let r: Vec<T> = right.expect_array::<T>()?.iter().copied().collect();
            DiffInfo::from_blocks(&l, &r, 0, left.shape(), options)
        }
        crate::with_element_type!(left.dtype(), T => of_arrays::<T>(left, right, options))
    }

    /// Fold the next pair of adjacent blocks
    ///
    /// # Errors
    ///
    /// Same conditions as [`DiffInfo::combine`] and [`DiffInfo::from_blocks`].
    pub fn update<T: Element>(
        &mut self,
        left: &[T],
        right: &[T],
        offset: usize,
        options: &DiffOptions,
    ) -> Result<()> {
        let partial = Self::from_blocks(left, right, offset, self.left.cube_shape(), options)?;
        *self = self.combine(&partial)?;
        Ok(())
    }

    /// Combine partials over adjacent ranges part by part
    ///
    /// # Errors
    ///
    /// Same conditions as [`StatsInfo::combine`].
    pub fn combine(&self, other: &DiffInfo) -> Result<DiffInfo> {
        Ok(DiffInfo {
            left: self.left.combine(&other.left)?,
            right: self.right.combine(&other.right)?,
            rel_diff: self.rel_diff.combine(&other.rel_diff)?,
            abs_diff: self.abs_diff.combine(&other.abs_diff)?,
        })
    }

    /// Number of element pairs seen
    #[must_use]
    pub fn count(&self) -> usize {
        self.left.count()
    }

    /// The four reports as indented sections
    #[must_use]
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (title, stats) in [
            ("left", &self.left),
            ("right", &self.right),
            ("rel_diff", &self.rel_diff),
            ("abs_diff", &self.abs_diff),
        ] {
            lines.push(format!("{title}:"));
            lines.extend(stats.report_lines().into_iter().map(|l| format!("    {l}")));
        }
        lines
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        json!({
            "left": self.left.to_json(),
            "right": self.right.to_json(),
            "rel_diff": self.rel_diff.to_json(),
            "abs_diff": self.abs_diff.to_json(),
        })
    }
}

impl fmt::Display for DiffInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.report_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

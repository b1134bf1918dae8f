//! Index pickers and extractors
//!
//! An [`IndexPicker`] selects along a single axis: either one integer index,
//! which collapses the axis, or a `start:stop:step` slice with Python slice
//! semantics (negative bounds count from the end, open bounds mean the
//! extreme). An [`Extractor`] is a rank-matched sequence of pickers.

use crate::errors::{Result, RuCubeError};
use crate::shape::Shape;
use ndarray::{ArrayD, ArrayViewD, Axis};
use std::fmt;
use std::str::FromStr;

/// Single-axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexPicker {
    /// A single index; the axis disappears from the result
    Index(isize),
    /// A half-open `start:stop:step` range
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
}

impl IndexPicker {
    /// The `:` picker, selecting a whole axis
    pub const FULL: IndexPicker = IndexPicker::Slice {
        start: None,
        stop: None,
        step: None,
    };

    /// Parse `"i"`, `":"`, `"a:b"` or `"a:b:c"`; any bound may be empty
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidExtractor`] for malformed integers, too many
    /// colons or a zero step.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: String| RuCubeError::InvalidExtractor {
            spec: spec.to_string(),
            reason,
        };
        let parse_bound = |token: &str| -> Result<Option<isize>> {
            let token = token.trim();
            if token.is_empty() {
                Ok(None)
            } else {
                token
                    .parse()
                    .map(Some)
                    .map_err(|_| invalid(format!("'{token}' is not an integer")))
            }
        };

        let parts: Vec<&str> = spec.split(':').collect();
        match parts.as_slice() {
            [index] => parse_bound(index)?
                .map(IndexPicker::Index)
                .ok_or_else(|| invalid("empty index".to_string())),
            [start, stop] => Ok(IndexPicker::Slice {
                start: parse_bound(start)?,
                stop: parse_bound(stop)?,
                step: None,
            }),
            [start, stop, step] => {
                let step = parse_bound(step)?;
                if step == Some(0) {
                    return Err(invalid("slice step cannot be zero".to_string()));
                }
                Ok(IndexPicker::Slice {
                    start: parse_bound(start)?,
                    stop: parse_bound(stop)?,
                    step,
                })
            }
            _ => Err(invalid("too many ':'".to_string())),
        }
    }

    /// Whether this picker keeps its axis
    #[must_use]
    pub fn is_slice(&self) -> bool {
        matches!(self, IndexPicker::Slice { .. })
    }

    /// Resolve against a dimension of size `dim` into `(start, stop, step)`
    ///
    /// Slices follow Python's `slice.indices`; an integer `i` resolves to
    /// `(i, i + 1, 1)` after normalization.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero step or an integer index outside the dimension.
    pub fn get_indices(&self, dim: usize) -> Result<(isize, isize, isize)> {
        let len = dim as isize;
        match *self {
            IndexPicker::Index(_) => {
                let index = self.resolve_index(dim)? as isize;
                Ok((index, index + 1, 1))
            }
            IndexPicker::Slice { start, stop, step } => {
                let step = step.unwrap_or(1);
                if step == 0 {
                    return Err(RuCubeError::InvalidExtractor {
                        spec: self.to_string(),
                        reason: "slice step cannot be zero".to_string(),
                    });
                }
                let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
                let clamp = |bound: isize| {
                    if bound < 0 {
                        (bound + len).max(lower)
                    } else {
                        bound.min(upper)
                    }
                };
                let start = start.map_or(if step > 0 { lower } else { upper }, clamp);
                let stop = stop.map_or(if step > 0 { upper } else { lower }, clamp);
                Ok((start, stop, step))
            }
        }
    }

    /// Normalize an integer picker against a dimension
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::IndexOutOfRange`] when the index falls outside, and
    /// [`RuCubeError::InvalidArgument`] when called on a slice.
    pub fn resolve_index(&self, dim: usize) -> Result<usize> {
        match *self {
            IndexPicker::Index(index) => {
                let resolved = if index < 0 {
                    index + dim as isize
                } else {
                    index
                };
                if resolved < 0 || resolved >= dim as isize {
                    Err(RuCubeError::IndexOutOfRange { index, dim })
                } else {
                    Ok(resolved as usize)
                }
            }
            IndexPicker::Slice { .. } => Err(RuCubeError::InvalidArgument(format!(
                "'{self}' is a slice, not an index"
            ))),
        }
    }

    /// Number of indices selected from a dimension of size `dim`
    ///
    /// # Errors
    ///
    /// Same conditions as [`IndexPicker::get_indices`].
    pub fn count(&self, dim: usize) -> Result<usize> {
        let (start, stop, step) = self.get_indices(dim)?;
        // resolved bounds lie in [-1, dim]
        let count = if step > 0 && stop > start {
            (stop - start - 1) as usize / step.unsigned_abs() + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) as usize / step.unsigned_abs() + 1
        } else {
            0
        };
        Ok(count)
    }

    /// The selected indices, in selection order
    ///
    /// # Errors
    ///
    /// Same conditions as [`IndexPicker::get_indices`].
    pub fn indices(&self, dim: usize) -> Result<Vec<usize>> {
        let (start, _, step) = self.get_indices(dim)?;
        let count = self.count(dim)?;
        Ok((0..count as isize)
            .map(|i| (start + i * step) as usize)
            .collect())
    }
}

impl FromStr for IndexPicker {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for IndexPicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<isize>| b.map(|v| v.to_string()).unwrap_or_default();
        match *self {
            IndexPicker::Index(index) => write!(f, "{index}"),
            IndexPicker::Slice { start, stop, step } => {
                write!(f, "{}:{}", bound(start), bound(stop))?;
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

/// Rank-matched sequence of [`IndexPicker`]s
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Extractor {
    pickers: Vec<IndexPicker>,
}

impl Extractor {
    /// Build an extractor from pickers
    #[must_use]
    pub fn new(pickers: Vec<IndexPicker>) -> Self {
        Self { pickers }
    }

    /// The identity extractor of a given rank
    #[must_use]
    pub fn full(rank: usize) -> Self {
        Self {
            pickers: vec![IndexPicker::FULL; rank],
        }
    }

    /// Parse a comma-separated list of pickers, e.g. `":,2:-2,::3"`
    ///
    /// Surrounding brackets or parentheses are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidExtractor`] if any picker is malformed.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        let body = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .or_else(|| trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')))
            .unwrap_or(trimmed);
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let pickers = body
            .split(',')
            .map(|token| {
                IndexPicker::parse(token.trim()).map_err(|e| match e {
                    RuCubeError::InvalidExtractor { reason, .. } => {
                        RuCubeError::InvalidExtractor {
                            spec: spec.to_string(),
                            reason,
                        }
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pickers })
    }

    /// Number of pickers
    #[must_use]
    pub fn rank(&self) -> usize {
        self.pickers.len()
    }

    /// The pickers as a slice
    #[must_use]
    pub fn pickers(&self) -> &[IndexPicker] {
        &self.pickers
    }

    /// Split off the leading picker; `None` for an empty extractor
    #[must_use]
    pub fn split_first(&self) -> Option<(IndexPicker, Extractor)> {
        self.pickers.split_first().map(|(&first, rest)| {
            (
                first,
                Extractor {
                    pickers: rest.to_vec(),
                },
            )
        })
    }

    /// Fail with [`RuCubeError::RankMismatch`] unless ranks agree
    ///
    /// # Errors
    ///
    /// Returns an error if the extractor rank differs from `rank`.
    pub fn check_rank(&self, rank: usize) -> Result<()> {
        if self.rank() == rank {
            Ok(())
        } else {
            Err(RuCubeError::RankMismatch {
                extractor: self.rank(),
                shape: rank,
            })
        }
    }

    /// `(total_count, subcube_count)` for this extractor applied to `shape`
    ///
    /// Integer pickers collapse their axis and leave the subcube count
    /// unchanged; slices multiply it by the number of selected indices.
    ///
    /// # Errors
    ///
    /// Returns an error on rank mismatch, zero steps or out-of-range indices.
    pub fn get_counts(&self, shape: &Shape) -> Result<(usize, usize)> {
        self.check_rank(shape.rank())?;
        if shape.rank() == 0 {
            return Ok((0, 0));
        }
        let mut sub = 1;
        for (&dim, picker) in shape.dims().iter().zip(&self.pickers) {
            if picker.is_slice() {
                sub *= picker.count(dim)?;
            } else {
                picker.resolve_index(dim)?;
            }
        }
        Ok((shape.count(), sub))
    }

    /// Dimensions of the extracted subcube; may contain zeros for empty slices
    ///
    /// # Errors
    ///
    /// Same conditions as [`Extractor::get_counts`].
    pub fn result_dims(&self, dims: &[usize]) -> Result<Vec<usize>> {
        self.check_rank(dims.len())?;
        let mut result = Vec::with_capacity(dims.len());
        for (&dim, picker) in dims.iter().zip(&self.pickers) {
            if picker.is_slice() {
                result.push(picker.count(dim)?);
            } else {
                picker.resolve_index(dim)?;
            }
        }
        Ok(result)
    }

    /// Apply the extractor to an in-memory array
    ///
    /// # Errors
    ///
    /// Same conditions as [`Extractor::get_counts`].
    pub fn apply<T: Clone>(&self, array: ArrayViewD<'_, T>) -> Result<ArrayD<T>> {
        self.check_rank(array.ndim())?;
        let mut result = array.to_owned();
        let mut axis = 0;
        for picker in &self.pickers {
            let dim = result.shape()[axis];
            if picker.is_slice() {
                let indices = picker.indices(dim)?;
                if indices.len() != dim || indices.iter().enumerate().any(|(i, &j)| i != j) {
                    result = result.select(Axis(axis), &indices);
                }
                axis += 1;
            } else {
                let index = picker.resolve_index(dim)?;
                result = result.index_axis_move(Axis(axis), index);
            }
        }
        Ok(result)
    }
}

impl FromStr for Extractor {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.pickers.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn linear(dims: &[usize]) -> ArrayD<i64> {
        let count: usize = dims.iter().product();
        ArrayD::from_shape_vec(IxDyn(dims), (0..count as i64).collect()).unwrap()
    }

    #[test]
    fn test_picker_parse() {
        assert_eq!(IndexPicker::parse("3").unwrap(), IndexPicker::Index(3));
        assert_eq!(IndexPicker::parse("-1").unwrap(), IndexPicker::Index(-1));
        assert_eq!(IndexPicker::parse(":").unwrap(), IndexPicker::FULL);
        assert_eq!(
            IndexPicker::parse("2:-2").unwrap(),
            IndexPicker::Slice {
                start: Some(2),
                stop: Some(-2),
                step: None
            }
        );
        assert_eq!(
            IndexPicker::parse("::2").unwrap(),
            IndexPicker::Slice {
                start: None,
                stop: None,
                step: Some(2)
            }
        );
        assert!(IndexPicker::parse("::0").is_err());
        assert!(IndexPicker::parse("1:2:3:4").is_err());
        assert!(IndexPicker::parse("a").is_err());
        assert!(IndexPicker::parse("").is_err());
    }

    #[test]
    fn test_get_indices_python_rules() {
        let picker = IndexPicker::parse("2:-2").unwrap();
        assert_eq!(picker.get_indices(10).unwrap(), (2, 8, 1));
        assert_eq!(picker.count(10).unwrap(), 6);

        let picker = IndexPicker::parse("::-1").unwrap();
        assert_eq!(picker.get_indices(5).unwrap(), (4, -1, -1));
        assert_eq!(picker.indices(5).unwrap(), vec![4, 3, 2, 1, 0]);

        let picker = IndexPicker::parse("-100:100").unwrap();
        assert_eq!(picker.get_indices(5).unwrap(), (0, 5, 1));

        let picker = IndexPicker::parse("::3").unwrap();
        assert_eq!(picker.indices(10).unwrap(), vec![0, 3, 6, 9]);

        let picker = IndexPicker::parse("5:2").unwrap();
        assert_eq!(picker.count(10).unwrap(), 0);

        let picker = IndexPicker::parse("8:1:-3").unwrap();
        assert_eq!(picker.indices(10).unwrap(), vec![8, 5, 2]);
    }

    #[test]
    fn test_extreme_steps() {
        let picker = IndexPicker::parse("0:5:9223372036854775807").unwrap();
        assert_eq!(picker.count(10).unwrap(), 1);
        assert_eq!(picker.indices(10).unwrap(), vec![0]);

        let picker = IndexPicker::parse("::-9223372036854775808").unwrap();
        assert_eq!(picker.count(10).unwrap(), 1);
        assert_eq!(picker.indices(10).unwrap(), vec![9]);

        let picker = IndexPicker::parse("9223372036854775807:-9223372036854775808:-1").unwrap();
        assert_eq!(picker.count(4).unwrap(), 4);

        let extractor = Extractor::parse(":,1::9223372036854775807").unwrap();
        let result = extractor.apply(linear(&[2, 3]).view()).unwrap();
        assert_eq!(result.shape(), &[2, 1]);
        assert_eq!(result[[1, 0]], 4);
        assert_eq!(
            extractor.get_counts(&Shape::parse("2x3").unwrap()).unwrap(),
            (6, 2)
        );
    }

    #[test]
    fn test_integer_picker() {
        let picker = IndexPicker::Index(-1);
        assert_eq!(picker.resolve_index(4).unwrap(), 3);
        assert_eq!(picker.get_indices(4).unwrap(), (3, 4, 1));
        assert!(IndexPicker::Index(4).resolve_index(4).is_err());
        assert!(IndexPicker::Index(-5).resolve_index(4).is_err());
    }

    #[test]
    fn test_extractor_parse_and_display() {
        let extractor = Extractor::parse("[:, 2:-2, ::2]").unwrap();
        assert_eq!(extractor.rank(), 3);
        assert_eq!(extractor.to_string(), ":,2:-2,::2");
        assert!(Extractor::parse(":,,:").is_err());
    }

    #[test]
    fn test_get_counts() {
        let shape = Shape::parse("8x10x20").unwrap();
        let extractor = Extractor::parse(":,2:-2,:").unwrap();
        assert_eq!(extractor.get_counts(&shape).unwrap(), (1600, 8 * 6 * 20));

        let extractor = Extractor::parse("3,::2,-1").unwrap();
        assert_eq!(extractor.get_counts(&shape).unwrap(), (1600, 5));

        let extractor = Extractor::parse(":,:").unwrap();
        assert!(matches!(
            extractor.get_counts(&shape),
            Err(RuCubeError::RankMismatch {
                extractor: 2,
                shape: 3
            })
        ));
    }

    #[test]
    fn test_split_first() {
        let extractor = Extractor::parse("1,:,::2").unwrap();
        let (first, rest) = extractor.split_first().unwrap();
        assert_eq!(first, IndexPicker::Index(1));
        assert_eq!(rest.to_string(), ":,::2");
        assert!(Extractor::default().split_first().is_none());
    }

    #[test]
    fn test_apply_in_memory() {
        let array = linear(&[3, 4, 5]);
        let extractor = Extractor::parse("1,1:3,::-2").unwrap();
        let result = extractor.apply(array.view()).unwrap();
        assert_eq!(result.shape(), &[2, 3]);
        // [1, 1, 4] = 20 + 5 + 4
        assert_eq!(result[[0, 0]], 29);
        assert_eq!(result[[0, 2]], 25);
        assert_eq!(result[[1, 1]], 32);

        let counts = extractor
            .get_counts(&Shape::parse("3x4x5").unwrap())
            .unwrap();
        assert_eq!(counts.1, result.len());
    }
}

//! Cube shapes
//!
//! A [`Shape`] is an ordered sequence of positive dimensions. It is parsed from
//! literals such as `"3x4x5"`, `"(3, 4, 5)"` or `"3,4,5"` and never mutated.

use crate::dtype::Dtype;
use crate::errors::{Result, RuCubeError};
use std::fmt;
use std::str::FromStr;

/// Ordered sequence of positive dimensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a shape, rejecting zero dimensions
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidShape`] if any dimension is zero or the
    /// cube would not be addressable in bytes.
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if let Some(position) = dims.iter().position(|&d| d == 0) {
            return Err(RuCubeError::InvalidShape {
                spec: format_dims(&dims, "x"),
                reason: format!("dimension {position} is zero"),
            });
        }
        check_byte_size(&dims).map_err(|reason| RuCubeError::InvalidShape {
            spec: format_dims(&dims, "x"),
            reason,
        })?;
        Ok(Self { dims })
    }

    /// Parse a shape literal
    ///
    /// Accepted separators are `x`, `,` and whitespace; surrounding parentheses
    /// or brackets are ignored. `"()"` is the rank-0 shape.
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidShape`] for malformed or non-positive dimensions.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: String| RuCubeError::InvalidShape {
            spec: spec.to_string(),
            reason,
        };

        let body = strip_brackets(spec.trim());
        let mut dims = Vec::new();
        for token in body
            .split(|c: char| c == 'x' || c == 'X' || c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let dim: usize = token
                .parse()
                .map_err(|_| invalid(format!("'{token}' is not a positive integer")))?;
            if dim == 0 {
                return Err(invalid("dimensions must be positive".to_string()));
            }
            dims.push(dim);
        }
        if dims.is_empty() && !body.trim().is_empty() {
            return Err(invalid("no dimensions".to_string()));
        }
        check_byte_size(&dims).map_err(invalid)?;
        Ok(Self { dims })
    }

    /// Number of dimensions
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements; zero for the rank-0 shape
    #[must_use]
    pub fn count(&self) -> usize {
        if self.dims.is_empty() {
            0
        } else {
            self.dims.iter().product()
        }
    }

    /// The dimensions as a slice
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Split off the leading dimension; `None` for the rank-0 shape
    #[must_use]
    pub fn split_first(&self) -> Option<(usize, Shape)> {
        self.dims.split_first().map(|(&first, rest)| {
            (
                first,
                Shape {
                    dims: rest.to_vec(),
                },
            )
        })
    }

    /// Row-major coordinates of a flat element index
    #[must_use]
    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        unravel_index(&self.dims, flat)
    }

    /// Flat element index of row-major coordinates
    #[must_use]
    pub fn ravel(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (&c, &d)| acc * d + c)
    }

    /// Dimensions joined with `x`, as used in filenames
    #[must_use]
    pub fn to_x_string(&self) -> String {
        format_dims(&self.dims, "x")
    }
}

/// Element count times the widest element size must fit in `isize`, so
/// `count()` and every `count() * dtype.size()` are exact.
fn check_byte_size(dims: &[usize]) -> std::result::Result<(), String> {
    dims.iter()
        .try_fold(Dtype::Complex128.size(), |acc, &d| acc.checked_mul(d))
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .map(|_| ())
        .ok_or_else(|| "element count overflows the addressable size".to_string())
}

/// Row-major coordinates of `flat` within `dims`
pub(crate) fn unravel_index(dims: &[usize], mut flat: usize) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    for (coord, &dim) in coords.iter_mut().zip(dims).rev() {
        if dim > 0 {
            *coord = flat % dim;
            flat /= dim;
        }
    }
    coords
}

fn strip_brackets(s: &str) -> &str {
    let s = s.trim();
    for (open, close) in [('(', ')'), ('[', ']')] {
        if let Some(inner) = s.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
            return inner;
        }
    }
    s
}

fn format_dims(dims: &[usize], separator: &str) -> String {
    dims.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

impl FromStr for Shape {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&[usize]> for Shape {
    type Error = RuCubeError;

    fn try_from(dims: &[usize]) -> Result<Self> {
        Self::new(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", format_dims(&self.dims, ", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let expected = vec![3, 4, 5];
        assert_eq!(Shape::parse("3x4x5").unwrap().dims(), &expected[..]);
        assert_eq!(Shape::parse("(3, 4, 5)").unwrap().dims(), &expected[..]);
        assert_eq!(Shape::parse("3,4,5").unwrap().dims(), &expected[..]);
        assert_eq!(Shape::parse("[3 4 5]").unwrap().dims(), &expected[..]);
        assert_eq!(Shape::parse("7").unwrap().dims(), &[7]);
        assert_eq!(Shape::parse("()").unwrap().rank(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Shape::parse("3x0x5").is_err());
        assert!(Shape::parse("3xax5").is_err());
        assert!(Shape::parse("3x-4").is_err());
        assert!(Shape::new(vec![2, 0]).is_err());
    }

    #[test]
    fn test_overflowing_shapes_rejected() {
        let err = Shape::parse("4294967296x4294967296x2").unwrap_err();
        assert!(matches!(err, RuCubeError::InvalidShape { .. }));
        assert!(err.to_string().contains("overflows"));
        assert!(Shape::new(vec![usize::MAX, 2]).is_err());
        // the widest element must stay addressable too
        assert!(Shape::new(vec![isize::MAX as usize / 8]).is_err());
        let largest = Shape::new(vec![isize::MAX as usize / 16]).unwrap();
        assert_eq!(largest.count() * Dtype::Complex128.size(), isize::MAX as usize / 16 * 16);
    }

    #[test]
    fn test_rank_and_count() {
        let shape = Shape::parse("3x4x5").unwrap();
        assert_eq!(shape.rank(), 3);
        assert_eq!(shape.count(), 60);
        assert_eq!(Shape::default().count(), 0);
        assert_eq!(shape.to_string(), "(3, 4, 5)");
        assert_eq!(shape.to_x_string(), "3x4x5");
    }

    #[test]
    fn test_split_first() {
        let shape = Shape::parse("8x10x20").unwrap();
        let (first, rest) = shape.split_first().unwrap();
        assert_eq!(first, 8);
        assert_eq!(rest.dims(), &[10, 20]);
        assert!(Shape::default().split_first().is_none());
    }

    #[test]
    fn test_ravel_unravel() {
        let shape = Shape::parse("3x4x5").unwrap();
        assert_eq!(shape.unravel(59), vec![2, 3, 4]);
        assert_eq!(shape.unravel(0), vec![0, 0, 0]);
        assert_eq!(shape.ravel(&[1, 2, 3]), 1 * 20 + 2 * 5 + 3);
        for flat in 0..shape.count() {
            assert_eq!(shape.ravel(&shape.unravel(flat)), flat);
        }
    }
}

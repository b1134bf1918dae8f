//! Splitting a cube into lower-rank subcubes
//!
//! [`Split`] walks every index combination over the chosen dimensions, the
//! last listed dimension varying fastest, and yields the subcube obtained by
//! fixing those dimensions together with its [`Labels`].

use crate::cube::{map_cube, Cube};
use crate::errors::{Result, RuCubeError};
use ndarray::Axis;
use std::fmt;

/// Ordered `d{i} -> index` map naming one subcube
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Labels {
    entries: Vec<(String, usize)>,
}

impl Labels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label
    pub fn push(&mut self, name: impl Into<String>, index: usize) {
        self.entries.push((name.into(), index));
    }

    /// Index recorded under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|&(_, index)| index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(key, index)| (key.as_str(), *index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(key, index)| format!("{key}={index}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Iterator over the subcubes of a split
#[derive(Debug)]
pub struct Split<'a> {
    cube: &'a Cube,
    dims: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl<'a> Split<'a> {
    /// Prepare a split of `cube` along `dims`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::DimensionOutOfRange`] for a dimension beyond the
    /// cube rank and [`RuCubeError::InvalidArgument`] for repeated dimensions.
    pub fn new(cube: &'a Cube, dims: &[usize]) -> Result<Self> {
        let rank = cube.rank();
        for (position, &dim) in dims.iter().enumerate() {
            if dim >= rank {
                return Err(RuCubeError::DimensionOutOfRange { dim, rank });
            }
            if dims[..position].contains(&dim) {
                return Err(RuCubeError::InvalidArgument(format!(
                    "dimension {dim} listed twice in split"
                )));
            }
        }
        let empty = dims.iter().any(|&dim| cube.shape()[dim] == 0);
        Ok(Self {
            cube,
            dims: dims.to_vec(),
            next: (!empty).then(|| vec![0; dims.len()]),
        })
    }

    /// Number of subcubes the whole split produces
    #[must_use]
    pub fn subcube_count(&self) -> usize {
        self.dims.iter().map(|&dim| self.cube.shape()[dim]).product()
    }

    fn labels(&self, indices: &[usize]) -> Labels {
        let mut labels = Labels::new();
        for (&dim, &index) in self.dims.iter().zip(indices) {
            labels.push(format!("d{dim}"), index);
        }
        labels
    }

    fn subcube(&self, indices: &[usize]) -> Cube {
        let mut fixed: Vec<(usize, usize)> = self
            .dims
            .iter()
            .copied()
            .zip(indices.iter().copied())
            .collect();
        // remove higher axes first so lower axis numbers stay valid
        fixed.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        map_cube!(self.cube, a => {
            let mut view = a.view();
            for &(axis, index) in &fixed {
                view = view.index_axis_move(Axis(axis), index);
            }
            view.to_owned().into()
        })
    }

    fn advance(&mut self) {
        let Some(indices) = self.next.as_mut() else {
            return;
        };
        for position in (0..indices.len()).rev() {
            indices[position] += 1;
            if indices[position] < self.cube.shape()[self.dims[position]] {
                return;
            }
            indices[position] = 0;
        }
        self.next = None;
    }
}

impl Iterator for Split<'_> {
    type Item = (Cube, Labels);

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.next.clone()?;
        let item = (self.subcube(&indices), self.labels(&indices));
        self.advance();
        Some(item)
    }
}

impl Cube {
    /// Split along `dims`; an empty list yields the cube once
    ///
    /// # Errors
    ///
    /// Same conditions as [`Split::new`].
    pub fn split(&self, dims: &[usize]) -> Result<Split<'_>> {
        Split::new(self, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::join;

    fn linear(dims: &[usize]) -> Cube {
        let count: usize = dims.iter().product();
        Cube::from_vec(dims, (0..count as i32).collect()).unwrap()
    }

    #[test]
    fn test_split_single_dimension() {
        let cube = linear(&[8, 5, 20]);
        let split = cube.split(&[1]).unwrap();
        assert_eq!(split.subcube_count(), 5);
        let parts: Vec<_> = split.collect();
        assert_eq!(parts.len(), 5);
        for (i, (sub, labels)) in parts.iter().enumerate() {
            assert_eq!(sub.shape(), &[8, 20]);
            assert_eq!(labels.get("d1"), Some(i));
            assert_eq!(sub, &cube.index_axis(1, i).unwrap());
        }
    }

    #[test]
    fn test_split_order_is_row_major_over_listed_dims() {
        let cube = linear(&[2, 3, 4]);
        let labels: Vec<String> = cube
            .split(&[2, 0])
            .unwrap()
            .map(|(_, labels)| labels.to_string())
            .collect();
        assert_eq!(labels.len(), 8);
        assert_eq!(labels[0], "{d2=0, d0=0}");
        assert_eq!(labels[1], "{d2=0, d0=1}");
        assert_eq!(labels[2], "{d2=1, d0=0}");

        let (sub, _) = cube.split(&[2, 0]).unwrap().nth(3).unwrap();
        // d2=1, d0=1: elements [1, j, 1]
        assert_eq!(sub.to_vec::<i32>().unwrap(), vec![13, 17, 21]);
    }

    #[test]
    fn test_split_nothing_yields_cube() {
        let cube = linear(&[2, 2]);
        let parts: Vec<_> = cube.split(&[]).unwrap().collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].0, cube);
        assert!(parts[0].1.is_empty());
    }

    #[test]
    fn test_split_then_join_round_trips() {
        let cube = linear(&[5, 8, 20]);
        let parts: Vec<Cube> = cube.split(&[0]).unwrap().map(|(sub, _)| sub).collect();
        assert_eq!(join(&parts).unwrap(), cube);
    }

    #[test]
    fn test_split_errors() {
        let cube = linear(&[2, 2]);
        assert!(matches!(
            cube.split(&[2]),
            Err(RuCubeError::DimensionOutOfRange { dim: 2, rank: 2 })
        ));
        assert!(cube.split(&[1, 1]).is_err());
    }
}

//! In-memory cubes
//!
//! A [`Cube`] is a homogeneous N-dimensional array whose element type is only
//! known at runtime. Each variant wraps an [`ndarray::ArrayD`] of the matching
//! Rust type; generic code goes through [`Element`] and the `map_cube!` macro.

use crate::dtype::{Dtype, Element};
use crate::errors::{Result, RuCubeError};
use crate::extractor::Extractor;
use half::f16;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use num_complex::{Complex32, Complex64};
use std::fmt;

/// Homogeneous N-dimensional array of a runtime element type
#[derive(Debug, Clone, PartialEq)]
pub enum Cube {
    Bool(ArrayD<bool>),
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    UInt8(ArrayD<u8>),
    UInt16(ArrayD<u16>),
    UInt32(ArrayD<u32>),
    UInt64(ArrayD<u64>),
    Float16(ArrayD<f16>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Complex64(ArrayD<Complex32>),
    Complex128(ArrayD<Complex64>),
}

/// Evaluate `$body` with `$a` bound to the typed array inside a cube
macro_rules! map_cube {
    ($cube:expr, $a:ident => $body:expr) => {
        match $cube {
            $crate::cube::Cube::Bool($a) => $body,
            $crate::cube::Cube::Int8($a) => $body,
            $crate::cube::Cube::Int16($a) => $body,
            $crate::cube::Cube::Int32($a) => $body,
            $crate::cube::Cube::Int64($a) => $body,
            $crate::cube::Cube::UInt8($a) => $body,
            $crate::cube::Cube::UInt16($a) => $body,
            $crate::cube::Cube::UInt32($a) => $body,
            $crate::cube::Cube::UInt64($a) => $body,
            $crate::cube::Cube::Float16($a) => $body,
            $crate::cube::Cube::Float32($a) => $body,
            $crate::cube::Cube::Float64($a) => $body,
            $crate::cube::Cube::Complex64($a) => $body,
            $crate::cube::Cube::Complex128($a) => $body,
        }
    };
}
pub(crate) use map_cube;

impl<T: Element> From<ArrayD<T>> for Cube {
    fn from(array: ArrayD<T>) -> Self {
        T::into_cube(array)
    }
}

impl Cube {
    /// Build a cube from a flat row-major vector
    ///
    /// # Errors
    ///
    /// Returns an error if `values.len()` does not match the product of `dims`.
    pub fn from_vec<T: Element>(dims: &[usize], values: Vec<T>) -> Result<Self> {
        Ok(ArrayD::from_shape_vec(IxDyn(dims), values)?.into())
    }

    /// Element type
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        fn dtype_of<T: Element>(_: &ArrayD<T>) -> Dtype {
            T::DTYPE
        }
        map_cube!(self, a => dtype_of(a))
    }

    /// Dimensions
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        map_cube!(self, a => a.shape())
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements
    #[must_use]
    pub fn count(&self) -> usize {
        map_cube!(self, a => a.len())
    }

    /// Size of the element payload in bytes
    #[must_use]
    pub fn nbytes(&self) -> usize {
        self.count() * self.dtype().size()
    }

    /// Borrow the typed array, if the element type matches
    #[must_use]
    pub fn array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::cube_array(self)
    }

    /// Borrow the typed array or fail with a dtype mismatch
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::DtypeMismatch`] if the element types differ.
    pub fn expect_array<T: Element>(&self) -> Result<&ArrayD<T>> {
        self.array::<T>().ok_or_else(|| RuCubeError::DtypeMismatch {
            left: T::DTYPE.to_string(),
            right: self.dtype().to_string(),
        })
    }

    /// Elements in row-major order
    #[must_use]
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        self.array::<T>().map(|a| a.iter().copied().collect())
    }

    /// Convert to another element type with `as`-cast semantics
    #[must_use]
    pub fn cast(&self, dtype: Dtype) -> Cube {
        if dtype == self.dtype() {
            return self.clone();
        }
        fn convert<S: Element, T: Element>(array: &ArrayD<S>) -> Cube {
            array.mapv(|v| T::from_scalar(v.to_scalar())).into()
        }
        crate::with_element_type!(dtype, T => map_cube!(self, a => convert::<_, T>(a)))
    }

    /// Apply an extractor in memory
    ///
    /// # Errors
    ///
    /// Returns an error on rank mismatch or out-of-range indices.
    pub fn extract(&self, extractor: &Extractor) -> Result<Cube> {
        map_cube!(self, a => extractor.apply(a.view()).map(Cube::from))
    }

    /// The lower-rank cube obtained by fixing `axis` at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the axis or index is out of range.
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<Cube> {
        let rank = self.rank();
        if axis >= rank {
            return Err(RuCubeError::DimensionOutOfRange { dim: axis, rank });
        }
        let dim = self.shape()[axis];
        if index >= dim {
            return Err(RuCubeError::IndexOutOfRange {
                index: index as isize,
                dim,
            });
        }
        Ok(map_cube!(self, a => a.index_axis(Axis(axis), index).to_owned().into()))
    }

    /// Reshape to new dimensions with the same element count
    ///
    /// # Errors
    ///
    /// Returns an error if the element counts differ.
    pub fn reshape(&self, dims: &[usize]) -> Result<Cube> {
        fn reshape_array<T: Element>(array: &ArrayD<T>, dims: &[usize]) -> Result<Cube> {
            let values: Vec<T> = array.iter().copied().collect();
            Cube::from_vec(dims, values)
        }
        map_cube!(self, a => reshape_array(a, dims))
    }
}

/// Stack equally shaped cubes along a new leading dimension
///
/// # Errors
///
/// Returns an error if `cubes` is empty or if the cubes differ in shape or
/// element type.
pub fn join(cubes: &[Cube]) -> Result<Cube> {
    let first = cubes
        .first()
        .ok_or_else(|| {
            RuCubeError::InvalidArgument("cannot join an empty list of cubes".to_string())
        })?;
    for cube in &cubes[1..] {
        if cube.shape() != first.shape() {
            return Err(RuCubeError::ShapeMismatch {
                left: first.shape().to_vec(),
                right: cube.shape().to_vec(),
            });
        }
    }

    fn stack_all<T: Element>(cubes: &[Cube]) -> Result<Cube> {
        let views: Vec<ArrayViewD<'_, T>> = cubes
            .iter()
            .map(|cube| cube.expect_array::<T>().map(|a| a.view()))
            .collect::<Result<_>>()?;
        Ok(ndarray::stack(Axis(0), &views)?.into())
    }
    crate::with_element_type!(first.dtype(), T => stack_all::<T>(cubes))
}

fn fmt_nested<T: Element>(
    f: &mut fmt::Formatter<'_>,
    view: ArrayViewD<'_, T>,
    depth: usize,
) -> fmt::Result {
    match view.ndim() {
        0 => match view.iter().next() {
            Some(value) => f.write_str(&value.format_token()),
            None => Ok(()),
        },
        1 => {
            let tokens: Vec<String> = view.iter().map(|v| v.format_token()).collect();
            write!(f, "[{}]", tokens.join(" "))
        }
        _ => {
            f.write_str("[")?;
            for (i, sub) in view.outer_iter().enumerate() {
                if i > 0 {
                    let blank_lines = "\n".repeat(view.ndim() - 1);
                    write!(f, "{blank_lines}{}", " ".repeat(depth + 1))?;
                }
                fmt_nested(f, sub, depth + 1)?;
            }
            f.write_str("]")
        }
    }
}

impl fmt::Display for Cube {
    /// Nested-bracket rendering, one innermost row per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        map_cube!(self, a => fmt_nested(f, a.view(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_f32(dims: &[usize]) -> Cube {
        let count: usize = dims.iter().product();
        Cube::from_vec(dims, (0..count).map(|i| i as f32).collect()).unwrap()
    }

    #[test]
    fn test_basic_properties() {
        let cube = linear_f32(&[3, 4, 5]);
        assert_eq!(cube.dtype(), Dtype::Float32);
        assert_eq!(cube.shape(), &[3, 4, 5]);
        assert_eq!(cube.rank(), 3);
        assert_eq!(cube.count(), 60);
        assert_eq!(cube.nbytes(), 240);
        assert!(cube.array::<f64>().is_none());
        assert!(cube.expect_array::<i32>().is_err());
    }

    #[test]
    fn test_cast() {
        let cube = Cube::from_vec(&[4], vec![-1.5_f64, 0.0, 2.7, 300.0]).unwrap();
        let ints = cube.cast(Dtype::Int16);
        assert_eq!(ints.to_vec::<i16>().unwrap(), vec![-1, 0, 2, 300]);
        let bools = cube.cast(Dtype::Bool);
        assert_eq!(bools.to_vec::<bool>().unwrap(), vec![true, false, true, true]);
        let complex = cube.cast(Dtype::Complex128);
        assert_eq!(complex.to_vec::<Complex64>().unwrap()[2], Complex64::new(2.7, 0.0));
    }

    #[test]
    fn test_extract_and_index_axis() {
        let cube = linear_f32(&[3, 4, 5]);
        let sub = cube.extract(&Extractor::parse("1,:,::2").unwrap()).unwrap();
        assert_eq!(sub.shape(), &[4, 3]);
        assert_eq!(sub.to_vec::<f32>().unwrap()[..3], [20.0, 22.0, 24.0]);

        let plane = cube.index_axis(2, 4).unwrap();
        assert_eq!(plane.shape(), &[3, 4]);
        assert_eq!(plane.to_vec::<f32>().unwrap()[0], 4.0);
        assert!(cube.index_axis(3, 0).is_err());
        assert!(cube.index_axis(0, 3).is_err());
    }

    #[test]
    fn test_join() {
        let parts: Vec<Cube> = (0..5)
            .map(|i| Cube::from_vec(&[8, 20], vec![i as f32; 160]).unwrap())
            .collect();
        let joined = join(&parts).unwrap();
        assert_eq!(joined.shape(), &[5, 8, 20]);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(&joined.index_axis(0, i).unwrap(), part);
        }

        let odd = Cube::from_vec(&[8, 21], vec![0.0_f32; 168]).unwrap();
        assert!(matches!(
            join(&[parts[0].clone(), odd]),
            Err(RuCubeError::ShapeMismatch { .. })
        ));
        let other_type = Cube::from_vec(&[8, 20], vec![0_i32; 160]).unwrap();
        assert!(matches!(
            join(&[parts[0].clone(), other_type]),
            Err(RuCubeError::DtypeMismatch { .. })
        ));
        assert!(join(&[]).is_err());
    }

    #[test]
    fn test_display() {
        let cube = Cube::from_vec(&[2, 2], vec![1_i32, 2, 3, 4]).unwrap();
        assert_eq!(cube.to_string(), "[[1 2]\n [3 4]]");
        let cube = Cube::from_vec(&[3], vec![0.5_f32, 1.0, 2.0]).unwrap();
        assert_eq!(cube.to_string(), "[0.5 1 2]");
    }

    #[test]
    fn test_reshape() {
        let cube = linear_f32(&[3, 4]);
        let reshaped = cube.reshape(&[2, 6]).unwrap();
        assert_eq!(reshaped.shape(), &[2, 6]);
        assert!(cube.reshape(&[5]).is_err());
    }
}

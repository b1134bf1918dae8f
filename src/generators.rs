//! Cube constructors
//!
//! In-memory constructors build a [`Cube`] directly. The `write_*` variants
//! produce the same content but stream it to a file in chunks of at most
//! `buffer_size` bytes, so the cube is never held whole.

use crate::cube::Cube;
use crate::dtype::{Dtype, Element};
use crate::errors::{Result, RuCubeError};
use crate::format::{FileFormat, FormatOptions};
use crate::shape::Shape;
use crate::writer::StreamWriter;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use std::path::Path;
use tracing::debug;

fn generate<T: Element>(shape: &Shape, mut value_at: impl FnMut(usize) -> f64) -> Result<Cube> {
    let values: Vec<T> = (0..shape.count()).map(|i| T::from_f64(value_at(i))).collect();
    Ok(ArrayD::from_shape_vec(IxDyn(shape.dims()), values)?.into())
}

fn check_shape(shape: &Shape) -> Result<()> {
    if shape.rank() == 0 {
        return Err(RuCubeError::InvalidShape {
            spec: shape.to_string(),
            reason: "cannot build a rank-0 cube".to_string(),
        });
    }
    Ok(())
}

fn check_range(min: f64, max: f64) -> Result<()> {
    if min < max && (max - min).is_finite() {
        Ok(())
    } else {
        Err(RuCubeError::InvalidArgument(format!(
            "invalid random range [{min}, {max})"
        )))
    }
}

/// Elements form the arithmetic progression `start + i * increment`
///
/// # Errors
///
/// Returns [`RuCubeError::InvalidShape`] for the rank-0 shape.
pub fn linear_cube(shape: &Shape, start: f64, increment: f64, dtype: Dtype) -> Result<Cube> {
    check_shape(shape)?;
    crate::with_element_type!(dtype, T => generate::<T>(shape, |i| start + i as f64 * increment))
}

/// Every element equals `value`
///
/// # Errors
///
/// Returns [`RuCubeError::InvalidShape`] for the rank-0 shape.
pub fn const_cube(shape: &Shape, value: f64, dtype: Dtype) -> Result<Cube> {
    check_shape(shape)?;
    crate::with_element_type!(dtype, T => generate::<T>(shape, |_| value))
}

const MAX_DRAWS: usize = 64;

/// Uniform draw from `[min, max)` that stays below `max` once rounded to `T`
///
/// Draws that round up to `max` are redrawn. Falls back to `min` when the
/// range holds no value of `T` below `max`.
fn draw_below<T: Element, R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    for _ in 0..MAX_DRAWS {
        let value = T::from_f64(rng.gen_range(min..max)).to_f64();
        if value < max {
            return value;
        }
    }
    T::from_f64(min).to_f64()
}

/// Elements drawn uniformly from `[min, max)`
///
/// # Errors
///
/// Returns an error for the rank-0 shape or an empty range.
pub fn random_cube<R: Rng + ?Sized>(
    shape: &Shape,
    min: f64,
    max: f64,
    dtype: Dtype,
    rng: &mut R,
) -> Result<Cube> {
    check_shape(shape)?;
    check_range(min, max)?;
    crate::with_element_type!(dtype, T => {
        generate::<T>(shape, |_| draw_below::<T, R>(&mut *rng, min, max))
    })
}

/// Block value generator behind [`const_blocks_cube`]
///
/// Coordinates along `const_dims` do not affect the value; the remaining
/// coordinates are ranked in row-major order.
struct BlockValues {
    dims: Vec<usize>,
    varying: Vec<bool>,
    start: f64,
    increment: f64,
}

impl BlockValues {
    fn new(shape: &Shape, start: f64, increment: f64, const_dims: &[usize]) -> Result<Self> {
        let rank = shape.rank();
        let mut varying = vec![true; rank];
        for &dim in const_dims {
            if dim >= rank {
                return Err(RuCubeError::DimensionOutOfRange { dim, rank });
            }
            varying[dim] = false;
        }
        Ok(Self {
            dims: shape.dims().to_vec(),
            varying,
            start,
            increment,
        })
    }

    fn value_at(&self, mut flat: usize) -> f64 {
        let mut block = 0;
        let mut stride = 1;
        for (&dim, &varies) in self.dims.iter().zip(&self.varying).rev() {
            let coord = flat % dim;
            flat /= dim;
            if varies {
                block += coord * stride;
                stride *= dim;
            }
        }
        self.start + block as f64 * self.increment
    }
}

/// Constant over each subcube spanned by `const_dims`, incrementing by
/// `increment` from one such subcube to the next in row-major order
///
/// # Errors
///
/// Returns an error for the rank-0 shape or a dimension beyond the rank.
pub fn const_blocks_cube(
    shape: &Shape,
    start: f64,
    increment: f64,
    const_dims: &[usize],
    dtype: Dtype,
) -> Result<Cube> {
    check_shape(shape)?;
    let blocks = BlockValues::new(shape, start, increment, const_dims)?;
    crate::with_element_type!(dtype, T => generate::<T>(shape, |i| blocks.value_at(i)))
}

/// Destination of a streaming constructor
#[derive(Debug, Clone)]
pub struct StreamTarget<'a> {
    pub path: &'a Path,
    pub format: FileFormat,
    pub shape: &'a Shape,
    pub dtype: Dtype,
    /// Upper bound of the bytes produced per chunk
    pub buffer_size: u64,
    pub options: &'a FormatOptions,
}

impl StreamTarget<'_> {
    fn chunk_elements(&self) -> usize {
        let elements = (self.buffer_size / self.dtype.size() as u64).max(1);
        usize::try_from(elements).unwrap_or(usize::MAX)
    }

    fn stream(&self, mut value_at: impl FnMut(usize) -> f64) -> Result<()> {
        fn stream_typed<T: Element>(
            target: &StreamTarget<'_>,
            value_at: &mut dyn FnMut(usize) -> f64,
        ) -> Result<()> {
            let count = target.shape.count();
            let chunk = target.chunk_elements().min(count.max(1));
            let mut writer = StreamWriter::create(
                target.path,
                target.format,
                target.shape.dims(),
                None,
                target.options,
            )?;
            let mut block: Vec<T> = Vec::with_capacity(chunk);
            let mut start = 0;
            while start < count {
                let end = (start + chunk).min(count);
                block.clear();
                block.extend((start..end).map(|i| T::from_f64(value_at(i))));
                writer.write_block(&block)?;
                start = end;
            }
            writer.finish()
        }
        check_shape(self.shape)?;
        debug!(
            path = %self.path.display(),
            format = %self.format,
            shape = %self.shape,
            dtype = %self.dtype,
            chunk_elements = self.chunk_elements(),
            "streaming cube"
        );
        crate::with_element_type!(self.dtype, T => stream_typed::<T>(self, &mut value_at))
    }
}

/// Streaming counterpart of [`linear_cube`]
///
/// # Errors
///
/// Propagates shape and I/O errors.
pub fn write_linear_cube(target: &StreamTarget<'_>, start: f64, increment: f64) -> Result<()> {
    target.stream(|i| start + i as f64 * increment)
}

/// Streaming counterpart of [`const_cube`]
///
/// # Errors
///
/// Propagates shape and I/O errors.
pub fn write_const_cube(target: &StreamTarget<'_>, value: f64) -> Result<()> {
    target.stream(|_| value)
}

/// Streaming counterpart of [`random_cube`]; draws the same sequence from `rng`
///
/// # Errors
///
/// Propagates shape, range and I/O errors.
pub fn write_random_cube<R: Rng + ?Sized>(
    target: &StreamTarget<'_>,
    min: f64,
    max: f64,
    rng: &mut R,
) -> Result<()> {
    check_range(min, max)?;
    let dtype = target.dtype;
    target.stream(|_| {
        crate::with_element_type!(dtype, T => draw_below::<T, R>(&mut *rng, min, max))
    })
}

/// Streaming counterpart of [`const_blocks_cube`]
///
/// # Errors
///
/// Propagates shape, dimension and I/O errors.
pub fn write_const_blocks_cube(
    target: &StreamTarget<'_>,
    start: f64,
    increment: f64,
    const_dims: &[usize],
) -> Result<()> {
    let blocks = BlockValues::new(target.shape, start, increment, const_dims)?;
    target.stream(|i| blocks.value_at(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Scalar;
    use crate::format::decode_raw;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    #[test]
    fn test_linear_cube() {
        let shape = Shape::parse("3x4x5").unwrap();
        let cube = linear_cube(&shape, 0.0, 1.0, Dtype::Float32).unwrap();
        assert_eq!(cube.dtype(), Dtype::Float32);
        assert_eq!(cube.shape(), &[3, 4, 5]);
        let values = cube.to_vec::<f32>().unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[59], 59.0);
        assert_eq!(cube.stats().sum(), Scalar::Float(1770.0));

        let cube = linear_cube(&shape, 10.0, -2.0, Dtype::Int16).unwrap();
        assert_eq!(cube.to_vec::<i16>().unwrap()[..3], [10, 8, 6]);
    }

    #[test]
    fn test_const_cube() {
        let shape = Shape::parse("2x2").unwrap();
        let cube = const_cube(&shape, 7.0, Dtype::UInt8).unwrap();
        assert_eq!(cube.to_vec::<u8>().unwrap(), vec![7; 4]);
    }

    #[test]
    fn test_random_cube_is_seeded_and_bounded() {
        let shape = Shape::parse("6x4x5").unwrap();
        let draw = |seed| {
            random_cube(&shape, 0.0, 1.0, Dtype::Float32, &mut StdRng::seed_from_u64(seed)).unwrap()
        };
        let (a, b) = (draw(100), draw(100));
        assert_eq!(a, b);
        assert!(a
            .to_vec::<f32>()
            .unwrap()
            .iter()
            .all(|&v| (0.0..1.0).contains(&v)));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(random_cube(&shape, 1.0, 1.0, Dtype::Float32, &mut rng).is_err());
    }

    #[test]
    fn test_random_draws_never_round_up_to_max() {
        let shape = Shape::parse("1000").unwrap();
        // one ulp below 1.0: about half the f64 draws round up to 1.0
        let below = 1.0 - 0.5f64.powi(24);
        let mut rng = StdRng::seed_from_u64(7);
        let cube = random_cube(&shape, below, 1.0, Dtype::Float32, &mut rng).unwrap();
        assert!(cube.to_vec::<f32>().unwrap().iter().all(|&v| f64::from(v) == below));

        let below = 1.0 - 0.5f64.powi(11);
        let cube = random_cube(&shape, below, 1.0, Dtype::Float16, &mut rng).unwrap();
        assert!(cube
            .to_vec::<half::f16>()
            .unwrap()
            .iter()
            .all(|&v| v.to_f64() == below));

        let dir = tempdir().unwrap();
        let path = dir.path().join("random.raw");
        let options = FormatOptions::default();
        let target = StreamTarget {
            path: &path,
            format: FileFormat::Raw,
            shape: &shape,
            dtype: Dtype::Float32,
            buffer_size: 256,
            options: &options,
        };
        let below = 1.0 - 0.5f64.powi(24);
        write_random_cube(&target, below, 1.0, &mut rng).unwrap();
        let values: Vec<f32> = decode_raw(&std::fs::read(&path).unwrap());
        assert!(values.iter().all(|&v| v < 1.0));
    }

    #[test]
    fn test_const_blocks_cube() {
        let shape = Shape::parse("2x3x2").unwrap();
        let cube = const_blocks_cube(&shape, 1.0, 1.0, &[1], Dtype::Int32).unwrap();
        // value depends on (d0, d2) only
        assert_eq!(
            cube.to_vec::<i32>().unwrap(),
            vec![1, 2, 1, 2, 1, 2, 3, 4, 3, 4, 3, 4]
        );
        assert!(const_blocks_cube(&shape, 0.0, 1.0, &[3], Dtype::Int32).is_err());

        let all_const = const_blocks_cube(&shape, 5.0, 1.0, &[0, 1, 2], Dtype::Int32).unwrap();
        assert_eq!(all_const.to_vec::<i32>().unwrap(), vec![5; 12]);
    }

    #[test]
    fn test_streaming_writers_match_in_memory() {
        let dir = tempdir().unwrap();
        let shape = Shape::parse("7x11").unwrap();
        let options = FormatOptions::default();

        let path = dir.path().join("linear.raw");
        let target = StreamTarget {
            path: &path,
            format: FileFormat::Raw,
            shape: &shape,
            dtype: Dtype::Float64,
            buffer_size: 40,
            options: &options,
        };
        write_linear_cube(&target, 1.0, 0.5).unwrap();
        let expected = linear_cube(&shape, 1.0, 0.5, Dtype::Float64).unwrap();
        let written = decode_raw::<f64>(&std::fs::read(&path).unwrap());
        assert_eq!(written, expected.to_vec::<f64>().unwrap());

        let path = dir.path().join("random.raw");
        let target = StreamTarget {
            path: &path,
            ..target
        };
        write_random_cube(&target, -1.0, 1.0, &mut StdRng::seed_from_u64(3)).unwrap();
        let expected =
            random_cube(&shape, -1.0, 1.0, Dtype::Float64, &mut StdRng::seed_from_u64(3)).unwrap();
        let written = decode_raw::<f64>(&std::fs::read(&path).unwrap());
        assert_eq!(written, expected.to_vec::<f64>().unwrap());

        let path = dir.path().join("blocks.txt");
        let target = StreamTarget {
            path: &path,
            format: FileFormat::Text,
            dtype: Dtype::Int32,
            ..target
        };
        write_const_blocks_cube(&target, 0.0, 1.0, &[1]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 7);
        assert_eq!(text.lines().nth(2).unwrap(), "2 2 2 2 2 2 2 2 2 2 2");
    }
}

//! Out-of-core cube reader
//!
//! For `raw` files the extractor is applied while streaming: the reader
//! recurses on the leading dimension, seeks over unselected slabs and only
//! reads the selected elements. Once a sub-problem is small enough (at most
//! `min_size` bytes) or selects everything, it is read in one piece and the
//! extractor applied in memory. The file pointer always ends exactly at the
//! end of the cube, so consecutive reads from one handle compose.
//!
//! `csv` and `text` files are parsed in full and extracted in memory.

use crate::cube::Cube;
use crate::dtype::{Dtype, Element};
use crate::errors::{Result, RuCubeError};
use crate::extractor::{Extractor, IndexPicker};
use crate::format::{decode_raw, parse_elements, FileFormat, FormatOptions};
use crate::shape::Shape;
use ndarray::{ArrayD, Axis, IxDyn};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// Default threshold below which sub-problems are read whole
pub const DEFAULT_MIN_SIZE: u64 = 1024 * 1024;

/// Knobs for [`read_cube`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Byte offset of the cube inside the file
    pub offset: Option<u64>,
    /// Sub-problems of at most this many bytes are read in one piece
    pub min_size: u64,
    /// Downgrade a longer-than-expected file to a warning
    pub accept_bigger_files: bool,
    pub format: FormatOptions,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            offset: None,
            min_size: DEFAULT_MIN_SIZE,
            accept_bigger_files: false,
            format: FormatOptions::default(),
        }
    }
}

impl ReadOptions {
    /// Whether a surplus after the cube is tolerated; always the case with an
    /// explicit offset
    #[must_use]
    pub fn accepts_bigger_files(&self) -> bool {
        self.accept_bigger_files || self.offset.is_some()
    }

    fn min_count(&self, dtype: Dtype) -> usize {
        let count = self.min_size / dtype.size() as u64;
        usize::try_from(count).unwrap_or(usize::MAX).max(1)
    }
}

/// `Read + Seek` adapter that records how many bytes were read and how many
/// seeks were issued
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    bytes_read: u64,
    seeks: u64,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
            seeks: 0,
        }
    }

    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    #[must_use]
    pub fn seeks(&self) -> u64 {
        self.seeks
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seeks += 1;
        self.inner.seek(pos)
    }
}

/// Read a cube from `path`, optionally applying an extractor
///
/// # Errors
///
/// Returns structural errors for rank mismatches and bad pickers,
/// [`RuCubeError::Truncated`] for short files and [`RuCubeError::TooLong`] for
/// long files unless they are accepted.
pub fn read_cube(
    path: &Path,
    format: FileFormat,
    shape: &Shape,
    dtype: Dtype,
    extractor: Option<&Extractor>,
    options: &ReadOptions,
) -> Result<Cube> {
    if shape.rank() == 0 {
        return Err(RuCubeError::InvalidShape {
            spec: shape.to_string(),
            reason: "cannot read a rank-0 cube".to_string(),
        });
    }
    if let Some(extractor) = extractor {
        extractor.check_rank(shape.rank())?;
    }
    debug!(
        path = %path.display(),
        %format,
        %shape,
        %dtype,
        extractor = %extractor.map(ToString::to_string).unwrap_or_default(),
        "reading cube"
    );
    match format {
        FileFormat::Raw => read_raw_cube(path, shape, dtype, extractor, options),
        FileFormat::Csv | FileFormat::Text => {
            if options.offset.is_some() {
                return Err(RuCubeError::InvalidArgument(format!(
                    "offset is only supported for raw files, not {format}"
                )));
            }
            let content = std::fs::read_to_string(path)?;
            crate::with_element_type!(dtype, T => {
                read_text_cube::<T>(path, &content, format, shape, extractor, options)
                    .map(Cube::from)
            })
        }
    }
}

fn read_raw_cube(
    path: &Path,
    shape: &Shape,
    dtype: Dtype,
    extractor: Option<&Extractor>,
    options: &ReadOptions,
) -> Result<Cube> {
    let file = File::open(path)?;
    let actual = file.metadata()?.len();
    let offset = options.offset.unwrap_or(0);
    let expected = offset
        .checked_add((shape.count() * dtype.size()) as u64)
        .ok_or_else(|| {
            RuCubeError::InvalidArgument(format!("offset {offset} is past any file size"))
        })?;
    if actual < expected {
        return Err(RuCubeError::Truncated {
            path: path.to_path_buf(),
            expected,
            actual,
            unit: "bytes",
        });
    }
    if actual > expected {
        if !options.accepts_bigger_files() {
            return Err(RuCubeError::TooLong {
                path: path.to_path_buf(),
                expected,
                actual,
                unit: "bytes",
            });
        }
        warn!(
            path = %path.display(),
            expected,
            actual,
            "file longer than expected, ignoring trailing bytes"
        );
    }

    let mut reader = CountingReader::new(file);
    if offset > 0 {
        reader.seek(SeekFrom::Start(offset))?;
    }
    let min_count = options.min_count(dtype);
    let cube = crate::with_element_type!(dtype, T => {
        read_raw_extracted::<T, _>(&mut reader, shape, extractor, min_count).map(Cube::from)
    })
    .map_err(|e| match e {
        RuCubeError::Io(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
            RuCubeError::Truncated {
                path: path.to_path_buf(),
                expected,
                actual,
                unit: "bytes",
            }
        }
        other => other,
    })?;
    debug!(
        bytes_read = reader.bytes_read(),
        seeks = reader.seeks(),
        result_shape = ?cube.shape(),
        "cube read"
    );
    Ok(cube)
}

fn read_text_cube<T: Element>(
    path: &Path,
    content: &str,
    format: FileFormat,
    shape: &Shape,
    extractor: Option<&Extractor>,
    options: &ReadOptions,
) -> Result<ArrayD<T>> {
    let mut values: Vec<T> = parse_elements(content, format, &options.format)?;
    let expected = shape.count();
    let actual = values.len();
    if actual < expected {
        return Err(RuCubeError::Truncated {
            path: path.to_path_buf(),
            expected: expected as u64,
            actual: actual as u64,
            unit: "elements",
        });
    }
    if actual > expected {
        if !options.accepts_bigger_files() {
            return Err(RuCubeError::TooLong {
                path: path.to_path_buf(),
                expected: expected as u64,
                actual: actual as u64,
                unit: "elements",
            });
        }
        warn!(
            path = %path.display(),
            expected,
            actual,
            "file longer than expected, ignoring trailing elements"
        );
        values.truncate(expected);
    }
    let array = ArrayD::from_shape_vec(IxDyn(shape.dims()), values)?;
    match extractor {
        Some(extractor) => extractor.apply(array.view()),
        None => Ok(array),
    }
}

/// Read one cube of `shape` from the current position of `reader`
///
/// On success exactly `shape.count()` elements worth of bytes have been
/// consumed (read or skipped); only the selected ones are actually read once
/// the recursion goes below `min_count` elements.
///
/// # Errors
///
/// Returns extractor errors and I/O failures, including `UnexpectedEof` for
/// short input.
pub fn read_raw_extracted<T: Element, R: Read + Seek>(
    reader: &mut R,
    shape: &Shape,
    extractor: Option<&Extractor>,
    min_count: usize,
) -> Result<ArrayD<T>> {
    let Some(extractor) = extractor else {
        return read_full(reader, shape);
    };
    let (total, sub) = extractor.get_counts(shape)?;
    if shape.rank() <= 1 || sub == total || total <= min_count {
        let full = read_full::<T, _>(reader, shape)?;
        return extractor.apply(full.view());
    }

    let (Some((d0, sub_shape)), Some((p0, sub_extractor))) =
        (shape.split_first(), extractor.split_first())
    else {
        return Err(RuCubeError::RankMismatch {
            extractor: extractor.rank(),
            shape: shape.rank(),
        });
    };
    let slab = (sub_shape.count() * T::DTYPE.size()) as u64;

    match p0 {
        IndexPicker::Index(_) => {
            let k = p0.resolve_index(d0)?;
            skip(reader, k as u64 * slab)?;
            let part = read_raw_extracted(reader, &sub_shape, Some(&sub_extractor), min_count)?;
            skip(reader, (d0 - k - 1) as u64 * slab)?;
            Ok(part)
        }
        IndexPicker::Slice { .. } => {
            let (_, _, step) = p0.get_indices(d0)?;
            let mut indices = p0.indices(d0)?;
            if step < 0 {
                indices.reverse();
            }

            let mut parts = Vec::with_capacity(indices.len());
            let mut position = 0;
            for &index in &indices {
                skip(reader, (index - position) as u64 * slab)?;
                parts.push(read_raw_extracted::<T, R>(
                    reader,
                    &sub_shape,
                    Some(&sub_extractor),
                    min_count,
                )?);
                position = index + 1;
            }
            skip(reader, (d0 - position) as u64 * slab)?;

            if step < 0 {
                parts.reverse();
            }
            if parts.is_empty() {
                let dims = extractor.result_dims(shape.dims())?;
                return Ok(ArrayD::from_shape_vec(IxDyn(&dims), Vec::new())?);
            }
            let views: Vec<_> = parts.iter().map(|part| part.view()).collect();
            Ok(ndarray::stack(Axis(0), &views)?)
        }
    }
}

fn read_full<T: Element, R: Read>(reader: &mut R, shape: &Shape) -> Result<ArrayD<T>> {
    let mut bytes = vec![0u8; shape.count() * T::DTYPE.size()];
    reader.read_exact(&mut bytes)?;
    Ok(ArrayD::from_shape_vec(
        IxDyn(shape.dims()),
        decode_raw(&bytes),
    )?)
}

fn skip<R: Seek>(reader: &mut R, bytes: u64) -> Result<()> {
    if bytes > 0 {
        let delta = i64::try_from(bytes)
            .map_err(|_| RuCubeError::InvalidArgument(format!("seek of {bytes} bytes")))?;
        reader.seek(SeekFrom::Current(delta))?;
    }
    Ok(())
}

//! Cube writers
//!
//! [`write_cube`] stores an in-memory cube; [`StreamWriter`] accepts elements
//! block by block so that producers never hold a whole cube.

use crate::cube::{map_cube, Cube};
use crate::dtype::{Dtype, Element};
use crate::errors::Result;
use crate::format::{Encoder, FileFormat, FormatOptions};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Elements encoded per block when writing an in-memory cube
const WRITE_BLOCK_ELEMENTS: usize = 64 * 1024;

/// Open `path` for writing
///
/// Without an offset the file is created or truncated. With an offset the
/// existing content is kept and writing starts at that byte position.
fn open_output(path: &Path, offset: Option<u64>) -> Result<BufWriter<File>> {
    let file = match offset {
        None => File::create(path)?,
        Some(offset) => {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;
            file.seek(SeekFrom::Start(offset))?;
            file
        }
    };
    Ok(BufWriter::new(file))
}

/// Block-wise writer for one cube
pub struct StreamWriter<'a> {
    out: BufWriter<File>,
    encoder: Encoder<'a>,
}

impl<'a> StreamWriter<'a> {
    /// Open `path` for a cube with dimensions `dims`
    ///
    /// # Errors
    ///
    /// Propagates failures to open or seek the file.
    pub fn create(
        path: &Path,
        format: FileFormat,
        dims: &[usize],
        offset: Option<u64>,
        options: &'a FormatOptions,
    ) -> Result<Self> {
        Ok(Self {
            out: open_output(path, offset)?,
            encoder: Encoder::new(format, options, dims),
        })
    }

    /// Append a block of elements
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_block<T: Element>(&mut self, block: &[T]) -> Result<()> {
        self.encoder.write_block(block, &mut self.out)
    }

    /// Number of elements written so far
    #[must_use]
    pub fn written(&self) -> usize {
        self.encoder.written()
    }

    /// Terminate and flush the output
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn finish(mut self) -> Result<()> {
        self.encoder.finish(&mut self.out)
    }
}

/// Write a cube, optionally converting it to `dtype` first
///
/// # Errors
///
/// Propagates I/O failures.
pub fn write_cube(
    cube: &Cube,
    path: &Path,
    format: FileFormat,
    dtype: Option<Dtype>,
    offset: Option<u64>,
    options: &FormatOptions,
) -> Result<()> {
    let converted;
    let cube = match dtype {
        Some(dtype) if dtype != cube.dtype() => {
            converted = cube.cast(dtype);
            &converted
        }
        _ => cube,
    };
    debug!(
        path = %path.display(),
        %format,
        dtype = %cube.dtype(),
        shape = ?cube.shape(),
        offset,
        "writing cube"
    );
    let mut writer = StreamWriter::create(path, format, cube.shape(), offset, options)?;
    map_cube!(cube, array => {
        let mut block = Vec::with_capacity(WRITE_BLOCK_ELEMENTS.min(array.len()));
        for &value in array {
            block.push(value);
            if block.len() == WRITE_BLOCK_ELEMENTS {
                writer.write_block(&block)?;
                block.clear();
            }
        }
        if !block.is_empty() {
            writer.write_block(&block)?;
        }
    });
    writer.finish()
}

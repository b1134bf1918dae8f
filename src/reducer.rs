//! Block reducer
//!
//! Scans one or more raw files holding cubes of the same shape and dtype in
//! lockstep, `buffer_elements` at a time, and folds every block set into an
//! aggregate. Each element is seen exactly once and every file is read
//! strictly forward.

use crate::dtype::Element;
use crate::errors::{Result, RuCubeError};
use crate::format::decode_raw_into;
use crate::shape::Shape;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default per-step working set
pub const DEFAULT_BUFFER_SIZE: u64 = 64 * 1024 * 1024;

/// Default progress reporting interval, as a fraction of the cube
pub const DEFAULT_PROGRESS_FRACTION: f64 = 0.25;

/// Position of one block within the scanned cube
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    /// Zero-based step number
    pub step: usize,
    /// Flat index of the first element of the block
    pub offset: usize,
    /// Number of elements in the block
    pub len: usize,
    /// Number of elements in the whole cube
    pub total_count: usize,
}

impl BlockContext {
    /// Elements processed once this block is folded
    #[must_use]
    pub fn done(&self) -> usize {
        self.offset + self.len
    }

    /// Completed fraction once this block is folded
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total_count == 0 {
            1.0
        } else {
            self.done() as f64 / self.total_count as f64
        }
    }
}

/// Chunked lockstep scanner
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReducer {
    buffer_size: u64,
    max_memory: Option<u64>,
    progress_fraction: f64,
    accept_bigger_files: bool,
}

impl Default for BlockReducer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl BlockReducer {
    #[must_use]
    pub fn new(buffer_size: u64) -> Self {
        Self {
            buffer_size,
            max_memory: None,
            progress_fraction: DEFAULT_PROGRESS_FRACTION,
            accept_bigger_files: false,
        }
    }

    /// Cap the working set across all files
    #[must_use]
    pub fn with_max_memory(mut self, max_memory: Option<u64>) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Report progress each time this fraction of the cube is completed
    #[must_use]
    pub fn with_progress_fraction(mut self, fraction: f64) -> Self {
        self.progress_fraction = fraction;
        self
    }

    /// Warn instead of failing when data remains after the cube
    #[must_use]
    pub fn with_accept_bigger_files(mut self, accept: bool) -> Self {
        self.accept_bigger_files = accept;
        self
    }

    #[must_use]
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    #[must_use]
    pub fn max_memory(&self) -> Option<u64> {
        self.max_memory
    }

    /// Elements read per file and step
    ///
    /// `max(1, buffer_size / (element_size * files))`, further capped so
    /// that `files * elements * element_size <= max_memory`.
    #[must_use]
    pub fn buffer_elements(&self, element_size: usize, files: usize) -> usize {
        let stride = (element_size * files.max(1)) as u64;
        let mut elements = (self.buffer_size / stride).max(1);
        if let Some(max_memory) = self.max_memory {
            elements = elements.min((max_memory / stride).max(1));
        }
        usize::try_from(elements).unwrap_or(usize::MAX)
    }

    /// Fold every block set of `paths` into `aggregate`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::Truncated`] or [`RuCubeError::TooLong`] when a
    /// file does not hold exactly one cube, and propagates fold errors.
    pub fn run<T, A, F>(&self, paths: &[PathBuf], shape: &Shape, aggregate: A, fold: F) -> Result<A>
    where
        T: Element,
        F: FnMut(&[&[T]], &mut A, &BlockContext) -> Result<()>,
    {
        self.run_with_progress(paths, shape, aggregate, fold, |_, _| {})
    }

    /// Like [`BlockReducer::run`], calling `progress` each time completion
    /// crosses a multiple of the progress fraction and once at the end
    ///
    /// # Errors
    ///
    /// Same conditions as [`BlockReducer::run`].
    pub fn run_with_progress<T, A, F, P>(
        &self,
        paths: &[PathBuf],
        shape: &Shape,
        mut aggregate: A,
        mut fold: F,
        mut progress: P,
    ) -> Result<A>
    where
        T: Element,
        F: FnMut(&[&[T]], &mut A, &BlockContext) -> Result<()>,
        P: FnMut(&A, &BlockContext),
    {
        if paths.is_empty() {
            return Err(RuCubeError::InvalidArgument(
                "block reducer needs at least one input file".to_string(),
            ));
        }
        let element_size = T::DTYPE.size();
        let total_count = shape.count();
        let expected_bytes = (total_count * element_size) as u64;
        let buffer_elements = self.buffer_elements(element_size, paths.len());
        debug!(
            files = paths.len(),
            total_count,
            buffer_elements,
            "starting block reduction"
        );

        let mut inputs = paths
            .iter()
            .map(|path| Input::open(path, expected_bytes))
            .collect::<Result<Vec<_>>>()?;
        let mut bytes = vec![0u8; buffer_elements.min(total_count) * element_size];
        let mut values: Vec<Vec<T>> = vec![Vec::new(); paths.len()];

        let fraction = if self.progress_fraction > 0.0 {
            self.progress_fraction
        } else {
            1.0
        };
        let mut next_report = fraction;
        let mut offset = 0;
        let mut step = 0;
        while offset < total_count {
            let len = buffer_elements.min(total_count - offset);
            let chunk = &mut bytes[..len * element_size];
            for (input, decoded) in inputs.iter_mut().zip(values.iter_mut()) {
                input.read_block(chunk)?;
                decode_raw_into(chunk, decoded);
            }
            let context = BlockContext {
                step,
                offset,
                len,
                total_count,
            };
            let blocks: Vec<&[T]> = values.iter().map(Vec::as_slice).collect();
            fold(&blocks, &mut aggregate, &context)?;

            let done = context.progress();
            if context.done() == total_count {
                progress(&aggregate, &context);
            } else if done >= next_report {
                progress(&aggregate, &context);
                next_report = ((done / fraction).floor() + 1.0) * fraction;
            }
            offset += len;
            step += 1;
        }

        for input in &mut inputs {
            input.check_exhausted(self.accept_bigger_files)?;
        }
        debug!(steps = step, "block reduction complete");
        Ok(aggregate)
    }
}

/// One scanned file
struct Input {
    path: PathBuf,
    reader: BufReader<File>,
    expected: u64,
    length: u64,
}

impl Input {
    fn open(path: &Path, expected: u64) -> Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            expected,
            length,
        })
    }

    fn read_block(&mut self, chunk: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(chunk) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                Err(RuCubeError::Truncated {
                    path: self.path.clone(),
                    expected: self.expected,
                    actual: self.length,
                    unit: "bytes",
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    fn check_exhausted(&mut self, accept_bigger_files: bool) -> Result<()> {
        let mut probe = [0u8; 1];
        if self.reader.read(&mut probe)? == 0 {
            return Ok(());
        }
        if accept_bigger_files {
            warn!(
                path = %self.path.display(),
                expected = self.expected,
                actual = self.length,
                "file longer than expected, ignoring trailing bytes"
            );
            Ok(())
        } else {
            Err(RuCubeError::TooLong {
                path: self.path.clone(),
                expected: self.expected,
                actual: self.length,
                unit: "bytes",
            })
        }
    }
}

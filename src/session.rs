//! Per-run defaults and budgets
//!
//! A [`Session`] carries what would otherwise be process-wide state: the
//! default element type, the random generator, buffer sizes and the running
//! memory budget of cubes read so far.

use crate::cube::Cube;
use crate::dtype::Dtype;
use crate::errors::{Result, RuCubeError};
use crate::extractor::Extractor;
use crate::format::{FileFormat, FormatOptions};
use crate::generators;
use crate::reader::{self, ReadOptions, DEFAULT_MIN_SIZE};
use crate::reducer::{BlockReducer, DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_FRACTION};
use crate::shape::Shape;
use crate::statistics::DiffOptions;
use crate::units::Memory;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::debug;

/// Defaults shared by the operations of one run
#[derive(Debug, Clone)]
pub struct Session {
    /// Element type used when none is given
    pub dtype: Dtype,
    /// Per-step working set of the block reducer
    pub buffer_size: Memory,
    /// Optional upper envelope of the block reducer working set
    pub max_memory: Option<Memory>,
    /// Optional cap on the cumulative bytes of cubes read
    pub memory_limit: Option<Memory>,
    /// Reader sub-problems up to this size are read whole
    pub min_size: Memory,
    /// Warn instead of failing on files longer than their cube
    pub accept_bigger_files: bool,
    /// Progress reporting interval of the block reducer
    pub progress_fraction: f64,
    pub diff_options: DiffOptions,
    pub format_options: FormatOptions,
    rng: StdRng,
    memory_used: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            dtype: Dtype::default(),
            buffer_size: Memory::from_bytes(DEFAULT_BUFFER_SIZE),
            max_memory: None,
            memory_limit: None,
            min_size: Memory::from_bytes(DEFAULT_MIN_SIZE),
            accept_bigger_files: false,
            progress_fraction: DEFAULT_PROGRESS_FRACTION,
            diff_options: DiffOptions::default(),
            format_options: FormatOptions::default(),
            rng: StdRng::from_entropy(),
            memory_used: 0,
        }
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reseed the random generator for reproducible cubes
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed(seed);
        self
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Bytes charged against the memory limit so far
    #[must_use]
    pub fn memory_used(&self) -> u64 {
        self.memory_used
    }

    /// Return bytes to the budget once a cube has been dropped
    pub fn release(&mut self, bytes: u64) {
        self.memory_used = self.memory_used.saturating_sub(bytes);
    }

    /// Charge `bytes` against the memory limit
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::OutOfMemory`] if the limit would be exceeded; the
    /// budget is left unchanged in that case.
    pub fn reserve(&mut self, bytes: u64) -> Result<()> {
        if let Some(limit) = self.memory_limit {
            let total = self.memory_used.saturating_add(bytes);
            if total > limit.bytes() {
                return Err(RuCubeError::OutOfMemory {
                    requested: bytes,
                    used: self.memory_used,
                    limit: limit.bytes(),
                });
            }
        }
        self.memory_used += bytes;
        Ok(())
    }

    /// Reader options derived from the session
    #[must_use]
    pub fn read_options(&self, offset: Option<u64>) -> ReadOptions {
        ReadOptions {
            offset,
            min_size: self.min_size.bytes(),
            accept_bigger_files: self.accept_bigger_files,
            format: self.format_options.clone(),
        }
    }

    /// Block reducer configured from the session
    #[must_use]
    pub fn reducer(&self) -> BlockReducer {
        BlockReducer::new(self.buffer_size.bytes())
            .with_max_memory(self.max_memory.map(Memory::bytes))
            .with_progress_fraction(self.progress_fraction)
            .with_accept_bigger_files(self.accept_bigger_files)
    }

    /// Read a cube, charging its extracted size against the memory limit first
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::OutOfMemory`] before touching the file when the
    /// budget is exhausted, otherwise the errors of [`reader::read_cube`].
    pub fn read_cube(
        &mut self,
        path: &Path,
        format: FileFormat,
        shape: &Shape,
        dtype: Option<Dtype>,
        extractor: Option<&Extractor>,
        offset: Option<u64>,
    ) -> Result<Cube> {
        let dtype = dtype.unwrap_or(self.dtype);
        let count = match extractor {
            Some(extractor) => extractor.get_counts(shape)?.1,
            None => shape.count(),
        };
        let requested = (count * dtype.size()) as u64;
        self.reserve(requested)?;
        debug!(requested, used = self.memory_used, "memory reserved for read");
        let options = self.read_options(offset);
        reader::read_cube(path, format, shape, dtype, extractor, &options).inspect_err(|_| {
            self.release(requested);
        })
    }

    /// [`generators::linear_cube`] with the session dtype as fallback
    ///
    /// # Errors
    ///
    /// Same conditions as [`generators::linear_cube`].
    pub fn linear_cube(
        &self,
        shape: &Shape,
        start: f64,
        increment: f64,
        dtype: Option<Dtype>,
    ) -> Result<Cube> {
        generators::linear_cube(shape, start, increment, dtype.unwrap_or(self.dtype))
    }

    /// [`generators::const_cube`] with the session dtype as fallback
    ///
    /// # Errors
    ///
    /// Same conditions as [`generators::const_cube`].
    pub fn const_cube(&self, shape: &Shape, value: f64, dtype: Option<Dtype>) -> Result<Cube> {
        generators::const_cube(shape, value, dtype.unwrap_or(self.dtype))
    }

    /// [`generators::random_cube`] drawing from the session generator
    ///
    /// # Errors
    ///
    /// Same conditions as [`generators::random_cube`].
    pub fn random_cube(
        &mut self,
        shape: &Shape,
        min: f64,
        max: f64,
        dtype: Option<Dtype>,
    ) -> Result<Cube> {
        let dtype = dtype.unwrap_or(self.dtype);
        generators::random_cube(shape, min, max, dtype, &mut self.rng)
    }
}

//! RuCube: out-of-core processing of large N-dimensional numeric cubes
//!
//! RuCube reads homogeneous numeric cubes stored as raw binary, CSV or text
//! files, extracts subcubes without loading whole files, folds statistics over
//! files much larger than memory and writes cubes back in any of the three
//! formats.
//!
//! ## Key Features
//!
//! - **Extractors**: Python-style slicing (`":,2:-2,::3"`) with integer picks
//!   collapsing their axis
//! - **Out-of-core reads**: a recursive reader that skips unselected slabs
//!   with forward seeks and only reads what the extractor keeps
//! - **Streaming statistics**: [`StatsInfo`], [`DiffInfo`] and [`Histogram`]
//!   aggregates folded block by block with a bounded buffer
//! - **Split and join**: iterate over the subcubes along chosen dimensions and
//!   name each output through a filename template
//! - **Generators**: linear, constant, random and block-constant cubes, in
//!   memory or streamed to disk
//!
//! ## Module Organization
//!
//! - [`shape`], [`extractor`]: the index algebra
//! - [`dtype`], [`cube`]: runtime element types and in-memory cubes
//! - [`format`], [`reader`], [`writer`]: file formats and I/O
//! - [`reducer`], [`statistics`]: block folding and aggregates
//! - [`split`], [`naming`]: subcube iteration and output names
//! - [`generators`]: cube constructors
//! - [`session`]: per-run defaults and memory budget
//! - [`units`]: memory, time and bandwidth literals
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ru_cube::prelude::*;
//! use std::path::Path;
//!
//! let shape = Shape::parse("8x10x20").unwrap();
//! let extractor = Extractor::parse(":,2:-2,:").unwrap();
//! let mut session = Session::new();
//!
//! let cube = session
//!     .read_cube(Path::new("cube.raw"), FileFormat::Raw, &shape, None, Some(&extractor), None)
//!     .unwrap();
//! println!("{}", cube.stats());
//! ```

pub mod cli;
pub mod cube;
pub mod dtype;
pub mod errors;
pub mod extractor;
pub mod format;
pub mod generators;
pub mod logging;
pub mod naming;
pub mod reader;
pub mod reducer;
pub mod session;
pub mod shape;
pub mod split;
pub mod statistics;
pub mod units;
pub mod writer;

// Direct re-exports for the public API
pub use cube::{join, Cube};
pub use dtype::{Dtype, DtypeKind, Element, Scalar};
pub use errors::{ErrorKind, Result, RuCubeError};
pub use extractor::{Extractor, IndexPicker};
pub use format::{FileFormat, FormatOptions};
pub use generators::{
    const_blocks_cube, const_cube, linear_cube, random_cube, write_const_blocks_cube,
    write_const_cube, write_linear_cube, write_random_cube, StreamTarget,
};
pub use naming::{interpolate_filename, NameContext};
pub use reader::{read_cube, read_raw_extracted, CountingReader, ReadOptions};
pub use reducer::{BlockContext, BlockReducer};
pub use session::Session;
pub use shape::Shape;
pub use split::{Labels, Split};
pub use statistics::{
    diff_files, histogram_file, histogram_lines, stats_file, DiffInfo, DiffOptions, Histogram,
    HistogramMode, StatsInfo,
};
pub use units::{Bandwidth, Memory, Time};
pub use writer::{write_cube, StreamWriter};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::cube::{join, Cube};
    pub use crate::dtype::{Dtype, Element};
    pub use crate::errors::{Result, RuCubeError};
    pub use crate::extractor::{Extractor, IndexPicker};
    pub use crate::format::FileFormat;
    pub use crate::reducer::BlockReducer;
    pub use crate::session::Session;
    pub use crate::shape::Shape;
    pub use crate::statistics::{DiffInfo, DiffOptions, Histogram, HistogramMode, StatsInfo};
    pub use crate::units::Memory;
}

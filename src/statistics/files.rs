//! Out-of-core statistics over raw files
//!
//! These drive a [`BlockReducer`] over one or two files and fold each block
//! into a [`StatsInfo`], [`DiffInfo`] or [`Histogram`].

use super::diff_info::{DiffInfo, DiffOptions};
use super::histogram::Histogram;
use super::stats_info::StatsInfo;
use crate::dtype::{Dtype, Element};
use crate::errors::Result;
use crate::reducer::{BlockContext, BlockReducer};
use crate::shape::Shape;
use std::path::{Path, PathBuf};
use tracing::info;

/// Statistics of the cube stored in a raw file
///
/// # Errors
///
/// Propagates reducer errors, including truncated and oversized files.
pub fn stats_file(
    path: &Path,
    shape: &Shape,
    dtype: Dtype,
    reducer: &BlockReducer,
) -> Result<StatsInfo> {
    stats_file_with_progress(path, shape, dtype, reducer, |_, _| {})
}

/// Like [`stats_file`], reporting partial statistics as the scan progresses
///
/// # Errors
///
/// Same conditions as [`stats_file`].
pub fn stats_file_with_progress<P>(
    path: &Path,
    shape: &Shape,
    dtype: Dtype,
    reducer: &BlockReducer,
    progress: P,
) -> Result<StatsInfo>
where
    P: FnMut(&StatsInfo, &BlockContext),
{
    fn scan<T: Element, P: FnMut(&StatsInfo, &BlockContext)>(
        path: &Path,
        shape: &Shape,
        reducer: &BlockReducer,
        progress: P,
    ) -> Result<StatsInfo> {
        reducer.run_with_progress::<T, _, _, _>(
            &[path.to_path_buf()],
            shape,
            StatsInfo::new(T::DTYPE, shape.dims()),
            |blocks, stats, context| stats.update(blocks[0], context.offset),
            progress,
        )
    }
    info!(path = %path.display(), %shape, %dtype, "computing statistics");
    crate::with_element_type!(dtype, T => scan::<T, P>(path, shape, reducer, progress))
}

/// Difference statistics of the cubes stored in two raw files
///
/// # Errors
///
/// Propagates reducer errors, including truncated and oversized files.
pub fn diff_files(
    left: &Path,
    right: &Path,
    shape: &Shape,
    dtype: Dtype,
    reducer: &BlockReducer,
    options: &DiffOptions,
) -> Result<DiffInfo> {
    diff_files_with_progress(left, right, shape, dtype, reducer, options, |_, _| {})
}

/// Like [`diff_files`], reporting partial statistics as the scan progresses
///
/// # Errors
///
/// Same conditions as [`diff_files`].
pub fn diff_files_with_progress<P>(
    left: &Path,
    right: &Path,
    shape: &Shape,
    dtype: Dtype,
    reducer: &BlockReducer,
    options: &DiffOptions,
    progress: P,
) -> Result<DiffInfo>
where
    P: FnMut(&DiffInfo, &BlockContext),
{
    fn scan<T: Element, P: FnMut(&DiffInfo, &BlockContext)>(
        paths: &[PathBuf],
        shape: &Shape,
        reducer: &BlockReducer,
        options: &DiffOptions,
        progress: P,
    ) -> Result<DiffInfo> {
        reducer.run_with_progress::<T, _, _, _>(
            paths,
            shape,
            DiffInfo::new(T::DTYPE, shape.dims()),
            |blocks, diff, context| diff.update(blocks[0], blocks[1], context.offset, options),
            progress,
        )
    }
    info!(
        left = %left.display(),
        right = %right.display(),
        %shape,
        %dtype,
        "computing difference statistics"
    );
    let paths = [left.to_path_buf(), right.to_path_buf()];
    crate::with_element_type!(dtype, T => scan::<T, P>(&paths, shape, reducer, options, progress))
}

/// Histogram of the cube stored in a raw file
///
/// Without an explicit range a first pass finds the finite min/max.
///
/// # Errors
///
/// Propagates reducer errors and invalid histogram parameters.
pub fn histogram_file(
    path: &Path,
    shape: &Shape,
    dtype: Dtype,
    reducer: &BlockReducer,
    bins: usize,
    range: Option<(f64, f64)>,
) -> Result<Histogram> {
    fn scan<T: Element>(
        path: &Path,
        shape: &Shape,
        reducer: &BlockReducer,
        bins: usize,
        range: Option<(f64, f64)>,
    ) -> Result<Histogram> {
        let paths = [path.to_path_buf()];
        let range = match range {
            Some(range) => range,
            None => reducer.run::<T, _, _>(&paths, shape, None::<(f64, f64)>, |blocks, range, _| {
                for v in blocks[0].iter().map(|v| v.to_f64()).filter(|v| v.is_finite()) {
                    *range = Some(match *range {
                        Some((low, high)) => (f64::min(low, v), f64::max(high, v)),
                        None => (v, v),
                    });
                }
                Ok(())
            })?
            .unwrap_or((0.0, 1.0)),
        };
        reducer.run::<T, _, _>(&paths, shape, Histogram::new(bins, range)?, |blocks, histogram, _| {
            histogram.add(blocks[0].iter().copied());
            Ok(())
        })
    }
    info!(path = %path.display(), %shape, %dtype, bins, "computing histogram");
    crate::with_element_type!(dtype, T => scan::<T>(path, shape, reducer, bins, range))
}

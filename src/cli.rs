//! Command-line interface of the `ru_cube` binary
//!
//! Flags are parsed with `clap` into [`Args`]; [`run`] turns them into a
//! [`Session`] and dispatches the subcommand. Results go to standard output,
//! diagnostics go through `tracing` to standard error.

use crate::cube::{join, Cube};
use crate::dtype::Dtype;
use crate::errors::{Result, RuCubeError};
use crate::extractor::Extractor;
use crate::format::FileFormat;
use crate::generators::{self, StreamTarget};
use crate::naming::{interpolate_filename, NameContext};
use crate::reducer::BlockContext;
use crate::session::Session;
use crate::shape::Shape;
use crate::statistics::{self, DiffOptions, HistogramMode};
use crate::units::Memory;
use crate::writer::write_cube;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

/// Out-of-core tool for large N-dimensional numeric cubes
#[derive(Parser, Debug)]
#[command(
    name = "ru_cube",
    version,
    about = "Extract, reduce, split and generate large numeric cubes"
)]
pub struct Args {
    /// Increase diagnostic verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print the full error chain on failure
    #[arg(long, global = true)]
    pub debug: bool,

    /// Seed of the random generator
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Default element type
    #[arg(short = 't', long, global = true)]
    pub dtype: Option<Dtype>,

    /// Working set of out-of-core reductions, e.g. 64mb
    #[arg(long, global = true)]
    pub buffer_size: Option<Memory>,

    /// Upper bound of the reduction working set over all inputs
    #[arg(long, global = true)]
    pub max_memory: Option<Memory>,

    /// Cap on the cumulative size of cubes read into memory
    #[arg(long, global = true)]
    pub memory_limit: Option<Memory>,

    /// Reader sub-problems up to this size are read in one piece
    #[arg(long, global = true)]
    pub min_size: Option<Memory>,

    /// Warn instead of failing when a file is longer than its cube
    #[arg(long, global = true)]
    pub accept_bigger_files: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Location and layout of an input cube
#[derive(ClapArgs, Debug, Clone)]
pub struct InputArgs {
    /// Cube shape, e.g. 8x10x20
    #[arg(short, long)]
    pub shape: Shape,

    /// Input file format
    #[arg(short, long, default_value = "raw")]
    pub format: FileFormat,

    /// Byte offset of the cube inside the file
    #[arg(long)]
    pub offset: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summary statistics of a cube file
    Stats {
        file: PathBuf,
        #[command(flatten)]
        input: InputArgs,
        /// Print partial statistics while scanning
        #[arg(long)]
        progress: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Difference statistics of two cube files
    Diff {
        left: PathBuf,
        right: PathBuf,
        #[arg(short, long)]
        shape: Shape,
        /// Zero relative differences where max(|l|, |r|) is below this
        #[arg(long)]
        in_threshold: Option<f64>,
        /// Zero relative differences where max(|l|, |r|) is above this
        #[arg(long)]
        out_threshold: Option<f64>,
        /// Lower bound of the relative-difference denominator
        #[arg(long)]
        epsilon: Option<f64>,
        #[arg(long)]
        progress: bool,
        #[arg(long)]
        json: bool,
    },
    /// ASCII histogram of a cube file
    Hist {
        file: PathBuf,
        #[command(flatten)]
        input: InputArgs,
        #[arg(short, long, default_value_t = 10)]
        bins: usize,
        /// Value range as <low>:<high>; defaults to the finite min and max
        #[arg(short, long, value_parser = parse_range)]
        range: Option<(f64, f64)>,
        /// Total line width
        #[arg(long, default_value_t = 80)]
        hlength: usize,
        #[arg(short, long, default_value = "number")]
        mode: HistogramMode,
    },
    /// Read a cube, optionally extract, split and write the parts
    Extract {
        file: PathBuf,
        #[command(flatten)]
        input: InputArgs,
        /// Extractor such as ":,2:-2,:"
        #[arg(short = 'x', long)]
        extractor: Option<Extractor>,
        /// Dimensions of the extracted cube to split along, e.g. 0,2
        #[arg(long, value_delimiter = ',')]
        split: Vec<usize>,
        /// Output filename template, e.g. "out_{d1:02}.{format}"; prints when absent
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long, default_value = "raw")]
        output_format: FileFormat,
        /// Element type to convert to before writing
        #[arg(long)]
        output_dtype: Option<Dtype>,
    },
    /// Stream a generated cube to a file
    Create {
        output: PathBuf,
        #[arg(short, long)]
        shape: Shape,
        #[arg(short, long, value_enum, default_value_t = Generator::Linear)]
        kind: Generator,
        #[arg(short, long, default_value = "raw")]
        format: FileFormat,
        /// First value of linear and const-blocks cubes, value of const cubes
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        #[arg(long, default_value_t = 1.0)]
        increment: f64,
        #[arg(long, default_value_t = 0.0)]
        min: f64,
        #[arg(long, default_value_t = 1.0)]
        max: f64,
        /// Dimensions along which const-blocks cubes stay constant
        #[arg(long, value_delimiter = ',')]
        const_dims: Vec<usize>,
    },
    /// Stack equally shaped cubes along a new leading dimension
    Join {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "raw")]
        output_format: FileFormat,
    },
}

/// Cube generators available to `create`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Linear,
    Const,
    Random,
    ConstBlocks,
}

fn parse_range(s: &str) -> std::result::Result<(f64, f64), String> {
    let (low, high) = s
        .split_once(':')
        .ok_or_else(|| "Invalid format: Expected '<low>:<high>'.".to_string())?;
    let low: f64 = low.trim().parse().map_err(|_| format!("Invalid lower bound '{low}'"))?;
    let high: f64 = high.trim().parse().map_err(|_| format!("Invalid upper bound '{high}'"))?;
    Ok((low, high))
}

impl Args {
    /// Session carrying the global flags
    #[must_use]
    pub fn session(&self) -> Session {
        let mut session = Session::new();
        if let Some(seed) = self.seed {
            session.seed(seed);
        }
        if let Some(dtype) = self.dtype {
            session.dtype = dtype;
        }
        if let Some(buffer_size) = self.buffer_size {
            session.buffer_size = buffer_size;
        }
        if let Some(min_size) = self.min_size {
            session.min_size = min_size;
        }
        session.max_memory = self.max_memory;
        session.memory_limit = self.memory_limit;
        session.accept_bigger_files = self.accept_bigger_files;
        session
    }
}

fn print_progress(context: &BlockContext, report: &dyn std::fmt::Display) {
    println!("[{:6.2}%]", context.progress() * 100.0);
    print!("{report}");
}

/// Execute the parsed command line
///
/// # Errors
///
/// Returns the first error raised by the underlying operation.
pub fn run(args: &Args) -> Result<()> {
    let mut session = args.session();
    match &args.command {
        Command::Stats {
            file,
            input,
            progress,
            json,
        } => {
            let stats = if input.format == FileFormat::Raw && input.offset.is_none() {
                let reducer = session.reducer();
                statistics::stats_file_with_progress(
                    file,
                    &input.shape,
                    session.dtype,
                    &reducer,
                    |stats, context| {
                        if *progress && context.done() < context.total_count {
                            print_progress(context, stats);
                        }
                    },
                )?
            } else {
                session
                    .read_cube(file, input.format, &input.shape, None, None, input.offset)?
                    .stats()
            };
            if *json {
                println!("{:#}", stats.to_json());
            } else {
                print!("{stats}");
            }
        }
        Command::Diff {
            left,
            right,
            shape,
            in_threshold,
            out_threshold,
            epsilon,
            progress,
            json,
        } => {
            let options = DiffOptions {
                epsilon: epsilon.unwrap_or(session.diff_options.epsilon),
                in_threshold: *in_threshold,
                out_threshold: *out_threshold,
            };
            let reducer = session.reducer();
            let diff = statistics::diff_files_with_progress(
                left,
                right,
                shape,
                session.dtype,
                &reducer,
                &options,
                |diff, context| {
                    if *progress && context.done() < context.total_count {
                        print_progress(context, diff);
                    }
                },
            )?;
            if *json {
                println!("{:#}", diff.to_json());
            } else {
                print!("{diff}");
            }
        }
        Command::Hist {
            file,
            input,
            bins,
            range,
            hlength,
            mode,
        } => {
            let histogram = if input.format == FileFormat::Raw && input.offset.is_none() {
                let reducer = session.reducer();
                statistics::histogram_file(
                    file,
                    &input.shape,
                    session.dtype,
                    &reducer,
                    *bins,
                    *range,
                )?
            } else {
                let cube =
                    session.read_cube(file, input.format, &input.shape, None, None, input.offset)?;
                statistics::Histogram::from_cube(&cube, *bins, *range)?
            };
            for line in histogram.format(*hlength, *mode) {
                println!("{line}");
            }
        }
        Command::Extract {
            file,
            input,
            extractor,
            split,
            output,
            output_format,
            output_dtype,
        } => {
            let cube = session.read_cube(
                file,
                input.format,
                &input.shape,
                None,
                extractor.as_ref(),
                input.offset,
            )?;
            for (subcube, labels) in cube.split(split)? {
                match output {
                    Some(template) => {
                        let context = NameContext {
                            shape: subcube.shape(),
                            dtype: output_dtype.unwrap_or(subcube.dtype()),
                            format: *output_format,
                            labels: &labels,
                        };
                        let path = PathBuf::from(interpolate_filename(template, &context)?);
                        write_cube(
                            &subcube,
                            &path,
                            *output_format,
                            *output_dtype,
                            None,
                            &session.format_options,
                        )?;
                        info!(path = %path.display(), %labels, "subcube written");
                    }
                    None => {
                        if !labels.is_empty() {
                            println!("{labels}");
                        }
                        println!("{subcube}");
                    }
                }
            }
        }
        Command::Create {
            output,
            shape,
            kind,
            format,
            start,
            increment,
            min,
            max,
            const_dims,
        } => {
            let options = session.format_options.clone();
            let target = StreamTarget {
                path: output,
                format: *format,
                shape,
                dtype: session.dtype,
                buffer_size: session.buffer_size.bytes(),
                options: &options,
            };
            match kind {
                Generator::Linear => generators::write_linear_cube(&target, *start, *increment)?,
                Generator::Const => generators::write_const_cube(&target, *start)?,
                Generator::Random => {
                    generators::write_random_cube(&target, *min, *max, session.rng())?;
                }
                Generator::ConstBlocks => {
                    generators::write_const_blocks_cube(&target, *start, *increment, const_dims)?;
                }
            }
            info!(path = %output.display(), %shape, ?kind, "cube created");
        }
        Command::Join {
            inputs,
            input,
            output,
            output_format,
        } => {
            let cubes: Vec<Cube> = inputs
                .iter()
                .map(|path| {
                    session.read_cube(path, input.format, &input.shape, None, None, input.offset)
                })
                .collect::<Result<_>>()?;
            let joined = join(&cubes)?;
            write_cube(&joined, output, *output_format, None, None, &session.format_options)?;
            info!(path = %output.display(), shape = ?joined.shape(), "cubes joined");
        }
    }
    Ok(())
}

/// Render an error for the terminal: the kind and message, then with
/// `debug` every underlying cause
#[must_use]
pub fn render_error(error: &RuCubeError, debug: bool) -> String {
    let mut text = format!("error[{}]: {error}", error.kind());
    if debug {
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            text.push_str(&format!("\n  caused by: {cause}"));
            source = std::error::Error::source(cause);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0:1"), Ok((0.0, 1.0)));
        assert_eq!(parse_range(" -2.5 : 3 "), Ok((-2.5, 3.0)));
        assert!(parse_range("0,1").is_err());
        assert!(parse_range("a:1").is_err());
    }

    #[test]
    fn test_global_flags_reach_session() {
        let args = Args::try_parse_from([
            "ru_cube",
            "stats",
            "cube.raw",
            "--shape",
            "3x4x5",
            "-t",
            "int16",
            "--buffer-size",
            "2mb",
            "--memory-limit",
            "1gb",
            "--accept-bigger-files",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        let session = args.session();
        assert_eq!(session.dtype, Dtype::Int16);
        assert_eq!(session.buffer_size, Memory::from_bytes(2 * 1024 * 1024));
        assert_eq!(session.memory_limit, Some(Memory::from_bytes(1024 * 1024 * 1024)));
        assert!(session.accept_bigger_files);
        match args.command {
            Command::Stats { input, .. } => {
                assert_eq!(input.shape.dims(), &[3, 4, 5]);
                assert_eq!(input.format, FileFormat::Raw);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_extract_arguments() {
        let args = Args::try_parse_from([
            "ru_cube",
            "extract",
            "cube.raw",
            "-s",
            "8x10x20",
            "-x",
            ":,::2,:",
            "--split",
            "1",
            "-o",
            "part_{d1}.raw",
        ])
        .unwrap();
        match args.command {
            Command::Extract {
                extractor, split, output, ..
            } => {
                assert_eq!(extractor.unwrap().to_string(), ":,::2,:");
                assert_eq!(split, vec![1]);
                assert_eq!(output.as_deref(), Some("part_{d1}.raw"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_literals_are_rejected() {
        assert!(Args::try_parse_from(["ru_cube", "stats", "f", "-s", "3x0"]).is_err());
        assert!(
            Args::try_parse_from(["ru_cube", "stats", "f", "-s", "3", "-t", "float128"]).is_err()
        );
        assert!(Args::try_parse_from([
            "ru_cube",
            "stats",
            "f",
            "-s",
            "3",
            "--buffer-size",
            "12zb"
        ])
        .is_err());
    }

    #[test]
    fn test_render_error() {
        let error = RuCubeError::OutOfMemory {
            requested: 10,
            used: 5,
            limit: 12,
        };
        assert!(render_error(&error, false).starts_with("error[memory]: out of memory"));

        let io = RuCubeError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let rendered = render_error(&io, true);
        assert!(rendered.starts_with("error[io]: I/O error: gone"));
        assert!(rendered.contains("caused by: gone"));
    }
}

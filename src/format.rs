//! On-disk cube formats
//!
//! - `raw`: contiguous little-endian elements, no header
//! - `csv`: one flat sequence of elements separated by a configurable separator
//! - `text`: rows of elements; columns split by a delimiter, rows by a terminator
//!
//! Text and CSV files carry no shape; the reader reshapes after parsing.

use crate::dtype::Element;
use crate::errors::{Result, RuCubeError};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileFormat {
    #[default]
    Raw,
    Csv,
    Text,
}

impl FileFormat {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FileFormat::Raw => "raw",
            FileFormat::Csv => "csv",
            FileFormat::Text => "text",
        }
    }

    /// Parse a format name
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::UnknownFormat`] for anything but `raw`, `csv`, `text`.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(FileFormat::Raw),
            "csv" => Ok(FileFormat::Csv),
            "text" | "txt" => Ok(FileFormat::Text),
            other => Err(RuCubeError::UnknownFormat(other.to_string())),
        }
    }
}

impl FromStr for FileFormat {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Separators for the textual formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Element separator for `csv`
    pub csv_separator: String,
    /// Column delimiter for `text`
    pub text_delimiter: String,
    /// Row terminator for `text`
    pub text_newline: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            csv_separator: ",".to_string(),
            text_delimiter: " ".to_string(),
            text_newline: "\n".to_string(),
        }
    }
}

/// Decode a buffer of little-endian elements
#[must_use]
pub fn decode_raw<T: Element>(bytes: &[u8]) -> Vec<T> {
    let size = T::DTYPE.size();
    bytes.chunks_exact(size).map(T::from_le_slice).collect()
}

/// Decode into an existing vector, replacing its contents
pub fn decode_raw_into<T: Element>(bytes: &[u8], out: &mut Vec<T>) {
    let size = T::DTYPE.size();
    out.clear();
    out.extend(bytes.chunks_exact(size).map(T::from_le_slice));
}

/// Split textual content into element tokens
fn tokenize<'a>(content: &'a str, format: FileFormat, options: &'a FormatOptions) -> Vec<&'a str> {
    let split_on = |text: &'a str, separator: &'a str| -> Vec<&'a str> {
        if separator.trim().is_empty() {
            text.split_whitespace().collect()
        } else {
            text.split(separator)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect()
        }
    };
    match format {
        FileFormat::Csv => split_on(content, &options.csv_separator),
        FileFormat::Text | FileFormat::Raw => content
            .split(options.text_newline.as_str())
            .flat_map(|row| split_on(row, &options.text_delimiter))
            .collect(),
    }
}

/// Parse all elements of a `csv` or `text` document
///
/// # Errors
///
/// Returns [`RuCubeError::ParseElement`] for the first token that does not parse.
pub fn parse_elements<T: Element>(
    content: &str,
    format: FileFormat,
    options: &FormatOptions,
) -> Result<Vec<T>> {
    tokenize(content, format, options)
        .into_iter()
        .map(|token| {
            T::parse_token(token).ok_or_else(|| RuCubeError::ParseElement {
                token: token.to_string(),
                dtype: T::DTYPE.to_string(),
            })
        })
        .collect()
}

/// Incremental writer of elements in one of the file formats
///
/// Tracks the global element position so that blocks can be fed in any size
/// while text rows still break on the last dimension.
#[derive(Debug)]
pub struct Encoder<'a> {
    format: FileFormat,
    options: &'a FormatOptions,
    columns: usize,
    written: usize,
    bytes: Vec<u8>,
}

impl<'a> Encoder<'a> {
    /// `dims` decides the number of text columns: the last dimension for
    /// rank 2 and up, one otherwise
    #[must_use]
    pub fn new(format: FileFormat, options: &'a FormatOptions, dims: &[usize]) -> Self {
        let columns = if dims.len() >= 2 {
            dims[dims.len() - 1].max(1)
        } else {
            1
        };
        Self {
            format,
            options,
            columns,
            written: 0,
            bytes: Vec::new(),
        }
    }

    /// Number of elements encoded so far
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Encode a block of elements and write it out
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_block<T: Element, W: Write>(&mut self, block: &[T], out: &mut W) -> Result<()> {
        self.bytes.clear();
        match self.format {
            FileFormat::Raw => {
                self.bytes.reserve(block.len() * T::DTYPE.size());
                for &value in block {
                    value.write_le(&mut self.bytes);
                }
            }
            FileFormat::Csv => {
                for (i, &value) in block.iter().enumerate() {
                    if self.written + i > 0 {
                        self.bytes
                            .extend_from_slice(self.options.csv_separator.as_bytes());
                    }
                    self.bytes.extend_from_slice(value.format_token().as_bytes());
                }
            }
            FileFormat::Text => {
                for (i, &value) in block.iter().enumerate() {
                    let position = self.written + i;
                    if position > 0 {
                        let separator = if position % self.columns == 0 {
                            &self.options.text_newline
                        } else {
                            &self.options.text_delimiter
                        };
                        self.bytes.extend_from_slice(separator.as_bytes());
                    }
                    self.bytes.extend_from_slice(value.format_token().as_bytes());
                }
            }
        }
        self.written += block.len();
        out.write_all(&self.bytes)?;
        Ok(())
    }

    /// Terminate the document
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> Result<()> {
        match self.format {
            FileFormat::Raw => {}
            FileFormat::Csv => out.write_all(b"\n")?,
            FileFormat::Text => {
                if self.written > 0 {
                    out.write_all(self.options.text_newline.as_bytes())?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}

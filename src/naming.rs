//! Output filename templates
//!
//! A template such as `"cube_{d0:03}_{shape}.{format}"` is expanded with the
//! properties of the cube being written and the labels of its split. A
//! placeholder may carry a width (`{d0:3}`) or a zero-padded width
//! (`{d0:03}`); `{{` and `}}` produce literal braces.

use crate::dtype::Dtype;
use crate::errors::{Result, RuCubeError};
use crate::format::FileFormat;
use crate::split::Labels;

/// Values available to a filename template
#[derive(Debug, Clone)]
pub struct NameContext<'a> {
    pub shape: &'a [usize],
    pub dtype: Dtype,
    pub format: FileFormat,
    pub labels: &'a Labels,
}

impl NameContext<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "shape" => Some(
                self.shape
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("x"),
            ),
            "rank" => Some(self.shape.len().to_string()),
            "count" => Some(self.shape.iter().product::<usize>().to_string()),
            "format" => Some(self.format.to_string()),
            "dtype" => Some(self.dtype.to_string()),
            label => self.labels.get(label).map(|index| index.to_string()),
        }
    }
}

/// Expand `template` against `context`
///
/// # Errors
///
/// Returns [`RuCubeError::UnknownPlaceholder`] for names nobody provides and
/// [`RuCubeError::InvalidTemplate`] for unbalanced braces or bad widths.
pub fn interpolate_filename(template: &str, context: &NameContext<'_>) -> Result<String> {
    let invalid = |reason: &str| RuCubeError::InvalidTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => return Err(invalid("unmatched '}'")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(invalid("nested '{'")),
                        Some(c) => field.push(c),
                        None => return Err(invalid("unclosed '{'")),
                    }
                }
                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name.trim(), Some(spec.trim())),
                    None => (field.trim(), None),
                };
                let value = context
                    .lookup(name)
                    .ok_or_else(|| RuCubeError::UnknownPlaceholder(name.to_string()))?;
                match spec {
                    None | Some("") => output.push_str(&value),
                    Some(spec) => {
                        let zero_pad = spec.starts_with('0');
                        let width: usize = spec
                            .parse()
                            .map_err(|_| invalid(&format!("bad width '{spec}' for '{name}'")))?;
                        if zero_pad {
                            output.push_str(&format!("{value:0>width$}"));
                        } else {
                            output.push_str(&format!("{value:>width$}"));
                        }
                    }
                }
            }
            c => output.push(c),
        }
    }
    Ok(output)
}

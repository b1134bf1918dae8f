//! Element types
//!
//! [`Dtype`] enumerates the supported primitive element kinds at runtime, and
//! [`Element`] ties each of them to a Rust type. [`Scalar`] holds a single value
//! in the "precise" representation of its kind (`i64`, `u64`, `f64` or
//! `Complex64`), which is what reductions accumulate into.

use crate::cube::Cube;
use crate::errors::{Result, RuCubeError};
use half::f16;
use ndarray::ArrayD;
use num_complex::{Complex32, Complex64};
use serde_json::{json, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Supported element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

/// Family of an element type, deciding how values accumulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeKind {
    Bool,
    Int,
    UInt,
    Float,
    Complex,
}

impl Dtype {
    /// All element types, in declaration order
    pub const ALL: [Dtype; 14] = [
        Dtype::Bool,
        Dtype::Int8,
        Dtype::Int16,
        Dtype::Int32,
        Dtype::Int64,
        Dtype::UInt8,
        Dtype::UInt16,
        Dtype::UInt32,
        Dtype::UInt64,
        Dtype::Float16,
        Dtype::Float32,
        Dtype::Float64,
        Dtype::Complex64,
        Dtype::Complex128,
    ];

    /// Canonical name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::Int8 => "int8",
            Dtype::Int16 => "int16",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::UInt8 => "uint8",
            Dtype::UInt16 => "uint16",
            Dtype::UInt32 => "uint32",
            Dtype::UInt64 => "uint64",
            Dtype::Float16 => "float16",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
            Dtype::Complex64 => "complex64",
            Dtype::Complex128 => "complex128",
        }
    }

    /// Size of one element in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Dtype::Bool | Dtype::Int8 | Dtype::UInt8 => 1,
            Dtype::Int16 | Dtype::UInt16 | Dtype::Float16 => 2,
            Dtype::Int32 | Dtype::UInt32 | Dtype::Float32 => 4,
            Dtype::Int64 | Dtype::UInt64 | Dtype::Float64 | Dtype::Complex64 => 8,
            Dtype::Complex128 => 16,
        }
    }

    #[must_use]
    pub const fn kind(self) -> DtypeKind {
        match self {
            Dtype::Bool => DtypeKind::Bool,
            Dtype::Int8 | Dtype::Int16 | Dtype::Int32 | Dtype::Int64 => DtypeKind::Int,
            Dtype::UInt8 | Dtype::UInt16 | Dtype::UInt32 | Dtype::UInt64 => DtypeKind::UInt,
            Dtype::Float16 | Dtype::Float32 | Dtype::Float64 => DtypeKind::Float,
            Dtype::Complex64 | Dtype::Complex128 => DtypeKind::Complex,
        }
    }

    /// The highest-precision type of the same kind, used for sums
    #[must_use]
    pub const fn precise(self) -> Dtype {
        match self.kind() {
            DtypeKind::Bool | DtypeKind::Int => Dtype::Int64,
            DtypeKind::UInt => Dtype::UInt64,
            DtypeKind::Float => Dtype::Float64,
            DtypeKind::Complex => Dtype::Complex128,
        }
    }

    /// Parse a type name, including the `bool_`, `int_`, `intc`, `intp`,
    /// `float_` and `complex_` aliases
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidDtype`] for unknown names.
    pub fn parse(name: &str) -> Result<Self> {
        let dtype = match name.trim() {
            "bool" | "bool_" => Dtype::Bool,
            "int8" => Dtype::Int8,
            "int16" => Dtype::Int16,
            "int32" | "intc" => Dtype::Int32,
            "int64" | "int_" | "intp" => Dtype::Int64,
            "uint8" => Dtype::UInt8,
            "uint16" => Dtype::UInt16,
            "uint32" => Dtype::UInt32,
            "uint64" => Dtype::UInt64,
            "float16" => Dtype::Float16,
            "float32" => Dtype::Float32,
            "float64" | "float_" => Dtype::Float64,
            "complex64" => Dtype::Complex64,
            "complex128" | "complex_" => Dtype::Complex128,
            other => return Err(RuCubeError::InvalidDtype(other.to_string())),
        };
        Ok(dtype)
    }
}

impl Default for Dtype {
    fn default() -> Self {
        Dtype::Float32
    }
}

impl FromStr for Dtype {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value in the precise representation of its kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    /// The additive identity for sums over `dtype`
    #[must_use]
    pub fn zero(dtype: Dtype) -> Self {
        match dtype.precise() {
            Dtype::Int64 => Scalar::Int(0),
            Dtype::UInt64 => Scalar::UInt(0),
            Dtype::Complex128 => Scalar::Complex(Complex64::new(0.0, 0.0)),
            _ => Scalar::Float(0.0),
        }
    }

    /// Sum of two scalars of the same kind; integers wrap like fixed-width sums
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::DtypeMismatch`] when the kinds differ.
    pub fn add(self, other: Scalar) -> Result<Scalar> {
        let sum = match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Scalar::Int(a.wrapping_add(b)),
            (Scalar::UInt(a), Scalar::UInt(b)) => Scalar::UInt(a.wrapping_add(b)),
            (Scalar::Float(a), Scalar::Float(b)) => Scalar::Float(a + b),
            (Scalar::Complex(a), Scalar::Complex(b)) => Scalar::Complex(a + b),
            (Scalar::Bool(a), Scalar::Bool(b)) => Scalar::Bool(a || b),
            (a, b) => {
                return Err(RuCubeError::DtypeMismatch {
                    left: a.kind_name().to_string(),
                    right: b.kind_name().to_string(),
                })
            }
        };
        Ok(sum)
    }

    /// Ordering used for min/max: numeric for reals, lexicographic
    /// `(re, im)` for complex values; `None` across kinds or with NaN
    #[must_use]
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::UInt(a), Scalar::UInt(b)) => Some(a.cmp(b)),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Complex(a), Scalar::Complex(b)) => match a.re.partial_cmp(&b.re)? {
                Ordering::Equal => a.im.partial_cmp(&b.im),
                ordering => Some(ordering),
            },
            _ => None,
        }
    }

    /// Real value as `f64`; complex values yield their real part
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match *self {
            Scalar::Bool(b) => f64::from(u8::from(b)),
            Scalar::Int(v) => v as f64,
            Scalar::UInt(v) => v as f64,
            Scalar::Float(v) => v,
            Scalar::Complex(v) => v.re,
        }
    }

    /// Value as a complex number
    #[must_use]
    pub fn to_complex(&self) -> Complex64 {
        match *self {
            Scalar::Complex(v) => v,
            other => Complex64::new(other.to_f64(), 0.0),
        }
    }

    /// Divide by a count, producing a float (or complex) average
    #[must_use]
    pub fn div_count(&self, count: usize) -> Scalar {
        match *self {
            Scalar::Complex(v) => Scalar::Complex(v / count as f64),
            other => Scalar::Float(other.to_f64() / count as f64),
        }
    }

    /// JSON representation; complex values become `[re, im]`
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match *self {
            Scalar::Bool(b) => json!(b),
            Scalar::Int(v) => json!(v),
            Scalar::UInt(v) => json!(v),
            Scalar::Float(v) if v.is_finite() => json!(v),
            Scalar::Float(v) => json!(v.to_string()),
            Scalar::Complex(v) => json!([v.re, v.im]),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::UInt(_) => "uint",
            Scalar::Float(_) => "float",
            Scalar::Complex(_) => "complex",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Complex(v) => f.write_str(&format_complex(v.re, v.im)),
        }
    }
}

fn format_complex(re: f64, im: f64) -> String {
    if im.is_sign_negative() && !im.is_nan() {
        format!("{re}{im}j")
    } else {
        format!("{re}+{im}j")
    }
}

/// Parse `"1.5-2j"`, `"(1+2j)"`, `"3j"` or a plain real number
fn parse_complex(token: &str) -> Option<(f64, f64)> {
    let token = token
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    let Some(body) = token.strip_suffix('j').or_else(|| token.strip_suffix('J')) else {
        return token.parse().ok().map(|re| (re, 0.0));
    };
    // Split at the last sign that does not belong to an exponent
    let bytes = body.as_bytes();
    let split = (1..bytes.len()).rev().find(|&i| {
        (bytes[i] == b'+' || bytes[i] == b'-') && !matches!(bytes[i - 1], b'e' | b'E')
    });
    match split {
        Some(i) => {
            let re = body[..i].parse().ok()?;
            let im_text = &body[i..];
            let im = match im_text {
                "+" => 1.0,
                "-" => -1.0,
                _ => im_text.parse().ok()?,
            };
            Some((re, im))
        }
        None => {
            let im = match body {
                "" | "+" => 1.0,
                "-" => -1.0,
                _ => body.parse().ok()?,
            };
            Some((0.0, im))
        }
    }
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// A Rust type that can be stored in a cube
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime tag of this type
    const DTYPE: Dtype;

    /// Decode one little-endian element; `bytes.len()` equals the element size
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding of this element
    fn write_le(self, out: &mut Vec<u8>);

    /// Widen into the precise representation of this kind
    fn to_scalar(self) -> Scalar;

    /// Convert from any scalar with `as`-cast semantics
    fn from_scalar(value: Scalar) -> Self;

    /// Convert from a real number with `as`-cast semantics
    fn from_f64(value: f64) -> Self {
        Self::from_scalar(Scalar::Float(value))
    }

    /// Real value as `f64`; the real part for complex types
    fn to_f64(self) -> f64 {
        self.to_scalar().to_f64()
    }

    /// Value as a complex number
    fn to_complex(self) -> Complex64 {
        self.to_scalar().to_complex()
    }

    fn is_nan(self) -> bool {
        false
    }

    fn is_infinite(self) -> bool {
        false
    }

    fn is_zero(self) -> bool;

    /// Strict ordering used by min/max; never called with NaN operands
    fn precedes(self, other: Self) -> bool;

    /// Sum of values in the precise representation of this kind
    fn sum_precise<'a, I>(values: I) -> Scalar
    where
        I: Iterator<Item = &'a Self>,
        Self: 'a;

    /// Parse one text token
    fn parse_token(token: &str) -> Option<Self>;

    /// Render one value as a text token
    fn format_token(self) -> String;

    /// Wrap a typed array into a dynamic cube
    fn into_cube(array: ArrayD<Self>) -> Cube;

    /// Borrow the typed array of a cube holding this element type
    fn cube_array(cube: &Cube) -> Option<&ArrayD<Self>>;
}

macro_rules! impl_cube_access {
    ($variant:ident) => {
        fn into_cube(array: ArrayD<Self>) -> Cube {
            Cube::$variant(array)
        }

        fn cube_array(cube: &Cube) -> Option<&ArrayD<Self>> {
            match cube {
                Cube::$variant(array) => Some(array),
                _ => None,
            }
        }
    };
}

macro_rules! impl_int_element {
    ($ty:ty, $dtype:ident, $variant:ident, $wide:ty) => {
        impl Element for $ty {
            const DTYPE: Dtype = Dtype::$dtype;

            impl_cube_access!($dtype);

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self as $wide)
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            fn from_scalar(value: Scalar) -> Self {
                match value {
                    Scalar::Bool(b) => u8::from(b) as $ty,
                    Scalar::Int(v) => v as $ty,
                    Scalar::UInt(v) => v as $ty,
                    Scalar::Float(v) => v as $ty,
                    Scalar::Complex(v) => v.re as $ty,
                }
            }

            fn is_zero(self) -> bool {
                self == 0
            }

            fn precedes(self, other: Self) -> bool {
                self < other
            }

            fn sum_precise<'a, I>(values: I) -> Scalar
            where
                I: Iterator<Item = &'a Self>,
                Self: 'a,
            {
                Scalar::$variant(values.fold(0 as $wide, |acc, &v| acc.wrapping_add(v as $wide)))
            }

            fn parse_token(token: &str) -> Option<Self> {
                let token = token.trim();
                token.parse().ok().or_else(|| {
                    // Accept integral floats such as "3.0"
                    let value: f64 = token.parse().ok()?;
                    (value.fract() == 0.0).then(|| value as $ty)
                })
            }

            fn format_token(self) -> String {
                self.to_string()
            }
        }
    };
}

impl_int_element!(i8, Int8, Int, i64);
impl_int_element!(i16, Int16, Int, i64);
impl_int_element!(i32, Int32, Int, i64);
impl_int_element!(i64, Int64, Int, i64);
impl_int_element!(u8, UInt8, UInt, u64);
impl_int_element!(u16, UInt16, UInt, u64);
impl_int_element!(u32, UInt32, UInt, u64);
impl_int_element!(u64, UInt64, UInt, u64);

macro_rules! impl_float_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: Dtype = Dtype::$dtype;

            impl_cube_access!($dtype);

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Float(f64::from(self))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn from_scalar(value: Scalar) -> Self {
                match value {
                    Scalar::Complex(v) => v.re as $ty,
                    other => other.to_f64() as $ty,
                }
            }

            fn is_nan(self) -> bool {
                <$ty>::is_nan(self)
            }

            fn is_infinite(self) -> bool {
                <$ty>::is_infinite(self)
            }

            fn is_zero(self) -> bool {
                self == 0.0
            }

            fn precedes(self, other: Self) -> bool {
                self < other
            }

            fn sum_precise<'a, I>(values: I) -> Scalar
            where
                I: Iterator<Item = &'a Self>,
                Self: 'a,
            {
                Scalar::Float(values.fold(0.0_f64, |acc, &v| acc + f64::from(v)))
            }

            fn parse_token(token: &str) -> Option<Self> {
                parse_real(token).map(|v| v as $ty)
            }

            fn format_token(self) -> String {
                format_real(f64::from(self), self.to_string())
            }
        }
    };
}

impl_float_element!(f32, Float32);
impl_float_element!(f64, Float64);

/// Parse a real number, accepting `nan`, `inf` and `-inf` in any case
fn parse_real(token: &str) -> Option<f64> {
    let token = token.trim();
    match token.to_ascii_lowercase().as_str() {
        "nan" | "+nan" | "-nan" => Some(f64::NAN),
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => token.parse().ok(),
    }
}

fn format_real(value: f64, shortest: String) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        shortest
    }
}

impl Element for bool {
    const DTYPE: Dtype = Dtype::Bool;

    impl_cube_access!(Bool);

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Bool(b) => b,
            Scalar::Int(v) => v != 0,
            Scalar::UInt(v) => v != 0,
            Scalar::Float(v) => v != 0.0,
            Scalar::Complex(v) => v.re != 0.0 || v.im != 0.0,
        }
    }

    fn is_zero(self) -> bool {
        !self
    }

    fn precedes(self, other: Self) -> bool {
        !self & other
    }

    fn sum_precise<'a, I>(values: I) -> Scalar
    where
        I: Iterator<Item = &'a Self>,
        Self: 'a,
    {
        Scalar::Int(values.filter(|&&v| v).count() as i64)
    }

    fn parse_token(token: &str) -> Option<Self> {
        parse_bool(token)
    }

    fn format_token(self) -> String {
        if self { "True" } else { "False" }.to_string()
    }
}

impl Element for f16 {
    const DTYPE: Dtype = Dtype::Float16;

    impl_cube_access!(Float16);

    fn from_le_slice(bytes: &[u8]) -> Self {
        f16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Float(self.to_f64())
    }

    fn from_scalar(value: Scalar) -> Self {
        f16::from_f64(match value {
            Scalar::Complex(v) => v.re,
            other => other.to_f64(),
        })
    }

    fn is_nan(self) -> bool {
        f16::is_nan(self)
    }

    fn is_infinite(self) -> bool {
        f16::is_infinite(self)
    }

    fn is_zero(self) -> bool {
        self.to_f32() == 0.0
    }

    fn precedes(self, other: Self) -> bool {
        self < other
    }

    fn sum_precise<'a, I>(values: I) -> Scalar
    where
        I: Iterator<Item = &'a Self>,
        Self: 'a,
    {
        Scalar::Float(values.fold(0.0_f64, |acc, v| acc + v.to_f64()))
    }

    fn parse_token(token: &str) -> Option<Self> {
        parse_real(token).map(f16::from_f64)
    }

    fn format_token(self) -> String {
        format_real(self.to_f64(), self.to_f32().to_string())
    }
}

macro_rules! impl_complex_element {
    ($ty:ty, $part:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: Dtype = Dtype::$dtype;

            impl_cube_access!($dtype);

            fn from_le_slice(bytes: &[u8]) -> Self {
                let half = bytes.len() / 2;
                <$ty>::new(
                    <$part as Element>::from_le_slice(&bytes[..half]),
                    <$part as Element>::from_le_slice(&bytes[half..]),
                )
            }

            fn write_le(self, out: &mut Vec<u8>) {
                self.re.write_le(out);
                self.im.write_le(out);
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Complex(Complex64::new(f64::from(self.re), f64::from(self.im)))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn from_scalar(value: Scalar) -> Self {
                let value = value.to_complex();
                <$ty>::new(value.re as $part, value.im as $part)
            }

            fn is_nan(self) -> bool {
                self.re.is_nan() || self.im.is_nan()
            }

            fn is_infinite(self) -> bool {
                self.re.is_infinite() || self.im.is_infinite()
            }

            fn is_zero(self) -> bool {
                self.re == 0.0 && self.im == 0.0
            }

            fn precedes(self, other: Self) -> bool {
                self.re < other.re || (self.re == other.re && self.im < other.im)
            }

            fn sum_precise<'a, I>(values: I) -> Scalar
            where
                I: Iterator<Item = &'a Self>,
                Self: 'a,
            {
                Scalar::Complex(values.fold(Complex64::new(0.0, 0.0), |acc, v| {
                    acc + Complex64::new(f64::from(v.re), f64::from(v.im))
                }))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn parse_token(token: &str) -> Option<Self> {
                parse_complex(token).map(|(re, im)| <$ty>::new(re as $part, im as $part))
            }

            fn format_token(self) -> String {
                let re = format_real(f64::from(self.re), self.re.to_string());
                let im = format_real(f64::from(self.im), self.im.to_string());
                if im.starts_with('-') {
                    format!("{re}{im}j")
                } else {
                    format!("{re}+{im}j")
                }
            }
        }
    };
}

impl_complex_element!(Complex32, f32, Complex64);
impl_complex_element!(Complex64, f64, Complex128);

/// Bind a type alias to the Rust element type of a runtime [`Dtype`] and
/// evaluate an expression with it
///
/// ```ignore
/// let size = with_element_type!(dtype, T => std::mem::size_of::<T>());
/// ```
#[macro_export]
macro_rules! with_element_type {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::dtype::Dtype::Bool => {
                type $t = bool;
                $body
            }
            $crate::dtype::Dtype::Int8 => {
                type $t = i8;
                $body
            }
            $crate::dtype::Dtype::Int16 => {
                type $t = i16;
                $body
            }
            $crate::dtype::Dtype::Int32 => {
                type $t = i32;
                $body
            }
            $crate::dtype::Dtype::Int64 => {
                type $t = i64;
                $body
            }
            $crate::dtype::Dtype::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::dtype::Dtype::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::dtype::Dtype::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::dtype::Dtype::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::dtype::Dtype::Float16 => {
                type $t = ::half::f16;
                $body
            }
            $crate::dtype::Dtype::Float32 => {
                type $t = f32;
                $body
            }
            $crate::dtype::Dtype::Float64 => {
                type $t = f64;
                $body
            }
            $crate::dtype::Dtype::Complex64 => {
                type $t = ::num_complex::Complex32;
                $body
            }
            $crate::dtype::Dtype::Complex128 => {
                type $t = ::num_complex::Complex64;
                $body
            }
        }
    };
}

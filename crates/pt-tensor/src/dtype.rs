use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorError};
use crate::value::{Scalar, Value};

/// Widest integer width the encoder can pack.
pub const MAX_INT_BITS: u32 = 64;

/// Float widths the encoder can pack (IEEE binary16/32/64).
pub const FLOAT_WIDTHS: [u32; 3] = [16, 32, 64];

/// Numeric kind of an element, independent of width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Signed,
    Unsigned,
    Float,
}

impl Kind {
    /// Converts a stable numeric kind code to a `Kind`.
    ///
    /// - 0 => Signed
    /// - 1 => Unsigned
    /// - 2 => Float
    pub fn from_code(code: u32) -> Result<Kind> {
        match code {
            0 => Ok(Kind::Signed),
            1 => Ok(Kind::Unsigned),
            2 => Ok(Kind::Float),
            other => Err(TensorError::UnknownKind(other)),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Kind::Signed => 0,
            Kind::Unsigned => 1,
            Kind::Float => 2,
        }
    }

    fn prefix(&self) -> char {
        match self {
            Kind::Signed => 's',
            Kind::Unsigned => 'u',
            Kind::Float => 'f',
        }
    }
}

/// Element type of a tensor: a kind plus the exact number of bits each
/// element occupies in the packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Two's-complement signed integer.
    Signed(u32),
    /// Unsigned integer. `Unsigned(1)` holds booleans.
    Unsigned(u32),
    /// IEEE floating point.
    Float(u32),
}

impl ElementType {
    pub fn new(kind: Kind, bits: u32) -> Self {
        match kind {
            Kind::Signed => ElementType::Signed(bits),
            Kind::Unsigned => ElementType::Unsigned(bits),
            Kind::Float => ElementType::Float(bits),
        }
    }

    /// Builds and validates a type from a kind code and width.
    pub fn from_code(code: u32, bits: u32) -> Result<Self> {
        let ty = ElementType::new(Kind::from_code(code)?, bits);
        ty.validate()?;
        Ok(ty)
    }

    pub fn kind(&self) -> Kind {
        match self {
            ElementType::Signed(_) => Kind::Signed,
            ElementType::Unsigned(_) => Kind::Unsigned,
            ElementType::Float(_) => Kind::Float,
        }
    }

    pub fn bits(&self) -> u32 {
        match *self {
            ElementType::Signed(b) | ElementType::Unsigned(b) | ElementType::Float(b) => b,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float(_))
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Checks that this type can be packed by the encoder.
    ///
    /// Integers accept any width in `1..=64`; floats accept 16, 32 and 64.
    pub fn validate(&self) -> Result<()> {
        let bits = self.bits();
        let reason = match self.kind() {
            _ if bits == 0 => "width must be positive",
            Kind::Signed | Kind::Unsigned if bits > MAX_INT_BITS => {
                "integer width must be at most 64 bits"
            }
            Kind::Float if !FLOAT_WIDTHS.contains(&bits) => "float width must be 16, 32 or 64",
            _ => return Ok(()),
        };
        Err(TensorError::InvalidType {
            ty: self.to_string(),
            reason: reason.to_string(),
        })
    }

    /// Infers the element type of a literal.
    ///
    /// Booleans are `u1`, integers `s64`, reals `f64`. Sequences merge the
    /// types of all their leaves; a sequence without leaves is `f64`.
    pub fn infer(value: &Value) -> ElementType {
        infer_leaves(value).unwrap_or(ElementType::Float(64))
    }

    /// Infers the element type of flat scalars the same way as a sequence
    /// holding them; no scalars is `f64`.
    pub fn infer_scalars(scalars: &[Scalar]) -> ElementType {
        scalars
            .iter()
            .map(ElementType::of_scalar)
            .reduce(ElementType::merge)
            .unwrap_or(ElementType::Float(64))
    }

    /// Type of a single literal scalar.
    pub fn of_scalar(scalar: &Scalar) -> ElementType {
        match scalar {
            Scalar::Bool(_) => ElementType::Unsigned(1),
            Scalar::Int(_) => ElementType::Signed(64),
            Scalar::Float(_) => ElementType::Float(64),
        }
    }

    /// Smallest type that represents both `self` and `other`.
    ///
    /// - any float: a float at least as wide as either operand, rounded up to
    ///   a supported float width;
    /// - same signedness: the wider of the two;
    /// - mixed signedness: signed, twice the unsigned width when the unsigned
    ///   side is at least as wide as the signed side (capped at 64 bits).
    pub fn merge(self, other: ElementType) -> ElementType {
        use ElementType::*;

        match (self, other) {
            (Float(a), b) | (b, Float(a)) => Float(float_width(a.max(b.bits()))),
            (Signed(a), Signed(b)) => Signed(a.max(b)),
            (Unsigned(a), Unsigned(b)) => Unsigned(a.max(b)),
            (Signed(s), Unsigned(u)) | (Unsigned(u), Signed(s)) => {
                if u >= s {
                    Signed((u * 2).min(MAX_INT_BITS))
                } else {
                    Signed(s)
                }
            }
        }
    }

    /// Output type of combining a tensor of this type with a raw scalar.
    ///
    /// Integer scalars take the tensor's own width, so `u8 + 1` stays `u8`;
    /// a negative integer forces a signed result (`u8 + -1` is `s16`).
    /// Booleans count as `u1` and reals as `f64`.
    pub fn merge_scalar(self, scalar: &Scalar) -> ElementType {
        let scalar_ty = match *scalar {
            Scalar::Int(i) => match self {
                ElementType::Unsigned(bits) if i >= 0 => ElementType::Unsigned(bits),
                other => ElementType::Signed(other.bits().min(MAX_INT_BITS)),
            },
            ref other => ElementType::of_scalar(other),
        };
        self.merge(scalar_ty)
    }
}

fn infer_leaves(value: &Value) -> Option<ElementType> {
    match value {
        Value::Scalar(s) => Some(ElementType::of_scalar(s)),
        Value::List(items) => items
            .iter()
            .filter_map(infer_leaves)
            .reduce(ElementType::merge),
    }
}

fn float_width(bits: u32) -> u32 {
    FLOAT_WIDTHS
        .iter()
        .copied()
        .find(|&w| bits <= w)
        .unwrap_or(64)
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind().prefix(), self.bits())
    }
}

impl FromStr for ElementType {
    type Err = TensorError;

    /// Parses `s8`, `u1`, `f32` and friends. The result is validated.
    fn from_str(s: &str) -> Result<Self> {
        let parse_err = || TensorError::ParseType(s.to_string());
        let mut chars = s.chars();
        let kind = match chars.next() {
            Some('s') => Kind::Signed,
            Some('u') => Kind::Unsigned,
            Some('f') => Kind::Float,
            _ => return Err(parse_err()),
        };
        let bits: u32 = chars.as_str().parse().map_err(|_| parse_err())?;
        let ty = ElementType::new(kind, bits);
        ty.validate()?;
        Ok(ty)
    }
}

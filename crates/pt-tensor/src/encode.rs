//! Type-directed binary encoder.
//!
//! Each element kind has a 64-bit carrier type (`i64`, `u64`, `f64`)
//! implementing [`Element`]. Bulk loops are generic over a source and a
//! destination carrier, and the [`with_kind!`] / [`with_kind_pair!`] macros
//! pick one monomorphized loop per kind (or kind pair) before iterating, so
//! no type tag is inspected per element.

use std::fmt::Debug;

use tracing::debug;

use crate::bits::{low_mask, BitWriter, PackedBuffer};
use crate::dtype::{ElementType, Kind};
use crate::error::{Result, TensorError};
use crate::value::Scalar;

/// A carrier type that elements of one kind are decoded into.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + 'static {
    const KIND: Kind;

    /// Decodes a `bits`-wide raw word.
    fn decode(raw: u64, bits: u32) -> Self;

    /// Encodes into the low `bits` bits of a word, dropping anything wider.
    fn encode(self, bits: u32) -> u64;

    fn from_i64(v: i64) -> Self;
    fn from_u64(v: u64) -> Self;
    fn from_f64(v: f64) -> Self;

    /// Converts into another carrier. Resolved statically per pair.
    fn cast<T: Element>(self) -> T;

    fn to_scalar(self) -> Scalar;

    /// Addition that wraps for integers.
    fn add(self, rhs: Self) -> Self;

    /// Converts a literal scalar; booleans become 0 or 1.
    fn from_scalar(s: Scalar) -> Self {
        match s {
            Scalar::Bool(b) => Self::from_u64(b as u64),
            Scalar::Int(i) => Self::from_i64(i),
            Scalar::Float(f) => Self::from_f64(f),
        }
    }
}

impl Element for i64 {
    const KIND: Kind = Kind::Signed;

    fn decode(raw: u64, bits: u32) -> Self {
        let shift = 64 - bits;
        ((raw << shift) as i64) >> shift
    }

    fn encode(self, bits: u32) -> u64 {
        self as u64 & low_mask(bits)
    }

    fn from_i64(v: i64) -> Self {
        v
    }

    fn from_u64(v: u64) -> Self {
        v as i64
    }

    fn from_f64(v: f64) -> Self {
        v as i64
    }

    fn cast<T: Element>(self) -> T {
        T::from_i64(self)
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Int(self)
    }

    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl Element for u64 {
    const KIND: Kind = Kind::Unsigned;

    fn decode(raw: u64, bits: u32) -> Self {
        raw & low_mask(bits)
    }

    fn encode(self, bits: u32) -> u64 {
        self & low_mask(bits)
    }

    fn from_i64(v: i64) -> Self {
        v as u64
    }

    fn from_u64(v: u64) -> Self {
        v
    }

    fn from_f64(v: f64) -> Self {
        // Negative reals wrap through the signed path like negative integers.
        if v < 0.0 {
            v as i64 as u64
        } else {
            v as u64
        }
    }

    fn cast<T: Element>(self) -> T {
        T::from_u64(self)
    }

    /// Values above `i64::MAX` wrap into negative integers.
    fn to_scalar(self) -> Scalar {
        Scalar::Int(self as i64)
    }

    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl Element for f64 {
    const KIND: Kind = Kind::Float;

    fn decode(raw: u64, bits: u32) -> Self {
        match bits {
            16 => half::f16::from_bits(raw as u16).to_f64(),
            32 => f32::from_bits(raw as u32) as f64,
            _ => f64::from_bits(raw),
        }
    }

    /// Narrows to the nearest value representable at `bits`.
    fn encode(self, bits: u32) -> u64 {
        match bits {
            16 => half::f16::from_f64(self).to_bits() as u64,
            32 => (self as f32).to_bits() as u64,
            _ => self.to_bits(),
        }
    }

    fn from_i64(v: i64) -> Self {
        v as f64
    }

    fn from_u64(v: u64) -> Self {
        v as f64
    }

    fn from_f64(v: f64) -> Self {
        v
    }

    fn cast<T: Element>(self) -> T {
        T::from_f64(self)
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
}

/// Binds `$e` to the carrier type of `$kind` and evaluates `$body`.
#[macro_export]
macro_rules! with_kind {
    ($kind:expr, |$e:ident| $body:expr) => {
        match $kind {
            $crate::dtype::Kind::Signed => {
                type $e = i64;
                $body
            }
            $crate::dtype::Kind::Unsigned => {
                type $e = u64;
                $body
            }
            $crate::dtype::Kind::Float => {
                type $e = f64;
                $body
            }
        }
    };
}

/// Binds `$s` and `$d` to the carrier types of a source and destination kind
/// and evaluates `$body`: one arm per pair of the 3x3 kind product.
#[macro_export]
macro_rules! with_kind_pair {
    ($from:expr, $to:expr, |$s:ident, $d:ident| $body:expr) => {
        match $from {
            $crate::dtype::Kind::Signed => {
                type $s = i64;
                $crate::with_kind!($to, |$d| $body)
            }
            $crate::dtype::Kind::Unsigned => {
                type $s = u64;
                $crate::with_kind!($to, |$d| $body)
            }
            $crate::dtype::Kind::Float => {
                type $s = f64;
                $crate::with_kind!($to, |$d| $body)
            }
        }
    };
}

/// Packs one scalar at `ty`, returning the low `ty.bits()` bits.
///
/// Integers wider than the target keep their low-order bits; reals narrow to
/// the nearest representable value.
pub fn encode_scalar(value: Scalar, ty: ElementType) -> Result<u64> {
    ty.validate()?;
    let bits = ty.bits();
    Ok(with_kind!(ty.kind(), |E| E::from_scalar(value).encode(bits)))
}

/// Unpacks one raw word of type `ty`. Bits above `ty.bits()` are ignored.
pub fn decode_scalar(raw: u64, ty: ElementType) -> Result<Scalar> {
    ty.validate()?;
    let bits = ty.bits();
    Ok(with_kind!(ty.kind(), |E| E::decode(raw, bits).to_scalar()))
}

/// Decode-compute-encode loop for one concrete carrier pair.
///
/// Reads `from_bits`-wide words of `S`, converts each to `D`, applies `f`
/// and writes the result at `to_bits`. A trailing partial word is not read;
/// callers check the input length first.
pub fn map_elements<S, D, F>(
    input: &PackedBuffer,
    from_bits: u32,
    to_bits: u32,
    f: F,
) -> PackedBuffer
where
    S: Element,
    D: Element,
    F: Fn(D) -> D,
{
    let words = input.words(from_bits);
    let mut out = BitWriter::with_capacity(words.len() * to_bits as usize);
    for raw in words {
        let x: D = S::decode(raw, from_bits).cast();
        out.write(f(x).encode(to_bits), to_bits);
    }
    out.finish()
}

/// Re-packs every element of `buffer` from `from` to `to`, row-major.
pub fn reencode(
    buffer: &PackedBuffer,
    from: ElementType,
    to: ElementType,
) -> Result<PackedBuffer> {
    from.validate()?;
    to.validate()?;
    let (fb, tb) = (from.bits(), to.bits());
    if buffer.bit_len() % fb as usize != 0 {
        return Err(TensorError::BufferLengthMismatch {
            expected: buffer.bit_len() / fb as usize * fb as usize,
            got: buffer.bit_len(),
        });
    }
    debug!(%from, %to, bits = buffer.bit_len(), "reencoding buffer");

    if from == to {
        return Ok(buffer.clone());
    }
    Ok(with_kind_pair!(from.kind(), to.kind(), |S, D| {
        map_elements::<S, D, _>(buffer, fb, tb, |x| x)
    }))
}

/// Decodes every element of `buffer` at `ty` into the carrier `T`.
pub fn decode_all<T: Element>(buffer: &PackedBuffer, ty: ElementType) -> Vec<T> {
    let bits = ty.bits();
    with_kind!(ty.kind(), |S| buffer
        .words(bits)
        .map(|raw| S::decode(raw, bits).cast::<T>())
        .collect())
}

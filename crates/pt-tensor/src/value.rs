use std::fmt;
use std::ops::Add;

/// A single literal number or boolean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Numeric value as a 64-bit float. Booleans read as 0.0/1.0.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Bool(b) => b as u8 as f64,
            Scalar::Int(i) => i as f64,
            Scalar::Float(f) => f,
        }
    }

    /// Returns true for `Int` values below zero.
    pub fn is_negative_int(&self) -> bool {
        matches!(*self, Scalar::Int(i) if i < 0)
    }
}

/// Ordinary numeric addition of two scalars.
///
/// Booleans count as the integers 0 and 1. Integer sums wrap on overflow;
/// a real operand on either side makes the sum real.
impl Add for Scalar {
    type Output = Scalar;

    fn add(self, rhs: Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Float(_), _) | (_, Scalar::Float(_)) => {
                Scalar::Float(self.as_f64() + rhs.as_f64())
            }
            (a, b) => Scalar::Int(int_of(a).wrapping_add(int_of(b))),
        }
    }
}

fn int_of(s: Scalar) -> i64 {
    match s {
        Scalar::Bool(b) => b as i64,
        Scalar::Int(i) => i,
        Scalar::Float(f) => f as i64,
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// Literal tensor input: a scalar or an arbitrarily nested sequence of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
}

impl Value {
    /// Build a list value from anything convertible into values.
    pub fn list<I, T>(items: I) -> Value
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Rebuild a nested value from a flat row-major sequence of scalars.
    ///
    /// `scalars.len()` must equal the product of `dims`; callers check this.
    pub(crate) fn nest(scalars: &[Scalar], dims: &[usize]) -> Value {
        match dims.split_first() {
            None => Value::Scalar(scalars.first().copied().unwrap_or(Scalar::Int(0))),
            Some((&outer, inner)) => {
                let stride: usize = inner.iter().product();
                let items = (0..outer)
                    .map(|i| {
                        let start = (i * stride).min(scalars.len());
                        let end = (start + stride).min(scalars.len());
                        Value::nest(&scalars[start..end], inner)
                    })
                    .collect();
                Value::List(items)
            }
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

macro_rules! scalar_from {
    ($variant:ident as $carrier:ty: $($t:ty),+) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(v as $carrier)
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )+
    };
}

scalar_from!(Int as i64: i8, i16, i32, i64, u8, u16, u32);
scalar_from!(Float as f64: f32, f64);

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::list(items)
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::list(items.iter().cloned())
    }
}

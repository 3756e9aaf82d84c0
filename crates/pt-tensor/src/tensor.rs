use tracing::debug;

use crate::bits::PackedBuffer;
use crate::dtype::ElementType;
use crate::encode::{self, Element};
use crate::error::{Result, TensorError};
use crate::flatten::{flatten, pack_scalars};
use crate::shape::Shape;
use crate::value::{Scalar, Value};

/// Options accepted by tensor construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TensorOptions {
    /// Element type to encode with. Inferred from the literal when `None`.
    pub element_type: Option<ElementType>,
}

impl TensorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides type inference.
    pub fn with_type(mut self, ty: ElementType) -> Self {
        self.element_type = Some(ty);
        self
    }
}

impl From<ElementType> for TensorOptions {
    fn from(ty: ElementType) -> Self {
        TensorOptions::new().with_type(ty)
    }
}

/// An immutable tensor: a shape, an element type and the row-major packed
/// buffer holding `shape.numel()` elements of exactly `ty.bits()` bits each.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tensor {
    shape: Shape,
    ty: ElementType,
    data: PackedBuffer,
}

impl Tensor {
    /// Build a tensor from a scalar or nested sequence literal.
    ///
    /// The type is validated before any flattening work is done.
    pub fn from_value(value: &Value, options: TensorOptions) -> Result<Tensor> {
        let ty = match options.element_type {
            Some(ty) => ty,
            None => ElementType::infer(value),
        };
        let (shape, data) = flatten(value, ty)?;
        debug!(%shape, %ty, bits = data.bit_len(), "built tensor");
        Ok(Tensor { shape, ty, data })
    }

    /// Rebuild a tensor from a packed buffer produced by `to_buffer`.
    pub fn from_buffer(data: PackedBuffer, shape: Shape, ty: ElementType) -> Result<Tensor> {
        ty.validate()?;
        let expected = checked_bit_len(&shape, ty)?;
        if data.bit_len() != expected {
            return Err(TensorError::BufferLengthMismatch {
                expected,
                got: data.bit_len(),
            });
        }
        Ok(Tensor { shape, ty, data })
    }

    /// Build a tensor from flat row-major scalars laid out as `shape`.
    ///
    /// The shape is kept as given, including dimensions after a zero.
    pub fn from_scalars(
        scalars: &[Scalar],
        shape: Shape,
        options: TensorOptions,
    ) -> Result<Tensor> {
        let ty = match options.element_type {
            Some(ty) => ty,
            None => ElementType::infer_scalars(scalars),
        };
        ty.validate()?;
        checked_bit_len(&shape, ty)?;
        if scalars.len() != shape.numel() {
            return Err(TensorError::ElementCountMismatch {
                shape: shape.dims().to_vec(),
                expected: shape.numel(),
                got: scalars.len(),
            });
        }
        let data = pack_scalars(scalars, ty)?;
        debug!(%shape, %ty, bits = data.bit_len(), "built tensor from scalars");
        Ok(Tensor { shape, ty, data })
    }

    /// Internal constructor for operations that produce a fresh buffer.
    pub(crate) fn from_parts(shape: Shape, ty: ElementType, data: PackedBuffer) -> Tensor {
        debug_assert_eq!(data.bit_len(), shape.bit_len(ty.bits()));
        Tensor { shape, ty, data }
    }

    /// Returns the tensor's element type.
    pub fn element_type(&self) -> ElementType {
        self.ty
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Read-only view of the packed data, row-major.
    pub fn to_buffer(&self) -> &PackedBuffer {
        &self.data
    }

    /// Decodes every element, row-major.
    pub fn to_scalars(&self) -> Vec<Scalar> {
        let bits = self.ty.bits();
        crate::with_kind!(self.ty.kind(), |E| self
            .data
            .words(bits)
            .map(|raw| E::decode(raw, bits).to_scalar())
            .collect())
    }

    /// Decodes the element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<Scalar> {
        let offset = self.shape.offset(index)?;
        let raw = self.data.words(self.ty.bits()).nth(offset)?;
        encode::decode_scalar(raw, self.ty).ok()
    }

    /// Decodes every element, row-major, converted to the carrier `T`.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        encode::decode_all(&self.data, self.ty)
    }

    /// Rebuilds the nested literal this tensor represents.
    pub fn to_value(&self) -> Value {
        Value::nest(&self.to_scalars(), self.shape.dims())
    }

    /// Returns a new tensor with every element re-encoded as `ty`.
    pub fn as_type(&self, ty: ElementType) -> Result<Tensor> {
        let data = encode::reencode(&self.data, self.ty, ty)?;
        Ok(Tensor::from_parts(self.shape.clone(), ty, data))
    }
}

fn checked_bit_len(shape: &Shape, ty: ElementType) -> Result<usize> {
    shape
        .checked_bit_len(ty.bits())
        .ok_or_else(|| TensorError::ShapeOverflow {
            shape: shape.dims().to_vec(),
            bits: ty.bits(),
        })
}

/// Builds a tensor from a literal, the construction entrypoint.
///
/// ```
/// use pt_tensor::{tensor, ElementType, TensorOptions};
///
/// let t = tensor(vec![300, 301, 302], ElementType::Signed(8)).unwrap();
/// assert_eq!(t.to_vec::<i64>(), vec![44, 45, 46]);
///
/// let b = tensor(true, TensorOptions::new()).unwrap();
/// assert_eq!(b.element_type(), ElementType::Unsigned(1));
/// ```
pub fn tensor(value: impl Into<Value>, options: impl Into<TensorOptions>) -> Result<Tensor> {
    Tensor::from_value(&value.into(), options.into())
}

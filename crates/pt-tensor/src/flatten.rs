//! Nested literal to packed buffer.

use tracing::trace;

use crate::bits::{BitWriter, PackedBuffer};
use crate::dtype::ElementType;
use crate::encode::Element;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::value::{Scalar, Value};

/// Flattens `value` into its row-major shape and packed buffer at `ty`.
///
/// Every sibling sequence must have the same shape as the first one; the
/// first mismatch is reported with both sibling positions. An empty
/// sequence contributes a zero dimension and no bits.
pub fn flatten(value: &Value, ty: ElementType) -> Result<(Shape, PackedBuffer)> {
    ty.validate()?;
    let bits = ty.bits();
    let mut out = BitWriter::new();
    let dims = crate::with_kind!(ty.kind(), |E| flatten_into::<E>(value, bits, &mut out))?;
    Ok((Shape::new(dims), out.finish()))
}

/// Packs flat row-major scalars at `ty`.
pub fn pack_scalars(scalars: &[Scalar], ty: ElementType) -> Result<PackedBuffer> {
    ty.validate()?;
    let bits = ty.bits();
    let mut out = BitWriter::with_capacity(scalars.len().saturating_mul(bits as usize));
    crate::with_kind!(ty.kind(), |E| for &s in scalars {
        out.write(E::from_scalar(s).encode(bits), bits);
    });
    Ok(out.finish())
}

fn flatten_into<E: Element>(value: &Value, bits: u32, out: &mut BitWriter) -> Result<Vec<usize>> {
    let items = match value {
        Value::Scalar(s) => {
            out.write(E::from_scalar(*s).encode(bits), bits);
            return Ok(Vec::new());
        }
        Value::List(items) => items,
    };

    let Some((first, rest)) = items.split_first() else {
        return Ok(vec![0]);
    };

    let child = flatten_into::<E>(first, bits, out)?;
    for (offset, item) in rest.iter().enumerate() {
        let got = flatten_into::<E>(item, bits, out)?;
        if got != child {
            let index = offset + 1;
            trace!(?child, ?got, index, "sibling shape mismatch");
            return Err(TensorError::ShapeMismatch {
                expected: child,
                expected_index: 0,
                got,
                index,
            });
        }
    }

    let mut dims = Vec::with_capacity(child.len() + 1);
    dims.push(items.len());
    dims.extend(child);
    Ok(dims)
}

//! Elementwise scalar arithmetic.
//!
//! Tensor-scalar addition is the representative elementwise operation: the
//! output type comes from [`ElementType::merge_scalar`] and a single pass
//! decodes each element at the input width, adds in the output carrier and
//! encodes at the output width.

use tracing::debug;

use crate::dtype::ElementType;
use crate::encode::{map_elements, Element};
use crate::tensor::Tensor;
use crate::value::Scalar;

/// Adds `scalar` to every element of `tensor`, promoting the element type.
///
/// Integer results wrap at the output width; the shape is unchanged.
pub fn add(tensor: &Tensor, scalar: impl Into<Scalar>) -> Tensor {
    let scalar = scalar.into();
    let from = tensor.element_type();
    let to = from.merge_scalar(&scalar);
    debug!(%from, %to, %scalar, numel = tensor.numel(), "add scalar");

    let (fb, tb) = (from.bits(), to.bits());
    let data = crate::with_kind_pair!(from.kind(), to.kind(), |S, D| {
        let rhs = D::from_scalar(scalar);
        map_elements::<S, D, _>(tensor.to_buffer(), fb, tb, |x: D| Element::add(x, rhs))
    });
    Tensor::from_parts(tensor.shape().clone(), to, data)
}

/// Output type of `add(tensor, scalar)` without computing it.
pub fn add_type(tensor: &Tensor, scalar: impl Into<Scalar>) -> ElementType {
    tensor.element_type().merge_scalar(&scalar.into())
}

impl Tensor {
    /// See [`add`].
    pub fn add_scalar(&self, scalar: impl Into<Scalar>) -> Tensor {
        add(self, scalar)
    }
}

impl std::ops::Add<Scalar> for &Tensor {
    type Output = Tensor;

    fn add(self, rhs: Scalar) -> Tensor {
        add(self, rhs)
    }
}

impl std::ops::Add<&Tensor> for Scalar {
    type Output = Tensor;

    fn add(self, rhs: &Tensor) -> Tensor {
        add(rhs, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{tensor, TensorOptions};
    use approx::assert_relative_eq;
    use ElementType::*;

    #[test]
    fn test_add_negative_to_unsigned() {
        let t = tensor(vec![0, 1, 2], Unsigned(8)).unwrap();
        let out = add(&t, -1);
        assert_eq!(out.element_type(), Signed(16));
        assert_eq!(out.shape().dims(), &[3]);
        assert_eq!(out.to_vec::<i64>(), vec![-1, 0, 1]);
        assert_eq!(
            out.to_buffer().as_bytes(),
            &[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_add_keeps_width() {
        let t = tensor(vec![250, 5], Unsigned(8)).unwrap();
        let out = t.add_scalar(10);
        assert_eq!(out.element_type(), Unsigned(8));
        // 260 wraps to 4 at eight bits
        assert_eq!(out.to_vec::<u64>(), vec![4, 15]);
    }

    #[test]
    fn test_add_float_scalar_promotes() {
        let t = tensor(vec![1, 2], Signed(8)).unwrap();
        let out = &t + Scalar::Float(0.5);
        assert_eq!(out.element_type(), Float(64));
        assert_eq!(out.to_vec::<f64>(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_add_to_half() {
        let t = tensor(vec![0.5, 1.25], Float(16)).unwrap();
        let out = add(&t, 1);
        assert_eq!(out.element_type(), Float(16));
        let values = out.to_vec::<f64>();
        assert_relative_eq!(values[0], 1.5);
        assert_relative_eq!(values[1], 2.25);
    }

    #[test]
    fn test_add_bool_tensor() {
        let t = tensor(vec![true, false], TensorOptions::new()).unwrap();
        let out = Scalar::Bool(true) + &t;
        assert_eq!(out.element_type(), Unsigned(1));
        // 1 + 1 wraps at one bit
        assert_eq!(out.to_vec::<u64>(), vec![0, 1]);

        let wrapped = add(&t, 3);
        assert_eq!(wrapped.element_type(), Unsigned(1));
        assert_eq!(wrapped.to_vec::<u64>(), vec![0, 1]);
        assert_eq!(add_type(&t, -3), Signed(2));
    }

    #[test]
    fn test_add_scalar_tensor() {
        let t = tensor(41, TensorOptions::new()).unwrap();
        let out = add(&t, 1);
        assert_eq!(out.rank(), 0);
        assert_eq!(out.to_scalars(), vec![Scalar::Int(42)]);
    }

    #[test]
    fn test_add_empty() {
        let t = tensor(Vec::<i32>::new(), Signed(32)).unwrap();
        let out = add(&t, -1);
        assert_eq!(out.shape().dims(), &[0]);
        assert!(out.to_buffer().is_empty());
    }

    #[test]
    fn test_input_unchanged() {
        let t = tensor(vec![1, 2, 3], Unsigned(8)).unwrap();
        let before = t.clone();
        let _ = add(&t, -5);
        assert_eq!(t, before);
    }
}

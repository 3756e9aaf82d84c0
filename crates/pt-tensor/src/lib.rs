//! `pt-tensor` - Bit-packed tensor core for packed-tensor.
//!
//! This crate provides:
//! - `ElementType`: signed, unsigned and float element types of any
//!   supported width, with inference from literals and promotion (`merge`)
//! - A flattener turning nested literals into a shape and a row-major
//!   `PackedBuffer` with no padding between elements, down to 1 bit
//! - A binary encoder that packs scalars and re-encodes buffers between
//!   types, monomorphized per source/destination kind pair
//! - An immutable `Tensor` and scalar addition with type promotion

pub mod bits;
pub mod dtype;
pub mod encode;
pub mod error;
pub mod flatten;
pub mod ops;
pub mod shape;
pub mod tensor;
pub mod value;

// Re-export primary types at the crate root for convenience.
pub use bits::{BitReader, BitWriter, PackedBuffer};
pub use dtype::{ElementType, Kind};
pub use encode::{decode_scalar, encode_scalar, reencode, Element};
pub use error::{Result, TensorError};
pub use flatten::flatten;
pub use ops::add;
pub use shape::Shape;
pub use tensor::{tensor, Tensor, TensorOptions};
pub use value::{Scalar, Value};

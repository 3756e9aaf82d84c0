use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("invalid element type {ty}: {reason}")]
    InvalidType { ty: String, reason: String },
    #[error("unknown element kind code {0}")]
    UnknownKind(u32),
    #[error("cannot parse element type from {0:?}")]
    ParseType(String),
    #[error(
        "shape mismatch: expected {expected:?} (element {expected_index}), got {got:?} (element {index})"
    )]
    ShapeMismatch {
        expected: Vec<usize>,
        expected_index: usize,
        got: Vec<usize>,
        index: usize,
    },
    #[error("buffer length mismatch: expected {expected} bits, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },
    #[error("shape {shape:?} of {bits}-bit elements overflows the addressable size")]
    ShapeOverflow { shape: Vec<usize>, bits: u32 },
    #[error("element count mismatch: shape {shape:?} needs {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, TensorError>;

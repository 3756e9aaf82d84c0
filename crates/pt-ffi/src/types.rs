use pt_tensor::{ElementType, Result, TensorOptions};

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PTStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorInvalidType = 2,
    ErrorShapeMismatch = 3,
    ErrorInternal = 4,
}

pub const PT_KIND_SIGNED: u32 = 0;
pub const PT_KIND_UNSIGNED: u32 = 1;
pub const PT_KIND_FLOAT: u32 = 2;
/// Kind code asking construction to infer the type from the data.
pub const PT_KIND_INFER: u32 = 255;

/// Element type as seen from C: a kind code plus a width in bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PTElementType {
    pub kind: u32,
    pub bits: u32,
}

impl PTElementType {
    pub const INFER: PTElementType = PTElementType {
        kind: PT_KIND_INFER,
        bits: 0,
    };

    /// Resolves to construction options; unknown kinds and widths fail.
    pub fn to_options(self) -> Result<TensorOptions> {
        if self.kind == PT_KIND_INFER {
            return Ok(TensorOptions::new());
        }
        Ok(ElementType::from_code(self.kind, self.bits)?.into())
    }
}

impl From<ElementType> for PTElementType {
    fn from(ty: ElementType) -> Self {
        PTElementType {
            kind: ty.kind().code(),
            bits: ty.bits(),
        }
    }
}

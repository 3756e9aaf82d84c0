use std::cell::RefCell;
use std::ffi::CString;

use pt_tensor::TensorError;

use crate::types::PTStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `pt_last_error`.
pub fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Record `err` as the last error and map it to a status code.
pub fn report(err: TensorError) -> PTStatus {
    let status = match err {
        TensorError::InvalidType { .. }
        | TensorError::UnknownKind(_)
        | TensorError::ParseType(_) => PTStatus::ErrorInvalidType,
        TensorError::ShapeMismatch { .. } => PTStatus::ErrorShapeMismatch,
        TensorError::BufferLengthMismatch { .. }
        | TensorError::ElementCountMismatch { .. }
        | TensorError::ShapeOverflow { .. } => PTStatus::ErrorInvalidArgument,
    };
    set_last_error(err.to_string());
    status
}

mod types;
mod error;
mod context;

pub use types::*;
pub use error::*;
pub use context::*;

use std::ffi::CString;
use std::os::raw::c_char;

use pt_tensor::{PackedBuffer, Scalar, Shape, Tensor};

/// Execute a closure that returns a `PTStatus`, catching any panics
/// and converting them into `PTStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> PTStatus + std::panic::UnwindSafe>(f: F) -> PTStatus {
    match std::panic::catch_unwind(f) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            PTStatus::ErrorInternal
        }
    }
}

/// Borrow `len` elements at `ptr`. A null pointer is only accepted for an
/// empty slice.
unsafe fn borrow_slice<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

/// Shared body of the flat-data constructors.
unsafe fn build_from_scalars(
    scalars: Option<Vec<Scalar>>,
    dims: *const usize,
    rank: usize,
    ty: PTElementType,
    out: *mut *mut PTTensor,
) -> PTStatus {
    if out.is_null() {
        set_last_error("out is null".to_string());
        return PTStatus::ErrorInvalidArgument;
    }
    let (scalars, dims) = match (scalars, unsafe { borrow_slice(dims, rank) }) {
        (Some(s), Some(d)) => (s, d),
        _ => {
            set_last_error("null data or dims".to_string());
            return PTStatus::ErrorInvalidArgument;
        }
    };
    let options = match ty.to_options() {
        Ok(o) => o,
        Err(e) => return report(e),
    };
    match Tensor::from_scalars(&scalars, Shape::from_slice(dims), options) {
        Ok(t) => {
            unsafe { *out = PTTensor::new(t).into_raw() };
            PTStatus::Ok
        }
        Err(e) => report(e),
    }
}

/// Build a tensor from `len` row-major 64-bit integers shaped by `dims`.
///
/// Pass `PTElementType::INFER` (kind `PT_KIND_INFER`) to infer `s64`. On
/// success, writes a heap-allocated tensor into `*out`; free it with
/// `pt_tensor_destroy`.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_from_i64(
    data: *const i64,
    len: usize,
    dims: *const usize,
    rank: usize,
    ty: PTElementType,
    out: *mut *mut PTTensor,
) -> PTStatus {
    catch_panic(|| {
        let scalars = unsafe { borrow_slice(data, len) }
            .map(|d| d.iter().map(|&v| Scalar::Int(v)).collect());
        unsafe { build_from_scalars(scalars, dims, rank, ty, out) }
    })
}

/// Build a tensor from `len` row-major doubles shaped by `dims`.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_from_f64(
    data: *const f64,
    len: usize,
    dims: *const usize,
    rank: usize,
    ty: PTElementType,
    out: *mut *mut PTTensor,
) -> PTStatus {
    catch_panic(|| {
        let scalars = unsafe { borrow_slice(data, len) }
            .map(|d| d.iter().map(|&v| Scalar::Float(v)).collect());
        unsafe { build_from_scalars(scalars, dims, rank, ty, out) }
    })
}

/// Build a tensor from `len` row-major booleans shaped by `dims`.
///
/// With `PTElementType::INFER` the result is `u1`, one bit per element.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_from_bool(
    data: *const bool,
    len: usize,
    dims: *const usize,
    rank: usize,
    ty: PTElementType,
    out: *mut *mut PTTensor,
) -> PTStatus {
    catch_panic(|| {
        let scalars = unsafe { borrow_slice(data, len) }
            .map(|d| d.iter().map(|&v| Scalar::Bool(v)).collect());
        unsafe { build_from_scalars(scalars, dims, rank, ty, out) }
    })
}

/// Rebuild a tensor from packed bytes previously read with
/// `pt_tensor_buffer`. `bytes` must hold `ceil(bit_len / 8)` bytes.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_from_buffer(
    bytes: *const u8,
    bit_len: usize,
    dims: *const usize,
    rank: usize,
    ty: PTElementType,
    out: *mut *mut PTTensor,
) -> PTStatus {
    catch_panic(|| {
        if out.is_null() {
            set_last_error("out is null".to_string());
            return PTStatus::ErrorInvalidArgument;
        }
        let byte_len = bit_len.div_ceil(8);
        let bytes = unsafe { borrow_slice(bytes, byte_len) };
        let dims = unsafe { borrow_slice(dims, rank) };
        let (bytes, dims) = match (bytes, dims) {
            (Some(b), Some(d)) => (b, d),
            _ => {
                set_last_error("null bytes or dims".to_string());
                return PTStatus::ErrorInvalidArgument;
            }
        };
        if ty.kind == PT_KIND_INFER {
            set_last_error("a packed buffer needs an explicit element type".to_string());
            return PTStatus::ErrorInvalidType;
        }
        let ty = match pt_tensor::ElementType::from_code(ty.kind, ty.bits) {
            Ok(t) => t,
            Err(e) => return report(e),
        };
        let buffer = match PackedBuffer::from_bytes(bytes.to_vec(), bit_len) {
            Some(b) => b,
            None => {
                set_last_error(format!("{} bytes cannot hold {} bits", bytes.len(), bit_len));
                return PTStatus::ErrorInvalidArgument;
            }
        };
        match Tensor::from_buffer(buffer, Shape::from_slice(dims), ty) {
            Ok(t) => {
                unsafe { *out = PTTensor::new(t).into_raw() };
                PTStatus::Ok
            }
            Err(e) => report(e),
        }
    })
}

unsafe fn add_scalar(t: *const PTTensor, scalar: Scalar, out: *mut *mut PTTensor) -> PTStatus {
    if t.is_null() || out.is_null() {
        set_last_error("null argument".to_string());
        return PTStatus::ErrorInvalidArgument;
    }
    let t = unsafe { &*t };
    let sum = pt_tensor::add(&t.tensor, scalar);
    unsafe { *out = PTTensor::new(sum).into_raw() };
    PTStatus::Ok
}

/// Add an integer to every element, writing a new tensor into `*out`.
///
/// The input is left untouched; the output type follows scalar promotion.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_add_i64(
    t: *const PTTensor,
    scalar: i64,
    out: *mut *mut PTTensor,
) -> PTStatus {
    catch_panic(|| unsafe { add_scalar(t, Scalar::Int(scalar), out) })
}

/// Add a double to every element, writing a new tensor into `*out`.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_add_f64(
    t: *const PTTensor,
    scalar: f64,
    out: *mut *mut PTTensor,
) -> PTStatus {
    catch_panic(|| unsafe { add_scalar(t, Scalar::Float(scalar), out) })
}

/// Record a null-argument error for `func`.
fn null_argument(func: &str) -> PTStatus {
    set_last_error(format!("{}: null argument", func));
    PTStatus::ErrorInvalidArgument
}

/// Write the tensor's rank into `*out`.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_rank(t: *const PTTensor, out: *mut usize) -> PTStatus {
    if t.is_null() || out.is_null() {
        return null_argument("pt_tensor_rank");
    }
    *out = (*t).tensor.rank();
    PTStatus::Ok
}

/// Copy the tensor's dimensions into `dims_out`, which must have room for
/// at least `rank` entries (`capacity`).
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_shape(
    t: *const PTTensor,
    dims_out: *mut usize,
    capacity: usize,
) -> PTStatus {
    if t.is_null() {
        return null_argument("pt_tensor_shape");
    }
    let dims = (*t).tensor.shape().dims();
    if dims.is_empty() {
        return PTStatus::Ok;
    }
    if dims_out.is_null() || capacity < dims.len() {
        set_last_error(format!(
            "shape needs {} entries, capacity is {}",
            dims.len(),
            capacity
        ));
        return PTStatus::ErrorInvalidArgument;
    }
    std::ptr::copy_nonoverlapping(dims.as_ptr(), dims_out, dims.len());
    PTStatus::Ok
}

/// Write the tensor's element type into `*out`.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_type(t: *const PTTensor, out: *mut PTElementType) -> PTStatus {
    if t.is_null() || out.is_null() {
        return null_argument("pt_tensor_type");
    }
    *out = (*t).tensor.element_type().into();
    PTStatus::Ok
}

/// Expose the packed row-major data.
///
/// `*bytes_out` borrows from the tensor and stays valid until
/// `pt_tensor_destroy`. The final byte is zero-padded when `*bit_len_out`
/// is not a multiple of 8.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_buffer(
    t: *const PTTensor,
    bytes_out: *mut *const u8,
    bit_len_out: *mut usize,
) -> PTStatus {
    if t.is_null() || bytes_out.is_null() || bit_len_out.is_null() {
        return null_argument("pt_tensor_buffer");
    }
    let buffer = (*t).tensor.to_buffer();
    *bytes_out = buffer.as_bytes().as_ptr();
    *bit_len_out = buffer.bit_len();
    PTStatus::Ok
}

/// Destroy a tensor returned by any `pt_tensor_*` constructor.
///
/// Passing a null pointer is a no-op and returns `PTStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn pt_tensor_destroy(t: *mut PTTensor) -> PTStatus {
    if t.is_null() {
        return PTStatus::Ok;
    }
    drop(Box::from_raw(t));
    PTStatus::Ok
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error, or
/// null if no error has occurred. The caller must free the returned string
/// with `pt_free_string`.
#[no_mangle]
pub extern "C" fn pt_last_error() -> *mut c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `pt_last_error`.
#[no_mangle]
pub unsafe extern "C" fn pt_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn last_error() -> String {
        let p = pt_last_error();
        assert!(!p.is_null());
        let msg = unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned();
        unsafe { pt_free_string(p) };
        msg
    }

    fn shape_of(t: *const PTTensor) -> Vec<usize> {
        let mut rank = 0usize;
        assert_eq!(unsafe { pt_tensor_rank(t, &mut rank) }, PTStatus::Ok);
        let mut dims = vec![0usize; rank];
        assert_eq!(
            unsafe { pt_tensor_shape(t, dims.as_mut_ptr(), dims.len()) },
            PTStatus::Ok
        );
        dims
    }

    fn bytes_of(t: *const PTTensor) -> (Vec<u8>, usize) {
        let mut bytes = ptr::null();
        let mut bit_len = 0usize;
        assert_eq!(
            unsafe { pt_tensor_buffer(t, &mut bytes, &mut bit_len) },
            PTStatus::Ok
        );
        let copy = unsafe { std::slice::from_raw_parts(bytes, bit_len.div_ceil(8)) }.to_vec();
        (copy, bit_len)
    }

    #[test]
    fn test_from_i64_with_type() {
        let data = [300i64, 301, 302];
        let dims = [3usize];
        let ty = PTElementType { kind: PT_KIND_SIGNED, bits: 8 };
        let mut t = ptr::null_mut();
        let status = unsafe {
            pt_tensor_from_i64(data.as_ptr(), data.len(), dims.as_ptr(), 1, ty, &mut t)
        };
        assert_eq!(status, PTStatus::Ok);
        assert_eq!(shape_of(t), vec![3]);
        assert_eq!(bytes_of(t), (vec![44, 45, 46], 24));
        unsafe { pt_tensor_destroy(t) };
    }

    #[test]
    fn test_from_bool_infers_one_bit() {
        let data = [true, false, true];
        let dims = [3usize];
        let mut t = ptr::null_mut();
        let status = unsafe {
            pt_tensor_from_bool(data.as_ptr(), 3, dims.as_ptr(), 1, PTElementType::INFER, &mut t)
        };
        assert_eq!(status, PTStatus::Ok);
        let mut ty = PTElementType::INFER;
        assert_eq!(unsafe { pt_tensor_type(t, &mut ty) }, PTStatus::Ok);
        assert_eq!(ty, PTElementType { kind: PT_KIND_UNSIGNED, bits: 1 });
        assert_eq!(bytes_of(t), (vec![0b1010_0000], 3));
        unsafe { pt_tensor_destroy(t) };
    }

    #[test]
    fn test_scalar_rank_zero() {
        let data = [2.5f64];
        let mut t = ptr::null_mut();
        let status = unsafe {
            pt_tensor_from_f64(data.as_ptr(), 1, ptr::null(), 0, PTElementType::INFER, &mut t)
        };
        assert_eq!(status, PTStatus::Ok);
        assert_eq!(shape_of(t), Vec::<usize>::new());
        assert_eq!(bytes_of(t), (2.5f64.to_bits().to_be_bytes().to_vec(), 64));
        unsafe { pt_tensor_destroy(t) };
    }

    #[test]
    fn test_add_promotes() {
        let data = [0i64, 1, 2];
        let dims = [3usize];
        let ty = PTElementType { kind: PT_KIND_UNSIGNED, bits: 8 };
        let mut t = ptr::null_mut();
        let mut sum = ptr::null_mut();
        unsafe {
            assert_eq!(
                pt_tensor_from_i64(data.as_ptr(), 3, dims.as_ptr(), 1, ty, &mut t),
                PTStatus::Ok
            );
            assert_eq!(pt_tensor_add_i64(t, -1, &mut sum), PTStatus::Ok);
        }
        let mut out_ty = PTElementType::INFER;
        assert_eq!(unsafe { pt_tensor_type(sum, &mut out_ty) }, PTStatus::Ok);
        assert_eq!(out_ty, PTElementType { kind: PT_KIND_SIGNED, bits: 16 });
        assert_eq!(bytes_of(sum).0, vec![0xFF, 0xFF, 0, 0, 0, 1]);
        // input is untouched
        assert_eq!(bytes_of(t).0, vec![0, 1, 2]);
        unsafe {
            pt_tensor_destroy(sum);
            pt_tensor_destroy(t);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let data = [1i64];
        let ty = PTElementType { kind: 9, bits: 8 };
        let mut t = ptr::null_mut();
        let status = unsafe { pt_tensor_from_i64(data.as_ptr(), 1, ptr::null(), 0, ty, &mut t) };
        assert_eq!(status, PTStatus::ErrorInvalidType);
        assert!(t.is_null());
        assert!(last_error().contains("unknown element kind"));
    }

    #[test]
    fn test_zero_width() {
        let data = [1i64];
        let ty = PTElementType { kind: PT_KIND_FLOAT, bits: 0 };
        let mut t = ptr::null_mut();
        let status = unsafe { pt_tensor_from_i64(data.as_ptr(), 1, ptr::null(), 0, ty, &mut t) };
        assert_eq!(status, PTStatus::ErrorInvalidType);
        assert!(last_error().contains("width must be positive"));
    }

    #[test]
    fn test_element_count_mismatch() {
        let data = [1i64, 2, 3];
        let dims = [2usize, 2];
        let mut t = ptr::null_mut();
        let status = unsafe {
            pt_tensor_from_i64(data.as_ptr(), 3, dims.as_ptr(), 2, PTElementType::INFER, &mut t)
        };
        assert_eq!(status, PTStatus::ErrorInvalidArgument);
        assert!(last_error().contains("element count mismatch"));
    }

    #[test]
    fn test_buffer_roundtrip() {
        let data = [1i64, -2, 3, -4];
        let dims = [2usize, 2];
        let ty = PTElementType { kind: PT_KIND_SIGNED, bits: 3 };
        let mut t = ptr::null_mut();
        let mut rebuilt = ptr::null_mut();
        unsafe {
            assert_eq!(
                pt_tensor_from_i64(data.as_ptr(), 4, dims.as_ptr(), 2, ty, &mut t),
                PTStatus::Ok
            );
        }
        let (bytes, bit_len) = bytes_of(t);
        assert_eq!(bit_len, 12);
        unsafe {
            assert_eq!(
                pt_tensor_from_buffer(bytes.as_ptr(), bit_len, dims.as_ptr(), 2, ty, &mut rebuilt),
                PTStatus::Ok
            );
            assert_eq!((*rebuilt).tensor, (*t).tensor);
            pt_tensor_destroy(rebuilt);
        }

        let wrong_dims = [3usize];
        let status = unsafe {
            pt_tensor_from_buffer(bytes.as_ptr(), bit_len, wrong_dims.as_ptr(), 1, ty, &mut rebuilt)
        };
        assert_eq!(status, PTStatus::ErrorInvalidArgument);
        assert!(last_error().contains("buffer length mismatch"));
        unsafe { pt_tensor_destroy(t) };
    }

    #[test]
    fn test_shape_capacity() {
        let data = [1i64, 2, 3, 4];
        let dims = [2usize, 2];
        let mut t = ptr::null_mut();
        unsafe {
            pt_tensor_from_i64(data.as_ptr(), 4, dims.as_ptr(), 2, PTElementType::INFER, &mut t);
        }
        let mut small = [0usize; 1];
        let status = unsafe { pt_tensor_shape(t, small.as_mut_ptr(), small.len()) };
        assert_eq!(status, PTStatus::ErrorInvalidArgument);
        unsafe { pt_tensor_destroy(t) };
    }

    #[test]
    fn test_null_arguments() {
        let mut t = ptr::null_mut();
        let status = unsafe {
            pt_tensor_from_i64(ptr::null(), 2, ptr::null(), 0, PTElementType::INFER, &mut t)
        };
        assert_eq!(status, PTStatus::ErrorInvalidArgument);
        assert_eq!(unsafe { pt_tensor_destroy(ptr::null_mut()) }, PTStatus::Ok);
        let mut rank = 0usize;
        assert_eq!(
            unsafe { pt_tensor_rank(ptr::null(), &mut rank) },
            PTStatus::ErrorInvalidArgument
        );
        assert_eq!(last_error(), "pt_tensor_rank: null argument");
    }

    #[test]
    fn test_queries_set_last_error() {
        let data = [1i64];
        let mut t = ptr::null_mut();
        unsafe {
            pt_tensor_from_i64(data.as_ptr(), 1, ptr::null(), 0, PTElementType::INFER, &mut t);
        }
        // leave a stale message behind
        set_last_error("stale".to_string());

        let mut ty = PTElementType::INFER;
        assert_eq!(
            unsafe { pt_tensor_type(ptr::null(), &mut ty) },
            PTStatus::ErrorInvalidArgument
        );
        assert_eq!(last_error(), "pt_tensor_type: null argument");

        let mut bit_len = 0usize;
        assert_eq!(
            unsafe { pt_tensor_buffer(t, ptr::null_mut(), &mut bit_len) },
            PTStatus::ErrorInvalidArgument
        );
        assert_eq!(last_error(), "pt_tensor_buffer: null argument");

        assert_eq!(
            unsafe { pt_tensor_shape(ptr::null(), ptr::null_mut(), 0) },
            PTStatus::ErrorInvalidArgument
        );
        assert_eq!(last_error(), "pt_tensor_shape: null argument");
        unsafe { pt_tensor_destroy(t) };
    }

    #[test]
    fn test_empty_shape_roundtrip() {
        let dims = [0usize, 3];
        let ty = PTElementType { kind: PT_KIND_SIGNED, bits: 8 };
        let mut t = ptr::null_mut();
        let mut rebuilt = ptr::null_mut();
        unsafe {
            assert_eq!(
                pt_tensor_from_i64(ptr::null(), 0, dims.as_ptr(), 2, ty, &mut t),
                PTStatus::Ok
            );
        }
        assert_eq!(shape_of(t), vec![0, 3]);
        let (bytes, bit_len) = bytes_of(t);
        assert_eq!(bit_len, 0);
        unsafe {
            assert_eq!(
                pt_tensor_from_buffer(bytes.as_ptr(), bit_len, dims.as_ptr(), 2, ty, &mut rebuilt),
                PTStatus::Ok
            );
            assert_eq!((*rebuilt).tensor, (*t).tensor);
            pt_tensor_destroy(rebuilt);
            pt_tensor_destroy(t);
        }
    }

    #[test]
    fn test_overflowing_dims() {
        let dims = [1usize << 62, 4];
        let ty = PTElementType { kind: PT_KIND_UNSIGNED, bits: 8 };
        let mut t = ptr::null_mut();
        let status = unsafe {
            pt_tensor_from_buffer(ptr::null(), 0, dims.as_ptr(), 2, ty, &mut t)
        };
        assert_eq!(status, PTStatus::ErrorInvalidArgument);
        assert!(t.is_null());
        assert!(last_error().contains("overflows"));
    }
}

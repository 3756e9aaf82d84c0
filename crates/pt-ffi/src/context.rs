use pt_tensor::Tensor;

/// Opaque handle owning one immutable tensor.
pub struct PTTensor {
    pub tensor: Tensor,
}

impl PTTensor {
    pub fn new(tensor: Tensor) -> Self {
        Self { tensor }
    }

    /// Move onto the heap and hand ownership to the caller.
    pub fn into_raw(self) -> *mut PTTensor {
        Box::into_raw(Box::new(self))
    }
}

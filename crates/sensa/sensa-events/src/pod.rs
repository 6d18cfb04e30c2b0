//! Plain-old-data contract for records that live in shared memory.

/// Marker for types that may be copied byte-wise in and out of a shared
/// region.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or primitive), contain no pointers or
/// references, and accept every bit pattern as a valid value. The all-zero
/// pattern is what a freshly (re)activated region holds, and a discarded torn
/// copy may hold anything, so neither can be allowed to be undefined behaviour.
pub unsafe trait Pod: Copy + Send + 'static {
    /// Returns the all-zero value.
    #[inline]
    fn zeroed() -> Self {
        // SAFETY: every bit pattern (including all zeroes) is valid for `Pod`.
        unsafe { std::mem::zeroed() }
    }
}

macro_rules! impl_pod {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Pod for $t {})*
    };
}

impl_pod!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

unsafe impl<T: Pod, const N: usize> Pod for [T; N] {}

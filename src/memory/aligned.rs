//! Aligned f32 buffers for SIMD kernels
//!
//! [`AlignedBuffer`] owns a zero-initialized block of `f32` whose start
//! address satisfies a caller-chosen power-of-two alignment. Memory is
//! released on drop, so every exit path (including `?` early returns)
//! frees what it allocated.

use std::alloc::{self, Layout};
use std::fmt;
use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use thiserror::Error;

/// Allocation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Invalid alignment: {0} bytes (must be a power of two >= 4)")]
    InvalidAlignment(usize),

    #[error("Buffer layout overflow: {len} floats at {alignment}-byte alignment")]
    LayoutOverflow { len: usize, alignment: usize },

    #[error("Aligned allocation failed: {bytes} bytes at {alignment}-byte alignment")]
    AllocationFailed { bytes: usize, alignment: usize },
}

/// Result type for allocator operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Check whether `ptr` sits on an `alignment`-byte boundary
#[inline]
pub fn is_aligned(ptr: *const f32, alignment: usize) -> bool {
    (ptr as usize) % alignment == 0
}

/// Heap buffer of `f32` with a guaranteed start alignment
///
/// Zero-length buffers still own a one-element allocation so `as_ptr()` is
/// always aligned.
pub struct AlignedBuffer {
    ptr: NonNull<f32>,
    len: usize,
    layout: Layout,
}

// SAFETY: AlignedBuffer uniquely owns its allocation, like Vec<f32>.
unsafe impl Send for AlignedBuffer {}
// SAFETY: shared access only hands out &[f32].
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocate `len` zeroed floats at `alignment` bytes
    ///
    /// # Errors
    /// - `InvalidAlignment` if `alignment` is not a power of two or is
    ///   smaller than the alignment of `f32`
    /// - `LayoutOverflow` if the byte size does not fit a `Layout`
    /// - `AllocationFailed` if the global allocator returns null
    pub fn zeroed(len: usize, alignment: usize) -> MemoryResult<Self> {
        if !alignment.is_power_of_two() || alignment < align_of::<f32>() {
            return Err(MemoryError::InvalidAlignment(alignment));
        }

        let overflow = || MemoryError::LayoutOverflow { len, alignment };
        let bytes = len
            .max(1)
            .checked_mul(size_of::<f32>())
            .ok_or_else(overflow)?;
        let layout = Layout::from_size_align(bytes, alignment).map_err(|_| overflow())?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) } as *mut f32;
        let ptr = NonNull::new(raw).ok_or_else(|| {
            tracing::error!(
                "Aligned allocation of {} bytes at {}-byte alignment failed",
                bytes,
                alignment
            );
            MemoryError::AllocationFailed { bytes, alignment }
        })?;

        tracing::trace!(
            "AlignedBuffer allocated {} floats ({} bytes, align={})",
            len,
            bytes,
            alignment
        );

        Ok(Self { ptr, len, layout })
    }

    /// Allocate an aligned copy of `src`
    pub fn from_slice(src: &[f32], alignment: usize) -> MemoryResult<Self> {
        let mut buf = Self::zeroed(src.len(), alignment)?;
        buf.copy_from_slice(src);
        Ok(buf)
    }

    /// Number of floats
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no floats
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment the buffer was allocated with, in bytes
    #[inline]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Whether the start address also satisfies `alignment`
    #[inline]
    pub fn is_aligned_to(&self, alignment: usize) -> bool {
        is_aligned(self.as_ptr(), alignment)
    }

    #[inline]
    pub fn as_ptr(&self) -> *const f32 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut f32 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        // SAFETY: ptr is valid for len initialized floats for self's lifetime.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        // SAFETY: ptr is valid for len initialized floats and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Copy the contents into a plain `Vec`
    pub fn to_vec(&self) -> Vec<f32> {
        self.as_slice().to_vec()
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with exactly this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.layout) }
    }
}

impl Deref for AlignedBuffer {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        self.as_slice()
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [f32] {
        self.as_mut_slice()
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("alignment", &self.alignment())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_is_zero_and_aligned() {
        for &align in &[4usize, 16, 32, 64] {
            let buf = AlignedBuffer::zeroed(37, align).unwrap();
            assert_eq!(buf.len(), 37);
            assert_eq!(buf.alignment(), align);
            assert!(buf.is_aligned_to(align), "not aligned to {}", align);
            assert!(buf.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_zero_length() {
        let buf = AlignedBuffer::zeroed(0, 32).unwrap();
        assert!(buf.is_empty());
        assert!(buf.is_aligned_to(32));
        assert_eq!(buf.as_slice(), &[] as &[f32]);
    }

    #[test]
    fn test_invalid_alignment() {
        assert_eq!(
            AlignedBuffer::zeroed(8, 24).unwrap_err(),
            MemoryError::InvalidAlignment(24)
        );
        assert_eq!(
            AlignedBuffer::zeroed(8, 2).unwrap_err(),
            MemoryError::InvalidAlignment(2)
        );
        assert_eq!(
            AlignedBuffer::zeroed(8, 0).unwrap_err(),
            MemoryError::InvalidAlignment(0)
        );
    }

    #[test]
    fn test_layout_overflow() {
        let err = AlignedBuffer::zeroed(usize::MAX / 2, 32).unwrap_err();
        assert!(matches!(err, MemoryError::LayoutOverflow { .. }));
    }

    #[test]
    fn test_from_slice_and_mutation() {
        let src = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let mut buf = AlignedBuffer::from_slice(&src, 16).unwrap();
        assert_eq!(buf.as_slice(), &src);
        buf[2] = 42.0;
        assert_eq!(buf.to_vec(), vec![1.0, 2.0, 42.0, 4.0, 5.0]);
        assert!(format!("{:?}", buf).contains("alignment: 16"));
    }

    #[test]
    fn test_is_aligned() {
        let buf = AlignedBuffer::zeroed(16, 32).unwrap();
        assert!(is_aligned(buf.as_ptr(), 32));
        // One float in is 4-byte aligned but not 16-byte aligned
        let shifted = buf[1..].as_ptr();
        assert!(is_aligned(shifted, 4));
        assert!(!is_aligned(shifted, 16));
    }
}

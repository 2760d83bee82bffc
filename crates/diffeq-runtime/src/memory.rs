//! Zero-copy f64 views over module linear memory.
//!
//! A view is a snapshot over a buffer that the module may move: any call that
//! grows linear memory can reallocate it. The handle API enforces this by
//! tying every view to an exclusive borrow of the session, so no module call
//! can run while a view is alive.

use std::ops::Range;

use diffeq_core::{DiffeqError, Result};

const F64_SIZE: usize = std::mem::size_of::<f64>();

/// Views `len` f64 values starting at `byte_offset` of `buffer`, without copying.
///
/// # Errors
///
/// `MemoryView` if the region is out of bounds or not 8-byte aligned.
///
/// # Examples
///
/// ```
/// use diffeq_runtime::memory::f64_view;
///
/// let values = [1.5f64, 2.5, 3.5];
/// let bytes: &[u8] = bytemuck::cast_slice(&values);
///
/// assert_eq!(f64_view(bytes, 8, 2).unwrap(), &[2.5, 3.5]);
/// assert!(f64_view(bytes, 16, 2).is_err());
/// ```
pub fn f64_view(buffer: &[u8], byte_offset: usize, len: usize) -> Result<&[f64]> {
    if len == 0 {
        return Ok(&[]);
    }
    let region = region(buffer.len(), byte_offset, len)?;
    bytemuck::try_cast_slice(&buffer[region]).map_err(|e| {
        DiffeqError::MemoryView(format!(
            "cannot view {len} f64 values at offset {byte_offset:#x}: {e:?}"
        ))
    })
}

/// Mutable twin of [`f64_view`].
pub fn f64_view_mut(buffer: &mut [u8], byte_offset: usize, len: usize) -> Result<&mut [f64]> {
    if len == 0 {
        return Ok(&mut []);
    }
    let region = region(buffer.len(), byte_offset, len)?;
    bytemuck::try_cast_slice_mut(&mut buffer[region]).map_err(|e| {
        DiffeqError::MemoryView(format!(
            "cannot view {len} f64 values at offset {byte_offset:#x}: {e:?}"
        ))
    })
}

fn region(total: usize, byte_offset: usize, len: usize) -> Result<Range<usize>> {
    let end = len
        .checked_mul(F64_SIZE)
        .and_then(|bytes| bytes.checked_add(byte_offset))
        .filter(|&end| end <= total)
        .ok_or_else(|| {
            DiffeqError::MemoryView(format!(
                "{len} f64 values at offset {byte_offset:#x} exceed memory of {total} bytes"
            ))
        })?;
    Ok(byte_offset..end)
}

//! Bounds-checked primitives over in-memory buffers.
//!
//! Each helper returns exactly the bytes it promises or
//! [`FormatError::Truncated`]; offset arithmetic is done in `u64` so it
//! cannot overflow on 32-bit fields.

use crate::error::{FormatError, FormatResult};

/// Borrow `len` bytes starting at `offset`.
#[inline]
pub(crate) fn range(buf: &[u8], offset: u64, len: u64) -> FormatResult<&[u8]> {
    let available = buf.len() as u64;
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= available)
        .ok_or_else(|| FormatError::truncated(offset, len, available))?;
    Ok(&buf[offset as usize..end as usize])
}

#[inline]
fn array<const N: usize>(buf: &[u8], offset: u64) -> FormatResult<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(range(buf, offset, N as u64)?);
    Ok(out)
}

#[inline]
pub(crate) fn u8_at(buf: &[u8], offset: u64) -> FormatResult<u8> {
    Ok(array::<1>(buf, offset)?[0])
}

#[inline]
pub(crate) fn le_u16(buf: &[u8], offset: u64) -> FormatResult<u16> {
    array(buf, offset).map(u16::from_le_bytes)
}

#[inline]
pub(crate) fn le_u32(buf: &[u8], offset: u64) -> FormatResult<u32> {
    array(buf, offset).map(u32::from_le_bytes)
}

#[inline]
pub(crate) fn be_u32(buf: &[u8], offset: u64) -> FormatResult<u32> {
    array(buf, offset).map(u32::from_be_bytes)
}

/// Check that `buf` starts with `expected`.
#[inline]
pub(crate) fn magic<const N: usize>(
    buf: &[u8],
    expected: &[u8; N],
    what: &'static str,
) -> FormatResult<()> {
    if range(buf, 0, N as u64)? != expected {
        return Err(FormatError::BadMagic { expected: what });
    }
    Ok(())
}

/// Read a NUL-terminated string at `offset`, decoding UTF-8 lossily.
///
/// A missing terminator is treated as truncation.
pub(crate) fn nul_string(buf: &[u8], offset: u64) -> FormatResult<String> {
    let available = buf.len() as u64;
    let tail = buf
        .get(offset as usize..)
        .filter(|_| offset <= available)
        .ok_or_else(|| FormatError::truncated(offset, 1, available))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| FormatError::truncated(offset, tail.len() as u64 + 1, available))?;
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

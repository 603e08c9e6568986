//! Sequential little-endian reader over an immutable byte buffer.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("Read of {wanted} bytes at offset {offset} runs past end of data ({len} bytes)")]
    OutOfBounds {
        offset: usize,
        wanted: usize,
        len: usize,
    },
}

/// Reads fixed-width values front to back, tracking the byte offset.
///
/// Every read either advances the offset by the width of the value or fails
/// with [`CursorError::OutOfBounds`] and leaves the offset untouched.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'s> {
    data: &'s [u8],
    offset: usize,
}

impl<'s> BinaryCursor<'s> {
    pub fn new(data: &'s [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Fails unless at least `n` more bytes can be read. Does not move.
    pub fn ensure(&self, n: usize) -> Result<(), CursorError> {
        if n > self.remaining() {
            return Err(CursorError::OutOfBounds {
                offset: self.offset,
                wanted: n,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'s [u8], CursorError> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(CursorError::OutOfBounds {
                offset: self.offset,
                wanted: n,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        self.read_array().map(f32::from_le_bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), CursorError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Reads exactly `N` bytes and returns them as text, clipped at the first
    /// NUL byte if there is one.
    pub fn read_fixed_str<const N: usize>(&mut self) -> Result<String, CursorError> {
        self.read_bytes(N).map(crate::header::str_from_fixed)
    }

    /// Reads a plain-old-data value stored byte-for-byte in the buffer.
    pub fn read_pod<T: bytemuck::Pod>(&mut self) -> Result<T, CursorError> {
        let raw = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_and_advances() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3f];
        let mut cur = BinaryCursor::new(&data);
        assert_eq!(cur.read_u8().unwrap(), 1);
        assert_eq!(cur.read_u16().unwrap(), 0x1234);
        assert_eq!(cur.read_u32().unwrap(), 0x12345678);
        assert_eq!(cur.offset(), 7);
        assert_eq!(cur.read_f32().unwrap(), 1.0);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn out_of_bounds_keeps_offset() {
        let data = [1, 2, 3];
        let mut cur = BinaryCursor::new(&data);
        cur.skip(2).unwrap();
        let err = cur.read_u16().unwrap_err();
        assert_eq!(
            err,
            CursorError::OutOfBounds { offset: 2, wanted: 2, len: 3 }
        );
        assert_eq!(cur.offset(), 2);
        assert!(cur.skip(2).is_err());
        assert_eq!(cur.read_u8().unwrap(), 3);
    }

    #[test]
    fn fixed_str_clips_at_nul() {
        let mut data = [0u8; 8];
        data[..3].copy_from_slice(b"abc");
        data[4] = b'z';
        let mut cur = BinaryCursor::new(&data);
        assert_eq!(cur.read_fixed_str::<8>().unwrap(), "abc");
        assert_eq!(cur.offset(), 8);

        let mut cur = BinaryCursor::new(b"full");
        assert_eq!(cur.read_fixed_str::<4>().unwrap(), "full");
    }
}

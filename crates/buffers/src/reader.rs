//! Binary buffer reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A forward-only reader over a byte slice.
///
/// The reader keeps a cursor `x` and an exclusive `end`. Reads never go
/// backwards; a failed read leaves the cursor untouched.
///
/// # Example
///
/// ```
/// use protodef_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03, 0xac, 0x02];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8(), Ok(0x01));
/// assert_eq!(reader.u16(), Ok(0x0203));
/// assert_eq!(reader.varint(), Ok(300));
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
    /// End position (exclusive).
    pub end: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given byte slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        let end = uint8.len();
        Self { uint8, x: 0, end }
    }

    /// Creates a reader over `uint8[x..end]`.
    pub fn from_slice(uint8: &'a [u8], x: usize, end: usize) -> Self {
        let end = end.min(uint8.len());
        Self {
            uint8,
            x: x.min(end),
            end,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.x
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.end - self.x
    }

    pub fn is_empty(&self) -> bool {
        self.x >= self.end
    }

    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        match self.x.checked_add(n) {
            Some(upto) if upto <= self.end => Ok(()),
            _ => Err(BufferError::EndOfBuffer),
        }
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.uint8[self.x..self.x + N]);
        self.x += N;
        Ok(out)
    }

    /// Peeks at the current byte without advancing the cursor.
    pub fn peek(&self) -> Result<u8, BufferError> {
        self.check(1)?;
        Ok(self.uint8[self.x])
    }

    /// Advances the cursor by the given number of bytes.
    pub fn skip(&mut self, length: usize) -> Result<(), BufferError> {
        self.check(length)?;
        self.x += length;
        Ok(())
    }

    /// Returns the next `size` bytes and advances the cursor.
    pub fn buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let start = self.x;
        self.x += size;
        Ok(&self.uint8[start..self.x])
    }

    /// Returns every remaining byte and moves the cursor to the end.
    pub fn rest(&mut self) -> &'a [u8] {
        let start = self.x;
        self.x = self.end;
        &self.uint8[start..self.end]
    }

    /// Reads a UTF-8 string of `size` bytes.
    pub fn utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        self.check(size)?;
        let bytes = &self.uint8[self.x..self.x + size];
        let s = str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)?;
        self.x += size;
        Ok(s)
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8, BufferError> {
        Ok(self.u8()? as i8)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, BufferError> {
        self.array().map(u16::from_be_bytes)
    }

    #[inline]
    pub fn i16(&mut self) -> Result<i16, BufferError> {
        self.array().map(i16::from_be_bytes)
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, BufferError> {
        self.array().map(u32::from_be_bytes)
    }

    #[inline]
    pub fn i32(&mut self) -> Result<i32, BufferError> {
        self.array().map(i32::from_be_bytes)
    }

    #[inline]
    pub fn u64(&mut self) -> Result<u64, BufferError> {
        self.array().map(u64::from_be_bytes)
    }

    #[inline]
    pub fn i64(&mut self) -> Result<i64, BufferError> {
        self.array().map(i64::from_be_bytes)
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32, BufferError> {
        self.array().map(f32::from_be_bytes)
    }

    #[inline]
    pub fn f64(&mut self) -> Result<f64, BufferError> {
        self.array().map(f64::from_be_bytes)
    }

    // -----------------------------------------------------------------------
    // Little-endian variants
    // -----------------------------------------------------------------------

    #[inline]
    pub fn u16_le(&mut self) -> Result<u16, BufferError> {
        self.array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn i16_le(&mut self) -> Result<i16, BufferError> {
        self.array().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn u32_le(&mut self) -> Result<u32, BufferError> {
        self.array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn i32_le(&mut self) -> Result<i32, BufferError> {
        self.array().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn u64_le(&mut self) -> Result<u64, BufferError> {
        self.array().map(u64::from_le_bytes)
    }

    #[inline]
    pub fn i64_le(&mut self) -> Result<i64, BufferError> {
        self.array().map(i64::from_le_bytes)
    }

    #[inline]
    pub fn f32_le(&mut self) -> Result<f32, BufferError> {
        self.array().map(f32::from_le_bytes)
    }

    #[inline]
    pub fn f64_le(&mut self) -> Result<f64, BufferError> {
        self.array().map(f64::from_le_bytes)
    }

    // -----------------------------------------------------------------------
    // LEB128
    // -----------------------------------------------------------------------

    fn leb128(&mut self, max_bytes: usize) -> Result<u64, BufferError> {
        let start = self.x;
        let mut result: u64 = 0;
        let mut shift = 0u32;
        for _ in 0..max_bytes {
            let b = match self.u8() {
                Ok(b) => b as u64,
                Err(err) => {
                    self.x = start;
                    return Err(err);
                }
            };
            result |= (b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        self.x = start;
        Err(BufferError::VarIntTooLong)
    }

    /// Reads a LEB128 `varint` (at most 5 bytes, two's complement i32).
    pub fn varint(&mut self) -> Result<i32, BufferError> {
        self.leb128(5).map(|raw| raw as u32 as i32)
    }

    /// Reads a LEB128 `varlong` (at most 10 bytes, two's complement i64).
    pub fn varlong(&mut self) -> Result<i64, BufferError> {
        self.leb128(10).map(|raw| raw as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u8(), Ok(0x01));
        assert_eq!(reader.u8(), Ok(0x02));
        assert_eq!(reader.u8(), Ok(0x03));
        assert_eq!(reader.u8(), Err(BufferError::EndOfBuffer));
    }

    #[test]
    fn test_u16_and_u32() {
        let data = [0x01, 0x02, 0x01, 0x02, 0x03, 0x04];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u16(), Ok(0x0102));
        assert_eq!(reader.u32(), Ok(0x01020304));
    }

    #[test]
    fn test_little_endian() {
        let data = [0x02, 0x01, 0x04, 0x03, 0x02, 0x01];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u16_le(), Ok(0x0102));
        assert_eq!(reader.u32_le(), Ok(0x01020304));
    }

    #[test]
    fn test_signed_and_float() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-123456i32).to_be_bytes());
        data.extend_from_slice(&u64::MAX.to_be_bytes());
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&std::f64::consts::PI.to_be_bytes());
        let mut reader = Reader::new(&data);
        assert_eq!(reader.i32(), Ok(-123456));
        assert_eq!(reader.u64(), Ok(u64::MAX));
        assert_eq!(reader.f32(), Ok(1.5));
        assert_eq!(reader.f64(), Ok(std::f64::consts::PI));
    }

    #[test]
    fn test_failed_read_keeps_cursor() {
        let data = [0x01u8, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u32(), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.x, 0);
        assert_eq!(reader.buf(5), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_peek_and_rest() {
        let data = [0x55u8, 0x66, 0x77];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.peek(), Ok(0x55));
        assert_eq!(reader.x, 0);
        reader.skip(1).unwrap();
        assert_eq!(reader.rest(), &[0x66, 0x77]);
        assert!(reader.is_empty());
        assert_eq!(reader.rest(), &[] as &[u8]);
        assert_eq!(reader.peek(), Err(BufferError::EndOfBuffer));
    }

    #[test]
    fn test_utf8() {
        let data = b"hello world";
        let mut reader = Reader::new(data);
        assert_eq!(reader.utf8(5), Ok("hello"));
        assert_eq!(reader.utf8(6), Ok(" world"));
        let bad = [0xffu8, 0xfe];
        let mut reader = Reader::new(&bad);
        assert_eq!(reader.utf8(2), Err(BufferError::InvalidUtf8));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_varint() {
        let cases: &[(&[u8], i32)] = &[
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7f], 127),
            (&[0x80, 0x01], 128),
            (&[0x80, 0x80, 0x01], 16384),
            (&[0xff, 0xff, 0xff, 0xff, 0x07], i32::MAX),
            (&[0xff, 0xff, 0xff, 0xff, 0x0f], -1),
            (&[0x80, 0x80, 0x80, 0x80, 0x08], i32::MIN),
        ];
        for (bytes, expected) in cases {
            let mut reader = Reader::new(bytes);
            assert_eq!(reader.varint(), Ok(*expected), "bytes {:?}", bytes);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_varlong() {
        let mut reader = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]);
        assert_eq!(reader.varlong(), Ok(-1));
        let mut reader = Reader::new(&[0x80, 0x01]);
        assert_eq!(reader.varlong(), Ok(128));
    }

    #[test]
    fn test_varint_too_long() {
        let data = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x01];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.varint(), Err(BufferError::VarIntTooLong));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_varint_truncated() {
        let data = [0x80u8, 0x80];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.varint(), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.x, 0);
    }
}
